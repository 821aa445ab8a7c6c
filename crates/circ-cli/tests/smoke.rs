use std::fs;
use std::path::PathBuf;
use std::process::Command;

use circ_ir::{BitString, Circuit, OpKind};
use pretty_assertions::assert_eq;

fn sample_circuit() -> Circuit {
    let mut c = Circuit::new(64);
    let a = c.create(OpKind::InputRegister("EAX".into()), 32);
    let k = c.create(OpKind::Constant(BitString::from_u64(1, 32)), 32);
    let add = c.create(OpKind::Add, 32);
    c.add_operands(add, &[a, k]);
    let out = c.create(OpKind::OutputRegister("EAX".into()), 32);
    let rc = c.create(OpKind::RegConstraint, 1);
    c.add_operands(rc, &[add, out]);
    // An identity constraint the pipeline should strip.
    let in_bx = c.create(OpKind::InputRegister("EBX".into()), 32);
    let out_bx = c.create(OpKind::OutputRegister("EBX".into()), 32);
    let identity = c.create(OpKind::RegConstraint, 1);
    c.add_operands(identity, &[in_bx, out_bx]);
    let vi = c.create(OpKind::VerifyInstruction, 1);
    c.add_operands(vi, &[rc, identity]);
    let root = c.root();
    c.add_operand(root, vi);
    c
}

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("circ-decoder-test-{}-{name}", std::process::id()))
}

fn exe() -> &'static str {
    env!("CARGO_BIN_EXE_circ-decoder")
}

#[test]
fn compiles_a_serialized_circuit_end_to_end() {
    let ir_path = scratch_path("input.json");
    let dec_path = scratch_path("decoder.cpp");
    let mut buf = Vec::new();
    sample_circuit().to_json(&mut buf).unwrap();
    fs::write(&ir_path, &buf).unwrap();

    let output = Command::new(exe())
        .args([
            "--ir-in",
            ir_path.to_str().unwrap(),
            "--dec-out",
            dec_path.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run circ-decoder");
    assert!(
        output.status.success(),
        "exit {:?}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    let text = fs::read_to_string(&dec_path).unwrap();
    assert!(text.contains("constexpr int MAX_SIZE_INSTR"));
    assert!(text.contains("VisRetType "));
    assert!(text.contains("void decoder_for_vi"));
    // The identity constraint must not survive into the emitted decoder.
    assert!(!text.contains("in_EBX"));

    // The history report lands on stderr.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("remove-identity:"));

    let _ = fs::remove_file(&ir_path);
    let _ = fs::remove_file(&dec_path);
}

#[test]
fn cli_misuse_exits_one() {
    let output = Command::new(exe())
        .output()
        .expect("failed to run circ-decoder");
    assert_eq!(output.status.code(), Some(1));

    let output = Command::new(exe())
        .args(["--bytes-in", "90", "--ir-in", "x.json"])
        .output()
        .expect("failed to run circ-decoder");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn load_failure_exits_three() {
    let output = Command::new(exe())
        .args(["--ir-in", "/nonexistent/circuit.json"])
        .output()
        .expect("failed to run circ-decoder");
    assert_eq!(output.status.code(), Some(3));

    // Raw bytes need a lifter, which this build does not link.
    let output = Command::new(exe())
        .args(["--bytes-in", "90c3"])
        .output()
        .expect("failed to run circ-decoder");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn emits_identical_output_across_runs() {
    let ir_path = scratch_path("det.json");
    let mut buf = Vec::new();
    sample_circuit().to_json(&mut buf).unwrap();
    fs::write(&ir_path, &buf).unwrap();

    let run = || {
        let output = Command::new(exe())
            .args(["--ir-in", ir_path.to_str().unwrap()])
            .output()
            .expect("failed to run circ-decoder");
        assert!(output.status.success());
        output.stdout
    };
    assert_eq!(run(), run());

    let _ = fs::remove_file(&ir_path);
}
