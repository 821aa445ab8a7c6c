use circ_ir::{BitString, Circuit, OpKind};
use circ_seg::SegGraph;
use pretty_assertions::assert_eq;

/// `RegConstraint(Add(in_EAX, const), out_EAX)` under one verify context.
fn linear_circuit() -> Circuit {
    let mut c = Circuit::new(64);
    let a = c.create(OpKind::InputRegister("EAX".into()), 32);
    let k = c.create(OpKind::Constant(BitString::from_u64(1, 32)), 32);
    let add = c.create(OpKind::Add, 32);
    c.add_operands(add, &[a, k]);
    let out = c.create(OpKind::OutputRegister("EAX".into()), 32);
    let rc = c.create(OpKind::RegConstraint, 1);
    c.add_operands(rc, &[add, out]);
    let vi = c.create(OpKind::VerifyInstruction, 1);
    c.add_operand(vi, rc);
    let root = c.root();
    c.add_operand(root, vi);
    c
}

/// `RegConstraint(Select(idx, in_EAX, in_EBX), out_ECX)`: one 1-bit select,
/// two projections with isomorphic shapes.
fn select_circuit() -> (Circuit, u32) {
    let mut c = Circuit::new(64);
    let idx = c.create(OpKind::Advice, 1);
    let v0 = c.create(OpKind::InputRegister("EAX".into()), 32);
    let v1 = c.create(OpKind::InputRegister("EBX".into()), 32);
    let sel = c.create(OpKind::Select, 32);
    c.add_operands(sel, &[idx, v0, v1]);
    let out = c.create(OpKind::OutputRegister("ECX".into()), 32);
    let rc = c.create(OpKind::RegConstraint, 1);
    c.add_operands(rc, &[sel, out]);
    let vi = c.create(OpKind::VerifyInstruction, 1);
    c.add_operand(vi, rc);
    let root = c.root();
    c.add_operand(root, vi);
    (c, sel.as_u32())
}

fn emit(c: &Circuit) -> String {
    let mut g = SegGraph::build(c);
    g.dedup();
    let mut out = Vec::new();
    circ_codegen::emit_decoder_source(&mut out, c, &mut g).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn single_projection_decoders_are_unguarded() {
    let c = linear_circuit();
    let text = emit(&c);

    let vi = c.verify_instructions()[0];
    assert!(text.contains(&format!("void decoder_for_vi{}", vi.as_u32())));
    assert!(text.contains("int stack_counter = 0;"));
    assert!(!text.contains("if "));

    // Preorder push sequence: constraint, add, in, const, out.
    let pushes: Vec<usize> = ["reg_constraint_", "add_", "in_EAX_", "const_", "out_EAX_"]
        .iter()
        .map(|stem| text.find(stem).unwrap_or_else(|| panic!("missing {stem}")))
        .collect();
    let mut sorted = pushes.clone();
    sorted.sort_unstable();
    assert_eq!(pushes, sorted, "pushes must follow the preorder walk");
}

#[test]
fn select_projections_emit_exclusive_guards_sharing_one_emitter() {
    let (c, sel) = select_circuit();
    let text = emit(&c);

    assert!(text.contains(&format!("(select_id_{sel} == 0)")));
    assert!(text.contains(&format!("(select_id_{sel} == 1)")));
    assert_eq!(text.matches("if (").count(), 2);

    // Exactly one emitter declaration, called from both guarded blocks.
    assert_eq!(text.matches("VisRetType ").count(), 1);
    let name = text
        .split("VisRetType ")
        .nth(1)
        .and_then(|rest| rest.split('(').next())
        .expect("emitter declaration present");
    assert_eq!(
        text.matches(&format!("{name}(visitor, stack, &stack_offset)")).count(),
        2
    );

    // The emitter signature matches the emission contract.
    assert!(text.contains(
        "(const VisitorType& visitor, const std::array<MAX_SIZE_INSTR>& stack, int* stack_offset)"
    ));

    // Root subtree (constraint + chosen value + output register) counts 3
    // per projection, two projections per context.
    assert!(text.contains("constexpr int MAX_SIZE_INSTR = 6;"));
}

#[test]
fn emitters_print_before_decoders() {
    let (c, _) = select_circuit();
    let text = emit(&c);
    let emitter_at = text.find("VisRetType ").unwrap();
    let decoder_at = text.find("void decoder_for_vi").unwrap();
    assert!(emitter_at < decoder_at);
}

#[test]
fn emission_is_deterministic() {
    let (c1, _) = select_circuit();
    let (c2, _) = select_circuit();
    assert_eq!(emit(&c1), emit(&c2));
    assert_eq!(emit(&c1), emit(&c1));
}

#[test]
fn every_pushed_handle_is_popped_exactly_once() {
    let c = linear_circuit();
    let text = emit(&c);

    let pushes = text.matches("stack[stack_counter++]").count();
    let pops = text.matches("stack[(*stack_offset)]").count();
    assert_eq!(pushes, 5);
    assert_eq!(pops, 5);
}
