//! Decoder compiler driver.
//!
//! Pipeline: load one circuit input, verify it, run the default
//! simplification passes, project the verify contexts into a SEG,
//! deduplicate and specialize it, then emit the semantics-emitter functions
//! and the per-context decoders.
//!
//! Exit codes: `0` success, `1` CLI misuse (including the help/version
//! paths), `3` input loading failure.

#![forbid(unsafe_code)]

mod frontend;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser};

use circ_ir::{print_dot, verify_circuit, Circuit};
use circ_seg::SegGraph;
use circ_transforms::default_optimizer;
use frontend::{load_circuit, Input, NullLifter};

#[derive(Debug, Parser)]
#[command(
    name = "circ-decoder",
    about = "Compiles a circuit IR into decoder + semantics-emitter source",
    group(
        ArgGroup::new("input")
            .required(true)
            .args(["bytes_in", "ir_in", "smt_in", "ciff_in"])
    )
)]
struct Args {
    /// Hex representation of raw instruction bytes to be lifted.
    #[arg(long)]
    bytes_in: Option<String>,

    /// Path to a serialized circuit IR file.
    #[arg(long)]
    ir_in: Option<PathBuf>,

    /// Path to an input smt2 file.
    #[arg(long)]
    smt_in: Option<PathBuf>,

    /// Path to a seed-debug file wrapping raw instruction bytes.
    #[arg(long)]
    ciff_in: Option<PathBuf>,

    /// Path for the emitted decoder source (stdout when omitted).
    #[arg(long)]
    dec_out: Option<PathBuf>,

    /// Path for a GraphViz DOT dump of the simplified circuit.
    #[arg(long)]
    dot_out: Option<PathBuf>,

    /// Opcode names to highlight in the DOT dump.
    #[arg(long)]
    dot_highlight: Vec<String>,

    /// Target architecture name, forwarded to the lifter.
    #[arg(long, default_value = "amd64")]
    arch: String,

    /// Target OS name, forwarded to the lifter.
    #[arg(long, default_value = "linux")]
    os: String,
}

impl Args {
    fn input(&self) -> Input {
        if let Some(hex) = &self.bytes_in {
            Input::Bytes(hex.clone())
        } else if let Some(path) = &self.ir_in {
            Input::IrFile(path.clone())
        } else if let Some(path) = &self.smt_in {
            Input::SmtFile(path.clone())
        } else if let Some(path) = &self.ciff_in {
            Input::CiffFile(path.clone())
        } else {
            unreachable!("clap enforces that exactly one input is present");
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version land here too; the tool's only success path
            // is a compilation.
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let circuit = match load_circuit(&args.input(), &NullLifter, &args.arch, &args.os) {
        Ok(circuit) => circuit,
        Err(err) => {
            tracing::error!("not able to load circuit: {err}");
            return ExitCode::from(3);
        }
    };

    match compile(&args, circuit) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Pipeline failures are invariant violations, not user errors.
            panic!("compilation failed: {err:#}");
        }
    }
}

fn compile(args: &Args, circuit: Circuit) -> anyhow::Result<()> {
    let report = verify_circuit(&circuit);
    if report.has_errors() {
        panic!("loaded circuit is malformed:\n{report}");
    }
    if report.has_warnings() {
        tracing::warn!("loaded circuit:\n{report}");
    }

    let mut opt = default_optimizer();
    let circuit = opt.run(circuit);
    eprintln!("{}", opt.report());

    if let Some(dot_out) = &args.dot_out {
        let mut f = File::create(dot_out)
            .with_context(|| format!("failed to create {}", dot_out.display()))?;
        print_dot(&mut f, &circuit, &args.dot_highlight)
            .with_context(|| format!("failed to write {}", dot_out.display()))?;
    }

    let mut seg = SegGraph::build(&circuit);
    tracing::info!("SEG starts with {} nodes", seg.live_count());
    seg.dedup();
    tracing::info!("SEG deduplicated to {} nodes", seg.live_count());
    seg.specialize(&circuit);

    match &args.dec_out {
        Some(path) => {
            let mut f = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            circ_codegen::emit_decoder_source(&mut f, &circuit, &mut seg)
                .with_context(|| format!("failed to write {}", path.display()))?;
            f.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            circ_codegen::emit_decoder_source(&mut out, &circuit, &mut seg)
                .context("failed to write decoder source to stdout")?;
            out.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn rejects_zero_inputs() {
        let err = Args::try_parse_from(["circ-decoder"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_multiple_inputs() {
        let err = Args::try_parse_from([
            "circ-decoder",
            "--bytes-in",
            "90",
            "--ir-in",
            "circuit.json",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn accepts_exactly_one_input() {
        let args =
            Args::try_parse_from(["circ-decoder", "--ir-in", "circuit.json"]).unwrap();
        assert!(matches!(args.input(), Input::IrFile(_)));
        assert_eq!(args.arch, "amd64");
    }

    #[test]
    fn help_is_a_clap_error() {
        let err = Args::try_parse_from(["circ-decoder", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
