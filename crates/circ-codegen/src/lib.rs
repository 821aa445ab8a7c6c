//! Emission engine: the language-neutral AST, its pretty-printer, and the
//! two synthesis phases that turn a deduplicated SEG into decoder source.
//! Phase 1 prints the shared semantics-emitter functions, phase 2 prints
//! one decoder per verify context.

#![forbid(unsafe_code)]

pub mod ast;
mod decoder;
mod emit;
pub mod printer;

use std::io;

use circ_ir::Circuit;
use circ_seg::SegGraph;

pub use decoder::{decoder_for_vi, max_size_decl, print_decoders};
pub use emit::{expr_for_node, prepare, print_semantics_emitters, FunctionTable, UniqueNameStorage};
pub use printer::{render, ExpressionPrinter};

/// Runs both emission phases over a deduplicated SEG and writes the full
/// decoder source: the stack-capacity constant, then the emitters, then the
/// per-context decoders. Byte-identical across runs on the same input.
pub fn emit_decoder_source<W: io::Write>(
    w: &mut W,
    circuit: &Circuit,
    g: &mut SegGraph,
) -> io::Result<()> {
    let table = prepare(g, circuit);
    let max_size = g.max_vi_stack_size(circuit);
    ExpressionPrinter::new(w).print(&max_size_decl(max_size))?;
    w.write_all(b"\n")?;
    print_semantics_emitters(w, g, &table)?;
    print_decoders(w, circuit, g, &table)
}
