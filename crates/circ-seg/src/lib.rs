//! Shared-Expression Graph (SEG).
//!
//! The SEG is a second, shape-normalized view of a circuit: every verify
//! context is projected down to its constraint leaves, one projection per
//! resolved combination of `Select` choices, and isomorphic subtrees are
//! then deduplicated by structural hash so common semantic fragments can
//! share a single emitter function.
//!
//! A [`SegNode`] is pure shape (an ordered child list plus book-keeping),
//! which is exactly why dedup may merge nodes that were derived from
//! unrelated circuit operations.

#![forbid(unsafe_code)]

mod analysis;
mod build;
mod graph;

pub use graph::{InstructionProjection, SegGraph, SegId, SegNode, SelectChoice};

use circ_ir::{Circuit, OpId, OpKind};

impl SegGraph {
    /// Projects every verify context of `circuit` into a fresh SEG.
    pub fn build(circuit: &Circuit) -> SegGraph {
        build::build(circuit)
    }
}

/// Follows `Select` chains: a select with a committed choice stands for its
/// chosen value operand. An uncommitted select here is an invariant
/// violation (projection construction commits every select it reaches).
pub fn resolve_op(circuit: &Circuit, mut op: OpId, choices: &[SelectChoice]) -> OpId {
    while matches!(circuit.kind(op), OpKind::Select) {
        let chosen = choices
            .iter()
            .find(|c| c.select == op)
            .map(|c| c.chosen_index)
            .unwrap_or_else(|| {
                panic!("select {} has no committed choice", op.as_u32());
            });
        op = circuit.operand(op, 1 + chosen as usize);
    }
    op
}

/// Non-unique preorder walk of a circuit subtree under a choice assignment.
/// Shared operations are yielded once per path, matching the per-path
/// duplication of the SEG side of a tandem walk.
pub fn preorder_with_choices(circuit: &Circuit, root: OpId, choices: &[SelectChoice]) -> Vec<OpId> {
    let mut out = Vec::new();
    walk(circuit, root, choices, &mut out);
    return out;

    fn walk(circuit: &Circuit, op: OpId, choices: &[SelectChoice], out: &mut Vec<OpId>) {
        let op = resolve_op(circuit, op, choices);
        out.push(op);
        for i in 0..circuit.operands(op).len() {
            walk(circuit, circuit.operand(op, i), choices, out);
        }
    }
}
