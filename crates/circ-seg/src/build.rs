//! Projection construction: the down-tree walk from each verify context's
//! constraint roots to the leaves, with per-path select resolution.

use std::collections::VecDeque;

use circ_ir::{Circuit, OpId, OpKind};

use crate::graph::{InstructionProjection, SegGraph, SegId, SelectChoice};

pub(crate) fn build(circuit: &Circuit) -> SegGraph {
    let mut g = SegGraph::default();

    for (vi_idx, &vi) in circuit.verify_instructions().iter().enumerate() {
        let paths = constraint_roots(circuit, vi);
        tracing::debug!(
            "verify instruction {} has {} constraint paths",
            vi.as_u32(),
            paths.len()
        );

        for (path_idx, &root) in paths.iter().enumerate() {
            // Each pending entry is a partially committed choice list. The
            // first walk commits index 0 at every select it reaches and
            // enqueues one fork per remaining index; forks rediscover any
            // selects nested below their own choice, so every reachable
            // combination is built exactly once.
            let mut pending: VecDeque<Vec<SelectChoice>> = VecDeque::new();
            pending.push_back(Vec::new());
            let mut variant = 0u32;

            while let Some(mut choices) = pending.pop_front() {
                let prefix = format!("vi_{vi_idx}_path{path_idx}_opt{variant}");
                let mut counter = 0u32;
                let seg_root = extend(
                    circuit,
                    &mut g,
                    root,
                    &mut choices,
                    &mut pending,
                    &prefix,
                    &mut counter,
                );
                let node = g.node_mut(seg_root);
                node.is_root = true;
                node.valid_for_contexts.push(InstructionProjection {
                    vi,
                    root_in_vi: root,
                    select_choices: choices,
                });
                variant += 1;
            }
        }
    }
    g
}

/// Constraint operations rooting a leaf-to-top path in `vi`'s subtree.
/// Advice constraints contribute no emission of their own; their values
/// are pulled in by the constraints that reference the advice.
fn constraint_roots(circuit: &Circuit, vi: OpId) -> Vec<OpId> {
    circuit
        .preorder_from(vi)
        .into_iter()
        .filter(|&id| {
            id != vi
                && circuit.kind(id).is_constraint()
                && !matches!(circuit.kind(id), OpKind::AdviceConstraint)
        })
        .collect()
}

/// Builds one SEG node per visited circuit operation, top down. Fresh nodes
/// per projection: sharing is dedup's job, duplication per path is the
/// construction invariant.
fn extend(
    circuit: &Circuit,
    g: &mut SegGraph,
    op: OpId,
    choices: &mut Vec<SelectChoice>,
    pending: &mut VecDeque<Vec<SelectChoice>>,
    prefix: &str,
    counter: &mut u32,
) -> SegId {
    let op = resolve_or_fork(circuit, op, choices, pending);
    let id = g.create(format!("{prefix}_node{counter}"));
    *counter += 1;
    for i in 0..circuit.operands(op).len() {
        let child = extend(
            circuit,
            g,
            circuit.operand(op, i),
            choices,
            pending,
            prefix,
            counter,
        );
        g.node_mut(id).children.push(child);
    }
    id
}

/// Substitutes a select by its chosen value. The first time a select is
/// reached, the current projection commits index 0 and one fork per other
/// index is queued.
fn resolve_or_fork(
    circuit: &Circuit,
    mut op: OpId,
    choices: &mut Vec<SelectChoice>,
    pending: &mut VecDeque<Vec<SelectChoice>>,
) -> OpId {
    while matches!(circuit.kind(op), OpKind::Select) {
        let committed = choices
            .iter()
            .find(|c| c.select == op)
            .map(|c| c.chosen_index);
        let chosen = match committed {
            Some(idx) => idx,
            None => {
                let options = 1u32 << circuit.select_bits(op);
                for j in 1..options {
                    let mut forked = choices.clone();
                    forked.push(SelectChoice {
                        select: op,
                        chosen_index: j,
                    });
                    pending.push_back(forked);
                }
                choices.push(SelectChoice {
                    select: op,
                    chosen_index: 0,
                });
                0
            }
        };
        op = circuit.operand(op, 1 + chosen as usize);
    }
    op
}

#[cfg(test)]
mod tests {
    use circ_ir::{BitString, Circuit, OpKind};
    use pretty_assertions::assert_eq;

    use crate::SegGraph;

    /// One VI: `RegConstraint(Add(in_EAX, const), out_EAX)`.
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

    #[test]
    fn one_projection_per_constraint_path() {
        let c = linear_circuit();
        let g = SegGraph::build(&c);
        let vi = c.verify_instructions()[0];
        let pairs = g.get_nodes_by_vi(vi);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].0.select_choices.is_empty());

        // RegConstraint, Add, in, const, out.
        assert_eq!(g.live_count(), 5);
        let root = pairs[0].1;
        assert_eq!(g.node(root).children.len(), 2);
    }

    #[test]
    fn advice_constraints_root_no_path() {
        let mut c = Circuit::new(64);
        let adv = c.create(OpKind::Advice, 8);
        let k = c.create(OpKind::Constant(BitString::from_u64(7, 8)), 8);
        let ac = c.create(OpKind::AdviceConstraint, 1);
        c.add_operands(ac, &[adv, k]);
        let cmp = c.create(OpKind::Icmp(circ_ir::IcmpKind::Eq), 1);
        c.add_operands(cmp, &[adv, adv]);
        let dc = c.create(OpKind::DecodeCondition, 1);
        c.add_operand(dc, cmp);
        let vi = c.create(OpKind::VerifyInstruction, 1);
        c.add_operands(vi, &[ac, dc]);
        let root = c.root();
        c.add_operand(root, vi);

        let g = SegGraph::build(&c);
        let pairs = g.get_nodes_by_vi(vi);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.root_in_vi, dc);
    }

    #[test]
    fn selects_fork_one_projection_per_index() {
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

        let g = SegGraph::build(&c);
        let pairs = g.get_nodes_by_vi(vi);
        assert_eq!(pairs.len(), 2);

        let choices: Vec<_> = pairs
            .iter()
            .map(|(p, _)| {
                assert_eq!(p.select_choices.len(), 1);
                assert_eq!(p.select_choices[0].select, sel);
                p.select_choices[0].chosen_index
            })
            .collect();
        assert_eq!(choices, vec![0, 1]);

        // Both projections have the same two-child shape: the select is
        // substituted by its chosen value.
        for (_, seg_root) in &pairs {
            assert_eq!(g.node(*seg_root).children.len(), 2);
            let value_side = g.node(*seg_root).children[0];
            assert!(g.node(value_side).children.is_empty());
        }
    }

    #[test]
    fn nested_selects_fork_combinatorially() {
        let mut c = Circuit::new(64);
        let i1 = c.create(OpKind::Advice, 1);
        let i2 = c.create(OpKind::Advice, 1);
        let a = c.create(OpKind::InputRegister("A".into()), 8);
        let b = c.create(OpKind::InputRegister("B".into()), 8);
        let inner = c.create(OpKind::Select, 8);
        c.add_operands(inner, &[i2, a, b]);
        let d = c.create(OpKind::InputRegister("D".into()), 8);
        let outer = c.create(OpKind::Select, 8);
        c.add_operands(outer, &[i1, inner, d]);
        let out = c.create(OpKind::OutputRegister("E".into()), 8);
        let rc = c.create(OpKind::RegConstraint, 1);
        c.add_operands(rc, &[outer, out]);
        let vi = c.create(OpKind::VerifyInstruction, 1);
        c.add_operand(vi, rc);
        let root = c.root();
        c.add_operand(root, vi);

        let g = SegGraph::build(&c);
        let pairs = g.get_nodes_by_vi(vi);
        // outer=0 reaches the inner select (2 forks); outer=1 skips it.
        assert_eq!(pairs.len(), 3);
        let choice_counts: Vec<usize> =
            pairs.iter().map(|(p, _)| p.select_choices.len()).collect();
        assert!(choice_counts.contains(&1));
        assert!(choice_counts.contains(&2));
    }
}
