use std::collections::HashSet;

use circ_ir::{BitString, Circuit, OpId, OpKind};
use circ_seg::{preorder_with_choices, SegGraph};
use pretty_assertions::assert_eq;

/// One VI with two sibling constraints of identical shape:
/// `DecodeCondition(Icmp_eq(Advice, Constant))` twice, over distinct nodes.
fn twin_circuit() -> Circuit {
    let mut c = Circuit::new(64);
    let make_branch = |c: &mut Circuit, seed: u64| {
        let adv = c.create(OpKind::Advice, 8);
        let k = c.create(OpKind::Constant(BitString::from_u64(seed, 8)), 8);
        let cmp = c.create(OpKind::Icmp(circ_ir::IcmpKind::Eq), 1);
        c.add_operands(cmp, &[adv, k]);
        let dc = c.create(OpKind::DecodeCondition, 1);
        c.add_operand(dc, cmp);
        dc
    };
    let dc1 = make_branch(&mut c, 1);
    let dc2 = make_branch(&mut c, 2);
    let vi = c.create(OpKind::VerifyInstruction, 1);
    c.add_operands(vi, &[dc1, dc2]);
    let root = c.root();
    c.add_operand(root, vi);
    c
}

#[test]
fn dedup_collapses_isomorphic_siblings() {
    let c = twin_circuit();
    let mut g = SegGraph::build(&c);
    // Two projections, four nodes each.
    assert_eq!(g.live_count(), 8);

    g.dedup();
    // One shared shape chain: DecodeCondition -> Icmp -> leaf, with both
    // leaf positions collapsing onto a single node.
    assert_eq!(g.live_count(), 3);

    let vi = c.verify_instructions()[0];
    let pairs = g.get_nodes_by_vi(vi);
    assert_eq!(pairs.len(), 2);
    // Both projections resolve to the same canonical root.
    assert_eq!(pairs[0].1, pairs[1].1);
    assert_ne!(pairs[0].0.root_in_vi, pairs[1].0.root_in_vi);
}

#[test]
fn post_dedup_hashes_are_unique() {
    let c = twin_circuit();
    let mut g = SegGraph::build(&c);
    g.dedup();

    let mut seen = HashSet::new();
    for id in g.ids() {
        assert!(seen.insert(g.get_hash(id)), "duplicate hash after dedup");
    }
}

#[test]
fn costs_follow_the_fd_rules() {
    let c = twin_circuit();
    let mut g = SegGraph::build(&c);
    g.dedup();
    g.calculate_costs();

    for id in g.ids() {
        let n = g.node(id);
        if n.children.is_empty() {
            assert_eq!(n.inline_cost, 1);
            assert_eq!(n.subtree_count, 1);
        }
    }

    let vi = c.verify_instructions()[0];
    let root = g.get_nodes_by_vi(vi)[0].1;
    let root_node = g.node(root);
    // Root: itself + the comparison child (fd or not, it is below).
    assert!(root_node.fd, "projection roots always become functions");
    assert_eq!(root_node.subtree_count, 4);

    // The comparison has two leaf children: inline cost 3 => fd.
    let cmp = root_node.children[0];
    assert_eq!(g.node(cmp).inline_cost, 3);
    assert!(g.node(cmp).fd);
    // With the comparison outlined, the root absorbs a single call.
    assert_eq!(root_node.inline_cost, 2);
}

#[test]
fn specialization_flags_shared_shapes() {
    let c = twin_circuit();
    let mut g = SegGraph::build(&c);
    g.dedup();
    g.specialize(&c);

    let vi = c.verify_instructions()[0];
    let root = g.get_nodes_by_vi(vi)[0].1;
    // Two distinct DecodeConditions claim the same canonical shape.
    assert!(!g.node(root).specializable);
}

#[test]
#[should_panic(expected = "claimed by multiple circuit operations")]
fn ambiguous_specialization_is_a_hard_error() {
    let c = twin_circuit();
    let mut g = SegGraph::build(&c);
    g.dedup();
    g.specialize(&c);
    let vi = c.verify_instructions()[0];
    let root = g.get_nodes_by_vi(vi)[0].1;
    let _ = g.specialized_op(root);
}

/// Invariant: for every root, the circuit walk under the projection's
/// choices and the SEG walk are shape-isomorphic (equal length, equal child
/// counts step by step).
#[test]
fn tandem_walks_zip_exactly() {
    let mut c = Circuit::new(64);
    let idx = c.create(OpKind::Advice, 1);
    let v0 = c.create(OpKind::InputRegister("EAX".into()), 32);
    let v1 = c.create(OpKind::InputRegister("EBX".into()), 32);
    let sel = c.create(OpKind::Select, 32);
    c.add_operands(sel, &[idx, v0, v1]);
    let k = c.create(OpKind::Constant(BitString::from_u64(9, 32)), 32);
    let add = c.create(OpKind::Add, 32);
    c.add_operands(add, &[sel, k]);
    let out = c.create(OpKind::OutputRegister("EAX".into()), 32);
    let rc = c.create(OpKind::RegConstraint, 1);
    c.add_operands(rc, &[add, out]);
    let vi = c.create(OpKind::VerifyInstruction, 1);
    c.add_operand(vi, rc);
    let root = c.root();
    c.add_operand(root, vi);

    let mut g = SegGraph::build(&c);
    g.dedup();

    for (proj, seg_root) in g.get_nodes_by_vi(vi) {
        let ops: Vec<OpId> = preorder_with_choices(&c, proj.root_in_vi, &proj.select_choices);
        let segs = g.preorder(seg_root);
        assert_eq!(ops.len(), segs.len());
        for (op, seg) in ops.iter().zip(&segs) {
            // Resolved selects never surface in the walk; each op's operand
            // count matches its SEG child count one-to-one.
            assert!(!matches!(c.kind(*op), OpKind::Select));
            assert_eq!(c.operands(*op).len(), g.node(*seg).children.len());
        }
    }
}
