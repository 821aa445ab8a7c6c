//! Post-construction analyses: structural-hash deduplication, inline-cost
//! and subtree-size metrics, and root specialization.

use std::collections::HashMap;

use circ_ir::{Circuit, OpId};

use crate::graph::{SegGraph, SegId};
use crate::resolve_op;

impl SegGraph {
    /// Structural-hash deduplication.
    ///
    /// For each hash bucket the canonical node is the first observed in
    /// insertion order; every surviving child pointer is rewritten in one
    /// bulk pass and the canonical node absorbs the root metadata of the
    /// nodes it replaces. Afterwards, distinct live nodes have distinct
    /// hashes.
    pub fn dedup(&mut self) {
        // Hashes are pure shape, so they can be memoized bottom-up before
        // any rewriting: merging equal shapes never changes a hash.
        let mut hashes: HashMap<SegId, String> = HashMap::new();
        for id in self.postorder() {
            let node = self.node(id);
            let mut h = format!("{}|", node.children.len());
            for child in &node.children {
                h.push_str(&hashes[child]);
            }
            hashes.insert(id, h);
        }

        let mut canonical: HashMap<&str, SegId> = HashMap::new();
        let mut remap: HashMap<SegId, SegId> = HashMap::new();
        for id in self.ids() {
            let h = hashes[&id].as_str();
            match canonical.get(h).copied() {
                Some(first) => {
                    remap.insert(id, first);
                }
                None => {
                    canonical.insert(h, id);
                }
            }
        }

        let all: Vec<SegId> = self.ids().collect();
        for id in all {
            if let Some(&keep) = remap.get(&id) {
                let dropped = self.slots[id.index()]
                    .take()
                    .expect("dedup visits live nodes once");
                let target = self.node_mut(keep);
                target.is_root |= dropped.is_root;
                target.valid_for_contexts.extend(dropped.valid_for_contexts);
            } else {
                for child in &mut self.node_mut(id).children {
                    if let Some(&keep) = remap.get(child) {
                        *child = keep;
                    }
                }
            }
        }
        tracing::debug!("dedup merged {} nodes", remap.len());
    }

    /// Bottom-up cost metrics.
    ///
    /// `inline_cost` counts the statements a caller would absorb if the
    /// subtree were expanded in place, with already-outlined children
    /// contributing a single call. Any node worth at least two statements,
    /// and any projection root, becomes a function declaration.
    pub fn calculate_costs(&mut self) {
        for id in self.postorder() {
            let node = self.node(id);
            let mut inline_cost = 1u32;
            let mut subtree_count = 1u32;
            for &child in &node.children {
                let c = self.node(child);
                inline_cost += if c.fd { 1 } else { c.inline_cost };
                subtree_count += c.subtree_count;
            }
            let node = self.node_mut(id);
            node.inline_cost = inline_cost;
            node.subtree_count = subtree_count;
            if inline_cost >= 2 || node.is_root {
                node.fd = true;
            }
        }
    }

    /// Attaches to every SEG node the circuit operation it was projected
    /// from, walking each root's circuit subtree (under the projection's
    /// choices) in lock-step with the SEG shape. A node claimed by two
    /// distinct operations keeps no attachment and loses `specializable`.
    pub fn specialize(&mut self, circuit: &Circuit) {
        let roots: Vec<SegId> = self
            .postorder()
            .into_iter()
            .filter(|&id| self.node(id).is_root)
            .collect();
        for root in roots {
            for proj in self.node(root).valid_for_contexts.clone() {
                let op = resolve_op(circuit, proj.root_in_vi, &proj.select_choices);
                self.specialize_rec(circuit, root, op, &proj.select_choices);
            }
        }
    }

    fn specialize_rec(
        &mut self,
        circuit: &Circuit,
        seg: SegId,
        op: OpId,
        choices: &[crate::SelectChoice],
    ) {
        match self.attached.get(&seg).copied() {
            Some(existing) if existing != op => {
                self.node_mut(seg).specializable = false;
            }
            Some(_) => {}
            None => {
                self.attached.insert(seg, op);
            }
        }

        let children = self.node(seg).children.clone();
        assert_eq!(
            circuit.operands(op).len(),
            children.len(),
            "projection shape diverged from circuit operation {}",
            op.as_u32()
        );
        for (i, child) in children.into_iter().enumerate() {
            let child_op = resolve_op(circuit, circuit.operand(op, i), choices);
            self.specialize_rec(circuit, child, child_op, choices);
        }
    }

    /// The circuit operation a SEG node specializes to. Asking for an
    /// ambiguous or unattached node is a caller bug.
    pub fn specialized_op(&self, id: SegId) -> OpId {
        assert!(
            self.node(id).specializable,
            "SEG node {} is claimed by multiple circuit operations",
            self.node(id).debug_id
        );
        *self
            .attached
            .get(&id)
            .unwrap_or_else(|| panic!("SEG node {} was never specialized", self.node(id).debug_id))
    }

    /// Maximum stack depth any verify context needs: the largest sum of
    /// `subtree_count` over one context's `(projection, root)` pairs.
    pub fn max_vi_stack_size(&self, circuit: &Circuit) -> u32 {
        circuit
            .verify_instructions()
            .into_iter()
            .map(|vi| {
                self.get_nodes_by_vi(vi)
                    .iter()
                    .map(|(_, root)| self.node(*root).subtree_count)
                    .sum::<u32>()
            })
            .max()
            .unwrap_or(0)
    }
}
