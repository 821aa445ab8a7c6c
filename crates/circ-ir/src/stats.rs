use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use crate::circuit::{Circuit, OpId};
use crate::visit::{UniqueVisitor, Visitor};

/// Per-opcode node counts over the reachable part of a circuit.
///
/// Keys are ordered so two histograms can be diffed in one merge pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeHistogram {
    counts: BTreeMap<String, u64>,
}

struct Counter {
    hist: NodeHistogram,
    seen: HashSet<OpId>,
}

impl Visitor for Counter {
    fn default_visit(&mut self, c: &Circuit, id: OpId) {
        *self.hist.counts.entry(c.kind(id).name()).or_insert(0) += 1;
        self.traverse_unique(c, id);
    }
}

impl UniqueVisitor for Counter {
    fn seen(&mut self) -> &mut HashSet<OpId> {
        &mut self.seen
    }
}

impl NodeHistogram {
    pub fn collect(c: &Circuit) -> Self {
        let mut counter = Counter {
            hist: NodeHistogram::default(),
            seen: HashSet::new(),
        };
        counter.dispatch_unique(c, c.root());
        counter.hist
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn count(&self, opcode: &str) -> u64 {
        self.counts.get(opcode).copied().unwrap_or(0)
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Node counts:\n");
        for (name, count) in &self.counts {
            let _ = writeln!(out, " {name} {count}");
        }
        out
    }

    /// Colored per-opcode delta against `self` (the older snapshot).
    /// Increases render red, decreases green; unchanged opcodes are skipped.
    pub fn diff(&self, newer: &NodeHistogram) -> String {
        let mut out = String::new();
        let keys: BTreeMap<&str, ()> = self
            .counts
            .keys()
            .chain(newer.counts.keys())
            .map(|k| (k.as_str(), ()))
            .collect();
        for name in keys.keys() {
            let before = self.count(name);
            let after = newer.count(name);
            if before == after {
                continue;
            }
            let delta = after as i64 - before as i64;
            let colored = if delta > 0 {
                format!("\x1b[91m+{delta}\x1b[0m")
            } else {
                format!("\x1b[92m{delta}\x1b[0m")
            };
            let _ = writeln!(out, " {name}( {colored} )");
        }
        if out.is_empty() {
            out.push_str(" (no change)\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OpKind;

    fn small_circuit() -> Circuit {
        let mut c = Circuit::new(64);
        let a = c.create(OpKind::Advice, 8);
        let b = c.create(OpKind::Advice, 8);
        let add = c.create(OpKind::Add, 8);
        c.add_operands(add, &[a, b]);
        let dc = c.create(OpKind::DecodeCondition, 1);
        c.add_operand(dc, add);
        let vi = c.create(OpKind::VerifyInstruction, 1);
        c.add_operand(vi, dc);
        let root = c.root();
        c.add_operand(root, vi);
        c
    }

    #[test]
    fn counts_shared_nodes_once() {
        let c = small_circuit();
        let h = NodeHistogram::collect(&c);
        assert_eq!(h.count("Advice"), 2);
        assert_eq!(h.count("Add"), 1);
        assert_eq!(h.count("Root"), 1);
        assert_eq!(h.total(), 6);
    }

    #[test]
    fn diff_reports_deltas_only() {
        let c = small_circuit();
        let before = NodeHistogram::collect(&c);
        let mut c2 = small_circuit();
        let extra = c2.create(OpKind::Advice, 8);
        let dc = c2
            .ids_where(|k| matches!(k, OpKind::DecodeCondition))
            .next()
            .unwrap();
        c2.add_operand(dc, extra);
        let after = NodeHistogram::collect(&c2);

        let report = before.diff(&after);
        assert!(report.contains("Advice"));
        assert!(!report.contains("Add"));
        assert_eq!(before.diff(&before), " (no change)\n");
    }
}
