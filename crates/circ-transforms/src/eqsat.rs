//! Equality-saturation pass slot.
//!
//! This hosts the skeletal machinery only: an e-graph with hash-consed
//! nodes and a union-find over equivalence classes, a rewrite-rule seam,
//! and a runner that iterates `match -> apply -> rebuild` until a stop
//! condition. No rules ship with the compiler, so the registered pass is an
//! identity transformation; the slot exists so rule sets can be plugged in
//! without touching the pipeline.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use circ_ir::{Circuit, OpId, OpKind};

use crate::Pass;

/// Equivalence-class id inside an [`EGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(u32);

/// Hash-consed e-node: an opcode applied to equivalence classes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ENode {
    pub kind: OpKind,
    pub size: u32,
    pub children: Vec<ClassId>,
}

/// Minimal e-graph: congruence is restored by [`EGraph::rebuild`] after a
/// batch of unions.
#[derive(Default)]
pub struct EGraph {
    parent: Vec<ClassId>,
    memo: HashMap<ENode, ClassId>,
}

impl EGraph {
    pub fn find(&self, mut id: ClassId) -> ClassId {
        while self.parent[id.0 as usize] != id {
            id = self.parent[id.0 as usize];
        }
        id
    }

    fn canonicalize(&self, node: &ENode) -> ENode {
        ENode {
            kind: node.kind.clone(),
            size: node.size,
            children: node.children.iter().map(|&c| self.find(c)).collect(),
        }
    }

    pub fn add(&mut self, node: ENode) -> ClassId {
        let node = self.canonicalize(&node);
        if let Some(&id) = self.memo.get(&node) {
            return self.find(id);
        }
        let id = ClassId(self.parent.len() as u32);
        self.parent.push(id);
        self.memo.insert(node, id);
        id
    }

    /// Merges two classes; returns whether the graph changed.
    pub fn union(&mut self, a: ClassId, b: ClassId) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        // Smaller id wins, keeping canonical representatives stable.
        let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[drop.0 as usize] = keep;
        true
    }

    /// Re-canonicalizes the memo table after unions so congruent nodes
    /// share a class. Loops to a fixed point because collapsing one pair of
    /// nodes can make another pair congruent.
    pub fn rebuild(&mut self) {
        loop {
            let mut changed = false;
            let old = std::mem::take(&mut self.memo);
            let mut memo = HashMap::with_capacity(old.len());
            for (node, id) in old {
                let node = self.canonicalize(&node);
                let id = self.find(id);
                match memo.get(&node).copied() {
                    Some(existing) if existing != id => {
                        changed |= self.union(existing, id);
                    }
                    Some(_) => {}
                    None => {
                        memo.insert(node, id);
                    }
                }
            }
            self.memo = memo;
            if !changed {
                break;
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.memo.len()
    }

    pub fn class_count(&self) -> usize {
        (0..self.parent.len() as u32)
            .filter(|&i| self.find(ClassId(i)) == ClassId(i))
            .count()
    }

    /// Builds an e-graph over the reachable circuit, returning the class of
    /// every operation.
    pub fn from_circuit(c: &Circuit) -> (EGraph, HashMap<OpId, ClassId>) {
        let mut eg = EGraph::default();
        let mut classes = HashMap::new();
        for id in c.postorder_from(c.root()) {
            let children = c
                .operands(id)
                .iter()
                .map(|o| classes[o])
                .collect();
            let class = eg.add(ENode {
                kind: c.kind(id).clone(),
                size: c.size(id),
                children,
            });
            classes.insert(id, class);
        }
        (eg, classes)
    }
}

/// A matched site: the class a rule wants to act on.
#[derive(Clone, Copy, Debug)]
pub struct Match {
    pub class: ClassId,
}

/// One rewrite rule: `search` proposes sites, `apply` merges in the
/// rewritten form and reports whether anything changed.
pub trait Rewrite {
    fn name(&self) -> &str;
    fn search(&self, egraph: &EGraph) -> Vec<Match>;
    fn apply(&self, egraph: &mut EGraph, matches: &[Match]) -> bool;
}

/// Why the saturation loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Saturated,
    IterationLimit,
    NodeLimit,
    TimeLimit,
}

#[derive(Clone, Copy, Debug)]
pub struct RunnerLimits {
    pub max_iterations: usize,
    pub max_nodes: usize,
    pub max_time: Duration,
}

impl Default for RunnerLimits {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            max_nodes: 100_000,
            max_time: Duration::from_secs(5),
        }
    }
}

pub struct EqSatRunner {
    pub egraph: EGraph,
    pub limits: RunnerLimits,
}

impl EqSatRunner {
    pub fn new(egraph: EGraph) -> Self {
        Self {
            egraph,
            limits: RunnerLimits::default(),
        }
    }

    pub fn run(&mut self, rules: &[Box<dyn Rewrite>]) -> StopReason {
        self.egraph.rebuild();
        let start = Instant::now();
        for _ in 0..self.limits.max_iterations {
            if start.elapsed() >= self.limits.max_time {
                return StopReason::TimeLimit;
            }
            if self.egraph.node_count() >= self.limits.max_nodes {
                return StopReason::NodeLimit;
            }

            let matches: Vec<(usize, Vec<Match>)> = rules
                .iter()
                .enumerate()
                .map(|(i, rule)| (i, rule.search(&self.egraph)))
                .collect();

            let mut changed = false;
            for (i, m) in &matches {
                changed |= rules[*i].apply(&mut self.egraph, m);
            }
            self.egraph.rebuild();

            if !changed {
                return StopReason::Saturated;
            }
        }
        StopReason::IterationLimit
    }
}

/// The registered `eqsat` pass. Holding no rules, it saturates immediately
/// and returns the circuit unchanged; plugging rules in enables rewriting
/// inside the e-graph (extraction back to a circuit is the rule set's
/// responsibility via the class map).
#[derive(Default)]
pub struct EqSatPass {
    pub rules: Vec<Box<dyn Rewrite>>,
}

impl Pass for EqSatPass {
    fn run(&self, circuit: Circuit) -> Circuit {
        tracing::info!("equality saturation: start");
        let (egraph, _classes) = EGraph::from_circuit(&circuit);
        let mut runner = EqSatRunner::new(egraph);
        let stop = runner.run(&self.rules);
        tracing::info!(
            "equality saturation: stopped ({stop:?}), {} nodes / {} classes",
            runner.egraph.node_count(),
            runner.egraph.class_count()
        );
        circuit
    }
}
