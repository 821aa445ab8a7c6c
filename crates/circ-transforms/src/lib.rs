//! Structural transformation passes over the circuit IR.
//!
//! A pass consumes an owned [`Circuit`] and returns an owned (possibly new)
//! circuit with the same observable semantics. Passes are looked up by name
//! from [`known_passes`] and sequenced by an [`Optimizer`], which sweeps
//! orphaned nodes after every pass and can additionally verify the circuit
//! (defensive layer) and record opcode-histogram snapshots (history layer).

#![forbid(unsafe_code)]

pub mod eqsat;
mod passes;

use std::collections::BTreeMap;

use circ_ir::{verify_circuit, Circuit, NodeHistogram};

pub use passes::{
    CollapseOpsPass, DummyPass, MergeAdviceConstraintsPass, MergeAdvicesPass, OverflowFlagFixPass,
    RemoveIdentityPass, TrivialOrRemovalPass,
};

/// A named structural transformation. Implementations must preserve the
/// circuit's observable semantics; they may leave orphans behind (the runner
/// sweeps after each pass).
pub trait Pass {
    fn run(&self, circuit: Circuit) -> Circuit;
}

/// Registry of recognized passes, ordered by name.
pub fn known_passes() -> BTreeMap<&'static str, fn() -> Box<dyn Pass>> {
    let mut m: BTreeMap<&'static str, fn() -> Box<dyn Pass>> = BTreeMap::new();
    m.insert("collapse-ops", || Box::new(CollapseOpsPass::default()));
    m.insert("dummy", || Box::new(DummyPass));
    m.insert("eqsat", || Box::new(eqsat::EqSatPass::default()));
    m.insert("merge-advices", || Box::new(MergeAdvicesPass));
    m.insert("merge-transitive-advices", || {
        Box::new(MergeAdviceConstraintsPass)
    });
    m.insert("overflow-flag-fix", || Box::new(OverflowFlagFixPass));
    m.insert("remove-identity", || Box::new(RemoveIdentityPass));
    m.insert("remove-trivial-or", || Box::new(TrivialOrRemovalPass));
    m
}

/// Sequential pass runner.
///
/// [`Optimizer::new`] enables both optional layers: verification after each
/// pass (errors abort, warnings are logged) and histogram history for the
/// [`Optimizer::report`] diff chain. [`Optimizer::bare`] runs passes and the
/// orphan sweep only.
pub struct Optimizer {
    passes: Vec<(String, Box<dyn Pass>)>,
    defensive: bool,
    with_history: bool,
    history: Vec<(String, NodeHistogram)>,
}

impl Optimizer {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            defensive: true,
            with_history: true,
            history: Vec::new(),
        }
    }

    pub fn bare() -> Self {
        Self {
            passes: Vec::new(),
            defensive: false,
            with_history: false,
            history: Vec::new(),
        }
    }

    /// Looks `name` up in the registry and appends it to the pipeline.
    /// Unknown names are a caller bug and abort.
    pub fn add_pass(&mut self, name: &str) -> &mut Self {
        let make = known_passes()
            .get(name)
            .copied()
            .unwrap_or_else(|| panic!("unknown pass {name:?}"));
        tracing::info!("adding pass: {name}");
        self.passes.push((name.to_string(), make()));
        self
    }

    pub fn run(&mut self, mut circuit: Circuit) -> Circuit {
        if self.passes.is_empty() {
            return circuit;
        }
        if self.with_history && self.history.is_empty() {
            self.history
                .push(("start".into(), NodeHistogram::collect(&circuit)));
        }
        for (name, pass) in &self.passes {
            tracing::info!("running pass: {name}");
            circuit = pass.run(circuit);
            let swept = circuit.remove_unused();
            tracing::debug!("pass {name} left {swept} orphans");

            if self.defensive {
                let report = verify_circuit(&circuit);
                if report.has_errors() {
                    panic!("verification failed after pass {name}:\n{report}");
                }
                if report.has_warnings() {
                    tracing::warn!("verification after pass {name}:\n{report}");
                }
            }
            if self.with_history {
                self.history
                    .push((name.clone(), NodeHistogram::collect(&circuit)));
            }
        }
        circuit
    }

    /// Renders the recorded histogram chain: the starting counts, one colored
    /// diff per pass, and the final counts.
    pub fn report(&self) -> String {
        if self.history.is_empty() {
            return "no history recorded".into();
        }
        let mut out = String::new();
        let (name, first) = &self.history[0];
        out.push_str(name);
        out.push_str(":\n");
        out.push_str(&first.render());
        for pair in self.history.windows(2) {
            let (_, before) = &pair[0];
            let (name, after) = &pair[1];
            out.push_str(name);
            out.push_str(":\n");
            out.push_str(&before.diff(after));
        }
        out.push_str("\nIn the end:\n");
        out.push_str(&self.history.last().expect("history is non-empty").1.render());
        out
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard simplification pipeline run by the driver before SEG
/// construction.
pub fn default_optimizer() -> Optimizer {
    let mut opt = Optimizer::new();
    opt.add_pass("merge-transitive-advices");
    opt.add_pass("remove-identity");
    opt.add_pass("remove-trivial-or");
    opt
}
