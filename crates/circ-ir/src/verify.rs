use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::circuit::{Circuit, OpId};
use crate::op::OpKind;

/// Outcome of a structural verification pass over a circuit.
///
/// Errors are invariant violations a transformation must never introduce;
/// warnings are suspicious-but-tolerated shapes (e.g. an advice that is not
/// yet bound within a context).
#[derive(Debug, Default)]
pub struct VerifyReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl VerifyReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn error(&mut self, c: &Circuit, id: OpId, msg: impl fmt::Display) {
        self.errors
            .push(format!("{} (id {}): {msg}", c.kind(id).name(), id.as_u32()));
    }

    fn warn(&mut self, c: &Circuit, id: OpId, msg: impl fmt::Display) {
        self.warnings
            .push(format!("{} (id {}): {msg}", c.kind(id).name(), id.as_u32()));
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.errors {
            writeln!(f, "error: {e}")?;
        }
        for w in &self.warnings {
            writeln!(f, "warning: {w}")?;
        }
        Ok(())
    }
}

/// Checks every structural invariant of the node model: per-opcode operand
/// counts and widths, acyclicity, and advice binding discipline.
pub fn verify_circuit(c: &Circuit) -> VerifyReport {
    let mut rep = VerifyReport::default();

    if let Some(cycle_at) = find_cycle(c) {
        rep.error(c, cycle_at, "operation is its own ancestor");
        // Width checks below assume a DAG; still run them, they only look
        // one level deep.
    }

    for id in c.preorder_from(c.root()) {
        check_op(c, id, &mut rep);
    }

    check_advice_binding(c, &mut rep);

    rep
}

fn operand_count(c: &Circuit, id: OpId, expected: usize, rep: &mut VerifyReport) -> bool {
    let got = c.operands(id).len();
    if got != expected {
        rep.error(c, id, format!("expected {expected} operands, got {got}"));
        return false;
    }
    true
}

fn check_op(c: &Circuit, id: OpId, rep: &mut VerifyReport) {
    let size = c.size(id);
    match c.kind(id) {
        OpKind::InputRegister(_)
        | OpKind::OutputRegister(_)
        | OpKind::InputInstructionBits
        | OpKind::InputTimestamp
        | OpKind::OutputTimestamp
        | OpKind::Advice
        | OpKind::Undefined => {
            operand_count(c, id, 0, rep);
        }
        OpKind::InputErrorFlag | OpKind::OutputErrorFlag => {
            operand_count(c, id, 0, rep);
            if size != 1 {
                rep.error(c, id, format!("error flag must have width 1, has {size}"));
            }
        }
        OpKind::Constant(bits) => {
            operand_count(c, id, 0, rep);
            if bits.len() != size {
                rep.error(
                    c,
                    id,
                    format!("literal is {} bits but node width is {size}", bits.len()),
                );
            }
        }

        OpKind::Add
        | OpKind::Sub
        | OpKind::Mul
        | OpKind::UDiv
        | OpKind::SDiv
        | OpKind::And
        | OpKind::Or
        | OpKind::Xor
        | OpKind::Shl
        | OpKind::LShr
        | OpKind::AShr => {
            // `Or`/`And` appear with a single operand mid-pipeline; the
            // collapse passes remove them. Anything else is binary.
            let n = c.operands(id).len();
            if n == 0 || n > 2 {
                rep.error(c, id, format!("expected 1 or 2 operands, got {n}"));
            }
            for &o in c.operands(id) {
                if c.size(o) != size {
                    rep.error(
                        c,
                        id,
                        format!("operand width {} != result width {size}", c.size(o)),
                    );
                }
            }
        }

        OpKind::Not => {
            if operand_count(c, id, 1, rep) && c.size(c.operand(id, 0)) != size {
                rep.error(c, id, "operand width differs from result width");
            }
        }
        OpKind::Parity => {
            operand_count(c, id, 1, rep);
            if size != 1 {
                rep.error(c, id, format!("parity must have width 1, has {size}"));
            }
        }
        OpKind::PopulationCount | OpKind::CountLeadingZeroes | OpKind::CountTrailingZeroes => {
            if operand_count(c, id, 1, rep) && c.size(c.operand(id, 0)) != size {
                rep.error(c, id, "operand width differs from result width");
            }
        }

        OpKind::Trunc => {
            if operand_count(c, id, 1, rep) && c.size(c.operand(id, 0)) <= size {
                rep.error(c, id, "truncation must narrow its operand");
            }
        }
        OpKind::ZExt | OpKind::SExt => {
            if operand_count(c, id, 1, rep) && c.size(c.operand(id, 0)) >= size {
                rep.error(c, id, "extension must widen its operand");
            }
        }
        OpKind::Extract { high, low } => {
            if operand_count(c, id, 1, rep) {
                let ow = c.size(c.operand(id, 0));
                if !(low < high && *high <= ow) {
                    rep.error(
                        c,
                        id,
                        format!("slice [{low}, {high}) out of range for {ow}-bit operand"),
                    );
                } else if size != high - low {
                    rep.error(
                        c,
                        id,
                        format!("result width {size} != slice width {}", high - low),
                    );
                }
            }
        }
        OpKind::Concat => {
            if c.operands(id).is_empty() {
                rep.error(c, id, "concat with no operands");
            } else {
                let sum: u32 = c.operands(id).iter().map(|&o| c.size(o)).sum();
                if sum != size {
                    rep.error(
                        c,
                        id,
                        format!("result width {size} != sum of operand widths {sum}"),
                    );
                }
            }
        }
        OpKind::Select => {
            let n = c.operands(id).len();
            if n < 3 {
                rep.error(c, id, format!("select needs an index and 2+ values, got {n}"));
            } else {
                let bits = c.size(c.operand(id, 0));
                if bits == 0 || bits >= 31 {
                    rep.error(c, id, format!("unreasonable index width {bits}"));
                } else if n != 1 + (1usize << bits) {
                    rep.error(
                        c,
                        id,
                        format!("{bits}-bit index implies {} values, got {}", 1u32 << bits, n - 1),
                    );
                }
                for &v in &c.operands(id)[1..] {
                    if c.size(v) != size {
                        rep.error(c, id, "select values must all have the result width");
                        break;
                    }
                }
            }
        }
        OpKind::BSelect => {
            if operand_count(c, id, 3, rep) {
                if c.size(c.operand(id, 0)) != 1 {
                    rep.error(c, id, "bselect condition must have width 1");
                }
                if c.size(c.operand(id, 1)) != size || c.size(c.operand(id, 2)) != size {
                    rep.error(c, id, "bselect arms must have the result width");
                }
            }
        }

        OpKind::Icmp(_) => {
            if size != 1 {
                rep.error(c, id, format!("comparison must have width 1, has {size}"));
            }
            if operand_count(c, id, 2, rep)
                && c.size(c.operand(id, 0)) != c.size(c.operand(id, 1))
            {
                rep.error(c, id, "comparison operands must have equal widths");
            }
        }

        OpKind::RegConstraint | OpKind::PreservedConstraint | OpKind::CopyConstraint => {
            if size != 1 {
                rep.error(c, id, format!("constraint must have width 1, has {size}"));
            }
            operand_count(c, id, 2, rep);
        }
        OpKind::AdviceConstraint => {
            if size != 1 {
                rep.error(c, id, format!("constraint must have width 1, has {size}"));
            }
            if operand_count(c, id, 2, rep) {
                let advice = c.operand(id, 0);
                // After advice widening the bound side is a slice of the
                // wide advice rather than an advice leaf.
                let is_advice_slice = matches!(c.kind(advice), OpKind::Extract { .. })
                    && c
                        .operands(advice)
                        .first()
                        .is_some_and(|&o| matches!(c.kind(o), OpKind::Advice));
                if !matches!(c.kind(advice), OpKind::Advice) && !is_advice_slice {
                    rep.error(c, id, "operand 0 must be the bound advice");
                } else if matches!(c.kind(c.operand(id, 1)), OpKind::Advice) {
                    rep.warn(c, id, "advice bound to another advice (pending merge)");
                }
                if c.size(advice) != c.size(c.operand(id, 1)) {
                    rep.error(c, id, "advice and defining value must have equal widths");
                }
            }
        }
        OpKind::DecodeCondition | OpKind::ReadConstraint | OpKind::WriteConstraint => {
            if size != 1 {
                rep.error(c, id, format!("constraint must have width 1, has {size}"));
            }
            if c.operands(id).is_empty() {
                rep.error(c, id, "constraint with no operands");
            }
        }
        OpKind::OnlyOneCondition => {
            if size != 1 {
                rep.error(c, id, format!("constraint must have width 1, has {size}"));
            }
            for &o in c.operands(id) {
                if c.size(o) != 1 {
                    rep.error(c, id, "exactly-one operands must have width 1");
                    break;
                }
            }
        }

        OpKind::VerifyInstruction => {
            if size != 1 {
                rep.error(c, id, "verify context must have width 1");
            }
            for &o in c.operands(id) {
                if c.size(o) != 1 {
                    rep.error(c, id, "verify context conjuncts must have width 1");
                    break;
                }
            }
        }
        OpKind::Root => {
            if id != c.root() {
                rep.error(c, id, "root operation reachable from the root");
            }
            for &o in c.operands(id) {
                if !matches!(c.kind(o), OpKind::VerifyInstruction) {
                    rep.error(c, id, "root operands must be verify contexts");
                    break;
                }
            }
        }
    }
}

/// Every advice must be bound by at most one `AdviceConstraint` per context.
fn check_advice_binding(c: &Circuit, rep: &mut VerifyReport) {
    for vi in c.verify_instructions() {
        let mut bound: HashMap<OpId, u32> = HashMap::new();
        for id in c.preorder_from(vi) {
            if matches!(c.kind(id), OpKind::AdviceConstraint) && !c.operands(id).is_empty() {
                *bound.entry(c.operand(id, 0)).or_insert(0) += 1;
            }
        }
        for (advice, count) in bound {
            if count > 1 {
                rep.warn(
                    c,
                    advice,
                    format!("bound by {count} advice constraints in one context"),
                );
            }
        }
    }
}

/// Three-color DFS from the root; returns a node on a cycle, if any.
fn find_cycle(c: &Circuit) -> Option<OpId> {
    let mut done = HashSet::new();
    let mut on_path = HashSet::new();
    let mut found = None;
    fn dfs(
        c: &Circuit,
        id: OpId,
        done: &mut HashSet<OpId>,
        on_path: &mut HashSet<OpId>,
        found: &mut Option<OpId>,
    ) {
        if found.is_some() || done.contains(&id) {
            return;
        }
        if !on_path.insert(id) {
            *found = Some(id);
            return;
        }
        for i in 0..c.operands(id).len() {
            dfs(c, c.operand(id, i), done, on_path, found);
        }
        on_path.remove(&id);
        done.insert(id);
    }
    dfs(c, c.root(), &mut done, &mut on_path, &mut found);
    found
}
