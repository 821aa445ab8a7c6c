use circ_ir::{BitString, Circuit, NodeHistogram, OpId, OpKind};
use circ_transforms::{default_optimizer, Optimizer};
use pretty_assertions::assert_eq;

/// One verify context exercising all three default passes: an identity
/// register constraint, a single-operand `Or`, and a transitive advice
/// binding.
fn messy_circuit() -> Circuit {
    let mut c = Circuit::new(64);

    let in_eax = c.create(OpKind::InputRegister("EAX".into()), 32);
    let out_eax = c.create(OpKind::OutputRegister("EAX".into()), 32);
    let identity = c.create(OpKind::RegConstraint, 1);
    c.add_operands(identity, &[in_eax, out_eax]);

    let a1 = c.create(OpKind::Advice, 8);
    let a2 = c.create(OpKind::Advice, 8);
    let transitive = c.create(OpKind::AdviceConstraint, 1);
    c.add_operands(transitive, &[a1, a2]);
    let k = c.create(OpKind::Constant(BitString::from_u64(0x90, 8)), 8);
    let bind = c.create(OpKind::AdviceConstraint, 1);
    c.add_operands(bind, &[a2, k]);

    let flag = c.create(OpKind::InputErrorFlag, 1);
    let or = c.create(OpKind::Or, 1);
    c.add_operand(or, flag);
    let dc = c.create(OpKind::DecodeCondition, 1);
    c.add_operand(dc, or);

    let vi = c.create(OpKind::VerifyInstruction, 1);
    c.add_operands(vi, &[identity, transitive, bind, dc]);
    let root = c.root();
    c.add_operand(root, vi);
    c
}

fn find(c: &Circuit, pred: impl Fn(&OpKind) -> bool) -> OpId {
    c.ids_where(pred).next().expect("node not found")
}

#[test]
fn default_pipeline_simplifies_and_reports() {
    let mut opt = default_optimizer();
    let before = NodeHistogram::collect(&messy_circuit());
    let c = opt.run(messy_circuit());
    let after = NodeHistogram::collect(&c);

    // Identity constraint gone, advice chain flattened, trivial Or gone.
    assert_eq!(after.count("RegConstraint"), 0);
    assert_eq!(after.count("Or"), 0);
    assert_eq!(after.count("AdviceConstraint"), 1);
    assert_eq!(after.count("Advice"), 1);

    // The surviving binding names the surviving advice.
    let bind = find(&c, |k| matches!(k, OpKind::AdviceConstraint));
    let advice = find(&c, |k| matches!(k, OpKind::Advice));
    assert_eq!(c.operand(bind, 0), advice);

    // A pass plus the orphan sweep never grows the reachable set.
    assert!(after.total() <= before.total());

    let report = opt.report();
    assert!(report.starts_with("start:\n"));
    assert!(report.contains("remove-identity:"));
    assert!(report.contains("In the end:"));
}

#[test]
fn pipeline_is_idempotent() {
    let once = default_optimizer().run(messy_circuit());
    let again = default_optimizer().run(default_optimizer().run(messy_circuit()));
    assert_eq!(NodeHistogram::collect(&once), NodeHistogram::collect(&again));
}

#[test]
fn bare_optimizer_records_no_history() {
    let mut opt = Optimizer::bare();
    opt.add_pass("dummy");
    let _ = opt.run(messy_circuit());
    assert_eq!(opt.report(), "no history recorded");
}

#[test]
#[should_panic(expected = "unknown pass")]
fn unknown_pass_names_abort() {
    Optimizer::new().add_pass("no-such-pass");
}
