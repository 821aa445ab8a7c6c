use circ_ir::{Circuit, OpId, OpKind};

use crate::Pass;

/// Deletes `RegConstraint(InputRegister r, OutputRegister r)` conjuncts:
/// a register constrained to keep its own value carries no information.
/// The constraint is destroyed and every user drops it from its operand
/// list.
pub struct RemoveIdentityPass;

impl Pass for RemoveIdentityPass {
    fn run(&self, mut circuit: Circuit) -> Circuit {
        let targets: Vec<OpId> = circuit
            .ids_where(|k| matches!(k, OpKind::RegConstraint))
            .filter(|&rc| {
                let ops = circuit.operands(rc);
                if ops.len() != 2 {
                    return false;
                }
                match (circuit.kind(ops[0]), circuit.kind(ops[1])) {
                    (OpKind::InputRegister(a), OpKind::OutputRegister(b)) => a == b,
                    _ => false,
                }
            })
            .collect();

        for rc in targets {
            circuit.destroy(rc);
            let users = circuit.users(rc).to_vec();
            for u in users {
                circuit.remove_all_operands(u, rc);
            }
        }
        circuit
    }
}

/// Replaces `Or` nodes with exactly one operand by that operand.
pub struct TrivialOrRemovalPass;

impl Pass for TrivialOrRemovalPass {
    fn run(&self, circuit: Circuit) -> Circuit {
        collapse_unary(circuit, |k| matches!(k, OpKind::Or))
    }
}

/// Unary-operator collapse over a designated set of n-ary opcodes: any node
/// of the set with exactly one operand forwards to that operand.
pub struct CollapseOpsPass {
    collapsable: fn(&OpKind) -> bool,
}

impl Default for CollapseOpsPass {
    fn default() -> Self {
        Self {
            collapsable: |k| matches!(k, OpKind::And | OpKind::Or | OpKind::Xor | OpKind::Concat),
        }
    }
}

impl Pass for CollapseOpsPass {
    fn run(&self, circuit: Circuit) -> Circuit {
        collapse_unary(circuit, self.collapsable)
    }
}

/// One postorder sweep suffices even for chains: a child is forwarded
/// before its parent is inspected, so the parent sees its final operand.
fn collapse_unary(mut circuit: Circuit, collapsable: impl Fn(&OpKind) -> bool) -> Circuit {
    for id in circuit.postorder_from(circuit.root()) {
        if !collapsable(circuit.kind(id)) || circuit.operands(id).len() != 1 {
            continue;
        }
        let operand = circuit.operand(id, 0);
        if operand != id {
            circuit.replace_all_uses_with(id, operand);
        }
    }
    circuit
}

/// Flattens advice-to-advice bindings: for `AdviceConstraint(a, b)` with
/// both sides advices, every use of `b` becomes a use of `a` and the
/// constraint is detached and destroyed. Chains collapse because later
/// constraints have already been rewritten onto `a` when they are visited.
pub struct MergeAdviceConstraintsPass;

impl Pass for MergeAdviceConstraintsPass {
    fn run(&self, mut circuit: Circuit) -> Circuit {
        let constraints: Vec<OpId> = circuit
            .ids_where(|k| matches!(k, OpKind::AdviceConstraint))
            .collect();
        for ac in constraints {
            let ops = circuit.operands(ac);
            if ops.len() != 2 {
                continue;
            }
            let (lhs, rhs) = (ops[0], ops[1]);
            if !matches!(circuit.kind(lhs), OpKind::Advice)
                || !matches!(circuit.kind(rhs), OpKind::Advice)
            {
                continue;
            }

            // Detach the constraint first so the surviving advice does not
            // pick up the constraint's own operand slots during the rewrite.
            circuit.destroy(ac);
            let users = circuit.users(ac).to_vec();
            for u in users {
                circuit.remove_all_operands(u, ac);
            }
            if lhs != rhs {
                circuit.replace_all_uses_with(rhs, lhs);
            }
        }
        circuit
    }
}

/// Widens all advice hints into a single wide hint; every narrow advice
/// becomes an `Extract` slice of the wide one at its assigned offset.
pub struct MergeAdvicesPass;

impl Pass for MergeAdvicesPass {
    fn run(&self, mut circuit: Circuit) -> Circuit {
        let advices: Vec<(OpId, u32)> = circuit
            .ids_where(|k| matches!(k, OpKind::Advice))
            .map(|id| (id, circuit.size(id)))
            .collect();
        if advices.len() < 2 {
            return circuit;
        }

        let total: u32 = advices.iter().map(|&(_, w)| w).sum();
        let wide = circuit.create(OpKind::Advice, total);
        tracing::debug!(
            "widening {} advices into one {total}-bit hint",
            advices.len()
        );

        let mut offset = 0u32;
        for (advice, width) in advices {
            let slice = circuit.create(
                OpKind::Extract {
                    high: offset + width,
                    low: offset,
                },
                width,
            );
            circuit.add_operand(slice, wide);
            circuit.replace_all_uses_with(advice, slice);
            offset += width;
        }
        circuit
    }
}

/// Rewrites overflow-flag register constraints whose value subtree
/// recomputes the overflow bit from raw operand values: the subtree is
/// replaced by `Xor(input CF, output CF)`, which is equivalent and reuses
/// flags the circuit already carries.
pub struct OverflowFlagFixPass;

impl Pass for OverflowFlagFixPass {
    fn run(&self, mut circuit: Circuit) -> Circuit {
        let (Some(output_of), Some(output_cf), Some(input_cf)) = (
            circuit.find_output_reg("OF"),
            circuit.find_output_reg("CF"),
            circuit.find_input_reg("CF"),
        ) else {
            return circuit;
        };

        let candidates: Vec<OpId> = circuit
            .ids_where(|k| matches!(k, OpKind::RegConstraint))
            .filter(|&rc| {
                circuit.operands(rc).len() == 2 && circuit.operand(rc, 1) == output_of
            })
            .collect();

        for rc in candidates {
            if !has_lifted_overflow_semantics(&circuit, circuit.operand(rc, 0)) {
                continue;
            }
            let xor = circuit.create(OpKind::Xor, 1);
            circuit.add_operands(xor, &[input_cf, output_cf]);
            circuit.replace_operand(rc, 0, xor);
        }
        circuit
    }
}

/// Matches the from-scratch overflow computation emitted by the lifter.
// TODO: pin down the lifted OF subtree shape against captured circuits;
// until then the matcher never fires and the pass is a no-op.
fn has_lifted_overflow_semantics(_circuit: &Circuit, _value: OpId) -> bool {
    false
}

/// Identity pass.
pub struct DummyPass;

impl Pass for DummyPass {
    fn run(&self, circuit: Circuit) -> Circuit {
        circuit
    }
}

#[cfg(test)]
mod tests {
    use circ_ir::{BitString, Circuit, OpId, OpKind};
    use pretty_assertions::assert_eq;

    use super::*;

    fn wrap_in_vi(c: &mut Circuit, constraints: &[OpId]) -> OpId {
        let vi = c.create(OpKind::VerifyInstruction, 1);
        c.add_operands(vi, constraints);
        let root = c.root();
        c.add_operand(root, vi);
        vi
    }

    #[test]
    fn remove_identity_strips_self_constraints() {
        let mut c = Circuit::new(64);
        let a = c.create(OpKind::InputRegister("EAX".into()), 32);
        let b = c.create(OpKind::OutputRegister("EAX".into()), 32);
        let rc = c.create(OpKind::RegConstraint, 1);
        c.add_operands(rc, &[a, b]);
        let vi = wrap_in_vi(&mut c, &[rc]);

        let mut c = RemoveIdentityPass.run(c);
        assert!(c.operands(vi).is_empty());
        assert!(c.users(a).is_empty());
        c.remove_unused();
        assert!(!c.is_live(rc));
    }

    #[test]
    fn remove_identity_keeps_cross_register_constraints() {
        let mut c = Circuit::new(64);
        let a = c.create(OpKind::InputRegister("EAX".into()), 32);
        let b = c.create(OpKind::OutputRegister("EBX".into()), 32);
        let rc = c.create(OpKind::RegConstraint, 1);
        c.add_operands(rc, &[a, b]);
        let vi = wrap_in_vi(&mut c, &[rc]);

        let c = RemoveIdentityPass.run(c);
        assert_eq!(c.operands(vi), &[rc]);
    }

    #[test]
    fn trivial_or_forwards_single_operand() {
        let mut c = Circuit::new(64);
        let x = c.create(OpKind::InputErrorFlag, 1);
        let or = c.create(OpKind::Or, 1);
        c.add_operand(or, x);
        let dc = c.create(OpKind::DecodeCondition, 1);
        c.add_operand(dc, or);
        wrap_in_vi(&mut c, &[dc]);

        let mut c = TrivialOrRemovalPass.run(c);
        assert_eq!(c.operands(dc), &[x]);
        c.remove_unused();
        assert!(!c.is_live(or));
    }

    #[test]
    fn trivial_or_collapses_chains_in_one_run() {
        let mut c = Circuit::new(64);
        let x = c.create(OpKind::InputErrorFlag, 1);
        let inner = c.create(OpKind::Or, 1);
        c.add_operand(inner, x);
        let outer = c.create(OpKind::Or, 1);
        c.add_operand(outer, inner);
        let dc = c.create(OpKind::DecodeCondition, 1);
        c.add_operand(dc, outer);
        wrap_in_vi(&mut c, &[dc]);

        let c = TrivialOrRemovalPass.run(c);
        assert_eq!(c.operands(dc), &[x]);
    }

    #[test]
    fn collapse_ops_covers_the_collapsable_set() {
        let mut c = Circuit::new(64);
        let x = c.create(OpKind::Advice, 8);
        let cat = c.create(OpKind::Concat, 8);
        c.add_operand(cat, x);
        let and = c.create(OpKind::And, 8);
        c.add_operand(and, cat);
        let dc = c.create(OpKind::DecodeCondition, 1);
        c.add_operand(dc, and);
        wrap_in_vi(&mut c, &[dc]);

        let c = CollapseOpsPass::default().run(c);
        assert_eq!(c.operands(dc), &[x]);
    }

    #[test]
    fn merge_transitive_advices_rebinds_uses() {
        let mut c = Circuit::new(64);
        let a1 = c.create(OpKind::Advice, 8);
        let a2 = c.create(OpKind::Advice, 8);
        let ac = c.create(OpKind::AdviceConstraint, 1);
        c.add_operands(ac, &[a1, a2]);
        // An unrelated use of a2 elsewhere in the context.
        let k = c.create(OpKind::Constant(BitString::from_u64(5, 8)), 8);
        let cmp = c.create(OpKind::Icmp(circ_ir::IcmpKind::Eq), 1);
        c.add_operands(cmp, &[a2, k]);
        let dc = c.create(OpKind::DecodeCondition, 1);
        c.add_operand(dc, cmp);
        let vi = wrap_in_vi(&mut c, &[ac, dc]);

        let mut c = MergeAdviceConstraintsPass.run(c);
        assert_eq!(c.operands(cmp), &[a1, k]);
        assert_eq!(c.operands(vi), &[dc]);
        assert!(c.users(a2).is_empty());
        c.remove_unused();
        assert!(!c.is_live(ac));
        assert!(!c.is_live(a2));
    }

    #[test]
    fn merge_advices_slices_a_wide_hint() {
        let mut c = Circuit::new(64);
        let a1 = c.create(OpKind::Advice, 8);
        let a2 = c.create(OpKind::Advice, 4);
        let v1 = c.create(OpKind::Constant(BitString::from_u64(1, 8)), 8);
        let v2 = c.create(OpKind::Constant(BitString::from_u64(2, 4)), 4);
        let ac1 = c.create(OpKind::AdviceConstraint, 1);
        c.add_operands(ac1, &[a1, v1]);
        let ac2 = c.create(OpKind::AdviceConstraint, 1);
        c.add_operands(ac2, &[a2, v2]);
        wrap_in_vi(&mut c, &[ac1, ac2]);

        let mut c = MergeAdvicesPass.run(c);
        c.remove_unused();

        let wide: Vec<OpId> = c.ids_where(|k| matches!(k, OpKind::Advice)).collect();
        assert_eq!(wide.len(), 1);
        assert_eq!(c.size(wide[0]), 12);

        let slice1 = c.operand(ac1, 0);
        assert!(matches!(
            c.kind(slice1),
            OpKind::Extract { high: 8, low: 0 }
        ));
        let slice2 = c.operand(ac2, 0);
        assert!(matches!(
            c.kind(slice2),
            OpKind::Extract { high: 12, low: 8 }
        ));
        assert_eq!(c.operand(slice1, 0), wide[0]);
    }

    #[test]
    fn overflow_fix_without_flag_registers_is_a_no_op() {
        let mut c = Circuit::new(64);
        let a = c.create(OpKind::InputRegister("EAX".into()), 32);
        let b = c.create(OpKind::OutputRegister("EBX".into()), 32);
        let rc = c.create(OpKind::RegConstraint, 1);
        c.add_operands(rc, &[a, b]);
        let vi = wrap_in_vi(&mut c, &[rc]);

        let c = OverflowFlagFixPass.run(c);
        assert_eq!(c.operands(vi), &[rc]);
    }
}
