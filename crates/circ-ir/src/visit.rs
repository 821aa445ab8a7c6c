use std::collections::HashSet;

use crate::circuit::{Circuit, OpId};
use crate::op::OpKind;

/// Open dispatch over the opcode set.
///
/// `dispatch` selects one handler per opcode tag; every handler defaults to
/// [`Visitor::default_visit`], whose own default treats the operation as
/// unhandled and aborts with a diagnostic. Visitors therefore stay total by
/// construction: either a handler is overridden, or `default_visit` is
/// overridden with a generic strategy (counting, traversal, ...).
pub trait Visitor {
    fn default_visit(&mut self, circuit: &Circuit, id: OpId) {
        panic!(
            "unhandled operation {} (id {}) in visitor dispatch",
            circuit.kind(id).name(),
            id.as_u32()
        );
    }

    fn visit_input_register(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_output_register(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_input_instruction_bits(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_input_timestamp(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_output_timestamp(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_input_error_flag(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_output_error_flag(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_advice(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_constant(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_undefined(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }

    fn visit_add(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_sub(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_mul(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_udiv(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_sdiv(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_and(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_or(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_xor(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_shl(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_lshr(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_ashr(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_not(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_parity(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_population_count(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_count_leading_zeroes(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_count_trailing_zeroes(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }

    fn visit_trunc(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_zext(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_sext(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_extract(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_concat(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_select(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_bselect(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }

    fn visit_icmp(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }

    fn visit_reg_constraint(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_preserved_constraint(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_copy_constraint(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_advice_constraint(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_decode_condition(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_only_one_condition(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_read_constraint(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_write_constraint(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }

    fn visit_verify_instruction(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }
    fn visit_root(&mut self, c: &Circuit, id: OpId) {
        self.default_visit(c, id)
    }

    /// Tag-directed dispatch to the matching handler.
    fn dispatch(&mut self, c: &Circuit, id: OpId) {
        match c.kind(id) {
            OpKind::InputRegister(_) => self.visit_input_register(c, id),
            OpKind::OutputRegister(_) => self.visit_output_register(c, id),
            OpKind::InputInstructionBits => self.visit_input_instruction_bits(c, id),
            OpKind::InputTimestamp => self.visit_input_timestamp(c, id),
            OpKind::OutputTimestamp => self.visit_output_timestamp(c, id),
            OpKind::InputErrorFlag => self.visit_input_error_flag(c, id),
            OpKind::OutputErrorFlag => self.visit_output_error_flag(c, id),
            OpKind::Advice => self.visit_advice(c, id),
            OpKind::Constant(_) => self.visit_constant(c, id),
            OpKind::Undefined => self.visit_undefined(c, id),
            OpKind::Add => self.visit_add(c, id),
            OpKind::Sub => self.visit_sub(c, id),
            OpKind::Mul => self.visit_mul(c, id),
            OpKind::UDiv => self.visit_udiv(c, id),
            OpKind::SDiv => self.visit_sdiv(c, id),
            OpKind::And => self.visit_and(c, id),
            OpKind::Or => self.visit_or(c, id),
            OpKind::Xor => self.visit_xor(c, id),
            OpKind::Shl => self.visit_shl(c, id),
            OpKind::LShr => self.visit_lshr(c, id),
            OpKind::AShr => self.visit_ashr(c, id),
            OpKind::Not => self.visit_not(c, id),
            OpKind::Parity => self.visit_parity(c, id),
            OpKind::PopulationCount => self.visit_population_count(c, id),
            OpKind::CountLeadingZeroes => self.visit_count_leading_zeroes(c, id),
            OpKind::CountTrailingZeroes => self.visit_count_trailing_zeroes(c, id),
            OpKind::Trunc => self.visit_trunc(c, id),
            OpKind::ZExt => self.visit_zext(c, id),
            OpKind::SExt => self.visit_sext(c, id),
            OpKind::Extract { .. } => self.visit_extract(c, id),
            OpKind::Concat => self.visit_concat(c, id),
            OpKind::Select => self.visit_select(c, id),
            OpKind::BSelect => self.visit_bselect(c, id),
            OpKind::Icmp(_) => self.visit_icmp(c, id),
            OpKind::RegConstraint => self.visit_reg_constraint(c, id),
            OpKind::PreservedConstraint => self.visit_preserved_constraint(c, id),
            OpKind::CopyConstraint => self.visit_copy_constraint(c, id),
            OpKind::AdviceConstraint => self.visit_advice_constraint(c, id),
            OpKind::DecodeCondition => self.visit_decode_condition(c, id),
            OpKind::OnlyOneCondition => self.visit_only_one_condition(c, id),
            OpKind::ReadConstraint => self.visit_read_constraint(c, id),
            OpKind::WriteConstraint => self.visit_write_constraint(c, id),
            OpKind::VerifyInstruction => self.visit_verify_instruction(c, id),
            OpKind::Root => self.visit_root(c, id),
        }
    }

    /// Dispatches on each operand of `id` in order.
    fn traverse(&mut self, c: &Circuit, id: OpId) {
        for i in 0..c.operands(id).len() {
            self.dispatch(c, c.operand(id, i));
        }
    }
}

/// A visitor that skips nodes it has already dispatched on, by identity.
pub trait UniqueVisitor: Visitor {
    fn seen(&mut self) -> &mut HashSet<OpId>;

    fn dispatch_unique(&mut self, c: &Circuit, id: OpId) {
        if !self.seen().insert(id) {
            return;
        }
        self.dispatch(c, id);
    }

    fn traverse_unique(&mut self, c: &Circuit, id: OpId) {
        for i in 0..c.operands(id).len() {
            self.dispatch_unique(c, c.operand(id, i));
        }
    }
}
