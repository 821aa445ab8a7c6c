use serde::{Deserialize, Serialize};

use crate::bits::BitString;

/// Comparison predicate carried by `OpKind::Icmp`. All comparisons produce a
/// width-1 result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IcmpKind {
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl IcmpKind {
    pub fn name(self) -> &'static str {
        match self {
            IcmpKind::Eq => "eq",
            IcmpKind::Ne => "ne",
            IcmpKind::Ult => "ult",
            IcmpKind::Ule => "ule",
            IcmpKind::Ugt => "ugt",
            IcmpKind::Uge => "uge",
            IcmpKind::Slt => "slt",
            IcmpKind::Sle => "sle",
            IcmpKind::Sgt => "sgt",
            IcmpKind::Sge => "sge",
        }
    }
}

/// Opcode tag of an [`crate::Operation`].
///
/// The operand count and operand widths of each opcode are fixed by
/// opcode-specific rules enforced in [`crate::verify_circuit`]; constructing
/// a node does not validate them (the lifter and the passes are trusted to
/// run verification at their boundaries).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    // Leaves.
    InputRegister(String),
    OutputRegister(String),
    InputInstructionBits,
    InputTimestamp,
    OutputTimestamp,
    InputErrorFlag,
    OutputErrorFlag,
    /// Symbolic placeholder; its value is fixed by an `AdviceConstraint`.
    /// Advices are identified by allocation identity (their [`crate::OpId`]),
    /// never by payload.
    Advice,
    Constant(BitString),
    Undefined,

    // Arithmetic / bitwise.
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    Not,
    Parity,
    PopulationCount,
    CountLeadingZeroes,
    CountTrailingZeroes,

    // Bit-vector shape.
    Trunc,
    ZExt,
    SExt,
    /// Bit slice `[low, high)` of the single operand; result width is
    /// `high - low`.
    Extract {
        high: u32,
        low: u32,
    },
    Concat,
    /// Operand 0 is the index (width `n`); the remaining `2^n` operands are
    /// the selectable values, all of the result width.
    Select,
    BSelect,

    Icmp(IcmpKind),

    // Constraints (width 1, conjuncts of a verify context).
    RegConstraint,
    PreservedConstraint,
    CopyConstraint,
    /// Binds one `Advice` (operand 0) to its defining value (operand 1).
    AdviceConstraint,
    DecodeCondition,
    /// Exactly-one over its operands.
    OnlyOneCondition,
    ReadConstraint,
    WriteConstraint,

    // Contexts.
    VerifyInstruction,
    /// The circuit root: a disjunction over `VerifyInstruction`s.
    Root,
}

impl OpKind {
    /// Stable opcode name, used for statistics keys, DOT labels and
    /// diagnostics.
    pub fn name(&self) -> String {
        match self {
            OpKind::InputRegister(_) => "InputRegister".into(),
            OpKind::OutputRegister(_) => "OutputRegister".into(),
            OpKind::InputInstructionBits => "InputInstructionBits".into(),
            OpKind::InputTimestamp => "InputTimestamp".into(),
            OpKind::OutputTimestamp => "OutputTimestamp".into(),
            OpKind::InputErrorFlag => "InputErrorFlag".into(),
            OpKind::OutputErrorFlag => "OutputErrorFlag".into(),
            OpKind::Advice => "Advice".into(),
            OpKind::Constant(_) => "Constant".into(),
            OpKind::Undefined => "Undefined".into(),
            OpKind::Add => "Add".into(),
            OpKind::Sub => "Sub".into(),
            OpKind::Mul => "Mul".into(),
            OpKind::UDiv => "UDiv".into(),
            OpKind::SDiv => "SDiv".into(),
            OpKind::And => "And".into(),
            OpKind::Or => "Or".into(),
            OpKind::Xor => "Xor".into(),
            OpKind::Shl => "Shl".into(),
            OpKind::LShr => "LShr".into(),
            OpKind::AShr => "AShr".into(),
            OpKind::Not => "Not".into(),
            OpKind::Parity => "Parity".into(),
            OpKind::PopulationCount => "PopulationCount".into(),
            OpKind::CountLeadingZeroes => "CountLeadingZeroes".into(),
            OpKind::CountTrailingZeroes => "CountTrailingZeroes".into(),
            OpKind::Trunc => "Trunc".into(),
            OpKind::ZExt => "ZExt".into(),
            OpKind::SExt => "SExt".into(),
            OpKind::Extract { .. } => "Extract".into(),
            OpKind::Concat => "Concat".into(),
            OpKind::Select => "Select".into(),
            OpKind::BSelect => "BSelect".into(),
            OpKind::Icmp(p) => format!("Icmp_{}", p.name()),
            OpKind::RegConstraint => "RegConstraint".into(),
            OpKind::PreservedConstraint => "PreservedConstraint".into(),
            OpKind::CopyConstraint => "CopyConstraint".into(),
            OpKind::AdviceConstraint => "AdviceConstraint".into(),
            OpKind::DecodeCondition => "DecodeCondition".into(),
            OpKind::OnlyOneCondition => "OnlyOneCondition".into(),
            OpKind::ReadConstraint => "ReadConstraint".into(),
            OpKind::WriteConstraint => "WriteConstraint".into(),
            OpKind::VerifyInstruction => "VerifyInstruction".into(),
            OpKind::Root => "Root".into(),
        }
    }

    /// Short lower-case stem used to build operand handle names in emitted
    /// decoder source.
    pub fn handle_stem(&self) -> String {
        match self {
            OpKind::InputRegister(r) => format!("in_{r}"),
            OpKind::OutputRegister(r) => format!("out_{r}"),
            OpKind::Constant(_) => "const".into(),
            OpKind::Icmp(p) => format!("icmp_{}", p.name()),
            OpKind::Extract { .. } => "extract".into(),
            other => {
                // CamelCase opcode name to snake_case.
                let name = other.name();
                let mut out = String::with_capacity(name.len() + 4);
                for (i, ch) in name.chars().enumerate() {
                    if ch.is_ascii_uppercase() {
                        if i != 0 {
                            out.push('_');
                        }
                        out.push(ch.to_ascii_lowercase());
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            OpKind::InputRegister(_)
                | OpKind::OutputRegister(_)
                | OpKind::InputInstructionBits
                | OpKind::InputTimestamp
                | OpKind::OutputTimestamp
                | OpKind::InputErrorFlag
                | OpKind::OutputErrorFlag
                | OpKind::Advice
                | OpKind::Constant(_)
                | OpKind::Undefined
        )
    }

    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            OpKind::RegConstraint
                | OpKind::PreservedConstraint
                | OpKind::CopyConstraint
                | OpKind::AdviceConstraint
                | OpKind::DecodeCondition
                | OpKind::OnlyOneCondition
                | OpKind::ReadConstraint
                | OpKind::WriteConstraint
        )
    }

    pub fn is_context(&self) -> bool {
        matches!(self, OpKind::VerifyInstruction | OpKind::Root)
    }
}
