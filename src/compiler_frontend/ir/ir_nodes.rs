//! ============================================================
//!                         IR Nodes
//! ============================================================
//! A flat, load/store intermediate representation of a whole program.
//!  - One function per declared function, plus the implicit entry function
//!  - Every variable lives in a named stack slot created by `alloca`
//!  - Every value is produced exactly once and numbered per function
//!  - Labels and branches delimit the basic blocks, there is no block tree
//!
//! Every value is a 32-bit signed integer. Comparison results are 0 or 1
//! and can be used directly as integers or as branch conditions.

// ============================================================
// Stable IDs
// ============================================================
/// A virtual register. Printed as `%N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

// ============================================================
// Module
// ============================================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IrModule {
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|function| function.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub params: Vec<String>,
    pub instructions: Vec<Instruction>,
}

impl IrFunction {
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        IrFunction {
            name: name.into(),
            params,
            instructions: Vec::new(),
        }
    }

    /// Slot names in the order their `alloca` appears
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().filter_map(|instruction| match instruction {
            Instruction::Alloca { slot } => Some(slot.as_str()),
            _ => None,
        })
    }

    pub fn ends_with_return(&self) -> bool {
        matches!(self.instructions.last(), Some(Instruction::Return { .. }))
    }
}

// ============================================================
// Instructions
// ============================================================
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(i64),
    Value(ValueId),

    /// The incoming value of a parameter, by position
    Param(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
        }
    }

    pub fn from_mnemonic(text: &str) -> Option<BinOp> {
        let op = match text {
            "add" => BinOp::Add,
            "sub" => BinOp::Sub,
            "mul" => BinOp::Mul,
            "sdiv" => BinOp::SDiv,
            _ => return None,
        };

        Some(op)
    }
}

/// Signed integer comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Eq,
    Ne,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl Predicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Sgt => "sgt",
            Predicate::Sge => "sge",
            Predicate::Slt => "slt",
            Predicate::Sle => "sle",
        }
    }

    pub fn from_mnemonic(text: &str) -> Option<Predicate> {
        let predicate = match text {
            "eq" => Predicate::Eq,
            "ne" => Predicate::Ne,
            "sgt" => Predicate::Sgt,
            "sge" => Predicate::Sge,
            "slt" => Predicate::Slt,
            "sle" => Predicate::Sle,
            _ => return None,
        };

        Some(predicate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Alloca {
        slot: String,
    },
    Store {
        value: Operand,
        slot: String,
    },
    Load {
        result: ValueId,
        slot: String,
    },
    BinOp {
        result: ValueId,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    Call {
        result: ValueId,
        callee: String,
        args: Vec<Operand>,
    },
    Icmp {
        result: ValueId,
        predicate: Predicate,
        lhs: Operand,
        rhs: Operand,
    },
    CondBranch {
        condition: Operand,
        then_label: String,
        else_label: String,
    },
    Branch {
        label: String,
    },
    Label {
        name: String,
    },

    /// `None` only appears in hand-written IR text (`ret void`)
    Return {
        value: Option<Operand>,
    },
}

impl Instruction {
    pub fn result(&self) -> Option<ValueId> {
        match self {
            Instruction::Load { result, .. }
            | Instruction::BinOp { result, .. }
            | Instruction::Call { result, .. }
            | Instruction::Icmp { result, .. } => Some(*result),
            _ => None,
        }
    }

    /// Every operand this instruction reads, in order
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Instruction::Store { value, .. } => vec![value],
            Instruction::BinOp { lhs, rhs, .. } | Instruction::Icmp { lhs, rhs, .. } => {
                vec![lhs, rhs]
            }
            Instruction::Call { args, .. } => args.iter().collect(),
            Instruction::CondBranch { condition, .. } => vec![condition],
            Instruction::Return { value: Some(value) } => vec![value],
            _ => Vec::new(),
        }
    }
}
