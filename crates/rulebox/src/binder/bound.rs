//! The resolved tree the evaluator runs.

use rulebox_parser::{BinaryOp, UnaryOp};

use crate::eval::Value;
use crate::functions::{Overload, Receiver};

/// `All` or `Any` over a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    All,
    Any,
}

impl QuantifierKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "All" => Some(QuantifierKind::All),
            "Any" => Some(QuantifierKind::Any),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QuantifierKind::All => "All",
            QuantifierKind::Any => "Any",
        }
    }
}

/// One instance member that may receive a call, chosen at evaluation time
/// by the receiver's runtime type.
#[derive(Debug, Clone)]
pub struct BoundMember {
    pub receiver: Receiver,
    pub qualified_name: String,
    pub overload: Overload,
}

/// A bound expression: every name resolved, every call matched to an
/// overload.
#[derive(Debug, Clone)]
pub enum BoundExpr {
    Constant(Value),

    /// A field of a parameter bag.
    Field { bag: String, field: String },

    /// A lambda parameter slot.
    Local(usize),

    Array(Vec<BoundExpr>),

    Unary {
        op: UnaryOp,
        operand: Box<BoundExpr>,
    },

    Binary {
        op: BinaryOp,
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
    },

    Conditional {
        cond: Box<BoundExpr>,
        then_expr: Box<BoundExpr>,
        else_expr: Box<BoundExpr>,
    },

    Index {
        target: Box<BoundExpr>,
        index: Box<BoundExpr>,
    },

    /// A static function call.
    Call {
        name: String,
        overload: Overload,
        args: Vec<BoundExpr>,
    },

    /// An instance method call or property read.
    Member {
        name: String,
        receiver: Box<BoundExpr>,
        candidates: Vec<BoundMember>,
        args: Vec<BoundExpr>,
    },

    /// `seq.All(x => body)` / `seq.Any(x => body)`.
    Quantifier {
        kind: QuantifierKind,
        receiver: Box<BoundExpr>,
        slot: usize,
        body: Box<BoundExpr>,
    },
}
