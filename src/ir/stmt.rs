//! Statement and operator definitions.
//!
//! The statement hierarchy is a closed sum type: analyses dispatch with
//! exhaustive `match` instead of visitor objects, so adding a statement
//! kind is a compile-time event for every transfer function.
//!
//! # Shape
//!
//! Every computed value is named: expressions are flattened to at most
//! one operator per statement (`x = a op b`), and field, array and call
//! operands are always variables. This is the contract the dataflow and
//! pointer transfer functions rely on.

use serde::{Deserialize, Serialize};

use super::types::{ClassId, FieldId, VarId};

/// Binary operators over 32-bit signed integers.
///
/// Arithmetic wraps modulo 2^32, shifts mask the shift amount to the low
/// five bits, and comparisons yield `1`/`0`, matching the semantics of
/// the source language's `int` operations bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinaryOp {
    /// Whether this operator divides by its right operand.
    ///
    /// Division and remainder are the two operators whose evaluation can
    /// fail at run time; both constant propagation (zero divisor becomes
    /// `Undef`) and dead-code detection (the statement has an observable
    /// effect) special-case them.
    #[inline]
    #[must_use]
    pub fn may_divide_by_zero(&self) -> bool {
        matches!(self, BinaryOp::Div | BinaryOp::Rem)
    }

    /// Apply the operator to two concrete operands.
    ///
    /// The divisor must be non-zero for `Div`/`Rem`; callers check for a
    /// constant zero divisor first and short-circuit to `Undef`.
    #[must_use]
    pub fn apply(&self, i1: i32, i2: i32) -> i32 {
        match self {
            BinaryOp::Add => i1.wrapping_add(i2),
            BinaryOp::Sub => i1.wrapping_sub(i2),
            BinaryOp::Mul => i1.wrapping_mul(i2),
            // wrapping_div: MIN / -1 wraps to MIN instead of trapping
            BinaryOp::Div => i1.wrapping_div(i2),
            BinaryOp::Rem => i1.wrapping_rem(i2),
            // wrapping shifts mask the amount to the low 5 bits
            BinaryOp::Shl => i1.wrapping_shl(i2 as u32),
            BinaryOp::Shr => i1.wrapping_shr(i2 as u32),
            BinaryOp::Ushr => ((i1 as u32).wrapping_shr(i2 as u32)) as i32,
            BinaryOp::And => i1 & i2,
            BinaryOp::Or => i1 | i2,
            BinaryOp::Xor => i1 ^ i2,
            BinaryOp::Eq => (i1 == i2) as i32,
            BinaryOp::Ne => (i1 != i2) as i32,
            BinaryOp::Lt => (i1 < i2) as i32,
            BinaryOp::Gt => (i1 > i2) as i32,
            BinaryOp::Le => (i1 <= i2) as i32,
            BinaryOp::Ge => (i1 >= i2) as i32,
        }
    }
}

/// Comparison operators usable as branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CondOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CondOp {
    /// The equivalent value-producing binary operator.
    #[inline]
    #[must_use]
    pub fn as_binary(&self) -> BinaryOp {
        match self {
            CondOp::Eq => BinaryOp::Eq,
            CondOp::Ne => BinaryOp::Ne,
            CondOp::Lt => BinaryOp::Lt,
            CondOp::Gt => BinaryOp::Gt,
            CondOp::Le => BinaryOp::Le,
            CondOp::Ge => BinaryOp::Ge,
        }
    }
}

/// How a call site dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Static method call; the target is the declared method.
    Static,
    /// Constructor / private / super call; dispatched up the superclass
    /// chain from the declaring class.
    Special,
    /// Instance call on a class type; dispatched on the receiver's
    /// run-time type.
    Virtual,
    /// Instance call on an interface type; same dispatch as `Virtual`.
    Interface,
}

/// A method invocation site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoke {
    /// Dispatch kind.
    pub kind: CallKind,
    /// Class or interface named by the method reference.
    pub declaring: ClassId,
    /// Subsignature of the target (name and descriptor).
    pub subsig: String,
    /// Receiver variable; `None` for static calls.
    pub recv: Option<VarId>,
    /// Argument variables, in order.
    pub args: Vec<VarId>,
    /// Variable receiving the return value, if any.
    pub result: Option<VarId>,
}

impl Invoke {
    /// Whether this is a static call.
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == CallKind::Static
    }
}

/// A single IR statement.
///
/// Jump targets (`If`, `Goto`, `Switch`) are indexes into the containing
/// method's statement list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// `x = new C`
    New { lhs: VarId, class: ClassId },
    /// `x = y`
    Copy { lhs: VarId, rhs: VarId },
    /// `x = k`
    AssignLiteral { lhs: VarId, value: i32 },
    /// `x = a op b`
    Binary {
        lhs: VarId,
        op: BinaryOp,
        v1: VarId,
        v2: VarId,
    },
    /// `x = b.f` (instance, `base = Some`) or `x = C.f` (static, `base = None`)
    LoadField {
        lhs: VarId,
        base: Option<VarId>,
        field: FieldId,
    },
    /// `b.f = y` or `C.f = y`
    StoreField {
        base: Option<VarId>,
        field: FieldId,
        rhs: VarId,
    },
    /// `x = b[i]`
    LoadArray {
        lhs: VarId,
        base: VarId,
        index: VarId,
    },
    /// `b[i] = y`
    StoreArray {
        base: VarId,
        index: VarId,
        rhs: VarId,
    },
    /// `if (a op b) goto target`
    If {
        op: CondOp,
        v1: VarId,
        v2: VarId,
        target: usize,
    },
    /// `goto target`
    Goto { target: usize },
    /// `switch (v) { case k_i: goto t_i; default: goto d }`
    Switch {
        var: VarId,
        cases: Vec<(i32, usize)>,
        default: usize,
    },
    /// A call site.
    Invoke(Invoke),
    /// `return v` / `return`
    Return { value: Option<VarId> },
    /// Control-only filler (labels, synchronization markers, ...).
    Nop,
}

impl Stmt {
    /// The variable defined by this statement, if any.
    #[must_use]
    pub fn def(&self) -> Option<VarId> {
        match self {
            Stmt::New { lhs, .. }
            | Stmt::Copy { lhs, .. }
            | Stmt::AssignLiteral { lhs, .. }
            | Stmt::Binary { lhs, .. }
            | Stmt::LoadField { lhs, .. }
            | Stmt::LoadArray { lhs, .. } => Some(*lhs),
            Stmt::Invoke(invoke) => invoke.result,
            _ => None,
        }
    }

    /// The variables used by this statement.
    #[must_use]
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            Stmt::New { .. } | Stmt::AssignLiteral { .. } | Stmt::Goto { .. } | Stmt::Nop => {
                Vec::new()
            }
            Stmt::Copy { rhs, .. } => vec![*rhs],
            Stmt::Binary { v1, v2, .. } => vec![*v1, *v2],
            Stmt::LoadField { base, .. } => base.iter().copied().collect(),
            Stmt::StoreField { base, rhs, .. } => {
                let mut uses: Vec<VarId> = base.iter().copied().collect();
                uses.push(*rhs);
                uses
            }
            Stmt::LoadArray { base, index, .. } => vec![*base, *index],
            Stmt::StoreArray { base, index, rhs } => vec![*base, *index, *rhs],
            Stmt::If { v1, v2, .. } => vec![*v1, *v2],
            Stmt::Switch { var, .. } => vec![*var],
            Stmt::Invoke(invoke) => {
                let mut uses: Vec<VarId> = invoke.recv.iter().copied().collect();
                uses.extend_from_slice(&invoke.args);
                uses
            }
            Stmt::Return { value } => value.iter().copied().collect(),
        }
    }

    /// Whether this is an assignment whose left-hand side is a variable.
    ///
    /// Store statements write through a field or array lvalue and are
    /// excluded; call sites are excluded even when they bind a result.
    #[inline]
    #[must_use]
    pub fn is_var_assign(&self) -> bool {
        matches!(
            self,
            Stmt::New { .. }
                | Stmt::Copy { .. }
                | Stmt::AssignLiteral { .. }
                | Stmt::Binary { .. }
                | Stmt::LoadField { .. }
                | Stmt::LoadArray { .. }
        )
    }

    /// The call site, if this statement is one.
    #[inline]
    #[must_use]
    pub fn as_invoke(&self) -> Option<&Invoke> {
        match self {
            Stmt::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }
}
