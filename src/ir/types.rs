//! Identifiers and types for the analysed IR.
//!
//! Every program element is addressed by a dense newtype index into an
//! arena owned by [`crate::ir::Program`]. Analyses pass these ids around
//! instead of references, which keeps the solver data structures flat
//! (adjacency sets of integers, points-to sets of integers) and avoids
//! lifetime plumbing through the fixpoint loops.

use serde::{Deserialize, Serialize};

/// Unique identifier for a class or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub usize);

/// Unique identifier for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub usize);

/// Unique identifier for a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub usize);

/// Unique identifier for a local variable.
///
/// Variables are program-global: two methods never share a `VarId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// A statement position: method plus index into the method's body.
///
/// Serves as the identity of call sites and allocation sites, and as the
/// sort key for reproducible output (dead code, taint flows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtRef {
    /// Method containing the statement.
    pub method: MethodId,
    /// Index into the method body.
    pub index: usize,
}

impl StmtRef {
    /// Create a statement reference.
    #[inline]
    #[must_use]
    pub fn new(method: MethodId, index: usize) -> Self {
        Self { method, index }
    }
}

/// Static type of a variable or field.
///
/// Only the integer-coercible primitives participate in constant
/// propagation; reference and array types participate in pointer
/// analysis. `Long`/`Float`/`Double` are carried for completeness but no
/// analysis reasons about their values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Byte,
    Short,
    Int,
    Char,
    Boolean,
    Long,
    Float,
    Double,
    /// Reference to a class or interface instance.
    Object(ClassId),
    /// Array whose elements are instances of the given class.
    Array(ClassId),
}

impl Type {
    /// Whether a variable of this type can hold an `int` value.
    ///
    /// Matches the widening rules of the source language: byte, short,
    /// int, char and boolean all coerce to int; long, floating-point and
    /// reference types do not.
    #[inline]
    #[must_use]
    pub fn can_hold_int(&self) -> bool {
        matches!(
            self,
            Type::Byte | Type::Short | Type::Int | Type::Char | Type::Boolean
        )
    }

    /// Whether this is a reference (object or array) type.
    #[inline]
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Object(_) | Type::Array(_))
    }

    /// The class backing this type, if it is an object type.
    #[inline]
    #[must_use]
    pub fn as_class(&self) -> Option<ClassId> {
        match self {
            Type::Object(c) => Some(*c),
            _ => None,
        }
    }
}

/// Data stored per local variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarData {
    /// Source-level name, for diagnostics.
    pub name: String,
    /// Declared type.
    pub ty: Type,
    /// Method the variable belongs to.
    pub method: MethodId,
}

/// Data stored per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldData {
    /// Declaring class.
    pub class: ClassId,
    /// Field name.
    pub name: String,
    /// Declared type.
    pub ty: Type,
    /// Whether the field is static.
    pub is_static: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_holding_types() {
        assert!(Type::Int.can_hold_int());
        assert!(Type::Byte.can_hold_int());
        assert!(Type::Short.can_hold_int());
        assert!(Type::Char.can_hold_int());
        assert!(Type::Boolean.can_hold_int());
        assert!(!Type::Long.can_hold_int());
        assert!(!Type::Float.can_hold_int());
        assert!(!Type::Double.can_hold_int());
        assert!(!Type::Object(ClassId(0)).can_hold_int());
        assert!(!Type::Array(ClassId(0)).can_hold_int());
    }

    #[test]
    fn stmt_ref_ordering_is_method_then_index() {
        let a = StmtRef::new(MethodId(0), 9);
        let b = StmtRef::new(MethodId(1), 0);
        let c = StmtRef::new(MethodId(1), 3);
        assert!(a < b);
        assert!(b < c);
    }
}
