//! Dataflow fact lattices and the per-node result store.
//!
//! # Lattice Structure
//!
//! Constant propagation uses a three-point lattice per variable:
//!
//! ```text
//!        Nac (not a constant)
//!       /    \
//!  Const(v1) ... Const(vn)
//!       \    /
//!        Undef (no information yet)
//! ```
//!
//! The meet of two different constants is `Nac`; `Nac` absorbs and
//! `Undef` is the identity. A [`CpFact`] maps variables to lattice
//! values with the invariant that absent keys mean `Undef`; `Undef` is
//! never stored explicitly, so map equality is lattice equality.
//!
//! Live-variable analysis uses plain sets ([`SetFact`]) with union as
//! its meet.

use std::hash::Hash;
use std::marker::PhantomData;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::cfg::CfgNodeId;
use crate::ir::VarId;

// =============================================================================
// Constant lattice
// =============================================================================

/// Abstract value of an integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Bottom: no information has reached this variable yet.
    Undef,
    /// The variable always holds this constant.
    Const(i32),
    /// Top: the variable may hold several values.
    Nac,
}

impl Value {
    /// Lattice meet (greatest lower bound in the analysis order).
    ///
    /// `Nac` absorbs, `Undef` is the identity, and two constants agree
    /// only when equal.
    #[must_use]
    pub fn meet(self, other: Value) -> Value {
        match (self, other) {
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            (Value::Undef, v) | (v, Value::Undef) => v,
            (Value::Const(a), Value::Const(b)) => {
                if a == b {
                    Value::Const(a)
                } else {
                    Value::Nac
                }
            }
        }
    }

    /// Whether this is the bottom element.
    #[inline]
    #[must_use]
    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    /// Whether this is a known constant.
    #[inline]
    #[must_use]
    pub fn is_const(&self) -> bool {
        matches!(self, Value::Const(_))
    }

    /// Whether this is the top element.
    #[inline]
    #[must_use]
    pub fn is_nac(&self) -> bool {
        matches!(self, Value::Nac)
    }

    /// The constant, if this is one.
    #[inline]
    #[must_use]
    pub fn as_const(&self) -> Option<i32> {
        match self {
            Value::Const(k) => Some(*k),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undef => write!(f, "undef"),
            Value::Const(k) => write!(f, "{k}"),
            Value::Nac => write!(f, "nac"),
        }
    }
}

// =============================================================================
// Constant-propagation fact
// =============================================================================

/// Map from variables to abstract [`Value`]s.
///
/// Absent keys denote [`Value::Undef`]; updates with `Undef` remove the
/// key, keeping the representation canonical so `==` compares lattice
/// elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpFact {
    map: FxHashMap<VarId, Value>,
}

impl CpFact {
    /// Create an empty fact (every variable `Undef`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The abstract value of a variable.
    #[inline]
    #[must_use]
    pub fn get(&self, var: VarId) -> Value {
        self.map.get(&var).copied().unwrap_or(Value::Undef)
    }

    /// Set the value of a variable; returns whether the fact changed.
    pub fn update(&mut self, var: VarId, value: Value) -> bool {
        if value.is_undef() {
            return self.map.remove(&var).is_some();
        }
        self.map.insert(var, value) != Some(value)
    }

    /// Drop a variable back to `Undef`; returns its previous value.
    pub fn remove(&mut self, var: VarId) -> Option<Value> {
        self.map.remove(&var)
    }

    /// Overwrite this fact with every binding of `other`; returns whether
    /// anything changed.
    ///
    /// Keys absent from `other` are left untouched; the caller is
    /// responsible for killing variables it wants killed. This in-place
    /// union is what makes the worklist transfer monotone.
    pub fn copy_from(&mut self, other: &CpFact) -> bool {
        let mut changed = false;
        for (&var, &value) in &other.map {
            changed |= self.update(var, value);
        }
        changed
    }

    /// Variables with a non-`Undef` value.
    pub fn keys(&self) -> impl Iterator<Item = VarId> + '_ {
        self.map.keys().copied()
    }

    /// Number of non-`Undef` bindings.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether every variable is `Undef`.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// =============================================================================
// Set fact
// =============================================================================

/// A set-valued fact, used with union as the meet operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetFact<T: Eq + Hash> {
    set: FxHashSet<T>,
}

impl<T: Eq + Hash> Default for SetFact<T> {
    fn default() -> Self {
        Self {
            set: FxHashSet::default(),
        }
    }
}

impl<T: Eq + Hash + Copy> SetFact<T> {
    /// Create an empty set fact.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one element; returns whether the set changed.
    pub fn add(&mut self, item: T) -> bool {
        self.set.insert(item)
    }

    /// Remove one element; returns whether the set changed.
    pub fn remove(&mut self, item: &T) -> bool {
        self.set.remove(item)
    }

    /// Membership test.
    #[inline]
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.set.contains(item)
    }

    /// Union `other` into this set; returns whether the set changed.
    pub fn union(&mut self, other: &SetFact<T>) -> bool {
        let before = self.set.len();
        self.set.extend(other.set.iter().copied());
        self.set.len() != before
    }

    /// Iterate over the elements (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.set.iter()
    }

    /// Whether the set is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }
}

// =============================================================================
// Result store
// =============================================================================

/// Marker for node id types that index densely from zero.
pub trait DenseNodeId: Copy {
    /// The dense index of this node.
    fn index(self) -> usize;
}

impl DenseNodeId for CfgNodeId {
    #[inline]
    fn index(self) -> usize {
        self.0
    }
}

/// IN/OUT fact pair per graph node.
#[derive(Debug, Clone)]
pub struct DataflowResult<N: DenseNodeId, F> {
    in_facts: Vec<F>,
    out_facts: Vec<F>,
    _node: PhantomData<N>,
}

impl<N: DenseNodeId, F> DataflowResult<N, F> {
    /// Allocate a result store with `count` nodes, each fact produced by
    /// `init`.
    pub fn new_with(count: usize, mut init: impl FnMut() -> F) -> Self {
        Self {
            in_facts: (0..count).map(|_| init()).collect(),
            out_facts: (0..count).map(|_| init()).collect(),
            _node: PhantomData,
        }
    }

    /// The IN fact of a node.
    #[inline]
    #[must_use]
    pub fn in_fact(&self, node: N) -> &F {
        &self.in_facts[node.index()]
    }

    /// The OUT fact of a node.
    #[inline]
    #[must_use]
    pub fn out_fact(&self, node: N) -> &F {
        &self.out_facts[node.index()]
    }

    pub(crate) fn set_in_fact(&mut self, node: N, fact: F) {
        self.in_facts[node.index()] = fact;
    }

    pub(crate) fn set_out_fact(&mut self, node: N, fact: F) {
        self.out_facts[node.index()] = fact;
    }

    pub(crate) fn out_fact_mut(&mut self, node: N) -> &mut F {
        &mut self.out_facts[node.index()]
    }

    pub(crate) fn in_fact_mut(&mut self, node: N) -> &mut F {
        &mut self.in_facts[node.index()]
    }
}
