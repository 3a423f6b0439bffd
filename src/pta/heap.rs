//! Allocation-site heap abstraction.
//!
//! Each `New` statement denotes one abstract object, canonical per site:
//! asking for the same site twice yields the same [`ObjId`]. The taint
//! overlay mints additional distinguished objects carrying their source
//! call site as provenance; those are deduplicated by *(source, type)*,
//! so the same source observed at two transfer output types yields two
//! distinct objects.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ir::{ClassId, StmtRef, Type};

/// Dense id of an abstract heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjId(pub usize);

/// What an abstract object stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapObj {
    /// Object allocated at a `New` site.
    Alloc {
        /// The allocation site.
        site: StmtRef,
        /// Allocated class.
        class: ClassId,
    },
    /// Taint object minted by a source or transfer rule.
    Taint {
        /// Call site of the originating source.
        source: StmtRef,
        /// Type the taint currently flows at.
        ty: Type,
    },
}

/// The program's abstract heap.
#[derive(Debug, Default)]
pub struct HeapModel {
    objs: Vec<HeapObj>,
    alloc_sites: FxHashMap<StmtRef, ObjId>,
    taints: FxHashMap<(StmtRef, Type), ObjId>,
}

impl HeapModel {
    /// Create an empty heap model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical object for an allocation site.
    pub fn obj_at(&mut self, site: StmtRef, class: ClassId) -> ObjId {
        if let Some(&id) = self.alloc_sites.get(&site) {
            return id;
        }
        let id = ObjId(self.objs.len());
        self.objs.push(HeapObj::Alloc { site, class });
        self.alloc_sites.insert(site, id);
        id
    }

    /// The canonical taint object for a source call site at a type.
    pub fn make_taint(&mut self, source: StmtRef, ty: Type) -> ObjId {
        if let Some(&id) = self.taints.get(&(source, ty)) {
            return id;
        }
        let id = ObjId(self.objs.len());
        self.objs.push(HeapObj::Taint { source, ty });
        self.taints.insert((source, ty), id);
        id
    }

    /// The object data behind an id.
    #[inline]
    #[must_use]
    pub fn obj(&self, id: ObjId) -> &HeapObj {
        &self.objs[id.0]
    }

    /// The run-time class of an object, used for virtual dispatch.
    ///
    /// Taint objects dispatch through their current type when it is an
    /// object type; array-typed and primitive-typed taints have none.
    #[must_use]
    pub fn class_of(&self, id: ObjId) -> Option<ClassId> {
        match &self.objs[id.0] {
            HeapObj::Alloc { class, .. } => Some(*class),
            HeapObj::Taint { ty, .. } => ty.as_class(),
        }
    }

    /// Whether an object is a taint object.
    #[inline]
    #[must_use]
    pub fn is_taint(&self, id: ObjId) -> bool {
        matches!(self.objs[id.0], HeapObj::Taint { .. })
    }

    /// The source call site of a taint object.
    #[must_use]
    pub fn taint_source(&self, id: ObjId) -> Option<StmtRef> {
        match &self.objs[id.0] {
            HeapObj::Taint { source, .. } => Some(*source),
            HeapObj::Alloc { .. } => None,
        }
    }

    /// Number of abstract objects.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objs.len()
    }

    /// Whether the heap is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::MethodId;

    #[test]
    fn alloc_sites_are_canonical() {
        let mut heap = HeapModel::new();
        let site = StmtRef::new(MethodId(0), 3);
        let a = heap.obj_at(site, ClassId(1));
        let b = heap.obj_at(site, ClassId(1));
        assert_eq!(a, b);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.class_of(a), Some(ClassId(1)));
        assert!(!heap.is_taint(a));
    }

    #[test]
    fn taints_dedupe_by_source_and_type() {
        let mut heap = HeapModel::new();
        let source = StmtRef::new(MethodId(0), 0);
        let t1 = heap.make_taint(source, Type::Object(ClassId(2)));
        let t2 = heap.make_taint(source, Type::Object(ClassId(2)));
        let t3 = heap.make_taint(source, Type::Object(ClassId(3)));
        assert_eq!(t1, t2);
        // same source, different type: distinct objects
        assert_ne!(t1, t3);
        assert!(heap.is_taint(t1));
        assert_eq!(heap.taint_source(t3), Some(source));
    }
}
