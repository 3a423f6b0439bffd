//! Abstract contexts and context-selector policies.
//!
//! A context is an opaque hash-interned tuple of site or object ids; the
//! solver only ever compares contexts by their interned [`CtxId`]. The
//! selector decides what goes into the tuple:
//!
//! - [`ContextInsensitive`] - everything runs in the empty context
//!   (turns the context-sensitive solver into the insensitive one).
//! - [`KCallSite`] - k-CFA: the last `k` call sites on the path.
//! - [`KObject`] - k-object-sensitivity: the receiver allocation chain,
//!   `k` objects deep.

use rustc_hash::FxHashMap;

use crate::ir::{MethodId, StmtRef};

use super::heap::ObjId;

/// Interned context id. `CtxId(0)` is always the empty context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CtxId(pub usize);

/// One element of a context tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextElem {
    /// A call site (k-CFA style).
    Site(StmtRef),
    /// An allocation (object-sensitivity style).
    Obj(ObjId),
}

/// Hash-interner for context tuples.
#[derive(Debug)]
pub struct ContextInterner {
    contexts: Vec<Vec<ContextElem>>,
    index: FxHashMap<Vec<ContextElem>, CtxId>,
}

impl Default for ContextInterner {
    fn default() -> Self {
        let mut interner = Self {
            contexts: Vec::new(),
            index: FxHashMap::default(),
        };
        let empty = interner.intern(Vec::new());
        debug_assert_eq!(empty, CtxId(0));
        interner
    }
}

impl ContextInterner {
    /// Create an interner holding only the empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The empty context.
    #[inline]
    #[must_use]
    pub fn empty(&self) -> CtxId {
        CtxId(0)
    }

    /// Intern a tuple.
    pub fn intern(&mut self, elems: Vec<ContextElem>) -> CtxId {
        if let Some(&id) = self.index.get(&elems) {
            return id;
        }
        let id = CtxId(self.contexts.len());
        self.index.insert(elems.clone(), id);
        self.contexts.push(elems);
        id
    }

    /// The elements of a context.
    #[inline]
    #[must_use]
    pub fn elems(&self, ctx: CtxId) -> &[ContextElem] {
        &self.contexts[ctx.0]
    }

    /// Append `elem` to `ctx`, keeping only the last `limit` elements.
    pub fn append_truncated(&mut self, ctx: CtxId, elem: ContextElem, limit: usize) -> CtxId {
        if limit == 0 {
            return self.empty();
        }
        let mut elems = self.elems(ctx).to_vec();
        elems.push(elem);
        if elems.len() > limit {
            let drop = elems.len() - limit;
            elems.drain(..drop);
        }
        self.intern(elems)
    }

    /// Keep only the last `limit` elements of `ctx`.
    pub fn truncated(&mut self, ctx: CtxId, limit: usize) -> CtxId {
        let elems = self.elems(ctx);
        if elems.len() <= limit {
            return ctx;
        }
        let kept = elems[elems.len() - limit..].to_vec();
        self.intern(kept)
    }

    /// Number of distinct contexts seen so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Always false: the empty context exists from construction.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Policy choosing contexts for calls and allocations.
///
/// The solver treats the produced [`CtxId`]s as opaque keys; selectors
/// are free to derive them from call sites, receiver objects, or
/// nothing at all.
pub trait ContextSelector {
    /// Context for a static or special call.
    fn select_call(
        &self,
        interner: &mut ContextInterner,
        caller_ctx: CtxId,
        callsite: StmtRef,
        callee: MethodId,
    ) -> CtxId;

    /// Context for an instance call with a discovered receiver object.
    fn select_call_on(
        &self,
        interner: &mut ContextInterner,
        caller_ctx: CtxId,
        callsite: StmtRef,
        recv_heap_ctx: CtxId,
        recv_obj: ObjId,
        callee: MethodId,
    ) -> CtxId;

    /// Heap context for an allocation inside a context-qualified method.
    fn select_heap(&self, interner: &mut ContextInterner, method_ctx: CtxId, obj: ObjId) -> CtxId;
}

/// Every context is the empty context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextInsensitive;

impl ContextSelector for ContextInsensitive {
    fn select_call(
        &self,
        interner: &mut ContextInterner,
        _caller_ctx: CtxId,
        _callsite: StmtRef,
        _callee: MethodId,
    ) -> CtxId {
        interner.empty()
    }

    fn select_call_on(
        &self,
        interner: &mut ContextInterner,
        _caller_ctx: CtxId,
        _callsite: StmtRef,
        _recv_heap_ctx: CtxId,
        _recv_obj: ObjId,
        _callee: MethodId,
    ) -> CtxId {
        interner.empty()
    }

    fn select_heap(&self, interner: &mut ContextInterner, _method_ctx: CtxId, _obj: ObjId) -> CtxId {
        interner.empty()
    }
}

/// k-CFA: contexts are the last `k` call sites.
#[derive(Debug, Clone, Copy)]
pub struct KCallSite {
    /// Number of call sites kept.
    pub k: usize,
}

impl KCallSite {
    /// Create a k-call-site selector.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl ContextSelector for KCallSite {
    fn select_call(
        &self,
        interner: &mut ContextInterner,
        caller_ctx: CtxId,
        callsite: StmtRef,
        _callee: MethodId,
    ) -> CtxId {
        interner.append_truncated(caller_ctx, ContextElem::Site(callsite), self.k)
    }

    fn select_call_on(
        &self,
        interner: &mut ContextInterner,
        caller_ctx: CtxId,
        callsite: StmtRef,
        _recv_heap_ctx: CtxId,
        _recv_obj: ObjId,
        _callee: MethodId,
    ) -> CtxId {
        interner.append_truncated(caller_ctx, ContextElem::Site(callsite), self.k)
    }

    fn select_heap(&self, interner: &mut ContextInterner, method_ctx: CtxId, _obj: ObjId) -> CtxId {
        interner.truncated(method_ctx, self.k.saturating_sub(1))
    }
}

/// k-object-sensitivity: contexts are the receiver allocation chain.
#[derive(Debug, Clone, Copy)]
pub struct KObject {
    /// Number of allocations kept.
    pub k: usize,
}

impl KObject {
    /// Create a k-object selector.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl ContextSelector for KObject {
    fn select_call(
        &self,
        _interner: &mut ContextInterner,
        caller_ctx: CtxId,
        _callsite: StmtRef,
        _callee: MethodId,
    ) -> CtxId {
        // static calls inherit the caller's context
        caller_ctx
    }

    fn select_call_on(
        &self,
        interner: &mut ContextInterner,
        _caller_ctx: CtxId,
        _callsite: StmtRef,
        recv_heap_ctx: CtxId,
        recv_obj: ObjId,
        _callee: MethodId,
    ) -> CtxId {
        interner.append_truncated(recv_heap_ctx, ContextElem::Obj(recv_obj), self.k)
    }

    fn select_heap(&self, interner: &mut ContextInterner, method_ctx: CtxId, _obj: ObjId) -> CtxId {
        interner.truncated(method_ctx, self.k.saturating_sub(1))
    }
}
