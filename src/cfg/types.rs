//! CFG type definitions.

use serde::{Deserialize, Serialize};

use crate::ir::MethodId;

/// Node in a per-method control-flow graph.
///
/// Node `0` is the synthetic entry, node `1` the synthetic exit, and node
/// `i + 2` is statement `i` of the method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CfgNodeId(pub usize);

/// What a CFG node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CfgNode {
    /// Synthetic method entry.
    Entry,
    /// Synthetic method exit.
    Exit,
    /// Statement at the given body index.
    Stmt(usize),
}

/// Control-flow edge label.
///
/// Dead-code detection keys on these to prune constant branches: an `If`
/// with a constant condition keeps only its matching `IfTrue`/`IfFalse`
/// edge, a `Switch` over a constant keeps the matching case (or the
/// default when no case matches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Sequential flow to the next statement.
    FallThrough,
    /// Unconditional jump.
    Goto,
    /// Branch taken when the condition holds.
    IfTrue,
    /// Branch taken when the condition fails.
    IfFalse,
    /// Switch case labelled with its constant.
    SwitchCase(i32),
    /// Switch default branch.
    SwitchDefault,
    /// Flow from a `Return` statement to the exit node.
    Return,
}

/// A labelled CFG edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgEdge {
    /// Source node.
    pub source: CfgNodeId,
    /// Target node.
    pub target: CfgNodeId,
    /// Edge label.
    pub kind: EdgeKind,
}

/// Control-flow graph of one method body.
///
/// Adjacency is computed once at construction; the graph is immutable
/// afterwards. Iteration over [`Cfg::nodes`] follows program order
/// (entry, statements in body order, exit), which keeps worklist seeds
/// and result dumps deterministic.
#[derive(Debug, Clone)]
pub struct Cfg {
    method: MethodId,
    stmt_count: usize,
    out_edges: Vec<Vec<CfgEdge>>,
    succs: Vec<Vec<CfgNodeId>>,
    preds: Vec<Vec<CfgNodeId>>,
}

impl Cfg {
    /// The synthetic entry node.
    pub const ENTRY: CfgNodeId = CfgNodeId(0);
    /// The synthetic exit node.
    pub const EXIT: CfgNodeId = CfgNodeId(1);

    pub(crate) fn new(
        method: MethodId,
        stmt_count: usize,
        out_edges: Vec<Vec<CfgEdge>>,
        succs: Vec<Vec<CfgNodeId>>,
        preds: Vec<Vec<CfgNodeId>>,
    ) -> Self {
        Self {
            method,
            stmt_count,
            out_edges,
            succs,
            preds,
        }
    }

    /// The method this graph belongs to.
    #[inline]
    #[must_use]
    pub fn method(&self) -> MethodId {
        self.method
    }

    /// Total number of nodes, synthetic nodes included.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.stmt_count + 2
    }

    /// Number of statements in the underlying body.
    #[inline]
    #[must_use]
    pub fn stmt_count(&self) -> usize {
        self.stmt_count
    }

    /// Map a statement index to its node.
    #[inline]
    #[must_use]
    pub fn node_of_stmt(&self, index: usize) -> CfgNodeId {
        CfgNodeId(index + 2)
    }

    /// What a node stands for.
    #[inline]
    #[must_use]
    pub fn node(&self, id: CfgNodeId) -> CfgNode {
        match id.0 {
            0 => CfgNode::Entry,
            1 => CfgNode::Exit,
            n => CfgNode::Stmt(n - 2),
        }
    }

    /// The statement index of a node, unless it is synthetic.
    #[inline]
    #[must_use]
    pub fn stmt_index(&self, id: CfgNodeId) -> Option<usize> {
        match self.node(id) {
            CfgNode::Stmt(i) => Some(i),
            _ => None,
        }
    }

    /// Nodes in program order: entry, statements, exit.
    pub fn nodes(&self) -> impl Iterator<Item = CfgNodeId> {
        let count = self.node_count();
        std::iter::once(Self::ENTRY)
            .chain((2..count).map(CfgNodeId))
            .chain(std::iter::once(Self::EXIT))
    }

    /// Successor nodes.
    #[inline]
    #[must_use]
    pub fn succs_of(&self, id: CfgNodeId) -> &[CfgNodeId] {
        &self.succs[id.0]
    }

    /// Predecessor nodes.
    #[inline]
    #[must_use]
    pub fn preds_of(&self, id: CfgNodeId) -> &[CfgNodeId] {
        &self.preds[id.0]
    }

    /// Outgoing labelled edges.
    #[inline]
    #[must_use]
    pub fn out_edges_of(&self, id: CfgNodeId) -> &[CfgEdge] {
        &self.out_edges[id.0]
    }
}
