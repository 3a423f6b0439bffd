//! Interprocedural control-flow graph.
//!
//! The ICFG is the union of the per-method CFGs of every reachable
//! method, glued together at call sites:
//!
//! - `Normal` - an intra-method CFG edge of a non-call node.
//! - `Call` - call site to callee entry.
//! - `Return` - callee exit to each return site (the call site's
//!   intra-method successors), carrying the callee's return variables.
//! - `CallToReturn` - call site to its return sites within the caller,
//!   modelling the "skip the call" transfer (caller-local facts survive,
//!   the call's result is killed and re-supplied by the `Return` edge).
//!
//! Node ids are dense across all methods, so interprocedural dataflow
//! results live in flat vectors exactly like the intraprocedural ones.

use rustc_hash::FxHashMap;

use crate::callgraph::CallGraph;
use crate::cfg::{build_cfg, Cfg, CfgNodeId};
use crate::dataflow::DenseNodeId;
use crate::ir::{MethodId, Program, Stmt, StmtRef, VarId};

/// Dense id of an ICFG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IcfgNodeId(pub usize);

impl DenseNodeId for IcfgNodeId {
    #[inline]
    fn index(self) -> usize {
        self.0
    }
}

/// Kind of an ICFG edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcfgEdgeKind {
    /// Intra-method flow.
    Normal,
    /// Call site to callee entry.
    Call {
        /// The callee entered.
        callee: MethodId,
    },
    /// Callee exit back to a return site.
    Return {
        /// The call site being returned to.
        callsite: StmtRef,
        /// The callee's return variables.
        ret_vars: Vec<VarId>,
    },
    /// Call site to its return site within the caller.
    CallToReturn {
        /// The call site being skipped.
        callsite: StmtRef,
    },
}

/// A directed ICFG edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcfgEdge {
    /// Source node.
    pub source: IcfgNodeId,
    /// Target node.
    pub target: IcfgNodeId,
    /// Edge kind.
    pub kind: IcfgEdgeKind,
}

/// The interprocedural CFG.
#[derive(Debug)]
pub struct Icfg {
    cfgs: FxHashMap<MethodId, Cfg>,
    nodes: Vec<(MethodId, CfgNodeId)>,
    node_index: FxHashMap<(MethodId, CfgNodeId), IcfgNodeId>,
    in_edges: Vec<Vec<IcfgEdge>>,
    out_edges: Vec<Vec<IcfgEdge>>,
    entry_nodes: Vec<IcfgNodeId>,
}

impl Icfg {
    /// Build the ICFG of every reachable method of a call graph.
    ///
    /// Call sites whose targets were never resolved keep their
    /// `CallToReturn` edges but get no `Call`/`Return` edges; the
    /// analysis proceeds around them.
    #[must_use]
    pub fn build(program: &Program, call_graph: &CallGraph) -> Self {
        let mut cfgs: FxHashMap<MethodId, Cfg> = FxHashMap::default();
        let mut nodes = Vec::new();
        let mut node_index = FxHashMap::default();

        for &method in call_graph.reachable_methods() {
            let Some(ir) = program.ir_of(method) else {
                continue;
            };
            let cfg = build_cfg(method, ir);
            for node in cfg.nodes() {
                let id = IcfgNodeId(nodes.len());
                nodes.push((method, node));
                node_index.insert((method, node), id);
            }
            cfgs.insert(method, cfg);
        }

        let mut out_edges: Vec<Vec<IcfgEdge>> = vec![Vec::new(); nodes.len()];
        let mut in_edges: Vec<Vec<IcfgEdge>> = vec![Vec::new(); nodes.len()];
        let mut push = |out: &mut Vec<Vec<IcfgEdge>>, in_: &mut Vec<Vec<IcfgEdge>>, edge: IcfgEdge| {
            out[edge.source.0].push(edge.clone());
            in_[edge.target.0].push(edge);
        };

        for (&method, cfg) in &cfgs {
            let ir = match program.ir_of(method) {
                Some(ir) => ir,
                None => continue,
            };
            for node in cfg.nodes() {
                let source = node_index[&(method, node)];
                let callsite = cfg.stmt_index(node).map(|i| StmtRef::new(method, i));
                let invoke = callsite
                    .and_then(|site| ir.stmts.get(site.index))
                    .and_then(Stmt::as_invoke);

                if let (Some(site), Some(_)) = (callsite, invoke) {
                    // the intra edges of a call site become call-to-return
                    for &succ in cfg.succs_of(node) {
                        let target = node_index[&(method, succ)];
                        push(
                            &mut out_edges,
                            &mut in_edges,
                            IcfgEdge {
                                source,
                                target,
                                kind: IcfgEdgeKind::CallToReturn { callsite: site },
                            },
                        );
                    }
                    for callee in call_graph.callees_of(site) {
                        let Some(callee_ir) = program.ir_of(callee) else {
                            continue;
                        };
                        let Some(&callee_entry) = node_index.get(&(callee, Cfg::ENTRY)) else {
                            continue;
                        };
                        push(
                            &mut out_edges,
                            &mut in_edges,
                            IcfgEdge {
                                source,
                                target: callee_entry,
                                kind: IcfgEdgeKind::Call { callee },
                            },
                        );
                        let callee_exit = node_index[&(callee, Cfg::EXIT)];
                        for &succ in cfg.succs_of(node) {
                            let target = node_index[&(method, succ)];
                            push(
                                &mut out_edges,
                                &mut in_edges,
                                IcfgEdge {
                                    source: callee_exit,
                                    target,
                                    kind: IcfgEdgeKind::Return {
                                        callsite: site,
                                        ret_vars: callee_ir.return_vars.clone(),
                                    },
                                },
                            );
                        }
                    }
                } else {
                    for &succ in cfg.succs_of(node) {
                        let target = node_index[&(method, succ)];
                        push(
                            &mut out_edges,
                            &mut in_edges,
                            IcfgEdge {
                                source,
                                target,
                                kind: IcfgEdgeKind::Normal,
                            },
                        );
                    }
                }
            }
        }

        let entry_nodes = call_graph
            .entries()
            .iter()
            .filter_map(|&m| node_index.get(&(m, Cfg::ENTRY)).copied())
            .collect();

        Self {
            cfgs,
            nodes,
            node_index,
            in_edges,
            out_edges,
            entry_nodes,
        }
    }

    /// Total number of nodes.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All node ids, methods in discovery order, nodes in program order.
    pub fn nodes(&self) -> impl Iterator<Item = IcfgNodeId> {
        (0..self.nodes.len()).map(IcfgNodeId)
    }

    /// The (method, CFG node) pair behind an id.
    #[inline]
    #[must_use]
    pub fn node(&self, id: IcfgNodeId) -> (MethodId, CfgNodeId) {
        self.nodes[id.0]
    }

    /// The method containing a node.
    #[inline]
    #[must_use]
    pub fn method_of(&self, id: IcfgNodeId) -> MethodId {
        self.nodes[id.0].0
    }

    /// The statement position of a node, unless it is synthetic.
    #[must_use]
    pub fn stmt_ref_of(&self, id: IcfgNodeId) -> Option<StmtRef> {
        let (method, node) = self.nodes[id.0];
        self.cfgs[&method]
            .stmt_index(node)
            .map(|i| StmtRef::new(method, i))
    }

    /// Look up the node of a (method, CFG node) pair.
    #[inline]
    #[must_use]
    pub fn lookup(&self, method: MethodId, node: CfgNodeId) -> Option<IcfgNodeId> {
        self.node_index.get(&(method, node)).copied()
    }

    /// The node of a statement position.
    #[must_use]
    pub fn node_of_stmt(&self, site: StmtRef) -> Option<IcfgNodeId> {
        let cfg = self.cfgs.get(&site.method)?;
        self.lookup(site.method, cfg.node_of_stmt(site.index))
    }

    /// The per-method CFG of an included method.
    #[inline]
    #[must_use]
    pub fn cfg_of(&self, method: MethodId) -> Option<&Cfg> {
        self.cfgs.get(&method)
    }

    /// Incoming edges.
    #[inline]
    #[must_use]
    pub fn in_edges_of(&self, id: IcfgNodeId) -> &[IcfgEdge] {
        &self.in_edges[id.0]
    }

    /// Outgoing edges.
    #[inline]
    #[must_use]
    pub fn out_edges_of(&self, id: IcfgNodeId) -> &[IcfgEdge] {
        &self.out_edges[id.0]
    }

    /// Entry nodes of the entry methods.
    #[inline]
    #[must_use]
    pub fn entry_nodes(&self) -> &[IcfgNodeId] {
        &self.entry_nodes
    }
}
