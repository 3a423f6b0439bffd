//! classflow - whole-program static analysis over a class-based IR.
//!
//! The engine computes a family of interrelated analyses on a typed,
//! three-address, class-based intermediate representation:
//!
//! - **Intraprocedural dataflow**: forward integer constant propagation,
//!   backward live variables, and dead-code detection fusing the two
//!   ([`dataflow`]).
//! - **Call graphs** by Class Hierarchy Analysis ([`callgraph`]).
//! - **Pointer analysis**, context-insensitive and context-sensitive,
//!   with on-the-fly call-graph discovery ([`pta`]).
//! - **Interprocedural constant propagation** over the ICFG, using
//!   pointer-derived alias information for heap and array accesses
//!   ([`dataflow::inter`], [`icfg`]).
//! - **Taint analysis** as an overlay on the context-sensitive solver,
//!   driven by source/transfer/sink rules ([`taint`]).
//!
//! Programs are built through [`ir::ProgramBuilder`] (IR construction
//! from source or bytecode is a front-end concern, not this crate's);
//! all analyses treat the finished [`ir::Program`] as immutable.
//!
//! # Example
//!
//! ```ignore
//! use classflow::{AnalysisOptions, run_pointer_analysis};
//! use classflow::dataflow::detect_dead_code;
//!
//! let program = front_end_builds_program()?;
//! let dead = detect_dead_code(&program, program.entry());
//!
//! let options = AnalysisOptions::new("2-call-site")
//!     .with_taint_config("taint-rules.json");
//! let pta = run_pointer_analysis(&program, &options)?;
//! for flow in pta.taint_flows(classflow::pta::TAINT_FLOWS_KEY).into_iter().flatten() {
//!     println!("taint: {flow:?}");
//! }
//! ```

pub mod callgraph;
pub mod cfg;
pub mod dataflow;
pub mod error;
pub mod icfg;
pub mod ir;
pub mod pta;
pub mod taint;

use std::path::PathBuf;

use tracing::warn;

use crate::dataflow::{CpFact, DataflowResult, InterConstantPropagation, InterSolver};
use crate::icfg::{Icfg, IcfgNodeId};
use crate::ir::Program;
use crate::pta::{
    solve_ci, solve_cs, solve_cs_with_taint, ContextInsensitive, KCallSite, KObject,
    PointerAnalysisResult,
};
use crate::taint::{TaintAnalysis, TaintConfig};

pub use crate::error::{FlowError, Result};

/// Options for the pointer-analysis drivers.
///
/// `pta` names the variant to run: `"ci"`, `"<k>-call-site"` (k-CFA) or
/// `"<k>-object"` (object sensitivity). An unknown name degrades to
/// `"ci"` with a warning rather than aborting.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Pointer-analysis variant name.
    pub pta: String,
    /// Path to a taint-rule JSON file; `None` disables the overlay.
    pub taint_config: Option<PathBuf>,
}

impl AnalysisOptions {
    /// Options for a named pointer-analysis variant.
    #[must_use]
    pub fn new(pta: &str) -> Self {
        Self {
            pta: pta.to_owned(),
            taint_config: None,
        }
    }

    /// Enable the taint overlay with rules from a file.
    #[must_use]
    pub fn with_taint_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.taint_config = Some(path.into());
        self
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new("ci")
    }
}

enum Selector {
    Insensitive,
    CallSite(usize),
    Object(usize),
}

fn parse_selector(name: &str) -> Selector {
    if name == "ci" {
        return Selector::Insensitive;
    }
    let parse_k = |suffix: &str| -> Option<usize> {
        name.strip_suffix(suffix).and_then(|k| k.parse().ok())
    };
    if let Some(k) = parse_k("-call-site") {
        return Selector::CallSite(k);
    }
    if let Some(k) = parse_k("-object") {
        return Selector::Object(k);
    }
    warn!(pta = name, "unknown pointer analysis variant, using ci");
    Selector::Insensitive
}

/// Run the pointer analysis selected by `options`, with the taint
/// overlay when a rule file is configured.
pub fn run_pointer_analysis(
    program: &Program,
    options: &AnalysisOptions,
) -> Result<PointerAnalysisResult> {
    let selector = parse_selector(&options.pta);
    let taint = match &options.taint_config {
        Some(path) => Some(TaintAnalysis::new(TaintConfig::load(path, program)?)),
        None => None,
    };

    let result = match (selector, taint) {
        (Selector::Insensitive, None) => match options.pta.as_str() {
            // plain "ci" without taint runs the leaner insensitive solver
            "ci" => solve_ci(program),
            _ => solve_cs(program, ContextInsensitive),
        },
        (Selector::Insensitive, Some(t)) => solve_cs_with_taint(program, ContextInsensitive, t),
        (Selector::CallSite(k), None) => solve_cs(program, KCallSite::new(k)),
        (Selector::CallSite(k), Some(t)) => solve_cs_with_taint(program, KCallSite::new(k), t),
        (Selector::Object(k), None) => solve_cs(program, KObject::new(k)),
        (Selector::Object(k), Some(t)) => solve_cs_with_taint(program, KObject::new(k), t),
    };
    Ok(result)
}

/// Run interprocedural constant propagation on top of a frozen
/// pointer-analysis result.
///
/// The pointer analysis must have run to completion first: the alias map
/// is derived from its final points-to sets and never updated afterwards.
#[must_use]
pub fn run_inter_constant_propagation(
    program: &Program,
    pta: &PointerAnalysisResult,
) -> (Icfg, DataflowResult<IcfgNodeId, CpFact>) {
    let icfg = Icfg::build(program, pta.call_graph());
    let mut analysis = InterConstantPropagation::new(program, &icfg, pta);
    let result = InterSolver::new(&icfg).solve(&mut analysis);
    (icfg, result)
}
