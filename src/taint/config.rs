//! Taint rule configuration.
//!
//! Rules arrive as JSON keyed by `Class.subsig` method signatures:
//!
//! ```json
//! {
//!   "sources":   [ { "method": "S.src()", "type": "T" } ],
//!   "transfers": [ { "method": "U.wrap(Object)", "from": 0, "to": "result", "type": "T" } ],
//!   "sinks":     [ { "method": "K.sink(Object)", "index": 0 } ]
//! }
//! ```
//!
//! Positions are `"base"`, `"result"`, or a non-negative argument index.
//! Rules whose method signature or type name resolves to nothing in the
//! program are skipped with a warning - a configuration written for a
//! different library version must not abort the analysis.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::warn;

use crate::error::{FlowError, Result};
use crate::ir::{MethodId, Program, Type};

/// A value position at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaintPos {
    /// The receiver.
    Base,
    /// The i-th argument.
    Arg(usize),
    /// The call's result variable.
    Result,
}

/// A resolved taint-transfer rule: taint at `from` flows to `to`,
/// re-minted at type `ty`.
#[derive(Debug, Clone, Copy)]
pub struct TaintTransfer {
    /// Position taint is read from.
    pub from: TaintPos,
    /// Position taint is written to.
    pub to: TaintPos,
    /// Output type of the transferred taint.
    pub ty: Type,
}

// =============================================================================
// Raw (serde) schema
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPos {
    Index(usize),
    Name(String),
}

impl RawPos {
    fn resolve(&self) -> Option<TaintPos> {
        match self {
            RawPos::Index(i) => Some(TaintPos::Arg(*i)),
            RawPos::Name(name) => match name.as_str() {
                "base" => Some(TaintPos::Base),
                "result" => Some(TaintPos::Result),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSource {
    method: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
struct RawTransfer {
    method: String,
    from: RawPos,
    to: RawPos,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
struct RawSink {
    method: String,
    index: usize,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    transfers: Vec<RawTransfer>,
    #[serde(default)]
    sinks: Vec<RawSink>,
}

// =============================================================================
// Resolved configuration
// =============================================================================

/// Taint rules resolved against a program.
#[derive(Debug, Default)]
pub struct TaintConfig {
    sources: FxHashMap<MethodId, Vec<Type>>,
    transfers: FxHashMap<MethodId, Vec<TaintTransfer>>,
    sinks: FxHashMap<MethodId, Vec<usize>>,
}

impl TaintConfig {
    /// Load and resolve rules from a JSON file.
    pub fn load(path: &Path, program: &Program) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| FlowError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text, program).map_err(|source| FlowError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse and resolve rules from a JSON string.
    pub fn from_json(text: &str, program: &Program) -> serde_json::Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Ok(Self::resolve(raw, program))
    }

    fn resolve(raw: RawConfig, program: &Program) -> Self {
        let mut config = Self::default();
        for source in raw.sources {
            let Some(method) = program.method_by_signature(&source.method) else {
                warn!(method = %source.method, "skipping source rule: unknown method");
                continue;
            };
            let Some(ty) = parse_type(program, &source.ty) else {
                warn!(ty = %source.ty, "skipping source rule: unknown type");
                continue;
            };
            config.sources.entry(method).or_default().push(ty);
        }
        for transfer in raw.transfers {
            let Some(method) = program.method_by_signature(&transfer.method) else {
                warn!(method = %transfer.method, "skipping transfer rule: unknown method");
                continue;
            };
            let (Some(from), Some(to)) = (transfer.from.resolve(), transfer.to.resolve()) else {
                warn!(method = %transfer.method, "skipping transfer rule: bad position");
                continue;
            };
            let Some(ty) = parse_type(program, &transfer.ty) else {
                warn!(ty = %transfer.ty, "skipping transfer rule: unknown type");
                continue;
            };
            config
                .transfers
                .entry(method)
                .or_default()
                .push(TaintTransfer { from, to, ty });
        }
        for sink in raw.sinks {
            let Some(method) = program.method_by_signature(&sink.method) else {
                warn!(method = %sink.method, "skipping sink rule: unknown method");
                continue;
            };
            config.sinks.entry(method).or_default().push(sink.index);
        }
        config
    }

    /// Programmatic rule construction (tests, embedders).
    pub fn add_source(&mut self, method: MethodId, ty: Type) {
        self.sources.entry(method).or_default().push(ty);
    }

    /// Add a transfer rule.
    pub fn add_transfer(&mut self, method: MethodId, transfer: TaintTransfer) {
        self.transfers.entry(method).or_default().push(transfer);
    }

    /// Add a sink rule.
    pub fn add_sink(&mut self, method: MethodId, index: usize) {
        self.sinks.entry(method).or_default().push(index);
    }

    /// Source result types for a callee, if it is a source.
    #[inline]
    #[must_use]
    pub fn sources_of(&self, method: MethodId) -> &[Type] {
        self.sources.get(&method).map_or(&[], Vec::as_slice)
    }

    /// Transfer rules for a callee.
    #[inline]
    #[must_use]
    pub fn transfers_of(&self, method: MethodId) -> &[TaintTransfer] {
        self.transfers.get(&method).map_or(&[], Vec::as_slice)
    }

    /// Sink argument indexes for a callee.
    #[inline]
    #[must_use]
    pub fn sinks_of(&self, method: MethodId) -> &[usize] {
        self.sinks.get(&method).map_or(&[], Vec::as_slice)
    }
}

/// Resolve a type name: primitive keywords first, then class names.
fn parse_type(program: &Program, name: &str) -> Option<Type> {
    match name {
        "byte" => Some(Type::Byte),
        "short" => Some(Type::Short),
        "int" => Some(Type::Int),
        "char" => Some(Type::Char),
        "boolean" => Some(Type::Boolean),
        "long" => Some(Type::Long),
        "float" => Some(Type::Float),
        "double" => Some(Type::Double),
        _ => {
            let class = name.strip_suffix("[]");
            match class {
                Some(elem) => program.class_by_name(elem).map(Type::Array),
                None => program.class_by_name(name).map(Type::Object),
            }
        }
    }
}
