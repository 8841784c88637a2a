//! reachgraph-core — the data model, reachability engine, and artifact
//! codec shared by every language extractor.

pub mod assembler;
pub mod clusters;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod entrypoints;
pub mod error;
pub mod model;
pub mod reachability;
pub mod stats;
pub mod symbols;

#[cfg(test)]
pub mod test_utils;

pub use assembler::{assemble, ExtractionResult};
pub use config::{EntryPointRule, GoConfig, PythonConfig, ResolvedConfig, TypescriptConfig};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use error::{ReachError, Result};
pub use model::{
    derive_color, dynamic_sentinel, package_of, CallSite, CodeGraph, Cluster, Color, CountStat,
    Edge, EdgeKind, EntryNode, EntryPointsStat, Language, LargestFunctionEntry, Metadata, Node,
    NodeId, NodeKind, Parameter, Stats, Status, Visibility, DYNAMIC_SENTINEL_PREFIX,
    ENTRY_NODE_ID, SCHEMA_VERSION,
};
pub use symbols::SymbolTable;
