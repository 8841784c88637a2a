//! Core data structures for the reachability graph artifact.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ResolvedConfig;

/// Canonical node identifier: `<relpath>:<qualifiedName>`.
///
/// A pure function of file path and syntactic qualified name — never a
/// hash, never a runtime position — so that two runs over identical
/// inputs produce identical ids (§3 invariant 7).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(file_path: &str, qualified_name: &str) -> Self {
        NodeId(format!("{file_path}:{qualified_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// The fixed id of the virtual entry node (§3 EntryNode).
pub const ENTRY_NODE_ID: &str = "__entry__";

/// Sentinel target prefix for a call-site that could not be statically resolved.
pub const DYNAMIC_SENTINEL_PREFIX: &str = "[dynamic:";

/// Build the `[dynamic:<expr>]` sentinel target string for an edge.
pub fn dynamic_sentinel(expr: &str) -> String {
    format!("{DYNAMIC_SENTINEL_PREFIX}{expr}]")
}

/// Source languages this engine extracts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Typescript,
    Go,
    Python,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Typescript => "typescript",
            Language::Go => "go",
            Language::Python => "python",
        };
        f.write_str(s)
    }
}

/// What kind of callable declaration a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Function,
    Method,
    Constructor,
    Arrow,
    Closure,
    Lambda,
    Init,
}

/// Declared visibility of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Exported,
    Public,
    Private,
    Internal,
    Module,
}

/// Reachability classification, assigned by the `ReachabilityEngine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Live,
    Dead,
    Entry,
}

/// Derived display color — a pure function of `(status, unusedParameters.len() > 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Blue,
    Green,
    Yellow,
    Red,
    Orange,
}

/// §4.5 color derivation table.
pub fn derive_color(status: Status, has_unused_parameters: bool) -> Color {
    match (status, has_unused_parameters) {
        (Status::Entry, _) => Color::Blue,
        (Status::Live, false) => Color::Green,
        (Status::Live, true) => Color::Yellow,
        (Status::Dead, false) => Color::Red,
        (Status::Dead, true) => Color::Orange,
    }
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    pub is_used: bool,
    pub position: u32,
}

/// A function-like unit of source code (§3 Node).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub qualified_name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub language: Language,
    pub kind: NodeKind,
    pub visibility: Visibility,
    pub is_entry_point: bool,
    pub parameters: Vec<Parameter>,
    pub unused_parameters: Vec<String>,
    pub package_or_module: String,
    pub lines_of_code: u32,
    pub status: Status,
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorators: Option<Vec<String>>,
}

impl Node {
    /// Construct a node in its pre-classification state: `status`/`color`/`is_entry_point`
    /// are placeholders until `EntryPointMatcher`/`ReachabilityEngine` run.
    #[allow(clippy::too_many_arguments)]
    pub fn new_unclassified(
        file_path: String,
        qualified_name: String,
        name: String,
        start_line: u32,
        end_line: u32,
        language: Language,
        kind: NodeKind,
        visibility: Visibility,
        parameters: Vec<Parameter>,
        decorators: Option<Vec<String>>,
    ) -> Self {
        let id = NodeId::new(&file_path, &qualified_name);
        let unused_parameters = parameters
            .iter()
            .filter(|p| !p.is_used)
            .map(|p| p.name.clone())
            .collect();
        let package_or_module = package_of(&file_path);
        let lines_of_code = end_line.saturating_sub(start_line) + 1;
        Node {
            id,
            name,
            qualified_name,
            file_path,
            start_line,
            end_line,
            language,
            kind,
            visibility,
            is_entry_point: false,
            parameters,
            unused_parameters,
            package_or_module,
            lines_of_code,
            status: Status::Dead,
            color: Color::Red,
            decorators,
        }
    }
}

/// Directory of `file_path` (or, for files directly under the project root, `.`).
pub fn package_of(file_path: &str) -> String {
    match file_path.rfind('/') {
        Some(idx) => file_path[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// What kind of call or function-value reference an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Direct,
    Method,
    Interface,
    Constructor,
    Callback,
    Funcref,
    Varinit,
    Provided,
    Dynamic,
}

/// 1-indexed source location of a call site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallSite {
    pub file_path: String,
    pub line: u32,
    pub column: u32,
}

/// A directed call/reference edge (§3 Edge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    /// A real node id, or a `[dynamic:<expr>]` sentinel when `is_resolved` is false.
    pub target: String,
    pub call_site: CallSite,
    pub kind: EdgeKind,
    pub is_resolved: bool,
}

impl Edge {
    pub fn resolved(source: NodeId, target: NodeId, call_site: CallSite, kind: EdgeKind) -> Self {
        Edge {
            source,
            target: target.0,
            call_site,
            kind,
            is_resolved: true,
        }
    }

    pub fn dynamic(source: NodeId, expr: &str, call_site: CallSite) -> Self {
        Edge {
            source,
            target: dynamic_sentinel(expr),
            call_site,
            kind: EdgeKind::Dynamic,
            is_resolved: false,
        }
    }

    /// Sort key used by the §4.8 determinism ordering rule for edges.
    pub fn sort_key(&self) -> (String, String, String, u32, u32, u8) {
        (
            self.source.0.clone(),
            self.target.clone(),
            self.call_site.file_path.clone(),
            self.call_site.line,
            self.call_site.column,
            edge_kind_rank(self.kind),
        )
    }
}

fn edge_kind_rank(kind: EdgeKind) -> u8 {
    match kind {
        EdgeKind::Direct => 0,
        EdgeKind::Method => 1,
        EdgeKind::Interface => 2,
        EdgeKind::Constructor => 3,
        EdgeKind::Callback => 4,
        EdgeKind::Funcref => 5,
        EdgeKind::Varinit => 6,
        EdgeKind::Provided => 7,
        EdgeKind::Dynamic => 8,
    }
}

/// The virtual entry node: a fixed id whose `targets` is the final entry-point id set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryNode {
    pub id: String,
    pub name: String,
    pub targets: Vec<String>,
}

impl EntryNode {
    pub fn new(mut targets: Vec<String>) -> Self {
        targets.sort();
        EntryNode {
            id: ENTRY_NODE_ID.to_string(),
            name: "External Callers".to_string(),
            targets,
        }
    }
}

/// A directory/module-derived grouping of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    pub node_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Count + percentage + per-package histogram, shared shape for dead-function
/// and unused-parameter stats (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountStat {
    pub count: usize,
    pub percentage: f64,
    pub by_package: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPointsStat {
    pub count: usize,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargestFunctionEntry {
    pub id: String,
    pub lines_of_code: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub dead_functions: CountStat,
    pub unused_parameters: CountStat,
    pub entry_points: EntryPointsStat,
    pub largest_functions: Vec<LargestFunctionEntry>,
}

/// Schema version carried in `metadata.version`. Major-version gate (§6.1, §4.9):
/// a reader rejects any artifact whose major component differs from this one.
pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: String,
    pub generated_at: String,
    pub language: Language,
    pub project_root: String,
    pub analysis_time_ms: u64,
    pub total_files: usize,
    pub total_functions: usize,
    pub total_edges: usize,
    pub total_dead_functions: usize,
    pub total_unused_parameters: usize,
    pub config: ResolvedConfig,
}

/// The complete, self-describing artifact emitted once per analysis run (§3, §6.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeGraph {
    pub metadata: Metadata,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub entry_node: EntryNode,
    pub clusters: Vec<Cluster>,
    pub stats: Stats,
}
