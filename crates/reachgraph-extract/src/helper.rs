//! Helper child-process protocol (§6.3, used by Go and Python).
//!
//! Single-shot: write a JSON request on stdin, close it, read one JSON
//! response from stdout. Warnings are line-oriented on stderr. A soft
//! timeout kills the child and fails the run with `HelperTimeout`.
//!
//! Grounded on the teacher's `tokio::process::Command` usage style
//! (spawned elsewhere in the watcher/server crates) combined with the
//! corpus's `resolver.rs` confidence-scored edge shape.

use std::path::PathBuf;
use std::time::Duration;

use reachgraph_core::{CallSite, Edge, EdgeKind, Node, NodeId, NodeKind, Parameter, Visibility};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

#[derive(Debug, Serialize)]
pub struct HelperRequest<'a> {
    pub files: &'a [String],
    #[serde(rename = "projectRoot")]
    pub project_root: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct HelperParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_annotation: Option<String>,
    #[serde(rename = "isUsed")]
    pub is_used: bool,
    pub position: u32,
}

#[derive(Debug, Deserialize)]
pub struct HelperNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "qualifiedName")]
    pub qualified_name: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "startLine")]
    pub start_line: u32,
    #[serde(rename = "endLine")]
    pub end_line: u32,
    /// One of `function`/`method`/`constructor`/`arrow`/`closure`/`lambda`/
    /// `init` — the same lowercase tags `NodeKind` serializes to on the
    /// artifact itself (§3). Unrecognized values fall back to `function`.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// One of `exported`/`public`/`private`/`internal`/`module`, same
    /// convention as `Visibility`. Unrecognized values fall back to
    /// `module`.
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default)]
    pub parameters: Vec<HelperParameter>,
}

fn default_kind() -> String {
    "function".to_string()
}

fn default_visibility() -> String {
    "module".to_string()
}

#[derive(Debug, Deserialize)]
pub struct HelperEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub line: u32,
    pub column: u32,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct HelperResponse {
    pub nodes: Vec<HelperNode>,
    pub edges: Vec<HelperEdge>,
}

/// Invokes `program` with `args`, feeding it a §6.3 JSON request on stdin
/// and reading a single JSON response from stdout, bounded by `timeout_secs`.
///
/// Returns `Err` with the child's stderr attached on any non-zero exit or
/// unparsable response; the caller maps this to `HelperUnavailable` (when
/// the program itself can't be found) or `HelperTimeout` (on expiry).
pub async fn run_helper(
    program: &str,
    args: &[&str],
    request: &HelperRequest<'_>,
    timeout_secs: u64,
) -> anyhow::Result<HelperResponse> {
    let payload = serde_json::to_vec(request)?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(&payload).await?;
    }

    let output = timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await??;

    if !output.status.success() {
        anyhow::bail!(
            "helper `{program}` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let response: HelperResponse = serde_json::from_slice(&output.stdout)?;
    Ok(response)
}

/// Converts a helper's wire-shape nodes/edges (untyped, language-neutral
/// strings) into the engine's typed `Node`/`Edge` model. Kind strings that
/// don't match a known `EdgeKind`/`NodeKind`/`Visibility` fall back to
/// `direct`/`function`/`module` respectively with a logged warning — the
/// helper protocol has no closed enum of its own on the wire, only the
/// engine's internal model does.
pub fn into_model(response: HelperResponse, language: reachgraph_core::Language) -> (Vec<Node>, Vec<Edge>) {
    let nodes = response
        .nodes
        .into_iter()
        .map(|n| {
            let kind = parse_node_kind(&n.kind);
            let visibility = parse_visibility(&n.visibility);
            let parameters = n.parameters.into_iter().map(into_parameter).collect();
            Node::new_unclassified(
                n.file_path,
                n.qualified_name,
                n.name,
                n.start_line,
                n.end_line,
                language,
                kind,
                visibility,
                parameters,
                None,
            )
        })
        .collect();

    let edges = response
        .edges
        .into_iter()
        .map(|e| {
            let kind = parse_edge_kind(&e.kind);
            Edge::resolved(
                NodeId::from(e.source),
                NodeId::from(e.target),
                CallSite {
                    file_path: e.file_path,
                    line: e.line,
                    column: e.column,
                },
                kind,
            )
        })
        .collect();

    (nodes, edges)
}

fn parse_edge_kind(kind: &str) -> EdgeKind {
    match kind {
        "method" => EdgeKind::Method,
        "interface" => EdgeKind::Interface,
        "constructor" => EdgeKind::Constructor,
        "callback" => EdgeKind::Callback,
        "funcref" => EdgeKind::Funcref,
        "varinit" => EdgeKind::Varinit,
        "provided" => EdgeKind::Provided,
        _ => EdgeKind::Direct,
    }
}

fn parse_node_kind(kind: &str) -> NodeKind {
    match kind {
        "method" => NodeKind::Method,
        "constructor" => NodeKind::Constructor,
        "arrow" => NodeKind::Arrow,
        "closure" => NodeKind::Closure,
        "lambda" => NodeKind::Lambda,
        "init" => NodeKind::Init,
        _ => NodeKind::Function,
    }
}

fn parse_visibility(visibility: &str) -> Visibility {
    match visibility {
        "exported" => Visibility::Exported,
        "public" => Visibility::Public,
        "private" => Visibility::Private,
        "internal" => Visibility::Internal,
        _ => Visibility::Module,
    }
}

fn into_parameter(p: HelperParameter) -> Parameter {
    Parameter {
        name: p.name,
        type_annotation: p.type_annotation,
        is_used: p.is_used,
        position: p.position,
    }
}

/// Resolves the path to a helper executable, e.g. `reachgraph-go-helper`
/// on `PATH`. Lazily cached per §9 ("the helper-child executable path
/// cache (lazy)"); not a singleton, the caller owns the cache instance.
pub fn find_helper_executable(name: &str) -> Option<PathBuf> {
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S5: interface dispatch and constructor fan-out are only
    /// reachable through the typed helper's wire response (the AST-only
    /// fallback can't see them). This exercises the Rust-side decode of
    /// that response shape without a real Go toolchain in the loop.
    #[test]
    fn into_model_recognizes_interface_and_provided_edge_kinds() {
        let response = HelperResponse {
            nodes: vec![
                HelperNode {
                    id: "pkg.go:Writer.Write".to_string(),
                    name: "Write".to_string(),
                    qualified_name: "Writer.Write".to_string(),
                    file_path: "pkg.go".to_string(),
                    start_line: 1,
                    end_line: 3,
                    kind: "method".to_string(),
                    visibility: "exported".to_string(),
                    parameters: Vec::new(),
                },
                HelperNode {
                    id: "pkg.go:FileWriter.Write".to_string(),
                    name: "Write".to_string(),
                    qualified_name: "FileWriter.Write".to_string(),
                    file_path: "pkg.go".to_string(),
                    start_line: 10,
                    end_line: 12,
                    kind: "method".to_string(),
                    visibility: "exported".to_string(),
                    parameters: Vec::new(),
                },
            ],
            edges: vec![
                HelperEdge {
                    source: "pkg.go:call".to_string(),
                    target: "pkg.go:Writer.Write".to_string(),
                    file_path: "pkg.go".to_string(),
                    line: 20,
                    column: 2,
                    kind: "interface".to_string(),
                },
                HelperEdge {
                    source: "pkg.go:Writer.Write".to_string(),
                    target: "pkg.go:FileWriter.Write".to_string(),
                    file_path: "pkg.go".to_string(),
                    line: 20,
                    column: 2,
                    kind: "provided".to_string(),
                },
            ],
        };

        let (nodes, edges) = into_model(response, reachgraph_core::Language::Go);
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.kind == NodeKind::Method));
        assert!(nodes.iter().all(|n| n.visibility == Visibility::Exported));
        assert_eq!(edges[0].kind, EdgeKind::Interface);
        assert_eq!(edges[1].kind, EdgeKind::Provided);
        assert!(edges.iter().all(|e| e.is_resolved));
    }

    #[test]
    fn into_model_falls_back_to_direct_for_an_unknown_kind() {
        let response = HelperResponse {
            nodes: vec![],
            edges: vec![HelperEdge {
                source: "a".to_string(),
                target: "b".to_string(),
                file_path: "a.go".to_string(),
                line: 1,
                column: 1,
                kind: "something-new".to_string(),
            }],
        };
        let (_, edges) = into_model(response, reachgraph_core::Language::Go);
        assert_eq!(edges[0].kind, EdgeKind::Direct);
    }

    /// Helper-sourced nodes must carry real `kind`/`visibility`/`parameters`
    /// through to the model — a method/constructor misclassified as a bare
    /// `function`, or visibility forced to `module`, would silently break
    /// §4.4's `Export` rule and §4.3's unused-parameter stats for every
    /// Go/Python node (the helper path is those languages' primary
    /// extraction route, §4.2.2/§4.2.3).
    #[test]
    fn into_model_carries_kind_visibility_and_parameters_through() {
        let response = HelperResponse {
            nodes: vec![HelperNode {
                id: "svc.go:Server.New".to_string(),
                name: "New".to_string(),
                qualified_name: "Server.New".to_string(),
                file_path: "svc.go".to_string(),
                start_line: 1,
                end_line: 5,
                kind: "constructor".to_string(),
                visibility: "exported".to_string(),
                parameters: vec![
                    HelperParameter {
                        name: "ctx".to_string(),
                        type_annotation: Some("context.Context".to_string()),
                        is_used: true,
                        position: 0,
                    },
                    HelperParameter {
                        name: "opts".to_string(),
                        type_annotation: None,
                        is_used: false,
                        position: 1,
                    },
                ],
            }],
            edges: vec![],
        };

        let (nodes, _) = into_model(response, reachgraph_core::Language::Go);
        assert_eq!(nodes[0].kind, NodeKind::Constructor);
        assert_eq!(nodes[0].visibility, Visibility::Exported);
        assert_eq!(nodes[0].parameters.len(), 2);
        assert_eq!(nodes[0].parameters[0].type_annotation.as_deref(), Some("context.Context"));
        assert_eq!(nodes[0].unused_parameters, vec!["opts".to_string()]);
    }

    #[test]
    fn into_model_falls_back_to_function_and_module_for_unknown_kind_and_visibility() {
        let response = HelperResponse {
            nodes: vec![HelperNode {
                id: "a.py:run".to_string(),
                name: "run".to_string(),
                qualified_name: "run".to_string(),
                file_path: "a.py".to_string(),
                start_line: 1,
                end_line: 2,
                kind: "something-new".to_string(),
                visibility: "something-new".to_string(),
                parameters: Vec::new(),
            }],
            edges: vec![],
        };

        let (nodes, _) = into_model(response, reachgraph_core::Language::Python);
        assert_eq!(nodes[0].kind, NodeKind::Function);
        assert_eq!(nodes[0].visibility, Visibility::Module);
    }
}
