//! Go extractor (§4.2.2).
//!
//! The primary path shells out to a `reachgraph-go-helper` binary that
//! would drive Go's own package/type-checking facility (`go/packages`,
//! `go/types`) to get typed interface-implementation information —
//! nothing in the Rust ecosystem re-implements that. When the helper
//! isn't on `PATH` this falls back to an AST-only walk: no interface
//! dispatch, no typed var-init scanning, exactly as §4.2.2 describes for
//! the fallback path. A diagnostic records which path ran.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use rayon::prelude::*;
use tree_sitter::Node as TsNode;

use reachgraph_core::{
    CallSite, Diagnostic, DiagnosticSink, Edge, EdgeKind, Language, Node, NodeId, NodeKind,
    Parameter, ResolvedConfig, SymbolTable, Visibility,
};

use crate::extractor::{ExtractionOutput, Extractor};
use crate::helper::{find_helper_executable, into_model, run_helper, HelperRequest};
use crate::params::evaluate_parameter;
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

const HELPER_NAME: &str = "reachgraph-go-helper";
const HELPER_TIMEOUT_SECS: u64 = 60;

pub struct GoExtractor {
    pool: ParserPool,
}

impl GoExtractor {
    pub fn new(pool: ParserPool) -> Self {
        GoExtractor { pool }
    }
}

#[async_trait]
impl Extractor for GoExtractor {
    fn declare(&self, _config: &ResolvedConfig, _files: &[String], _symbols: &SymbolTable, _diagnostics: &DiagnosticSink) {}

    async fn extract(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        symbols: &SymbolTable,
        diagnostics: &DiagnosticSink,
    ) -> anyhow::Result<ExtractionOutput> {
        let go_files: Vec<String> = files
            .iter()
            .filter(|f| FileType::from_path(&std::path::PathBuf::from(f.as_str())) == Some(FileType::Go))
            .cloned()
            .collect();

        if let Some(program) = find_helper_executable(HELPER_NAME) {
            let request = HelperRequest {
                files: &go_files,
                project_root: &config.project_root,
                module: config.go.as_ref().and_then(|g| g.module.as_deref()),
            };
            match run_helper(program.to_string_lossy().as_ref(), &[], &request, HELPER_TIMEOUT_SECS).await {
                Ok(response) => {
                    let (nodes, edges) = into_model(response, Language::Go);
                    return Ok(ExtractionOutput {
                        files_analyzed: go_files.len(),
                        nodes,
                        edges,
                    });
                }
                Err(e) => {
                    diagnostics.push(Diagnostic::warning(
                        "HelperUnavailable",
                        format!("{HELPER_NAME} failed, falling back to AST-only extraction: {e}"),
                    ));
                }
            }
        } else {
            diagnostics.push(Diagnostic::warning(
                "HelperUnavailable",
                format!("{HELPER_NAME} not found on PATH; interface dispatch and typed var-init scanning are unavailable"),
            ));
        }

        self.extract_ast_only(config, &go_files, symbols, diagnostics).await
    }
}

impl GoExtractor {
    async fn extract_ast_only(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        symbols: &SymbolTable,
        diagnostics: &DiagnosticSink,
    ) -> anyhow::Result<ExtractionOutput> {
        let mut parsed = Vec::with_capacity(files.len());
        for file in files {
            let full_path = std::path::Path::new(&config.project_root).join(file);
            let content = match std::fs::read_to_string(&full_path) {
                Ok(c) => c,
                Err(e) => {
                    diagnostics.push(Diagnostic::warning("ExtractorParseError", format!("could not read {file}: {e}")));
                    continue;
                }
            };
            let request = ParseRequest {
                file_type: FileType::Go,
                content: content.clone(),
                path: full_path,
            };
            match self.pool.parse(request).await {
                Ok(result) => parsed.push((file.clone(), content, result.tree)),
                Err(e) => diagnostics.push(Diagnostic::warning("ExtractorParseError", format!("failed to parse {file}: {e}"))),
            }
        }

        let files_analyzed = parsed.len();
        let mut nodes = Vec::new();
        for (file, content, tree) in &parsed {
            declare_file(file, content, tree.root_node(), symbols, &mut nodes);
        }

        // Every method's receiver type is known from pass 1 without a type
        // checker; group them so pass 2 can fan constructor edges out to a
        // concrete return type's methods (§4.2.2's non-interface half).
        let type_methods = build_type_methods(&nodes);

        // Call-site resolution is read-only against the completed symbol
        // table, so each file's walk runs independently; the per-file
        // var-init flag is merged into one shared set afterward.
        let per_file: Vec<(Vec<Edge>, Option<String>)> = parsed
            .into_par_iter()
            .map(|(file, content, tree)| {
                let mut local_edges = Vec::new();
                let mut local_var_init: HashSet<String> = HashSet::new();
                extract_edges_for_file(&file, &content, tree.root_node(), symbols, &mut local_edges, &mut local_var_init, &type_methods);
                (local_edges, local_var_init.into_iter().next())
            })
            .collect();

        let mut edges = Vec::new();
        let mut var_init_files: HashSet<String> = HashSet::new();
        for (local_edges, var_init_file) in per_file {
            edges.extend(local_edges);
            if let Some(file) = var_init_file {
                var_init_files.insert(file);
            }
        }

        for file in var_init_files {
            let refs: Vec<&Edge> = edges.iter().filter(|e| e.call_site.file_path == file && e.kind == EdgeKind::Varinit).collect();
            if refs.is_empty() {
                continue;
            }
            let var_init_id = NodeId::new(&file, "__var_init__");
            let mut node = Node::new_unclassified(
                file.clone(),
                "__var_init__".to_string(),
                "__var_init__".to_string(),
                1,
                1,
                Language::Go,
                NodeKind::Init,
                Visibility::Module,
                Vec::new(),
                None,
            );
            node.id = var_init_id;
            node.is_entry_point = true;
            nodes.push(node);
        }

        Ok(ExtractionOutput {
            files_analyzed,
            nodes,
            edges,
        })
    }
}

fn declare_file(file: &str, source: &str, root: TsNode, symbols: &SymbolTable, nodes: &mut Vec<Node>) {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "function_declaration" => declare_function(file, source, child, symbols, nodes),
            "method_declaration" => declare_method(file, source, child, symbols, nodes),
            _ => {}
        }
    }
}

fn declare_function(file: &str, source: &str, func: TsNode, symbols: &SymbolTable, nodes: &mut Vec<Node>) {
    let Some(name) = text(func, "name", source) else {
        return;
    };
    let node = build_node(file, source, func, &name, &name, symbols);
    nodes.push(node);
}

fn declare_method(file: &str, source: &str, method: TsNode, symbols: &SymbolTable, nodes: &mut Vec<Node>) {
    let Some(name) = text(method, "name", source) else {
        return;
    };
    let Some(receiver_type) = receiver_type_name(method, source) else {
        return;
    };
    let qualified = format!("{receiver_type}.{name}");
    let node = build_node(file, source, method, &name, &qualified, symbols);
    symbols.alias(format!("{file}:method:{name}"), format!("{file}:{qualified}"));
    nodes.push(node);
}

fn receiver_type_name(method: TsNode, source: &str) -> Option<String> {
    let receiver = method.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    for param in receiver.children(&mut cursor) {
        if param.kind() != "parameter_declaration" {
            continue;
        }
        let ty = param.child_by_field_name("type")?;
        let raw = ty.utf8_text(source.as_bytes()).ok()?;
        return Some(raw.trim_start_matches('*').to_string());
    }
    None
}

fn build_node(file: &str, source: &str, func_node: TsNode, name: &str, qualified_name: &str, symbols: &SymbolTable) -> Node {
    let start_line = func_node.start_position().row as u32 + 1;
    let end_line = func_node.end_position().row as u32 + 1;
    let visibility = if name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
        Visibility::Exported
    } else {
        Visibility::Module
    };
    let kind = if func_node.kind() == "method_declaration" {
        NodeKind::Method
    } else {
        NodeKind::Function
    };
    let parameters = collect_parameters(func_node, source);

    let node = Node::new_unclassified(
        file.to_string(),
        qualified_name.to_string(),
        name.to_string(),
        start_line,
        end_line,
        Language::Go,
        kind,
        visibility,
        parameters,
        None,
    );
    symbols.declare(format!("{file}:{qualified_name}"), node.id.clone(), file);
    symbols.alias(format!("{file}:import:{name}"), format!("{file}:{qualified_name}"));
    node
}

fn collect_parameters(func_node: TsNode, source: &str) -> Vec<Parameter> {
    let Some(params_node) = func_node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let body = func_node.child_by_field_name("body");
    let mut result = Vec::new();
    let mut position = 0u32;
    let mut cursor = params_node.walk();
    for param in params_node.children(&mut cursor) {
        if param.kind() != "parameter_declaration" {
            continue;
        }
        let Some(name_node) = param.child_by_field_name("name") else {
            continue;
        };
        let Ok(name) = name_node.utf8_text(source.as_bytes()) else {
            continue;
        };
        let bindings = evaluate_parameter(&[name.to_string()], body, source);
        result.push(Parameter {
            name: name.to_string(),
            type_annotation: param
                .child_by_field_name("type")
                .and_then(|t| t.utf8_text(source.as_bytes()).ok())
                .map(str::to_string),
            is_used: bindings.first().map(|b| b.is_used).unwrap_or(true),
            position,
        });
        position += 1;
    }
    result
}

fn text<'a>(node: TsNode, field: &str, source: &'a str) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .map(str::to_string)
}

/// Maps a type name to the `NodeId`s of every method declared with that
/// type (after stripping a leading `*`) as its receiver.
fn build_type_methods(nodes: &[Node]) -> HashMap<String, Vec<NodeId>> {
    let mut map: HashMap<String, Vec<NodeId>> = HashMap::new();
    for node in nodes {
        if node.kind != NodeKind::Method {
            continue;
        }
        if let Some((type_name, _)) = node.qualified_name.split_once('.') {
            map.entry(type_name.to_string()).or_default().push(node.id.clone());
        }
    }
    map
}

/// Constructor fan-out for the AST-only path (§4.2.2): a standalone
/// function whose declared return type is a concrete named type (or
/// `*T`) gets a `provided` edge to every method on that type. Interface
/// return types need `go/types` to find implementations, so that half of
/// the rule stays helper-only (see DESIGN.md).
fn emit_constructor_edges(
    file: &str,
    func: TsNode,
    source: &str,
    source_id: &NodeId,
    type_methods: &HashMap<String, Vec<NodeId>>,
    edges: &mut Vec<Edge>,
) {
    let Some(result) = func.child_by_field_name("result") else {
        return;
    };
    let Ok(raw) = result.utf8_text(source.as_bytes()) else {
        return;
    };
    let type_name = raw.trim().trim_start_matches('*');
    let Some(methods) = type_methods.get(type_name) else {
        return;
    };
    let line = func.start_position().row as u32 + 1;
    let column = func.start_position().column as u32 + 1;
    for target in methods {
        edges.push(Edge::resolved(
            source_id.clone(),
            target.clone(),
            CallSite { file_path: file.to_string(), line, column },
            EdgeKind::Provided,
        ));
    }
}

fn extract_edges_for_file(
    file: &str,
    source: &str,
    root: TsNode,
    symbols: &SymbolTable,
    edges: &mut Vec<Edge>,
    var_init_files: &mut HashSet<String>,
    type_methods: &HashMap<String, Vec<NodeId>>,
) {
    let mut cursor = root.walk();
    for top in root.children(&mut cursor) {
        match top.kind() {
            "function_declaration" | "method_declaration" => {
                let Some(name) = text(top, "name", source) else { continue };
                let qualified = if top.kind() == "method_declaration" {
                    receiver_type_name(top, source).map(|t| format!("{t}.{name}")).unwrap_or(name.clone())
                } else {
                    name.clone()
                };
                let source_id = NodeId::new(file, &qualified);
                if top.kind() == "function_declaration" {
                    emit_constructor_edges(file, top, source, &source_id, type_methods, edges);
                }
                if let Some(body) = top.child_by_field_name("body") {
                    walk_calls(file, source, body, &source_id, symbols, edges);
                }
            }
            "var_declaration" | "const_declaration" => {
                if references_function_value(top, source, symbols, file) {
                    var_init_files.insert(file.to_string());
                    emit_var_init_edges(file, top, source, symbols, edges);
                }
            }
            _ => {}
        }
    }
    let mut dedup: HashMap<(String, String), usize> = HashMap::new();
    let mut kept = Vec::with_capacity(edges.len());
    for edge in edges.drain(..) {
        let key = (edge.source.0.clone(), edge.target.clone());
        if dedup.contains_key(&key) {
            continue;
        }
        dedup.insert(key, kept.len());
        kept.push(edge);
    }
    *edges = kept;
}

fn walk_calls(file: &str, source: &str, node: TsNode, source_id: &NodeId, symbols: &SymbolTable, edges: &mut Vec<Edge>) {
    if node.kind() == "call_expression" {
        emit_call_edge(file, source, node, source_id, symbols, edges);
    } else if node.kind() == "selector_expression" && node.parent().map(|p| p.kind() != "call_expression").unwrap_or(true) {
        emit_funcref_edge(file, source, node, source_id, symbols, edges);
    } else if node.kind() == "identifier" && node.parent().map(|p| p.kind() != "call_expression").unwrap_or(true) {
        if let Ok(name) = node.utf8_text(source.as_bytes()) {
            if let Some(target) = symbols.resolve(&format!("{file}:import:{name}")) {
                if &target != source_id {
                    let line = node.start_position().row as u32 + 1;
                    let column = node.start_position().column as u32 + 1;
                    edges.push(Edge::resolved(
                        source_id.clone(),
                        target,
                        CallSite { file_path: file.to_string(), line, column },
                        EdgeKind::Funcref,
                    ));
                }
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_calls(file, source, child, source_id, symbols, edges);
    }
}

fn emit_call_edge(file: &str, source: &str, call: TsNode, source_id: &NodeId, symbols: &SymbolTable, edges: &mut Vec<Edge>) {
    let Some(callee) = call.child_by_field_name("function") else {
        return;
    };
    let line = call.start_position().row as u32 + 1;
    let column = call.start_position().column as u32 + 1;
    let call_site = CallSite { file_path: file.to_string(), line, column };

    match callee.kind() {
        "identifier" => {
            let Ok(name) = callee.utf8_text(source.as_bytes()) else { return };
            if let Some(target) = symbols.resolve(&format!("{file}:import:{name}")) {
                edges.push(Edge::resolved(source_id.clone(), target, call_site, EdgeKind::Direct));
            }
        }
        "selector_expression" => {
            let Some(field) = callee.child_by_field_name("field") else { return };
            let Ok(method_name) = field.utf8_text(source.as_bytes()) else { return };
            // AST-only fallback cannot distinguish a package-qualified call
            // from a method call on a value, nor perform interface dispatch
            // (§4.2.2 "fallback path is AST-only"); both collapse to a
            // best-effort method-name lookup.
            if let Some(target) = symbols.resolve(&format!("{file}:method:{method_name}")) {
                edges.push(Edge::resolved(source_id.clone(), target, call_site, EdgeKind::Method));
            }
        }
        _ => {}
    }
}

fn emit_funcref_edge(file: &str, source: &str, selector: TsNode, source_id: &NodeId, symbols: &SymbolTable, edges: &mut Vec<Edge>) {
    let Some(field) = selector.child_by_field_name("field") else { return };
    let Ok(method_name) = field.utf8_text(source.as_bytes()) else { return };
    if let Some(target) = symbols.resolve(&format!("{file}:method:{method_name}")) {
        let line = selector.start_position().row as u32 + 1;
        let column = selector.start_position().column as u32 + 1;
        edges.push(Edge::resolved(
            source_id.clone(),
            target,
            CallSite { file_path: file.to_string(), line, column },
            EdgeKind::Funcref,
        ));
    }
}

fn references_function_value(decl: TsNode, source: &str, symbols: &SymbolTable, file: &str) -> bool {
    let mut cursor = decl.walk();
    decl.children(&mut cursor).any(|c| node_references_function(c, source, symbols, file))
}

fn node_references_function(node: TsNode, source: &str, symbols: &SymbolTable, file: &str) -> bool {
    if node.kind() == "identifier" {
        if let Ok(name) = node.utf8_text(source.as_bytes()) {
            if symbols.resolve(&format!("{file}:import:{name}")).is_some() {
                return true;
            }
        }
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| node_references_function(c, source, symbols, file))
}

fn emit_var_init_edges(file: &str, decl: TsNode, source: &str, symbols: &SymbolTable, edges: &mut Vec<Edge>) {
    let var_init_id = NodeId::new(file, "__var_init__");
    let line = decl.start_position().row as u32 + 1;
    collect_function_refs(decl, source, symbols, file, &mut |target, column| {
        edges.push(Edge::resolved(
            var_init_id.clone(),
            target,
            CallSite { file_path: file.to_string(), line, column },
            EdgeKind::Varinit,
        ));
    });
}

fn collect_function_refs(node: TsNode, source: &str, symbols: &SymbolTable, file: &str, emit: &mut impl FnMut(NodeId, u32)) {
    if node.kind() == "identifier" {
        if let Ok(name) = node.utf8_text(source.as_bytes()) {
            if let Some(target) = symbols.resolve(&format!("{file}:import:{name}")) {
                let column = node.start_position().column as u32 + 1;
                emit(target, column);
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_function_refs(child, source, symbols, file, emit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachgraph_core::DiagnosticSink;

    fn extractor() -> GoExtractor {
        GoExtractor::new(crate::parser_pool::create_parser_pool())
    }

    #[tokio::test]
    async fn extracts_exported_function_and_direct_call() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("main.go"),
            "package main\n\nfunc Helper() {}\n\nfunc main() {\n\tHelper()\n}\n",
        )
        .unwrap();
        let config = ResolvedConfig::new(Language::Go, tmp.path().to_string_lossy());
        let symbols = SymbolTable::new();
        let diagnostics = DiagnosticSink::new();

        let result = extractor()
            .extract(&config, &["main.go".to_string()], &symbols, &diagnostics)
            .await
            .unwrap();

        assert_eq!(result.nodes.len(), 2);
        let helper = result.nodes.iter().find(|n| n.name == "Helper").unwrap();
        assert_eq!(helper.visibility, Visibility::Exported);
        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.edges[0].kind, EdgeKind::Direct);
    }

    #[tokio::test]
    async fn method_qualified_name_is_prefixed_by_receiver_type() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("svc.go"),
            "package main\n\ntype Server struct{}\n\nfunc (s *Server) Run() {}\n",
        )
        .unwrap();
        let config = ResolvedConfig::new(Language::Go, tmp.path().to_string_lossy());
        let symbols = SymbolTable::new();
        let diagnostics = DiagnosticSink::new();

        let result = extractor()
            .extract(&config, &["svc.go".to_string()], &symbols, &diagnostics)
            .await
            .unwrap();

        assert_eq!(result.nodes[0].qualified_name, "Server.Run");
    }

    #[tokio::test]
    async fn constructor_fans_out_to_concrete_return_type_methods() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("svc.go"),
            "package main\n\ntype Server struct{}\n\nfunc (s *Server) Run() {}\n\nfunc NewServer() *Server {\n\treturn &Server{}\n}\n",
        )
        .unwrap();
        let config = ResolvedConfig::new(Language::Go, tmp.path().to_string_lossy());
        let symbols = SymbolTable::new();
        let diagnostics = DiagnosticSink::new();

        let result = extractor()
            .extract(&config, &["svc.go".to_string()], &symbols, &diagnostics)
            .await
            .unwrap();

        let provided: Vec<_> = result.edges.iter().filter(|e| e.kind == EdgeKind::Provided).collect();
        assert_eq!(provided.len(), 1);
        let new_server = result.nodes.iter().find(|n| n.name == "NewServer").unwrap();
        let run = result.nodes.iter().find(|n| n.qualified_name == "Server.Run").unwrap();
        assert_eq!(provided[0].source, new_server.id);
        assert_eq!(provided[0].target, run.id.0);
    }

    #[tokio::test]
    async fn lowercase_name_is_module_visibility() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("main.go"), "package main\n\nfunc helper() {}\n").unwrap();
        let config = ResolvedConfig::new(Language::Go, tmp.path().to_string_lossy());
        let symbols = SymbolTable::new();
        let diagnostics = DiagnosticSink::new();

        let result = extractor()
            .extract(&config, &["main.go".to_string()], &symbols, &diagnostics)
            .await
            .unwrap();

        assert_eq!(result.nodes[0].visibility, Visibility::Module);
    }
}
