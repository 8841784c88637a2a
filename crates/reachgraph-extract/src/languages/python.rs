//! Python extractor (§4.2.3).
//!
//! Runs directly against tree-sitter — no typed resolution is attempted,
//! call resolution is best-effort name matching, matching the spec's
//! "full type resolution is not attempted" framing for this language. A
//! `reachgraph-py-helper` round trip (mirroring Go's) is attempted first
//! so a future helper that walks the real module AST (handling relative
//! imports, `__all__`, etc.) can slot in without changing this
//! extractor's public surface; absent one, the AST-only path below runs.

use std::collections::HashMap;

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

const HELPER_NAME: &str = "reachgraph-py-helper";
const HELPER_TIMEOUT_SECS: u64 = 30;

pub struct PythonExtractor {
    pool: ParserPool,
}

impl PythonExtractor {
    pub fn new(pool: ParserPool) -> Self {
        PythonExtractor { pool }
    }
}

#[async_trait]
impl Extractor for PythonExtractor {
    fn declare(&self, _config: &ResolvedConfig, _files: &[String], _symbols: &SymbolTable, _diagnostics: &DiagnosticSink) {}

    async fn extract(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        symbols: &SymbolTable,
        diagnostics: &DiagnosticSink,
    ) -> anyhow::Result<ExtractionOutput> {
        let py_files: Vec<String> = files
            .iter()
            .filter(|f| FileType::from_path(&std::path::PathBuf::from(f.as_str())) == Some(FileType::Python))
            .cloned()
            .collect();

        if let Some(program) = find_helper_executable(HELPER_NAME) {
            let request = HelperRequest {
                files: &py_files,
                project_root: &config.project_root,
                module: None,
            };
            match run_helper(program.to_string_lossy().as_ref(), &[], &request, HELPER_TIMEOUT_SECS).await {
                Ok(response) => {
                    let (nodes, edges) = into_model(response, Language::Python);
                    return Ok(ExtractionOutput {
                        files_analyzed: py_files.len(),
                        nodes,
                        edges,
                    });
                }
                Err(e) => diagnostics.push(Diagnostic::warning(
                    "HelperUnavailable",
                    format!("{HELPER_NAME} failed, falling back to AST-only extraction: {e}"),
                )),
            }
        }

        self.extract_ast_only(config, &py_files, symbols, diagnostics).await
    }
}

impl PythonExtractor {
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
            let request = ParseRequest { file_type: FileType::Python, content: content.clone(), path: full_path };
            match self.pool.parse(request).await {
                Ok(result) => parsed.push((file.clone(), content, result.tree)),
                Err(e) => diagnostics.push(Diagnostic::warning("ExtractorParseError", format!("failed to parse {file}: {e}"))),
            }
        }

        let files_analyzed = parsed.len();
        let mut nodes = Vec::new();
        let mut main_referenced: HashMap<String, Vec<String>> = HashMap::new();
        for (file, content, tree) in &parsed {
            declare_file(file, content, tree.root_node(), symbols, &mut nodes, &mut main_referenced);
        }

        // Names referenced only inside `if __name__ == '__main__':` become
        // `module` visibility and entry points (§4.2.3).
        for node in nodes.iter_mut() {
            if let Some(referenced) = main_referenced.get(&node.file_path) {
                if referenced.contains(&node.qualified_name) {
                    node.visibility = Visibility::Module;
                    node.is_entry_point = true;
                }
            }
        }

        // Call-site resolution is read-only against the completed symbol
        // table, so each file's walk runs independently of the others.
        let edges: Vec<Edge> = parsed
            .into_par_iter()
            .flat_map(|(file, content, tree)| {
                let mut local = Vec::new();
                extract_edges_for_file(&file, &content, tree.root_node(), symbols, &mut local);
                local
            })
            .collect();

        Ok(ExtractionOutput { files_analyzed, nodes, edges })
    }
}

fn declare_file(
    file: &str,
    source: &str,
    root: TsNode,
    symbols: &SymbolTable,
    nodes: &mut Vec<Node>,
    main_referenced: &mut HashMap<String, Vec<String>>,
) {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        declare_node(file, source, child, None, symbols, nodes);
        if is_main_guard(child, source) {
            let names = collect_referenced_names(child, source);
            main_referenced.entry(file.to_string()).or_default().extend(names);
        }
    }
}

fn declare_node(
    file: &str,
    source: &str,
    node: TsNode,
    enclosing_class: Option<&str>,
    symbols: &SymbolTable,
    nodes: &mut Vec<Node>,
) {
    match node.kind() {
        "function_definition" => {
            let Some(name) = text(node, "name", source) else { return };
            let qualified = match enclosing_class {
                Some(class) => format!("{class}.{name}"),
                None => name.clone(),
            };
            let decorators = collect_decorators(node, source);
            let kind = if enclosing_class.is_some() { NodeKind::Method } else { NodeKind::Function };
            let visibility = determine_visibility(&name);
            let parameters = collect_parameters(node, source, enclosing_class.is_some());

            let graph_node = Node::new_unclassified(
                file.to_string(),
                qualified.clone(),
                name.clone(),
                node.start_position().row as u32 + 1,
                node.end_position().row as u32 + 1,
                Language::Python,
                kind,
                visibility,
                parameters,
                decorators,
            );
            symbols.declare(format!("{file}:{qualified}"), graph_node.id.clone(), file);
            symbols.alias(format!("{file}:import:{name}"), format!("{file}:{qualified}"));
            if enclosing_class.is_some() {
                symbols.alias(format!("{file}:method:{name}"), format!("{file}:{qualified}"));
            }
            nodes.push(graph_node);
        }
        "class_definition" => {
            let Some(class_name) = text(node, "name", source) else { return };
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for member in body.children(&mut cursor) {
                    declare_node(file, source, member, Some(&class_name), symbols, nodes);
                }
            }
        }
        "expression_statement" => {
            // `name = lambda ...: ...` bound at module scope.
            if let Some(assignment) = find_child_of_kind(node, "assignment") {
                let Some(target) = assignment.child_by_field_name("left") else { return };
                let Some(value) = assignment.child_by_field_name("right") else { return };
                if target.kind() == "identifier" && value.kind() == "lambda" {
                    let Ok(name) = target.utf8_text(source.as_bytes()) else { return };
                    let visibility = determine_visibility(name);
                    let graph_node = Node::new_unclassified(
                        file.to_string(),
                        name.to_string(),
                        name.to_string(),
                        value.start_position().row as u32 + 1,
                        value.end_position().row as u32 + 1,
                        Language::Python,
                        NodeKind::Lambda,
                        visibility,
                        Vec::new(),
                        None,
                    );
                    symbols.declare(format!("{file}:{name}"), graph_node.id.clone(), file);
                    symbols.alias(format!("{file}:import:{name}"), format!("{file}:{name}"));
                    nodes.push(graph_node);
                }
            }
        }
        _ => {}
    }
}

fn determine_visibility(name: &str) -> Visibility {
    if name.starts_with("__") && name.ends_with("__") {
        Visibility::Private
    } else if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Exported
    }
}

/// §4.2.3 "skip self/cls receivers"; names beginning with `_` are always used.
fn collect_parameters(func_node: TsNode, source: &str, is_method: bool) -> Vec<Parameter> {
    let Some(params_node) = func_node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let body = func_node.child_by_field_name("body");
    let mut result = Vec::new();
    let mut position = 0u32;
    let mut cursor = params_node.walk();
    for (idx, param) in params_node.children(&mut cursor).enumerate() {
        let name_node = match param.kind() {
            "identifier" => Some(param),
            "typed_parameter" | "default_parameter" | "typed_default_parameter" => param.child_by_field_name("name").or(param.child(0)),
            _ => None,
        };
        let Some(name_node) = name_node else { continue };
        let Ok(name) = name_node.utf8_text(source.as_bytes()) else { continue };
        if is_method && idx == 0 && matches!(name, "self" | "cls") {
            continue;
        }
        let bindings = evaluate_parameter(&[name.to_string()], body, source);
        result.push(Parameter {
            name: name.to_string(),
            type_annotation: None,
            is_used: bindings.first().map(|b| b.is_used).unwrap_or(true),
            position,
        });
        position += 1;
    }
    result
}

fn collect_decorators(func_node: TsNode, source: &str) -> Option<Vec<String>> {
    let Some(parent) = func_node.parent() else { return None };
    let mut names = Vec::new();
    let mut cursor = parent.walk();
    for sibling in parent.children(&mut cursor) {
        if sibling.kind() == "decorator" {
            if let Some(expr) = sibling.child(1) {
                if let Ok(text) = expr.utf8_text(source.as_bytes()) {
                    names.push(text.to_string());
                }
            }
        }
    }
    if names.is_empty() { None } else { Some(names) }
}

fn is_main_guard(node: TsNode, source: &str) -> bool {
    if node.kind() != "if_statement" {
        return false;
    }
    node.child_by_field_name("condition")
        .and_then(|c| c.utf8_text(source.as_bytes()).ok())
        .map(|t| t.contains("__name__") && t.contains("__main__"))
        .unwrap_or(false)
}

fn collect_referenced_names(node: TsNode, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    walk_identifiers(node, source, &mut names);
    names
}

fn walk_identifiers(node: TsNode, source: &str, out: &mut Vec<String>) {
    if node.kind() == "identifier" {
        if let Ok(text) = node.utf8_text(source.as_bytes()) {
            out.push(text.to_string());
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_identifiers(child, source, out);
    }
}

/// For a `lambda` node, returns the name it is assigned to — the target
/// of `name = lambda ...: ...` — the same name `declare_node` indexed it
/// under when walking pass 1.
fn lambda_bound_name(node: TsNode, source: &str) -> Option<String> {
    let parent = node.parent()?;
    if parent.kind() != "assignment" {
        return None;
    }
    let target = parent.child_by_field_name("left")?;
    if target.kind() != "identifier" {
        return None;
    }
    target.utf8_text(source.as_bytes()).ok().map(str::to_string)
}

fn find_child_of_kind<'a>(node: TsNode<'a>, kind: &str) -> Option<TsNode<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn text<'a>(node: TsNode, field: &str, source: &'a str) -> Option<String> {
    node.child_by_field_name(field).and_then(|n| n.utf8_text(source.as_bytes()).ok()).map(str::to_string)
}

fn extract_edges_for_file(file: &str, source: &str, root: TsNode, symbols: &SymbolTable, edges: &mut Vec<Edge>) {
    walk_for_calls(file, source, root, None, symbols, edges);
}

fn walk_for_calls(
    file: &str,
    source: &str,
    node: TsNode,
    current_source: Option<&NodeId>,
    symbols: &SymbolTable,
    edges: &mut Vec<Edge>,
) {
    let next_source = match node.kind() {
        "function_definition" => text(node, "name", source)
            .and_then(|name| symbols.resolve(&format!("{file}:import:{name}")).or_else(|| symbols.resolve(&format!("{file}:method:{name}")))),
        // `handler = lambda x: helper(x)` is declared as its own `Lambda`
        // node under the assignment target's name (see `declare_node`'s
        // "expression_statement" arm); without this arm a call inside the
        // lambda body is wrongly attributed to whatever enclosing source
        // was active (usually `None` at module scope) and silently dropped.
        "lambda" => lambda_bound_name(node, source)
            .and_then(|name| symbols.resolve(&format!("{file}:import:{name}"))),
        _ => None,
    };
    let source_id = next_source.as_ref().or(current_source);

    if let (Some(source_id), "call") = (source_id, node.kind()) {
        emit_call_edge(file, source, node, source_id, symbols, edges);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_for_calls(file, source, child, source_id, symbols, edges);
    }
}

fn emit_call_edge(file: &str, source: &str, call: TsNode, source_id: &NodeId, symbols: &SymbolTable, edges: &mut Vec<Edge>) {
    let Some(callee) = call.child_by_field_name("function") else { return };
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
        "attribute" => {
            let Some(attr) = callee.child_by_field_name("attribute") else { return };
            let Ok(method_name) = attr.utf8_text(source.as_bytes()) else { return };
            if let Some(target) = symbols.resolve(&format!("{file}:method:{method_name}")) {
                edges.push(Edge::resolved(source_id.clone(), target, call_site, EdgeKind::Method));
            }
        }
        "subscript" => {
            let expr_text = callee.utf8_text(source.as_bytes()).unwrap_or("<expr>");
            edges.push(Edge::dynamic(source_id.clone(), expr_text, call_site));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachgraph_core::DiagnosticSink;

    fn extractor() -> PythonExtractor {
        PythonExtractor::new(crate::parser_pool::create_parser_pool())
    }

    #[tokio::test]
    async fn extracts_public_function_and_private_helper() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("a.py"),
            "def _helper():\n    pass\n\ndef run():\n    _helper()\n",
        )
        .unwrap();
        let config = ResolvedConfig::new(Language::Python, tmp.path().to_string_lossy());
        let symbols = SymbolTable::new();
        let diagnostics = DiagnosticSink::new();

        let result = extractor().extract(&config, &["a.py".to_string()], &symbols, &diagnostics).await.unwrap();

        let helper = result.nodes.iter().find(|n| n.name == "_helper").unwrap();
        assert_eq!(helper.visibility, Visibility::Private);
        let run = result.nodes.iter().find(|n| n.name == "run").unwrap();
        assert_eq!(run.visibility, Visibility::Exported);
        assert_eq!(result.edges.len(), 1);
    }

    #[tokio::test]
    async fn main_guard_reference_marks_module_visibility_and_entry_point() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("a.py"),
            "def run():\n    pass\n\nif __name__ == '__main__':\n    run()\n",
        )
        .unwrap();
        let config = ResolvedConfig::new(Language::Python, tmp.path().to_string_lossy());
        let symbols = SymbolTable::new();
        let diagnostics = DiagnosticSink::new();

        let result = extractor().extract(&config, &["a.py".to_string()], &symbols, &diagnostics).await.unwrap();

        let run = result.nodes.iter().find(|n| n.name == "run").unwrap();
        assert_eq!(run.visibility, Visibility::Module);
        assert!(run.is_entry_point);
    }

    #[tokio::test]
    async fn call_inside_module_scope_lambda_body_resolves() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("a.py"),
            "def helper(x):\n    return x\n\nhandler = lambda x: helper(x)\n",
        )
        .unwrap();
        let config = ResolvedConfig::new(Language::Python, tmp.path().to_string_lossy());
        let symbols = SymbolTable::new();
        let diagnostics = DiagnosticSink::new();

        let result = extractor().extract(&config, &["a.py".to_string()], &symbols, &diagnostics).await.unwrap();

        let handler = result.nodes.iter().find(|n| n.name == "handler").unwrap();
        let helper = result.nodes.iter().find(|n| n.name == "helper").unwrap();
        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.edges[0].source, handler.id);
        assert_eq!(result.edges[0].target, helper.id.0);
        assert_eq!(result.edges[0].kind, EdgeKind::Direct);
    }

    #[tokio::test]
    async fn self_and_cls_are_excluded_from_parameters() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("a.py"),
            "class C:\n    def method(self, value):\n        return value\n",
        )
        .unwrap();
        let config = ResolvedConfig::new(Language::Python, tmp.path().to_string_lossy());
        let symbols = SymbolTable::new();
        let diagnostics = DiagnosticSink::new();

        let result = extractor().extract(&config, &["a.py".to_string()], &symbols, &diagnostics).await.unwrap();

        let method = result.nodes.iter().find(|n| n.name == "method").unwrap();
        assert_eq!(method.parameters.len(), 1);
        assert_eq!(method.parameters[0].name, "value");
    }
}
