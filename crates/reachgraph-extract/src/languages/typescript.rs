//! TypeScript extractor (§4.2.1).
//!
//! No official TypeScript-compiler binding exists for Rust, so symbol
//! resolution here is syntactic: a two-pass walk populates
//! `reachgraph_core::SymbolTable` with every declaration and every
//! import/re-export alias (pass 1), then a second walk resolves call
//! sites against that table, following alias chains to the original
//! declaration (pass 2) — the substitute for the type checker's
//! symbol-resolution facility the spec's source described. See
//! `SPEC_FULL.md` §4.2 and `DESIGN.md` for why this is the one extractor
//! that runs fully in-process instead of through a §6.3 helper.

use async_trait::async_trait;
use rayon::prelude::*;
use tree_sitter::Node as TsNode;

use reachgraph_core::{
    CallSite, Diagnostic, DiagnosticSink, Edge, EdgeKind, Language, Node, NodeId, NodeKind,
    Parameter, ResolvedConfig, SymbolTable, Visibility,
};

use crate::extractor::{ExtractionOutput, Extractor};
use crate::params::evaluate_parameter;
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct TypescriptExtractor {
    pool: ParserPool,
}

impl TypescriptExtractor {
    pub fn new(pool: ParserPool) -> Self {
        TypescriptExtractor { pool }
    }
}

#[async_trait]
impl Extractor for TypescriptExtractor {
    fn declare(&self, _config: &ResolvedConfig, _files: &[String], _symbols: &SymbolTable, _diagnostics: &DiagnosticSink) {
        // Declaration happens inline in `extract`'s first pass over each
        // file's parsed tree below — kept here as a no-op so the trait's
        // two-pass shape stays uniform across extractors; Go and Python
        // genuinely need the helper round trip to happen before pass 2,
        // TypeScript's tree-sitter walk does not.
    }

    async fn extract(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        symbols: &SymbolTable,
        diagnostics: &DiagnosticSink,
    ) -> anyhow::Result<ExtractionOutput> {
        let mut parsed = Vec::with_capacity(files.len());
        for file in files {
            if FileType::from_path(&std::path::PathBuf::from(file)) != Some(FileType::Typescript) {
                continue;
            }
            let full_path = std::path::Path::new(&config.project_root).join(file);
            let content = match std::fs::read_to_string(&full_path) {
                Ok(c) => c,
                Err(e) => {
                    diagnostics.push(Diagnostic::warning(
                        "ExtractorParseError",
                        format!("could not read {file}: {e}"),
                    ));
                    continue;
                }
            };
            let request = ParseRequest {
                file_type: FileType::Typescript,
                content: content.clone(),
                path: full_path.clone(),
            };
            match self.pool.parse(request).await {
                Ok(result) => parsed.push((file.clone(), content, result.tree)),
                Err(e) => diagnostics.push(Diagnostic::warning(
                    "ExtractorParseError",
                    format!("failed to parse {file}: {e}"),
                )),
            }
        }

        let files_analyzed = parsed.len();

        // Pass 1: declarations + re-export aliases. Each file only writes
        // into the shared `symbols` table (DashMap-backed, §5's "per-file
        // parsing and per-node body walks have no cross-file shared state"
        // licenses running this per-file work off the main thread).
        let nodes: Vec<Node> = parsed
            .clone()
            .into_par_iter()
            .flat_map(|(file, content, tree)| {
                let mut local = Vec::new();
                declare_file(&file, &content, tree.root_node(), symbols, &mut local);
                local
            })
            .collect();

        // Pass 2: call-site resolution against the now-complete symbol
        // table; every file's walk is independent of every other file's.
        let edges: Vec<Edge> = parsed
            .into_par_iter()
            .flat_map(|(file, content, tree)| {
                let mut local = Vec::new();
                extract_edges_for_file(&file, &content, tree.root_node(), symbols, &mut local);
                local
            })
            .collect();

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
        declare_node(file, source, child, &[], symbols, nodes);
    }
}

/// Walks statements at module or class scope, registering every
/// function-like declaration this extractor supports (§4.2.1 "Node
/// kinds"). `enclosing_type` names the class when walking class members,
/// used to build `T.M`-style qualified names.
fn declare_node(
    file: &str,
    source: &str,
    node: TsNode,
    enclosing_type: &[String],
    symbols: &SymbolTable,
    nodes: &mut Vec<Node>,
) {
    match node.kind() {
        "function_declaration" => {
            if let Some(name) = child_text(node, "name", source) {
                declare_function(file, source, node, &name, &name, NodeKind::Function, enclosing_type, symbols, nodes);
            }
        }
        "class_declaration" => {
            let Some(type_name) = child_text(node, "name", source) else {
                return;
            };
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for member in body.children(&mut cursor) {
                    let mut scope = enclosing_type.to_vec();
                    scope.push(type_name.clone());
                    declare_class_member(file, source, member, &type_name, &scope, symbols, nodes);
                }
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            for declarator in node.children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let Some(name) = child_text(declarator, "name", source) else {
                    continue;
                };
                let Some(value) = declarator.child_by_field_name("value") else {
                    continue;
                };
                if matches!(value.kind(), "arrow_function" | "function_expression") {
                    declare_function(file, source, value, &name, &name, NodeKind::Arrow, enclosing_type, symbols, nodes);
                }
            }
        }
        "export_statement" => {
            if let Some(decl) = node.child_by_field_name("declaration") {
                declare_node(file, source, decl, enclosing_type, symbols, nodes);
            }
            declare_reexport(file, node, source, symbols);
        }
        "import_statement" => {
            declare_import_alias(file, node, source, symbols);
        }
        _ => {}
    }
}

fn declare_class_member(
    file: &str,
    source: &str,
    member: TsNode,
    type_name: &str,
    enclosing_type: &[String],
    symbols: &SymbolTable,
    nodes: &mut Vec<Node>,
) {
    match member.kind() {
        "method_definition" => {
            let Some(raw_name) = child_text(member, "name", source) else {
                return;
            };
            let is_constructor = raw_name == "constructor";
            let is_getter = has_keyword_child(member, source, "get");
            let is_setter = has_keyword_child(member, source, "set");
            let display_name = if is_getter {
                format!("get {raw_name}")
            } else if is_setter {
                format!("set {raw_name}")
            } else {
                raw_name.clone()
            };
            let qualified = format!("{type_name}.{raw_name}");
            let kind = if is_constructor {
                NodeKind::Constructor
            } else {
                NodeKind::Method
            };
            declare_function(
                file,
                source,
                member,
                &display_name,
                &qualified,
                kind,
                enclosing_type,
                symbols,
                nodes,
            );
            if is_constructor {
                symbols.alias(
                    format!("{file}:import:{type_name}.constructor"),
                    format!("{file}:{qualified}"),
                );
            } else if !is_getter && !is_setter {
                symbols.alias(format!("{file}:method:{raw_name}"), format!("{file}:{qualified}"));
            }
        }
        "public_field_definition" => {
            let Some(name) = child_text(member, "name", source) else {
                return;
            };
            let Some(value) = member.child_by_field_name("value") else {
                return;
            };
            if matches!(value.kind(), "arrow_function" | "function_expression") {
                let qualified = format!("{type_name}.{name}");
                declare_function(file, source, value, &name, &qualified, NodeKind::Arrow, enclosing_type, symbols, nodes);
            }
        }
        _ => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn declare_function(
    file: &str,
    source: &str,
    func_node: TsNode,
    name: &str,
    qualified_name: &str,
    kind: NodeKind,
    _enclosing_type: &[String],
    symbols: &SymbolTable,
    nodes: &mut Vec<Node>,
) {
    let start_line = func_node.start_position().row as u32 + 1;
    let end_line = func_node.end_position().row as u32 + 1;
    let visibility = determine_visibility(func_node, source);
    let decorators = collect_decorators(func_node, source);
    let parameters = collect_parameters(func_node, source);

    let node = Node::new_unclassified(
        file.to_string(),
        qualified_name.to_string(),
        name.to_string(),
        start_line,
        end_line,
        Language::Typescript,
        kind,
        visibility,
        parameters,
        decorators,
    );

    symbols.declare(format!("{file}:{qualified_name}"), node.id.clone(), file);
    // Also index by bare name so sibling-file imports (`import { foo }`)
    // resolve before the alias step maps them to this file-qualified key.
    symbols.alias(format!("{file}:import:{name}"), format!("{file}:{qualified_name}"));
    nodes.push(node);
}

fn determine_visibility(func_node: TsNode, source: &str) -> Visibility {
    if let Some(parent) = func_node.parent() {
        if parent.kind() == "export_statement" {
            return Visibility::Exported;
        }
        // Arrow/function-expression bound to a variable statement whose
        // parent is the export.
        if let Some(grandparent) = parent.parent() {
            if grandparent.kind() == "export_statement" {
                return Visibility::Exported;
            }
        }
    }
    for modifier in ["private", "protected", "public"] {
        if has_keyword_child(func_node, source, modifier) {
            return match modifier {
                "private" => Visibility::Private,
                "protected" => Visibility::Internal,
                _ => Visibility::Public,
            };
        }
    }
    if matches!(func_node.kind(), "method_definition") {
        Visibility::Public
    } else {
        Visibility::Module
    }
}

fn has_keyword_child(node: TsNode, source: &str, keyword: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| c.utf8_text(source.as_bytes()).map(|t| t == keyword).unwrap_or(false))
}

/// Records the textual decorator name for every `@Name`/`@Name(...)`/
/// `@obj.path(...)` decorator attached to `func_node` or, for an
/// arrow-function binding, its enclosing variable/export statement
/// (§4.2.1 "Decorator extraction").
fn collect_decorators(func_node: TsNode, source: &str) -> Option<Vec<String>> {
    let mut names = Vec::new();
    let mut target = func_node;
    for _ in 0..3 {
        if let Some(parent) = target.parent() {
            let mut cursor = parent.walk();
            for sibling in parent.children(&mut cursor) {
                if sibling.kind() == "decorator" {
                    if let Some(name) = decorator_name(sibling, source) {
                        names.push(name);
                    }
                }
            }
            target = parent;
        } else {
            break;
        }
    }
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

fn decorator_name(decorator: TsNode, source: &str) -> Option<String> {
    let mut cursor = decorator.walk();
    for child in decorator.children(&mut cursor) {
        match child.kind() {
            "identifier" => return child.utf8_text(source.as_bytes()).ok().map(str::to_string),
            "call_expression" => {
                let callee = child.child_by_field_name("function")?;
                return callee.utf8_text(source.as_bytes()).ok().map(str::to_string);
            }
            "member_expression" => return child.utf8_text(source.as_bytes()).ok().map(str::to_string),
            _ => {}
        }
    }
    None
}

/// Builds the declared-parameter list (§4.2.1 "Parameter model"):
/// destructuring patterns become one synthetic-named `Parameter` whose
/// source text is the pattern, plus independent `unusedParameters`
/// entries per inner binding (handled via `params::evaluate_parameter`).
fn collect_parameters(func_node: TsNode, source: &str) -> Vec<Parameter> {
    let Some(params_node) = func_node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let body = func_node.child_by_field_name("body");

    let mut result = Vec::new();
    let mut cursor = params_node.walk();
    let mut position = 0u32;
    for param in params_node.children(&mut cursor) {
        if !matches!(
            param.kind(),
            "required_parameter" | "optional_parameter" | "identifier" | "rest_pattern"
        ) {
            continue;
        }
        let pattern = param.child_by_field_name("pattern").unwrap_or(param);
        let inner_names = destructure_names(pattern, source);
        let bindings = evaluate_parameter(&inner_names, body, source);
        let is_used = bindings.iter().any(|b| b.is_used);
        let display_name = if inner_names.len() == 1 {
            inner_names[0].clone()
        } else {
            pattern.utf8_text(source.as_bytes()).unwrap_or("").to_string()
        };
        result.push(Parameter {
            name: display_name,
            type_annotation: param
                .child_by_field_name("type")
                .and_then(|t| t.utf8_text(source.as_bytes()).ok())
                .map(str::to_string),
            is_used,
            position,
        });
        position += 1;
    }
    result
}

fn destructure_names(pattern: TsNode, source: &str) -> Vec<String> {
    match pattern.kind() {
        "identifier" => pattern
            .utf8_text(source.as_bytes())
            .ok()
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        "rest_pattern" => pattern
            .child(1)
            .and_then(|c| c.utf8_text(source.as_bytes()).ok())
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        "object_pattern" | "array_pattern" => {
            let mut names = Vec::new();
            let mut cursor = pattern.walk();
            for child in pattern.children(&mut cursor) {
                match child.kind() {
                    "shorthand_property_identifier_pattern" | "identifier" => {
                        if let Ok(text) = child.utf8_text(source.as_bytes()) {
                            names.push(text.to_string());
                        }
                    }
                    "pair_pattern" => {
                        if let Some(value) = child.child_by_field_name("value") {
                            names.extend(destructure_names(value, source));
                        }
                    }
                    _ => {}
                }
            }
            names
        }
        _ => pattern
            .utf8_text(source.as_bytes())
            .ok()
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
    }
}

fn child_text<'a>(node: TsNode, field: &str, source: &'a str) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .map(str::to_string)
}

/// `export { foo } from './a'` — alias the local `foo` binding to the
/// source module's declaration key so pass 2 resolves through it
/// (scenario S6).
fn declare_reexport(file: &str, node: TsNode, source: &str, symbols: &SymbolTable) {
    let Some(source_clause) = node.child_by_field_name("source") else {
        return;
    };
    let Some(from_path) = string_literal_value(source_clause, source) else {
        return;
    };
    let from_file = resolve_relative_module(file, &from_path);

    if let Some(export_clause) = find_child_of_kind(node, "export_clause") {
        let mut cursor = export_clause.walk();
        for specifier in export_clause.children(&mut cursor) {
            if specifier.kind() != "export_specifier" {
                continue;
            }
            let Some(original) = child_text(specifier, "name", source) else {
                continue;
            };
            symbols.alias(
                format!("{file}:import:{original}"),
                format!("{from_file}:import:{original}"),
            );
        }
    }
}

/// `import { foo } from './b'` — alias the local import binding to the
/// defining module's declaration key.
fn declare_import_alias(file: &str, node: TsNode, source: &str, symbols: &SymbolTable) {
    let Some(source_clause) = node.child_by_field_name("source") else {
        return;
    };
    let Some(from_path) = string_literal_value(source_clause, source) else {
        return;
    };
    let from_file = resolve_relative_module(file, &from_path);

    if let Some(clause) = find_child_of_kind(node, "named_imports") {
        let mut cursor = clause.walk();
        for specifier in clause.children(&mut cursor) {
            if specifier.kind() != "import_specifier" {
                continue;
            }
            let Some(name) = child_text(specifier, "name", source) else {
                continue;
            };
            let local = child_text(specifier, "alias", source).unwrap_or_else(|| name.clone());
            symbols.alias(
                format!("{file}:import:{local}"),
                format!("{from_file}:import:{name}"),
            );
        }
    }
}

fn find_child_of_kind<'a>(node: TsNode<'a>, kind: &str) -> Option<TsNode<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn string_literal_value(node: TsNode, source: &str) -> Option<String> {
    let text = node.utf8_text(source.as_bytes()).ok()?;
    Some(text.trim_matches(|c| c == '\'' || c == '"').to_string())
}

/// Resolves a relative import specifier against the importing file's
/// directory, appending `.ts` when no extension is already present.
/// Non-relative specifiers (bare package names) are returned unresolved;
/// callers treat an unresolved target as out-of-project (silently
/// dropped, §4.2).
fn resolve_relative_module(importing_file: &str, specifier: &str) -> String {
    if !specifier.starts_with('.') {
        return specifier.to_string();
    }
    let dir = reachgraph_core::package_of(importing_file);
    let mut segments: Vec<&str> = if dir == "." { Vec::new() } else { dir.split('/').collect() };
    for part in specifier.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if joined.ends_with(".ts") || joined.ends_with(".tsx") {
        joined
    } else {
        format!("{joined}.ts")
    }
}

/// Pass 2: walks every function body declared in pass 1, emitting a call
/// edge for each resolvable invocation or function-valued reference
/// (§4.2.1 "Call resolution").
fn extract_edges_for_file(file: &str, source: &str, root: TsNode, symbols: &SymbolTable, edges: &mut Vec<Edge>) {
    walk_for_calls(file, source, root, None, symbols, edges);
}

fn walk_for_calls(
    file: &str,
    source: &str,
    node: TsNode,
    current_source_id: Option<&NodeId>,
    symbols: &SymbolTable,
    edges: &mut Vec<Edge>,
) {
    let next_source = match node.kind() {
        "function_declaration" | "method_definition" => child_text(node, "name", source)
            .and_then(|name| lookup_declared_id(file, &name, symbols))
            .or_else(|| current_source_id.cloned()),
        // Module-scope `const f = () => {...}` and class-property arrow
        // initializers are their own `Arrow`-kind nodes in the declare
        // pass (`declare_node`'s `lexical_declaration`/`variable_declaration`
        // arm and `declare_class_member`'s `public_field_definition` arm);
        // without this arm a call inside such a body is wrongly attributed
        // to whatever enclosing source was active (usually `None` at
        // module scope) and the edge is silently dropped.
        "arrow_function" | "function_expression" => bound_name_for_value_node(node, source)
            .and_then(|name| lookup_declared_id(file, &name, symbols))
            .or_else(|| current_source_id.cloned()),
        _ => current_source_id.cloned(),
    };
    let source_id_ref = next_source.as_ref().or(current_source_id);

    if let (Some(source_id), "call_expression") = (source_id_ref, node.kind()) {
        emit_call_edge(file, source, node, source_id, symbols, edges);
    }
    if let (Some(source_id), "new_expression") = (source_id_ref, node.kind()) {
        emit_new_edge(file, source, node, source_id, symbols, edges);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_for_calls(file, source, child, source_id_ref, symbols, edges);
    }
}

fn lookup_declared_id(file: &str, name: &str, symbols: &SymbolTable) -> Option<NodeId> {
    symbols.resolve(&format!("{file}:import:{name}"))
}

/// For an arrow-function/function-expression node, returns the name it is
/// bound to — a variable declarator's name or a class field's name — the
/// same bare name `declare_function` indexed it under in pass 1.
fn bound_name_for_value_node(node: TsNode, source: &str) -> Option<String> {
    let parent = node.parent()?;
    match parent.kind() {
        "variable_declarator" | "public_field_definition" => child_text(parent, "name", source),
        _ => None,
    }
}

fn emit_call_edge(file: &str, source: &str, call: TsNode, source_id: &NodeId, symbols: &SymbolTable, edges: &mut Vec<Edge>) {
    let Some(callee) = call.child_by_field_name("function") else {
        return;
    };
    let line = call.start_position().row as u32 + 1;
    let column = call.start_position().column as u32 + 1;
    let call_site = CallSite {
        file_path: file.to_string(),
        line,
        column,
    };

    match callee.kind() {
        "identifier" => {
            let Ok(name) = callee.utf8_text(source.as_bytes()) else {
                return;
            };
            if let Some(target) = symbols.resolve(&format!("{file}:import:{name}")) {
                edges.push(Edge::resolved(source_id.clone(), target, call_site, EdgeKind::Direct));
            }
        }
        "member_expression" => {
            let Some(property) = callee.child_by_field_name("property") else {
                return;
            };
            let Ok(prop_name) = property.utf8_text(source.as_bytes()) else {
                return;
            };
            // Best-effort: resolve `obj.method()` by property name against
            // any declared method in the project. A type checker would
            // disambiguate by the receiver's static type; this syntactic
            // substitute accepts the ambiguity (see DESIGN.md).
            if let Some(target) = symbols.resolve(&format!("{file}:method:{prop_name}")) {
                edges.push(Edge::resolved(source_id.clone(), target, call_site.clone(), EdgeKind::Method));
            }
            // `arr.map(fn)` — a function-valued argument passed to any
            // member call is a callback reference (§4.2.1), independent of
            // whether the receiver method itself resolved.
            emit_callback_edges(file, source, call, source_id, symbols, edges, &call_site);
        }
        "subscript_expression" => {
            let expr_text = callee.utf8_text(source.as_bytes()).unwrap_or("<expr>");
            edges.push(Edge::dynamic(source_id.clone(), expr_text, call_site));
        }
        _ => {}
    }
}

/// Emits a `kind=callback` edge for each bare-identifier argument of `call`
/// that resolves to an in-project function (§4.2.1: "`arr.map(fn)` where
/// `fn` is an identifier resolving to an in-project function symbol").
fn emit_callback_edges(
    file: &str,
    source: &str,
    call: TsNode,
    source_id: &NodeId,
    symbols: &SymbolTable,
    edges: &mut Vec<Edge>,
    call_site: &CallSite,
) {
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return;
    };
    let mut cursor = arguments.walk();
    for arg in arguments.children(&mut cursor) {
        if arg.kind() != "identifier" {
            continue;
        }
        let Ok(name) = arg.utf8_text(source.as_bytes()) else {
            continue;
        };
        if let Some(target) = symbols.resolve(&format!("{file}:import:{name}")) {
            edges.push(Edge::resolved(source_id.clone(), target, call_site.clone(), EdgeKind::Callback));
        }
    }
}

fn emit_new_edge(file: &str, source: &str, new_expr: TsNode, source_id: &NodeId, symbols: &SymbolTable, edges: &mut Vec<Edge>) {
    let Some(constructor) = new_expr.child_by_field_name("constructor") else {
        return;
    };
    let Ok(type_name) = constructor.utf8_text(source.as_bytes()) else {
        return;
    };
    let line = new_expr.start_position().row as u32 + 1;
    let column = new_expr.start_position().column as u32 + 1;
    let call_site = CallSite {
        file_path: file.to_string(),
        line,
        column,
    };
    if let Some(target) = symbols.resolve(&format!("{file}:import:{type_name}.constructor")) {
        edges.push(Edge::resolved(source_id.clone(), target, call_site, EdgeKind::Constructor));
    }
}
