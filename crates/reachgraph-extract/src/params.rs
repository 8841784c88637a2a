//! Unused-parameter analysis (§4.3): a pure body walk shared by every
//! language extractor.
//!
//! Rules, in order:
//! 1. A name starting with `_` is always used.
//! 2. A declaration with no body (interface method, abstract) is always used.
//! 3. A simple identifier `p` is used iff an identifier node textually
//!    equal to `p` appears in the body in a non-declaring position, and
//!    member-access right-hand sides (`.` field names) do not count.
//! 4. A destructuring binding recurses per-inner-name; a single
//!    parameter may therefore produce multiple `unusedParameters` entries.
//! 5. A rest binding `...args` is evaluated like a simple identifier.

use tree_sitter::Node as TsNode;

/// One name bound by a parameter, possibly one of several bound by a
/// single destructured parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundName {
    pub declared_name: String,
    pub is_used: bool,
}

/// Returns `true` if `name` is textually referenced anywhere in `body` in
/// a non-declaring position. `body` is the function/method's block node;
/// `source` is the full file content the tree was parsed from.
///
/// A reference counts unless it is the field-name child of a member
/// access (`obj.name` — the `name` there names a property, not the
/// parameter). This is a purely syntactic walk: false positives from
/// shadowing are accepted (§4.3 does not ask for scope-aware resolution).
pub fn is_referenced_in_body(body: TsNode, source: &str, name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    let mut cursor = body.walk();
    walk_for_reference(body, source, name, &mut cursor)
}

fn walk_for_reference(node: TsNode, source: &str, name: &str, cursor: &mut tree_sitter::TreeCursor) -> bool {
    if is_identifier_like(node.kind()) {
        if let Ok(text) = node.utf8_text(source.as_bytes()) {
            if text == name && !is_member_access_property(node) {
                return true;
            }
        }
    }

    if node.child_count() == 0 {
        return false;
    }

    let mut found = false;
    for child in node.children(cursor) {
        let mut child_cursor = child.walk();
        if walk_for_reference(child, source, name, &mut child_cursor) {
            found = true;
            break;
        }
    }
    found
}

fn is_identifier_like(kind: &str) -> bool {
    matches!(
        kind,
        "identifier" | "property_identifier" | "shorthand_property_identifier"
    )
}

/// True if `node` is the `.name` right-hand side of a member-access
/// expression — those occurrences refer to a property, not a binding.
fn is_member_access_property(node: TsNode) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "member_expression" | "selector_expression" | "attribute" => {
            parent.child_by_field_name("property").map(|p| p.id()) == Some(node.id())
                || parent.child_by_field_name("field").map(|p| p.id()) == Some(node.id())
                || parent.child_by_field_name("attribute").map(|p| p.id()) == Some(node.id())
        }
        _ => false,
    }
}

/// Evaluates usage for every declared binding name of one parameter,
/// following rules 1, 4, and 5. `inner_names` holds every name a
/// destructuring/rest pattern binds; a simple parameter passes a single
/// name. `body` is `None` for bodiless declarations (rule 2).
pub fn evaluate_parameter(inner_names: &[String], body: Option<TsNode>, source: &str) -> Vec<BoundName> {
    inner_names
        .iter()
        .map(|declared_name| {
            let is_used = if declared_name.starts_with('_') {
                true
            } else {
                match body {
                    None => true,
                    Some(body) => is_referenced_in_body(body, source, declared_name),
                }
            };
            BoundName {
                declared_name: declared_name.clone(),
                is_used,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse_typescript(src: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .unwrap();
        parser.parse(src, None).unwrap()
    }

    fn function_body(tree: &tree_sitter::Tree) -> TsNode<'_> {
        let root = tree.root_node();
        let func = root.child(0).unwrap();
        func.child_by_field_name("body").unwrap()
    }

    /// (13) underscore-prefixed names are always used.
    #[test]
    fn underscore_prefixed_name_is_always_used() {
        let src = "function f(_options) {}";
        let tree = parse_typescript(src);
        let body = function_body(&tree);
        let result = evaluate_parameter(&["_options".to_string()], Some(body), src);
        assert!(result[0].is_used);
    }

    #[test]
    fn referenced_simple_parameter_is_used() {
        let src = "function f(data) { return data.value; }";
        let tree = parse_typescript(src);
        let body = function_body(&tree);
        let result = evaluate_parameter(&["data".to_string()], Some(body), src);
        assert!(result[0].is_used);
    }

    #[test]
    fn unreferenced_simple_parameter_is_unused() {
        let src = "function f(unusedParam) { return 1; }";
        let tree = parse_typescript(src);
        let body = function_body(&tree);
        let result = evaluate_parameter(&["unusedParam".to_string()], Some(body), src);
        assert!(!result[0].is_used);
    }

    /// Member-access property names must not count as a reference to a
    /// same-named parameter.
    #[test]
    fn member_access_property_name_does_not_count_as_usage() {
        let src = "function f(name) { return obj.name; }";
        let tree = parse_typescript(src);
        let body = function_body(&tree);
        let result = evaluate_parameter(&["name".to_string()], Some(body), src);
        assert!(!result[0].is_used);
    }

    /// (14) destructured parameter `{a, b}` where only `a` is used.
    #[test]
    fn destructured_parameter_reports_only_unused_bindings() {
        let src = "function f({ a, b }) { return a; }";
        let tree = parse_typescript(src);
        let body = function_body(&tree);
        let result = evaluate_parameter(&["a".to_string(), "b".to_string()], Some(body), src);
        assert!(result[0].is_used);
        assert!(!result[1].is_used);
    }

    #[test]
    fn bodiless_declaration_treats_every_parameter_as_used() {
        let result = evaluate_parameter(&["x".to_string()], None, "");
        assert!(result[0].is_used);
    }
}
