//! EntryPointMatcher (§4.4): classify nodes against configured rules plus
//! per-language auto-detection, producing the entry-point id set.

use globset::Glob;

use crate::config::EntryPointRule;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::model::{Language, Node, Visibility};

/// Applies configured `EntryPointRule`s plus language auto-detection and
/// returns the set of node ids flagged `isEntryPoint = true`.
///
/// A malformed glob rule does not fail the run (§7 `MatcherGlobInvalid` is
/// "rule dropped with diagnostic; matching continues") — it is reported to
/// `diagnostics` and skipped.
pub fn match_entry_points(
    nodes: &[Node],
    rules: &[EntryPointRule],
    language: Language,
    diagnostics: &DiagnosticSink,
) -> Vec<String> {
    let mut entry_ids: Vec<String> = Vec::new();

    for rule in rules {
        match rule {
            EntryPointRule::File { pattern } | EntryPointRule::Export { pattern } => {
                let glob = match Glob::new(pattern) {
                    Ok(g) => g.compile_matcher(),
                    Err(e) => {
                        diagnostics.push(
                            Diagnostic::error(
                                "MatcherGlobInvalid",
                                format!("entry-point glob `{pattern}` is invalid: {e}"),
                            ),
                        );
                        continue;
                    }
                };
                for node in nodes {
                    if node.visibility == Visibility::Exported && glob.is_match(&node.file_path) {
                        entry_ids.push(node.id.as_str().to_string());
                    }
                }
            }
            EntryPointRule::Function { name } => {
                for node in nodes {
                    if &node.name == name || &node.qualified_name == name || node.id.as_str() == name {
                        entry_ids.push(node.id.as_str().to_string());
                    }
                }
            }
            EntryPointRule::Decorator { name } => {
                for node in nodes {
                    let Some(decorators) = &node.decorators else {
                        continue;
                    };
                    if decorators.iter().any(|d| d == name || d.contains(name.as_str())) {
                        entry_ids.push(node.id.as_str().to_string());
                    }
                }
            }
        }
    }

    entry_ids.extend(auto_detect(nodes, language));

    entry_ids.sort();
    entry_ids.dedup();
    entry_ids
}

/// Language-specific auto-entry detection (§4.4 "Auto-detection").
///
/// TypeScript has no auto-detection rule of its own in §4.4 — it relies
/// entirely on configured rules (and the extractor's own re-export
/// resolution). Go and Python auto-entries are identified by the
/// extractor (see `reachgraph-extract`) and surfaced here as nodes whose
/// `is_entry_point` flag the extractor already set; this pass folds those
/// in alongside matcher-rule hits so a single id set is always returned.
fn auto_detect(nodes: &[Node], language: Language) -> Vec<String> {
    match language {
        Language::Go => nodes
            .iter()
            .filter(|n| is_go_auto_entry(&n.name))
            .map(|n| n.id.as_str().to_string())
            .collect(),
        Language::Python | Language::Typescript => nodes
            .iter()
            .filter(|n| n.is_entry_point)
            .map(|n| n.id.as_str().to_string())
            .collect(),
    }
}

fn is_go_auto_entry(name: &str) -> bool {
    name == "main"
        || name == "init"
        || name.starts_with("Test")
        || name.starts_with("Benchmark")
        || name.starts_with("Example")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeKind};

    fn node(file: &str, name: &str, visibility: Visibility) -> Node {
        Node::new_unclassified(
            file.to_string(),
            name.to_string(),
            name.to_string(),
            1,
            2,
            Language::Typescript,
            NodeKind::Function,
            visibility,
            Vec::new(),
            None,
        )
    }

    #[test]
    fn function_rule_matches_by_name_qualified_name_or_id() {
        let nodes = vec![node("a.ts", "run", Visibility::Exported)];
        let rules = vec![EntryPointRule::Function {
            name: "run".to_string(),
        }];
        let sink = DiagnosticSink::new();
        let ids = match_entry_points(&nodes, &rules, Language::Typescript, &sink);
        assert_eq!(ids, vec!["a.ts:run".to_string()]);
    }

    #[test]
    fn invalid_glob_drops_rule_and_reports_diagnostic() {
        let nodes = vec![node("a.ts", "run", Visibility::Exported)];
        let rules = vec![EntryPointRule::File {
            pattern: "[".to_string(),
        }];
        let sink = DiagnosticSink::new();
        let ids = match_entry_points(&nodes, &rules, Language::Typescript, &sink);
        assert!(ids.is_empty());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn go_auto_entry_detects_main_and_test_prefixes() {
        let nodes = vec![
            node("main.go", "main", Visibility::Module),
            node("foo_test.go", "TestFoo", Visibility::Exported),
            node("foo.go", "Helper", Visibility::Exported),
        ];
        let sink = DiagnosticSink::new();
        let ids = match_entry_points(&nodes, &[], Language::Go, &sink);
        assert_eq!(ids.len(), 2);
    }
}
