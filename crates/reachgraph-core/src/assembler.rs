//! GraphAssembler (§4.8): sequences FileDiscovery's output through the
//! matcher, reachability engine, cluster builder, and stats aggregator,
//! then composes and re-validates the final artifact.

use std::collections::HashSet;
use std::time::Instant;

use crate::clusters::build_clusters;
use crate::config::ResolvedConfig;
use crate::diagnostics::DiagnosticSink;
use crate::entrypoints::match_entry_points;
use crate::error::{ReachError, Result};
use crate::model::{CodeGraph, Edge, EntryNode, Metadata, Node, DYNAMIC_SENTINEL_PREFIX, SCHEMA_VERSION};
use crate::reachability::classify;
use crate::stats::aggregate;

/// The raw extraction output an extractor hands the assembler (§4.2:
/// "returns `{nodes, edges, filesAnalyzed, diagnostics}`").
pub struct ExtractionResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub files_analyzed: usize,
}

/// Runs EntryPointMatcher → ReachabilityEngine → ClusterBuilder →
/// StatsAggregator → artifact composition over an extractor's output,
/// measuring wall-clock duration for `metadata.analysisTimeMs`.
///
/// Re-asserts the §3 invariants as a last line of defense; any violation
/// fails with `InvariantViolated` rather than emitting a malformed
/// artifact.
pub fn assemble(
    mut extraction: ExtractionResult,
    config: ResolvedConfig,
    diagnostics: &DiagnosticSink,
) -> Result<CodeGraph> {
    let started_at = Instant::now();

    let entry_ids = match_entry_points(&extraction.nodes, &config.entry_points, config.language, diagnostics);

    classify(&mut extraction.nodes, &extraction.edges, &entry_ids);

    let clusters = build_clusters(&extraction.nodes);
    let stats = aggregate(&extraction.nodes, &entry_ids);

    let mut nodes = extraction.nodes;
    let mut edges = extraction.edges;

    // Determinism ordering (§4.8), applied before the artifact is composed
    // so every downstream consumer — including the invariant check below —
    // sees the canonical order.
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let entry_node = EntryNode::new(entry_ids.clone());

    let metadata = Metadata {
        version: SCHEMA_VERSION.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        language: config.language,
        project_root: config.project_root.clone(),
        analysis_time_ms: started_at.elapsed().as_millis() as u64,
        total_files: extraction.files_analyzed,
        total_functions: nodes.len(),
        total_edges: edges.len(),
        total_dead_functions: stats.dead_functions.count,
        total_unused_parameters: stats.unused_parameters.count,
        config,
    };

    let graph = CodeGraph {
        metadata,
        nodes,
        edges,
        entry_node,
        clusters,
        stats,
    };

    assert_invariants(&graph)?;
    Ok(graph)
}

/// Re-asserts the §3 invariants over an assembled artifact. Internal bug
/// detector: any failure here means a component upstream violated its
/// own contract.
fn assert_invariants(graph: &CodeGraph) -> Result<()> {
    let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

    if node_ids.len() != graph.nodes.len() {
        return Err(ReachError::InvariantViolated(
            "duplicate node id in assembled artifact".to_string(),
        ));
    }

    for edge in &graph.edges {
        if !node_ids.contains(edge.source.as_str()) {
            return Err(ReachError::InvariantViolated(format!(
                "edge source {} does not name a real node",
                edge.source
            )));
        }
        let target_is_dynamic = edge.target.starts_with(DYNAMIC_SENTINEL_PREFIX);
        if edge.is_resolved {
            if target_is_dynamic || !node_ids.contains(edge.target.as_str()) {
                return Err(ReachError::InvariantViolated(format!(
                    "resolved edge {} -> {} does not target a real node",
                    edge.source, edge.target
                )));
            }
        } else if !target_is_dynamic {
            return Err(ReachError::InvariantViolated(format!(
                "unresolved edge {} -> {} is missing the dynamic sentinel",
                edge.source, edge.target
            )));
        }
    }

    for node in &graph.nodes {
        let is_entry_status = node.status == crate::model::Status::Entry;
        if is_entry_status != node.is_entry_point {
            return Err(ReachError::InvariantViolated(format!(
                "node {} has status/isEntryPoint mismatch",
                node.id
            )));
        }
        let expected_color =
            crate::model::derive_color(node.status, !node.unused_parameters.is_empty());
        if expected_color != node.color {
            return Err(ReachError::InvariantViolated(format!(
                "node {} color does not match status/unusedParameters derivation",
                node.id
            )));
        }
        if node.lines_of_code != node.end_line.saturating_sub(node.start_line) + 1 {
            return Err(ReachError::InvariantViolated(format!(
                "node {} linesOfCode does not match endLine - startLine + 1",
                node.id
            )));
        }
    }

    let mut seen_in_clusters: HashSet<&str> = HashSet::new();
    for cluster in &graph.clusters {
        for id in &cluster.node_ids {
            if !seen_in_clusters.insert(id.as_str()) {
                return Err(ReachError::InvariantViolated(format!(
                    "node {id} appears in more than one cluster"
                )));
            }
        }
    }
    for node in &graph.nodes {
        if !seen_in_clusters.contains(node.id.as_str()) {
            return Err(ReachError::InvariantViolated(format!(
                "node {} is not covered by any cluster",
                node.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallSite, EdgeKind, Language, NodeId, NodeKind, Visibility};

    fn node(file: &str, name: &str) -> Node {
        Node::new_unclassified(
            file.to_string(),
            name.to_string(),
            name.to_string(),
            1,
            3,
            Language::Typescript,
            NodeKind::Function,
            Visibility::Exported,
            Vec::new(),
            None,
        )
    }

    #[test]
    fn assembles_a_valid_artifact_and_passes_invariants() {
        let nodes = vec![node("a.ts", "A"), node("a.ts", "B")];
        let edges = vec![Edge::resolved(
            NodeId::from("a.ts:A"),
            NodeId::from("a.ts:B"),
            CallSite {
                file_path: "a.ts".to_string(),
                line: 2,
                column: 3,
            },
            EdgeKind::Direct,
        )];
        let config = ResolvedConfig::new(Language::Typescript, "/tmp/project");
        let diagnostics = DiagnosticSink::new();

        let graph = assemble(
            ExtractionResult {
                nodes,
                edges,
                files_analyzed: 1,
            },
            config,
            &diagnostics,
        )
        .unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.metadata.total_edges, 1);
    }

    #[test]
    fn empty_extraction_yields_empty_artifact_not_an_error() {
        let config = ResolvedConfig::new(Language::Typescript, "/tmp/project");
        let diagnostics = DiagnosticSink::new();
        let graph = assemble(
            ExtractionResult {
                nodes: Vec::new(),
                edges: Vec::new(),
                files_analyzed: 0,
            },
            config,
            &diagnostics,
        )
        .unwrap();
        assert!(graph.nodes.is_empty());
        assert_eq!(graph.stats.dead_functions.count, 0);
    }
}
