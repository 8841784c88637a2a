//! ReachabilityEngine (§4.5): BFS from the entry-point set over outgoing
//! edges, classifying every node `entry`, `live`, or `dead`.
//!
//! The critical correctness rule (the "anti-pattern" the spec calls out):
//! a node is never promoted to `live` because it has an *incoming* edge.
//! Mutually recursive clusters with no entry-reachable member stay dead.
//! The only promotion signal is BFS outward from the entry set.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::{derive_color, Edge, Node, Status};

/// Runs BFS over `edges` starting from `entry_ids` and assigns `status`/
/// `color`/`is_entry_point` on every node in `nodes`, in place.
///
/// Complexity O(V+E): one adjacency build pass, one BFS pass.
pub fn classify(nodes: &mut [Node], edges: &[Edge], entry_ids: &[String]) {
    let entry_set: HashSet<&str> = entry_ids.iter().map(String::as_str).collect();

    // Adjacency keyed by source node id, values are target ids in the
    // edges' emitted order, resolved-only (dynamic sentinels never name a
    // real node so they can never be visited).
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        if !edge.is_resolved {
            continue;
        }
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    // Deterministic seeding: entry ids visited in ascending string order,
    // mirroring the tie-break rule (§4.5 "Equal-priority ties are broken
    // by node-id string ordering").
    let mut seeded: Vec<&str> = entry_set.iter().copied().collect();
    seeded.sort_unstable();
    for id in seeded {
        if visited.insert(id.to_string()) {
            queue.push_back(id.to_string());
        }
    }

    while let Some(current) = queue.pop_front() {
        if let Some(targets) = adjacency.get(current.as_str()) {
            for &target in targets {
                if !visited.contains(target) {
                    visited.insert(target.to_string());
                    queue.push_back(target.to_string());
                }
            }
        }
    }

    for node in nodes.iter_mut() {
        let id = node.id.as_str();
        let is_entry = entry_set.contains(id);
        node.is_entry_point = is_entry;
        node.status = if is_entry {
            Status::Entry
        } else if visited.contains(id) {
            Status::Live
        } else {
            Status::Dead
        };
        let has_unused = !node.unused_parameters.is_empty();
        node.color = derive_color(node.status, has_unused);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallSite, EdgeKind, Language, NodeId, NodeKind, Visibility};

    fn node(id: &str) -> Node {
        Node::new_unclassified(
            id.split(':').next().unwrap().to_string(),
            id.split(':').nth(1).unwrap().to_string(),
            id.split(':').nth(1).unwrap().to_string(),
            1,
            2,
            Language::Typescript,
            NodeKind::Function,
            Visibility::Module,
            Vec::new(),
            None,
        )
    }

    fn edge(source: &str, target: &str) -> Edge {
        Edge::resolved(
            NodeId::from(source),
            NodeId::from(target),
            CallSite {
                file_path: source.split(':').next().unwrap().to_string(),
                line: 1,
                column: 1,
            },
            EdgeKind::Direct,
        )
    }

    /// (S1) Entry chain A→B→C, A declared entry: A entry/blue, B/C live/green.
    #[test]
    fn entry_chain_propagates_liveness() {
        let mut nodes = vec![node("a.ts:A"), node("a.ts:B"), node("a.ts:C")];
        let edges = vec![edge("a.ts:A", "a.ts:B"), edge("a.ts:B", "a.ts:C")];
        classify(&mut nodes, &edges, &["a.ts:A".to_string()]);

        assert_eq!(nodes[0].status, Status::Entry);
        assert_eq!(nodes[1].status, Status::Live);
        assert_eq!(nodes[2].status, Status::Live);
        assert_eq!(nodes[1].color, crate::model::Color::Green);
    }

    /// (S2) Dead leaf with no edges classifies as dead/red.
    #[test]
    fn isolated_node_with_no_entry_is_dead() {
        let mut nodes = vec![node("a.ts:D")];
        classify(&mut nodes, &[], &[]);
        assert_eq!(nodes[0].status, Status::Dead);
        assert_eq!(nodes[0].color, crate::model::Color::Red);
    }

    /// (S3) Mutual recursion with no entry stays dead — the anti-pattern guard.
    #[test]
    fn mutual_recursion_without_entry_stays_dead() {
        let mut nodes = vec![node("a.ts:mutualA"), node("a.ts:mutualB")];
        let edges = vec![
            edge("a.ts:mutualA", "a.ts:mutualB"),
            edge("a.ts:mutualB", "a.ts:mutualA"),
        ];
        classify(&mut nodes, &edges, &[]);
        assert!(nodes.iter().all(|n| n.status == Status::Dead));
    }

    /// (12) Adding a self-edge does not change any node's status.
    #[test]
    fn self_edge_does_not_change_status() {
        let mut nodes = vec![node("a.ts:A")];
        let edges = vec![edge("a.ts:A", "a.ts:A")];
        classify(&mut nodes, &edges, &["a.ts:A".to_string()]);
        assert_eq!(nodes[0].status, Status::Entry);

        let mut nodes_no_self = vec![node("a.ts:A")];
        classify(&mut nodes_no_self, &[], &["a.ts:A".to_string()]);
        assert_eq!(nodes_no_self[0].status, Status::Entry);
    }

    /// If the entry set is empty, every node is dead (law 9).
    #[test]
    fn empty_entry_set_means_all_dead() {
        let mut nodes = vec![node("a.ts:A"), node("a.ts:B")];
        let edges = vec![edge("a.ts:A", "a.ts:B")];
        classify(&mut nodes, &edges, &[]);
        assert!(nodes.iter().all(|n| n.status == Status::Dead));
    }

    /// Dynamic (unresolved) edges never extend the visited set.
    #[test]
    fn dynamic_edges_do_not_promote_targets() {
        let mut nodes = vec![node("a.ts:A")];
        let mut edges = vec![edge("a.ts:A", "a.ts:B")];
        edges[0].is_resolved = false;
        classify(&mut nodes, &edges, &["a.ts:A".to_string()]);
        assert_eq!(nodes[0].status, Status::Entry);
    }
}
