//! ClusterBuilder (§4.6): partition nodes into directory/module-derived
//! clusters forming a forest keyed by `packageOrModule` prefixes.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Cluster, Node};

/// Builds one cluster per distinct `packageOrModule` value, each holding
/// the ids of every node with that value, parented by the prefix up to
/// the last `/` (or `None` at the root). Cluster order is stable by id
/// (lexical), per §4.6.
pub fn build_clusters(nodes: &[Node]) -> Vec<Cluster> {
    let mut node_ids_by_package: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for node in nodes {
        node_ids_by_package
            .entry(node.package_or_module.clone())
            .or_default()
            .push(node.id.as_str().to_string());
    }

    // Ensure every ancestor package has a cluster even if it owns no nodes
    // directly, so the parent chain always terminates at an existing id.
    let mut all_packages: BTreeSet<String> = node_ids_by_package.keys().cloned().collect();
    for package in node_ids_by_package.keys() {
        let mut current = package.as_str();
        while let Some(idx) = current.rfind('/') {
            let parent = &current[..idx];
            if !all_packages.insert(parent.to_string()) {
                break;
            }
            current = parent;
        }
    }

    let mut clusters = Vec::with_capacity(all_packages.len());
    for package in &all_packages {
        let mut node_ids = node_ids_by_package.get(package).cloned().unwrap_or_default();
        node_ids.sort();

        let label = package
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(package)
            .to_string();

        let parent = package.rfind('/').map(|idx| package[..idx].to_string());

        clusters.push(Cluster {
            id: package.clone(),
            label,
            node_ids,
            parent,
        });
    }

    clusters.sort_by(|a, b| a.id.cmp(&b.id));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, NodeKind, Visibility};

    fn node(file: &str, name: &str) -> Node {
        Node::new_unclassified(
            file.to_string(),
            name.to_string(),
            name.to_string(),
            1,
            2,
            Language::Typescript,
            NodeKind::Function,
            Visibility::Module,
            Vec::new(),
            None,
        )
    }

    #[test]
    fn every_node_lands_in_exactly_one_cluster() {
        let nodes = vec![
            node("src/a.ts", "one"),
            node("src/b.ts", "two"),
            node("src/utils/c.ts", "three"),
        ];
        let clusters = build_clusters(&nodes);

        for n in &nodes {
            let count = clusters
                .iter()
                .filter(|c| c.node_ids.contains(&n.id.as_str().to_string()))
                .count();
            assert_eq!(count, 1, "node {} should belong to exactly one cluster", n.id);
        }
    }

    #[test]
    fn nested_package_gets_parent_cluster() {
        let nodes = vec![node("src/utils/c.ts", "three")];
        let clusters = build_clusters(&nodes);

        let leaf = clusters.iter().find(|c| c.id == "src/utils").unwrap();
        assert_eq!(leaf.parent.as_deref(), Some("src"));

        let parent = clusters.iter().find(|c| c.id == "src").unwrap();
        assert_eq!(parent.parent, None);
    }

    #[test]
    fn clusters_are_ordered_by_id() {
        let nodes = vec![node("z/file.ts", "a"), node("a/file.ts", "b")];
        let clusters = build_clusters(&nodes);
        let ids: Vec<&str> = clusters.iter().map(|c| c.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
