//! StatsAggregator (§4.7): summary counts, per-package breakdowns, and the
//! largest-functions top-N.

use std::collections::HashMap;

use crate::model::{
    CountStat, EntryPointsStat, LargestFunctionEntry, Node, Stats, Status,
};

const TOP_LARGEST: usize = 10;

/// Rounds `count/total` to a percentage with two decimal places using the
/// exact formula from §4.7: `round(count * 10000 / total) / 100`, with `0`
/// when `total == 0`.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((count as f64 * 10000.0 / total as f64).round()) / 100.0
}

fn count_stat(matching: impl Fn(&Node) -> bool, nodes: &[Node]) -> CountStat {
    let mut by_package: HashMap<String, usize> = HashMap::new();
    let mut count = 0usize;
    for node in nodes {
        if matching(node) {
            count += 1;
            *by_package.entry(node.package_or_module.clone()).or_insert(0) += 1;
        }
    }
    CountStat {
        count,
        percentage: percentage(count, nodes.len()),
        by_package,
    }
}

/// Computes the full `Stats` block for an assembled node set, given the
/// entry-point ids in insertion order (§4.7 "entryPoints: ... order =
/// insertion").
pub fn aggregate(nodes: &[Node], entry_ids_in_insertion_order: &[String]) -> Stats {
    let dead_functions = count_stat(|n| n.status == Status::Dead, nodes);
    let unused_parameters = count_stat(|n| !n.unused_parameters.is_empty(), nodes);

    let entry_points = EntryPointsStat {
        count: entry_ids_in_insertion_order.len(),
        ids: entry_ids_in_insertion_order.to_vec(),
    };

    let mut largest: Vec<&Node> = nodes.iter().collect();
    largest.sort_by(|a, b| {
        b.lines_of_code
            .cmp(&a.lines_of_code)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });
    let largest_functions = largest
        .into_iter()
        .take(TOP_LARGEST)
        .map(|n| LargestFunctionEntry {
            id: n.id.as_str().to_string(),
            lines_of_code: n.lines_of_code,
        })
        .collect();

    Stats {
        dead_functions,
        unused_parameters,
        entry_points,
        largest_functions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, NodeKind, Parameter, Visibility};

    fn node_with_loc(file: &str, name: &str, loc_span: u32) -> Node {
        Node::new_unclassified(
            file.to_string(),
            name.to_string(),
            name.to_string(),
            1,
            loc_span,
            Language::Typescript,
            NodeKind::Function,
            Visibility::Module,
            Vec::new(),
            None,
        )
    }

    #[test]
    fn percentage_formula_matches_spec_rounding() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(2, 4), 50.0);
    }

    #[test]
    fn dead_function_count_matches_node_statuses() {
        let mut nodes = vec![node_with_loc("a.ts", "a", 3), node_with_loc("a.ts", "b", 3)];
        nodes[0].status = Status::Dead;
        nodes[1].status = Status::Live;
        let stats = aggregate(&nodes, &[]);
        assert_eq!(stats.dead_functions.count, 1);
    }

    #[test]
    fn largest_functions_tie_broken_by_id_ascending() {
        let nodes = vec![
            node_with_loc("b.ts", "fn", 10),
            node_with_loc("a.ts", "fn", 10),
        ];
        let stats = aggregate(&nodes, &[]);
        assert_eq!(stats.largest_functions[0].id, "a.ts:fn");
        assert_eq!(stats.largest_functions[1].id, "b.ts:fn");
    }

    #[test]
    fn unused_parameters_counted_when_any_parameter_is_unused() {
        let mut node = node_with_loc("a.ts", "fn", 3);
        node.parameters = vec![Parameter {
            name: "x".to_string(),
            type_annotation: None,
            is_used: false,
            position: 0,
        }];
        node.unused_parameters = vec!["x".to_string()];
        let stats = aggregate(&[node], &[]);
        assert_eq!(stats.unused_parameters.count, 1);
    }
}
