use indexmap::{IndexMap, IndexSet};

use crate::model::{Graph, Node, NodeIdx, PackageId, PackageName, PackageType};
use crate::name::name_of;

/// Per-name rankings of candidate ids, computed once over the whole graph
/// before any hoisting happens. Ties break by falling back to the
/// next criterion; the ranking itself never changes while hoisting runs.
pub(crate) struct Priorities {
    ranks: IndexMap<PackageName, Vec<PackageId>>,
}

impl Priorities {
    pub fn rank_of(&self, name: &PackageName, id: &PackageId) -> usize {
        self.ranks
            .get(name)
            .and_then(|ids| ids.iter().position(|candidate| candidate == id))
            .expect("every id reachable under `name` must have been ranked for it")
    }
}

#[derive(Default)]
struct IdStats {
    placement_class: u8,
    /// Distinct ids of nodes that hold this id as a direct `dependencies` entry.
    dependents: IndexSet<PackageId>,
    /// Distinct ids of nodes whose peer name this id satisfies at their parent.
    peer_dependents: IndexSet<PackageId>,
}

impl IdStats {
    fn popularity(&self) -> usize {
        self.dependents.len() + self.peer_dependents.len()
    }
}

/// Computes placement class and popularity for every id in the graph by a
/// single flat pass over the arena — no path-sensitive traversal is needed
/// because the importer already collapsed the graph to one node per id.
pub(crate) fn analyze(graph: &Graph) -> Priorities {
    let mut stats: IndexMap<PackageId, IdStats> = IndexMap::new();

    for parent in &graph.nodes {
        for &child_idx in parent.dependencies.values() {
            record_occurrence(&mut stats, graph, parent, child_idx, false);
        }
        for &child_idx in parent.workspaces.values() {
            record_occurrence(&mut stats, graph, parent, child_idx, true);
        }
    }

    let mut by_name: IndexMap<PackageName, Vec<PackageId>> = IndexMap::new();
    for id in stats.keys() {
        by_name.entry(name_of(id)).or_default().push(id.clone());
    }

    for ids in by_name.values_mut() {
        ids.sort_by(|a, b| {
            let sa = &stats[a];
            let sb = &stats[b];
            sb.placement_class
                .cmp(&sa.placement_class)
                .then_with(|| sb.popularity().cmp(&sa.popularity()))
                .then_with(|| b.cmp(a))
        });
    }

    Priorities { ranks: by_name }
}

/// Peer co-location is checked against the *direct* parent only, matching
/// how peer requirements are resolved everywhere else in this crate;
/// popularity's peer contribution follows the same single-hop rule (see
/// DESIGN.md).
fn record_occurrence(stats: &mut IndexMap<PackageId, IdStats>, graph: &Graph, parent: &Node, child_idx: NodeIdx, via_workspace: bool) {
    let child = &graph.nodes[child_idx];

    let entry = stats.entry(child.id.clone()).or_default();
    if via_workspace {
        entry.placement_class = entry.placement_class.max(1);
    }
    if child.package_type == Some(PackageType::Portal) {
        entry.placement_class = entry.placement_class.max(2);
    }
    entry.dependents.insert(parent.id.clone());

    for peer_name in &child.peer_names {
        if let Some(&resolved_idx) = parent.dependencies.get(peer_name) {
            let resolved_id = graph.nodes[resolved_idx].id.clone();
            stats.entry(resolved_id).or_default().peer_dependents.insert(child.id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::import::import;
    use crate::model::Package;

    #[rstest]
    #[case("D@1", 0)]
    #[case("D@2", 1)]
    fn a_portal_occurrence_outranks_a_non_portal_one_of_the_same_name(#[case] id: &str, #[case] expected_rank: usize) {
        let tree = Package::new(".").with_dependencies(vec![
            Package::new("A@1").with_dependencies(vec![Package::new("D@1").with_package_type(PackageType::Portal)]),
            Package::new("B@1").with_dependencies(vec![Package::new("D@2")]),
        ]);

        let graph = import(&tree).unwrap();
        let priorities = analyze(&graph);
        assert_eq!(priorities.rank_of(&"D".to_string(), &id.to_string()), expected_rank);
    }

    #[test]
    fn workspace_occupant_outranks_a_more_popular_regular_one() {
        let tree = Package::new(".")
            .with_dependencies(vec![
                Package::new("A@1").with_dependencies(vec![Package::new("D@1")]),
                Package::new("B@1").with_dependencies(vec![Package::new("D@1")]),
            ])
            .with_workspaces(vec![Package::new("C@1").with_dependencies(vec![Package::new("D@2")])]);

        let graph = import(&tree).unwrap();
        let priorities = analyze(&graph);
        assert_eq!(priorities.rank_of(&"D".to_string(), &"D@2".to_string()), 0);
        assert_eq!(priorities.rank_of(&"D".to_string(), &"D@1".to_string()), 1);
    }

    #[test]
    fn more_popular_id_outranks_a_less_popular_one_of_equal_class() {
        let tree = Package::new(".").with_dependencies(vec![
            Package::new("A@1").with_dependencies(vec![Package::new("D@1")]),
            Package::new("B@1").with_dependencies(vec![Package::new("D@1")]),
            Package::new("C@1").with_dependencies(vec![Package::new("D@2")]),
        ]);

        let graph = import(&tree).unwrap();
        let priorities = analyze(&graph);
        assert_eq!(priorities.rank_of(&"D".to_string(), &"D@1".to_string()), 0);
        assert_eq!(priorities.rank_of(&"D".to_string(), &"D@2".to_string()), 1);
    }
}
