use std::collections::HashSet;

use crate::model::{Graph, NodeIdx, Package, PackageId};

/// Walks the (possibly still shared or cyclic) hoisted graph back into the
/// external nested shape, the inverse of [`crate::import::import`].
///
/// The first time an id is reached it is emitted in full; every later
/// occurrence emits a bare id only, exactly mirroring how the importer
/// collapses repeated ids back onto one node, and guaranteeing termination
/// on cyclic graphs.
pub(crate) fn export(graph: &Graph) -> Package {
    let mut emitted: HashSet<PackageId> = HashSet::new();
    export_node(graph, graph.root, &mut emitted)
}

fn export_node(graph: &Graph, idx: NodeIdx, emitted: &mut HashSet<PackageId>) -> Package {
    let node = &graph.nodes[idx];
    let mut pkg = Package::new(node.id.clone());
    pkg.peer_names = node.peer_names.clone();
    pkg.package_type = node.package_type;

    if !emitted.insert(node.id.clone()) {
        return pkg;
    }

    pkg.dependencies = node.dependencies.values().map(|&child| export_node(graph, child, emitted)).collect();
    pkg.workspaces = node.workspaces.values().map(|&child| export_node(graph, child, emitted)).collect();
    pkg.dependencies.sort_by(|a, b| a.id.cmp(&b.id));
    pkg.workspaces.sort_by(|a, b| a.id.cmp(&b.id));
    pkg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::import;

    #[test]
    fn shared_child_is_emitted_in_full_exactly_once() {
        let shared = Package::new("B@1").with_dependencies(vec![Package::new("D@1")]);
        let tree = Package::new(".").with_dependencies(vec![
            Package::new("A@1").with_dependencies(vec![shared.clone()]),
            Package::new("C@1").with_dependencies(vec![shared]),
        ]);
        let graph = import(&tree).unwrap();
        let out = export(&graph);

        let a = out.dependencies.iter().find(|p| p.id == "A@1").unwrap();
        let c = out.dependencies.iter().find(|p| p.id == "C@1").unwrap();
        let b_under_a = a.dependencies.iter().find(|p| p.id == "B@1").unwrap();
        let b_under_c = c.dependencies.iter().find(|p| p.id == "B@1").unwrap();

        let full_count = [b_under_a, b_under_c].iter().filter(|p| !p.dependencies.is_empty()).count();
        assert_eq!(full_count, 1, "the shared node's subtree should appear exactly once");
    }

    #[test]
    fn siblings_are_emitted_in_id_order_regardless_of_input_order() {
        let tree = Package::new(".").with_dependencies(vec![Package::new("C@1"), Package::new("A@1"), Package::new("B@1")]);
        let graph = import(&tree).unwrap();
        let out = export(&graph);
        let ids: Vec<&str> = out.dependencies.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["A@1", "B@1", "C@1"]);
    }
}
