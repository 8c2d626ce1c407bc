use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{HoistError, Result};
use crate::model::{Graph, Node, NodeIdx, Package, PackageId, PackageName};
use crate::name::name_of;

/// Builds the working graph from the external nested tree.
///
/// Repeated ids anywhere in the tree collapse onto the same arena node,
/// which is what lets a genuinely cyclic or shared input graph survive a
/// JSON-shaped format with no object identity of its own.
pub(crate) fn import(tree: &Package) -> Result<Graph> {
    let mut nodes = Vec::new();
    let mut memo: HashMap<PackageId, NodeIdx> = HashMap::new();
    let root = import_node(tree, &mut nodes, &mut memo)?;
    let mut graph = Graph { nodes, root };
    mark_shared(&mut graph);
    freeze_peer_targets(&mut graph);
    Ok(graph)
}

/// Freezes, for every node that declares peer names, what each name
/// resolved to via the first original parent that reached it — the target
/// the peer promise checker holds a node to even after it moves elsewhere.
/// Matches [`crate::priority::analyze`]'s single-hop, dependencies-only
/// resolution rule.
fn freeze_peer_targets(graph: &mut Graph) {
    let mut resolutions: Vec<(NodeIdx, PackageName, NodeIdx)> = Vec::new();
    for parent in &graph.nodes {
        for &child_idx in parent.dependencies.values().chain(parent.workspaces.values()) {
            for peer_name in &graph.nodes[child_idx].peer_names {
                if let Some(&target_idx) = parent.dependencies.get(peer_name) {
                    resolutions.push((child_idx, peer_name.clone(), target_idx));
                }
            }
        }
    }
    for (child_idx, peer_name, target_idx) in resolutions {
        graph.nodes[child_idx].original_peer_targets.entry(peer_name).or_insert(target_idx);
    }
}

/// Flags every node with more than one incoming edge as not yet decoupled,
/// so the driver only clones the nodes that genuinely need copy-on-write
/// and mutates everything else — including the root, which has no parent
/// slot to rewire anyway — in place.
fn mark_shared(graph: &mut Graph) {
    let mut incoming = vec![0usize; graph.nodes.len()];
    for node in &graph.nodes {
        for &idx in node.dependencies.values().chain(node.workspaces.values()) {
            incoming[idx] += 1;
        }
    }
    for (idx, node) in graph.nodes.iter_mut().enumerate() {
        node.decoupled = idx == graph.root || incoming[idx] <= 1;
    }
}

fn import_node(pkg: &Package, nodes: &mut Vec<Node>, memo: &mut HashMap<PackageId, NodeIdx>) -> Result<NodeIdx> {
    if let Some(&idx) = memo.get(&pkg.id) {
        return Ok(idx);
    }

    check_no_duplicate_names(pkg)?;

    let idx = nodes.len();
    nodes.push(Node {
        id: pkg.id.clone(),
        dependencies: IndexMap::new(),
        workspaces: IndexMap::new(),
        peer_names: pkg.peer_names.clone(),
        package_type: pkg.package_type,
        hoisted_to: IndexMap::new(),
        original_dependencies: IndexMap::new(),
        original_peer_targets: IndexMap::new(),
        decoupled: false,
    });
    // Memoized before recursing: a self-referencing child, or a cycle that
    // loops back to this node, resolves to this same slot instead of
    // recursing forever.
    memo.insert(pkg.id.clone(), idx);

    let mut dependencies = IndexMap::new();
    for child in &pkg.dependencies {
        let name = name_of(&child.id);
        let child_idx = import_node(child, nodes, memo)?;
        dependencies.insert(name, child_idx);
    }

    let mut workspaces = IndexMap::new();
    for child in &pkg.workspaces {
        let name = name_of(&child.id);
        let child_idx = import_node(child, nodes, memo)?;
        workspaces.insert(name, child_idx);
    }

    nodes[idx].original_dependencies = dependencies.clone();
    nodes[idx].dependencies = dependencies;
    nodes[idx].workspaces = workspaces;

    Ok(idx)
}

/// A name may appear at most once across dependencies and workspaces combined.
fn check_no_duplicate_names(pkg: &Package) -> Result<()> {
    let mut seen: IndexMap<PackageName, PackageId> = IndexMap::new();
    for child in pkg.dependencies.iter().chain(pkg.workspaces.iter()) {
        let name = name_of(&child.id);
        match seen.get(&name) {
            Some(existing) if *existing != child.id => {
                return Err(HoistError::DuplicateName {
                    parent: pkg.id.clone(),
                    name,
                    first: existing.clone(),
                    second: child.id.clone(),
                });
            }
            _ => {
                seen.insert(name, child.id.clone());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_shared_ids_onto_one_node() {
        let shared = Package::new("B@1");
        let tree = Package::new(".").with_dependencies(vec![
            Package::new("A@1").with_dependencies(vec![shared.clone()]),
            Package::new("C@1").with_dependencies(vec![shared]),
        ]);

        let graph = import(&tree).unwrap();
        let root = &graph.nodes[graph.root];
        let a = graph.nodes[root.dependencies["A"]].dependencies["B"];
        let c = graph.nodes[root.dependencies["C"]].dependencies["B"];
        assert_eq!(a, c);
    }

    #[test]
    fn self_reference_wires_to_the_same_instance() {
        let tree = Package::new("A@1").with_dependencies(vec![Package::new("A@1")]);
        let graph = import(&tree).unwrap();
        assert_eq!(graph.nodes[graph.root].dependencies["A"], graph.root);
    }

    #[test]
    fn duplicate_name_across_dependencies_and_workspaces_is_rejected() {
        let tree = Package::new(".")
            .with_dependencies(vec![Package::new("A@1")])
            .with_workspaces(vec![Package::new("A@2")]);
        let err = import(&tree).unwrap_err();
        assert!(matches!(err, HoistError::DuplicateName { .. }));
    }
}
