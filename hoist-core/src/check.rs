use std::collections::HashSet;

use indexmap::IndexSet;

use crate::model::{Graph, NodeIdx, PackageId, PackageName};

/// Verifies the invariants a hoist must never break, directly against the
/// working graph right after the driver has finished.
///
/// No slot collision needs no runtime check: `IndexMap` makes two children
/// sharing a name structurally impossible. The rest are checked here; each
/// returned string names one violated invariant.
pub(crate) fn verify_invariants(graph: &Graph) -> Vec<String> {
    let mut violations = Vec::new();
    verify_require_promise(graph, &mut violations);
    verify_peer_promise(graph, &mut violations);
    verify_no_introduction(graph, &mut violations);
    violations
}

/// Resolving any name a node originally depended on, starting the search at
/// that node and walking outward to the root, must still land on the same
/// id it did at import time (the require promise).
fn verify_require_promise(graph: &Graph, violations: &mut Vec<String>) {
    let mut path = vec![graph.root];
    let mut seen = IndexSet::new();
    seen.insert(graph.root);
    walk_require_promise(graph, &mut path, &mut seen, violations);
}

fn walk_require_promise(graph: &Graph, path: &mut Vec<NodeIdx>, seen: &mut IndexSet<NodeIdx>, violations: &mut Vec<String>) {
    let node_idx = *path.last().unwrap();
    let node = &graph.nodes[node_idx];

    for (name, &original_idx) in &node.original_dependencies {
        let expected_id = &graph.nodes[original_idx].id;
        match resolve(graph, path, name) {
            Some(resolved_idx) if graph.nodes[resolved_idx].id == *expected_id => {}
            Some(resolved_idx) => violations.push(format!(
                "require promise broken: {} resolves {} to {} instead of {}",
                node.id, name, graph.nodes[resolved_idx].id, expected_id
            )),
            None => violations.push(format!("require promise broken: {} can no longer resolve {} at all (expected {})", node.id, name, expected_id)),
        }
    }

    let children: Vec<NodeIdx> = node.dependencies.values().chain(node.workspaces.values()).copied().collect();
    for child in children {
        if !seen.insert(child) {
            continue;
        }
        path.push(child);
        walk_require_promise(graph, path, seen, violations);
        path.pop();
    }
}

/// Every node's own peer names must still resolve, from its current direct
/// parent, to whatever they resolved to under its original parent at import
/// time — regardless of whether this node has since moved to a new parent.
fn verify_peer_promise(graph: &Graph, violations: &mut Vec<String>) {
    let mut seen = IndexSet::new();
    seen.insert(graph.root);
    walk_peer_promise(graph, graph.root, &mut seen, violations);
}

fn walk_peer_promise(graph: &Graph, parent_idx: NodeIdx, seen: &mut IndexSet<NodeIdx>, violations: &mut Vec<String>) {
    let parent = &graph.nodes[parent_idx];
    let children: Vec<NodeIdx> = parent.dependencies.values().chain(parent.workspaces.values()).copied().collect();

    for child_idx in &children {
        let child = &graph.nodes[*child_idx];
        for (peer_name, &original_idx) in &child.original_peer_targets {
            let expected_id = graph.nodes[original_idx].id.clone();
            match parent.dependencies.get(peer_name) {
                Some(&actual_idx) if graph.nodes[actual_idx].id == expected_id => {}
                Some(&actual_idx) => violations.push(format!(
                    "peer promise broken: {} needs {} resolved to {} but its parent {} now resolves it to {}",
                    child.id, peer_name, expected_id, parent.id, graph.nodes[actual_idx].id
                )),
                None => violations.push(format!(
                    "peer promise broken: {} needs {} resolved to {} but its parent {} no longer resolves it at all",
                    child.id, peer_name, expected_id, parent.id
                )),
            }
        }
    }

    for child_idx in children {
        if seen.insert(child_idx) {
            walk_peer_promise(graph, child_idx, seen, violations);
        }
    }
}

/// Every (name, id) pair reachable after hoisting must have been declared
/// by *some* node at import time — hoisting only moves edges, it never
/// introduces new ones.
fn verify_no_introduction(graph: &Graph, violations: &mut Vec<String>) {
    let mut allowed: HashSet<(PackageName, PackageId)> = HashSet::new();
    for node in &graph.nodes {
        for (name, &idx) in &node.original_dependencies {
            allowed.insert((name.clone(), graph.nodes[idx].id.clone()));
        }
    }

    for node in &graph.nodes {
        for (name, &idx) in &node.dependencies {
            let pair = (name.clone(), graph.nodes[idx].id.clone());
            if !allowed.contains(&pair) {
                violations.push(format!("introduced a dependency not present in the input: {} -> {}", name, graph.nodes[idx].id));
            }
        }
    }
}

/// Nearest-ancestor-or-self resolution of `name`, searching outward from
/// `path`'s tail to the root.
fn resolve(graph: &Graph, path: &[NodeIdx], name: &PackageName) -> Option<NodeIdx> {
    for &idx in path.iter().rev() {
        if let Some(&found) = graph.nodes[idx].dependencies.get(name) {
            return Some(found);
        }
    }
    None
}
