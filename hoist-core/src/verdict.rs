use indexmap::IndexSet;

use crate::model::{Graph, NodeIdx, PackageName};
use crate::priority::Priorities;

/// The outcome of asking whether a dependency can move to an ancestor.
/// `Depends` is only meaningful while a whole sibling batch is being
/// decided together (the initial, per-parent pass); it never survives past
/// [`crate::driver::resolve_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    Yes { new_parent_index: usize },
    No,
    Later { priority_depth: usize },
    Depends { on: IndexSet<PackageName>, new_parent_index: usize },
}

/// Decides the verdict for `name` as currently held by `path`'s last node,
/// at priority depth `k`.
///
/// `batch` is the set of sibling names being decided together in the same
/// round; a peer that is itself in `batch` produces `Depends` rather than an
/// outright NO/LATER, deferring to joint resolution.
pub(crate) fn evaluate(graph: &Graph, path: &[NodeIdx], name: &PackageName, k: usize, priorities: &Priorities, batch: &IndexSet<PackageName>) -> Verdict {
    let parent_idx = *path.last().expect("path always has at least the current node");
    let dep_idx = *graph.nodes[parent_idx]
        .dependencies
        .get(name)
        .expect("verdict is only ever asked about a name the parent currently owns");
    let dep_id = graph.nodes[dep_idx].id.clone();
    let p = priorities.rank_of(name, &dep_id);

    match scan_ancestors(graph, path, name, &dep_id, p, k, dep_idx) {
        Some(ScanOutcome::Yes(new_parent_index)) => check_peers(graph, path, parent_idx, dep_idx, k, priorities, batch, new_parent_index),
        Some(ScanOutcome::Later(depth)) => Verdict::Later { priority_depth: depth },
        None => Verdict::No,
    }
}

enum ScanOutcome {
    Yes(usize),
    Later(usize),
}

/// Scans ancestors nearest-first for a slot that either already holds this
/// exact id, or is free and only free for the top-ranked candidate.
fn scan_ancestors(graph: &Graph, path: &[NodeIdx], name: &PackageName, dep_id: &str, p: usize, k: usize, dep_idx: NodeIdx) -> Option<ScanOutcome> {
    for i in 0..path.len().saturating_sub(1) {
        let ancestor = &graph.nodes[path[i]];
        match ancestor.dependencies.get(name) {
            None => {
                return Some(if p == k { ScanOutcome::Yes(i) } else { ScanOutcome::Later(p) });
            }
            Some(&occupant_idx) => {
                if graph.nodes[occupant_idx].id == dep_id && hoisted_to_consistent(graph, path, i, dep_idx) {
                    return Some(ScanOutcome::Yes(i));
                }
                // Occupied by something else, or a stale hoistedTo redirection
                // would be violated: this ancestor is a NO, keep scanning outward.
            }
        }
    }
    None
}

/// Verifies that every redirection recorded on `dep` still resolves
/// consistently if `dep` were adopted by `path[ancestor_i]`.
fn hoisted_to_consistent(graph: &Graph, path: &[NodeIdx], ancestor_i: usize, dep_idx: NodeIdx) -> bool {
    for (name, &owner_idx) in &graph.nodes[dep_idx].hoisted_to {
        let expected = graph.nodes[owner_idx].dependencies.get(name).copied();
        let mut resolved = None;
        for j in (0..=ancestor_i).rev() {
            if let Some(&idx) = graph.nodes[path[j]].dependencies.get(name) {
                resolved = Some(idx);
                break;
            }
        }
        if resolved != expected {
            return false;
        }
    }
    true
}

/// Peer co-location, checked against `dep`'s direct parent.
fn check_peers(graph: &Graph, path: &[NodeIdx], parent_idx: NodeIdx, dep_idx: NodeIdx, k: usize, priorities: &Priorities, batch: &IndexSet<PackageName>, new_parent_index: usize) -> Verdict {
    let parent = &graph.nodes[parent_idx];
    let dep = &graph.nodes[dep_idx];

    let mut depends_on: IndexSet<PackageName> = IndexSet::new();
    let mut worst_later: Option<usize> = None;
    let mut new_parent_index = new_parent_index;

    for peer_name in &dep.peer_names {
        if batch.contains(peer_name) && parent.dependencies.contains_key(peer_name) {
            depends_on.insert(peer_name.clone());
            continue;
        }
        match parent.dependencies.get(peer_name) {
            Some(&peer_idx) => {
                let peer_id = graph.nodes[peer_idx].id.clone();
                let peer_rank = priorities.rank_of(peer_name, &peer_id);
                if peer_rank <= k {
                    return Verdict::No;
                }
                worst_later = Some(worst_later.map_or(peer_rank, |d: usize| d.max(peer_rank)));
            }
            None => {
                // Peer already hoisted away from the direct parent: the
                // dependent must not rise past the ancestor the peer now
                // lives at, or it would stop being the nearest resolution
                // of its own peer name.
                if let Some(&owner_idx) = parent.hoisted_to.get(peer_name) {
                    let owner_pos = path
                        .iter()
                        .position(|&idx| idx == owner_idx)
                        .expect("a peer recorded as hoisted must still be reachable on the current path");
                    new_parent_index = new_parent_index.max(owner_pos);
                }
                // Otherwise the peer was never declared at the direct
                // parent at all; nothing to clamp against.
            }
        }
    }

    if !depends_on.is_empty() {
        return Verdict::Depends { on: depends_on, new_parent_index };
    }
    if let Some(depth) = worst_later {
        return Verdict::Later { priority_depth: depth.max(k) };
    }
    Verdict::Yes { new_parent_index }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::import;
    use crate::model::Package;
    use crate::priority::analyze;

    #[test]
    fn basic_hoist_is_yes_at_depth_zero() {
        let tree = Package::new(".").with_dependencies(vec![Package::new("A@1").with_dependencies(vec![Package::new("B@1")])]);
        let graph = import(&tree).unwrap();
        let priorities = analyze(&graph);
        let a = graph.nodes[graph.root].dependencies["A"];
        let path = vec![graph.root, a];
        let verdict = evaluate(&graph, &path, &"B".to_string(), 0, &priorities, &IndexSet::new());
        assert_eq!(verdict, Verdict::Yes { new_parent_index: 0 });
    }

    /// `dep` sits under P, which used to hold its peer `Q` directly but has
    /// since redirected `Q` to M. Even though root has a free slot for `dep`
    /// that ranking alone would allow, `dep` must not rise past M — the
    /// ancestor that now actually owns its peer.
    #[test]
    fn yes_is_clamped_to_the_ancestor_that_now_owns_an_already_hoisted_peer() {
        use indexmap::IndexMap;

        use crate::model::{Graph, Node};

        fn leaf(id: &str) -> Node {
            Node {
                id: id.to_string(),
                dependencies: IndexMap::new(),
                workspaces: IndexMap::new(),
                peer_names: IndexSet::new(),
                package_type: None,
                hoisted_to: IndexMap::new(),
                original_dependencies: IndexMap::new(),
                original_peer_targets: IndexMap::new(),
                decoupled: true,
            }
        }

        let mut d = leaf("D@1");
        d.peer_names.insert("Q".to_string());

        let mut p = leaf("P@1");
        p.dependencies.insert("D".to_string(), 3);
        p.hoisted_to.insert("Q".to_string(), 1);

        let mut m = leaf("M@1");
        m.dependencies.insert("P".to_string(), 2);
        m.dependencies.insert("Q".to_string(), 4);

        let mut root = leaf(".");
        root.dependencies.insert("M".to_string(), 1);

        // indices: 0 root, 1 M, 2 P, 3 D, 4 Q
        let graph = Graph { nodes: vec![root, m, p, d, leaf("Q@1")], root: 0 };
        let priorities = analyze(&graph);

        let path = vec![0, 1, 2];
        let verdict = evaluate(&graph, &path, &"D".to_string(), 0, &priorities, &IndexSet::new());
        assert_eq!(verdict, Verdict::Yes { new_parent_index: 1 });
    }

    #[test]
    fn colliding_name_at_root_blocks_with_no() {
        let tree = Package::new(".").with_dependencies(vec![
            Package::new("B@2"),
            Package::new("A@1").with_dependencies(vec![Package::new("B@1")]),
        ]);
        let graph = import(&tree).unwrap();
        let priorities = analyze(&graph);
        let a = graph.nodes[graph.root].dependencies["A"];
        let path = vec![graph.root, a];
        let verdict = evaluate(&graph, &path, &"B".to_string(), 0, &priorities, &IndexSet::new());
        assert_eq!(verdict, Verdict::No);
    }
}
