use indexmap::{IndexMap, IndexSet};

use crate::error::{HoistError, Result};
use crate::model::{Graph, NodeIdx, PackageId, PackageName};
use crate::name::name_of;
use crate::priority::Priorities;
use crate::trace::Trace;
use crate::verdict::{self, Verdict};

/// Entries deferred by a LATER verdict, indexed by the priority depth they
/// must wait for. `queue[k]` only ever gains entries for `k' > k`
/// while `queue[k]` itself is being drained, which is what keeps this
/// terminating instead of looping forever.
type Queue = Vec<Vec<(Vec<PackageId>, PackageName)>>;

pub(crate) fn run(graph: &mut Graph, priorities: &Priorities, trace: &mut Trace) -> Result<()> {
    let mut queue: Queue = Vec::new();

    let mut path = vec![graph.root];
    let mut on_path: IndexSet<NodeIdx> = IndexSet::new();
    on_path.insert(graph.root);
    visit(graph, &mut path, &mut on_path, priorities, 0, &mut queue, trace);

    let mut k = 1;
    while k < queue.len() {
        let entries = std::mem::take(&mut queue[k]);
        for (path_ids, name) in entries {
            let path = reconstruct_path(graph, &path_ids)?;
            let verdict = verdict::evaluate(graph, &path, &name, k, priorities, &IndexSet::new());
            match verdict {
                Verdict::Yes { new_parent_index } => commit_hoist(graph, &path, &name, new_parent_index, trace),
                Verdict::No => trace.refuse(graph, &path, &name),
                Verdict::Later { priority_depth } => {
                    debug_assert!(priority_depth > k, "a requeue must strictly increase priority depth");
                    let depth = priority_depth.max(k + 1);
                    ensure_len(&mut queue, depth + 1);
                    trace.defer(graph, &path, &name, depth);
                    queue[depth].push((path_ids_of(graph, &path), name));
                }
                Verdict::Depends { .. } => unreachable!("queue drains run one name at a time, outside any sibling batch"),
            }
        }
        k += 1;
    }

    Ok(())
}

/// Pre-order DFS over the whole graph at priority depth `k = 0`.
fn visit(graph: &mut Graph, path: &mut Vec<NodeIdx>, on_path: &mut IndexSet<NodeIdx>, priorities: &Priorities, k: usize, queue: &mut Queue, trace: &mut Trace) {
    let parent_idx = *path.last().unwrap();
    let names = peer_order_presort(graph, parent_idx);
    let batch: IndexSet<PackageName> = names.iter().cloned().collect();

    let mut verdicts: IndexMap<PackageName, Verdict> = IndexMap::new();
    for name in &names {
        let v = verdict::evaluate(graph, path, name, k, priorities, &batch);
        verdicts.insert(name.clone(), v);
    }
    resolve_batch(&mut verdicts);

    for (name, verdict) in verdicts {
        match verdict {
            Verdict::Yes { new_parent_index } => commit_hoist(graph, path, &name, new_parent_index, trace),
            Verdict::No => trace.refuse(graph, path, &name),
            Verdict::Later { priority_depth } => {
                ensure_len(queue, priority_depth + 1);
                trace.defer(graph, path, &name, priority_depth);
                queue[priority_depth].push((path_ids_of(graph, path), name));
            }
            Verdict::Depends { .. } => unreachable!("resolve_batch eliminates every Depends verdict"),
        }
    }

    let workspace_children: Vec<NodeIdx> = graph.nodes[parent_idx].workspaces.values().copied().collect();
    let dependency_children: Vec<NodeIdx> = graph.nodes[parent_idx].dependencies.values().copied().collect();

    for child in workspace_children.into_iter().chain(dependency_children) {
        if on_path.contains(&child) {
            continue;
        }
        let child = decouple(graph, parent_idx, child);
        path.push(child);
        on_path.insert(child);
        visit(graph, path, on_path, priorities, k, queue, trace);
        on_path.shift_remove(&child);
        path.pop();
    }
}

/// Joint resolution of circular peer dependencies: propagate NO along
/// `Depends` edges to a fixpoint; whatever survives turns into YES, because
/// those names are mutually hoistable and blocked by nothing outside their
/// own cycle.
fn resolve_batch(verdicts: &mut IndexMap<PackageName, Verdict>) {
    let mut dependents_of: IndexMap<PackageName, IndexSet<PackageName>> = IndexMap::new();
    for (name, v) in verdicts.iter() {
        if let Verdict::Depends { on, .. } = v {
            for dependency in on {
                dependents_of.entry(dependency.clone()).or_default().insert(name.clone());
            }
        }
    }

    let mut queue: Vec<PackageName> = verdicts
        .iter()
        .filter(|(_, v)| matches!(v, Verdict::No))
        .map(|(name, _)| name.clone())
        .collect();
    let mut visited: IndexSet<PackageName> = queue.iter().cloned().collect();

    while let Some(name) = queue.pop() {
        let Some(affected) = dependents_of.get(&name).cloned() else { continue };
        for dependent in affected {
            verdicts.insert(dependent.clone(), Verdict::No);
            if visited.insert(dependent.clone()) {
                queue.push(dependent);
            }
        }
    }

    for v in verdicts.values_mut() {
        if let Verdict::Depends { new_parent_index, .. } = v {
            *v = Verdict::Yes { new_parent_index: *new_parent_index };
        }
    }
}

/// Orders a parent's dependency names so that anything another sibling
/// peer-depends on is decided before that sibling.
/// Ordering does not change any individual verdict in this design — all
/// verdicts for a batch are computed before any are committed — but it
/// keeps traces and commit order deterministic.
fn peer_order_presort(graph: &Graph, parent_idx: NodeIdx) -> Vec<PackageName> {
    let dep_names: IndexSet<PackageName> = graph.nodes[parent_idx].dependencies.keys().cloned().collect();
    let mut result = Vec::new();
    let mut placed: IndexSet<PackageName> = IndexSet::new();
    let mut visiting: IndexSet<PackageName> = IndexSet::new();

    for name in &dep_names {
        visit_name(graph, parent_idx, &dep_names, name, &mut placed, &mut visiting, &mut result);
    }
    result
}

fn visit_name(graph: &Graph, parent_idx: NodeIdx, dep_names: &IndexSet<PackageName>, name: &PackageName, placed: &mut IndexSet<PackageName>, visiting: &mut IndexSet<PackageName>, result: &mut Vec<PackageName>) {
    if placed.contains(name) || visiting.contains(name) {
        return;
    }
    visiting.insert(name.clone());
    if let Some(&dep_idx) = graph.nodes[parent_idx].dependencies.get(name) {
        let peers: Vec<PackageName> = graph.nodes[dep_idx].peer_names.iter().cloned().collect();
        for peer in peers {
            if dep_names.contains(&peer) {
                visit_name(graph, parent_idx, dep_names, &peer, placed, visiting, result);
            }
        }
    }
    visiting.shift_remove(name);
    if placed.insert(name.clone()) {
        result.push(name.clone());
    }
}

/// Commits a YES verdict: moves the edge from the parent (path's tail) up
/// to `path[new_parent_index]`, leaving a redirection behind.
fn commit_hoist(graph: &mut Graph, path: &[NodeIdx], name: &PackageName, new_parent_index: usize, trace: &mut Trace) {
    let tail_idx = *path.last().unwrap();
    let dep_idx = graph.nodes[tail_idx]
        .dependencies
        .shift_remove(name)
        .expect("a committed verdict was computed against a dependency the parent still owns");
    graph.nodes[tail_idx].hoisted_to.insert(name.clone(), path[new_parent_index]);

    let ancestor_idx = path[new_parent_index];
    graph.nodes[ancestor_idx].dependencies.entry(name.clone()).or_insert(dep_idx);

    trace.hoist(graph, path, name, new_parent_index);
}

/// Clones `child` (and rewires `parent`'s slot to the clone) the first time
/// it would be mutated through this particular path, if it is still shared.
/// Returns the node index to recurse into.
fn decouple(graph: &mut Graph, parent_idx: NodeIdx, child_idx: NodeIdx) -> NodeIdx {
    if graph.nodes[child_idx].decoupled {
        return child_idx;
    }

    let clone = graph.nodes[child_idx].clone();
    let new_idx = graph.nodes.len();
    graph.nodes.push(clone);
    graph.nodes[new_idx].decoupled = true;

    let parent = &mut graph.nodes[parent_idx];
    if let Some(slot) = parent.dependencies.values_mut().find(|idx| **idx == child_idx) {
        *slot = new_idx;
    } else if let Some(slot) = parent.workspaces.values_mut().find(|idx| **idx == child_idx) {
        *slot = new_idx;
    }

    new_idx
}

fn path_ids_of(graph: &Graph, path: &[NodeIdx]) -> Vec<PackageId> {
    path.iter().map(|&idx| graph.nodes[idx].id.clone()).collect()
}

/// Rebuilds a `Vec<NodeIdx>` from ids recorded at enqueue time, following
/// `hoistedTo` redirections for any ancestor that has since moved.
fn reconstruct_path(graph: &Graph, path_ids: &[PackageId]) -> Result<Vec<NodeIdx>> {
    let mut result = vec![graph.root];

    for target_id in &path_ids[1..] {
        let name = name_of(target_id);
        let current = *result.last().unwrap();
        let node = &graph.nodes[current];

        if let Some(&idx) = node.dependencies.get(&name) {
            if graph.nodes[idx].id == *target_id {
                result.push(idx);
                continue;
            }
        }

        let Some(&redirect) = node.hoisted_to.get(&name) else {
            return Err(HoistError::Unreachable { parent: node.id.clone(), name });
        };
        let redirect_pos = result
            .iter()
            .position(|&idx| idx == redirect)
            .ok_or_else(|| HoistError::Unreachable { parent: node.id.clone(), name: name.clone() })?;
        result.truncate(redirect_pos + 1);

        let redirect_node = &graph.nodes[redirect];
        match redirect_node.dependencies.get(&name) {
            Some(&idx) if graph.nodes[idx].id == *target_id => result.push(idx),
            _ => return Err(HoistError::Unreachable { parent: redirect_node.id.clone(), name }),
        }
    }

    Ok(result)
}

fn ensure_len<T: Default>(v: &mut Vec<T>, len: usize) {
    while v.len() < len {
        v.push(T::default());
    }
}
