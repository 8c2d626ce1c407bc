use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A globally unique package instance id (`name@reference`, or a bare name
/// for the root and for references with no version component).
pub type PackageId = String;

/// The portion of an id that two differently-versioned instances share.
pub type PackageName = String;

pub(crate) type NodeIdx = usize;

/// Marks a node whose children must never move away from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageType {
    #[serde(rename = "PORTAL")]
    Portal,
}

/// The external, nested shape of a resolved dependency graph.
///
/// Two [`Package`] values with the same `id` anywhere in a tree are treated
/// as the same instance: the importer collapses them back into a single
/// working-graph node, which is how shared and cyclic graphs travel over a
/// format (JSON) that has no native notion of object identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Package>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<Package>,
    #[serde(default, rename = "peerNames", skip_serializing_if = "IndexSet::is_empty")]
    pub peer_names: IndexSet<PackageName>,
    #[serde(default, rename = "packageType", skip_serializing_if = "Option::is_none")]
    pub package_type: Option<PackageType>,
}

impl Package {
    pub fn new(id: impl Into<PackageId>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            workspaces: Vec::new(),
            peer_names: IndexSet::new(),
            package_type: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Package>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_workspaces(mut self, workspaces: Vec<Package>) -> Self {
        self.workspaces = workspaces;
        self
    }

    pub fn with_peer_names<I: IntoIterator<Item = PackageName>>(mut self, peer_names: I) -> Self {
        self.peer_names = peer_names.into_iter().collect();
        self
    }

    pub fn with_package_type(mut self, package_type: PackageType) -> Self {
        self.package_type = Some(package_type);
        self
    }

    /// Parses a tree from its external JSON shape.
    pub fn from_json_str(input: &str) -> serde_json::Result<Package> {
        serde_json::from_str(input)
    }

    pub fn to_json_string_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One vertex of the working graph built by [`crate::import::import`].
///
/// `dependencies` and `workspaces` are disjoint by construction (checked at
/// import time): a name never appears in both.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub id: PackageId,
    pub dependencies: IndexMap<PackageName, NodeIdx>,
    pub workspaces: IndexMap<PackageName, NodeIdx>,
    pub peer_names: IndexSet<PackageName>,
    pub package_type: Option<PackageType>,
    /// Redirections left behind by a hoist: for a name this node used to own
    /// directly, which ancestor now owns the canonical copy.
    pub hoisted_to: IndexMap<PackageName, NodeIdx>,
    /// `dependencies` as imported, frozen for the invariants checker — the
    /// hoister itself never reads this.
    pub original_dependencies: IndexMap<PackageName, NodeIdx>,
    /// For each of this node's own peer names, what it resolved to via its
    /// first original parent — frozen at import time, independent of
    /// whichever parent ends up holding this node after hoisting.
    pub original_peer_targets: IndexMap<PackageName, NodeIdx>,
    /// Whether this exact node instance is owned by exactly one parent slot
    /// and is therefore safe to mutate in place.
    pub decoupled: bool,
}

/// The arena-of-nodes working graph plus its distinguished root.
#[derive(Debug, Clone)]
pub(crate) struct Graph {
    pub nodes: Vec<Node>,
    pub root: NodeIdx,
}
