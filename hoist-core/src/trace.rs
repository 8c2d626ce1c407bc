use crate::model::{Graph, NodeIdx, PackageName};

/// An optional, human-readable log of every verdict the driver reaches.
/// The core transform never prints anything itself — it hands this back as
/// data, the same way the rest of this crate treats diagnostics as a return
/// value rather than a side effect.
#[derive(Debug, Default)]
pub struct Trace {
    enabled: bool,
    lines: Vec<String>,
}

impl Trace {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled, lines: Vec::new() }
    }

    pub(crate) fn hoist(&mut self, graph: &Graph, path: &[NodeIdx], name: &PackageName, new_parent_index: usize) {
        if !self.enabled {
            return;
        }
        let parent = &graph.nodes[*path.last().unwrap()];
        let ancestor = &graph.nodes[path[new_parent_index]];
        self.lines.push(format!("YES  {name} : {} -> {}", parent.id, ancestor.id));
    }

    pub(crate) fn refuse(&mut self, graph: &Graph, path: &[NodeIdx], name: &PackageName) {
        if !self.enabled {
            return;
        }
        let parent = &graph.nodes[*path.last().unwrap()];
        self.lines.push(format!("NO   {name} : stays at {}", parent.id));
    }

    pub(crate) fn defer(&mut self, graph: &Graph, path: &[NodeIdx], name: &PackageName, priority_depth: usize) {
        if !self.enabled {
            return;
        }
        let parent = &graph.nodes[*path.last().unwrap()];
        self.lines.push(format!("LATER {name} : deferred from {} to priority depth {priority_depth}", parent.id));
    }

    /// Renders the collected lines, or `None` if tracing was never enabled.
    pub fn into_report(self) -> Option<String> {
        if self.enabled {
            Some(self.lines.join("\n"))
        } else {
            None
        }
    }
}
