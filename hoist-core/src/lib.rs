#![deny(unused_crate_dependencies)]

//! Hoists a resolved package dependency graph into a flatter,
//! nested-directory-friendly graph without breaking any package's ability
//! to resolve its own direct or peer dependencies.
//!
//! The transform runs in three stages: [`import`] builds an in-memory
//! working graph from the external nested tree, [`priority::analyze`] ranks
//! every candidate id once up front, and [`driver::run`] then walks the
//! graph deciding, name by name, how far toward the root each dependency
//! can move. [`export`] turns the result back into the external shape.

mod check;
mod driver;
mod error;
mod export;
mod import;
mod model;
mod name;
mod priority;
mod trace;
mod verdict;

pub use error::{HoistError, Result};
pub use model::{Package, PackageId, PackageName, PackageType};
pub use trace::Trace;

/// Knobs for a single hoist run.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoistOptions {
    /// Collect a human-readable trace of every verdict reached.
    pub dump: bool,
    /// Run the invariants checker over the result before returning it.
    pub check: bool,
}

/// Everything a hoist run produces: the transformed tree plus whatever
/// diagnostics were asked for.
#[derive(Debug)]
pub struct HoistReport {
    pub tree: Package,
    pub trace: Option<String>,
    pub violations: Vec<String>,
}

/// Runs the full pipeline described in the module docs over `tree`.
pub fn hoist(tree: &Package, options: HoistOptions) -> Result<HoistReport> {
    let mut graph = import::import(tree)?;
    let priorities = priority::analyze(&graph);
    let mut trace = Trace::new(options.dump);

    driver::run(&mut graph, &priorities, &mut trace)?;

    let violations = if options.check { check::verify_invariants(&graph) } else { Vec::new() };

    Ok(HoistReport {
        tree: export::export(&graph),
        trace: trace.into_report(),
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(id: &str) -> Package {
        Package::new(id)
    }

    /// scenario 1: a single chain hoists all the way to the root.
    #[test]
    fn very_basic_hoisting() {
        let tree = pkg(".").with_dependencies(vec![pkg("A@1").with_dependencies(vec![pkg("B@1")])]);
        let report = hoist(&tree, HoistOptions::default()).unwrap();

        let ids: Vec<&str> = report.tree.dependencies.iter().map(|p| p.id.as_str()).collect();
        assert!(ids.contains(&"A@1"));
        assert!(ids.contains(&"B@1"));
        let a = report.tree.dependencies.iter().find(|p| p.id == "A@1").unwrap();
        assert!(a.dependencies.is_empty());
    }

    /// scenario: a name collision at the root keeps the shadowed
    /// dependency right where it was declared.
    #[test]
    fn colliding_name_stays_put() {
        let tree = pkg(".").with_dependencies(vec![pkg("B@2"), pkg("A@1").with_dependencies(vec![pkg("B@1")])]);
        let report = hoist(&tree, HoistOptions::default()).unwrap();

        let root_b = report.tree.dependencies.iter().find(|p| p.id == "B@2").unwrap();
        assert!(root_b.dependencies.is_empty());
        let a = report.tree.dependencies.iter().find(|p| p.id == "A@1").unwrap();
        let a_b = a.dependencies.iter().find(|p| p.id == "B@1").unwrap();
        assert_eq!(a_b.id, "B@1");
    }

    #[test]
    fn check_reports_no_violations_on_a_well_formed_hoist() {
        let tree = pkg(".").with_dependencies(vec![pkg("A@1").with_dependencies(vec![pkg("B@1")]), pkg("C@1").with_dependencies(vec![pkg("B@1")])]);
        let report = hoist(&tree, HoistOptions { dump: false, check: true }).unwrap();
        assert!(report.violations.is_empty(), "{:?}", report.violations);
    }

    #[test]
    fn dump_produces_a_trace_when_requested() {
        let tree = pkg(".").with_dependencies(vec![pkg("A@1").with_dependencies(vec![pkg("B@1")])]);
        let report = hoist(&tree, HoistOptions { dump: true, check: false }).unwrap();
        assert!(report.trace.is_some());
        assert!(report.trace.unwrap().contains("B@1"));
    }
}
