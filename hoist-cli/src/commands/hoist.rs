use std::io::Read;
use std::process::ExitCode;

use clipanion::cli;
use hoist_core::{hoist, HoistOptions, Package};

use crate::error::Error;

/// Reads a resolved package tree and writes its hoisted form to stdout.
#[cli::command]
#[cli::path("hoist")]
pub struct Hoist {
    /// Read the package tree from this file instead of stdin.
    #[cli::option("--input")]
    input: Option<String>,

    #[cli::option("--dump,-v", default = false)]
    dump: bool,

    #[cli::option("--check", default = false)]
    check: bool,
}

impl Hoist {
    pub fn execute(&self) -> Result<ExitCode, Error> {
        let input = match &self.input {
            Some(path) => std::fs::read_to_string(path)?,
            None => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        let tree = Package::from_json_str(&input)?;
        let report = hoist(&tree, HoistOptions { dump: self.dump, check: self.check })?;

        println!("{}", report.tree.to_json_string_pretty()?);

        if let Some(trace) = &report.trace {
            eprintln!("{trace}");
        }

        if !report.violations.is_empty() {
            for violation in &report.violations {
                eprintln!("{violation}");
            }
            return Ok(ExitCode::FAILURE);
        }

        Ok(ExitCode::SUCCESS)
    }
}
