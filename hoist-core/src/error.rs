use thiserror::Error;

use crate::model::{PackageId, PackageName};

/// The only error kinds the core transform may surface.
///
/// Anything else — a dependency that simply cannot be hoisted for semantic
/// reasons — is not an error: it is left in place and the transformation
/// keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HoistError {
    #[error("duplicate dependency name ({name}) under parent ({parent}): both ({first}) and ({second}) claim the same slot")]
    DuplicateName {
        parent: PackageId,
        name: PackageName,
        first: PackageId,
        second: PackageId,
    },

    #[error("could not reconstruct the path to a deferred dependency named ({name}) under parent ({parent}): no ancestor holds the expected id")]
    Unreachable {
        parent: PackageId,
        name: PackageName,
    },
}

pub type Result<T> = std::result::Result<T, HoistError>;
