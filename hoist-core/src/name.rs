use crate::model::{PackageId, PackageName};

/// Derives the name shared by every instance of a package from its id.
///
/// Follows the `name@reference` convention used throughout the package
/// manager ecosystem this crate targets. The last `@` in the id splits name
/// from reference, except
/// when it is the id's own first character (a scoped name with no version,
/// e.g. `@scope/name`) — there the whole id is the name, same as an id with
/// no `@` at all (e.g. the root id `.`, or an unversioned bare name).
pub(crate) fn name_of(id: &PackageId) -> PackageName {
    match id.rfind('@') {
        Some(0) | None => id.clone(),
        Some(idx) => id[..idx].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_from_reference() {
        assert_eq!(name_of(&"B@X".to_string()), "B");
        assert_eq!(name_of(&"lodash@npm:4.17.21".to_string()), "lodash");
    }

    #[test]
    fn bare_ids_are_their_own_name() {
        assert_eq!(name_of(&".".to_string()), ".");
        assert_eq!(name_of(&"A".to_string()), "A");
    }

    #[test]
    fn scoped_name_with_no_reference_is_its_own_name() {
        assert_eq!(name_of(&"@scope/name".to_string()), "@scope/name");
    }

    #[test]
    fn scoped_name_with_reference_splits_on_last_at() {
        assert_eq!(name_of(&"@scope/name@npm:1.0.0".to_string()), "@scope/name");
    }
}
