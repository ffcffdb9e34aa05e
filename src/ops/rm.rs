//! Deleting non-root entities and everything they left on disk.

use std::path::Path;

use log::info;

use crate::commons::error::Error;
use crate::commons::CaEmptyResult;
use crate::commons::file;
use crate::paths;
use crate::state::{Class, State};

/// Removes an element's files and its state entry.
///
/// Root keys are refused outright: deleting a root orphans its entire
/// descendant chain with no revocation mechanism to fall back on.
/// Missing files are not an error, so a second removal of the same name
/// succeeds and changes nothing.
pub fn remove(dir: &Path, state: &mut State, class: Class, name: Option<&str>) -> CaEmptyResult {
    if class == Class::Root {
        return Err(Error::RootDeletionForbidden);
    }

    let name = name
        .filter(|name| !name.is_empty())
        .unwrap_or(class.default_name())
        .to_string();

    let base = paths::base_path(class, &name);
    for path in [
        paths::priv_key_path(&base),
        paths::pub_key_path(&base),
        paths::cert_path(&base),
        paths::full_chain_path(&base),
    ] {
        file::delete_file_if_exists(&dir.join(path))?;
    }

    state.delete(class, &name);

    info!("Removed {} '{}'", class, name);
    Ok(())
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::generate::generate;
    use crate::ops::sign::sign;
    use crate::state::KeyType;
    use crate::test;

    #[test]
    fn removal_is_idempotent_and_leaves_no_files() {
        test::test_under_tmp(|dir| {
            let mut state = State::default();
            let config = test::config();

            generate(&dir, &mut state, Class::Intermediate, Some("ica1"), KeyType::Ecdsa, None, None)
                .unwrap();
            sign(&dir, &mut state, &config, Class::Intermediate, Some("ica1"), None, &[]).unwrap();

            generate(&dir, &mut state, Class::Client, Some("x"), KeyType::Ecdsa, None, None)
                .unwrap();
            sign(&dir, &mut state, &config, Class::Client, Some("x"), Some("ica1"), &[]).unwrap();

            remove(&dir, &mut state, Class::Client, Some("x")).unwrap();

            assert!(state.get(Class::Client, "x").is_none());
            for suffix in [".key", ".pub", ".crt", ".fullchain.crt"] {
                assert!(!dir.join(format!("clients/x{}", suffix)).exists());
            }

            // the second removal never fails
            remove(&dir, &mut state, Class::Client, Some("x")).unwrap();
        });
    }

    #[test]
    fn root_deletion_is_always_forbidden() {
        test::test_under_tmp(|dir| {
            let mut state = State::default();

            // no root exists at all, the refusal still comes first
            match remove(&dir, &mut state, Class::Root, None) {
                Err(Error::RootDeletionForbidden) => {}
                other => panic!("expected RootDeletionForbidden, got {:?}", other),
            }

            generate(&dir, &mut state, Class::Root, None, KeyType::Ecdsa, None, None).unwrap();
            match remove(&dir, &mut state, Class::Root, None) {
                Err(Error::RootDeletionForbidden) => {}
                other => panic!("expected RootDeletionForbidden, got {:?}", other),
            }
            assert!(state.get(Class::Root, "root").is_some());
        });
    }

    #[test]
    fn default_names_resolve_per_class() {
        test::test_under_tmp(|dir| {
            let mut state = State::default();

            generate(&dir, &mut state, Class::Client, None, KeyType::Ecdsa, None, None).unwrap();
            assert!(state.get(Class::Client, "client").is_some());

            remove(&dir, &mut state, Class::Client, None).unwrap();
            assert!(state.get(Class::Client, "client").is_none());
        });
    }
}
