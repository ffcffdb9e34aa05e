//! Generating key pairs and registering them in state.

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;

use crate::commons::file;
use crate::commons::CaResult;
use crate::constants::MODE_OWNER_DIR;
use crate::crypto::keys::{self, KeyPair};
use crate::paths;
use crate::state::{Class, Element, KeyType, State};

//------------ GeneratedKey --------------------------------------------------

/// What the generation engine produced, for reporting.
#[derive(Clone, Debug)]
pub struct GeneratedKey {
    pub class: Class,
    pub name: String,

    /// Repository-relative location of the private key.
    pub priv_key_path: PathBuf,

    /// Repository-relative location of the public key.
    pub pub_key_path: PathBuf,

    pub encrypted: bool,
}

//------------ generate ------------------------------------------------------

/// Resolves the name a generated key will be stored under.
///
/// Root keys always use the fixed name "root"; for the other classes an
/// absent or empty name falls back to the class default.
pub fn resolve_name(class: Class, name: Option<&str>) -> String {
    match class {
        Class::Root => "root".to_string(),
        _ => name
            .filter(|name| !name.is_empty())
            .unwrap_or(class.default_name())
            .to_string(),
    }
}

/// Generates a key pair, writes both halves and records the new element.
///
/// An absent size falls back to the per-type default (2048 for rsa, 256
/// for ecdsa). A `None` passphrase stores the private key in the clear.
pub fn generate(
    dir: &Path,
    state: &mut State,
    class: Class,
    name: Option<&str>,
    key_type: KeyType,
    size: Option<u32>,
    passphrase: Option<&str>,
) -> CaResult<GeneratedKey> {
    let name = resolve_name(class, name);
    let size = size.unwrap_or(match key_type {
        KeyType::Rsa => 2048,
        KeyType::Ecdsa => 256,
    });

    let key_pair = KeyPair::generate(key_type, size)?;

    file::create_dir_with_mode(&dir.join(class.dir()), MODE_OWNER_DIR)?;

    let base = paths::base_path(class, &name);
    let priv_key_path = paths::priv_key_path(&base);
    let pub_key_path = paths::pub_key_path(&base);

    keys::store_private_key(&key_pair, passphrase, &dir.join(&priv_key_path))?;
    keys::store_public_key(&key_pair, &dir.join(&pub_key_path))?;

    let now = Utc::now();
    state.set(
        class,
        &name,
        Element {
            path: base.to_string_lossy().into_owned(),
            key_type,
            size,
            created_on: now,
            valid_until: now,
            serial_number: String::new(),
        },
    );

    info!("Generated {} {} key pair '{}' in {}", key_type, size, name, priv_key_path.display());

    Ok(GeneratedKey {
        class,
        name,
        priv_key_path,
        pub_key_path,
        encrypted: passphrase.is_some(),
    })
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::error::Error;
    use crate::test;

    #[test]
    fn state_entry_matches_the_path_resolver() {
        test::test_under_tmp(|dir| {
            let mut state = State::default();

            let generated = generate(
                &dir,
                &mut state,
                Class::Client,
                Some("alice"),
                KeyType::Ecdsa,
                None,
                None,
            )
            .unwrap();

            let element = state.get(Class::Client, "alice").unwrap();
            assert_eq!(
                element.path,
                paths::base_path(Class::Client, "alice").to_string_lossy()
            );
            assert_eq!(element.key_type, KeyType::Ecdsa);
            assert_eq!(element.size, 256);
            assert_eq!(element.serial_number, "");
            assert_eq!(element.created_on, element.valid_until);

            assert!(dir.join(&generated.priv_key_path).exists());
            assert!(dir.join(&generated.pub_key_path).exists());
        });
    }

    #[test]
    fn root_keys_always_use_the_fixed_name() {
        test::test_under_tmp(|dir| {
            let mut state = State::default();

            let generated = generate(
                &dir,
                &mut state,
                Class::Root,
                Some("something-else"),
                KeyType::Ecdsa,
                None,
                None,
            )
            .unwrap();

            assert_eq!(generated.name, "root");
            assert!(state.get(Class::Root, "root").is_some());
        });
    }

    #[test]
    fn empty_names_fall_back_to_the_class_default() {
        test::test_under_tmp(|dir| {
            let mut state = State::default();

            generate(&dir, &mut state, Class::Intermediate, Some(""), KeyType::Ecdsa, None, None)
                .unwrap();

            assert!(state.get(Class::Intermediate, "intermediate").is_some());
        });
    }

    #[test]
    fn rsa_size_defaults_to_2048() {
        test::test_under_tmp(|dir| {
            let mut state = State::default();

            generate(&dir, &mut state, Class::Client, None, KeyType::Rsa, None, None).unwrap();

            assert_eq!(state.get(Class::Client, "client").unwrap().size, 2048);
        });
    }

    #[test]
    fn unsupported_sizes_leave_no_trace() {
        test::test_under_tmp(|dir| {
            let mut state = State::default();

            let result = generate(
                &dir,
                &mut state,
                Class::Client,
                Some("alice"),
                KeyType::Ecdsa,
                Some(123),
                None,
            );

            assert!(matches!(result, Err(Error::UnsupportedKeySize(_, 123))));
            assert!(state.get(Class::Client, "alice").is_none());
            assert!(!dir.join("clients/alice.key").exists());
        });
    }

    #[cfg(unix)]
    #[test]
    fn key_files_get_their_documented_modes() {
        use std::os::unix::fs::PermissionsExt;

        test::test_under_tmp(|dir| {
            let mut state = State::default();

            let generated =
                generate(&dir, &mut state, Class::Client, None, KeyType::Ecdsa, None, None)
                    .unwrap();

            let priv_mode = std::fs::metadata(dir.join(&generated.priv_key_path))
                .unwrap()
                .permissions()
                .mode();
            let pub_mode = std::fs::metadata(dir.join(&generated.pub_key_path))
                .unwrap()
                .permissions()
                .mode();

            assert_eq!(priv_mode & 0o777, 0o600);
            assert_eq!(pub_mode & 0o777, 0o644);
        });
    }
}
