//! Maps (class, name) to the canonical locations of an element's files.
//!
//! Pure functions, no I/O. All paths are relative to the repository root;
//! callers join them onto whatever directory they operate in.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::state::Class;

/// The canonical relative location of an element's files, no extension.
pub fn base_path(class: Class, name: &str) -> PathBuf {
    let mut path = PathBuf::from(class.dir());
    path.push(name);
    path
}

/// The encrypted private key, PEM.
pub fn priv_key_path(base_path: &Path) -> PathBuf {
    with_suffix(base_path, ".key")
}

/// The public key, PEM.
pub fn pub_key_path(base_path: &Path) -> PathBuf {
    with_suffix(base_path, ".pub")
}

/// The certificate, PEM.
pub fn cert_path(base_path: &Path) -> PathBuf {
    with_suffix(base_path, ".crt")
}

/// The concatenated PEM chain. Only ever written for clients.
pub fn full_chain_path(base_path: &Path) -> PathBuf {
    with_suffix(base_path, ".fullchain.crt")
}

// Appends rather than replaces, so names containing dots survive.
fn with_suffix(base_path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(base_path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_paths_use_fixed_class_directories() {
        assert_eq!(base_path(Class::Root, "root"), PathBuf::from("root/root"));
        assert_eq!(base_path(Class::Intermediate, "ica1"), PathBuf::from("intermediates/ica1"));
        assert_eq!(base_path(Class::Client, "alice"), PathBuf::from("clients/alice"));
    }

    #[test]
    fn file_paths_append_extensions() {
        let base = base_path(Class::Client, "alice");

        assert_eq!(priv_key_path(&base), PathBuf::from("clients/alice.key"));
        assert_eq!(pub_key_path(&base), PathBuf::from("clients/alice.pub"));
        assert_eq!(cert_path(&base), PathBuf::from("clients/alice.crt"));
        assert_eq!(full_chain_path(&base), PathBuf::from("clients/alice.fullchain.crt"));
    }

    #[test]
    fn dotted_names_keep_their_dots() {
        let base = base_path(Class::Client, "alice.example.org");
        assert_eq!(cert_path(&base), PathBuf::from("clients/alice.example.org.crt"));
    }
}
