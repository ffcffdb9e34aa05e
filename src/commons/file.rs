//! Helpers for reading and writing the files a repository is made of.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::trace;
use serde::Serialize;

use crate::commons::error::CaIoError;

/// Derive the path for a file directly under `base_path`.
pub fn file_path(base_path: &Path, file_name: &str) -> PathBuf {
    let mut path = base_path.to_path_buf();
    path.push(file_name);
    path
}

/// Creates a directory if needed and fixes its mode.
///
/// The mode is (re)applied even when the directory already exists, so
/// repositories created by older runs end up with the expected mode.
pub fn create_dir_with_mode(dir: &Path, mode: u32) -> Result<(), CaIoError> {
    if !dir.is_dir() {
        fs::create_dir_all(dir)
            .map_err(|e| CaIoError::new(format!("could not create dir: {}", dir.display()), e))?;
    }
    set_mode(dir, mode)
}

/// Saves a file, creating parent dirs as needed.
pub fn save(content: &[u8], full_path: &Path) -> Result<(), CaIoError> {
    let mut f = create_file_with_path(full_path)?;
    f.write_all(content)
        .map_err(|e| CaIoError::new(format!("could not write to: {}", full_path.display()), e))?;

    trace!("Saved file: {}", full_path.display());
    Ok(())
}

/// Saves a file with the given mode, creating parent dirs as needed.
///
/// The file is created or truncated, so key material never lingers past
/// its replacement.
pub fn save_with_mode(content: &[u8], full_path: &Path, mode: u32) -> Result<(), CaIoError> {
    if let Some(parent) = full_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|e| {
                CaIoError::new(format!("could not create dir path for: {}", parent.display()), e)
            })?;
        }
    }

    let mut open = OpenOptions::new();
    open.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(mode);
    }

    let mut f = open
        .open(full_path)
        .map_err(|e| CaIoError::new(format!("could not create file: {}", full_path.display()), e))?;
    f.write_all(content)
        .map_err(|e| CaIoError::new(format!("could not write to: {}", full_path.display()), e))?;

    set_mode(full_path, mode)?;

    trace!("Saved file: {} (mode {:o})", full_path.display(), mode);
    Ok(())
}

/// Saves an object to json - unwraps any json errors!
pub fn save_json<O: Serialize>(object: &O, full_path: &Path) -> Result<(), CaIoError> {
    let json = serde_json::to_string_pretty(object).unwrap();
    save(json.as_bytes(), full_path)
}

/// Reads a file to Bytes.
pub fn read(path: &Path) -> Result<Bytes, CaIoError> {
    let mut f = File::open(path)
        .map_err(|e| CaIoError::new(format!("could not open: {}", path.display()), e))?;
    let mut bytes = Vec::new();
    f.read_to_end(&mut bytes)
        .map_err(|e| CaIoError::new(format!("could not read: {}", path.display()), e))?;
    Ok(Bytes::from(bytes))
}

/// Deletes a file if it is present. Missing files are not an error.
pub fn delete_file_if_exists(full_path: &Path) -> Result<(), CaIoError> {
    if full_path.exists() {
        trace!("Removing file: {}", full_path.display());
        fs::remove_file(full_path)
            .map_err(|e| CaIoError::new(format!("could not remove file: {}", full_path.display()), e))?;
    }
    Ok(())
}

fn create_file_with_path(path: &Path) -> Result<File, CaIoError> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                trace!("Creating path: {}", parent.display());
                fs::create_dir_all(parent).map_err(|e| {
                    CaIoError::new(format!("could not create dir path for: {}", parent.display()), e)
                })?;
            }
        }
    }
    File::create(path)
        .map_err(|e| CaIoError::new(format!("could not create file: {}", path.display()), e))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), CaIoError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| CaIoError::new(format!("could not chmod: {}", path.display()), e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), CaIoError> {
    Ok(())
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test;

    #[test]
    fn save_read_delete_round_trip() {
        test::test_under_tmp(|dir| {
            let path = file_path(&dir, "sub/file.txt");

            save(b"content", &path).unwrap();
            assert_eq!(read(&path).unwrap().as_ref(), b"content");

            delete_file_if_exists(&path).unwrap();
            assert!(!path.exists());

            // missing files are fine
            delete_file_if_exists(&path).unwrap();
        });
    }

    #[cfg(unix)]
    #[test]
    fn save_with_mode_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        test::test_under_tmp(|dir| {
            let path = file_path(&dir, "secret.key");
            save_with_mode(b"key material", &path, 0o600).unwrap();

            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        });
    }
}
