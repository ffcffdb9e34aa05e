//! Initializing a folder as a simpleca repository.

use std::path::Path;

use log::debug;

use crate::commons::file;
use crate::commons::CaEmptyResult;
use crate::config::Config;
use crate::constants::{CONFIG_FILE, MODE_OWNER_DIR, STATE_FILE};
use crate::state::Class;

/// Initializes `dir` as a simpleca repository.
///
/// Creates the three class directories, an empty state file and a default
/// configuration where missing. Existing content is never overwritten, so
/// re-running is safe.
pub fn init_repository(dir: &Path) -> CaEmptyResult {
    for class in Class::all() {
        file::create_dir_with_mode(&dir.join(class.dir()), MODE_OWNER_DIR)?;
    }

    let state_path = dir.join(STATE_FILE);
    if !state_path.exists() {
        file::save(b"{}\n", &state_path)?;
        debug!("Created empty state file {}", state_path.display());
    }

    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        Config::default().save(&config_path)?;
        debug!("Created default configuration {}", config_path.display());
    }

    Ok(())
}

/// Some cheap checks to know whether `dir` is a simpleca repository.
pub fn is_repo(dir: &Path) -> bool {
    if !dir.join(STATE_FILE).exists() || !dir.join(CONFIG_FILE).exists() {
        return false;
    }
    Class::all().iter().all(|class| dir.join(class.dir()).exists())
}

//------------ Tests ---------------------------------------------------------
