//! Various simpleca-wide constants.

//------------ Binary Names -------------------------------------------------

/// The friendly name of the `simpleca` binary.
pub const SIMPLECA_APP: &str = "simpleca";

/// The version reported by the `version` action.
pub const SIMPLECA_VERSION: &str = env!("CARGO_PKG_VERSION");


//------------ Repository Files ---------------------------------------------

/// The name of the persisted state file inside a repository.
pub const STATE_FILE: &str = "state.json";

/// The name of the configuration file inside a repository.
pub const CONFIG_FILE: &str = "configuration.json";


//------------ Environment Variables ----------------------------------------

/// The environment variable with the log level.
///
/// The variable should contain the name of a [`log::LevelFilter`]. The
/// default is "warn".
pub const SIMPLECA_ENV_LOG_LEVEL: &str = "SIMPLECA_LOG_LEVEL";


//------------ File Modes ---------------------------------------------------

/// Mode for the per-class key directories and for private key material.
pub const MODE_OWNER_DIR: u32 = 0o700;

/// Mode for private keys and certificates.
pub const MODE_OWNER_FILE: u32 = 0o600;

/// Mode for public keys.
pub const MODE_WORLD_READABLE_FILE: u32 = 0o644;
