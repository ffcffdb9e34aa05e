//! Configuration handling and logging setup.

use std::io;
use std::path::Path;
use std::str::FromStr;
use std::env;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::commons::error::Error;
use crate::commons::file;
use crate::constants::SIMPLECA_ENV_LOG_LEVEL;

//------------ Config --------------------------------------------------------

/// The persisted configuration of a repository.
///
/// Written by `init` with the defaults below; the operator is expected to
/// edit the file before issuing certificates.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Config {
    /// Validity window of issued certificates, in months.
    #[serde(rename = "CertificateDuration")]
    pub certificate_duration: u32,

    #[serde(rename = "Organization")]
    pub organization: String,

    #[serde(rename = "Country")]
    pub country: String,

    #[serde(rename = "Locality")]
    pub locality: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            certificate_duration: 36,
            organization: "SimpleCA".to_string(),
            country: "France".to_string(),
            locality: "Paris".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, Error> {
        let bytes = file::read(path)?;
        serde_json::from_slice(&bytes).map_err(Error::config_corrupt)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        file::save_json(self, path)?;
        Ok(())
    }
}

//------------ Logging -------------------------------------------------------

/// Initializes a stderr logger.
///
/// The level comes from the `SIMPLECA_LOG_LEVEL` environment variable and
/// defaults to warn, which keeps normal operation quiet.
pub fn init_logging() -> Result<(), Error> {
    let log_level = match env::var(SIMPLECA_ENV_LOG_LEVEL) {
        Ok(level) => LevelFilter::from_str(&level)
            .map_err(|_| Error::ConfigCorrupt(format!(
                "unrecognized log level '{}' in {}", level, SIMPLECA_ENV_LOG_LEVEL
            )))?,
        Err(_) => LevelFilter::Warn,
    };

    fern_logger(log_level)
        .chain(io::stderr())
        .apply()
        .map_err(|e| {
            Error::Io(crate::commons::error::CaIoError::new(
                "failed to init stderr logging",
                io::Error::new(io::ErrorKind::Other, e.to_string()),
            ))
        })
}

/// Creates and returns a fern logger.
fn fern_logger(log_level: LevelFilter) -> fern::Dispatch {
    let show_target = log_level == LevelFilter::Trace || log_level == LevelFilter::Debug;
    fern::Dispatch::new()
        .format(move |out, message, record| {
            if show_target {
                out.finish(format_args!(
                    "{} [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.level(),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "{} [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.level(),
                    message
                ))
            }
        })
        .level(log_level)
}

//------------ Tests ---------------------------------------------------------
