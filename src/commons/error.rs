//! Defines all simpleca errors.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::{fmt, io};

use crate::state::{Class, KeyType};

//------------ Error ---------------------------------------------------------

#[derive(Debug)]
pub enum Error {
    /// The requested entity class is not one of root, intermediate, client.
    InvalidClass(String),

    /// The requested key type is not one of rsa, ecdsa.
    InvalidKeyType(String),

    /// The key size does not select a supported bit length or curve.
    UnsupportedKeySize(KeyType, u32),

    /// The target of a signing operation is not in the repository state.
    UnknownKey(Class, String),

    /// The requested signer is neither an intermediate nor the root.
    UnknownSigner(String),

    /// The requested signer exists but has never been signed itself.
    SignerNotYetCertified(String),

    /// A private key file is recorded in state but missing on disk.
    KeyNotFound(PathBuf),

    /// A certificate file is recorded in state but missing on disk.
    CertificateNotFound(PathBuf),

    /// A private key could not be decrypted with the given passphrase.
    DecryptionFailed(PathBuf),

    /// Root keys are never deleted programmatically.
    RootDeletionForbidden,

    /// The persisted state file contains malformed JSON.
    StateCorrupt(String),

    /// The configuration file contains malformed JSON.
    ConfigCorrupt(String),

    /// The current folder has not been initialized with `simpleca init`.
    NotARepository,

    /// The operator declined an interactive confirmation.
    Aborted,

    /// A PEM block could not be parsed.
    ParseError(String),

    /// An error reported by the openssl library.
    OpenSsl(openssl::error::ErrorStack),

    /// An I/O error, wrapped with context about what was attempted.
    Io(CaIoError),
}

impl Error {
    pub fn parse(e: impl Display) -> Self {
        Error::ParseError(e.to_string())
    }

    pub fn state_corrupt(e: impl Display) -> Self {
        Error::StateCorrupt(e.to_string())
    }

    pub fn config_corrupt(e: impl Display) -> Self {
        Error::ConfigCorrupt(e.to_string())
    }

    pub fn key_not_found(path: &Path) -> Self {
        Error::KeyNotFound(path.to_path_buf())
    }

    pub fn cert_not_found(path: &Path) -> Self {
        Error::CertificateNotFound(path.to_path_buf())
    }

    pub fn decryption_failed(path: &Path) -> Self {
        Error::DecryptionFailed(path.to_path_buf())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidClass(s) => {
                write!(f, "invalid class '{}', expected one of: root, intermediate, client", s)
            }
            Error::InvalidKeyType(s) => {
                write!(f, "invalid key type '{}', expected rsa or ecdsa", s)
            }
            Error::UnsupportedKeySize(key_type, size) => {
                write!(f, "unsupported key size {} for {} keys", size, key_type)
            }
            Error::UnknownKey(class, name) => {
                write!(f, "unknown key: no {} key named '{}' in the repository state", class, name)
            }
            Error::UnknownSigner(name) => {
                write!(f, "unknown signer '{}': not an intermediate or root key", name)
            }
            Error::SignerNotYetCertified(name) => {
                write!(f, "the signer '{}' has no certificate yet, sign it first", name)
            }
            Error::KeyNotFound(path) => {
                write!(f, "the private key {} does not exist", path.display())
            }
            Error::CertificateNotFound(path) => {
                write!(f, "the certificate {} does not exist", path.display())
            }
            Error::DecryptionFailed(path) => {
                write!(f, "could not decrypt {}: wrong passphrase?", path.display())
            }
            Error::RootDeletionForbidden => {
                write!(
                    f,
                    "can't delete a root key, this is too dangerous: all intermediate and client \
                     keys would become orphans (no way to revoke them or sign new intermediate \
                     certificates).\nIf you want to get rid of this CA, remove the whole folder \
                     (or better: create a new one next to this one in case you need the old CA \
                     someday)."
                )
            }
            Error::StateCorrupt(e) => write!(f, "corrupt state file: {}", e),
            Error::ConfigCorrupt(e) => write!(f, "corrupt configuration file: {}", e),
            Error::NotARepository => {
                write!(
                    f,
                    "the current folder does not appear to be a valid simpleca repository.\n\
                     Please run \"simpleca init\" before running any other command."
                )
            }
            Error::Aborted => write!(f, "aborting"),
            Error::ParseError(e) => write!(f, "could not parse certificate: {}", e),
            Error::OpenSsl(e) => e.fmt(f),
            Error::Io(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<openssl::error::ErrorStack> for Error {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Error::OpenSsl(e)
    }
}

impl From<CaIoError> for Error {
    fn from(e: CaIoError) -> Self {
        Error::Io(e)
    }
}

//------------ CaIoError -----------------------------------------------------

/// An io::Error wrapped with context about what was being attempted.
#[derive(Debug)]
pub struct CaIoError {
    context: String,
    cause: io::Error,
}

impl CaIoError {
    pub fn new(context: impl Into<String>, cause: io::Error) -> Self {
        CaIoError {
            context: context.into(),
            cause,
        }
    }
}

impl fmt::Display for CaIoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.cause)
    }
}

impl std::error::Error for CaIoError {}
