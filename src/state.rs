//! The persisted registry of all known keys and certificates.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commons::error::Error;
use crate::commons::file;

//------------ Class ---------------------------------------------------------

/// The class of a tracked entity.
///
/// Classes form the trust chain: the root signs intermediates,
/// intermediates sign clients. Each class has its own storage directory
/// and its own mapping in [`State`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Class {
    Root,
    Intermediate,
    Client,
}

impl Class {
    /// The directory under the repository root holding this class's files.
    pub fn dir(self) -> &'static str {
        match self {
            Class::Root => "root",
            Class::Intermediate => "intermediates",
            Class::Client => "clients",
        }
    }

    /// The name used when the caller does not provide one.
    pub fn default_name(self) -> &'static str {
        match self {
            Class::Root => "root",
            Class::Intermediate => "intermediate",
            Class::Client => "client",
        }
    }

    pub fn all() -> [Class; 3] {
        [Class::Root, Class::Intermediate, Class::Client]
    }
}

impl FromStr for Class {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "root" => Ok(Class::Root),
            "intermediate" => Ok(Class::Intermediate),
            "client" => Ok(Class::Client),
            _ => Err(Error::InvalidClass(s.to_string())),
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Class::Root => write!(f, "root"),
            Class::Intermediate => write!(f, "intermediate"),
            Class::Client => write!(f, "client"),
        }
    }
}

//------------ KeyType -------------------------------------------------------

/// The asymmetric key algorithm of a tracked key pair.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Rsa,
    Ecdsa,
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "rsa" => Ok(KeyType::Rsa),
            "ecdsa" => Ok(KeyType::Ecdsa),
            _ => Err(Error::InvalidKeyType(s.to_string())),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyType::Rsa => write!(f, "rsa"),
            KeyType::Ecdsa => write!(f, "ecdsa"),
        }
    }
}

//------------ Element -------------------------------------------------------

/// The metadata record kept for one generated key.
///
/// `valid_until` is informational only. The actual certificate expiry
/// lives in the X.509 structure; signing records the new NotAfter here
/// but nothing recomputes validity from state.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Element {
    /// Canonical relative location of the element's files, no extension.
    #[serde(rename = "Path")]
    pub path: String,

    #[serde(rename = "Type")]
    pub key_type: KeyType,

    /// Bit length for rsa, curve selector for ecdsa.
    #[serde(rename = "Size")]
    pub size: u32,

    #[serde(rename = "CreatedOn")]
    pub created_on: DateTime<Utc>,

    #[serde(rename = "ValidUntil")]
    pub valid_until: DateTime<Utc>,

    /// Decimal serial of the most recently issued certificate.
    /// Empty until the element has been signed.
    #[serde(rename = "SerialNumber")]
    pub serial_number: String,
}

//------------ State ---------------------------------------------------------

/// The full persisted registry, one mapping per entity class.
///
/// State owns all elements; an element never appears in more than one
/// mapping. Presence in state does not guarantee the key or certificate
/// files still exist on disk: state is advisory metadata, file presence
/// is the authority for whether a key can actually be opened.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct State {
    #[serde(rename = "Root", default)]
    pub root: HashMap<String, Element>,

    #[serde(rename = "Intermediates", default)]
    pub intermediates: HashMap<String, Element>,

    #[serde(rename = "Clients", default)]
    pub clients: HashMap<String, Element>,

    #[serde(rename = "LastModificationDate", default)]
    pub last_modification_date: Option<DateTime<Utc>>,
}

impl State {
    /// Loads the state file, or returns an empty state if there is none.
    ///
    /// The missing-file case is the bootstrap condition: `init` creates
    /// an empty state file, but a load before that must still work.
    pub fn load(path: &Path) -> Result<State, Error> {
        if !path.exists() {
            return Ok(State::default());
        }
        let bytes = file::read(path)?;
        serde_json::from_slice(&bytes).map_err(Error::state_corrupt)
    }

    /// Serializes the full state, overwriting the file in place.
    ///
    /// No partial writes: a crash mid-write loses the file. Accepted
    /// risk for a single-operator tool.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        file::save_json(self, path)?;
        Ok(())
    }

    pub fn get(&self, class: Class, name: &str) -> Option<&Element> {
        self.class_map(class).get(name)
    }

    /// Inserts or overwrites the element under (class, name).
    pub fn set(&mut self, class: Class, name: &str, element: Element) {
        self.class_map_mut(class).insert(name.to_string(), element);
    }

    pub fn delete(&mut self, class: Class, name: &str) {
        self.class_map_mut(class).remove(name);
    }

    /// Records that a mutating action completed.
    pub fn touch(&mut self) {
        self.last_modification_date = Some(Utc::now());
    }

    fn class_map(&self, class: Class) -> &HashMap<String, Element> {
        match class {
            Class::Root => &self.root,
            Class::Intermediate => &self.intermediates,
            Class::Client => &self.clients,
        }
    }

    fn class_map_mut(&mut self, class: Class) -> &mut HashMap<String, Element> {
        match class {
            Class::Root => &mut self.root,
            Class::Intermediate => &mut self.intermediates,
            Class::Client => &mut self.clients,
        }
    }
}

//------------ Tests ---------------------------------------------------------
