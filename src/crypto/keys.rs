//! Generating, storing and loading asymmetric key pairs.

use std::path::Path;

use bytes::Bytes;
use log::debug;
use openssl::ec::{EcGroup, EcKey};
use openssl::nid::Nid;
use openssl::pkey::{Id, PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::symm::Cipher;
use openssl::x509::X509;

use crate::commons::error::{CaIoError, Error};
use crate::commons::file;
use crate::constants::{MODE_OWNER_FILE, MODE_WORLD_READABLE_FILE};
use crate::state::KeyType;

//------------ KeyPair -------------------------------------------------------

/// A freshly generated or loaded asymmetric key pair.
///
/// The variant is resolved once, at generation or load time. Everything
/// downstream signs and derives public keys through the shared pkey
/// handle, so no further type dispatch happens per call.
pub enum KeyPair {
    Rsa(PKey<Private>),
    Ecdsa(PKey<Private>),
}

impl KeyPair {
    /// Generates a fresh key pair.
    ///
    /// For rsa the size is a bit length from {1024, 2048, 4096}; for
    /// ecdsa it selects a named curve from {224, 256, 384, 521}.
    pub fn generate(key_type: KeyType, size: u32) -> Result<KeyPair, Error> {
        match key_type {
            KeyType::Rsa => {
                if !matches!(size, 1024 | 2048 | 4096) {
                    return Err(Error::UnsupportedKeySize(key_type, size));
                }
                let rsa = Rsa::generate(size)?;
                debug!("Generated {} bit rsa key pair", size);
                Ok(KeyPair::Rsa(PKey::from_rsa(rsa)?))
            }
            KeyType::Ecdsa => {
                let nid = curve_for_size(size)
                    .ok_or(Error::UnsupportedKeySize(key_type, size))?;
                let group = EcGroup::from_curve_name(nid)?;
                let ec = EcKey::generate(&group)?;
                debug!("Generated P-{} ecdsa key pair", size);
                Ok(KeyPair::Ecdsa(PKey::from_ec_key(ec)?))
            }
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPair::Rsa(_) => KeyType::Rsa,
            KeyPair::Ecdsa(_) => KeyType::Ecdsa,
        }
    }

    pub fn pkey(&self) -> &PKeyRef<Private> {
        match self {
            KeyPair::Rsa(pkey) => pkey,
            KeyPair::Ecdsa(pkey) => pkey,
        }
    }

    // The recorded type must match what the PEM actually contained.
    fn from_pkey(key_type: KeyType, pkey: PKey<Private>, path: &Path) -> Result<KeyPair, Error> {
        match (key_type, pkey.id()) {
            (KeyType::Rsa, Id::RSA) => Ok(KeyPair::Rsa(pkey)),
            (KeyType::Ecdsa, Id::EC) => Ok(KeyPair::Ecdsa(pkey)),
            _ => Err(Error::parse(format!(
                "{} does not contain a {} key",
                path.display(),
                key_type
            ))),
        }
    }
}

fn curve_for_size(size: u32) -> Option<Nid> {
    match size {
        224 => Some(Nid::SECP224R1),
        256 => Some(Nid::X9_62_PRIME256V1),
        384 => Some(Nid::SECP384R1),
        521 => Some(Nid::SECP521R1),
        _ => None,
    }
}

//------------ Storing keys --------------------------------------------------

/// Serializes the private key as PKCS#8 PEM and writes it owner-only.
///
/// With a passphrase the PEM block is AES-256 encrypted; without one the
/// key is stored in the clear (the explicit clear-text mode).
pub fn store_private_key(
    key_pair: &KeyPair,
    passphrase: Option<&str>,
    path: &Path,
) -> Result<(), Error> {
    let pem = match passphrase {
        Some(passphrase) => key_pair.pkey().private_key_to_pem_pkcs8_passphrase(
            Cipher::aes_256_cbc(),
            passphrase.as_bytes(),
        )?,
        None => key_pair.pkey().private_key_to_pem_pkcs8()?,
    };
    file::save_with_mode(&pem, path, MODE_OWNER_FILE)?;
    Ok(())
}

/// Writes the public key as SPKI PEM, world readable.
pub fn store_public_key(key_pair: &KeyPair, path: &Path) -> Result<(), Error> {
    let pem = key_pair.pkey().public_key_to_pem()?;
    file::save_with_mode(&pem, path, MODE_WORLD_READABLE_FILE)?;
    Ok(())
}

//------------ Loading keys and certificates ---------------------------------

/// Loads a private key, prompting for the passphrase when the PEM block
/// is encrypted. This is the only point where an operation blocks on
/// interactive input.
pub fn load_private_key(key_type: KeyType, path: &Path) -> Result<KeyPair, Error> {
    if !path.exists() {
        return Err(Error::key_not_found(path));
    }

    let pem = file::read(path)?;

    let pkey = if is_encrypted(&pem) {
        let passphrase = rpassword::prompt_password(format!(
            "The file {} is encrypted, please enter the password to unlock it: ",
            path.display()
        ))
        .map_err(|e| CaIoError::new("could not read passphrase", e))?;

        PKey::private_key_from_pem_passphrase(&pem, passphrase.as_bytes())
            .map_err(|_| Error::decryption_failed(path))?
    } else {
        PKey::private_key_from_pem(&pem).map_err(Error::parse)?
    };

    KeyPair::from_pkey(key_type, pkey, path)
}

/// Loads a certificate, returning both the raw PEM and the parsed form.
pub fn load_certificate(path: &Path) -> Result<(Bytes, X509), Error> {
    if !path.exists() {
        return Err(Error::cert_not_found(path));
    }

    let pem = file::read(path)?;
    let cert = X509::from_pem(&pem).map_err(Error::parse)?;
    Ok((pem, cert))
}

// PKCS#8 encrypted blocks announce themselves in the PEM header.
fn is_encrypted(pem: &[u8]) -> bool {
    String::from_utf8_lossy(pem).contains("ENCRYPTED")
}

//------------ Tests ---------------------------------------------------------
