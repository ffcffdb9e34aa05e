//! The issuance engine: turning registered keys into certificates.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::info;
use openssl::x509::X509;

use crate::commons::error::Error;
use crate::commons::CaResult;
use crate::commons::file;
use crate::config::Config;
use crate::constants::MODE_OWNER_FILE;
use crate::crypto::cert::{self, Issuer, Validity};
use crate::crypto::keys::{self, KeyPair};
use crate::paths;
use crate::state::{Class, Element, State};

//------------ IssuedCertificate ---------------------------------------------

/// What the issuance engine produced, for reporting.
#[derive(Clone, Debug)]
pub struct IssuedCertificate {
    pub class: Class,
    pub name: String,

    /// Repository-relative location of the certificate.
    pub cert_path: PathBuf,

    /// Repository-relative location of the full-chain bundle, when one
    /// was produced.
    pub full_chain_path: Option<PathBuf>,

    /// Decimal form of the certificate serial.
    pub serial: String,
}

//------------ sign ----------------------------------------------------------

/// Issues a certificate for the element registered under (class, name).
///
/// Without a signer the certificate is self-signed. With one, the signer
/// is looked up among the intermediates first, the root second; it must
/// already carry a certificate of its own. A client signed by a named CA
/// additionally gets a full-chain bundle next to its certificate.
///
/// Nothing is committed to the state file here. The element is updated
/// in memory and the caller persists state only after the whole action
/// succeeded, so a failed issuance never corrupts the registry.
pub fn sign(
    dir: &Path,
    state: &mut State,
    config: &Config,
    class: Class,
    name: Option<&str>,
    with: Option<&str>,
    alt_names: &[String],
) -> CaResult<IssuedCertificate> {
    let name = name
        .filter(|name| !name.is_empty())
        .unwrap_or(class.default_name())
        .to_string();

    // Signing never creates an element, only generation does.
    let element = state
        .get(class, &name)
        .cloned()
        .ok_or_else(|| Error::UnknownKey(class, name.clone()))?;

    let base = PathBuf::from(&element.path);
    let key_pair = keys::load_private_key(element.key_type, &dir.join(paths::priv_key_path(&base)))?;

    let signer = match with.filter(|with| !with.is_empty()) {
        Some(with) => Some(load_signer(dir, state, with)?),
        None => None,
    };

    let serial = cert::random_serial()?;
    let validity = Validity::months_from_now(config.certificate_duration)?;

    let issued = match &signer {
        Some(signer) => cert::issue(
            class,
            &name,
            config,
            alt_names,
            &serial,
            &validity,
            &key_pair,
            Issuer::Ca { cert: &signer.cert, key: &signer.key },
        )?,
        None => cert::issue(
            class,
            &name,
            config,
            alt_names,
            &serial,
            &validity,
            &key_pair,
            Issuer::SelfSigned,
        )?,
    };

    let cert_pem = issued.to_pem()?;
    let cert_path = paths::cert_path(&base);
    file::save_with_mode(&cert_pem, &dir.join(&cert_path), MODE_OWNER_FILE)?;

    // Clients presented to verifiers that only trust the root need their
    // issuer's certificate along for the ride.
    let full_chain_path = match &signer {
        Some(signer) if class == Class::Client => {
            let mut bundle = cert_pem.clone();
            bundle.extend_from_slice(&signer.cert_pem);

            let full_chain_path = paths::full_chain_path(&base);
            file::save_with_mode(&bundle, &dir.join(&full_chain_path), MODE_OWNER_FILE)?;
            Some(full_chain_path)
        }
        _ => None,
    };

    let serial = serial.to_dec_str()?.to_string();

    let mut element = element;
    element.serial_number = serial.clone();
    element.valid_until = validity.not_after;
    state.set(class, &name, element);

    info!("Issued certificate for {} '{}' in {}", class, name, cert_path.display());

    Ok(IssuedCertificate {
        class,
        name,
        cert_path,
        full_chain_path,
        serial,
    })
}

//------------ Signer resolution ---------------------------------------------

struct Signer {
    cert: X509,
    cert_pem: Bytes,
    key: KeyPair,
}

/// Finds the named signer and loads its key and certificate.
///
/// Intermediates are consulted first, the root second; only those two
/// classes can act as signers. A signer without a certificate file has
/// not been signed itself yet and is refused.
fn load_signer(dir: &Path, state: &State, with: &str) -> CaResult<Signer> {
    let element = resolve_signer(state, with)?;

    let base = PathBuf::from(&element.path);

    let cert_path = dir.join(paths::cert_path(&base));
    if !cert_path.exists() {
        return Err(Error::SignerNotYetCertified(with.to_string()));
    }
    let (cert_pem, cert) = keys::load_certificate(&cert_path)?;

    let key = keys::load_private_key(element.key_type, &dir.join(paths::priv_key_path(&base)))?;

    Ok(Signer { cert, cert_pem, key })
}

fn resolve_signer<'a>(state: &'a State, with: &str) -> CaResult<&'a Element> {
    state
        .get(Class::Intermediate, with)
        .or_else(|| state.get(Class::Root, with))
        .ok_or_else(|| Error::UnknownSigner(with.to_string()))
}

//------------ Tests ---------------------------------------------------------
