//! Building and signing X.509 certificates.

use std::net::IpAddr;

use chrono::{DateTime, Months, Utc};
use log::debug;
use openssl::asn1::{Asn1Time, Asn1Type};
use openssl::bn::{BigNum, BigNumRef, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
};
use openssl::x509::{X509, X509Name, X509NameBuilder, X509Ref};

use crate::commons::error::Error;
use crate::config::Config;
use crate::crypto::keys::KeyPair;
use crate::state::Class;

//------------ Serial numbers ------------------------------------------------

/// Bit width of generated serials.
pub const SERIAL_BITS: i32 = 159;

/// Generates a random certificate serial.
///
/// Uniform over [0, 2^159): wide enough that collisions are negligible
/// over the CA's lifetime without persistent counter coordination.
pub fn random_serial() -> Result<BigNum, Error> {
    let mut serial = BigNum::new()?;
    serial.rand(SERIAL_BITS, MsbOption::MAYBE_ZERO, false)?;
    Ok(serial)
}

//------------ Validity ------------------------------------------------------

/// The validity window of an issued certificate.
#[derive(Clone, Copy, Debug)]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl Validity {
    /// The window starting now, `months` long.
    ///
    /// Zero months yields an already-expired certificate. That is
    /// accepted, not rejected.
    pub fn months_from_now(months: u32) -> Result<Validity, Error> {
        let not_before = Utc::now();
        let not_after = not_before
            .checked_add_months(Months::new(months))
            .ok_or_else(|| Error::ConfigCorrupt("certificate duration out of range".to_string()))?;
        Ok(Validity { not_before, not_after })
    }
}

//------------ Issuer --------------------------------------------------------

/// Who signs the certificate being issued.
#[derive(Clone, Copy)]
pub enum Issuer<'a> {
    /// The template signs itself with the subject's own key.
    SelfSigned,

    /// A CA with an existing certificate signs.
    Ca { cert: &'a X509Ref, key: &'a KeyPair },
}

//------------ Certificate construction --------------------------------------

/// Builds and signs the certificate for one element.
///
/// CA classes (root, intermediate) get a CA certificate: critical basic
/// constraints with the CA flag, DigitalSignature + CertSign key usage.
/// Clients get a leaf certificate with their name as CN, DigitalSignature
/// only, and the given subject alternative names attached. Both carry
/// ClientAuth + ServerAuth extended key usage.
pub fn issue(
    class: Class,
    name: &str,
    config: &Config,
    alt_names: &[String],
    serial: &BigNumRef,
    validity: &Validity,
    subject_key: &KeyPair,
    issuer: Issuer,
) -> Result<X509, Error> {
    let subject = subject_name(config, class, name)?;

    let mut builder = X509::builder()?;
    builder.set_version(2)?;

    let serial = serial.to_asn1_integer()?;
    builder.set_serial_number(&serial)?;

    builder.set_subject_name(&subject)?;
    builder.set_pubkey(subject_key.pkey())?;

    let not_before = Asn1Time::from_unix(validity.not_before.timestamp())?;
    let not_after = Asn1Time::from_unix(validity.not_after.timestamp())?;
    builder.set_not_before(&not_before)?;
    builder.set_not_after(&not_after)?;

    match class {
        Class::Root | Class::Intermediate => {
            builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
            builder.append_extension(
                KeyUsage::new().critical().digital_signature().key_cert_sign().build()?,
            )?;
        }
        Class::Client => {
            builder.append_extension(KeyUsage::new().critical().digital_signature().build()?)?;
        }
    }
    builder.append_extension(ExtendedKeyUsage::new().client_auth().server_auth().build()?)?;

    if !alt_names.is_empty() {
        let mut san = SubjectAlternativeName::new();
        for alt_name in alt_names {
            if alt_name.parse::<IpAddr>().is_ok() {
                san.ip(alt_name);
            } else {
                san.dns(alt_name);
            }
        }
        let ext = match issuer {
            Issuer::Ca { cert, .. } => san.build(&builder.x509v3_context(Some(cert), None))?,
            Issuer::SelfSigned => san.build(&builder.x509v3_context(None, None))?,
        };
        builder.append_extension(ext)?;
    }

    match issuer {
        Issuer::SelfSigned => {
            builder.set_issuer_name(&subject)?;
            builder.sign(subject_key.pkey(), MessageDigest::sha256())?;
        }
        Issuer::Ca { cert, key } => {
            builder.set_issuer_name(cert.subject_name())?;
            builder.sign(key.pkey(), MessageDigest::sha256())?;
        }
    }

    debug!("Built {} certificate for '{}'", class, name);
    Ok(builder.build())
}

// UTF8 entries explicitly: the default ASN.1 string table restricts
// countryName to two characters, while the persisted configuration
// carries full country names.
fn subject_name(config: &Config, class: Class, name: &str) -> Result<X509Name, Error> {
    let mut subject = X509NameBuilder::new()?;
    subject.append_entry_by_nid_with_type(
        Nid::ORGANIZATIONNAME,
        &config.organization,
        Asn1Type::UTF8STRING,
    )?;
    subject.append_entry_by_nid_with_type(Nid::COUNTRYNAME, &config.country, Asn1Type::UTF8STRING)?;
    subject.append_entry_by_nid_with_type(
        Nid::LOCALITYNAME,
        &config.locality,
        Asn1Type::UTF8STRING,
    )?;
    if class == Class::Client {
        subject.append_entry_by_nid_with_type(Nid::COMMONNAME, name, Asn1Type::UTF8STRING)?;
    }
    Ok(subject.build())
}

//------------ Tests ---------------------------------------------------------
