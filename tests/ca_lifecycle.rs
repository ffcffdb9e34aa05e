//! Rust integration test walking a repository through the full
//! root → intermediate → client lifecycle.

use std::path::{Path, PathBuf};

use openssl::x509::X509;

use simpleca::commons::file;
use simpleca::config::Config;
use simpleca::constants::{CONFIG_FILE, STATE_FILE};
use simpleca::ops::{generate, init, rm, sign};
use simpleca::state::{Class, KeyType, State};

fn test_with_repo<F>(op: F)
where
    F: FnOnce(PathBuf),
{
    let dir = tempfile::tempdir().unwrap();
    init::init_repository(dir.path()).unwrap();
    op(dir.path().into());
}

fn generate_key(dir: &Path, state: &mut State, class: Class, name: Option<&str>) {
    generate::generate(dir, state, class, name, KeyType::Ecdsa, None, None).unwrap();
}

fn sign_key(
    dir: &Path,
    state: &mut State,
    config: &Config,
    class: Class,
    name: Option<&str>,
    with: Option<&str>,
) -> sign::IssuedCertificate {
    sign::sign(dir, state, config, class, name, with, &[]).unwrap()
}

#[test]
fn ca_lifecycle() {
    test_with_repo(|dir| {
        let config = Config::load(&dir.join(CONFIG_FILE)).unwrap();
        let state_path = dir.join(STATE_FILE);
        let mut state = State::load(&state_path).unwrap();

        // Build the chain: a root, an intermediate signed by it, and a
        // client signed by the intermediate.
        generate_key(&dir, &mut state, Class::Root, None);
        generate_key(&dir, &mut state, Class::Intermediate, Some("ica1"));

        sign_key(&dir, &mut state, &config, Class::Root, None, None);
        sign_key(&dir, &mut state, &config, Class::Intermediate, Some("ica1"), Some("root"));

        generate_key(&dir, &mut state, Class::Client, Some("alice"));
        let issued =
            sign_key(&dir, &mut state, &config, Class::Client, Some("alice"), Some("ica1"));

        // Alice's full chain holds her certificate followed by ica1's,
        // byte for byte.
        let full_chain_path = dir.join("clients/alice.fullchain.crt");
        assert_eq!(
            issued.full_chain_path.as_deref(),
            Some(Path::new("clients/alice.fullchain.crt"))
        );

        let bundle = file::read(&full_chain_path).unwrap();
        let alice_pem = file::read(&dir.join("clients/alice.crt")).unwrap();
        let ica1_pem = file::read(&dir.join("intermediates/ica1.crt")).unwrap();

        let mut expected = alice_pem.to_vec();
        expected.extend_from_slice(&ica1_pem);
        assert_eq!(bundle.as_ref(), expected.as_slice());

        // The cryptographic chain holds: root signs ica1, ica1 signs alice.
        let root_cert = X509::from_pem(&file::read(&dir.join("root/root.crt")).unwrap()).unwrap();
        let ica1_cert = X509::from_pem(&ica1_pem).unwrap();
        let alice_cert = X509::from_pem(&alice_pem).unwrap();

        assert!(root_cert.verify(&root_cert.public_key().unwrap()).unwrap());
        assert!(ica1_cert.verify(&root_cert.public_key().unwrap()).unwrap());
        assert!(alice_cert.verify(&ica1_cert.public_key().unwrap()).unwrap());

        // Alice's recorded serial is non-empty and matches her certificate.
        let alice = state.get(Class::Client, "alice").unwrap();
        assert!(!alice.serial_number.is_empty());
        assert_eq!(
            alice.serial_number,
            alice_cert
                .serial_number()
                .to_bn()
                .unwrap()
                .to_dec_str()
                .unwrap()
                .to_string()
        );

        // The registry round-trips through disk unchanged.
        state.touch();
        state.save(&state_path).unwrap();
        assert_eq!(State::load(&state_path).unwrap(), state);
    });
}

#[test]
fn removal_cleans_up_and_stays_idempotent() {
    test_with_repo(|dir| {
        let config = Config::load(&dir.join(CONFIG_FILE)).unwrap();
        let mut state = State::load(&dir.join(STATE_FILE)).unwrap();

        generate_key(&dir, &mut state, Class::Intermediate, Some("ica1"));
        sign_key(&dir, &mut state, &config, Class::Intermediate, Some("ica1"), None);
        generate_key(&dir, &mut state, Class::Client, Some("alice"));
        sign_key(&dir, &mut state, &config, Class::Client, Some("alice"), Some("ica1"));

        rm::remove(&dir, &mut state, Class::Client, Some("alice")).unwrap();
        rm::remove(&dir, &mut state, Class::Client, Some("alice")).unwrap();

        assert!(state.get(Class::Client, "alice").is_none());
        assert!(!dir.join("clients/alice.key").exists());
        assert!(!dir.join("clients/alice.fullchain.crt").exists());

        // the intermediate is untouched
        assert!(state.get(Class::Intermediate, "ica1").is_some());
        assert!(dir.join("intermediates/ica1.crt").exists());
    });
}
