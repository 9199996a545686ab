//! Keystore protection scenarios: dual-path unlocking, payload binding and
//! re-derivation of a keypair from a recovered seed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mailseal::crypto::kem::derive_and_verify;
use mailseal::{
    sample_salt, EcdhKeyPair, Error, KemKeyPair, KemLevel, KeyBundle, Keystore, KeystoreKind,
    PasswordParams, RecoveryCode, SessionKey,
};

/// Cheap Argon2 parameters for tests only.
fn fast_params() -> PasswordParams {
    PasswordParams::new(8, 1, 1).unwrap()
}

fn bundle_bytes() -> Vec<u8> {
    let ecdh = EcdhKeyPair::generate().unwrap();
    let kem = KemKeyPair::generate(KemLevel::MlKem768).unwrap();
    KeyBundle::new(&ecdh.secret, &kem.secret)
        .to_bytes()
        .unwrap()
        .to_vec()
}

fn rewrap_json(keystore: &Keystore, edit: impl FnOnce(&mut serde_json::Value)) -> Keystore {
    let wire = keystore.to_wire().unwrap();
    let mut value: serde_json::Value =
        serde_json::from_slice(&STANDARD.decode(wire).unwrap()).unwrap();
    edit(&mut value);
    let reencoded = STANDARD.encode(serde_json::to_vec(&value).unwrap());
    Keystore::from_wire(&reencoded).unwrap()
}

#[test]
fn password_and_recovery_paths_unlock_identical_material() {
    let material = bundle_bytes();

    let salt = sample_salt().unwrap();
    let session = SessionKey::from_password("correct horse", &salt, fast_params()).unwrap();
    let code = RecoveryCode::generate().unwrap();

    let primary =
        Keystore::protect("u1", KeystoreKind::Encryption, &material, &session).unwrap();
    let fallback = Keystore::protect_with_recovery("u1", &material, &code).unwrap();
    assert_eq!(fallback.kind(), KeystoreKind::Recovery);

    let via_password = primary.open(&session).unwrap();
    let via_recovery = fallback.open_with_recovery(&code).unwrap();

    assert_eq!(*via_password, material);
    assert_eq!(*via_recovery, material);
    assert_eq!(*via_password, *via_recovery);

    // The decoded bundle yields working key handles on both paths.
    let bundle = KeyBundle::from_bytes(&via_recovery).unwrap();
    assert_eq!(bundle.kem_secret().unwrap().level(), KemLevel::MlKem768);
    bundle.ecdh_secret().unwrap();
}

#[test]
fn recovery_code_survives_reentry_by_the_user() {
    let material = bundle_bytes();
    let code = RecoveryCode::generate().unwrap();
    let keystore = Keystore::protect_with_recovery("u1", &material, &code).unwrap();

    let retyped = RecoveryCode::from_phrase(&code.phrase()).unwrap();
    assert_eq!(*keystore.open_with_recovery(&retyped).unwrap(), material);
}

#[test]
fn wrong_recovery_code_fails_authentication() {
    let keystore =
        Keystore::protect_with_recovery("u1", &bundle_bytes(), &RecoveryCode::generate().unwrap())
            .unwrap();

    let err = keystore
        .open_with_recovery(&RecoveryCode::generate().unwrap())
        .unwrap_err();
    assert!(matches!(err.root_cause(), Error::AuthenticationFailure));
}

#[test]
fn payload_swapped_onto_another_owner_fails() {
    let session = SessionKey::from_bytes([1u8; 32]);
    let u1 = Keystore::protect("u1", KeystoreKind::Encryption, b"u1 keys", &session).unwrap();
    let u2 = Keystore::protect("u2", KeystoreKind::Encryption, b"u2 keys", &session).unwrap();

    // Graft u1's payload onto u2's record, as a storage-level attacker would.
    let u1_payload = STANDARD.encode(u1.payload().to_bytes());
    let grafted = rewrap_json(&u2, |value| {
        value["payload"] = serde_json::Value::String(u1_payload.clone());
    });

    let err = grafted.open(&session).unwrap_err();
    assert!(matches!(err.root_cause(), Error::AuthenticationFailure));
}

#[test]
fn payload_swapped_onto_another_kind_fails() {
    let session = SessionKey::from_bytes([1u8; 32]);
    let keystore = Keystore::protect("u1", KeystoreKind::Encryption, b"keys", &session).unwrap();

    let relabeled = rewrap_json(&keystore, |value| {
        value["kind"] = serde_json::Value::String("index".into());
    });
    assert_eq!(relabeled.kind(), KeystoreKind::Index);

    let err = relabeled.open(&session).unwrap_err();
    assert!(matches!(err.root_cause(), Error::AuthenticationFailure));
}

#[test]
fn recovery_code_is_independent_of_the_password() {
    let material = bundle_bytes();

    let salt = sample_salt().unwrap();
    let session = SessionKey::from_password("correct horse", &salt, fast_params()).unwrap();
    let code = RecoveryCode::generate().unwrap();

    let primary = Keystore::protect("u1", KeystoreKind::Identity, &material, &session).unwrap();
    let fallback = Keystore::protect_with_recovery("u1", &material, &code).unwrap();

    // The recovery record does not open under the session key and the
    // primary record does not open under the recovery code.
    assert!(fallback.open(&session).is_err());
    assert!(primary.open_with_recovery(&code).is_err());
}

#[test]
fn keypair_rederives_from_a_recovered_seed() {
    let seed = {
        let mut seed = [0u8; 64];
        seed[..32].copy_from_slice(&[0x11; 32]);
        seed[32..].copy_from_slice(&[0x22; 32]);
        seed
    };
    let enrolled = KemKeyPair::from_seed(KemLevel::MlKem768, &seed).unwrap();

    // Later, the seed is recovered and the stored public key verified.
    let verified = derive_and_verify(KemLevel::MlKem768, &seed, &enrolled.public).unwrap();
    assert!(verified.matches);
    assert_eq!(
        verified.keypair.secret.as_bytes(),
        enrolled.secret.as_bytes()
    );

    // A different seed re-derives a different keypair.
    let other = derive_and_verify(KemLevel::MlKem768, &[0x33; 64], &enrolled.public).unwrap();
    assert!(!other.matches);
}
