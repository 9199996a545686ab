//! End-to-end envelope scenarios between correspondents.

use mailseal::{
    unwrap_content_key, unwrap_with_password, wrap_content_key, wrap_for_recipients,
    wrap_with_password, EcdhKeyPair, Envelope, Error, KemKeyPair, KemLevel, PasswordParams,
    RecipientKeys,
};

struct User {
    ecdh: EcdhKeyPair,
    kem: KemKeyPair,
}

fn user(level: KemLevel) -> User {
    User {
        ecdh: EcdhKeyPair::generate().unwrap(),
        kem: KemKeyPair::generate(level).unwrap(),
    }
}

fn content_key() -> [u8; 32] {
    [0xa7; 32]
}

/// Cheap Argon2 parameters for tests only.
fn fast_params() -> PasswordParams {
    PasswordParams::new(8, 1, 1).unwrap()
}

#[test]
fn alice_encrypts_a_content_key_for_bob() {
    let alice = user(KemLevel::MlKem768);
    let bob = user(KemLevel::MlKem768);

    let envelope = wrap_content_key(
        &content_key(),
        &alice.ecdh.secret,
        &RecipientKeys {
            ecdh: &bob.ecdh.public,
            kem: &bob.kem.public,
        },
    )
    .unwrap();

    let recovered = unwrap_content_key(
        &envelope,
        &bob.ecdh.secret,
        &alice.ecdh.public,
        &bob.kem.secret,
    )
    .unwrap();

    assert_eq!(*recovered, content_key());
}

#[test]
fn all_kem_levels_round_trip() {
    for level in [KemLevel::MlKem512, KemLevel::MlKem768, KemLevel::MlKem1024] {
        let alice = user(level);
        let bob = user(level);

        let envelope = wrap_content_key(
            &content_key(),
            &alice.ecdh.secret,
            &RecipientKeys {
                ecdh: &bob.ecdh.public,
                kem: &bob.kem.public,
            },
        )
        .unwrap();
        assert_eq!(envelope.kem_ciphertext().len(), level.ciphertext_len());

        let recovered = unwrap_content_key(
            &envelope,
            &bob.ecdh.secret,
            &alice.ecdh.public,
            &bob.kem.secret,
        )
        .unwrap();
        assert_eq!(*recovered, content_key());
    }
}

#[test]
fn wrong_recipient_fails_only_at_the_final_unwrap() {
    let alice = user(KemLevel::MlKem768);
    let bob = user(KemLevel::MlKem768);
    let mallory = user(KemLevel::MlKem768);

    let envelope = wrap_content_key(
        &content_key(),
        &alice.ecdh.secret,
        &RecipientKeys {
            ecdh: &bob.ecdh.public,
            kem: &bob.kem.public,
        },
    )
    .unwrap();

    // Decapsulation succeeds with the wrong key (implicit rejection); the
    // mismatch only shows as an unwrap failure.
    let err = unwrap_content_key(
        &envelope,
        &mallory.ecdh.secret,
        &alice.ecdh.public,
        &mallory.kem.secret,
    )
    .unwrap_err();

    assert!(matches!(err.root_cause(), Error::Unwrap));
}

#[test]
fn tampered_kem_ciphertext_fails_at_unwrap() {
    let alice = user(KemLevel::MlKem768);
    let bob = user(KemLevel::MlKem768);

    let envelope = wrap_content_key(
        &content_key(),
        &alice.ecdh.secret,
        &RecipientKeys {
            ecdh: &bob.ecdh.public,
            kem: &bob.kem.public,
        },
    )
    .unwrap();

    let mut kem_ct = envelope.kem_ciphertext().to_vec();
    kem_ct[100] ^= 0xff;
    let tampered = Envelope::from_parts(kem_ct, envelope.wrapped_key().to_vec());

    let err = unwrap_content_key(
        &tampered,
        &bob.ecdh.secret,
        &alice.ecdh.public,
        &bob.kem.secret,
    )
    .unwrap_err();

    assert!(matches!(err.root_cause(), Error::Unwrap));
}

#[test]
fn tampered_wrapped_key_fails_at_unwrap() {
    let alice = user(KemLevel::MlKem768);
    let bob = user(KemLevel::MlKem768);

    let envelope = wrap_content_key(
        &content_key(),
        &alice.ecdh.secret,
        &RecipientKeys {
            ecdh: &bob.ecdh.public,
            kem: &bob.kem.public,
        },
    )
    .unwrap();

    let mut wrapped = envelope.wrapped_key().to_vec();
    wrapped[0] ^= 0x01;
    let tampered = Envelope::from_parts(envelope.kem_ciphertext().to_vec(), wrapped);

    let err = unwrap_content_key(
        &tampered,
        &bob.ecdh.secret,
        &alice.ecdh.public,
        &bob.kem.secret,
    )
    .unwrap_err();

    assert!(matches!(err.root_cause(), Error::Unwrap));
}

#[test]
fn fan_out_shares_one_content_key_across_recipients() {
    let sender = user(KemLevel::MlKem768);
    let recipients: Vec<User> = (0..3).map(|_| user(KemLevel::MlKem768)).collect();

    let keys: Vec<RecipientKeys<'_>> = recipients
        .iter()
        .map(|r| RecipientKeys {
            ecdh: &r.ecdh.public,
            kem: &r.kem.public,
        })
        .collect();

    let envelopes = wrap_for_recipients(&content_key(), &sender.ecdh.secret, &keys).unwrap();
    assert_eq!(envelopes.len(), recipients.len());

    for (envelope, recipient) in envelopes.iter().zip(&recipients) {
        let recovered = unwrap_content_key(
            envelope,
            &recipient.ecdh.secret,
            &sender.ecdh.public,
            &recipient.kem.secret,
        )
        .unwrap();
        assert_eq!(*recovered, content_key());
    }

    // Per-recipient wraps are independent.
    assert_ne!(envelopes[0].kem_ciphertext(), envelopes[1].kem_ciphertext());
}

#[test]
fn envelope_survives_the_wire() {
    let alice = user(KemLevel::MlKem768);
    let bob = user(KemLevel::MlKem768);

    let envelope = wrap_content_key(
        &content_key(),
        &alice.ecdh.secret,
        &RecipientKeys {
            ecdh: &bob.ecdh.public,
            kem: &bob.kem.public,
        },
    )
    .unwrap();

    let wire = envelope.to_wire().unwrap();
    let parsed = Envelope::from_wire(&wire).unwrap();
    assert_eq!(parsed, envelope);

    let recovered = unwrap_content_key(
        &parsed,
        &bob.ecdh.secret,
        &alice.ecdh.public,
        &bob.kem.secret,
    )
    .unwrap();
    assert_eq!(*recovered, content_key());
}

#[test]
fn passphrase_envelope_round_trips() {
    let envelope = wrap_with_password(&content_key(), "shared passphrase", fast_params()).unwrap();
    let recovered = unwrap_with_password(&envelope, "shared passphrase").unwrap();
    assert_eq!(*recovered, content_key());
}

#[test]
fn wrong_passphrase_fails_at_unwrap() {
    let envelope = wrap_with_password(&content_key(), "shared passphrase", fast_params()).unwrap();
    let err = unwrap_with_password(&envelope, "other passphrase").unwrap_err();
    assert!(matches!(err.root_cause(), Error::Unwrap));
}

#[test]
fn passphrase_envelope_survives_the_wire() {
    let envelope = wrap_with_password(&content_key(), "shared passphrase", fast_params()).unwrap();

    let wire = envelope.to_wire().unwrap();
    let parsed = mailseal::PasswordEnvelope::from_wire(&wire).unwrap();

    let recovered = unwrap_with_password(&parsed, "shared passphrase").unwrap();
    assert_eq!(*recovered, content_key());
}
