//! Hybrid envelope encryption for per-message content keys.
//!
//! A content key is wrapped under a key derived from two independent shared
//! secrets: one from ML-KEM encapsulation against the recipient's
//! post-quantum key, one from X25519 agreement between the sender's secret
//! and the recipient's classical public key. The secrets are combined with
//! the KEM secret first; both sides must use the same order, and a mismatch
//! is only visible as an unwrap failure.
//!
//! Wrapping uses AES-KW (RFC 3394), so the wrapped blob carries its own
//! integrity check and no separate IV.

use aes_kw::KekAes256;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::ecdh::{derive_shared_bits, EcdhPublicKey, EcdhSecretKey};
use crate::crypto::kdf::{combine_two_secrets, context};
use crate::crypto::kem::{self, KemPublicKey, KemSecretKey};
use crate::crypto::password::{derive_from_password, sample_salt, PasswordParams};
use crate::crypto::{SharedSecret, KEY_LEN};
use crate::error::{Error, Result};
use crate::wire;

/// A symmetric key usable only for AES-KW key wrapping, never for general
/// AEAD. Zeroized on drop via the wrapped secret.
pub struct WrappingKey(SharedSecret);

impl WrappingKey {
    /// Import a combined secret as a wrapping key.
    pub fn new(secret: SharedSecret) -> Self {
        Self(secret)
    }

    /// Wrap a 32-byte key. The output carries the AES-KW integrity block
    /// and no separate IV.
    pub fn wrap(&self, key: &[u8; KEY_LEN]) -> Result<Vec<u8>> {
        KekAes256::from(*self.0.as_bytes())
            .wrap_vec(key)
            .map_err(|_| Error::Encryption {
                reason: "AES-KW wrap failed".into(),
            })
    }

    /// Unwrap a previously wrapped key. Fails with `Unwrap` on any
    /// integrity mismatch.
    pub fn unwrap(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        KekAes256::from(*self.0.as_bytes())
            .unwrap_vec(wrapped)
            .map(Zeroizing::new)
            .map_err(|_| Error::Unwrap)
    }
}

/// A hybrid-encrypted content key.
///
/// Wire form is base64 of `{"kemCiphertext": b64, "wrappedKey": b64}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(with = "wire::b64")]
    kem_ciphertext: Vec<u8>,
    #[serde(with = "wire::b64")]
    wrapped_key: Vec<u8>,
}

impl Envelope {
    /// Assemble an envelope from transport parts.
    pub fn from_parts(kem_ciphertext: Vec<u8>, wrapped_key: Vec<u8>) -> Self {
        Self {
            kem_ciphertext,
            wrapped_key,
        }
    }

    pub fn kem_ciphertext(&self) -> &[u8] {
        &self.kem_ciphertext
    }

    pub fn wrapped_key(&self) -> &[u8] {
        &self.wrapped_key
    }

    pub fn to_wire(&self) -> Result<String> {
        wire::encode(self)
    }

    pub fn from_wire(data: &str) -> Result<Self> {
        wire::decode(data)
    }
}

/// A recipient's public keys for envelope wrapping.
pub struct RecipientKeys<'a> {
    pub ecdh: &'a EcdhPublicKey,
    pub kem: &'a KemPublicKey,
}

/// Wrap `content_key` for one recipient.
pub fn wrap_content_key(
    content_key: &[u8; KEY_LEN],
    own_ecdh: &EcdhSecretKey,
    recipient: &RecipientKeys<'_>,
) -> Result<Envelope> {
    wrap_inner(content_key, own_ecdh, recipient)
        .map_err(|e| e.in_operation("failed to encrypt mail key via hybrid encryption"))
}

fn wrap_inner(
    content_key: &[u8; KEY_LEN],
    own_ecdh: &EcdhSecretKey,
    recipient: &RecipientKeys<'_>,
) -> Result<Envelope> {
    let ecc_secret = derive_shared_bits(recipient.ecdh, own_ecdh)?;
    let (kem_ciphertext, kem_secret) = kem::encapsulate(recipient.kem)?;

    let wrapping_key = derive_wrapping_key(&kem_secret, &ecc_secret)?;
    let wrapped_key = wrapping_key.wrap(content_key)?;

    Ok(Envelope {
        kem_ciphertext,
        wrapped_key,
    })
}

/// Unwrap a content key addressed to us.
///
/// A wrong peer, a tampered ciphertext or a wrong key all surface as the
/// same `Unwrap` failure at the final step; there is no earlier signal.
pub fn unwrap_content_key(
    envelope: &Envelope,
    own_ecdh: &EcdhSecretKey,
    sender_ecdh: &EcdhPublicKey,
    own_kem: &KemSecretKey,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    unwrap_inner(envelope, own_ecdh, sender_ecdh, own_kem)
        .map_err(|e| e.in_operation("failed to decrypt mail key via hybrid encryption"))
}

fn unwrap_inner(
    envelope: &Envelope,
    own_ecdh: &EcdhSecretKey,
    sender_ecdh: &EcdhPublicKey,
    own_kem: &KemSecretKey,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let ecc_secret = derive_shared_bits(sender_ecdh, own_ecdh)?;
    let kem_secret = kem::decapsulate(&envelope.kem_ciphertext, own_kem)?;

    let wrapping_key = derive_wrapping_key(&kem_secret, &ecc_secret)?;
    let unwrapped = wrapping_key.unwrap(&envelope.wrapped_key)?;
    if unwrapped.len() != KEY_LEN {
        return Err(Error::Unwrap);
    }

    let mut content_key = Zeroizing::new([0u8; KEY_LEN]);
    content_key.copy_from_slice(&unwrapped);
    Ok(content_key)
}

/// Wrap the same content key for several recipients.
///
/// Each wrap depends only on that recipient's keys, so the loop body is
/// safe to run concurrently for large recipient lists.
pub fn wrap_for_recipients(
    content_key: &[u8; KEY_LEN],
    own_ecdh: &EcdhSecretKey,
    recipients: &[RecipientKeys<'_>],
) -> Result<Vec<Envelope>> {
    debug!(recipients = recipients.len(), "wrapping content key");
    recipients
        .iter()
        .map(|recipient| wrap_content_key(content_key, own_ecdh, recipient))
        .collect()
}

/// A content key wrapped under a pre-shared passphrase instead of public
/// keys. The salt and cost parameters travel with the envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordEnvelope {
    #[serde(with = "wire::b64")]
    wrapped_key: Vec<u8>,
    #[serde(with = "wire::b64")]
    salt: Vec<u8>,
    params: PasswordParams,
}

impl PasswordEnvelope {
    pub fn to_wire(&self) -> Result<String> {
        wire::encode(self)
    }

    pub fn from_wire(data: &str) -> Result<Self> {
        wire::decode(data)
    }
}

/// Wrap `content_key` under a passphrase shared out of band.
pub fn wrap_with_password(
    content_key: &[u8; KEY_LEN],
    passphrase: &str,
    params: PasswordParams,
) -> Result<PasswordEnvelope> {
    let salt = sample_salt()?;
    let derived = derive_from_password(passphrase, &salt, params)
        .map_err(|e| e.in_operation("failed to encrypt mail key via shared passphrase"))?;

    let wrapping_key = WrappingKey::new(SharedSecret::from_bytes(derived));
    let wrapped_key = wrapping_key
        .wrap(content_key)
        .map_err(|e| e.in_operation("failed to encrypt mail key via shared passphrase"))?;

    Ok(PasswordEnvelope {
        wrapped_key,
        salt: salt.to_vec(),
        params,
    })
}

/// Unwrap a passphrase-protected content key.
pub fn unwrap_with_password(
    envelope: &PasswordEnvelope,
    passphrase: &str,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let derived = derive_from_password(passphrase, &envelope.salt, envelope.params)
        .map_err(|e| e.in_operation("failed to decrypt mail key via shared passphrase"))?;

    let wrapping_key = WrappingKey::new(SharedSecret::from_bytes(derived));
    let unwrapped = wrapping_key
        .unwrap(&envelope.wrapped_key)
        .map_err(|e| e.in_operation("failed to decrypt mail key via shared passphrase"))?;
    if unwrapped.len() != KEY_LEN {
        return Err(Error::Unwrap);
    }

    let mut content_key = Zeroizing::new([0u8; KEY_LEN]);
    content_key.copy_from_slice(&unwrapped);
    Ok(content_key)
}

fn derive_wrapping_key(
    kem_secret: &SharedSecret,
    ecc_secret: &SharedSecret,
) -> Result<WrappingKey> {
    // KEM secret first, classical secret second. Fixed by the protocol.
    let combined = combine_two_secrets(
        kem_secret.as_bytes(),
        ecc_secret.as_bytes(),
        context::ENVELOPE_WRAP,
    )?;
    Ok(WrappingKey::new(combined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ecdh::EcdhKeyPair;
    use crate::crypto::kem::{KemKeyPair, KemLevel};

    #[test]
    fn wrapping_key_round_trips() {
        let key = WrappingKey::new(SharedSecret::from_bytes([5u8; KEY_LEN]));
        let content = [7u8; KEY_LEN];

        let wrapped = key.wrap(&content).unwrap();
        // AES-KW adds an 8-byte integrity block.
        assert_eq!(wrapped.len(), KEY_LEN + 8);

        let unwrapped = key.unwrap(&wrapped).unwrap();
        assert_eq!(&*unwrapped, &content);
    }

    #[test]
    fn wrapping_key_rejects_tampering() {
        let key = WrappingKey::new(SharedSecret::from_bytes([5u8; KEY_LEN]));
        let mut wrapped = key.wrap(&[7u8; KEY_LEN]).unwrap();
        wrapped[3] ^= 0x01;

        assert!(matches!(key.unwrap(&wrapped), Err(Error::Unwrap)));
    }

    #[test]
    fn envelope_wire_format_uses_camel_case_base64() {
        let envelope = Envelope {
            kem_ciphertext: vec![1, 2, 3],
            wrapped_key: vec![4, 5, 6],
        };

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"kemCiphertext\":\"AQID\""));
        assert!(json.contains("\"wrappedKey\":\"BAUG\""));

        let wire = envelope.to_wire().unwrap();
        let parsed = Envelope::from_wire(&wire).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn sender_and_recipient_derive_the_same_wrapping_key() {
        let alice_ecdh = EcdhKeyPair::generate().unwrap();
        let bob_ecdh = EcdhKeyPair::generate().unwrap();
        let bob_kem = KemKeyPair::generate(KemLevel::MlKem768).unwrap();

        let (kem_ct, kem_secret) = kem::encapsulate(&bob_kem.public).unwrap();

        let sender_ecc = derive_shared_bits(&bob_ecdh.public, &alice_ecdh.secret).unwrap();
        let recipient_ecc = derive_shared_bits(&alice_ecdh.public, &bob_ecdh.secret).unwrap();
        let recipient_kem_secret = kem::decapsulate(&kem_ct, &bob_kem.secret).unwrap();

        let sender_key = derive_wrapping_key(&kem_secret, &sender_ecc).unwrap();
        let recipient_key = derive_wrapping_key(&recipient_kem_secret, &recipient_ecc).unwrap();

        assert_eq!(sender_key.0.as_bytes(), recipient_key.0.as_bytes());
    }
}
