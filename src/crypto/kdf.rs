//! Keyed-hash engine: context-bound key derivation, secret combination
//! and MAC computation.
//!
//! Every derivation is anchored on a hardcoded context literal from
//! [`context`]. Two keys derived from the same base under different
//! contexts are computationally independent, which is what makes it safe
//! to feed one session secret into several protection schemes.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{SharedSecret, KEY_LEN};
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Context-string constants. Part of the wire contract: interoperating
/// implementations must use byte-identical strings, and no constant may
/// ever be reused for a second purpose.
pub mod context {
    /// Protects the login/identity keystore.
    pub const IDENTITY_KEYSTORE: &str = "mailseal.keystore.identity.v1";
    /// Protects the mail-encryption keystore.
    pub const ENCRYPTION_KEYSTORE: &str = "mailseal.keystore.encryption.v1";
    /// Protects the search-index keystore.
    pub const INDEX_KEYSTORE: &str = "mailseal.keystore.index.v1";
    /// Protects the account-recovery keystore.
    pub const ACCOUNT_RECOVERY: &str = "mailseal.keystore.recovery.v1";
    /// Combines the KEM and classical secrets into an envelope wrapping key.
    pub const ENVELOPE_WRAP: &str = "mailseal.envelope.wrap.v1";
}

/// A 32-byte symmetric key bound to a single derivation context,
/// usable for AEAD encryption. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DerivedKey([REDACTED])")
    }
}

/// Derive a context-bound key from a 32-byte base secret.
///
/// Two passes: the context string is hashed to a fixed-length binding
/// value, which then keys an HMAC over the base secret. Fails with
/// `Derivation` on an empty context.
pub fn derive_context_key(context: &str, base: &[u8; KEY_LEN]) -> Result<DerivedKey> {
    if context.is_empty() {
        return Err(Error::Derivation {
            reason: "derivation context must not be empty".into(),
        });
    }

    let binding = Sha256::digest(context.as_bytes());
    let mut mac = new_mac(&binding)?;
    mac.update(base);

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(DerivedKey(key))
}

/// Combine two 32-byte secrets into one under a context.
///
/// `first` keys the HMAC; `context` and `second` are the message, in that
/// order. Order is part of the protocol: envelope wrapping feeds the KEM
/// secret as `first` and the classical secret as `second`, and a swapped
/// order yields an unrelated key with no signal before the final unwrap.
pub fn combine_two_secrets(first: &[u8], second: &[u8], context: &str) -> Result<SharedSecret> {
    if first.len() != KEY_LEN || second.len() != KEY_LEN {
        return Err(Error::Derivation {
            reason: format!(
                "secrets must be exactly {KEY_LEN} bytes, got {} and {}",
                first.len(),
                second.len()
            ),
        });
    }
    if context.is_empty() {
        return Err(Error::Derivation {
            reason: "derivation context must not be empty".into(),
        });
    }

    let mut mac = new_mac(first)?;
    mac.update(context.as_bytes());
    mac.update(second);

    let mut combined = [0u8; KEY_LEN];
    combined.copy_from_slice(&mac.finalize().into_bytes());
    Ok(SharedSecret::from_bytes(combined))
}

/// Compute a hex-encoded MAC over `chunks` in order, keyed by a 256-bit
/// key derived from `key_material`.
pub fn compute_mac(key_material: &str, chunks: &[&[u8]]) -> Result<String> {
    let key = Sha256::digest(key_material.as_bytes());
    let mut mac = new_mac(&key)?;
    for chunk in chunks {
        mac.update(chunk);
    }
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn new_mac(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|e| Error::Derivation {
        reason: format!("HMAC key setup failed: {e}"),
    })
}
