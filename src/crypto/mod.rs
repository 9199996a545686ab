//! Cryptographic primitives for the envelope and keystore engines.
//!
//! Provides classical and post-quantum key agreement, context-bound key
//! derivation, password stretching and authenticated encryption.

pub mod aead;
pub mod ecdh;
pub mod kdf;
pub mod kem;
pub mod password;

pub use aead::{decrypt, encrypt, AeadCiphertext};
pub use ecdh::{derive_shared_bits, EcdhKeyPair, EcdhPublicKey, EcdhSecretKey};
pub use kdf::{combine_two_secrets, compute_mac, derive_context_key, DerivedKey};
pub use kem::{KemKeyPair, KemLevel, KemPublicKey, KemSecretKey};
pub use password::{derive_from_password, sample_salt, PasswordParams};

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Length of every symmetric key and shared secret (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the AEAD IV (16 bytes).
pub const IV_LEN: usize = 16;
/// Length of the random field of the IV (12 bytes / 96 bits).
pub const IV_RANDOM_LEN: usize = 12;
/// Length of the password salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the hashed associated-data slot (16 bytes / 128 bits).
pub const AAD_LEN: usize = 16;
/// Length of a deterministic KEM generation seed (64 bytes).
pub const KEM_SEED_LEN: usize = 64;

/// Fill buffer with cryptographically secure random bytes
pub(crate) fn secure_random(buf: &mut [u8]) -> Result<()> {
    getrandom::fill(buf).map_err(|_| Error::KeyGen {
        reason: "OS random generator unavailable".into(),
    })
}

/// A 32-byte shared secret from key agreement or KEM encapsulation.
///
/// Zeroized on drop; never serialized.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; KEY_LEN]);

impl SharedSecret {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}
