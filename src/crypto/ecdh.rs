//! X25519 key agreement.
//!
//! The classical half of the hybrid scheme. Keys are usable only for
//! shared-secret derivation; signing uses a separate key family.

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use super::{secure_random, SharedSecret, KEY_LEN};
use crate::error::{Error, Result};

/// X25519 public key (32 bytes).
#[derive(Clone)]
pub struct EcdhPublicKey(PublicKey);

/// X25519 secret key. Zeroized on drop by the underlying type.
#[derive(Clone)]
pub struct EcdhSecretKey(StaticSecret);

/// An X25519 keypair.
pub struct EcdhKeyPair {
    pub public: EcdhPublicKey,
    pub secret: EcdhSecretKey,
}

impl EcdhPublicKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(PublicKey::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        self.0.as_bytes()
    }
}

impl EcdhSecretKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    pub fn to_bytes(&self) -> [u8; KEY_LEN] {
        self.0.to_bytes()
    }

    /// The public key matching this secret.
    pub fn public(&self) -> EcdhPublicKey {
        EcdhPublicKey(PublicKey::from(&self.0))
    }
}

impl EcdhKeyPair {
    /// Generate a fresh keypair from the OS random source.
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; KEY_LEN];
        secure_random(&mut seed)?;
        let secret = EcdhSecretKey::from_bytes(seed);
        seed.zeroize();

        let public = secret.public();
        Ok(Self { public, secret })
    }
}

/// Derive the 32-byte shared secret between `own` and `peer`.
///
/// Fails with `KeyAgreement` when the peer key does not contribute to the
/// result (a low-order or otherwise incompatible point yields an all-zero
/// secret).
pub fn derive_shared_bits(peer: &EcdhPublicKey, own: &EcdhSecretKey) -> Result<SharedSecret> {
    let shared = own.0.diffie_hellman(&peer.0);
    if !shared.was_contributory() {
        return Err(Error::KeyAgreement {
            reason: "peer public key is incompatible with own key (non-contributory result)"
                .into(),
        });
    }
    Ok(SharedSecret::from_bytes(*shared.as_bytes()))
}
