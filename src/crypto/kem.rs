//! ML-KEM (FIPS 203) key encapsulation.
//!
//! The post-quantum half of the hybrid scheme. The security level is chosen
//! at key construction time and carried by every key, so a single code path
//! serves ML-KEM-512, -768 and -1024.
//!
//! Decapsulation uses implicit rejection: a wrong secret key yields a
//! *different* shared secret instead of an error, so callers must never
//! branch on decapsulation output as a success signal. The only observable
//! failure is the final unwrap of whatever the secret protects.

use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{
    Ciphertext, Encoded, EncapsulateDeterministic, EncodedSizeUser, KemCore, MlKem1024, MlKem512,
    MlKem768, B32,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{SharedSecret, KEM_SEED_LEN, KEY_LEN};
use crate::error::{Error, Result};

/// ML-KEM parameter set, fixed per keypair at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KemLevel {
    #[serde(rename = "ml-kem-512")]
    MlKem512,
    #[serde(rename = "ml-kem-768")]
    MlKem768,
    #[serde(rename = "ml-kem-1024")]
    MlKem1024,
}

impl KemLevel {
    /// Encapsulation key length in bytes.
    pub fn public_key_len(self) -> usize {
        match self {
            KemLevel::MlKem512 => 800,
            KemLevel::MlKem768 => 1184,
            KemLevel::MlKem1024 => 1568,
        }
    }

    /// Decapsulation key length in bytes.
    pub fn secret_key_len(self) -> usize {
        match self {
            KemLevel::MlKem512 => 1632,
            KemLevel::MlKem768 => 2400,
            KemLevel::MlKem1024 => 3168,
        }
    }

    /// Ciphertext length in bytes.
    pub fn ciphertext_len(self) -> usize {
        match self {
            KemLevel::MlKem512 => 768,
            KemLevel::MlKem768 => 1088,
            KemLevel::MlKem1024 => 1568,
        }
    }
}

/// ML-KEM encapsulation key.
#[derive(Clone, PartialEq, Eq)]
pub struct KemPublicKey {
    level: KemLevel,
    bytes: Vec<u8>,
}

/// ML-KEM decapsulation key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KemSecretKey {
    #[zeroize(skip)]
    level: KemLevel,
    bytes: Vec<u8>,
}

/// An ML-KEM keypair.
pub struct KemKeyPair {
    pub public: KemPublicKey,
    pub secret: KemSecretKey,
}

/// Result of re-deriving a keypair from a recovered seed.
pub struct KemKeyMatch {
    pub keypair: KemKeyPair,
    /// Whether the derived encapsulation key equals the expected one.
    pub matches: bool,
}

impl KemPublicKey {
    pub fn from_bytes(level: KemLevel, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != level.public_key_len() {
            return Err(Error::Encoding {
                reason: format!(
                    "KEM public key must be {} bytes, got {}",
                    level.public_key_len(),
                    bytes.len()
                ),
            });
        }
        Ok(Self { level, bytes })
    }

    pub fn level(&self) -> KemLevel {
        self.level
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl KemSecretKey {
    pub fn from_bytes(level: KemLevel, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != level.secret_key_len() {
            return Err(Error::Encoding {
                reason: format!(
                    "KEM secret key must be {} bytes, got {}",
                    level.secret_key_len(),
                    bytes.len()
                ),
            });
        }
        Ok(Self { level, bytes })
    }

    pub fn level(&self) -> KemLevel {
        self.level
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

macro_rules! dispatch {
    ($level:expr, $f:ident ( $($arg:expr),* )) => {
        match $level {
            KemLevel::MlKem512 => $f::<MlKem512>($($arg),*),
            KemLevel::MlKem768 => $f::<MlKem768>($($arg),*),
            KemLevel::MlKem1024 => $f::<MlKem1024>($($arg),*),
        }
    };
}

impl KemKeyPair {
    /// Generate a fresh keypair; randomness differs across calls.
    pub fn generate(level: KemLevel) -> Result<Self> {
        let (public, secret) = dispatch!(level, generate_inner());
        Self::from_parts(level, public, secret)
    }

    /// Generate a keypair deterministically from a 64-byte seed.
    ///
    /// The same seed always yields a byte-identical keypair; this is what
    /// lets a keypair be re-derived from a recovered secret.
    pub fn from_seed(level: KemLevel, seed: &[u8; KEM_SEED_LEN]) -> Result<Self> {
        let mut d = [0u8; 32];
        let mut z = [0u8; 32];
        d.copy_from_slice(&seed[..32]);
        z.copy_from_slice(&seed[32..]);
        let d: B32 = d.into();
        let z: B32 = z.into();

        let (public, secret) = dispatch!(level, from_seed_inner(&d, &z));
        Self::from_parts(level, public, secret)
    }

    fn from_parts(level: KemLevel, public: Vec<u8>, secret: Vec<u8>) -> Result<Self> {
        Ok(Self {
            public: KemPublicKey::from_bytes(level, public)?,
            secret: KemSecretKey::from_bytes(level, secret)?,
        })
    }
}

/// Encapsulate against `public`, yielding the ciphertext and the shared
/// secret. Fails with `Encapsulation` on a malformed public key.
pub fn encapsulate(public: &KemPublicKey) -> Result<(Vec<u8>, SharedSecret)> {
    let (ciphertext, secret) = dispatch!(public.level, encapsulate_inner(&public.bytes))?;
    Ok((ciphertext, SharedSecret::from_bytes(secret)))
}

/// Recover the shared secret from `ciphertext`. Fails with `Decapsulation`
/// only on malformed input; a wrong key still succeeds (implicit rejection).
pub fn decapsulate(ciphertext: &[u8], secret: &KemSecretKey) -> Result<SharedSecret> {
    if ciphertext.len() != secret.level.ciphertext_len() {
        return Err(Error::Decapsulation {
            reason: format!(
                "ciphertext must be {} bytes, got {}",
                secret.level.ciphertext_len(),
                ciphertext.len()
            ),
        });
    }
    let shared = dispatch!(secret.level, decapsulate_inner(ciphertext, &secret.bytes))?;
    Ok(SharedSecret::from_bytes(shared))
}

/// Re-derive a keypair from `seed` and report whether its public key equals
/// `expected_public`. Used when verifying a peer key recovered out of band.
pub fn derive_and_verify(
    level: KemLevel,
    seed: &[u8; KEM_SEED_LEN],
    expected_public: &KemPublicKey,
) -> Result<KemKeyMatch> {
    let keypair = KemKeyPair::from_seed(level, seed)?;
    let matches = *expected_public == keypair.public;
    Ok(KemKeyMatch { keypair, matches })
}

fn generate_inner<K: KemCore>() -> (Vec<u8>, Vec<u8>) {
    let (dk, ek) = K::generate(&mut OsRng);
    (
        ek.as_bytes().as_slice().to_vec(),
        dk.as_bytes().as_slice().to_vec(),
    )
}

fn from_seed_inner<K: KemCore>(d: &B32, z: &B32) -> (Vec<u8>, Vec<u8>) {
    let (dk, ek) = K::generate_deterministic(d, z);
    (
        ek.as_bytes().as_slice().to_vec(),
        dk.as_bytes().as_slice().to_vec(),
    )
}

fn encapsulate_inner<K: KemCore>(public: &[u8]) -> Result<(Vec<u8>, [u8; KEY_LEN])> {
    let encoded =
        Encoded::<K::EncapsulationKey>::try_from(public).map_err(|_| Error::Encapsulation {
            reason: "malformed encapsulation key".into(),
        })?;
    let ek = K::EncapsulationKey::from_bytes(&encoded);

    let (ciphertext, shared) = ek.encapsulate(&mut OsRng).map_err(|e| Error::Encapsulation {
        reason: format!("{e:?}"),
    })?;

    let mut secret = [0u8; KEY_LEN];
    secret.copy_from_slice(shared.as_slice());
    Ok((ciphertext.as_slice().to_vec(), secret))
}

fn decapsulate_inner<K: KemCore>(ciphertext: &[u8], secret: &[u8]) -> Result<[u8; KEY_LEN]> {
    let encoded =
        Encoded::<K::DecapsulationKey>::try_from(secret).map_err(|_| Error::Decapsulation {
            reason: "malformed decapsulation key".into(),
        })?;
    let dk = K::DecapsulationKey::from_bytes(&encoded);

    let ct = Ciphertext::<K>::try_from(ciphertext).map_err(|_| Error::Decapsulation {
        reason: "malformed ciphertext".into(),
    })?;

    let shared = dk.decapsulate(&ct).map_err(|e| Error::Decapsulation {
        reason: format!("{e:?}"),
    })?;

    let mut out = [0u8; KEY_LEN];
    out.copy_from_slice(shared.as_slice());
    Ok(out)
}

/// Explicit-randomness encapsulation for protocol experiments.
///
/// Not part of the production contract: when the caller controls the
/// encapsulation randomness, ciphertext plus public data can leak
/// information about it. Production envelopes must use [`encapsulate`].
pub mod internal {
    use super::*;

    /// Encapsulate with caller-supplied randomness. Deterministic: the same
    /// `(public, randomness)` pair yields the same ciphertext and secret.
    pub fn encapsulate_with_randomness(
        public: &KemPublicKey,
        randomness: &[u8; 32],
    ) -> Result<(Vec<u8>, SharedSecret)> {
        let m: B32 = (*randomness).into();
        let (ciphertext, secret) =
            dispatch!(public.level(), encapsulate_seeded_inner(public.as_bytes(), &m))?;
        Ok((ciphertext, SharedSecret::from_bytes(secret)))
    }

    fn encapsulate_seeded_inner<K: KemCore>(
        public: &[u8],
        m: &B32,
    ) -> Result<(Vec<u8>, [u8; KEY_LEN])> {
        let encoded =
            Encoded::<K::EncapsulationKey>::try_from(public).map_err(|_| Error::Encapsulation {
                reason: "malformed encapsulation key".into(),
            })?;
        let ek = K::EncapsulationKey::from_bytes(&encoded);

        let (ciphertext, shared) =
            ek.encapsulate_deterministic(m)
                .map_err(|e| Error::Encapsulation {
                    reason: format!("{e:?}"),
                })?;

        let mut secret = [0u8; KEY_LEN];
        secret.copy_from_slice(shared.as_slice());
        Ok((ciphertext.as_slice().to_vec(), secret))
    }
}
