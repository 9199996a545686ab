//! AES-256-GCM with a constructed 16-byte IV and hashed associated data.
//!
//! IV construction follows the RBG-based scheme of NIST SP 800-38D §8.2.2:
//! the high 12 bytes are always fresh random, the low 4 bytes hold a hash
//! of an optional free-field value (a message id or counter), or more
//! randomness when no free field is supplied. The random field dominates
//! collision risk, so a shared free field never causes IV reuse.
//!
//! The associated data is not the caller's `aux` string itself but its
//! 128-bit hash, normalizing metadata of any length into a fixed AAD slot.

use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{aes::Aes256, AesGcm, Key, Nonce};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{secure_random, DerivedKey, AAD_LEN, IV_LEN, IV_RANDOM_LEN};
use crate::error::{Error, Result};

/// AES-256-GCM parameterized over the 16-byte IV.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// An authenticated ciphertext and the IV it was produced under.
///
/// Serialized as `ciphertext || iv` with the 16-byte IV appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AeadCiphertext {
    ciphertext: Vec<u8>,
    iv: [u8; IV_LEN],
}

impl AeadCiphertext {
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Serialize as `ciphertext || iv`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.ciphertext.len() + IV_LEN);
        buf.extend_from_slice(&self.ciphertext);
        buf.extend_from_slice(&self.iv);
        buf
    }

    /// Parse `ciphertext || iv`. The ciphertext carries at least the GCM tag.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < IV_LEN {
            return Err(Error::Encoding {
                reason: format!("sealed blob too short: {} bytes", data.len()),
            });
        }
        let split = data.len() - IV_LEN;
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&data[split..]);
        Ok(Self {
            ciphertext: data[..split].to_vec(),
            iv,
        })
    }
}

/// Build a 16-byte IV: 12 random bytes, then 4 bytes of free-field hash
/// (or 4 more random bytes when no free field is given).
pub fn create_iv(free_field: Option<&str>) -> Result<[u8; IV_LEN]> {
    let mut iv = [0u8; IV_LEN];
    match free_field {
        Some(value) => {
            secure_random(&mut iv[..IV_RANDOM_LEN])?;
            let digest = Sha256::digest(value.as_bytes());
            iv[IV_RANDOM_LEN..].copy_from_slice(&digest[..IV_LEN - IV_RANDOM_LEN]);
        }
        None => secure_random(&mut iv)?,
    }
    Ok(iv)
}

fn aad_hash(aux: &str) -> [u8; AAD_LEN] {
    let digest = Sha256::digest(aux.as_bytes());
    let mut aad = [0u8; AAD_LEN];
    aad.copy_from_slice(&digest[..AAD_LEN]);
    aad
}

/// Encrypt `plaintext` under `key`, binding the hash of `aux` as
/// associated data.
pub fn encrypt(
    key: &DerivedKey,
    plaintext: &[u8],
    aux: &str,
    free_field: Option<&str>,
) -> Result<AeadCiphertext> {
    let iv = create_iv(free_field)?;
    let aad = aad_hash(aux);

    let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| Error::Encryption {
            reason: "AEAD encryption failed".into(),
        })?;

    Ok(AeadCiphertext { ciphertext, iv })
}

/// Decrypt and authenticate. Fails with `AuthenticationFailure` on any tag
/// mismatch (wrong key, wrong aux or corrupted ciphertext) and never
/// returns partial output.
pub fn decrypt(key: &DerivedKey, sealed: &AeadCiphertext, aux: &str) -> Result<Zeroizing<Vec<u8>>> {
    let aad = aad_hash(aux);

    let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&sealed.iv),
            Payload {
                msg: &sealed.ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| Error::AuthenticationFailure)?;

    Ok(Zeroizing::new(plaintext))
}
