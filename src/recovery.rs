//! Recovery codes: a 24-word mnemonic encoding of a 32-byte secret.
//!
//! The code is an independent unlock path for protected key material,
//! generated once at enrollment and written down by the user. It cannot be
//! rederived from the password.

use bip39::Mnemonic;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::KEY_LEN;
use crate::error::{Error, Result};

/// Number of words in a recovery code (256 bits of entropy).
pub const WORD_COUNT: usize = 24;

/// A human-writable recovery code.
pub struct RecoveryCode {
    mnemonic: Mnemonic,
}

impl RecoveryCode {
    /// Generate a fresh code from 32 random bytes.
    pub fn generate() -> Result<Self> {
        let mut entropy = [0u8; KEY_LEN];
        crate::crypto::secure_random(&mut entropy)?;

        let mnemonic = Mnemonic::from_entropy(&entropy).map_err(|e| Error::KeyGen {
            reason: format!("failed to encode recovery code: {e}"),
        })?;
        entropy.zeroize();

        Ok(Self { mnemonic })
    }

    /// Parse a code the user typed back in. Validates the wordlist, the
    /// checksum and the word count.
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        let mnemonic =
            Mnemonic::parse_normalized(phrase).map_err(|e| Error::InvalidRecoveryCode {
                reason: e.to_string(),
            })?;

        if mnemonic.word_count() != WORD_COUNT {
            return Err(Error::InvalidRecoveryCode {
                reason: format!(
                    "expected {WORD_COUNT} words, got {}",
                    mnemonic.word_count()
                ),
            });
        }

        Ok(Self { mnemonic })
    }

    /// The phrase as a single space-separated string. Display once to the
    /// user; never log or store.
    pub fn phrase(&self) -> String {
        self.mnemonic.to_string()
    }

    /// The 32-byte secret this code encodes.
    pub fn secret(&self) -> Zeroizing<[u8; KEY_LEN]> {
        let entropy = self.mnemonic.to_entropy();
        let mut secret = Zeroizing::new([0u8; KEY_LEN]);
        secret.copy_from_slice(&entropy);
        secret
    }
}

impl std::fmt::Debug for RecoveryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoveryCode([REDACTED])")
    }
}
