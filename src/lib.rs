//! Hybrid envelope key wrapping and keystore protection for an
//! end-to-end encrypted mail client.
//!
//! The crate covers the security core of the client:
//!
//! - [`crypto`] holds the primitives: X25519 key agreement, ML-KEM
//!   encapsulation, the context-bound keyed-hash engine, Argon2id password
//!   stretching and AES-256-GCM with a constructed 16-byte IV.
//! - [`envelope`] wraps per-message content keys under a hybrid
//!   (classical + post-quantum) wrapping key, or under a pre-shared
//!   passphrase.
//! - [`keystore`] protects long-term key material under a password-derived
//!   session key and, independently, under a recovery code; both paths
//!   open to the same plaintext.
//! - [`recovery`] encodes the recovery secret as a 24-word mnemonic.
//!
//! All operations are stateless pure functions over their inputs. Secrets
//! are zeroized on drop and never logged; failure reporting is a single
//! structured [`error::Error`] taxonomy that keeps authentication failures
//! free of oracle-friendly detail.

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keystore;
pub mod recovery;
mod wire;

pub use crate::crypto::{
    combine_two_secrets, compute_mac, derive_context_key, derive_from_password,
    derive_shared_bits, sample_salt, AeadCiphertext, DerivedKey, EcdhKeyPair, EcdhPublicKey,
    EcdhSecretKey, KemKeyPair, KemLevel, KemPublicKey, KemSecretKey, PasswordParams, SharedSecret,
};
pub use crate::envelope::{
    unwrap_content_key, unwrap_with_password, wrap_content_key, wrap_for_recipients,
    wrap_with_password, Envelope, PasswordEnvelope, RecipientKeys, WrappingKey,
};
pub use crate::error::{Error, Result};
pub use crate::keystore::{KeyBundle, Keystore, KeystoreKind, SessionKey};
pub use crate::recovery::RecoveryCode;
