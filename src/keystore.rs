//! Keystore protection: long-term key material encrypted under a session
//! key or, independently, under a recovery code.
//!
//! Both unlock paths decrypt to the same plaintext bundle. The associated
//! data of every payload binds the owner id and the keystore kind, so a
//! ciphertext moved onto another owner's record or another kind fails
//! authentication instead of decrypting into the wrong slot.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::aead::{self, AeadCiphertext};
use crate::crypto::ecdh::EcdhSecretKey;
use crate::crypto::kdf::{context, derive_context_key, DerivedKey};
use crate::crypto::kem::{KemLevel, KemSecretKey};
use crate::crypto::password::{derive_from_password, PasswordParams};
use crate::crypto::KEY_LEN;
use crate::error::{Error, Result};
use crate::recovery::RecoveryCode;
use crate::wire;

/// What a keystore protects. Each kind derives its protection key under its
/// own context, so a key for one kind is useless for any other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeystoreKind {
    Identity,
    Encryption,
    Recovery,
    Index,
}

impl KeystoreKind {
    /// The derivation context anchoring this kind.
    pub fn context(self) -> &'static str {
        match self {
            KeystoreKind::Identity => context::IDENTITY_KEYSTORE,
            KeystoreKind::Encryption => context::ENCRYPTION_KEYSTORE,
            KeystoreKind::Recovery => context::ACCOUNT_RECOVERY,
            KeystoreKind::Index => context::INDEX_KEYSTORE,
        }
    }

    /// Stable name used on the wire and inside the associated data.
    pub fn wire_name(self) -> &'static str {
        match self {
            KeystoreKind::Identity => "identity",
            KeystoreKind::Encryption => "encryption",
            KeystoreKind::Recovery => "recovery",
            KeystoreKind::Index => "index",
        }
    }
}

/// The caller-supplied base secret for keystore protection, typically the
/// password-derived login secret. Passed explicitly into every operation;
/// the crate keeps no ambient session state.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a session key by stretching a password.
    pub fn from_password(password: &str, salt: &[u8], params: PasswordParams) -> Result<Self> {
        Ok(Self(derive_from_password(password, salt, params)?))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey([REDACTED])")
    }
}

/// An encrypted keystore record.
///
/// Wire form is base64 of `{"ownerId", "kind", "payload": b64(ct || iv)}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keystore {
    owner_id: String,
    kind: KeystoreKind,
    #[serde(with = "payload_b64")]
    payload: AeadCiphertext,
}

impl Keystore {
    /// Encrypt `payload` for `owner_id` under the session key.
    pub fn protect(
        owner_id: &str,
        kind: KeystoreKind,
        payload: &[u8],
        session: &SessionKey,
    ) -> Result<Self> {
        debug!(owner_id, kind = kind.wire_name(), "protecting keystore");
        let key = derive_context_key(kind.context(), &session.0)
            .map_err(|e| e.in_operation("failed to derive keystore protection key"))?;
        Self::seal(owner_id, kind, payload, &key)
    }

    /// Encrypt the same `payload` as a second, independently unlockable
    /// record of kind `Recovery`.
    pub fn protect_with_recovery(
        owner_id: &str,
        payload: &[u8],
        code: &RecoveryCode,
    ) -> Result<Self> {
        debug!(owner_id, "protecting recovery keystore");
        let key = recovery_key(code)
            .map_err(|e| e.in_operation("failed to derive recovery protection key"))?;
        Self::seal(owner_id, KeystoreKind::Recovery, payload, &key)
    }

    /// Decrypt this keystore with the session key.
    pub fn open(&self, session: &SessionKey) -> Result<Zeroizing<Vec<u8>>> {
        debug!(
            owner_id = %self.owner_id,
            kind = self.kind.wire_name(),
            "opening keystore"
        );
        let key = derive_context_key(self.kind.context(), &session.0)
            .map_err(|e| e.in_operation("failed to derive keystore protection key"))?;
        self.unseal(&key)
    }

    /// Decrypt this keystore with a recovery code.
    pub fn open_with_recovery(&self, code: &RecoveryCode) -> Result<Zeroizing<Vec<u8>>> {
        debug!(owner_id = %self.owner_id, "opening keystore via recovery code");
        let key = recovery_key(code)
            .map_err(|e| e.in_operation("failed to derive recovery protection key"))?;
        self.unseal(&key)
    }

    /// Re-encrypt under a new session key. The only sanctioned mutation of
    /// a keystore; everything else is create or destroy.
    pub fn rotate(&self, old: &SessionKey, new: &SessionKey) -> Result<Self> {
        let payload = self.open(old)?;
        Self::protect(&self.owner_id, self.kind, &payload, new)
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn kind(&self) -> KeystoreKind {
        self.kind
    }

    pub fn payload(&self) -> &AeadCiphertext {
        &self.payload
    }

    pub fn to_wire(&self) -> Result<String> {
        wire::encode(self)
    }

    pub fn from_wire(data: &str) -> Result<Self> {
        wire::decode(data)
    }

    fn seal(owner_id: &str, kind: KeystoreKind, payload: &[u8], key: &DerivedKey) -> Result<Self> {
        let payload = aead::encrypt(key, payload, &aux(owner_id, kind), Some(owner_id))
            .map_err(|e| e.in_operation("failed to encrypt keystore payload"))?;
        Ok(Self {
            owner_id: owner_id.to_string(),
            kind,
            payload,
        })
    }

    fn unseal(&self, key: &DerivedKey) -> Result<Zeroizing<Vec<u8>>> {
        aead::decrypt(key, &self.payload, &aux(&self.owner_id, self.kind))
            .map_err(|e| e.in_operation("failed to decrypt keystore payload"))
    }
}

/// Associated data binding a payload to its owner and kind.
fn aux(owner_id: &str, kind: KeystoreKind) -> String {
    format!("{owner_id}{}", kind.wire_name())
}

/// Protection key for the recovery path: the recovery secret is hashed to
/// the 32-byte base, then bound to the recovery context.
fn recovery_key(code: &RecoveryCode) -> Result<DerivedKey> {
    let secret = code.secret();
    let mut base = [0u8; KEY_LEN];
    base.copy_from_slice(&Sha256::digest(&secret[..]));

    let key = derive_context_key(context::ACCOUNT_RECOVERY, &base);
    base.zeroize();
    key
}

mod payload_b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::crypto::aead::AeadCiphertext;

    pub fn serialize<S: Serializer>(
        payload: &AeadCiphertext,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(payload.to_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<AeadCiphertext, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(encoded).map_err(serde::de::Error::custom)?;
        AeadCiphertext::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// The serialized long-term key material a keystore protects.
#[derive(Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBundle {
    #[serde(with = "wire::b64")]
    ecdh_secret: Vec<u8>,
    #[zeroize(skip)]
    kem_level: KemLevel,
    #[serde(with = "wire::b64")]
    kem_secret: Vec<u8>,
}

impl KeyBundle {
    pub fn new(ecdh: &EcdhSecretKey, kem: &KemSecretKey) -> Self {
        Self {
            ecdh_secret: ecdh.to_bytes().to_vec(),
            kem_level: kem.level(),
            kem_secret: kem.as_bytes().to_vec(),
        }
    }

    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        serde_json::to_vec(self)
            .map(Zeroizing::new)
            .map_err(|e| Error::Encoding {
                reason: e.to_string(),
            })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::Encoding {
            reason: e.to_string(),
        })
    }

    pub fn ecdh_secret(&self) -> Result<EcdhSecretKey> {
        let bytes: [u8; KEY_LEN] =
            self.ecdh_secret
                .as_slice()
                .try_into()
                .map_err(|_| Error::Encoding {
                    reason: format!(
                        "classical secret must be {KEY_LEN} bytes, got {}",
                        self.ecdh_secret.len()
                    ),
                })?;
        Ok(EcdhSecretKey::from_bytes(bytes))
    }

    pub fn kem_secret(&self) -> Result<KemSecretKey> {
        KemSecretKey::from_bytes(self.kem_level, self.kem_secret.clone())
    }
}
