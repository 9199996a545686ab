//! Argon2id password stretching.
//!
//! Memory- and CPU-hard on purpose: a derivation takes tens to hundreds of
//! milliseconds and tens of MiB. Keep it off latency-sensitive paths.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use super::{secure_random, KEY_LEN, SALT_LEN};
use crate::error::{Error, Result};

/// Argon2id cost parameters.
///
/// The defaults follow the second recommended profile of RFC 9106 as fixed
/// by the protocol: 64 MiB memory, 4 passes, 3 lanes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordParams {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 64 * 1024,
            time_cost: 4,
            parallelism: 3,
        }
    }
}

impl PasswordParams {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_cost < 1 {
            return Err(Error::PasswordDerivation {
                reason: "argon2 time cost must be >= 1".into(),
            });
        }
        if self.parallelism < 1 {
            return Err(Error::PasswordDerivation {
                reason: "argon2 parallelism must be >= 1".into(),
            });
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return Err(Error::PasswordDerivation {
                reason: "argon2 memory cost must be at least 8 * parallelism".into(),
            });
        }
        Ok(())
    }
}

/// Stretch `password` into a 32-byte secret under `salt`.
///
/// Deterministic for a fixed `(password, salt, params)` tuple; verification
/// is re-derivation and comparison, never a plaintext compare.
pub fn derive_from_password(
    password: &str,
    salt: &[u8],
    params: PasswordParams,
) -> Result<[u8; KEY_LEN]> {
    if password.is_empty() {
        return Err(Error::PasswordDerivation {
            reason: "password must not be empty".into(),
        });
    }
    if salt.is_empty() {
        return Err(Error::PasswordDerivation {
            reason: "salt must not be empty".into(),
        });
    }
    params.validate()?;

    let argon_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| Error::PasswordDerivation {
        reason: format!("failed to construct Argon2 params: {e}"),
    })?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| Error::PasswordDerivation {
            reason: format!("argon2 key derivation failed: {e}"),
        })?;

    Ok(key)
}

/// Sample a fresh 16-byte salt from the OS random source.
pub fn sample_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}
