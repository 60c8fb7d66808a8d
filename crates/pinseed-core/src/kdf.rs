//! PIN key derivation
//!
//! Turns a short numeric PIN into an AES-256 key using Argon2id.
//!
//! # Security Notes
//!
//! - A 6-digit PIN has only 10^6 possibilities, so the derivation must be slow
//!   and salted. Argon2id is memory-hard (resistant to GPU/ASIC attacks).
//! - The cost parameters are stored next to the ciphertext, so they can be
//!   raised later without breaking existing backups.
//! - The PIN and the derived key are zeroized on drop.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Number of digits in a PIN code
pub const PIN_LENGTH: usize = 6;

/// Derived key length (256 bits for AES-256)
pub const KEY_LEN: usize = 32;

/// Minimum salt length accepted by [`derive_key`]
pub const MIN_SALT_LEN: usize = 16;

/// Argon2id defaults (OWASP recommendations for 2024+)
/// - m_cost: 64 MiB memory
/// - t_cost: 3 iterations
/// - p_cost: 4 parallel lanes
const DEFAULT_M_COST: u32 = 65536;
const DEFAULT_T_COST: u32 = 3;
const DEFAULT_P_COST: u32 = 4;

/// Upper bounds. Parameters are read back from untrusted backup strings, so
/// they must not be able to request unbounded memory or time.
const MAX_M_COST: u32 = 262_144; // 256 MiB
const MAX_T_COST: u32 = 16;
const MAX_P_COST: u32 = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KdfError {
    #[error("Invalid PIN: {0}")]
    InvalidPin(&'static str),
    #[error("Invalid key derivation parameters: {0}")]
    InvalidParams(String),
    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),
}

/// A validated numeric PIN.
///
/// The digits live in a zeroizing buffer and never show up in `Debug` output.
#[derive(Clone)]
pub struct PinCode {
    digits: Zeroizing<String>,
}

impl PinCode {
    /// Validate and wrap a PIN.
    ///
    /// The input must be exactly [`PIN_LENGTH`] ASCII digits.
    pub fn new(pin: &str) -> Result<Self, KdfError> {
        if pin.chars().count() != PIN_LENGTH {
            return Err(KdfError::InvalidPin("PIN must be exactly 6 digits"));
        }
        if !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(KdfError::InvalidPin("PIN may only contain digits 0-9"));
        }
        Ok(Self {
            digits: Zeroizing::new(pin.to_owned()),
        })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.digits.as_bytes()
    }
}

impl std::fmt::Debug for PinCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PinCode(******)")
    }
}

impl std::str::FromStr for PinCode {
    type Err = KdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Argon2id cost parameters.
///
/// `m_cost` is in KiB, following the `argon2` crate convention. Missing
/// fields deserialize to the defaults; call [`validate`](Self::validate) on
/// anything read from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: DEFAULT_M_COST,
            t_cost: DEFAULT_T_COST,
            p_cost: DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    /// Build a parameter set, rejecting values outside the supported range.
    pub fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, KdfError> {
        let params = Self {
            m_cost,
            t_cost,
            p_cost,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the parameters against the supported range.
    pub fn validate(&self) -> Result<(), KdfError> {
        if self.p_cost == 0 || self.p_cost > MAX_P_COST {
            return Err(KdfError::InvalidParams(format!(
                "p_cost must be in 1..={}, got {}",
                MAX_P_COST, self.p_cost
            )));
        }
        if self.t_cost == 0 || self.t_cost > MAX_T_COST {
            return Err(KdfError::InvalidParams(format!(
                "t_cost must be in 1..={}, got {}",
                MAX_T_COST, self.t_cost
            )));
        }
        // Argon2 needs at least 8 KiB per lane
        let min_m_cost = 8 * self.p_cost;
        if self.m_cost < min_m_cost || self.m_cost > MAX_M_COST {
            return Err(KdfError::InvalidParams(format!(
                "m_cost must be in {}..={}, got {}",
                min_m_cost, MAX_M_COST, self.m_cost
            )));
        }
        Ok(())
    }
}

/// 256-bit symmetric key derived from a PIN. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Raw key bytes for the cipher.
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(***)")
    }
}

/// Derive an encryption key from a PIN using Argon2id.
///
/// Deterministic: the same `(pin, salt, params)` always yields the same key.
pub fn derive_key(
    pin: &PinCode,
    salt: &[u8],
    params: &KdfParams,
) -> Result<SymmetricKey, KdfError> {
    if salt.len() < MIN_SALT_LEN {
        return Err(KdfError::InvalidParams(format!(
            "salt too short: {} bytes (minimum {})",
            salt.len(),
            MIN_SALT_LEN
        )));
    }
    params.validate()?;

    let argon2_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(KEY_LEN))
        .map_err(|e| KdfError::InvalidParams(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = SymmetricKey {
        bytes: [0u8; KEY_LEN],
    };
    argon2
        .hash_password_into(pin.as_bytes(), salt, &mut key.bytes)
        .map_err(|e| KdfError::DerivationFailed(e.to_string()))?;

    Ok(key)
}
