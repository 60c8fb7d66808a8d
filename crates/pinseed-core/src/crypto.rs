//! Seed sealing
//!
//! PIN-based encryption of seed entropy using Argon2id + AES-256-GCM.
//!
//! # Security Notes
//!
//! - Every seal draws a fresh salt and nonce from the supplied CSPRNG
//! - The format header (version + Argon2 parameters) is bound as associated
//!   data, so it cannot be swapped without breaking the tag
//! - A wrong PIN and a corrupted blob produce the same error
//!
//! # Layout (version 1, big-endian)
//!
//! ```text
//! [version 1][m_cost 4][t_cost 4][p_cost 4][salt 16][nonce 12][ciphertext 16..32][tag 16]
//! ```
//!
//! The text form is `pinseed1:` followed by standard base64 of those bytes.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::kdf::{derive_key, KdfError, KdfParams, PinCode};
use crate::seed::RawSeed;

/// Current layout version
pub const FORMAT_VERSION: u8 = 1;

/// Prefix of the text form
pub const TEXT_PREFIX: &str = "pinseed1:";

/// Salt length for Argon2
const SALT_LEN: usize = 16;

/// Nonce length for AES-256-GCM
const NONCE_LEN: usize = 12;

/// GCM authentication tag length
const TAG_LEN: usize = 16;

/// version + m_cost + t_cost + p_cost
const HEADER_LEN: usize = 13;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),
    #[error("Authentication failed: wrong PIN or corrupted data")]
    AuthenticationFailed,
    #[error("Key derivation failed: {0}")]
    KeyDerivation(#[from] KdfError),
    #[error("Encryption failed")]
    EncryptionFailed,
}

/// A sealed seed plus everything needed to open it again except the PIN.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedSeed {
    version: u8,
    params: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
}

impl EncryptedSeed {
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    fn header(&self) -> [u8; HEADER_LEN] {
        header_bytes(self.version, &self.params)
    }

    /// Serialize to the binary layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            HEADER_LEN + SALT_LEN + NONCE_LEN + self.ciphertext.len() + TAG_LEN,
        );
        bytes.extend_from_slice(&self.header());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes.extend_from_slice(&self.tag);
        bytes
    }

    /// Parse the binary layout.
    ///
    /// Only checks structure; integrity is verified by [`open`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.is_empty() {
            return Err(malformed("empty input"));
        }
        let version = bytes[0];
        if version != FORMAT_VERSION {
            return Err(CryptoError::MalformedCiphertext(format!(
                "unsupported format version {}",
                version
            )));
        }
        if bytes.len() < HEADER_LEN + SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(malformed("truncated input"));
        }

        let params = KdfParams {
            m_cost: read_u32(&bytes[1..5]),
            t_cost: read_u32(&bytes[5..9]),
            p_cost: read_u32(&bytes[9..13]),
        };
        params
            .validate()
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;

        let mut offset = HEADER_LEN;
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&bytes[offset..offset + SALT_LEN]);
        offset += SALT_LEN;

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[offset..offset + NONCE_LEN]);
        offset += NONCE_LEN;

        let ciphertext_len = bytes.len() - offset - TAG_LEN;
        if !matches!(ciphertext_len, 16 | 20 | 24 | 28 | 32) {
            return Err(CryptoError::MalformedCiphertext(format!(
                "unexpected ciphertext length {}",
                ciphertext_len
            )));
        }
        let ciphertext = bytes[offset..offset + ciphertext_len].to_vec();
        offset += ciphertext_len;

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[offset..]);

        Ok(Self {
            version,
            params,
            salt,
            nonce,
            ciphertext,
            tag,
        })
    }
}

impl std::fmt::Display for EncryptedSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", TEXT_PREFIX, BASE64.encode(self.to_bytes()))
    }
}

impl std::str::FromStr for EncryptedSeed {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s
            .strip_prefix(TEXT_PREFIX)
            .ok_or_else(|| malformed("missing pinseed1: prefix"))?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| malformed("invalid base64"))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for EncryptedSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedSeed")
            .field("version", &self.version)
            .field("params", &self.params)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

fn malformed(reason: &str) -> CryptoError {
    CryptoError::MalformedCiphertext(reason.to_string())
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_be_bytes(buf)
}

fn header_bytes(version: u8, params: &KdfParams) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0] = version;
    header[1..5].copy_from_slice(&params.m_cost.to_be_bytes());
    header[5..9].copy_from_slice(&params.t_cost.to_be_bytes());
    header[9..13].copy_from_slice(&params.p_cost.to_be_bytes());
    header
}

/// Seal a seed under a PIN using the operating system RNG.
pub fn seal(
    seed: &RawSeed,
    pin: &PinCode,
    params: &KdfParams,
) -> Result<EncryptedSeed, CryptoError> {
    seal_with_rng(&mut OsRng, seed, pin, params)
}

/// Seal a seed under a PIN, drawing salt and nonce from `rng`.
pub fn seal_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    seed: &RawSeed,
    pin: &PinCode,
    params: &KdfParams,
) -> Result<EncryptedSeed, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let key = derive_key(pin, &salt, params)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.expose()));
    let header = header_bytes(FORMAT_VERSION, params);

    // Encrypted in place: the buffer holds plaintext until the call succeeds
    let mut buffer = seed.as_bytes().to_vec();
    let nonce_ref = Nonce::from_slice(&nonce);
    let tag = match cipher.encrypt_in_place_detached(nonce_ref, &header, &mut buffer) {
        Ok(tag) => tag,
        Err(_) => {
            buffer.zeroize();
            return Err(CryptoError::EncryptionFailed);
        }
    };

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(EncryptedSeed {
        version: FORMAT_VERSION,
        params: *params,
        salt,
        nonce,
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Open a sealed seed with a PIN.
///
/// # Errors
/// `AuthenticationFailed` for a wrong PIN or any tampering with the sealed
/// bytes; the two cases are deliberately indistinguishable.
pub fn open(encrypted: &EncryptedSeed, pin: &PinCode) -> Result<RawSeed, CryptoError> {
    let key = derive_key(pin, &encrypted.salt, &encrypted.params).map_err(|e| match e {
        KdfError::InvalidParams(reason) => CryptoError::MalformedCiphertext(reason),
        other => CryptoError::KeyDerivation(other),
    })?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.expose()));

    let mut buffer = Zeroizing::new(encrypted.ciphertext.clone());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&encrypted.nonce),
            &encrypted.header(),
            buffer.as_mut_slice(),
            GenericArray::from_slice(&encrypted.tag),
        )
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    RawSeed::new(&buffer).map_err(|_| malformed("decrypted seed has invalid length"))
}
