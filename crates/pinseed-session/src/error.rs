//! Session error type
//!
//! Flattens the per-module errors of `pinseed-core` into the set of outcomes a
//! caller has to tell apart. Messages never carry PIN digits, seed bytes or
//! seed words.

use pinseed_core::{AccountError, BackupError, CryptoError, KdfError, SeedError};
use thiserror::Error;

use crate::session::SessionState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("Mnemonic checksum mismatch")]
    ChecksumMismatch,
    #[error("Unknown word at position {0}")]
    UnknownWord(usize),
    #[error("Wrong word count: {0}")]
    WrongWordCount(usize),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),
    #[error("Authentication failed: wrong PIN or corrupted data")]
    AuthenticationFailed,
    #[error("QR payload too large: {len} characters (capacity {capacity})")]
    PayloadTooLarge { len: usize, capacity: usize },
    #[error("No seed available in this session")]
    SeedUnavailable,
    #[error("Another operation is already running on this session")]
    OperationInProgress,
    #[error("Account check failed: {0}")]
    CheckFailed(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Operation not allowed in state {0:?}")]
    InvalidState(SessionState),
    #[error("QR rendering failed: {0}")]
    Render(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Payload-free classification of a [`SessionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidPin,
    ChecksumMismatch,
    UnknownWord,
    WrongWordCount,
    MalformedInput,
    MalformedCiphertext,
    AuthenticationFailed,
    PayloadTooLarge,
    SeedUnavailable,
    OperationInProgress,
    CheckFailed,
    Cancelled,
    InvalidState,
    Render,
    Internal,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPin => ErrorKind::InvalidPin,
            Self::ChecksumMismatch => ErrorKind::ChecksumMismatch,
            Self::UnknownWord(_) => ErrorKind::UnknownWord,
            Self::WrongWordCount(_) => ErrorKind::WrongWordCount,
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::MalformedCiphertext(_) => ErrorKind::MalformedCiphertext,
            Self::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::SeedUnavailable => ErrorKind::SeedUnavailable,
            Self::OperationInProgress => ErrorKind::OperationInProgress,
            Self::CheckFailed(_) => ErrorKind::CheckFailed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Render(_) => ErrorKind::Render,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<KdfError> for SessionError {
    fn from(e: KdfError) -> Self {
        match e {
            KdfError::InvalidPin(_) => Self::InvalidPin,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<SeedError> for SessionError {
    fn from(e: SeedError) -> Self {
        match e {
            SeedError::ChecksumMismatch => Self::ChecksumMismatch,
            SeedError::UnknownWord { position } => Self::UnknownWord(position),
            SeedError::WrongWordCount(n) => Self::WrongWordCount(n),
            SeedError::MalformedInput(msg) => Self::MalformedInput(msg.to_string()),
            SeedError::InvalidEntropyLength(n) => {
                Self::MalformedInput(format!("invalid entropy length: {} bytes", n))
            }
        }
    }
}

impl From<CryptoError> for SessionError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::MalformedCiphertext(msg) => Self::MalformedCiphertext(msg),
            CryptoError::AuthenticationFailed => Self::AuthenticationFailed,
            CryptoError::KeyDerivation(k) => k.into(),
            CryptoError::EncryptionFailed => Self::Internal("encryption failed".into()),
        }
    }
}

impl From<BackupError> for SessionError {
    fn from(e: BackupError) -> Self {
        match e {
            BackupError::PayloadTooLarge { len, capacity } => {
                Self::PayloadTooLarge { len, capacity }
            }
            BackupError::MalformedPayload(msg) => Self::MalformedInput(msg),
            BackupError::InvalidQrVersion(v) => Self::Internal(format!("invalid QR version {}", v)),
            BackupError::Render(r) => Self::Render(r.0),
        }
    }
}

impl From<AccountError> for SessionError {
    fn from(e: AccountError) -> Self {
        Self::CheckFailed(e.to_string())
    }
}
