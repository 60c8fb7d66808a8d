//! QR backup payloads
//!
//! Turns an [`EncryptedSeed`] into a string suited for a QR symbol and checks
//! scanned strings against a known backup. Drawing the symbol is left to a
//! [`QrRenderer`].
//!
//! # Payload format
//!
//! `PINSEED1:` followed by the upper-case hex of the sealed binary layout.
//! Every character is in the QR alphanumeric set (`0-9 A-Z $%*+-./:` and
//! space), so encoders can use alphanumeric mode.
//!
//! Scanners are allowed to mangle case and insert whitespace or line breaks;
//! [`parse_qr_payload`] undoes both.

use thiserror::Error;

use crate::crypto::EncryptedSeed;

/// Prefix of every payload. The digit tracks the payload format version.
pub const QR_PAYLOAD_PREFIX: &str = "PINSEED1:";

/// Default largest QR version a payload may need
pub const DEFAULT_MAX_QR_VERSION: u8 = 10;

/// Alphanumeric-mode capacity (characters) at error correction level M,
/// indexed by QR version - 1.
const ALPHANUMERIC_CAPACITY_M: [usize; 40] = [
    20, 38, 61, 90, 122, 154, 178, 221, 262, 311, // 1-10
    366, 419, 483, 528, 600, 656, 734, 816, 909, 970, // 11-20
    1035, 1134, 1248, 1326, 1451, 1542, 1637, 1732, 1839, 1994, // 21-30
    2113, 2238, 2369, 2506, 2632, 2780, 2894, 3054, 3220, 3391, // 31-40
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackupError {
    #[error("QR payload too large: {len} characters (capacity {capacity})")]
    PayloadTooLarge { len: usize, capacity: usize },
    #[error("Malformed QR payload: {0}")]
    MalformedPayload(String),
    #[error("Unsupported QR version {0} (expected 1-40)")]
    InvalidQrVersion(u8),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Failure reported by an external QR renderer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("QR rendering failed: {0}")]
pub struct RenderError(pub String);

/// External QR image service.
///
/// Receives a validated payload string and returns encoded image bytes in
/// whatever format the implementation produces.
pub trait QrRenderer: Send + Sync {
    fn render(&self, payload: &str) -> Result<Vec<u8>, RenderError>;
}

/// Upper bound on payload size, expressed as the largest QR version allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrCapacity {
    max_version: u8,
}

impl QrCapacity {
    pub fn new(max_version: u8) -> Result<Self, BackupError> {
        if !(1..=40).contains(&max_version) {
            return Err(BackupError::InvalidQrVersion(max_version));
        }
        Ok(Self { max_version })
    }

    pub fn max_version(&self) -> u8 {
        self.max_version
    }

    /// Maximum number of payload characters
    pub fn chars(&self) -> usize {
        ALPHANUMERIC_CAPACITY_M[usize::from(self.max_version) - 1]
    }
}

impl Default for QrCapacity {
    fn default() -> Self {
        Self {
            max_version: DEFAULT_MAX_QR_VERSION,
        }
    }
}

/// Encode a sealed seed as a QR payload string.
pub fn to_qr_payload(
    encrypted: &EncryptedSeed,
    capacity: QrCapacity,
) -> Result<String, BackupError> {
    let payload = format!(
        "{}{}",
        QR_PAYLOAD_PREFIX,
        hex::encode_upper(encrypted.to_bytes())
    );
    if payload.len() > capacity.chars() {
        return Err(BackupError::PayloadTooLarge {
            len: payload.len(),
            capacity: capacity.chars(),
        });
    }
    log::debug!(
        "built QR payload: {} chars (version {} limit {})",
        payload.len(),
        capacity.max_version(),
        capacity.chars()
    );
    Ok(payload)
}

/// Hand a payload to the external renderer.
///
/// The payload is checked against the alphanumeric charset first; this
/// function never produces pixels itself.
pub fn render_qr(renderer: &dyn QrRenderer, payload: &str) -> Result<Vec<u8>, BackupError> {
    if payload.is_empty() {
        return Err(BackupError::MalformedPayload("empty payload".into()));
    }
    if !payload.chars().all(is_qr_alphanumeric) {
        return Err(BackupError::MalformedPayload(
            "payload contains characters outside the QR alphanumeric set".into(),
        ));
    }
    Ok(renderer.render(payload)?)
}

/// Parse a scanned payload back into an [`EncryptedSeed`].
///
/// Whitespace anywhere is dropped and case is ignored.
pub fn parse_qr_payload(scanned: &str) -> Result<EncryptedSeed, BackupError> {
    let normalized: String = scanned
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let body = normalized
        .strip_prefix(QR_PAYLOAD_PREFIX)
        .ok_or_else(|| BackupError::MalformedPayload("missing PINSEED1: prefix".into()))?;
    let bytes =
        hex::decode(body).map_err(|e| BackupError::MalformedPayload(format!("bad hex: {}", e)))?;

    EncryptedSeed::from_bytes(&bytes).map_err(|e| BackupError::MalformedPayload(e.to_string()))
}

/// Check a scanned payload against the expected backup.
///
/// Returns `false` for anything that does not parse; garbled scans are routine.
pub fn validate(scanned: &str, expected: &EncryptedSeed) -> bool {
    match parse_qr_payload(scanned) {
        Ok(decoded) => same_fields(&decoded, expected),
        Err(e) => {
            log::debug!("scanned QR payload rejected: {}", e);
            false
        }
    }
}

fn same_fields(a: &EncryptedSeed, b: &EncryptedSeed) -> bool {
    a.version() == b.version()
        && a.params() == b.params()
        && a.salt() == b.salt()
        && a.nonce() == b.nonce()
        && a.ciphertext() == b.ciphertext()
        && a.tag() == b.tag()
}

fn is_qr_alphanumeric(c: char) -> bool {
    c.is_ascii_digit() || c.is_ascii_uppercase() || " $%*+-./:".contains(c)
}
