//! PinSeed Core
//!
//! PIN-protected wallet seed backup primitives.
//!
//! # Pipeline
//!
//! ```text
//! RawSeed ──encode──▶ SeedWords ──display──▶ "abandon ability ..."
//!    │
//!    └──seal(pin)──▶ EncryptedSeed ──to_qr_payload──▶ "PINSEED1:01000100..."
//! ```
//!
//! # Encrypted Storage
//!
//! Seeds are sealed with Argon2id (PIN → key) + AES-256-GCM. The cost
//! parameters, salt and nonce travel with the ciphertext so a backup can be
//! opened with nothing but the PIN.

pub mod account;
pub mod backup;
pub mod crypto;
pub mod kdf;
pub mod memory;
pub mod seed;

pub use account::{AccountDeriver, AccountError, AccountId, Bip84Deriver};
pub use backup::{
    parse_qr_payload, render_qr, to_qr_payload, validate, BackupError, QrCapacity, QrRenderer,
    RenderError, QR_PAYLOAD_PREFIX,
};
pub use crypto::{open, seal, seal_with_rng, CryptoError, EncryptedSeed, FORMAT_VERSION};
pub use kdf::{derive_key, KdfError, KdfParams, PinCode, SymmetricKey, PIN_LENGTH};
pub use seed::{
    decode, encode, from_display_string, generate_seed, to_display_string, RawSeed, SeedError,
    SeedWords, WordCount, WORDLIST_VERSION,
};
