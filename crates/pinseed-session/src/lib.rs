//! PinSeed backup sessions
//!
//! A [`BackupSession`] drives one backup or restore attempt:
//!
//! ```text
//! backup:   Idle -> Sealing -> Sealed
//! restore:  Idle -> Opening -> Restored | Failed
//! check:    Restored -> Checking -> AccountFound | AccountNotFound | CheckFailed
//! ```
//!
//! Persistence, account lookup, QR drawing and account derivation are
//! injected through [`SessionServices`]. Only one asynchronous operation may
//! run per session; a concurrent call fails with
//! [`SessionError::OperationInProgress`].

pub mod cancel;
pub mod error;
pub mod services;
pub mod session;

pub use cancel::CancelToken;
pub use error::{ErrorKind, SessionError};
pub use services::{
    AccountLookup, AccountStatus, LookupError, SeedStore, SessionServices, StoreError,
};
pub use session::{BackupSession, SessionConfig, SessionState};
