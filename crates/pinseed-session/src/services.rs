//! Collaborators injected into a session

use std::sync::Arc;

use async_trait::async_trait;
use pinseed_core::{AccountDeriver, AccountId, Bip84Deriver, EncryptedSeed, QrRenderer, RawSeed};
use thiserror::Error;

/// Persistence failure reported by a [`SeedStore`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Seed store failed: {0}")]
pub struct StoreError(pub String);

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Lookup service rejected the request: {0}")]
    Rejected(String),
}

/// Answer of an [`AccountLookup`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Found,
    NotFound,
}

/// Where committed seeds go.
#[async_trait]
pub trait SeedStore: Send + Sync {
    /// Persist a freshly restored seed.
    async fn save_seed(&self, seed: &RawSeed) -> Result<(), StoreError>;

    /// Persist a freshly sealed backup.
    async fn save_encrypted(&self, encrypted: &EncryptedSeed) -> Result<(), StoreError>;
}

/// Remote existence check for an account.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn exists(&self, account: &AccountId) -> Result<AccountStatus, LookupError>;
}

/// Everything a session needs from the outside world.
#[derive(Clone)]
pub struct SessionServices {
    pub store: Arc<dyn SeedStore>,
    pub lookup: Arc<dyn AccountLookup>,
    pub renderer: Arc<dyn QrRenderer>,
    pub deriver: Arc<dyn AccountDeriver>,
}

impl SessionServices {
    /// Services with the default mainnet BIP-84 deriver.
    pub fn new(
        store: Arc<dyn SeedStore>,
        lookup: Arc<dyn AccountLookup>,
        renderer: Arc<dyn QrRenderer>,
    ) -> Self {
        Self {
            store,
            lookup,
            renderer,
            deriver: Arc::new(Bip84Deriver::default()),
        }
    }

    pub fn with_deriver(mut self, deriver: Arc<dyn AccountDeriver>) -> Self {
        self.deriver = deriver;
        self
    }
}
