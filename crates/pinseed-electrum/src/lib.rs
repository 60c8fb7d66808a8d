//! PinSeed Electrum lookup
//!
//! Answers "has this account ever been used?" by asking an Electrum server
//! for the history of the account's script.
//!
//! # Security
//!
//! - Always use SSL/TLS connections (ssl:// or tcp+tls://)
//! - Only the derived address leaves the machine, never seed material
//!
//! # Example
//!
//! ```ignore
//! use pinseed_electrum::{default_server, ElectrumLookup};
//! use bitcoin::Network;
//!
//! let lookup = ElectrumLookup::new(default_server(Network::Bitcoin), Network::Bitcoin);
//! let status = lookup.exists(&account).await?;
//! ```

use async_trait::async_trait;
use bitcoin::{Network, Script};
use electrum_client::{ElectrumApi, Error as ElectrumError};
use pinseed_core::AccountId;
use pinseed_session::{AccountLookup, AccountStatus, LookupError};
use thiserror::Error;

/// Errors from Electrum operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Electrum protocol error: {0}")]
    Protocol(#[from] ElectrumError),

    #[error("Network mismatch: account is on {account}, server is on {server}")]
    NetworkMismatch { account: Network, server: Network },
}

/// Blocking Electrum connection
pub struct ElectrumClient {
    client: electrum_client::Client,
    network: Network,
}

impl ElectrumClient {
    /// Connect to an Electrum server.
    ///
    /// Plaintext URLs are accepted but logged as insecure.
    pub fn new(url: &str, network: Network) -> Result<Self, Error> {
        if !url.starts_with("ssl://") && !url.contains("tls") {
            log::warn!("Connecting to Electrum without SSL - insecure for mainnet!");
        }

        let client = electrum_client::Client::new(url)
            .map_err(|e: ElectrumError| Error::Connection(e.to_string()))?;

        Ok(Self { client, network })
    }

    /// Number of transactions (confirmed or in mempool) touching `script`
    pub fn history_len(&self, script: &Script) -> Result<usize, Error> {
        Ok(self.client.script_get_history(script)?.len())
    }

    pub fn has_history(&self, script: &Script) -> Result<bool, Error> {
        Ok(self.history_len(script)? > 0)
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

/// Default Electrum servers for each network
pub fn default_server(network: Network) -> &'static str {
    match network {
        Network::Bitcoin => "ssl://electrum.blockstream.info:60002",
        Network::Testnet => "ssl://electrum.blockstream.info:60004",
        Network::Signet => "ssl://mempool.space:60602",
        Network::Regtest => "tcp://127.0.0.1:60401",
        _ => "ssl://electrum.blockstream.info:60002",
    }
}

/// [`AccountLookup`] backed by an Electrum server.
///
/// Each lookup opens its own connection on a blocking worker, so the lookup
/// can be shared freely between sessions.
#[derive(Debug, Clone)]
pub struct ElectrumLookup {
    url: String,
    network: Network,
}

impl ElectrumLookup {
    pub fn new(url: impl Into<String>, network: Network) -> Self {
        Self {
            url: url.into(),
            network,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn network(&self) -> Network {
        self.network
    }

    fn lookup_blocking(&self, account: &AccountId) -> Result<AccountStatus, Error> {
        if account.network() != self.network {
            return Err(Error::NetworkMismatch {
                account: account.network(),
                server: self.network,
            });
        }
        let client = ElectrumClient::new(&self.url, self.network)?;
        let used = client.has_history(account.script_pubkey().as_script())?;
        log::debug!("electrum history lookup: used={}", used);
        Ok(if used {
            AccountStatus::Found
        } else {
            AccountStatus::NotFound
        })
    }
}

impl From<Error> for LookupError {
    fn from(e: Error) -> Self {
        match e {
            Error::NetworkMismatch { .. } => LookupError::Rejected(e.to_string()),
            Error::Connection(_) | Error::Protocol(_) => LookupError::Transport(e.to_string()),
        }
    }
}

#[async_trait]
impl AccountLookup for ElectrumLookup {
    async fn exists(&self, account: &AccountId) -> Result<AccountStatus, LookupError> {
        let lookup = self.clone();
        let account = account.clone();
        tokio::task::spawn_blocking(move || lookup.lookup_blocking(&account))
            .await
            .map_err(|e| LookupError::Transport(format!("lookup worker failed: {}", e)))?
            .map_err(LookupError::from)
    }
}
