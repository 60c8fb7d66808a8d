//! Account identifier derivation
//!
//! The existence check needs a public identifier for the wallet behind a
//! seed. [`Bip84Deriver`] uses the first native-segwit receive address:
//! m/84'/coin'/0'/0/0 over the BIP-39 seed with an empty passphrase.

use bip39::Mnemonic;
use bitcoin::bip32::{DerivationPath, Xpriv, Xpub};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Address, Network, ScriptBuf};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::seed::RawSeed;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Derivation failed: {0}")]
    DerivationFailed(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Public identifier of an account, safe to send to a lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountId {
    address: Address,
    network: Network,
}

impl AccountId {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Maps a seed to the identifier used by the account lookup.
pub trait AccountDeriver: Send + Sync {
    fn derive(&self, seed: &RawSeed) -> Result<AccountId, AccountError>;
}

/// BIP-84 first receive address
#[derive(Debug, Clone, Copy)]
pub struct Bip84Deriver {
    network: Network,
}

impl Bip84Deriver {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    /// m/84'/0'/0'/0/0 on mainnet, m/84'/1'/0'/0/0 everywhere else
    pub fn path(&self) -> String {
        let coin = if self.network == Network::Bitcoin { 0 } else { 1 };
        format!("m/84'/{}'/0'/0/0", coin)
    }
}

impl Default for Bip84Deriver {
    fn default() -> Self {
        Self::new(Network::Bitcoin)
    }
}

impl AccountDeriver for Bip84Deriver {
    fn derive(&self, seed: &RawSeed) -> Result<AccountId, AccountError> {
        let mnemonic = Mnemonic::from_entropy(seed.as_bytes())
            .map_err(|e| AccountError::DerivationFailed(e.to_string()))?;
        let bip39_seed = Zeroizing::new(mnemonic.to_seed(""));

        let master = Xpriv::new_master(self.network, bip39_seed.as_slice())
            .map_err(|e| AccountError::DerivationFailed(e.to_string()))?;

        let path: DerivationPath = self
            .path()
            .parse()
            .map_err(|e: bitcoin::bip32::Error| AccountError::InvalidPath(e.to_string()))?;

        let secp = Secp256k1::new();
        let child = master
            .derive_priv(&secp, &path)
            .map_err(|e| AccountError::DerivationFailed(e.to_string()))?;
        let pubkey = Xpub::from_priv(&secp, &child).to_pub();

        Ok(AccountId {
            address: Address::p2wpkh(&pubkey, self.network),
            network: self.network,
        })
    }
}
