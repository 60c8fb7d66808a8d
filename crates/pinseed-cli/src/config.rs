//! CLI configuration, parsed from a TOML file plus environment overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use pinseed_core::{KdfParams, QrCapacity, WordCount};
use pinseed_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub general: GeneralSection,

    /// Argon2id costs for new backups. Opening reads them from the backup.
    #[serde(default)]
    pub kdf: KdfParams,

    #[serde(default)]
    pub backup: BackupSection,

    /// Account existence check
    #[serde(default)]
    pub electrum: ElectrumSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSection {
    /// Where the encrypted backup and restored seed are written
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSection {
    /// Mnemonic length for generated seeds
    #[serde(default = "default_word_count")]
    pub word_count: usize,

    /// Largest QR version the payload may need (1-40)
    #[serde(default = "default_qr_max_version")]
    pub qr_max_version: u8,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            word_count: default_word_count(),
            qr_max_version: default_qr_max_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectrumSection {
    /// Bitcoin network: "bitcoin", "testnet", "signet", "regtest"
    #[serde(default = "default_network")]
    pub network: String,

    /// Electrum server URL; empty means the network's default server
    #[serde(default)]
    pub url: String,
}

impl Default for ElectrumSection {
    fn default() -> Self {
        Self {
            network: default_network(),
            url: String::new(),
        }
    }
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_data_dir() -> PathBuf {
    PathBuf::from("./pinseed-data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_word_count() -> usize {
    24
}

fn default_qr_max_version() -> u8 {
    QrCapacity::default().max_version()
}

fn default_network() -> String {
    "bitcoin".to_string()
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `PINSEED_DATA_DIR`
    /// - `PINSEED_LOG_LEVEL`
    /// - `PINSEED_KDF_M_COST`, `PINSEED_KDF_T_COST`, `PINSEED_KDF_P_COST`
    /// - `PINSEED_WORD_COUNT`
    /// - `PINSEED_QR_MAX_VERSION`
    /// - `PINSEED_NETWORK`
    /// - `PINSEED_ELECTRUM_URL`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PINSEED_DATA_DIR") {
            self.general.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PINSEED_LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Some(m) = env_number("PINSEED_KDF_M_COST") {
            self.kdf.m_cost = m;
        }
        if let Some(t) = env_number("PINSEED_KDF_T_COST") {
            self.kdf.t_cost = t;
        }
        if let Some(p) = env_number("PINSEED_KDF_P_COST") {
            self.kdf.p_cost = p;
        }
        if let Some(words) = env_number("PINSEED_WORD_COUNT") {
            self.backup.word_count = words;
        }
        if let Some(version) = env_number("PINSEED_QR_MAX_VERSION") {
            self.backup.qr_max_version = version;
        }
        if let Ok(v) = std::env::var("PINSEED_NETWORK") {
            self.electrum.network = v;
        }
        if let Ok(v) = std::env::var("PINSEED_ELECTRUM_URL") {
            self.electrum.url = v;
        }
    }

    /// Parse the network string to a `bitcoin::Network`.
    pub fn network(&self) -> bitcoin::Network {
        match self.electrum.network.as_str() {
            "testnet" | "testnet3" => bitcoin::Network::Testnet,
            "signet" => bitcoin::Network::Signet,
            "regtest" => bitcoin::Network::Regtest,
            _ => bitcoin::Network::Bitcoin,
        }
    }

    pub fn electrum_url(&self) -> String {
        if self.electrum.url.is_empty() {
            pinseed_electrum::default_server(self.network()).to_string()
        } else {
            self.electrum.url.clone()
        }
    }

    pub fn kdf_params(&self) -> Result<KdfParams> {
        self.kdf.validate().context("invalid [kdf] section")?;
        Ok(self.kdf)
    }

    pub fn word_count(&self) -> Result<WordCount> {
        WordCount::try_from(self.backup.word_count).context("invalid backup.word_count")
    }

    pub fn qr_capacity(&self) -> Result<QrCapacity> {
        QrCapacity::new(self.backup.qr_max_version).context("invalid backup.qr_max_version")
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig {
            kdf: self.kdf_params()?,
            qr: self.qr_capacity()?,
        })
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.general.data_dir.as_os_str().is_empty(),
            "general.data_dir must not be empty"
        );
        anyhow::ensure!(
            matches!(
                self.general.log_level.as_str(),
                "error" | "warn" | "info" | "debug" | "trace"
            ),
            "general.log_level must be one of error/warn/info/debug/trace"
        );
        anyhow::ensure!(
            matches!(
                self.electrum.network.as_str(),
                "bitcoin" | "testnet" | "testnet3" | "signet" | "regtest"
            ),
            "electrum.network must be bitcoin, testnet, signet or regtest"
        );

        self.kdf_params()?;
        self.word_count()?;
        self.qr_capacity()?;
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            log::warn!("ignoring {}: not a number", key);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
