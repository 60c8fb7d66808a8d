//! File-backed seed store
//!
//! Layout under the data directory:
//!
//! - `encrypted_seed.txt`: the `pinseed1:` text form of the backup
//! - `seed.hex`: the restored seed entropy, hex, owner-only permissions

use anyhow::{Context, Result};
use async_trait::async_trait;
use pinseed_core::{EncryptedSeed, RawSeed};
use pinseed_session::{SeedStore, StoreError};
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

pub const ENCRYPTED_SEED_FILE: &str = "encrypted_seed.txt";
pub const SEED_FILE: &str = "seed.hex";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn encrypted_seed_path(&self) -> PathBuf {
        self.dir.join(ENCRYPTED_SEED_FILE)
    }

    pub fn seed_path(&self) -> PathBuf {
        self.dir.join(SEED_FILE)
    }

    /// Read back a previously stored backup.
    pub fn load_encrypted(&self) -> Result<EncryptedSeed> {
        let path = self.encrypted_seed_path();
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read backup: {}", path.display()))?;
        text.trim()
            .parse::<EncryptedSeed>()
            .with_context(|| format!("Invalid backup in {}", path.display()))
    }

    fn write_file(&self, path: &Path, contents: &[u8], private: bool) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        if private {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        #[cfg(not(unix))]
        let _ = private;

        let mut file = options.open(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }
}

#[async_trait]
impl SeedStore for FileStore {
    async fn save_seed(&self, seed: &RawSeed) -> Result<(), StoreError> {
        let path = self.seed_path();
        let mut encoded = Zeroizing::new(hex::encode(seed.as_bytes()));
        encoded.push('\n');
        self.write_file(&path, encoded.as_bytes(), true)?;
        log::info!("restored seed written to {}", path.display());
        Ok(())
    }

    async fn save_encrypted(&self, encrypted: &EncryptedSeed) -> Result<(), StoreError> {
        let path = self.encrypted_seed_path();
        self.write_file(&path, format!("{}\n", encrypted).as_bytes(), false)?;
        log::info!("encrypted backup written to {}", path.display());
        Ok(())
    }
}
