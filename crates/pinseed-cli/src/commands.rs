//! Subcommand implementations

use anyhow::{Context, Result};
use pinseed_core::crypto::TEXT_PREFIX;
use pinseed_core::{
    decode, from_display_string, generate_seed, parse_qr_payload, Bip84Deriver, EncryptedSeed,
    PinCode, RawSeed,
};
use pinseed_electrum::ElectrumLookup;
use pinseed_session::{AccountStatus, BackupSession, CancelToken, SessionServices};
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::config::CliConfig;
use crate::render::{PlainTextRenderer, QR_PAYLOAD_FILE};
use crate::store::FileStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Seal a new (or supplied) seed and write the backup
    Backup { mnemonic_file: Option<PathBuf> },
    /// Open a backup and write the seed
    Restore { input: Option<PathBuf> },
    /// Open a backup and look the account up on Electrum
    Check { input: Option<PathBuf> },
    /// Compare a scanned QR payload with the stored backup
    VerifyQr { scanned: Option<String> },
}

impl Command {
    pub fn needs_pin(&self) -> bool {
        !matches!(self, Command::VerifyQr { .. })
    }
}

fn build_services(config: &CliConfig) -> (Arc<FileStore>, SessionServices) {
    let store = Arc::new(FileStore::new(&config.general.data_dir));
    let lookup = Arc::new(ElectrumLookup::new(config.electrum_url(), config.network()));
    let services = SessionServices::new(store.clone(), lookup, Arc::new(PlainTextRenderer))
        .with_deriver(Arc::new(Bip84Deriver::new(config.network())));
    (store, services)
}

pub async fn backup(
    config: &CliConfig,
    pin: PinCode,
    mnemonic_file: Option<&Path>,
    cancel: &CancelToken,
) -> Result<()> {
    let seed = match mnemonic_file {
        Some(path) => read_mnemonic(path)?,
        None => generate_seed(&mut OsRng, config.word_count()?),
    };

    let (store, services) = build_services(config);
    let session = BackupSession::new(pin, services).with_config(config.session_config()?);
    session
        .seal_and_store_seed(seed, cancel)
        .await
        .context("Failed to seal seed")?;

    let qr = session
        .encrypted_seed_qr_image()
        .context("Failed to build QR payload")?;
    let qr_path = config.general.data_dir.join(QR_PAYLOAD_FILE);
    std::fs::write(&qr_path, &qr)
        .with_context(|| format!("Failed to write {}", qr_path.display()))?;

    let words = session.seed_string()?;
    println!("Backup sealed.");
    println!("  Backup file:  {}", store.encrypted_seed_path().display());
    println!("  QR payload:   {}", qr_path.display());
    println!();
    println!("Write down these words and keep them offline:");
    println!();
    println!("  {}", words.as_str());
    session.clear_seed();
    Ok(())
}

pub async fn restore(
    config: &CliConfig,
    pin: PinCode,
    input: Option<&Path>,
    cancel: &CancelToken,
) -> Result<()> {
    let (session, store) = open_backup(config, pin, input, cancel).await?;
    let words = session.seed_string()?;
    println!("Seed restored.");
    println!("  Seed file:  {}", store.seed_path().display());
    println!();
    println!("  {}", words.as_str());
    session.clear_seed();
    Ok(())
}

/// Returns whether the account has on-chain history.
pub async fn check(
    config: &CliConfig,
    pin: PinCode,
    input: Option<&Path>,
    cancel: &CancelToken,
) -> Result<bool> {
    let (session, _) = open_backup(config, pin, input, cancel).await?;
    log::info!("looking up account via {}", config.electrum_url());
    let status = session
        .validate_account(cancel)
        .await
        .context("Account check failed")?;
    session.clear_seed();

    match status {
        AccountStatus::Found => println!("Account found: this seed has on-chain history."),
        AccountStatus::NotFound => println!("Account not found: no history for this seed."),
    }
    Ok(status == AccountStatus::Found)
}

/// Returns whether the scanned payload matches the stored backup.
pub fn verify_qr(config: &CliConfig, scanned: &str) -> Result<bool> {
    let store = FileStore::new(&config.general.data_dir);
    let expected = store.load_encrypted()?;
    let matches = pinseed_core::validate(scanned, &expected);
    if matches {
        println!("QR code matches the stored backup.");
    } else {
        println!("QR code does NOT match the stored backup.");
    }
    Ok(matches)
}

async fn open_backup(
    config: &CliConfig,
    pin: PinCode,
    input: Option<&Path>,
    cancel: &CancelToken,
) -> Result<(BackupSession, Arc<FileStore>)> {
    let (store, services) = build_services(config);
    let encrypted = match input {
        Some(path) => read_backup(path)?,
        None => store.load_encrypted()?,
    };

    let session = BackupSession::with_encrypted_seed(pin, encrypted, services)
        .with_config(config.session_config()?);
    session
        .decrypt_and_store_seed(cancel)
        .await
        .context("Failed to restore seed")?;
    Ok((session, store))
}

/// Accepts either the `pinseed1:` text form or a scanned QR payload.
fn read_backup(path: &Path) -> Result<EncryptedSeed> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let text = text.trim();
    if text.starts_with(TEXT_PREFIX) {
        if let Ok(encrypted) = text.parse::<EncryptedSeed>() {
            return Ok(encrypted);
        }
    }
    parse_qr_payload(text).with_context(|| format!("No valid backup in {}", path.display()))
}

fn read_mnemonic(path: &Path) -> Result<RawSeed> {
    let text = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
    );
    let words = from_display_string(text.trim_end_matches(|c: char| c == '\n' || c == '\r'))
        .context("Invalid mnemonic")?;
    decode(&words).context("Invalid mnemonic")
}
