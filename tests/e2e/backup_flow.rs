//! Full backup -> QR -> restore -> account check flow across crates.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bitcoin::Network;
use pinseed_core::{
    parse_qr_payload, Bip84Deriver, EncryptedSeed, KdfParams, PinCode, QrCapacity, QrRenderer,
    RawSeed, RenderError,
};
use pinseed_electrum::{default_server, ElectrumLookup};
use pinseed_session::{
    AccountLookup, AccountStatus, BackupSession, CancelToken, LookupError, SeedStore,
    SessionConfig, SessionError, SessionServices, SessionState, StoreError,
};

#[derive(Default)]
struct VaultStore {
    seed: Mutex<Option<Vec<u8>>>,
    backup: Mutex<Option<EncryptedSeed>>,
}

#[async_trait]
impl SeedStore for VaultStore {
    async fn save_seed(&self, seed: &RawSeed) -> Result<(), StoreError> {
        *self.seed.lock().unwrap() = Some(seed.as_bytes().to_vec());
        Ok(())
    }

    async fn save_encrypted(&self, encrypted: &EncryptedSeed) -> Result<(), StoreError> {
        *self.backup.lock().unwrap() = Some(encrypted.clone());
        Ok(())
    }
}

/// Knows exactly one used account.
struct KnownAccounts {
    used: String,
}

#[async_trait]
impl AccountLookup for KnownAccounts {
    async fn exists(
        &self,
        account: &pinseed_core::AccountId,
    ) -> Result<AccountStatus, LookupError> {
        if account.to_string() == self.used {
            Ok(AccountStatus::Found)
        } else {
            Ok(AccountStatus::NotFound)
        }
    }
}

struct TextRenderer;

impl QrRenderer for TextRenderer {
    fn render(&self, payload: &str) -> Result<Vec<u8>, RenderError> {
        Ok(payload.as_bytes().to_vec())
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        kdf: KdfParams::new(1024, 1, 1).unwrap(),
        qr: QrCapacity::default(),
    }
}

fn services(store: Arc<VaultStore>) -> SessionServices {
    SessionServices::new(
        store,
        Arc::new(KnownAccounts {
            used: "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu".into(),
        }),
        Arc::new(TextRenderer),
    )
}

#[tokio::test]
async fn test_zero_seed_backup_scan_restore_check() {
    let pin = PinCode::new("135790").unwrap();
    let cancel = CancelToken::new();

    // backup
    let backup_store = Arc::new(VaultStore::default());
    let backup =
        BackupSession::new(pin.clone(), services(backup_store.clone())).with_config(config());
    backup
        .seal_and_store_seed(RawSeed::new(&[0u8; 16]).unwrap(), &cancel)
        .await
        .unwrap();
    assert_eq!(backup.seed_array().unwrap().len(), 12);
    let image = backup.encrypted_seed_qr_image().unwrap();
    backup.clear_seed();

    // a scanner hands back the payload, lower-cased and wrapped
    let scanned = String::from_utf8(image).unwrap().to_lowercase();
    let scanned = format!("{}\n{}", &scanned[..30], &scanned[30..]);
    assert!(backup.validate_qr_code(&scanned).unwrap());

    // restore on another device
    let restore_store = Arc::new(VaultStore::default());
    let restore = BackupSession::with_encrypted_seed(
        pin,
        parse_qr_payload(&scanned).unwrap(),
        services(restore_store.clone()),
    )
    .with_config(config());
    restore.decrypt_and_store_seed(&cancel).await.unwrap();
    assert_eq!(*restore_store.seed.lock().unwrap(), Some(vec![0u8; 16]));
    assert_eq!(
        restore.seed_string().unwrap().as_str(),
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
    );

    // account check
    let status = restore.validate_account(&cancel).await.unwrap();
    assert_eq!(status, AccountStatus::Found);
    assert_eq!(restore.state(), SessionState::AccountFound);
}

#[tokio::test]
async fn test_restore_with_wrong_pin_ends_failed() {
    let store = Arc::new(VaultStore::default());
    let backup = BackupSession::new(PinCode::new("135790").unwrap(), services(store.clone()))
        .with_config(config());
    let encrypted = backup
        .seal_and_store_seed(RawSeed::new(&[9u8; 24]).unwrap(), &CancelToken::new())
        .await
        .unwrap();

    let restore_store = Arc::new(VaultStore::default());
    let restore = BackupSession::with_encrypted_seed(
        PinCode::new("531790").unwrap(),
        encrypted,
        services(restore_store.clone()),
    );
    let err = restore
        .decrypt_and_store_seed(&CancelToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::AuthenticationFailed);
    assert_eq!(restore.state(), SessionState::Failed);
    assert!(restore_store.seed.lock().unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_electrum_check_reference_account() {
    let store = Arc::new(VaultStore::default());
    let services = SessionServices::new(
        store,
        Arc::new(ElectrumLookup::new(
            default_server(Network::Bitcoin),
            Network::Bitcoin,
        )),
        Arc::new(TextRenderer),
    )
    .with_deriver(Arc::new(Bip84Deriver::new(Network::Bitcoin)));

    let pin = PinCode::new("135790").unwrap();
    let encrypted = pinseed_core::seal(
        &RawSeed::new(&[0u8; 16]).unwrap(),
        &pin,
        &KdfParams::new(1024, 1, 1).unwrap(),
    )
    .unwrap();
    let session = BackupSession::with_encrypted_seed(pin, encrypted, services);
    session
        .decrypt_and_store_seed(&CancelToken::new())
        .await
        .unwrap();
    let status = session.validate_account(&CancelToken::new()).await.unwrap();
    assert_eq!(status, AccountStatus::Found);
}
