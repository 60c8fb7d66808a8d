//! The backup/restore state machine

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use pinseed_core::{backup, crypto, seed};
use pinseed_core::{EncryptedSeed, KdfParams, PinCode, QrCapacity, RawSeed, SeedWords};
use zeroize::Zeroizing;

use crate::cancel::CancelToken;
use crate::error::SessionError;
use crate::services::{AccountStatus, SessionServices};

/// Where a session stands.
///
/// `Sealing`, `Opening` and `Checking` are only visible while an operation
/// is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sealing,
    Sealed,
    Opening,
    Restored,
    Failed,
    Checking,
    AccountFound,
    AccountNotFound,
    CheckFailed,
}

impl SessionState {
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Sealing | Self::Opening | Self::Checking)
    }
}

/// States from which an account check may start (or be repeated).
const CHECKABLE: [SessionState; 4] = [
    SessionState::Restored,
    SessionState::AccountFound,
    SessionState::AccountNotFound,
    SessionState::CheckFailed,
];

/// Tunables for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub kdf: KdfParams,
    pub qr: QrCapacity,
}

/// One backup or restore attempt bound to a single PIN.
///
/// Synchronous accessors can be called at any time. The async operations
/// are single-flight: while one runs, another fails with
/// [`SessionError::OperationInProgress`]. Dropping an operation's future or
/// cancelling its [`CancelToken`] puts the session back where it was.
///
/// The PIN is consumed by the first seal or open that runs to completion,
/// whatever the outcome. It is only handed back when that operation is
/// rolled back.
pub struct BackupSession {
    pin: Mutex<Option<PinCode>>,
    config: SessionConfig,
    services: SessionServices,
    state: Mutex<SessionState>,
    encrypted: Mutex<Option<EncryptedSeed>>,
    seed: Mutex<Option<RawSeed>>,
    busy: AtomicBool,
}

impl BackupSession {
    /// Session for creating a new backup.
    pub fn new(pin: PinCode, services: SessionServices) -> Self {
        Self {
            pin: Mutex::new(Some(pin)),
            config: SessionConfig::default(),
            services,
            state: Mutex::new(SessionState::Idle),
            encrypted: Mutex::new(None),
            seed: Mutex::new(None),
            busy: AtomicBool::new(false),
        }
    }

    /// Session for restoring from an existing backup.
    pub fn with_encrypted_seed(
        pin: PinCode,
        encrypted: EncryptedSeed,
        services: SessionServices,
    ) -> Self {
        let session = Self::new(pin, services);
        *lock(&session.encrypted) = Some(encrypted);
        session
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    /// Whether the PIN is still held for a seal or open.
    pub fn has_pin(&self) -> bool {
        lock(&self.pin).is_some()
    }

    /// The backup this session produced or was given.
    pub fn encrypted_seed(&self) -> Option<EncryptedSeed> {
        lock(&self.encrypted).clone()
    }

    /// Seal `seed` under the session PIN and hand the result to the store.
    ///
    /// The plaintext seed is kept so [`seed_string`](Self::seed_string) can
    /// show it for transcription afterwards.
    pub async fn seal_and_store_seed(
        &self,
        raw: RawSeed,
        cancel: &CancelToken,
    ) -> Result<EncryptedSeed, SessionError> {
        let mut flight = self.begin(&[SessionState::Idle], SessionState::Sealing)?;
        let has_backup = lock(&self.encrypted).is_some();
        if has_backup {
            return Err(SessionError::InvalidState(flight.resume));
        }
        let pin = flight.take_pin()?;

        log::info!("sealing {}-word seed", raw.word_count().words());
        let params = self.config.kdf;
        let job = tokio::task::spawn_blocking(move || {
            let sealed = crypto::seal(&raw, &pin, &params);
            (raw, sealed)
        });

        let (raw, sealed) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            joined = job => joined.map_err(|e| worker_failed("seal", e))?,
        };
        let encrypted = sealed?;

        ensure_live(cancel)?;
        if let Err(e) = self.services.store.save_encrypted(&encrypted).await {
            log::warn!("failed to persist encrypted seed: {}", e);
        }
        ensure_live(cancel)?;

        *lock(&self.encrypted) = Some(encrypted.clone());
        *lock(&self.seed) = Some(raw);
        flight.finish(SessionState::Sealed);
        log::info!("seed sealed");
        Ok(encrypted)
    }

    /// Open the session's backup with its PIN and hand the seed to the store.
    ///
    /// A wrong PIN or corrupted backup leaves the session `Failed`; there is
    /// no retry.
    pub async fn decrypt_and_store_seed(&self, cancel: &CancelToken) -> Result<(), SessionError> {
        let mut flight = self.begin(&[SessionState::Idle], SessionState::Opening)?;
        let encrypted = lock(&self.encrypted)
            .clone()
            .ok_or(SessionError::SeedUnavailable)?;
        let pin = flight.take_pin()?;

        log::info!("opening encrypted seed");
        let job = tokio::task::spawn_blocking(move || crypto::open(&encrypted, &pin));

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            joined = job => joined.map_err(|e| worker_failed("open", e))?,
        };
        let raw = match opened {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("restore failed: {}", e);
                flight.finish(SessionState::Failed);
                return Err(e.into());
            }
        };

        ensure_live(cancel)?;
        if let Err(e) = self.services.store.save_seed(&raw).await {
            log::warn!("failed to persist restored seed: {}", e);
        }
        ensure_live(cancel)?;

        *lock(&self.seed) = Some(raw);
        flight.finish(SessionState::Restored);
        log::info!("seed restored");
        Ok(())
    }

    /// Ask the lookup service whether the restored account has been used.
    pub async fn validate_account(
        &self,
        cancel: &CancelToken,
    ) -> Result<AccountStatus, SessionError> {
        let flight = match self.begin(&CHECKABLE, SessionState::Checking) {
            Err(SessionError::InvalidState(_)) if lock(&self.seed).is_none() => {
                return Err(SessionError::SeedUnavailable);
            }
            begun => begun?,
        };

        let derived = {
            let guard = lock(&self.seed);
            let derived = guard.as_ref().map(|raw| self.services.deriver.derive(raw));
            derived
        };
        let account = match derived {
            None => return Err(SessionError::SeedUnavailable),
            Some(Ok(account)) => account,
            Some(Err(e)) => {
                log::warn!("account derivation failed: {}", e);
                flight.finish(SessionState::CheckFailed);
                return Err(e.into());
            }
        };

        log::info!("checking account existence");
        log::debug!("account {}", account);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            result = self.services.lookup.exists(&account) => result,
        };
        ensure_live(cancel)?;

        match result {
            Ok(status) => {
                flight.finish(match status {
                    AccountStatus::Found => SessionState::AccountFound,
                    AccountStatus::NotFound => SessionState::AccountNotFound,
                });
                log::info!("account check complete: {:?}", status);
                Ok(status)
            }
            Err(e) => {
                log::warn!("account lookup failed: {}", e);
                flight.finish(SessionState::CheckFailed);
                Err(SessionError::CheckFailed(e.to_string()))
            }
        }
    }

    /// The QR payload string for the held backup.
    pub fn qr_payload(&self) -> Result<String, SessionError> {
        let encrypted = lock(&self.encrypted)
            .clone()
            .ok_or(SessionError::SeedUnavailable)?;
        Ok(backup::to_qr_payload(&encrypted, self.config.qr)?)
    }

    /// Render the held backup through the injected QR renderer.
    pub fn encrypted_seed_qr_image(&self) -> Result<Vec<u8>, SessionError> {
        let payload = self.qr_payload()?;
        Ok(backup::render_qr(self.services.renderer.as_ref(), &payload)?)
    }

    pub fn seed_array(&self) -> Result<SeedWords, SessionError> {
        let guard = lock(&self.seed);
        let raw = guard.as_ref().ok_or(SessionError::SeedUnavailable)?;
        Ok(seed::encode(raw)?)
    }

    pub fn seed_string(&self) -> Result<Zeroizing<String>, SessionError> {
        Ok(seed::to_display_string(&self.seed_array()?))
    }

    /// Compare a scanned QR string with the backup this session holds.
    pub fn validate_qr_code(&self, scanned: &str) -> Result<bool, SessionError> {
        let encrypted = lock(&self.encrypted)
            .clone()
            .ok_or(SessionError::SeedUnavailable)?;
        Ok(backup::validate(scanned, &encrypted))
    }

    /// Drop the plaintext seed. The backup stays.
    pub fn clear_seed(&self) {
        let taken = lock(&self.seed).take();
        if taken.is_some() {
            log::info!("plaintext seed cleared from session");
        }
    }

    fn begin(
        &self,
        allowed: &[SessionState],
        entering: SessionState,
    ) -> Result<Flight<'_>, SessionError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::OperationInProgress);
        }

        let mut state = lock(&self.state);
        let current = *state;
        if !allowed.contains(&current) {
            drop(state);
            self.busy.store(false, Ordering::Release);
            return Err(SessionError::InvalidState(current));
        }
        *state = entering;
        log::debug!("session {:?} -> {:?}", current, entering);

        Ok(Flight {
            session: self,
            resume: current,
            pin: None,
            finished: false,
        })
    }
}

impl std::fmt::Debug for BackupSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupSession")
            .field("state", &self.state())
            .field("has_backup", &lock(&self.encrypted).is_some())
            .field("has_seed", &lock(&self.seed).is_some())
            .field("has_pin", &self.has_pin())
            .finish()
    }
}

/// Holds the single-flight slot for one operation.
///
/// Dropped without [`finish`](Self::finish) (error, cancellation, abandoned
/// future), it puts the previous state and any PIN it took back.
struct Flight<'a> {
    session: &'a BackupSession,
    resume: SessionState,
    pin: Option<PinCode>,
    finished: bool,
}

impl Flight<'_> {
    /// Move the session PIN into this flight and hand out a copy for the
    /// worker. Both copies are zeroized on drop.
    fn take_pin(&mut self) -> Result<PinCode, SessionError> {
        let pin = lock(&self.session.pin)
            .take()
            .ok_or(SessionError::InvalidState(self.resume))?;
        self.pin = Some(pin.clone());
        Ok(pin)
    }

    fn finish(mut self, state: SessionState) {
        *lock(&self.session.state) = state;
        self.pin = None;
        self.finished = true;
        log::debug!("session -> {:?}", state);
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *lock(&self.session.state) = self.resume;
            if let Some(pin) = self.pin.take() {
                *lock(&self.session.pin) = Some(pin);
            }
            log::debug!("operation abandoned, session back to {:?}", self.resume);
        }
        self.session.busy.store(false, Ordering::Release);
    }
}

fn ensure_live(cancel: &CancelToken) -> Result<(), SessionError> {
    if cancel.is_cancelled() {
        return Err(cancelled());
    }
    Ok(())
}

fn worker_failed(op: &str, e: tokio::task::JoinError) -> SessionError {
    SessionError::Internal(format!("{} worker failed: {}", op, e))
}

fn cancelled() -> SessionError {
    log::info!("operation cancelled");
    SessionError::Cancelled
}

/// Session locks are never held across an await or a panic-prone call, so a
/// poisoned lock still holds consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
