//! Durable token storage and the shared token store.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::crypto::{looks_encrypted, open_pair, seal_pair, EncryptedTokenFile, KdfCost};
use super::types::TokenPair;
use crate::error::StoreError;

/// Backend for persisting the token pair.
///
/// Implementations write and remove both halves as a single record so no
/// reader can observe a half-updated pair.
pub trait TokenStorage: Send {
    fn load(&mut self) -> Result<Option<TokenPair>, StoreError>;
    fn save(&mut self, pair: &TokenPair) -> Result<(), StoreError>;
    /// Remove the stored pair. Removing an absent pair is not an error.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    pair: Option<TokenPair>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: TokenPair) -> Self {
        Self { pair: Some(pair) }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&mut self) -> Result<Option<TokenPair>, StoreError> {
        Ok(self.pair.clone())
    }

    fn save(&mut self, pair: &TokenPair) -> Result<(), StoreError> {
        self.pair = Some(pair.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.pair = None;
        Ok(())
    }
}

/// Encrypted single-file storage (`~/.config/enwis/tokens.json` by default).
///
/// The decrypted pair is cached after the first read; writes go through a
/// temp file and rename so the previous pair is replaced in one step.
#[derive(Debug)]
pub struct FileTokenStorage {
    path: PathBuf,
    cost: KdfCost,
    cached: Option<Option<TokenPair>>,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_kdf_cost(path, KdfCost::default())
    }

    pub fn with_kdf_cost(path: impl Into<PathBuf>, cost: KdfCost) -> Self {
        Self {
            path: path.into(),
            cost,
            cached: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Option<TokenPair>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err)),
        };
        let value: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
            StoreError::Invalid(format!(
                "failed to parse token file `{}`: {err}",
                self.path.display()
            ))
        })?;

        if looks_encrypted(&value) {
            let sealed: EncryptedTokenFile = serde_json::from_value(value).map_err(|err| {
                StoreError::Invalid(format!(
                    "failed to parse encrypted token file `{}`: {err}",
                    self.path.display()
                ))
            })?;
            return Ok(Some(open_pair(&sealed)?).filter(TokenPair::is_complete));
        }

        // Plaintext pair left by an older build: re-seal it in place.
        let pair: TokenPair = serde_json::from_value(value).map_err(|err| {
            StoreError::Invalid(format!(
                "failed to parse token file `{}`: {err}",
                self.path.display()
            ))
        })?;
        if !pair.is_complete() {
            return Ok(None);
        }
        if let Err(err) = self.write_file(&pair) {
            tracing::warn!(path = %self.path.display(), "failed to migrate plaintext token file: {err}");
        }
        Ok(Some(pair))
    }

    fn write_file(&self, pair: &TokenPair) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700));
            }
        }

        let sealed = seal_pair(pair, self.cost)?;
        let text = serde_json::to_string_pretty(&sealed).map_err(|err| {
            StoreError::Invalid(format!("failed to serialize encrypted token file: {err}"))
        })?;

        let staging = self.path.with_extension("json.tmp");
        let mut options = std::fs::OpenOptions::new();
        options.create(true).truncate(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&staging)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&mut self) -> Result<Option<TokenPair>, StoreError> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }
        let loaded = self.read_file()?;
        self.cached = Some(loaded.clone());
        Ok(loaded)
    }

    fn save(&mut self, pair: &TokenPair) -> Result<(), StoreError> {
        self.cached = None;
        self.write_file(pair)?;
        self.cached = Some(Some(pair.clone()));
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.cached = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::Io(err)),
        }
        self.cached = Some(None);
        Ok(())
    }
}

/// Shared handle over the configured [`TokenStorage`].
///
/// Every read and write takes the same lock, so the pair is always observed
/// either before or after a save, never in between.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<Mutex<Box<dyn TokenStorage>>>,
}

impl TokenStore {
    pub fn new(storage: impl TokenStorage + 'static) -> Self {
        Self {
            storage: Arc::new(Mutex::new(Box::new(storage))),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStorage::new())
    }

    /// Replace any stored pair with `pair`.
    ///
    /// Blocks the calling thread: the file backend derives its key with
    /// scrypt on every save. Async callers use [`TokenStore::persist`].
    pub fn save_tokens(&self, pair: &TokenPair) -> Result<(), StoreError> {
        self.lock().save(pair)
    }

    /// [`TokenStore::save_tokens`] on the blocking pool.
    pub async fn persist(&self, pair: TokenPair) -> Result<(), StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.save_tokens(&pair))
            .await
            .map_err(|err| StoreError::Invalid(format!("token save task failed: {err}")))?
    }

    /// Forget the stored pair. Idempotent.
    pub fn logout(&self) -> Result<(), StoreError> {
        self.lock().clear()
    }

    /// Current pair, or `None` when logged out or only half present.
    pub fn tokens(&self) -> Result<Option<TokenPair>, StoreError> {
        Ok(self.lock().load()?.filter(TokenPair::is_complete))
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.tokens()?.map(|pair| pair.access_token))
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.tokens()?.map(|pair| pair.refresh_token))
    }

    pub fn has_session(&self) -> bool {
        matches!(self.tokens(), Ok(Some(_)))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn TokenStorage>> {
        self.storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
