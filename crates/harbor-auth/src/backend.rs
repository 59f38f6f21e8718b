//! Durable persistence behind the token store
//!
//! The store never touches the filesystem directly; it talks to a
//! [`TokenBackend`], so embedders pick where session state lives and tests
//! substitute an in-memory backend. [`FileBackend`] keeps the three durable
//! entries (access token, refresh token, expiry) in a single JSON document,
//! written atomically via temp-file + rename so a crash mid-write cannot
//! leave a torn pair on disk.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::TokenPair;

/// Storage abstraction consumed by [`crate::TokenStore`].
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn TokenBackend>`).
pub trait TokenBackend: Send + Sync {
    /// Load the persisted pair, if any.
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<TokenPair>>> + Send + '_>>;

    /// Persist the pair, replacing whatever was stored before.
    fn persist<'a>(
        &'a self,
        pair: &'a TokenPair,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Remove all persisted token state as a unit.
    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// File-backed storage: one JSON document holding the token pair.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenBackend for FileBackend {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<TokenPair>>> + Send + '_>> {
        Box::pin(async move {
            if !self.path.exists() {
                return Ok(None);
            }
            let contents = tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
            let pair: TokenPair = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing token file: {e}")))?;
            Ok(Some(pair))
        })
    }

    fn persist<'a>(
        &'a self,
        pair: &'a TokenPair,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move { write_atomic(&self.path, pair).await })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "removed token file");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(format!("removing token file: {e}"))),
            }
        })
    }
}

/// Write the token pair to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. This prevents corruption if the process crashes mid-write.
/// Sets file permissions to 0600 (owner read/write only) since the file
/// contains session credentials.
async fn write_atomic(path: &Path, pair: &TokenPair) -> Result<()> {
    let json = serde_json::to_string_pretty(pair)
        .map_err(|e| Error::Parse(format!("serializing tokens: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("token path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".session-tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted session tokens");
    Ok(())
}

/// In-memory storage for tests and embedders without durable state.
pub struct MemoryBackend {
    state: Mutex<Option<TokenPair>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBackend for MemoryBackend {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<TokenPair>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.lock().await.clone()) })
    }

    fn persist<'a>(
        &'a self,
        pair: &'a TokenPair,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            *self.state.lock().await = Some(pair.clone());
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            *self.state.lock().await = None;
            Ok(())
        })
    }
}
