//! Durable token storage
//!
//! A token store holds exactly one `TokenPair`, loaded and saved as a unit.
//! `FileTokenStore` keeps it in a JSON file shaped like the provider's token
//! response. All writes use atomic temp-file + rename so a crash mid-write
//! leaves either the old or the new document, never a torn one. A tokio
//! Mutex serializes concurrent writes from this process.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::token::TokenPair;

/// Whole-document persistence for the current token pair.
///
/// Uses `Pin<Box<dyn Future>>` return types so the controller can hold an
/// `Arc<dyn TokenStore>`.
pub trait TokenStore: Send + Sync {
    /// Read the stored pair.
    ///
    /// `Ok(None)` when nothing usable is stored: no document yet, or a
    /// document holding only one of the two tokens. An unreadable or
    /// unparsable document is an error.
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<TokenPair>>> + Send + '_>>;

    /// Replace the stored document with `tokens`.
    fn save<'a>(
        &'a self,
        tokens: &'a TokenPair,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// On-disk shape. Both fields optional so a partial document is detected
/// and rejected rather than failing to parse.
#[derive(Deserialize)]
struct StoredTokens {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Token store backed by a single JSON file.
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<TokenPair>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "token file not found");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(format!("reading token file: {e}"))),
        };

        let stored: StoredTokens = serde_json::from_str(&contents)
            .map_err(|e| Error::CredentialParse(format!("parsing token file: {e}")))?;

        match TokenPair::from_parts(stored.access_token, stored.refresh_token) {
            Some(pair) => {
                info!(path = %self.path.display(), "loaded tokens");
                Ok(Some(pair))
            }
            None => {
                warn!(path = %self.path.display(), "token file holds an incomplete pair, ignoring");
                Ok(None)
            }
        }
    }

    async fn write(&self, tokens: &TokenPair) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_atomic(&self.path, tokens).await
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<TokenPair>>> + Send + '_>> {
        Box::pin(self.read())
    }

    fn save<'a>(
        &'a self,
        tokens: &'a TokenPair,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.write(tokens))
    }
}

/// Write the token document atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains OAuth tokens.
async fn write_atomic(path: &Path, tokens: &TokenPair) -> Result<()> {
    let json = serde_json::to_string_pretty(tokens)
        .map_err(|e| Error::CredentialParse(format!("serializing tokens: {e}")))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io("token path has no file name".into()))?;

    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    if let Err(e) = write_then_rename(&tmp_path, path, json.as_bytes()).await {
        // Leave no stray temp file holding tokens behind.
        match tokio::fs::remove_file(&tmp_path).await {
            Ok(()) => {}
            Err(cleanup) if cleanup.kind() == std::io::ErrorKind::NotFound => {}
            Err(cleanup) => {
                warn!(path = %tmp_path.display(), error = %cleanup, "failed to remove temp token file");
            }
        }
        return Err(e);
    }

    debug!(path = %path.display(), "persisted tokens");
    Ok(())
}

/// Write the temp file, restrict its permissions, then move it over the target.
async fn write_then_rename(tmp_path: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(tmp_path, contents)
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))
}
