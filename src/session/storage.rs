//! Token persistence between runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Access/refresh pair exactly as issued by `POST /token/` and exactly as
/// written to disk. Both strings are opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Where the token pair lives between runs.
///
/// The pair is one unit: implementations never hold one token without the
/// other, and `clear` removes both together.
pub trait TokenStorage: Send + Sync {
    /// Load the stored pair. Absence and corruption both read as `None`.
    fn load(&self) -> Option<TokenPair>;

    fn save(&self, pair: &TokenPair) -> io::Result<()>;

    /// Remove any stored pair. Idempotent; failures are logged, not raised.
    fn clear(&self);
}

/// Stores the pair as one JSON document on disk, readable only by the
/// current user.
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Option<TokenPair> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read credentials file");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt credentials file");
                None
            }
        }
    }

    fn save(&self, pair: &TokenPair) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(pair)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, serialized)?;

        // Keep bearer tokens out of reach of other users (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove credentials file")
            }
        }
    }
}

/// In-process storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTokenStorage {
    pair: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a pair, as if a previous run had saved it.
    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            pair: Mutex::new(Some(pair)),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Option<TokenPair> {
        self.pair.lock().clone()
    }

    fn save(&self, pair: &TokenPair) -> io::Result<()> {
        *self.pair.lock() = Some(pair.clone());
        Ok(())
    }

    fn clear(&self) {
        *self.pair.lock() = None;
    }
}
