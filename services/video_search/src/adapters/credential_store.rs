//! services/video_search/src/adapters/credential_store.rs
//!
//! Adapters for the `CredentialStore` port: the persisted single-entry store
//! the gateway reads its bearer credential from, and a process-local variant.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use video_search_core::ports::{CredentialStore, PortError, PortResult};

//=========================================================================================
// File-backed Store
//=========================================================================================

/// Keeps the bearer credential in a single file, readable only by the owner.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> PortResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok(if token.is_empty() { None } else { Some(token.to_string()) })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &self.path, e)),
        }
    }

    fn store(&self, token: &str) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
        }
        fs::write(&self.path, token).map_err(|e| io_error("write", &self.path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| io_error("protect", &self.path, e))?;
        }

        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &self.path, e)),
        }
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("Failed to {} {}: {}", action, path.display(), e))
}

//=========================================================================================
// In-memory Store
//=========================================================================================

/// Holds the credential for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: RwLock::new(Some(token.into())) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> PortResult<Option<String>> {
        self.token
            .read()
            .map(|t| t.clone())
            .map_err(|_| PortError::Unexpected("credential store lock poisoned".to_string()))
    }

    fn store(&self, token: &str) -> PortResult<()> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| PortError::Unexpected("credential store lock poisoned".to_string()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| PortError::Unexpected("credential store lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}
