/// Persistent key-value storage bootstrap.
use anyhow::{bail, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageInitError {
    /// Partition is full or was truncated.
    NoFreePages,
    /// Partition was written by a newer storage format.
    NewVersionFound,
    Other(i32),
}

impl StorageInitError {
    /// Errors that an erase is expected to clear.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StorageInitError::NoFreePages | StorageInitError::NewVersionFound)
    }
}

impl fmt::Display for StorageInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageInitError::NoFreePages => write!(f, "no free pages"),
            StorageInitError::NewVersionFound => write!(f, "new version found"),
            StorageInitError::Other(code) => write!(f, "error code {} (0x{:x})", code, code),
        }
    }
}

impl std::error::Error for StorageInitError {}

pub trait StorageBackend {
    fn init(&mut self) -> Result<(), StorageInitError>;
    fn erase(&mut self) -> Result<(), StorageInitError>;
}

/// Initialise storage, erasing and retrying once when the partition is
/// unusable but recoverable. Anything else is fatal.
pub fn init_with_recovery<B: StorageBackend>(backend: &mut B) -> Result<()> {
    match backend.init() {
        Ok(()) => {
            log::info!("NVS initialized");
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            log::warn!("NVS init failed ({}), erasing partition", e);
            if let Err(erase_err) = backend.erase() {
                bail!("NVS erase failed: {}", erase_err);
            }
            match backend.init() {
                Ok(()) => {
                    log::info!("NVS initialized after erase");
                    Ok(())
                }
                Err(retry_err) => bail!("NVS init failed after erase: {}", retry_err),
            }
        }
        Err(e) => bail!("NVS init failed: {}", e),
    }
}
