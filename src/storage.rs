//! Durable Storage Module
//!
//! String slots that survive restarts. On Windows the slot files are
//! encrypted with DPAPI for the current user.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// A durable key/value store holding string slots.
///
/// Every call completes its I/O before returning.
pub trait KeyValueStore: Send + Sync {
    /// Read a slot, `None` if it was never written or has been removed
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a slot, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a slot. Removing a missing slot succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed storage, one `<key>.dat` file per slot
pub struct FileStorage {
    storage_path: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory
    pub fn open(storage_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage_path = storage_path.into();
        std::fs::create_dir_all(&storage_path).map_err(|e| StorageError::Io(e.to_string()))?;

        debug!("Session storage initialized at: {:?}", storage_path);

        Ok(Self { storage_path })
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.storage_path.join(format!("{}.dat", key))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let file_path = self.slot_path(key);
        if !file_path.exists() {
            return Ok(None);
        }

        let sealed = std::fs::read(&file_path).map_err(|e| StorageError::Io(e.to_string()))?;
        let plain = unseal(&sealed)?;

        String::from_utf8(plain)
            .map(Some)
            .map_err(|e| StorageError::Decryption(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let sealed = seal(value.as_bytes())?;

        std::fs::write(self.slot_path(key), sealed).map_err(|e| StorageError::Io(e.to_string()))?;

        debug!("Wrote storage slot: {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let file_path = self.slot_path(key);

        match std::fs::remove_file(&file_path) {
            Ok(()) => {
                info!("Removed storage slot: {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

/// In-process storage. Contents are lost when the value is dropped.
#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

#[cfg(windows)]
fn seal(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    dpapi::protect(data)
}

#[cfg(windows)]
fn unseal(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    dpapi::unprotect(data)
}

// Non-Windows builds store slots unencrypted
#[cfg(not(windows))]
fn seal(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    Ok(data.to_vec())
}

#[cfg(not(windows))]
fn unseal(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    Ok(data.to_vec())
}

#[cfg(windows)]
mod dpapi {
    use super::StorageError;
    use std::ptr::null_mut;
    use windows::Win32::Foundation::{LocalFree, HLOCAL};
    use windows::Win32::Security::Cryptography::{
        CryptProtectData, CryptUnprotectData, CRYPTPROTECT_UI_FORBIDDEN, CRYPT_INTEGER_BLOB,
    };

    fn input_blob(data: &[u8]) -> CRYPT_INTEGER_BLOB {
        CRYPT_INTEGER_BLOB {
            cbData: data.len() as u32,
            pbData: data.as_ptr() as *mut u8,
        }
    }

    fn empty_blob() -> CRYPT_INTEGER_BLOB {
        CRYPT_INTEGER_BLOB {
            cbData: 0,
            pbData: null_mut(),
        }
    }

    /// Copy a DPAPI-allocated blob out and release it.
    ///
    /// # Safety
    /// `blob` must have been filled in by a successful DPAPI call.
    unsafe fn take_blob(blob: CRYPT_INTEGER_BLOB) -> Vec<u8> {
        let bytes = std::slice::from_raw_parts(blob.pbData, blob.cbData as usize).to_vec();
        LocalFree(HLOCAL(blob.pbData as *mut std::ffi::c_void));
        bytes
    }

    pub(super) fn protect(data: &[u8]) -> Result<Vec<u8>, StorageError> {
        let input = input_blob(data);
        let mut output = empty_blob();

        unsafe {
            CryptProtectData(
                &input,
                None,
                None,
                None,
                None,
                CRYPTPROTECT_UI_FORBIDDEN,
                &mut output,
            )
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

            Ok(take_blob(output))
        }
    }

    pub(super) fn unprotect(data: &[u8]) -> Result<Vec<u8>, StorageError> {
        let input = input_blob(data);
        let mut output = empty_blob();

        unsafe {
            CryptUnprotectData(
                &input,
                None,
                None,
                None,
                None,
                CRYPTPROTECT_UI_FORBIDDEN,
                &mut output,
            )
            .map_err(|e| StorageError::Decryption(e.to_string()))?;

            Ok(take_blob(output))
        }
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_storage_round_trips_slots() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.set("token", "abc123").unwrap();
        storage.set("userInfo", r#"{"id":1}"#).unwrap();

        assert_eq!(storage.get("token").unwrap().as_deref(), Some("abc123"));
        assert_eq!(storage.get("userInfo").unwrap().as_deref(), Some(r#"{"id":1}"#));
        assert!(dir.path().join("token.dat").exists());
    }

    #[test]
    fn file_storage_missing_slot_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        assert_eq!(storage.get("token").unwrap(), None);
    }

    #[test]
    fn file_storage_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.set("token", "abc").unwrap();
        storage.remove("token").unwrap();
        storage.remove("token").unwrap();

        assert_eq!(storage.get("token").unwrap(), None);
    }

    #[test]
    fn file_storage_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        let storage = FileStorage::open(&nested).unwrap();
        storage.set("token", "x").unwrap();

        assert_eq!(storage.path(), nested.as_path());
        assert!(nested.join("token.dat").exists());
    }

    #[test]
    fn memory_storage_overwrites_and_removes() {
        let storage = MemoryStorage::new();

        storage.set("token", "one").unwrap();
        storage.set("token", "two").unwrap();
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("two"));

        storage.remove("token").unwrap();
        storage.remove("missing").unwrap();
        assert_eq!(storage.get("token").unwrap(), None);
    }
}
