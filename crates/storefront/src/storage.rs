//! Durable client-local key-value storage.
//!
//! Values are strings, as in a browser's `localStorage`. The cart is kept
//! under [`CART_STORAGE_KEY`] as a JSON array of line items.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rocketshoes_core::Cart;
use thiserror::Error;

/// Storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "@RocketShoes:cart";

/// Errors raised by durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stored data could not be decoded.
    #[error("Corrupt data in {location}: {message}")]
    Corrupt { location: String, message: String },

    /// A value could not be encoded.
    #[error("Encode error: {0}")]
    Encode(String),
}

/// String key-value store that survives restarts.
pub trait KeyValueStorage: Send + Sync {
    /// Value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// LocalStorage
// =============================================================================

/// File-backed storage: one JSON object mapping keys to string values.
///
/// Every write rewrites the whole file through a temporary sibling that is
/// renamed into place, so a crash mid-write leaves the previous contents.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl LocalStorage {
    /// Open the storage file at `path`, starting empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` if the file exists but is not a JSON
    /// object of strings, or `StorageError::Io` if it cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| StorageError::Corrupt {
                location: path.display().to_string(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened local storage");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let contents =
            serde_json::to_string_pretty(entries).map_err(|e| StorageError::Encode(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStorage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.flush(&entries) {
            // Keep memory consistent with what is on disk.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.flush(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage that lasts as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

// =============================================================================
// CartPersistence
// =============================================================================

/// Reads and writes the cart snapshot in a [`KeyValueStorage`].
#[derive(Debug)]
pub struct CartPersistence<S> {
    storage: S,
}

impl<S: KeyValueStorage> CartPersistence<S> {
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// The underlying storage.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the persisted cart; an absent key is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` if the stored value is not a valid
    /// cart, or any error from the underlying storage.
    pub fn load(&self) -> Result<Cart, StorageError> {
        let Some(raw) = self.storage.get(CART_STORAGE_KEY)? else {
            return Ok(Cart::new());
        };

        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
            location: CART_STORAGE_KEY.to_string(),
            message: e.to_string(),
        })
    }

    /// Persist `cart`, replacing the previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be encoded or written.
    pub fn save(&self, cart: &Cart) -> Result<(), StorageError> {
        let raw = serde_json::to_string(cart).map_err(|e| StorageError::Encode(e.to_string()))?;
        self.storage.set(CART_STORAGE_KEY, &raw)
    }

    /// Forget the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(CART_STORAGE_KEY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rocketshoes_core::{CartItem, Price, Product, ProductId};

    use super::*;

    fn sample_cart() -> Cart {
        let product = Product {
            id: ProductId::new(1),
            title: "Tênis de Caminhada Leve Confortável".to_string(),
            price: Price::from_cents(17990),
            image: "https://cdn.example.com/tenis1.jpg".to_string(),
        };
        Cart::new()
            .with_item(CartItem::new(product, 2).unwrap())
            .unwrap()
    }

    #[test]
    fn test_memory_storage_get_set_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));

        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
        storage.remove("k").unwrap();
    }

    #[test]
    fn test_local_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = LocalStorage::open(&path).unwrap();
        storage.set(CART_STORAGE_KEY, "[]").unwrap();
        storage.set("other", "1").unwrap();
        drop(storage);

        let reopened = LocalStorage::open(&path).unwrap();
        assert_eq!(reopened.get(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("1"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_local_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_local_storage_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").unwrap();

        let err = LocalStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn test_cart_round_trip() {
        let persistence = CartPersistence::new(MemoryStorage::new());
        assert!(persistence.load().unwrap().is_empty());

        let cart = sample_cart();
        persistence.save(&cart).unwrap();
        assert_eq!(persistence.load().unwrap(), cart);

        persistence.clear().unwrap();
        assert!(persistence.load().unwrap().is_empty());
    }

    #[test]
    fn test_cart_stored_as_item_array() {
        let persistence = CartPersistence::new(MemoryStorage::new());
        persistence.save(&sample_cart()).unwrap();

        let raw = persistence.storage().get(CART_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["id"], 1);
        assert_eq!(value[0]["amount"], 2);
        assert_eq!(value[0]["price"], 179.9);
    }

    #[test]
    fn test_corrupt_cart_is_reported() {
        let storage = MemoryStorage::new();
        storage.set(CART_STORAGE_KEY, "[{\"id\": 1}").unwrap();

        let err = CartPersistence::new(storage).load().unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
