//! RocketShoes Storefront library.
//!
//! The cart store and everything it talks to: the catalog/stock API client,
//! durable key-value storage, the notification adapter used by front ends,
//! and the derived views (header, product list, cart page).
//!
//! # Example
//!
//! ```rust,ignore
//! use rocketshoes_storefront::{ApiClient, CartStore, LocalStorage, StorefrontConfig};
//!
//! let config = StorefrontConfig::from_env()?;
//! let api = ApiClient::new(&config)?;
//! let storage = LocalStorage::open(&config.storage_path)?;
//! let store = CartStore::open(api, storage)?;
//!
//! store.add_product(ProductId::new(1)).await?;
//! println!("{}", store.snapshot().size_label());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod storage;
pub mod views;

pub use api::{ApiClient, ApiError, ProductCatalog, StockChecker};
pub use cart::{CartActions, CartOperation, CartStore, Notification, Notifier, UpdateProductAmount};
pub use config::StorefrontConfig;
pub use error::{AppError, CartError};
pub use storage::{CartPersistence, KeyValueStorage, LocalStorage, MemoryStorage, StorageError};
