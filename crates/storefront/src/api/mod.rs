//! Catalog and stock API.
//!
//! # Architecture
//!
//! - [`ProductCatalog`] and [`StockChecker`] are the seams the cart store
//!   depends on; tests substitute in-memory implementations
//! - [`ApiClient`] implements both over REST with `reqwest`
//! - Products are cached via `moka` (they are immutable once fetched); stock
//!   is fetched fresh on every call
//!
//! # Endpoints
//!
//! - `GET /products` - every purchasable product
//! - `GET /products/{id}` - a single product
//! - `GET /stock/{id}` - `{id, amount}` for a product

mod cache;
mod client;

use std::future::Future;

use rocketshoes_core::{Product, ProductId, Stock};
use thiserror::Error;

pub use client::ApiClient;

/// Errors that can occur when calling the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Read access to the product catalog.
pub trait ProductCatalog: Send + Sync {
    /// Every purchasable product, in catalog order.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;

    /// A single product by id.
    fn get_product(&self, id: ProductId) -> impl Future<Output = Result<Product, ApiError>> + Send;
}

/// Authoritative stock lookup.
pub trait StockChecker: Send + Sync {
    /// Current stock for a product. Implementations must not cache.
    fn get_stock(&self, id: ProductId) -> impl Future<Output = Result<Stock, ApiError>> + Send;
}
