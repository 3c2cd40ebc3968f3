//! Error types for cart operations and the storefront as a whole.

use rocketshoes_core::{CartChangeError, ProductId};
use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Why a cart operation did not change the cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// The requested amount exceeds the product's stock.
    #[error("Requested {requested} of product {product_id}, only {available} in stock")]
    StockUnavailable {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    /// The product to remove or update is not in the cart.
    #[error("Product {0} is not in the cart")]
    ProductNotFound(ProductId),

    /// The change would break a cart invariant.
    #[error("Invalid cart change: {0}")]
    InvalidChange(CartChangeError),

    /// Catalog or stock lookup failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The new cart could not be persisted.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CartError {
    /// Whether this failure is a stock shortfall rather than a fault.
    #[must_use]
    pub const fn is_stock_unavailable(&self) -> bool {
        matches!(self, Self::StockUnavailable { .. })
    }
}

impl From<CartChangeError> for CartError {
    fn from(err: CartChangeError) -> Self {
        match err {
            CartChangeError::NotInCart(id) => Self::ProductNotFound(id),
            other => Self::InvalidChange(other),
        }
    }
}

/// Top-level error for front ends embedding the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
