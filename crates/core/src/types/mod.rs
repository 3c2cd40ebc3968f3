//! Core types for RocketShoes.
//!
//! This module provides type-safe wrappers for the storefront's domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;

pub use cart::{Cart, CartChangeError, CartItem};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::{Product, Stock};
