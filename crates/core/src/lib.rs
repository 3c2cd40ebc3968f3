//! RocketShoes Core - Shared types library.
//!
//! This crate provides common types used across all RocketShoes components:
//! - `storefront` - Cart store, catalog client, durable storage and views
//! - `cli` - Command-line storefront
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. Every cart operation here takes a snapshot and returns
//! a new one, which keeps it usable from any runtime.
//!
//! # Modules
//!
//! - [`types`] - Product ids, prices, products, stock and the cart snapshot

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
