//! TechMart Core - Shared types and storefront logic.
//!
//! Products, prices, the cart store and the catalog normalizer. The
//! `techmart-storefront` crate adds the backend client and persistence on
//! top of these.
//!
//! # Architecture
//!
//! The core crate contains only types and synchronous logic - no I/O, no
//! network clients, no async runtime. This keeps the cart and the catalog
//! normalizer testable in isolation and usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product ids, prices and the canonical [`Product`]
//! - [`cart`] - The cart store and its state
//! - [`catalog`] - Normalization of raw backend rows into [`Product`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod types;

pub use cart::{CartEvent, CartLine, CartState, CartStore, SubscriptionId};
pub use catalog::{CatalogPage, MalformedReason, MalformedRecordError};
pub use types::*;
