//! TechMart Storefront library.
//!
//! Everything between the core cart/catalog logic and a front end:
//!
//! - [`config`] - Environment configuration
//! - [`backend`] - The data-source trait and its errors
//! - [`supabase`] - Supabase REST client (catalog reads, admin writes, storage)
//! - [`catalog`] - Cached, normalized catalog service
//! - [`cart`] - Cart storage, debounced persistence and sessions
//! - [`admin`] - Product and image management
//! - [`error`] - Unified `AppError`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod backend;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod supabase;

pub use backend::{BackendError, CatalogBackend};
pub use config::StorefrontConfig;
pub use error::AppError;
