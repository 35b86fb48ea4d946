//! Cart persistence for the storefront.
//!
//! The cart logic lives in `techmart_core::cart`; this module loads it at
//! startup and keeps durable storage in step with it.

mod persister;
mod session;
mod storage;

pub use persister::{CartPersister, MAX_WAIT_WINDOWS};
pub use session::CartSession;
pub use storage::{CartStorage, JsonFileStorage, MemoryStorage, StorageError};
