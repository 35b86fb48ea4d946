//! Client-side shopping cart.
//!
//! [`CartStore`] owns a [`CartState`] and is the only way to change it.
//! Consumers read totals and lines through the store and re-render when a
//! subscriber callback fires; they never mutate the state directly.
//!
//! There is no I/O here. Persisting the state between sessions is the job of
//! the storefront crate, which subscribes to the store.

mod state;
mod store;

pub use state::{CartLine, CartState};
pub use store::{CartEvent, CartStore, SubscriptionId};
