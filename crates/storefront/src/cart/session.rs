//! One cart per application session, restored on open and saved on change.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use techmart_core::{CartState, CartStore};

use super::persister::CartPersister;
use super::storage::CartStorage;

/// A [`CartStore`] wired to durable storage.
///
/// Opening restores the last saved cart; every effective change is then
/// written through a debounced [`CartPersister`]. Call
/// [`CartSession::close`] before exiting so the last change is not lost.
pub struct CartSession<S: CartStorage> {
    store: CartStore,
    persister: CartPersister,
    storage: Arc<S>,
}

impl<S: CartStorage> CartSession<S> {
    /// Restore the cart from `storage` and start persisting changes.
    ///
    /// A cart that cannot be loaded is logged and replaced by an empty one.
    pub async fn open(storage: S, debounce: Duration) -> Self {
        let storage = Arc::new(storage);
        let state = load_or_empty(&storage).await;

        let mut store = CartStore::with_state(state);
        let persister = CartPersister::spawn(Arc::clone(&storage), debounce);
        store.subscribe(persister.subscriber());

        Self {
            store,
            persister,
            storage,
        }
    }

    /// Read access for rendering.
    #[must_use]
    pub const fn store(&self) -> &CartStore {
        &self.store
    }

    /// Mutable access for cart actions.
    pub const fn store_mut(&mut self) -> &mut CartStore {
        &mut self.store
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Wait until the current cart is written.
    pub async fn flush(&self) {
        self.persister.flush().await;
    }

    /// Save the current cart and stop the persister.
    pub async fn close(self) {
        self.persister.shutdown().await;
    }
}

impl<S: CartStorage> std::fmt::Debug for CartSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession")
            .field("store", &self.store)
            .field("persister", &self.persister)
            .finish_non_exhaustive()
    }
}

async fn load_or_empty<S: CartStorage>(storage: &Arc<S>) -> CartState {
    let storage = Arc::clone(storage);
    match tokio::task::spawn_blocking(move || storage.load()).await {
        Ok(Ok(Some(state))) => {
            info!(lines = state.len(), "Restored saved cart");
            state
        }
        Ok(Ok(None)) => CartState::default(),
        Ok(Err(e)) => {
            warn!(error = %e, "Could not load saved cart, starting with an empty cart");
            CartState::default()
        }
        Err(e) => {
            warn!(error = %e, "Cart load task failed, starting with an empty cart");
            CartState::default()
        }
    }
}
