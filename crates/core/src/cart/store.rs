//! The cart store: owner of [`CartState`] and its subscribers.

use core::fmt;

use super::state::{CartLine, CartState};
use crate::types::{Price, Product, ProductId};

/// What changed in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// One or more units of a product were added.
    Added {
        /// Product that was added.
        product_id: ProductId,
        /// Units added by this call.
        added: u32,
        /// Line quantity after the call.
        quantity: u32,
    },
    /// A line's quantity was set to a new value (still >= 1).
    QuantityChanged {
        /// Product whose line changed.
        product_id: ProductId,
        /// Quantity before the change.
        from: u32,
        /// Quantity after the change.
        to: u32,
    },
    /// A line was deleted.
    Removed {
        /// Product whose line was deleted.
        product_id: ProductId,
    },
    /// All lines were deleted.
    Cleared,
    /// The state was replaced by one loaded from storage.
    Restored,
}

/// Handle returned by [`CartStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&CartEvent, &CartState) + Send>;

/// Authoritative cart for one session.
///
/// Every operation is synchronous and total: unknown product ids are no-ops,
/// never errors, so a UI action racing a removal cannot fail. Subscribers are
/// called after each mutation that actually changed the state, in
/// subscription order.
///
/// ```
/// use techmart_core::{CartStore, Price, Product, ProductId};
///
/// let product = Product {
///     id: ProductId::new("p1"),
///     name: "Power bank".into(),
///     description: None,
///     price: Price::from_units(1000),
///     images: vec![],
///     created_at: None,
/// };
///
/// let mut cart = CartStore::new();
/// cart.add_to_cart(&product);
/// cart.add_to_cart(&product);
/// assert_eq!(cart.total_items(), 2);
/// assert_eq!(cart.total_price(), Price::from_units(2000));
///
/// cart.update_quantity(&product.id, 0);
/// assert!(cart.is_empty());
/// ```
#[derive(Default)]
pub struct CartStore {
    state: CartState,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl CartStore {
    /// An empty cart with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cart seeded with `state`, normalized. No notification is emitted.
    #[must_use]
    pub fn with_state(state: CartState) -> Self {
        Self {
            state: CartState::from_lines(state.lines().iter().cloned()),
            ..Self::default()
        }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register a callback invoked after every effective mutation.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&CartEvent, &CartState) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self, event: &CartEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(event, &self.state);
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product`.
    ///
    /// Increments the existing line, or appends a new line with quantity 1.
    pub fn add_to_cart(&mut self, product: &Product) {
        self.add_quantity(product, 1);
    }

    /// Add `count` units of `product` with a single notification.
    ///
    /// Same result as `count` calls to [`add_to_cart`](Self::add_to_cart).
    /// `count == 0` is a no-op.
    pub fn add_quantity(&mut self, product: &Product, count: u32) {
        if count == 0 {
            return;
        }

        let quantity = match self.state.position(&product.id) {
            Some(idx) => match self.state.line_mut(idx) {
                Some(line) => {
                    line.quantity = line.quantity.saturating_add(count);
                    line.quantity
                }
                None => return,
            },
            None => {
                self.state.push(CartLine {
                    product: product.clone(),
                    quantity: count,
                });
                count
            }
        };

        self.notify(&CartEvent::Added {
            product_id: product.id.clone(),
            added: count,
            quantity,
        });
    }

    /// Delete the line for `product_id`. No-op if absent.
    pub fn remove_from_cart(&mut self, product_id: &ProductId) {
        if let Some(idx) = self.state.position(product_id) {
            let removed = self.state.remove_at(idx);
            self.notify(&CartEvent::Removed {
                product_id: removed.product.id,
            });
        }
    }

    /// Set the quantity of a line to exactly `new_quantity`.
    ///
    /// Zero or negative quantities remove the line. Quantities above
    /// `u32::MAX` saturate. No-op if the product is not in the cart.
    pub fn update_quantity(&mut self, product_id: &ProductId, new_quantity: i64) {
        if new_quantity <= 0 {
            self.remove_from_cart(product_id);
            return;
        }

        let to = u32::try_from(new_quantity).unwrap_or(u32::MAX);
        let Some(idx) = self.state.position(product_id) else {
            return;
        };
        let Some(line) = self.state.line_mut(idx) else {
            return;
        };
        let from = line.quantity;
        if from == to {
            return;
        }
        line.quantity = to;

        self.notify(&CartEvent::QuantityChanged {
            product_id: product_id.clone(),
            from,
            to,
        });
    }

    /// Empty the cart.
    pub fn clear_cart(&mut self) {
        if self.state.is_empty() {
            return;
        }
        self.state.clear();
        self.notify(&CartEvent::Cleared);
    }

    /// Replace the contents with a state loaded from storage.
    pub fn restore(&mut self, state: CartState) {
        self.state = CartState::from_lines(state.lines().iter().cloned());
        self.notify(&CartEvent::Restored);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Sum of all line quantities (the cart badge number).
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.state.total_items()
    }

    /// Sum of `quantity × snapshot price` over all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.state.total_price()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.state.lines()
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.state.line(product_id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
