//! Cart lines and the ordered cart state.

use serde::{Deserialize, Serialize};

use crate::types::{Price, Product, ProductId};

/// One entry in the cart: a product snapshot and how many of it.
///
/// The product is an owned copy taken at insertion time. Later catalog edits
/// do not change what the cart shows or charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Snapshot of the product when it was first added.
    pub product: Product,
    /// Always at least 1 while the line is in a [`CartState`].
    pub quantity: u32,
}

impl CartLine {
    /// `quantity × snapshot price`.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Ordered cart contents, at most one line per product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    lines: Vec<CartLine>,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a state from arbitrary lines, restoring the invariants.
    ///
    /// Lines with quantity 0 are dropped. Repeated product ids are merged into
    /// the first occurrence by summing quantities (saturating).
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut state = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match state.position(&line.product.id) {
                Some(idx) => {
                    if let Some(existing) = state.lines.get_mut(idx) {
                        existing.quantity = existing.quantity.saturating_add(line.quantity);
                    }
                }
                None => state.lines.push(line),
            }
        }
        state
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product.id == product_id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of `quantity × snapshot price` over all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    pub(crate) fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|l| &l.product.id == product_id)
    }

    pub(crate) fn line_mut(&mut self, idx: usize) -> Option<&mut CartLine> {
        self.lines.get_mut(idx)
    }

    pub(crate) fn push(&mut self, line: CartLine) {
        self.lines.push(line);
    }

    pub(crate) fn remove_at(&mut self, idx: usize) -> CartLine {
        self.lines.remove(idx)
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }
}
