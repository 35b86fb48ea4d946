//! Drop results of fetches that were superseded before they finished.

use std::sync::atomic::{AtomicU64, Ordering};

/// Proof that a fetch was started; compare it against the guard on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// Issues increasing [`FetchTicket`]s and remembers the newest one.
///
/// A view that starts a fetch for product A and then for product B must not
/// render A if A's response arrives last. Take a ticket before each fetch
/// and pass the result through [`FetchGuard::accept`].
#[derive(Debug, Default)]
pub struct FetchGuard {
    latest: AtomicU64,
}

impl FetchGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch. Every earlier ticket becomes stale.
    pub fn begin(&self) -> FetchTicket {
        FetchTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` is still the newest one issued.
    #[must_use]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Keep `value` only if its fetch was not superseded.
    pub fn accept<T>(&self, ticket: FetchTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            tracing::debug!(ticket = ticket.0, "Discarding superseded fetch result");
            None
        }
    }
}
