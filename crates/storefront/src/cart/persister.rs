//! Debounced background writes of the cart.
//!
//! Every cart change publishes the full state into a `watch` channel. A
//! single task waits until no change has arrived for the debounce window,
//! then saves the newest state on the blocking pool. Bursts of changes
//! become one write and writes never overlap.
//!
//! A stream of changes that never goes quiet is still written at least once
//! every [`MAX_WAIT_WINDOWS`] debounce windows.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use techmart_core::{CartEvent, CartState};

use super::storage::CartStorage;

/// Longest a pending change waits, in debounce windows.
pub const MAX_WAIT_WINDOWS: u32 = 4;

enum Command {
    Flush(oneshot::Sender<()>),
}

/// Handle to the background save task.
///
/// Must be created inside a Tokio runtime.
pub struct CartPersister {
    latest: Arc<watch::Sender<Option<CartState>>>,
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl CartPersister {
    /// Start the save task for `storage`.
    pub fn spawn<S>(storage: Arc<S>, debounce: Duration) -> Self
    where
        S: CartStorage + ?Sized,
    {
        let (latest, rx) = watch::channel(None);
        let (commands, command_rx) = mpsc::channel(8);
        let task = tokio::spawn(run(storage, rx, command_rx, debounce));

        Self {
            latest: Arc::new(latest),
            commands,
            task,
        }
    }

    /// Queue `state` to be saved. Replaces any state not yet written.
    pub fn publish(&self, state: &CartState) {
        self.latest.send_replace(Some(state.clone()));
    }

    /// A cart subscriber that publishes every change.
    pub fn subscriber(&self) -> impl FnMut(&CartEvent, &CartState) + Send + 'static {
        let latest = Arc::clone(&self.latest);
        move |_event, state| {
            latest.send_replace(Some(state.clone()));
        }
    }

    /// Write any pending state now and wait for the write to finish.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Flush(done)).await.is_ok() {
            let _ = wait.await;
        }
    }

    /// Flush, then stop the task.
    pub async fn shutdown(self) {
        self.flush().await;

        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            error!(error = %e, "Cart persister task failed");
        }
    }
}

impl std::fmt::Debug for CartPersister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartPersister")
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

/// Unsaved changes: when the first and the newest arrived.
#[derive(Clone, Copy)]
struct Pending {
    first: Instant,
    last: Instant,
}

impl Pending {
    fn due(self, debounce: Duration, max_wait: Duration) -> Instant {
        (self.last + debounce).min(self.first + max_wait)
    }
}

async fn run<S>(
    storage: Arc<S>,
    mut latest: watch::Receiver<Option<CartState>>,
    mut commands: mpsc::Receiver<Command>,
    debounce: Duration,
) where
    S: CartStorage + ?Sized,
{
    let max_wait = debounce.saturating_mul(MAX_WAIT_WINDOWS);
    let mut pending: Option<Pending> = None;

    loop {
        let due = pending.map_or_else(Instant::now, |p| p.due(debounce, max_wait));

        tokio::select! {
            changed = latest.changed() => {
                if changed.is_err() {
                    if pending.is_some() {
                        write_latest(&storage, &mut latest).await;
                    }
                    return;
                }
                // A new change restarts the debounce window, up to the max wait.
                let now = Instant::now();
                pending = Some(Pending {
                    first: pending.map_or(now, |p| p.first),
                    last: now,
                });
            }
            () = tokio::time::sleep_until(due), if pending.is_some() => {
                write_latest(&storage, &mut latest).await;
                pending = None;
            }
            command = commands.recv() => {
                let dirty = pending.is_some() || latest.has_changed().unwrap_or(false);
                if dirty {
                    write_latest(&storage, &mut latest).await;
                    pending = None;
                }
                match command {
                    Some(Command::Flush(done)) => {
                        let _ = done.send(());
                    }
                    None => return,
                }
            }
        }
    }
}

async fn write_latest<S>(storage: &Arc<S>, latest: &mut watch::Receiver<Option<CartState>>)
where
    S: CartStorage + ?Sized,
{
    let Some(state) = latest.borrow_and_update().clone() else {
        return;
    };

    let lines = state.len();
    let storage = Arc::clone(storage);
    match tokio::task::spawn_blocking(move || storage.save(&state)).await {
        Ok(Ok(())) => debug!(lines, "Cart saved"),
        Ok(Err(e)) => warn!(error = %e, "Failed to save cart"),
        Err(e) => error!(error = %e, "Cart save task panicked"),
    }
}
