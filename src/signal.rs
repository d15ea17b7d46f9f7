use std::sync::OnceLock;

use crossbeam_channel::{Receiver, Sender, bounded};
use derive_more::Debug;
use parking_lot::Mutex;

/// The wait-side completion signal of a group.
///
/// Waiters receive on a channel that never carries a message; the broadcast
/// is its disconnection, which wakes every current and future receiver at
/// once. The cell distinguishes three states:
///
/// - `Idle`: no waiter has subscribed since the last broadcast (or ever).
/// - `Live`: a channel is installed and will be disconnected when the group
///   next drains.
/// - `Sealed`: the last installed channel was disconnected. Distinct from
///   `Idle` so a later subscriber can tell that it must arm a fresh channel
///   for the *next* drain rather than reuse a spent one.
///
/// Counter checks ordering subscription against the free path live in the
/// caller; this type only serializes the state transitions themselves. The
/// free path consults it only after observing the group empty, so the
/// reserve/free hot path never takes the lock.
#[derive(Debug)]
pub(crate) struct Signal(Mutex<Cell>);

#[derive(Debug, Default)]
enum Cell {
    #[default]
    Idle,
    Live {
        #[debug(skip)]
        _tx: Sender<()>,
        rx: Receiver<()>,
    },
    Sealed,
}

impl Signal {
    pub fn new() -> Self {
        Self(Mutex::new(Cell::Idle))
    }

    /// Returns the live channel, arming a fresh one from the `Idle` and
    /// `Sealed` states.
    ///
    /// The second return is whether this call installed the channel; callers
    /// re-check the counters in that case, because a concurrent free may have
    /// observed the group empty before the install and skipped the broadcast.
    pub fn subscribe(&self) -> (Receiver<()>, bool) {
        let mut cell = self.0.lock();
        if let Cell::Live { rx, .. } = &*cell {
            return (rx.clone(), false);
        }
        let (tx, rx) = bounded(0);
        *cell = Cell::Live {
            _tx: tx,
            rx: rx.clone(),
        };
        (rx, true)
    }

    /// Broadcasts by disconnecting the live channel, if one is installed.
    ///
    /// Called only after the group has been observed empty. `Idle` and
    /// `Sealed` are left untouched, so each installed channel fires exactly
    /// once per empty transition.
    pub fn fire(&self) {
        let mut cell = self.0.lock();
        if matches!(*cell, Cell::Live { .. }) {
            // Replacing the cell drops the only sender, which disconnects
            // the channel and wakes every subscriber.
            *cell = Cell::Sealed;
        }
    }
}

/// Process-wide already-disconnected channel, handed to subscribers that
/// observe an already-empty group. Immutable after initialization.
pub(crate) fn closed() -> &'static Receiver<()> {
    static CLOSED: OnceLock<Receiver<()>> = OnceLock::new();
    CLOSED.get_or_init(|| {
        let (tx, rx) = bounded(0);
        drop(tx);
        rx
    })
}
