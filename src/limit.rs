use crossbeam_channel::{Receiver, Sender, bounded};
use derive_more::Debug;

/// The concurrency limit of a group, installed at most once.
///
/// The configured size travels together with the rendezvous channel that
/// blocked reservations park on, so a reservation that observes a nonzero
/// size always has the channel as well.
///
/// The channel has zero capacity: a send completes only against a currently
/// parked receiver, and vice versa. It is never closed; both endpoints live
/// as long as the group.
#[derive(Debug)]
pub(crate) struct Limit {
    pub size: u32,
    #[debug(skip)]
    pub tx: Sender<()>,
    #[debug(skip)]
    pub rx: Receiver<()>,
}

impl Limit {
    pub fn new(size: u32) -> Self {
        let (tx, rx) = bounded(0);
        Self { size, tx, rx }
    }

    /// Hands one wake-up token to a parked reservation.
    ///
    /// Succeeds only if a receiver is parked right now; otherwise reports
    /// failure immediately without blocking.
    #[inline]
    pub fn offer(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}
