use core::fmt::Debug;
use std::{sync::OnceLock, thread};

use crossbeam_channel as chan;
use static_assertions::assert_impl_all;

use crate::{
    limit::Limit,
    signal::{self, Signal},
    state::{Counter, parts},
};

/// Guards concurrent access to a resource by combining a completion barrier,
/// a weighted semaphore, and a cancellable, selectable wait in one primitive.
///
/// Callers [`reserve`](Group::reserve) weight before starting work and
/// [`free`](Group::free) it when done. With a nonzero size, reservations
/// beyond the limit block until matching frees make room; with a size of
/// zero, reservations never block and the group behaves as a pure wait
/// group. [`wait`](Group::wait) blocks until every reserved weight has been
/// freed.
///
/// The default value is a ready-to-use group with no limit:
///
/// ```
/// use std::thread;
///
/// use sema_group::Group;
///
/// let group = Group::default();
/// thread::scope(|s| {
///     for _ in 0..4 {
///         group.reserve();
///         s.spawn(|| {
///             // ... work ...
///             group.free();
///         });
///     }
///     group.wait();
/// });
/// assert_eq!(group.active_count(), 0);
/// ```
///
/// Groups are best suited for concurrent tasks of equal weight or cost;
/// blocked reservations of mixed weights wake in unspecified order.
pub struct Group {
    /// Pending and active counts, packed; see [`Counter`].
    counter: Counter,
    /// Set at most once, by [`Group::new`] or [`Group::set_size`], and only
    /// for a nonzero size. Absent means no limit.
    limit: OnceLock<Limit>,
    /// Wait-side broadcast; armed lazily by the first waiter.
    signal: Signal,
}

assert_impl_all!(Group: Send, Sync);

impl Group {
    /// Creates a new group limited to `size` units of weight, which is the
    /// concurrency limit it enforces. Zero means no limit.
    ///
    /// # Examples
    ///
    /// ```
    /// use sema_group::Group;
    ///
    /// let group = Group::new(2);
    /// assert!(group.try_reserve_n(2));
    /// assert!(!group.try_reserve_n(1));
    /// group.free_n(2);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `size` does not fit the packed counter representation
    /// (greater than `u32::MAX`).
    pub fn new(size: usize) -> Self {
        let group = Self::default();
        group.init_size(size);
        group
    }

    /// Sets the group size. One-shot configuration for groups created through
    /// [`Group::default`]; zero leaves the group unlimited.
    ///
    /// ```
    /// use sema_group::Group;
    ///
    /// let group = Group::default();
    /// group.set_size(8);
    /// assert_eq!(group.size(), 8);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the group has already been used, or if a size was already
    /// set, through this method or through [`Group::new`]. It must be called
    /// before any other method, on an otherwise untouched group.
    pub fn set_size(&self, size: usize) {
        if self.counter.load() != 0 {
            panic!("concurrent Reserve calls while initializing group");
        }
        if self.limit.get().is_some() {
            panic!("group already initialized");
        }

        self.init_size(size);

        // A reservation that slipped in between the checks above and the
        // install observed the group as unlimited; surface the misuse.
        if self.counter.load() != 0 {
            panic!("concurrent Reserve calls while initializing group");
        }
    }

    fn init_size(&self, size: usize) {
        if size == 0 {
            return;
        }
        let Ok(size) = u32::try_from(size) else {
            panic!("incorrect group size");
        };
        if self.limit.set(Limit::new(size)).is_err() {
            panic!("group already initialized");
        }
    }

    /// The current limit of this group: the maximum weight allowed to be
    /// active at the same time. Zero means no limit.
    #[inline]
    pub fn size(&self) -> usize {
        self.limit.get().map_or(0, |limit| limit.size as usize)
    }

    /// The total weight currently reserved and not yet freed. It can never
    /// exceed a nonzero [`size`](Group::size).
    #[inline]
    pub fn active_count(&self) -> isize {
        let (_, active) = parts(self.counter.load());
        active as isize
    }

    /// The total weight of reservations currently blocked, waiting for
    /// matching [`free`](Group::free) calls to make room.
    #[inline]
    pub fn pending_count(&self) -> usize {
        let (pending, _) = parts(self.counter.load());
        pending as usize
    }

    /// Reserves one unit of weight, blocking while the group is at its
    /// limit. Equivalent to `reserve_n(None, 1)`.
    ///
    /// Never blocks on a group with no limit. Always updates the counters
    /// before returning.
    #[inline]
    pub fn reserve(&self) {
        let _ = self.reserve_n(None, 1);
    }

    /// Reserves `n` units of weight, blocking while the group lacks room,
    /// and returns whether the reservation committed.
    ///
    /// The reservation commits immediately when nothing is pending and `n`
    /// fits under the size; otherwise its weight moves to the pending count
    /// and the call blocks until frees make room, waking in unspecified
    /// order relative to other blocked reservations. On a group with no
    /// limit it always commits immediately.
    ///
    /// `cancel`, when provided, aborts a blocked reservation: the channel
    /// counts as signalled once it is sent to or disconnected. An aborted
    /// reservation returns `false` with its weight withdrawn from the
    /// pending count, so the counters never include it afterwards. A
    /// reservation that already committed is unaffected.
    ///
    /// ```
    /// use crossbeam_channel::bounded;
    /// use sema_group::Group;
    ///
    /// let group = Group::new(1);
    /// group.reserve();
    ///
    /// let (cancel_tx, cancel) = bounded::<()>(0);
    /// drop(cancel_tx); // signal: abort rather than block
    /// assert!(!group.reserve_n(Some(&cancel), 1));
    /// assert_eq!(group.pending_count(), 0);
    /// group.free();
    /// ```
    ///
    /// A weight greater than a nonzero size can never be granted: the call
    /// blocks until `cancel` signals, or forever when `cancel` is `None`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    #[must_use]
    pub fn reserve_n(&self, cancel: Option<&chan::Receiver<()>>, n: usize) -> bool {
        if n == 0 {
            // Zero is not a valid weight; freeing is `free_n`'s job.
            panic!("invalid group reserve N value");
        }

        // An already-signalled cancellation aborts before any counter change.
        if let Some(cancel) = cancel
            && !matches!(cancel.try_recv(), Err(chan::TryRecvError::Empty))
        {
            return false;
        }

        let Some(limit) = self.limit.get() else {
            // No limit: reservations never block and never fail.
            self.counter.add(0, n as i64);
            return true;
        };

        // A weight beyond the size is destined to fail. Wait for the
        // cancellation signal instead of leaking pending state; with no
        // signal this blocks forever.
        if n as u64 > u64::from(limit.size) {
            let never = chan::never();
            let _ = cancel.unwrap_or(&never).recv();
            return false;
        }

        if self.reserve_fast(limit.size, n, false) {
            return true;
        }

        self.reserve_slow(limit, cancel, n)
    }

    /// Reserves one unit of weight without blocking. Equivalent to
    /// `try_reserve_n(1)`.
    #[inline]
    #[must_use]
    pub fn try_reserve(&self) -> bool {
        self.try_reserve_n(1)
    }

    /// Reserves `n` units of weight without blocking and returns whether the
    /// reservation committed.
    ///
    /// Fails whenever any weight is pending or `n` does not fit under the
    /// size, without touching the pending count. Always succeeds on a group
    /// with no limit.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    #[must_use]
    pub fn try_reserve_n(&self, n: usize) -> bool {
        if n == 0 {
            panic!("invalid group reserve N value");
        }

        let Some(limit) = self.limit.get() else {
            self.counter.add(0, n as i64);
            return true;
        };

        if n as u64 > u64::from(limit.size) {
            return false;
        }

        self.reserve_fast(limit.size, n, true)
    }

    /// Frees one unit of weight. Equivalent to `free_n(1)`.
    #[inline]
    pub fn free(&self) {
        self.free_n(1);
    }

    /// Frees `n` units of weight, making room for other reservations, and
    /// wakes at most one blocked reservation, in unspecified order.
    ///
    /// If this call drains the group (no active and no pending weight), it
    /// wakes every blocked [`wait`](Group::wait) call and readies every
    /// handed-out [`wait_signal`](Group::wait_signal) channel.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero, or if the active count would go below zero.
    pub fn free_n(&self, n: usize) {
        if n == 0 {
            panic!("invalid group free N value");
        }

        // Snapshot first: a limit installed after this point cannot have
        // blocked reservations that this free is responsible for waking.
        let limit = self.limit.get();

        let counter = self.counter.add(0, -(n as i64));
        let (_, active) = parts(counter);

        let mut pending = 0;
        if let Some(limit) = limit {
            let counter = self.notify_free(limit);
            (pending, _) = parts(counter);
        }

        self.notify_wait(pending, active);

        // Misuse check last, so waiters are not stranded behind the fault.
        if active < 0 {
            panic!("negative group counter");
        }
    }

    /// Blocks until the group drains, i.e. both the active and the pending
    /// count reach zero.
    ///
    /// It waits only for reservations made before the call, or made while
    /// the group was still non-empty; once the group drains, a later
    /// reservation arms a new completion signal that only later waits
    /// observe. Returns immediately on an already-empty group.
    pub fn wait(&self) {
        // The channel never carries a message; disconnection is the signal.
        let _ = self.arm_wait_signal().recv();
    }

    /// Returns a channel that becomes ready (by disconnection) once the
    /// group drains, for use in multi-way selection.
    ///
    /// The returned channel observes the same drain that [`wait`](Group::wait)
    /// would: reservations made before this call, or while the group was
    /// still non-empty. On an already-empty group the channel is ready
    /// immediately.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::{thread, time::Duration};
    ///
    /// use crossbeam_channel::{after, select};
    /// use sema_group::Group;
    ///
    /// let group = Group::default();
    /// group.reserve();
    /// thread::scope(|s| {
    ///     s.spawn(|| group.free());
    ///     select! {
    ///         recv(group.wait_signal()) -> _ => {},
    ///         recv(after(Duration::from_secs(5))) -> _ => panic!("timed out"),
    ///     }
    /// });
    /// ```
    #[must_use]
    pub fn wait_signal(&self) -> chan::Receiver<()> {
        self.arm_wait_signal()
    }

    /// Fast path shared by the blocking and non-blocking reserve calls.
    ///
    /// Commits `n` to active when nothing is pending and the size has room.
    /// Otherwise a try call fails outright, while a blocking call enqueues
    /// `n` to pending and reports failure to request the slow path.
    fn reserve_fast(&self, size: u32, n: usize, try_call: bool) -> bool {
        loop {
            let counter = self.counter.load();
            let (pending, active) = parts(counter);

            if pending == 0 && i64::from(active) + n as i64 <= i64::from(size) {
                let (_, committed) = self.counter.update(counter, 0, n as i64);
                if committed {
                    return true;
                }
            } else if try_call {
                return false;
            } else {
                let (_, committed) = self.counter.update(counter, n as i64, 0);
                if committed {
                    return false;
                }
            }
        }
    }

    /// Parks on the rendezvous channel until a free hands over a token or
    /// the cancellation signal fires, with `n` already counted as pending.
    fn reserve_slow(&self, limit: &Limit, cancel: Option<&chan::Receiver<()>>, n: usize) -> bool {
        let never = chan::never();
        let cancel_rx = cancel.unwrap_or(&never);

        loop {
            chan::select! {
                recv(limit.rx) -> _ => match self.reserve_commit(limit, cancel, n) {
                    Commit::Reserved => return true,
                    Commit::Aborted => return false,
                    Commit::Repark => {}
                },
                recv(cancel_rx) -> _ => {
                    self.reserve_abort(limit, n);
                    return false;
                }
            }
        }
    }

    /// Commit loop entered with a freshly received wake-up token.
    ///
    /// The token is a claim on one free, not on any particular amount of
    /// room, so the headroom must be recomputed here. A caller that cannot
    /// commit must not swallow the token either: depending on what the
    /// counters say it re-parks (the next free will produce another token)
    /// or passes the token on to a differently-weighted blocked reservation
    /// that may fit where this one does not.
    fn reserve_commit(&self, limit: &Limit, cancel: Option<&chan::Receiver<()>>, n: usize) -> Commit {
        loop {
            let counter = self.counter.load();
            let (pending, active) = parts(counter);
            let headroom = i64::from(limit.size) - i64::from(active) - n as i64;

            if headroom >= 0 {
                // Cancellation preempts committing, even with room available.
                if let Some(cancel) = cancel
                    && !matches!(cancel.try_recv(), Err(chan::TryRecvError::Empty))
                {
                    self.reserve_abort(limit, n);
                    return Commit::Aborted;
                }

                let (_, committed) = self.counter.update(counter, -(n as i64), n as i64);
                if !committed {
                    // The counter moved; recompute.
                    continue;
                }

                return Commit::Reserved;
            }

            // Still short on room. If this is the only blocked reservation,
            // only the next free can help.
            if u64::from(pending) == n as u64 {
                return Commit::Repark;
            }

            // The blocked weights plus the active ones oversubscribe the
            // size, so the outstanding frees will produce further tokens.
            if i64::from(pending) + i64::from(active) > i64::from(limit.size) {
                return Commit::Repark;
            }

            // Only hand the token over if someone else is actually pending.
            if i64::from(pending) - n as i64 <= 0 {
                continue;
            }

            // Wake another blocked reservation, or absorb the token of one
            // attempting the same, whichever the runtime pairs first. The
            // absorbed case means that other reservation already updated the
            // counter, so re-run the loop rather than park: this call might
            // be the last one, with no further frees coming.
            chan::select! {
                send(limit.tx, ()) -> _ => return Commit::Repark,
                recv(limit.rx) -> _ => {}
            }
        }
    }

    /// Withdraws an aborted reservation's weight from pending, then forwards
    /// the wake-up it may have consumed and fires the drain broadcast if the
    /// group emptied.
    fn reserve_abort(&self, limit: &Limit, n: usize) {
        self.counter.add(-(n as i64), 0);

        let counter = self.notify_free(limit);
        let (pending, active) = parts(counter);
        self.notify_wait(pending, active);
    }

    /// Hands one wake-up token to a blocked reservation, if any.
    ///
    /// A blocked reservation that is mid-abort still counts as pending but
    /// no longer listens, so a failed offer re-reads the counter until the
    /// token lands or nothing is pending. This keeps a free from losing its
    /// wake-up to an aborting reservation racing with it.
    fn notify_free(&self, limit: &Limit) -> u64 {
        let mut counter = self.counter.load();
        let (mut pending, _) = parts(counter);

        while pending > 0 {
            if limit.offer() {
                return self.counter.load();
            }

            thread::yield_now();

            counter = self.counter.load();
            (pending, _) = parts(counter);
        }

        counter
    }

    /// Fires the drain broadcast when both counters are at zero.
    fn notify_wait(&self, pending: u32, active: i32) {
        if pending > 0 || active > 0 {
            return;
        }
        self.signal.fire();
    }

    /// Returns the completion channel for the current drain cycle, arming
    /// one if needed.
    fn arm_wait_signal(&self) -> chan::Receiver<()> {
        let (pending, active) = parts(self.counter.load());
        if pending == 0 && active <= 0 {
            return signal::closed().clone();
        }

        let (rx, installed) = self.signal.subscribe();
        if installed {
            // A concurrent free may have drained the group and checked the
            // cell before our install; it will never fire this channel, so
            // report completion directly. The armed channel stays in place
            // for the next drain cycle.
            let (pending, active) = parts(self.counter.load());
            if pending == 0 && active <= 0 {
                return signal::closed().clone();
            }
        }

        rx
    }
}

/// Outcome of one round of the slow-path commit loop.
enum Commit {
    Reserved,
    Aborted,
    Repark,
}

impl Default for Group {
    /// An unlimited group with zero counters, equivalent to `Group::new(0)`.
    fn default() -> Self {
        Self {
            counter: Counter::new(),
            limit: OnceLock::new(),
            signal: Signal::new(),
        }
    }
}

impl Debug for Group {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Group")
            .field("size", &self.size())
            .field("active", &self.active_count())
            .field("pending", &self.pending_count())
            .finish()
    }
}
