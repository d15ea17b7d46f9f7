use core::fmt::Debug;

use crate::utils::*;

/// Both group counters packed into one CAS target.
///
/// The high 32 bits are the pending count (unsigned), the low 32 bits are the
/// active count (signed). Publishing both half-changes in a single word is
/// what lets a blocked reservation move its weight from pending to active
/// atomically.
pub(crate) struct Counter(AtomicU64);

#[cfg(not(loom))]
const _: () = {
    assert!(core::mem::size_of::<Counter>() == core::mem::size_of::<u64>());
};

impl Counter {
    #[cfg(not(loom))]
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[cfg(loom)]
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub fn load(&self) -> u64 {
        self.0.load(atomic::SeqCst)
    }

    /// Attempts to commit `pending_delta` and `active_delta` on top of the
    /// previously observed `old` word.
    ///
    /// The halves are adjusted independently, except that signed wraparound
    /// of the active half carries into (or borrows from) the pending half, so
    /// pending stays the true count of enqueued weights.
    ///
    /// Returns the recomputed word and whether the compare-and-swap took.
    pub fn update(&self, old: u64, pending_delta: i64, active_delta: i64) -> (u64, bool) {
        let (old_pending, old_active) = parts(old);

        let mut new_pending = old_pending.wrapping_add(pending_delta as u32);
        let new_active = old_active.wrapping_add(active_delta as i32);

        if active_delta > 0 && new_active < old_active {
            new_pending = new_pending.wrapping_add(1); // carry
        } else if active_delta < 0 && new_active > old_active {
            new_pending = new_pending.wrapping_sub(1); // borrow
        }

        let new = pack(new_pending, new_active);

        match self
            .0
            .compare_exchange(old, new, atomic::SeqCst, atomic::SeqCst)
        {
            Ok(_) => (new, true),
            Err(_) => (new, false),
        }
    }

    /// Commits the deltas unconditionally, retrying lost compare-and-swaps.
    ///
    /// Returns the committed word.
    pub fn add(&self, pending_delta: i64, active_delta: i64) -> u64 {
        loop {
            let old = self.load();
            let (new, committed) = self.update(old, pending_delta, active_delta);
            if committed {
                return new;
            }
        }
    }
}

impl Debug for Counter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (pending, active) = parts(self.load());
        f.debug_struct("Counter")
            .field("pending", &pending)
            .field("active", &active)
            .finish()
    }
}

#[inline]
pub(crate) fn parts(counter: u64) -> (u32, i32) {
    ((counter >> 32) as u32, counter as u32 as i32)
}

#[inline]
pub(crate) fn pack(pending: u32, active: i32) -> u64 {
    (u64::from(pending) << 32) | u64::from(active as u32)
}
