#![cfg(not(loom))]

use std::{thread, time::Duration};

use crossbeam_channel::{Receiver, bounded};

/// A cancellation signal that fires (by disconnection) after `delay`.
pub(super) fn cancel_after(delay: Duration) -> Receiver<()> {
    let (tx, rx) = bounded::<()>(0);
    thread::spawn(move || {
        thread::sleep(delay);
        drop(tx);
    });
    rx
}

pub(super) fn parallelism() -> usize {
    thread::available_parallelism().map_or(4, |n| n.get())
}

/// Small deterministic rng for sleep jitter in the hammer tests.
pub(super) struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}
