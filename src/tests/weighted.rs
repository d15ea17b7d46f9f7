#![cfg(not(loom))]

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crossbeam_channel::bounded;

use crate::Group;

use super::utils::{XorShift64, parallelism};

const MAX_SLEEP_NANOS: u64 = 1_000_000;

#[test]
fn hammer() {
    let n = parallelism();
    let group = Group::new(n);
    let group = &group;
    let loops = 10_000 / n;

    thread::scope(|s| {
        for i in 1..=n {
            s.spawn(move || {
                let mut rng = XorShift64::new(i as u64);
                for _ in 0..loops {
                    assert!(group.reserve_n(None, i));
                    thread::sleep(Duration::from_nanos(rng.next_u64() % MAX_SLEEP_NANOS));
                    group.free_n(i);
                }
            });
        }
    });

    assert_eq!(group.active_count(), 0);
    assert_eq!(group.pending_count(), 0);
}

/// Times out if a large reserve starves while small reserve/free pairs
/// cycle. Merely returning is the success condition.
#[test]
fn large_reserve_doesnt_starve() {
    let n = parallelism();
    let group = Group::new(n);
    let group = &group;
    let running = AtomicBool::new(true);
    let running = &running;

    thread::scope(|s| {
        for _ in 0..n {
            assert!(group.reserve_n(None, 1));
            s.spawn(move || {
                while running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                    group.free_n(1);
                    assert!(group.reserve_n(None, 1));
                }
                group.free_n(1);
            });
        }

        assert!(group.reserve_n(None, n));
        running.store(false, Ordering::SeqCst);
        group.free_n(n);
    });

    assert_eq!(group.active_count(), 0);
    assert_eq!(group.pending_count(), 0);
}

#[test]
fn alloc_cancel_doesnt_starve() {
    let group = Group::new(10);
    let group = &group;

    // Hold a portion of the size so the big reserve below must block.
    assert!(group.reserve_n(None, 1));

    let (cancel_tx, cancel_rx) = bounded::<()>(0);

    thread::scope(|s| {
        s.spawn(move || {
            let _ = group.reserve_n(Some(&cancel_rx), 10);
        });

        // Wait until the big reserve blocks.
        while group.try_reserve_n(1) {
            group.free_n(1);
            thread::yield_now();
        }

        // Grab one more unit while simultaneously unblocking the big
        // reserve. Both calls must return, in either order.
        s.spawn(move || drop(cancel_tx));

        group.reserve();
        group.free_n(1);
    });
}

#[test]
fn canceled_reserve_loses_no_tokens() {
    let group = Group::new(10);
    let group = &group;

    let (cancel_tx, cancel_rx) = bounded::<()>(0);

    assert!(group.reserve_n(None, 1));

    thread::scope(|s| {
        let handle = s.spawn(move || {
            // Synchronize with the blocked reserve below.
            while group.try_reserve_n(1) {
                group.free_n(1);
            }
            // Cancel, then free the held unit: the abort and the wake-up
            // race, and no token may be lost to the leaving reservation.
            drop(cancel_tx);
            group.free_n(1);
        });

        // The cancellation happens before enough room becomes available,
        // so this reserve must fail.
        assert!(!group.reserve_n(Some(&cancel_rx), 10));

        handle.join().unwrap();

        assert!(
            group.try_reserve_n(2),
            "tokens lost after canceled reserve",
        );
        group.free_n(2);

        // A signalled cancellation aborts even when no blocking would be
        // needed.
        assert!(!group.reserve_n(Some(&cancel_rx), 1));
    });

    assert_eq!(group.active_count(), 0);
    assert_eq!(group.pending_count(), 0);
}
