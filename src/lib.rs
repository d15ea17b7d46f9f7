//! A fused wait group and weighted semaphore.
//!
//! [`Group`] guards concurrent access to a resource with a single packed
//! counter: callers reserve weight before starting work and free it when
//! done, waiters block until the group drains, and an optional size bounds
//! how much weight may be active at once.
//!
//! The default value is a ready-to-use group with no limit, comparable to a
//! plain wait group.
//!
//! # Usage
//!
//! ## As a wait group
//!
//! ```rust
//! use std::thread;
//!
//! use sema_group::Group;
//!
//! let group = Group::default();
//! thread::scope(|s| {
//!     for _ in 0..8 {
//!         group.reserve();
//!         s.spawn(|| {
//!             // Long-running task
//!             group.free();
//!         });
//!     }
//!     // Wait for all tasks to complete
//!     group.wait();
//! });
//! ```
//!
//! ## As a weighted semaphore
//!
//! ```rust
//! use std::thread;
//!
//! use sema_group::Group;
//!
//! let group = Group::new(2);
//! thread::scope(|s| {
//!     for _ in 0..8 {
//!         group.reserve(); // at most 2 tasks in flight
//!         s.spawn(|| {
//!             // Long-running task
//!             group.free();
//!         });
//!     }
//! });
//! assert_eq!(group.active_count(), 0);
//! ```
//!
//! ## Selecting on completion
//!
//! [`Group::wait_signal`] exposes the drain condition as a channel, usable
//! in selection against timeouts or other events:
//!
//! ```rust
//! use std::{thread, time::Duration};
//!
//! use crossbeam_channel::{after, select};
//! use sema_group::Group;
//!
//! let group = Group::default();
//! group.reserve();
//! thread::scope(|s| {
//!     s.spawn(|| group.free());
//!     select! {
//!         recv(group.wait_signal()) -> _ => {}, // all the work is done
//!         recv(after(Duration::from_secs(5))) -> _ => panic!("timed out"),
//!     }
//! });
//! ```
//!
//! Blocked reservations accept a cancellation signal the same way: any
//! channel that is sent to or disconnected aborts the reservation, with its
//! weight fully withdrawn. See [`Group::reserve_n`].
//!
//! # Notes
//!
//! - Blocked reservations wake in unspecified order; there is no FIFO or
//!   priority discipline among them.
//! - Misuse (freeing more than was reserved, reconfiguring a used group,
//!   zero weights) panics; cancellation is an ordinary `false` return.

mod group;
mod limit;
mod signal;
mod state;
mod utils;

pub use crate::group::Group;

#[cfg(test)]
mod tests;
