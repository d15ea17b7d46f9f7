#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{self as _atomic, AtomicU64};
#[cfg(loom)]
pub(crate) use loom::sync::atomic::{self as _atomic, AtomicU64};

pub(crate) mod atomic {
    pub use super::_atomic::Ordering::*;
}
