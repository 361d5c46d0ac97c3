//! Atomic reference counting.
//!
//! Built with `--cfg loom`, the atomics below come from `loom` so the counting
//! protocol can be model-checked; otherwise they are `core::sync::atomic`.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{fence, AtomicUsize, Ordering};

#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{fence, AtomicUsize, Ordering};

/// The shared owner counter.
pub(crate) mod ref_count;

pub(crate) use ref_count::RefCount;
