//! Concurrency primitives behind shared ownership.
//!
//! Important: the counter synchronizes *ownership*, not the payload. Handles
//! on different threads see the same `T` and must bring their own
//! synchronization for mutating it.

pub(crate) mod atomic;
