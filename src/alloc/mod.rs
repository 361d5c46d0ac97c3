//! Fallible access to the global allocator.
//!
//! Control blocks and payloads are allocated through these helpers so that
//! exhaustion surfaces as an [`AllocError`] instead of an abort.

pub mod allocator;

pub use allocator::{deallocate, try_allocate, AllocError};
