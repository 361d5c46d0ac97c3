//! # `sharehold` - Shared Ownership With Pluggable Destroyers
//!
//! An atomically reference-counted handle to a heap payload, safe to clone and
//! drop from any number of threads, with deterministic, exactly-once
//! destruction when the last owner goes away.
//!
//! ## Safety Guarantees
//!
//! ### Memory Safety
//! - **Exactly-once destruction**: the release that takes the count to zero is
//!   the only one that destroys the payload and frees the control block.
//! - **No partial state**: a handle is either empty or holds both a payload and
//!   a control block. Failed allocations leave nothing behind.
//! - **No double release**: a handle forgets its pointers as soon as it
//!   releases or is moved from, so no path can release the same share twice.
//!
//! ### Concurrency Safety
//! - **Lock-free counting**: clones increment and drops decrement a single
//!   atomic counter; nothing blocks.
//! - **Ordered teardown**: decrements use `Release`, and the zero-observing
//!   release fences with `Acquire` before destroying, so every owner's writes
//!   are visible to the destroyer.
//! - **Unsynchronized payload**: the handle shares `T`, it does not lock it.
//!   Mutation through shared handles needs interior mutability in `T`.
//!
//! ## Key Features
//!
//! - **Custom destroyers**: any `FnOnce(NonNull<T>)` (or [`Destroyer`] impl)
//!   can replace the default `Box` deallocation, e.g. to close a file
//!   descriptor or return memory to a foreign allocator.
//! - **Type-erased destroyers**: the destroyer lives in the control block, so
//!   `SharedHandle<T>` has the same type whatever cleanup it carries.
//! - **Fallible construction**: `try_new`, `from_raw`, and the `reset_*` family
//!   report allocation failure as [`AllocError`] instead of aborting.
//!
//! ## Architecture
//!
//! 1. **Shared Handle** (`SharedHandle<T>`): two pointers, payload and control
//!    block, both present or both absent.
//! 2. **Control Block**: one allocation holding the atomic owner count, a
//!    teardown function and the destroyer.
//! 3. **Destroyers** ([`Destroyer`]): consumed by the single teardown call.
//!
//! ## Example
//!
//! ```rust
//! use sharehold::SharedHandle;
//!
//! let h1 = SharedHandle::new(String::from("Hello"));
//! let h2 = h1.clone();
//! assert_eq!(h1.use_count(), 2);
//! assert_eq!(h2.len(), 5);
//!
//! drop(h1);
//! assert_eq!(h2.use_count(), 1);
//! assert_eq!(*h2, "Hello");
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod alloc;
pub(crate) mod concurrency;
pub mod destroy;
pub mod error;
pub mod handle;

pub use alloc::AllocError;
pub use destroy::{BoxDestroyer, Destroyer};
pub use error::HandleError;
pub use handle::SharedHandle;

// Compile-time assertions for memory layout
const _: () = {
    use core::mem;

    // Two non-null pointers, with `None` in the niche.
    assert!(mem::size_of::<SharedHandle<u64>>() == 2 * mem::size_of::<usize>());
    assert!(mem::size_of::<SharedHandle<()>>() == 2 * mem::size_of::<usize>());

    // The counter is exactly an atomic word.
    #[cfg(not(loom))]
    assert!(mem::size_of::<concurrency::atomic::RefCount>() == mem::size_of::<usize>());
};
