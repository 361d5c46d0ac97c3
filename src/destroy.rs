//! Destroyers: what happens to a payload when its last handle goes away.
//!
//! A [`SharedHandle`](crate::SharedHandle) runs its destroyer exactly once, on
//! whichever thread drops or resets the last owner. Without an explicit
//! destroyer the payload is treated as a `Box<T>` allocation ([`BoxDestroyer`]).
//!
//! Any `FnOnce(NonNull<T>)` closure is a destroyer, which is the usual way to
//! attach cleanup for resources that were not allocated by Rust:
//!
//! ```rust
//! use core::ptr::NonNull;
//! use sharehold::SharedHandle;
//!
//! struct Descriptor(i32);
//!
//! let raw = NonNull::from(Box::leak(Box::new(Descriptor(3))));
//! let handle = unsafe {
//!     SharedHandle::from_raw_with(raw, |fd: NonNull<Descriptor>| {
//!         // Close the descriptor, then free the box it lives in.
//!         let fd = unsafe { Box::from_raw(fd.as_ptr()) };
//!         assert_eq!(fd.0, 3);
//!     })
//! }
//! .unwrap();
//! assert_eq!(handle.0, 3);
//! ```

use core::ptr::NonNull;

/// Cleanup strategy for a shared payload.
///
/// The destroyer is consumed by its single call. It should not panic: a panic
/// propagates out of whichever `drop` or `reset` triggered teardown, after the
/// control block has been freed, and the payload counts as destroyed either
/// way.
pub trait Destroyer<T> {
    /// Destroys the payload.
    ///
    /// # Safety
    /// `payload` must be the pointer adopted alongside this destroyer, and no
    /// handle may access it after this call begins.
    unsafe fn destroy(self, payload: NonNull<T>);
}

/// The default destroyer: reclaims the payload as a `Box<T>`.
///
/// Handles built with it require the payload to come from `Box::into_raw`
/// or from the global allocator with `Layout::new::<T>()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoxDestroyer;

impl<T> Destroyer<T> for BoxDestroyer {
    #[inline]
    unsafe fn destroy(self, payload: NonNull<T>) {
        drop(Box::from_raw(payload.as_ptr()));
    }
}

impl<T, F> Destroyer<T> for F
where
    F: FnOnce(NonNull<T>),
{
    #[inline]
    unsafe fn destroy(self, payload: NonNull<T>) {
        self(payload);
    }
}
