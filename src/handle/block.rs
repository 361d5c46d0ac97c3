//! The control block behind every populated `SharedHandle`.
//!
//! One allocation holds the owner count, a teardown function and the
//! destroyer. Handles only ever see the `Header<T>` prefix, so the destroyer's
//! type never shows up in `SharedHandle<T>`.

use crate::alloc::{self, AllocError};
use crate::concurrency::atomic::RefCount;
use crate::destroy::Destroyer;
use core::alloc::Layout;
use core::ptr::{self, NonNull};

/// The type-erased prefix of a control block.
pub(super) struct Header<T> {
    count: RefCount,
    teardown: unsafe fn(NonNull<Header<T>>, NonNull<T>),
}

/// The full control block. `repr(C)` keeps `header` at offset zero so a
/// `NonNull<Block<T, D>>` can be viewed as a `NonNull<Header<T>>` and back.
#[repr(C)]
struct Block<T, D> {
    header: Header<T>,
    destroyer: D,
}

impl<T> Header<T> {
    /// Allocates a block with a count of one that will run `destroyer`.
    ///
    /// On failure nothing is allocated and `destroyer` is dropped unused.
    pub(super) fn allocate<D: Destroyer<T>>(destroyer: D) -> Result<NonNull<Self>, AllocError> {
        let layout = Layout::new::<Block<T, D>>();
        let block = alloc::try_allocate(layout)?.cast::<Block<T, D>>();

        // SAFETY: `block` is freshly allocated for `Block<T, D>`.
        unsafe {
            block.as_ptr().write(Block {
                header: Header {
                    count: RefCount::new(),
                    teardown: teardown::<T, D>,
                },
                destroyer,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(block = ?block, size = layout.size(), "allocated control block");

        Ok(block.cast())
    }

    #[inline]
    pub(super) fn count(&self) -> &RefCount {
        &self.count
    }

    /// Destroys `payload` and then frees the block.
    ///
    /// # Safety
    /// The caller must have observed the count reach zero through
    /// [`RefCount::decrement`], and `payload` must be the pointer adopted with
    /// this block. Neither may be used afterwards.
    pub(super) unsafe fn destroy(header: NonNull<Self>, payload: NonNull<T>) {
        let teardown = header.as_ref().teardown;
        teardown(header, payload);
    }
}

/// Frees a block on scope exit, so a panicking destroyer cannot leak it.
struct FreeOnExit<T, D>(NonNull<Block<T, D>>);

impl<T, D> Drop for FreeOnExit<T, D> {
    fn drop(&mut self) {
        // SAFETY: the destroyer has been moved out, the header is still
        // initialized and nothing references the block anymore.
        unsafe {
            ptr::drop_in_place(ptr::addr_of_mut!((*self.0.as_ptr()).header));
            alloc::deallocate(self.0.cast(), Layout::new::<Block<T, D>>());
        }
    }
}

unsafe fn teardown<T, D: Destroyer<T>>(header: NonNull<Header<T>>, payload: NonNull<T>) {
    let block = header.cast::<Block<T, D>>();
    let free = FreeOnExit(block);

    #[cfg(feature = "tracing")]
    tracing::trace!(block = ?block, "last owner released, destroying payload");

    let destroyer = ptr::read(ptr::addr_of!((*block.as_ptr()).destroyer));
    destroyer.destroy(payload);

    // Payload first, then the block.
    drop(free);
}
