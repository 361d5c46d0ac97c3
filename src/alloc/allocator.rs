use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;
use std::alloc::{alloc, dealloc};

/// The error type for allocation failures.
///
/// Carries the layout that could not be satisfied so callers can hand it to
/// [`std::alloc::handle_alloc_error`] or report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    /// Creates an error for a failed request of `layout`.
    pub const fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// The layout of the request that failed.
    pub const fn layout(&self) -> Layout {
        self.layout
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory allocation of {} bytes (align {}) failed",
            self.layout.size(),
            self.layout.align()
        )
    }
}

impl std::error::Error for AllocError {}

/// Allocates memory for `layout` from the global allocator.
///
/// Zero-sized layouts never touch the allocator; they get a dangling,
/// suitably aligned pointer instead.
///
/// # Errors
/// Returns `AllocError` if the global allocator returns null.
pub fn try_allocate(layout: Layout) -> Result<NonNull<u8>, AllocError> {
    if layout.size() == 0 {
        // SAFETY: alignments are non-zero powers of two.
        return Ok(unsafe { NonNull::new_unchecked(layout.align() as *mut u8) });
    }

    // SAFETY: layout has a non-zero size.
    let raw = unsafe { alloc(layout) };
    match NonNull::new(raw) {
        Some(ptr) => Ok(ptr),
        None => {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                size = layout.size(),
                align = layout.align(),
                "global allocator returned null"
            );
            Err(AllocError::new(layout))
        }
    }
}

/// Returns memory obtained from [`try_allocate`].
///
/// # Safety
/// `ptr` must have been returned by `try_allocate(layout)` with this exact
/// `layout` and must not have been deallocated already.
pub unsafe fn deallocate(ptr: NonNull<u8>, layout: Layout) {
    if layout.size() != 0 {
        dealloc(ptr.as_ptr(), layout);
    }
}
