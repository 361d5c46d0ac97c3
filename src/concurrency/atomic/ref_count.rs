use super::{fence, AtomicUsize, Ordering};

/// Counts above this abort the process, the same ceiling `std::sync::Arc` uses.
///
/// Reaching it requires leaking handles on purpose; aborting keeps the
/// counter from ever wrapping back to zero while owners are still alive.
pub(crate) const MAX_REFCOUNT: usize = isize::MAX as usize;

/// The number of live owners of one shared allocation.
///
/// The protocol mirrors `std::sync::Arc`:
/// - `increment` is `Relaxed`. A new owner can only be made from an existing
///   one, so the count is already at least one and nothing needs publishing.
/// - `decrement` is `Release`, and the call that takes the count to zero
///   issues an `Acquire` fence before reporting it. Every earlier owner's
///   writes therefore happen-before the teardown that follows.
#[repr(transparent)]
pub(crate) struct RefCount {
    inner: AtomicUsize,
}

impl RefCount {
    /// Creates a count of one, owned by the caller.
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            inner: AtomicUsize::new(1),
        }
    }

    /// Registers one more owner and returns the new count.
    ///
    /// Aborts the process if the count would exceed [`MAX_REFCOUNT`].
    #[inline]
    pub(crate) fn increment(&self) -> usize {
        let old = self.inner.fetch_add(1, Ordering::Relaxed);
        if old > MAX_REFCOUNT {
            std::process::abort();
        }
        old + 1
    }

    /// Drops one owner.
    ///
    /// Returns `true` for exactly one caller per allocation: the one that
    /// observed the transition to zero. That caller is synchronized with every
    /// prior `decrement` and must tear the allocation down.
    #[inline]
    #[must_use = "the caller that observes zero owns teardown"]
    pub(crate) fn decrement(&self) -> bool {
        let old = self.inner.fetch_sub(1, Ordering::Release);
        debug_assert!(old != 0, "RefCount decremented below zero");
        if old != 1 {
            return false;
        }
        fence(Ordering::Acquire);
        true
    }

    /// Snapshot of the current count.
    ///
    /// Diagnostic only: other threads may change it before the caller looks.
    #[inline]
    pub(crate) fn load(&self) -> usize {
        self.inner.load(Ordering::Relaxed)
    }

    /// Whether the caller is the only owner.
    ///
    /// Uses `Acquire` so that a `true` result is ordered after every other
    /// owner's release.
    #[inline]
    pub(crate) fn is_unique(&self) -> bool {
        self.inner.load(Ordering::Acquire) == 1
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RefCount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("RefCount").field(&self.load()).finish()
    }
}
