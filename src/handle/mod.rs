//! `SharedHandle` — an atomically reference-counted owner of a heap payload.
//!
//! Every populated handle points at two things: the payload and a control
//! block holding the owner count and the payload's [`Destroyer`]. Cloning a
//! handle bumps the count; dropping or resetting one lowers it. The handle
//! that lowers the count to zero runs the destroyer and frees the control
//! block, exactly once, on whatever thread it happens to be.
//!
//! A handle is either empty or fully populated. There is no state with a
//! payload but no block, or a block but no payload.
//!
//! The payload is shared, not synchronized. `Deref` hands out `&T`; mutating
//! through shared handles needs interior mutability in `T`, exactly as with
//! `std::sync::Arc`.

mod block;


use crate::alloc::{self, AllocError};
use crate::destroy::{BoxDestroyer, Destroyer};
use crate::error::HandleError;
use block::Header;
use core::alloc::Layout;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::{self, NonNull};
use std::alloc::handle_alloc_error;

/// A populated handle's two pointers. Always present together.
struct Shared<T> {
    payload: NonNull<T>,
    block: NonNull<Header<T>>,
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Shared<T> {}

impl<T> Shared<T> {
    #[inline]
    fn header(&self) -> &Header<T> {
        // SAFETY: a `Shared` only exists inside a handle that owns one count
        // on the block, so the block is alive.
        unsafe { self.block.as_ref() }
    }
}

/// A thread-safe, reference-counted handle to a heap payload.
///
/// # Example
///
/// ```rust
/// use sharehold::SharedHandle;
///
/// let h1 = SharedHandle::new(42);
/// assert_eq!(h1.use_count(), 1);
///
/// let h2 = h1.clone();
/// assert_eq!(h1.use_count(), 2);
/// assert_eq!(h2.use_count(), 2);
///
/// drop(h2);
/// assert_eq!(h1.use_count(), 1);
/// assert_eq!(*h1, 42);
/// ```
pub struct SharedHandle<T> {
    inner: Option<Shared<T>>,
    _owns: PhantomData<T>,
}

impl<T> SharedHandle<T> {
    /// Creates a handle that holds nothing. `use_count()` is zero.
    pub const fn empty() -> Self {
        Self {
            inner: None,
            _owns: PhantomData,
        }
    }

    /// Moves `value` to the heap and shares it.
    ///
    /// # Panics
    ///
    /// Diverges through [`handle_alloc_error`] if either allocation fails.
    /// Use [`SharedHandle::try_new`] to handle exhaustion instead.
    pub fn new(value: T) -> Self {
        match Self::try_new(value) {
            Ok(handle) => handle,
            Err(err) => handle_alloc_error(err.layout()),
        }
    }

    /// Moves `value` to the heap and shares it, reporting allocation failure.
    ///
    /// # Errors
    ///
    /// Returns `AllocError` if the payload or the control block cannot be
    /// allocated. `value` is dropped in that case and nothing stays allocated.
    pub fn try_new(value: T) -> Result<Self, AllocError> {
        let payload = alloc::try_allocate(Layout::new::<T>())?.cast::<T>();

        // SAFETY: `payload` is allocated for `T` with `Layout::new::<T>()`,
        // which is what `BoxDestroyer` expects to reclaim.
        unsafe {
            payload.as_ptr().write(value);
            Self::from_raw(payload).map_err(|err| {
                BoxDestroyer.destroy(payload);
                err
            })
        }
    }

    /// Adopts a raw payload, destroying it as a `Box<T>` when the last owner
    /// goes away.
    ///
    /// # Errors
    ///
    /// Returns `AllocError` if the control block cannot be allocated. The
    /// caller then still owns `payload`.
    ///
    /// # Safety
    ///
    /// - `payload` must come from `Box::into_raw`, or from the global
    ///   allocator with `Layout::new::<T>()` and hold an initialized `T`.
    /// - `payload` must not already be owned by another handle chain.
    ///   Adopting the same pointer twice starts two independent counts and
    ///   destroys the payload twice; this is not detected.
    pub unsafe fn from_raw(payload: NonNull<T>) -> Result<Self, AllocError> {
        Self::from_raw_with(payload, BoxDestroyer)
    }

    /// Adopts a raw payload that `destroyer` will clean up when the last owner
    /// goes away.
    ///
    /// # Errors
    ///
    /// Returns `AllocError` if the control block cannot be allocated. The
    /// caller then still owns `payload`; `destroyer` is dropped unused.
    ///
    /// # Safety
    ///
    /// - `payload` must point to an initialized `T` that stays valid until
    ///   `destroyer` runs.
    /// - `payload` must not already be owned by another handle chain.
    ///   Adopting the same pointer twice starts two independent counts and
    ///   runs two destroyers; this is not detected.
    pub unsafe fn from_raw_with<D>(payload: NonNull<T>, destroyer: D) -> Result<Self, AllocError>
    where
        D: Destroyer<T> + Send + 'static,
    {
        let block = Header::allocate(destroyer)?;
        Ok(Self {
            inner: Some(Shared { payload, block }),
            _owns: PhantomData,
        })
    }

    /// Shares an existing box.
    ///
    /// # Errors
    ///
    /// Returns the box unchanged if the control block cannot be allocated.
    pub fn try_from_box(boxed: Box<T>) -> Result<Self, Box<T>> {
        let payload = NonNull::from(Box::leak(boxed));
        // SAFETY: `payload` came out of a box and nothing else owns it.
        unsafe { Self::from_raw(payload) }.map_err(|_| {
            // SAFETY: adoption failed, so ownership is still ours.
            unsafe { Box::from_raw(payload.as_ptr()) }
        })
    }

    /// Whether the handle holds nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// The payload, or `None` if the handle is empty. Never touches the count.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: the payload lives at least as long as this handle's count.
        self.inner.as_ref().map(|shared| unsafe { shared.payload.as_ref() })
    }

    /// The payload, or `HandleError::Empty`.
    ///
    /// # Errors
    ///
    /// Returns `HandleError::Empty` if the handle holds nothing.
    #[inline]
    pub fn try_deref(&self) -> Result<&T, HandleError> {
        self.get().ok_or(HandleError::Empty)
    }

    /// Mutable access to the payload if this is its only handle.
    ///
    /// Returns `None` if the handle is empty or shared.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        let shared = self.inner?;
        if shared.header().count().is_unique() {
            // SAFETY: no other handle exists and `&mut self` keeps one from
            // being cloned off this one.
            Some(unsafe { &mut *shared.payload.as_ptr() })
        } else {
            None
        }
    }

    /// The raw payload pointer, null if empty. Ownership is unaffected.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.inner
            .map_or(ptr::null(), |shared| shared.payload.as_ptr().cast_const())
    }

    /// Number of handles sharing this payload, zero if empty.
    ///
    /// A snapshot: other threads may clone or drop handles before the caller
    /// looks at it. Do not use it to decide who may touch the payload.
    #[inline]
    pub fn use_count(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |shared| shared.header().count().load())
    }

    /// Whether both handles share one control block. Two empty handles are
    /// considered equal.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        match (this.inner, other.inner) {
            (Some(a), Some(b)) => a.block == b.block,
            (None, None) => true,
            _ => false,
        }
    }

    /// Moves the contents out, leaving this handle empty. The count is
    /// untouched.
    #[inline]
    pub fn take(&mut self) -> Self {
        Self {
            inner: self.inner.take(),
            _owns: PhantomData,
        }
    }

    /// Replaces the contents with `other`, releasing what was held before.
    ///
    /// If both already share a control block this keeps the current contents
    /// and just drops `other`, which lowers the count by one.
    pub fn assign(&mut self, other: Self) {
        if Self::ptr_eq(self, &other) {
            drop(other);
            return;
        }
        self.release();
        self.inner = other.into_shared();
    }

    /// Releases the payload and leaves the handle empty.
    ///
    /// Identical to dropping the handle, except the handle stays usable.
    #[inline]
    pub fn reset(&mut self) {
        self.release();
    }

    /// Releases the payload, then shares `value` instead.
    ///
    /// # Errors
    ///
    /// Returns `AllocError` if `value` cannot be shared. The old payload is
    /// released regardless and the handle is left empty.
    pub fn try_reset_with(&mut self, value: T) -> Result<(), AllocError> {
        self.release();
        self.inner = Self::try_new(value)?.into_shared();
        Ok(())
    }

    /// Releases the payload, then adopts `payload` as with
    /// [`SharedHandle::from_raw`].
    ///
    /// # Errors
    ///
    /// Returns `AllocError` if the control block cannot be allocated. The old
    /// payload is released regardless, the handle is left empty and the caller
    /// still owns `payload`.
    ///
    /// # Safety
    ///
    /// Same contract as [`SharedHandle::from_raw`].
    pub unsafe fn reset_raw(&mut self, payload: NonNull<T>) -> Result<(), AllocError> {
        self.reset_raw_with(payload, BoxDestroyer)
    }

    /// Releases the payload, then adopts `payload` and `destroyer` as with
    /// [`SharedHandle::from_raw_with`].
    ///
    /// # Errors
    ///
    /// Returns `AllocError` if the control block cannot be allocated. The old
    /// payload is released regardless, the handle is left empty and the caller
    /// still owns `payload`.
    ///
    /// # Safety
    ///
    /// Same contract as [`SharedHandle::from_raw_with`].
    pub unsafe fn reset_raw_with<D>(&mut self, payload: NonNull<T>, destroyer: D) -> Result<(), AllocError>
    where
        D: Destroyer<T> + Send + 'static,
    {
        self.release();
        self.inner = Self::from_raw_with(payload, destroyer)?.into_shared();
        Ok(())
    }

    /// Hands this handle's share to the caller without touching the count.
    fn into_shared(mut self) -> Option<Shared<T>> {
        self.inner.take()
    }

    /// Gives up this handle's share. The handle is empty afterwards whether
    /// or not it was the last owner.
    fn release(&mut self) {
        let Some(shared) = self.inner.take() else {
            return;
        };

        if shared.header().count().decrement() {
            // SAFETY: this call observed the count reach zero, so no other
            // handle references the block or the payload.
            unsafe { Header::destroy(shared.block, shared.payload) };
        }
    }
}

impl<T> Clone for SharedHandle<T> {
    /// Shares the payload. The count goes up before the clone exists.
    fn clone(&self) -> Self {
        if let Some(shared) = self.inner.as_ref() {
            shared.header().count().increment();
        }
        Self {
            inner: self.inner,
            _owns: PhantomData,
        }
    }

    /// Copy assignment. A no-op when both handles already share a block.
    fn clone_from(&mut self, source: &Self) {
        if Self::ptr_eq(self, source) {
            return;
        }
        self.release();
        if let Some(shared) = source.inner.as_ref() {
            shared.header().count().increment();
        }
        self.inner = source.inner;
    }
}

impl<T> Drop for SharedHandle<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Deref for SharedHandle<T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the handle is empty.
    #[track_caller]
    fn deref(&self) -> &T {
        match self.try_deref() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<T> AsRef<T> for SharedHandle<T> {
    #[track_caller]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> Default for SharedHandle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<T> for SharedHandle<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f
                .debug_struct("SharedHandle")
                .field("value", value)
                .field("use_count", &self.use_count())
                .finish(),
            None => f.write_str("SharedHandle(Empty)"),
        }
    }
}

impl<T> fmt::Pointer for SharedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

impl<T: PartialEq> PartialEq for SharedHandle<T> {
    /// Compares payloads. Empty handles are equal to each other only.
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T: Eq> Eq for SharedHandle<T> {}

impl<T: Hash> Hash for SharedHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get().hash(state);
    }
}

// SAFETY: handles on different threads share `T` (hence `Sync`) and the last
// one may destroy it on any thread (hence `Send`). Destroyers are `Send` by
// construction and the count is atomic.
unsafe impl<T: Send + Sync> Send for SharedHandle<T> {}
unsafe impl<T: Send + Sync> Sync for SharedHandle<T> {}
