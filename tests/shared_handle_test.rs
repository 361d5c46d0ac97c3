use anyhow::{ensure, Context, Result};
use core::ptr::NonNull;
use sharehold::{AllocError, HandleError, SharedHandle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Tracked {
    value: i32,
    drops: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_lifecycle_walkthrough() -> Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));

    let h1 = SharedHandle::try_new(Tracked {
        value: 42,
        drops: drops.clone(),
    })
    .context("allocating the first handle")?;
    ensure!(h1.use_count() == 1, "fresh handle must own the only share");

    let h2 = h1.clone();
    ensure!(h1.use_count() == 2 && h2.use_count() == 2);

    drop(h2);
    ensure!(h1.use_count() == 1);
    ensure!(h1.value == 42);
    ensure!(drops.load(Ordering::SeqCst) == 0);

    drop(h1);
    ensure!(drops.load(Ordering::SeqCst) == 1, "payload destroyed exactly once");
    Ok(())
}

#[test]
fn test_string_payload_member_access() {
    let greeting = SharedHandle::new(String::from("Hello"));
    assert_eq!(*greeting, "Hello");
    assert_eq!(greeting.len(), 5);
}

/// A stand-in for an OS resource that has to be closed, not freed.
struct FileDescriptor {
    fd: i32,
}

#[test]
fn test_destroyer_closes_resource() -> Result<()> {
    let closed = Arc::new(AtomicUsize::new(0));
    let log = closed.clone();

    let raw = NonNull::from(Box::leak(Box::new(FileDescriptor { fd: 3 })));
    let file = unsafe {
        SharedHandle::from_raw_with(raw, move |fd: NonNull<FileDescriptor>| {
            let fd = unsafe { Box::from_raw(fd.as_ptr()) };
            log.fetch_add(fd.fd as usize, Ordering::SeqCst);
        })
    }?;

    let readers: Vec<_> = (0..3).map(|_| file.clone()).collect();
    ensure!(file.use_count() == 4);
    drop(file);
    ensure!(closed.load(Ordering::SeqCst) == 0, "closed while readers remain");

    for reader in readers {
        ensure!(reader.fd == 3);
    }
    ensure!(closed.load(Ordering::SeqCst) == 3, "descriptor closed once");
    Ok(())
}

#[test]
fn test_empty_handle_errors() {
    let empty: SharedHandle<u8> = SharedHandle::empty();
    let err = empty.try_deref().unwrap_err();
    assert_eq!(err, HandleError::Empty);
    assert_eq!(err.to_string(), "dereferenced an empty SharedHandle");
}

#[test]
fn test_alloc_error_converts_to_handle_error() {
    let layout = core::alloc::Layout::new::<[u8; 64]>();
    let err: HandleError = AllocError::new(layout).into();
    assert_eq!(err, HandleError::Alloc(AllocError::new(layout)));
    assert!(std::error::Error::source(&err).is_some());
    assert!(err.to_string().contains("64 bytes"));
}

#[test]
fn test_move_semantics() {
    let mut a = SharedHandle::new(vec![1, 2, 3]);
    let observer = a.clone();

    let b = a.take();
    assert!(a.is_empty());
    assert_eq!(a.use_count(), 0);
    assert!(a.get().is_none());
    assert_eq!(b.use_count(), 2);

    // Plain Rust assignment is move assignment: the old value is released.
    a = b;
    assert_eq!(a.use_count(), 2);
    drop(observer);
    assert_eq!(a.use_count(), 1);
    assert_eq!(a.as_slice(), &[1, 2, 3]);
}

#[test]
fn test_from_value_and_pointer_format() {
    let handle: SharedHandle<u32> = 9.into();
    assert_eq!(*handle, 9);
    assert_eq!(format!("{handle:p}"), format!("{:p}", handle.as_ptr()));
}
