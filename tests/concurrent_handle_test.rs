use core::ptr::NonNull;
use crossbeam_utils::sync::WaitGroup;
use crossbeam_utils::thread;
use sharehold::SharedHandle;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const THREADS: usize = 8;
const ROUNDS: usize = 10_000;

struct Payload {
    drops: Arc<AtomicUsize>,
    value: u64,
}

impl Drop for Payload {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_concurrent_clone_drop_destroys_once() {
    let drops = Arc::new(AtomicUsize::new(0));
    let root = SharedHandle::new(Payload {
        drops: drops.clone(),
        value: 7,
    });

    thread::scope(|s| {
        for _ in 0..THREADS {
            let local = root.clone();
            s.spawn(move |_| {
                let mut held = Vec::with_capacity(16);
                for i in 0..ROUNDS {
                    held.push(local.clone());
                    if i % 16 == 15 {
                        held.clear();
                    }
                    assert_eq!(local.value, 7);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(drops.load(Ordering::SeqCst), 0);
    assert_eq!(root.use_count(), 1);
    drop(root);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_last_owner_races_to_zero() {
    // Every thread holds one share and they all let go at once. Exactly one
    // of them must run the destroyer.
    for _ in 0..200 {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let seen = destroyed.clone();
        let raw = NonNull::from(Box::leak(Box::new(0_u64)));
        let handle = unsafe {
            SharedHandle::from_raw_with(raw, move |p: NonNull<u64>| {
                seen.fetch_add(1, Ordering::SeqCst);
                drop(unsafe { Box::from_raw(p.as_ptr()) });
            })
        }
        .unwrap();

        let start = WaitGroup::new();
        thread::scope(|s| {
            for _ in 0..THREADS {
                let share = handle.clone();
                let start = start.clone();
                s.spawn(move |_| {
                    start.wait();
                    drop(share);
                });
            }
            drop(handle);
            start.wait();
        })
        .unwrap();

        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_writes_before_release_visible_to_destroyer() {
    use std::sync::atomic::AtomicU64;

    let observed = Arc::new(AtomicU64::new(0));
    let sink = observed.clone();
    let raw = NonNull::from(Box::leak(Box::new(AtomicU64::new(0))));
    let handle = unsafe {
        SharedHandle::from_raw_with(raw, move |p: NonNull<AtomicU64>| {
            let cell = unsafe { Box::from_raw(p.as_ptr()) };
            sink.store(cell.load(Ordering::Relaxed), Ordering::SeqCst);
        })
    }
    .unwrap();

    thread::scope(|s| {
        for _ in 0..THREADS {
            let share = handle.clone();
            s.spawn(move |_| {
                share.fetch_add(1, Ordering::Relaxed);
            });
        }
    })
    .unwrap();
    drop(handle);

    assert_eq!(observed.load(Ordering::SeqCst), THREADS as u64);
}

#[test]
fn test_independent_allocations_do_not_interact() {
    let a = SharedHandle::new(1_u32);
    let b = SharedHandle::new(2_u32);

    std::thread::scope(|s| {
        s.spawn(|| {
            let copies: Vec<_> = (0..100).map(|_| a.clone()).collect();
            assert!(copies.iter().all(|h| **h == 1));
        });
        s.spawn(|| {
            let copies: Vec<_> = (0..100).map(|_| b.clone()).collect();
            assert!(copies.iter().all(|h| **h == 2));
        });
    });

    assert_eq!(a.use_count(), 1);
    assert_eq!(b.use_count(), 1);
}
