use proptest::prelude::*;
use sharehold::SharedHandle;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SLOTS: usize = 6;

#[derive(Debug, Clone)]
enum Operation {
    Clone { from: usize, to: usize },
    CloneFrom { from: usize, to: usize },
    Move { from: usize, to: usize },
    Assign { from: usize, to: usize },
    Reset(usize),
}

struct Tracked(Arc<AtomicUsize>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn operation() -> impl Strategy<Value = Operation> {
    let slot = 0..SLOTS;
    prop_oneof![
        (slot.clone(), slot.clone()).prop_map(|(from, to)| Operation::Clone { from, to }),
        (slot.clone(), slot.clone()).prop_map(|(from, to)| Operation::CloneFrom { from, to }),
        (slot.clone(), slot.clone()).prop_map(|(from, to)| Operation::Move { from, to }),
        (slot.clone(), slot.clone()).prop_map(|(from, to)| Operation::Assign { from, to }),
        slot.prop_map(Operation::Reset),
    ]
}

proptest! {
    #[test]
    fn test_use_count_matches_live_handles(ops in proptest::collection::vec(operation(), 1..200)) {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut slots: Vec<SharedHandle<Tracked>> = (0..SLOTS).map(|_| SharedHandle::empty()).collect();
        slots[0] = SharedHandle::new(Tracked(drops.clone()));
        // Which slots currently hold a share.
        let mut model = [false; SLOTS];
        model[0] = true;

        for op in ops {
            match op {
                Operation::Clone { from, to } => {
                    // Copy construction into a fresh handle, then move it in.
                    let copy = slots[from].clone();
                    slots[to] = copy;
                    model[to] = model[from];
                }
                Operation::CloneFrom { from, to } => {
                    if from != to {
                        let source = slots[from].clone();
                        slots[to].clone_from(&source);
                        model[to] = model[from];
                    }
                }
                Operation::Move { from, to } => {
                    if from != to {
                        let moved = slots[from].take();
                        slots[to] = moved;
                        model[to] = model[from];
                        model[from] = false;
                    }
                }
                Operation::Assign { from, to } => {
                    if from != to {
                        let moved = slots[from].take();
                        slots[to].assign(moved);
                        model[to] = model[from];
                        model[from] = false;
                    }
                }
                Operation::Reset(slot) => {
                    slots[slot].reset();
                    model[slot] = false;
                }
            }

            let live = model.iter().filter(|held| **held).count();
            for (slot, held) in slots.iter().zip(model.iter()) {
                prop_assert_eq!(!slot.is_empty(), *held);
                if *held {
                    prop_assert_eq!(slot.use_count(), live);
                } else {
                    prop_assert_eq!(slot.use_count(), 0);
                }
            }
            let expected_drops = usize::from(live == 0);
            prop_assert_eq!(drops.load(Ordering::SeqCst), expected_drops);
        }

        drop(slots);
        prop_assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
