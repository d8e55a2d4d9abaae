//! Property-based invariant tests for the generation-checked arena and heap.
//!
//! 1. `len()` always equals the number of keys that still resolve.
//! 2. A removed key never resolves again, no matter how many slots are reused.
//! 3. Live keys always resolve to the value they were inserted with.
//! 4. Heap handles follow the same rules through `release`.

use proptest::prelude::*;
use std::collections::HashMap;
use tether_core::{Arena, ArenaKey, Heap};

#[derive(Debug, Clone)]
enum Op {
    Insert(u32),
    /// Remove the n-th live key (mod live count).
    Remove(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u32>().prop_map(Op::Insert),
        2 => any::<usize>().prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn arena_tracks_live_and_dead_keys(ops in proptest::collection::vec(op_strategy(), 1..200)) {
        let mut arena = Arena::new();
        let mut live: Vec<(ArenaKey, u32)> = Vec::new();
        let mut dead: Vec<ArenaKey> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(v) => {
                    let k = arena.insert(v);
                    prop_assert!(!dead.contains(&k), "reissued a retired key");
                    live.push((k, v));
                }
                Op::Remove(n) => {
                    if live.is_empty() {
                        continue;
                    }
                    let (k, v) = live.remove(n % live.len());
                    prop_assert_eq!(arena.remove(k), Some(v));
                    dead.push(k);
                }
            }

            prop_assert_eq!(arena.len(), live.len());
            for (k, v) in &live {
                prop_assert_eq!(arena.get(*k), Some(v));
            }
            for k in &dead {
                prop_assert!(!arena.contains(*k));
            }
        }
    }

    #[test]
    fn heap_release_is_final(values in proptest::collection::vec(any::<u16>(), 1..64), kill_mask in any::<u64>()) {
        let mut heap = Heap::new();
        let handles: Vec<_> = values.iter().map(|v| heap.alloc(*v)).collect();
        let mut expected: HashMap<usize, u16> = values.iter().copied().enumerate().collect();

        for (i, h) in handles.iter().enumerate() {
            if kill_mask & (1 << (i % 64)) != 0 {
                prop_assert!(heap.release(*h));
                expected.remove(&i);
            }
        }
        // Refill freed slots; old handles must stay dead.
        for v in 0..values.len() as u16 {
            heap.alloc(v);
        }

        for (i, h) in handles.iter().enumerate() {
            match expected.get(&i) {
                Some(v) => prop_assert_eq!(heap.get(*h).copied(), Some(*v)),
                None => prop_assert!(heap.upgrade(*h).is_none()),
            }
        }
    }
}
