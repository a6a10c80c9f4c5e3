//! Value semantics of arrays sharing storage.
//!
//! Clones share one buffer until one of them is written. The written
//! handle copies, the others keep observing the old contents, and a
//! handle that is the sole owner never copies at all.

use cowarray::buffer::metrics;
use cowarray::prelude::*;
use cowarray_test_utils::fixtures::sequence;
use proptest::prelude::*;

#[test]
fn clones_share_until_written() {
    let a = sequence(8);
    let mut b = a.clone();
    assert_eq!(a.storage_id(), b.storage_id());
    assert!(!a.is_uniquely_referenced());

    let before = metrics::snapshot();
    b.set(3, 300);
    let delta = metrics::snapshot().since(&before);

    assert_eq!(delta.cow_copies, 1);
    assert_ne!(a.storage_id(), b.storage_id());
    assert_eq!(a.get(3), 3);
    assert_eq!(b.get(3), 300);
    assert!(a.is_uniquely_referenced());
    assert!(b.is_uniquely_referenced());
}

#[test]
fn sole_owner_writes_in_place() {
    let mut a = sequence(8);
    let id = a.storage_id();
    let before = metrics::snapshot();
    a.set(0, 10);
    a.swap(1, 2);
    a.pop();
    a.truncate(5);
    let delta = metrics::snapshot().since(&before);
    assert_eq!(delta.reallocations(), 0);
    assert_eq!(delta.in_place_mutations, 4);
    assert_eq!(a.storage_id(), id);
    assert_eq!(a.to_vec(), vec![10, 2, 1, 3, 4]);
}

#[test]
fn dropping_the_other_owner_restores_uniqueness() {
    let mut a = sequence(4);
    let b = a.clone();
    drop(b);
    let id = a.storage_id();
    a.push(4);
    // Full buffer, so this is growth rather than a copy.
    assert_ne!(a.storage_id(), id);
    let before = metrics::snapshot();
    a.push(5);
    assert_eq!(metrics::snapshot().since(&before).reallocations(), 0);
}

#[test]
fn appends_grow_geometrically() {
    let mut a: CowArray<u32> = CowArray::new();
    let mut capacities = Vec::new();
    for i in 0..40 {
        a.push(i);
        if capacities.last() != Some(&a.capacity()) {
            capacities.push(a.capacity());
        }
    }
    assert_eq!(capacities, vec![4, 8, 16, 32, 64]);
}

#[test]
fn custom_policy_sets_the_first_allocation() {
    let policy = GrowthPolicy::with_min_nonzero_capacity(10);
    let mut a: CowArray<u8> = CowArray::with_policy(0, policy);
    a.push(1);
    assert_eq!(a.capacity(), 10);
    let b = a.clone();
    let mut c = b.clone();
    c.push(2);
    assert_eq!(c.capacity(), 10);
    assert_eq!(b.len(), 1);
}

#[test]
fn clear_releases_shared_storage() {
    let a = sequence(100);
    let mut b = a.clone();
    let before = metrics::snapshot();
    b.clear();
    assert_eq!(metrics::snapshot().since(&before).cow_copies, 0);
    assert!(b.is_empty());
    assert_eq!(a.len(), 100);
    assert!(a.is_uniquely_referenced());
}

#[test]
fn equality_compares_elements_not_storage() {
    let a = sequence(5);
    let b: CowArray<i64> = vec![0, 1, 2, 3, 4].into();
    assert_ne!(a.storage_id(), b.storage_id());
    assert_eq!(a, b);
    let mut c = a.clone();
    assert_eq!(a, c);
    c.set(4, 5);
    assert_ne!(a, c);
    assert_eq!(format!("{a:?}"), "[0, 1, 2, 3, 4]");
}

#[test]
fn slices_keep_the_buffer_alive() {
    let a = sequence(10);
    let s = a.slice(4..6);
    drop(a);
    assert_eq!(s.to_vec(), vec![4, 5]);
    assert_eq!(s.start_index(), 4);
}

#[test]
fn clones_move_between_threads() {
    let a: CowArray<u64> = (0..1000).collect();
    let b = a.clone();
    let handle = std::thread::spawn(move || {
        let mut b = b;
        b.set(0, 1000);
        b.iter().sum::<u64>()
    });
    let sum = handle.join().expect("worker panicked");
    assert_eq!(sum, (0..1000).sum::<u64>() + 1000);
    assert_eq!(a.get(0), 0);
}

#[cfg(not(miri))]
proptest! {
    #[test]
    fn edits_to_a_clone_never_leak(
        values in proptest::collection::vec(any::<i32>(), 0..40),
        edits in proptest::collection::vec((0usize..100, any::<i32>()), 0..20),
    ) {
        let original: CowArray<i32> = values.clone().into();
        let mut copy = original.clone();
        let mut model = values.clone();
        for (index, value) in edits {
            if model.is_empty() {
                copy.push(value);
                model.push(value);
            } else {
                let index = index % model.len();
                copy.set(index, value);
                model[index] = value;
            }
        }
        prop_assert_eq!(copy.to_vec(), model);
        prop_assert_eq!(original.to_vec(), values);
    }
}
