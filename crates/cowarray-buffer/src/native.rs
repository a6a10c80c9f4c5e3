//! Native contiguous buffers.
//!
//! A [`NativeStorage`] block is a fixed-capacity header plus a contiguous
//! run of `count` initialized elements. Blocks never grow past the capacity
//! they were allocated with, so the element address is stable for the
//! block's lifetime. Anything that needs more room allocates a new block
//! and moves or copies the elements across (see [`NativeBuffer::reallocate`]).
//!
//! [`NativeBuffer`] is the strong handle: cloning it shares the block, and
//! the block is released when the last handle drops.

use std::ops::Range;
use std::sync::Arc;

use cowarray_core::{violation, ContractViolation, ForeignArray, OwnershipOracle, StorageId};

use crate::config::GrowthPolicy;
use crate::metrics;

/// A fixed-capacity block of contiguous elements.
///
/// Mutation requires `&mut NativeStorage`, which the storage layer only
/// hands out after the ownership oracle has confirmed that the block is
/// uniquely referenced.
#[derive(Clone, Debug)]
pub struct NativeStorage<T> {
    capacity: usize,
    policy: GrowthPolicy,
    pub(crate) elements: Vec<T>,
}

impl<T> NativeStorage<T> {
    /// Allocate an empty block with room for `capacity` elements.
    pub fn allocate(capacity: usize, policy: GrowthPolicy) -> Self {
        metrics::record(|m| m.allocations += 1);
        Self {
            capacity,
            policy,
            elements: Vec::with_capacity(capacity),
        }
    }

    /// Number of initialized elements.
    pub fn count(&self) -> usize {
        self.elements.len()
    }

    /// Number of elements the block can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Growth policy this block was allocated under.
    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// Identity of the block.
    ///
    /// Only meaningful once the block sits behind a [`NativeBuffer`].
    pub fn storage_id(&self) -> StorageId {
        StorageId::of(self)
    }

    /// Address of element storage. Valid even when the block is empty.
    pub fn first_element_address(&self) -> *const T {
        self.elements.as_ptr()
    }

    /// The initialized elements.
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    /// The initialized elements, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.elements
    }

    /// Trap unless `index` addresses an initialized element.
    #[track_caller]
    pub fn check_valid_subscript(&self, index: usize) {
        if index >= self.count() {
            violation(ContractViolation::IndexOutOfBounds {
                index,
                count: self.count(),
            });
        }
    }

    /// Bounds-checked element reference.
    #[track_caller]
    pub fn get_ref(&self, index: usize) -> &T {
        self.check_valid_subscript(index);
        &self.elements[index]
    }

    /// Overwrite the element at `index`.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: T) {
        self.check_valid_subscript(index);
        self.elements[index] = value;
    }

    /// Swap two elements.
    #[track_caller]
    pub fn swap(&mut self, a: usize, b: usize) {
        self.check_valid_subscript(a);
        self.check_valid_subscript(b);
        self.elements.swap(a, b);
    }

    /// Append one element. The block must have spare capacity.
    pub fn push(&mut self, value: T) {
        debug_assert!(self.count() < self.capacity, "push past block capacity");
        self.elements.push(value);
    }

    /// Append elements in order. The block must have room for all of them.
    pub fn extend_in_place<I: IntoIterator<Item = T>>(&mut self, items: I) {
        self.elements.extend(items);
        debug_assert!(self.count() <= self.capacity, "grew past block capacity");
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        self.elements.pop()
    }

    /// Remove the element at `index`, shifting the suffix down.
    #[track_caller]
    pub fn remove(&mut self, index: usize) -> T {
        self.check_valid_subscript(index);
        self.elements.remove(index)
    }

    /// Drop every element at or past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.elements.truncate(len);
    }

    /// Replace `range` with `items`, shifting the suffix.
    ///
    /// The resulting count must fit the block's capacity.
    pub fn replace_subrange<I: IntoIterator<Item = T>>(&mut self, range: Range<usize>, items: I) {
        drop(self.elements.splice(range, items));
        debug_assert!(self.count() <= self.capacity, "splice past block capacity");
    }

    /// Move the elements in `range` out of the block into `target`.
    pub(crate) fn take_elements(&mut self, range: Range<usize>, target: &mut Vec<T>) {
        target.extend(self.elements.drain(range));
    }
}

impl<T: Clone> NativeStorage<T> {
    /// Append clones of the elements in `range` to `target`, returning the
    /// past-the-end offset of `target`.
    pub fn copy_into(&self, range: Range<usize>, target: &mut Vec<T>) -> usize {
        target.extend_from_slice(&self.elements[range]);
        target.len()
    }
}

/// A strong, shareable handle to a [`NativeStorage`] block.
#[derive(Debug)]
pub struct NativeBuffer<T> {
    storage: Arc<NativeStorage<T>>,
}

impl<T> Clone for NativeBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<T> NativeBuffer<T> {
    /// Allocate an empty buffer with room for `capacity` elements.
    pub fn allocate(capacity: usize, policy: GrowthPolicy) -> Self {
        Self::from_storage(NativeStorage::allocate(capacity, policy))
    }

    /// Wrap `elements`; capacity equals the element count.
    pub fn from_vec(elements: Vec<T>, policy: GrowthPolicy) -> Self {
        let mut storage = NativeStorage::allocate(0, policy);
        storage.capacity = elements.len();
        storage.elements = elements;
        Self::from_storage(storage)
    }

    /// Put a freshly built block behind a handle.
    pub fn from_storage(storage: NativeStorage<T>) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Number of initialized elements.
    pub fn count(&self) -> usize {
        self.storage.count()
    }

    /// Capacity of the block.
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Growth policy of the block.
    pub fn policy(&self) -> GrowthPolicy {
        self.storage.policy()
    }

    /// Identity of the block; shared by every clone of this handle.
    pub fn storage_id(&self) -> StorageId {
        StorageId::of(Arc::as_ptr(&self.storage))
    }

    /// Address of the first element slot.
    pub fn first_element_address(&self) -> *const T {
        self.storage.first_element_address()
    }

    /// Number of strong handles sharing the block.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.storage)
    }

    /// Whether this handle is the only one.
    pub fn is_uniquely_referenced(&self) -> bool {
        self.strong_count() == 1
    }

    /// The block, for reading.
    pub fn storage(&self) -> &NativeStorage<T> {
        &self.storage
    }

    /// The block, for writing, if and only if this handle is unique.
    pub fn storage_mut(&mut self) -> Option<&mut NativeStorage<T>> {
        Arc::get_mut(&mut self.storage)
    }

    /// The initialized elements.
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Bounds-checked element reference.
    #[track_caller]
    pub fn get_ref(&self, index: usize) -> &T {
        self.storage.get_ref(index)
    }

    /// Trap unless `index` addresses an initialized element.
    #[track_caller]
    pub fn check_valid_subscript(&self, index: usize) {
        self.storage.check_valid_subscript(index);
    }
}

impl<T: Clone> NativeBuffer<T> {
    /// Bounds-checked element read.
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        self.get_ref(index).clone()
    }

    /// Rebind this handle to a new block that can hold at least
    /// `min_capacity` elements, sized by the growth policy, and return the
    /// new block for writing.
    ///
    /// Elements are moved when this handle was the only one and cloned
    /// otherwise. The old block stays alive until the new one is in place,
    /// so the new block always has a new identity.
    pub fn reallocate(&mut self, min_capacity: usize) -> &mut NativeStorage<T> {
        let policy = self.policy();
        let capacity = policy.capacity_for(self.capacity(), min_capacity, true);
        let count = self.count();
        let mut fresh = NativeStorage::allocate(capacity, policy);
        match Arc::get_mut(&mut self.storage) {
            Some(old) => fresh.elements.append(&mut old.elements),
            None => {
                self.storage.copy_into(0..count, &mut fresh.elements);
            }
        }
        self.storage = Arc::new(fresh);
        Arc::make_mut(&mut self.storage)
    }

    /// Append clones of `range` to `target`; see [`NativeStorage::copy_into`].
    pub fn copy_into(&self, range: Range<usize>, target: &mut Vec<T>) -> usize {
        self.storage.copy_into(range, target)
    }
}

impl<T> OwnershipOracle for NativeBuffer<T> {
    fn storage_id(&self) -> StorageId {
        NativeBuffer::storage_id(self)
    }

    fn strong_count(&self) -> usize {
        NativeBuffer::strong_count(self)
    }
}

impl<T: Clone + Send + Sync> ForeignArray<T> for NativeBuffer<T> {
    fn count(&self) -> usize {
        NativeBuffer::count(self)
    }

    fn get(&self, index: usize) -> T {
        NativeBuffer::get(self, index)
    }

    fn copy_range_into(&self, range: Range<usize>, target: &mut Vec<T>) -> usize {
        self.copy_into(range, target)
    }

    fn is_uniquely_referenced(&self) -> bool {
        NativeBuffer::is_uniquely_referenced(self)
    }

    fn type_label(&self) -> &'static str {
        "native buffer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(values: &[i32]) -> NativeBuffer<i32> {
        NativeBuffer::from_vec(values.to_vec(), GrowthPolicy::default())
    }

    #[test]
    fn allocate_is_empty_with_capacity() {
        let buf = NativeBuffer::<u8>::allocate(8, GrowthPolicy::default());
        assert_eq!(buf.count(), 0);
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.storage().storage_id(), buf.storage_id());
        assert!(buf.is_uniquely_referenced());
    }

    #[test]
    fn from_vec_capacity_equals_count() {
        let buf = buffer_of(&[1, 2, 3]);
        assert_eq!(buf.count(), 3);
        assert_eq!(buf.capacity(), 3);
        assert_eq!(buf.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn clones_share_identity() {
        let a = buffer_of(&[1]);
        let b = a.clone();
        assert_eq!(a.storage_id(), b.storage_id());
        assert_eq!(a.strong_count(), 2);
        assert!(!a.is_uniquely_referenced());
        assert!(OwnershipOracle::is_referenced_exactly(&a, 2));
        drop(b);
        assert!(a.is_uniquely_referenced());
    }

    #[test]
    fn storage_mut_requires_uniqueness() {
        let mut a = buffer_of(&[1, 2]);
        let b = a.clone();
        assert!(a.storage_mut().is_none());
        drop(b);
        a.storage_mut().unwrap().set(0, 9);
        assert_eq!(a.as_slice(), &[9, 2]);
    }

    #[test]
    fn push_within_capacity_keeps_address() {
        let mut buf = NativeBuffer::allocate(4, GrowthPolicy::default());
        let id = buf.storage_id();
        let addr = buf.first_element_address();
        let storage = buf.storage_mut().unwrap();
        storage.push(1);
        storage.extend_in_place([2, 3, 4]);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(buf.storage_id(), id);
        assert_eq!(buf.first_element_address(), addr);
    }

    #[test]
    fn reallocate_doubles_and_moves() {
        let mut buf = buffer_of(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let old = buf.storage_id();
        let storage = buf.reallocate(11);
        assert_eq!(storage.capacity(), 20);
        storage.push(11);
        assert_eq!(buf.count(), 11);
        assert_eq!(buf.as_slice()[10], 11);
        assert_ne!(buf.storage_id(), old);
        assert!(buf.is_uniquely_referenced());
    }

    #[test]
    fn reallocate_always_yields_a_new_identity() {
        let mut buf = NativeBuffer::<u64>::allocate(1, GrowthPolicy::default());
        for round in 0..16 {
            let before = buf.storage_id();
            let wanted = buf.capacity() + 1;
            buf.reallocate(wanted).push(round);
            assert_ne!(buf.storage_id(), before, "round {round}");
        }
        assert_eq!(buf.count(), 16);
    }

    #[test]
    fn reallocate_shared_leaves_other_owner_intact() {
        let mut buf = buffer_of(&[1, 2, 3]);
        let other = buf.clone();
        buf.reallocate(4).push(4);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(other.as_slice(), &[1, 2, 3]);
        assert!(other.is_uniquely_referenced());
        assert!(buf.is_uniquely_referenced());
        assert_ne!(buf.storage_id(), other.storage_id());
    }

    #[test]
    fn copy_into_returns_past_the_end() {
        let buf = buffer_of(&[1, 2, 3, 4, 5]);
        let mut out = vec![0];
        let end = buf.copy_into(1..4, &mut out);
        assert_eq!(out, vec![0, 2, 3, 4]);
        assert_eq!(end, 4);
    }

    #[test]
    fn replace_subrange_shifts_suffix() {
        let mut buf = NativeBuffer::allocate(8, GrowthPolicy::default());
        let storage = buf.storage_mut().unwrap();
        storage.extend_in_place([0, 1, 2, 3]);
        storage.replace_subrange(1..2, [7, 8, 9]);
        assert_eq!(storage.as_slice(), &[0, 7, 8, 9, 2, 3]);
        storage.replace_subrange(0..3, []);
        assert_eq!(storage.as_slice(), &[9, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds: the index is 3 but the count is 3")]
    fn get_past_count_panics() {
        buffer_of(&[1, 2, 3]).get(3);
    }

    #[test]
    fn native_buffer_is_a_foreign_array() {
        let buf = buffer_of(&[4, 5, 6]);
        let foreign: Arc<dyn ForeignArray<i32>> = Arc::new(buf.clone());
        assert_eq!(foreign.count(), 3);
        assert_eq!(foreign.get(1), 5);
        assert_eq!(foreign.type_label(), "native buffer");
        assert!(!foreign.is_uniquely_referenced());
    }
}
