//! The copy-on-write array handle.

use std::fmt;
use std::iter;
use std::ops::Range;
use std::sync::Arc;

use cowarray_core::{
    violation, ContractViolation, DeclaredType, Exact, ForeignArray, Representation, StorageId,
};
use smallvec::SmallVec;

use crate::config::GrowthPolicy;
use crate::facade::{expect_valid, ArrayBuffer, Iter};
use crate::slice::ArraySlice;
use crate::slice_mut::SliceMut;

/// A growable array with value semantics.
///
/// Cloning is O(1): both handles share one buffer until either of them
/// mutates, at which point the mutating handle copies. A handle that is the
/// only owner of its buffer mutates in place.
///
/// `D` declares what the elements are; see [`DeclaredType`]. With the
/// default [`Exact`] no element is ever checked at runtime.
pub struct CowArray<T, D = Exact> {
    buffer: ArrayBuffer<T, D>,
}

impl<T, D> Clone for CowArray<T, D> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
        }
    }
}

impl<T, D> Default for CowArray<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D> CowArray<T, D> {
    /// An empty array. Does not allocate element storage.
    pub fn new() -> Self {
        Self::with_policy(0, GrowthPolicy::default())
    }

    /// An empty array with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_policy(capacity, GrowthPolicy::default())
    }

    /// An empty array with room for `capacity` elements that grows under
    /// `policy`.
    pub fn with_policy(capacity: usize, policy: GrowthPolicy) -> Self {
        Self {
            buffer: ArrayBuffer::with_policy(capacity, policy),
        }
    }

    /// An array reading through to a foreign array until first mutated.
    pub fn from_foreign(array: Arc<dyn ForeignArray<T>>) -> Self {
        Self {
            buffer: ArrayBuffer::from_foreign(array),
        }
    }

    pub(crate) fn from_buffer(buffer: ArrayBuffer<T, D>) -> Self {
        Self { buffer }
    }

    pub(crate) fn into_buffer(self) -> ArrayBuffer<T, D> {
        self.buffer
    }

    /// The underlying buffer facade.
    pub fn buffer(&self) -> &ArrayBuffer<T, D> {
        &self.buffer
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.buffer.count()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements storable without reallocating.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Identity of the underlying storage.
    pub fn storage_id(&self) -> StorageId {
        self.buffer.storage_id()
    }

    /// Representation of the underlying storage.
    pub fn representation(&self) -> Representation {
        self.buffer.representation()
    }

    /// Whether this handle is the sole owner of a native buffer.
    pub fn is_uniquely_referenced(&self) -> bool {
        self.buffer.is_uniquely_referenced()
    }

    /// Address of the first element slot, for native storage.
    pub fn first_element_address(&self) -> Option<*const T> {
        self.buffer.first_element_address_if_contiguous()
    }

    /// Reinterpret the elements as `D2` without checking them now.
    ///
    /// Each element is checked against `D2` when it is next read, or all at
    /// once by [`verify_element_types`](CowArray::verify_element_types).
    pub fn downcast_deferred<D2: DeclaredType<T>>(self) -> CowArray<T, D2> {
        CowArray::from_buffer(self.buffer.downcast_deferred())
    }

    /// Forget the declared element type.
    pub fn upcast(self) -> CowArray<T, Exact> {
        CowArray::from_buffer(self.buffer.upcast())
    }
}

impl<T: Clone, D: DeclaredType<T>> CowArray<T, D> {
    /// The element at `index`.
    ///
    /// # Panics
    ///
    /// If `index >= len()`, or the element does not match `D`.
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        self.buffer.get(index)
    }

    /// The element at `index`, or the violation an out-of-range read would
    /// trap with.
    pub fn try_get(&self, index: usize) -> Result<T, ContractViolation> {
        self.buffer.check_index(index)?;
        Ok(self.buffer.get(index))
    }

    /// The first element.
    pub fn first(&self) -> Option<T> {
        (!self.is_empty()).then(|| self.get(0))
    }

    /// The last element.
    pub fn last(&self) -> Option<T> {
        self.len().checked_sub(1).map(|i| self.get(i))
    }

    /// Overwrite the element at `index`.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: T) {
        self.buffer.set_element(index, value);
    }

    /// Swap two elements.
    #[track_caller]
    pub fn swap(&mut self, a: usize, b: usize) {
        expect_valid(self.buffer.check_index(a));
        expect_valid(self.buffer.check_index(b));
        let count = self.len();
        self.buffer.mutate(count, false, |storage| storage.swap(a, b));
    }

    /// Append an element, growing geometrically when full.
    #[track_caller]
    pub fn push(&mut self, value: T) {
        ArrayBuffer::<T, D>::check_incoming(&value);
        let count = self.len();
        let minimum = checked_count(count, 1);
        self.buffer
            .mutate(minimum, true, |storage| storage.push(value));
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let count = self.len();
        self.buffer.mutate(count, false, |storage| storage.pop())
    }

    /// Insert `value` before the element at `index`.
    ///
    /// # Panics
    ///
    /// If `index > len()`.
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: T) {
        self.replace_subrange(index..index, iter::once(value));
    }

    /// Remove and return the element at `index`, shifting the rest down.
    #[track_caller]
    pub fn remove(&mut self, index: usize) -> T {
        expect_valid(self.buffer.check_index(index));
        let count = self.len();
        self.buffer.mutate(count, false, |storage| storage.remove(index))
    }

    /// Append every element of `items`.
    #[track_caller]
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        let count = self.len();
        self.replace_subrange(count..count, items);
    }

    /// Keep only the first `len` elements.
    pub fn truncate(&mut self, len: usize) {
        let count = self.len();
        if len < count {
            self.replace_subrange(len..count, iter::empty());
        }
    }

    /// Remove every element. A shared buffer is released, not copied.
    pub fn clear(&mut self) {
        if self.buffer.is_uniquely_referenced() {
            self.truncate(0);
        } else {
            self.buffer = ArrayBuffer::with_policy(0, self.buffer.policy());
        }
    }

    /// Make room for at least `additional` more elements.
    #[track_caller]
    pub fn reserve(&mut self, additional: usize) {
        let minimum = checked_count(self.len(), additional);
        if self.buffer.request_mutable_backing_buffer(minimum).is_some() {
            return;
        }
        self.buffer.mutate(minimum, true, |_| ());
    }

    /// Replace the elements in `range` with `items`.
    ///
    /// A uniquely owned buffer is edited in place when it has room. A
    /// shared or foreign buffer is rebuilt from the kept prefix, the new
    /// elements and the kept suffix, without copying the replaced range.
    #[track_caller]
    pub fn replace_subrange<I: IntoIterator<Item = T>>(&mut self, range: Range<usize>, items: I) {
        expect_valid(self.buffer.check_range(&range));
        let items: SmallVec<[T; 4]> = items.into_iter().collect();
        for value in &items {
            ArrayBuffer::<T, D>::check_incoming(value);
        }
        let count = self.len();
        let new_count = checked_count(count - range.len(), items.len());
        if self.buffer.is_uniquely_referenced() {
            self.buffer.mutate(new_count, true, |storage| {
                storage.replace_subrange(range, items)
            });
        } else {
            let capacity = self
                .buffer
                .policy()
                .capacity_for(self.capacity(), new_count, true);
            self.buffer
                .replace_out_of_place(0..count, range, items, capacity);
        }
    }

    /// A slice sharing this array's storage.
    ///
    /// The elements in `range` are verified against `D` first.
    #[track_caller]
    pub fn slice(&self, range: Range<usize>) -> ArraySlice<T, D> {
        expect_valid(self.buffer.check_range(&range));
        self.buffer.type_check(range.clone());
        ArraySlice::from_parts(self.buffer.clone(), range)
    }

    /// A mutable view of `range` that edits this array in place.
    #[track_caller]
    pub fn slice_mut(&mut self, range: Range<usize>) -> SliceMut<'_, T, D> {
        expect_valid(self.buffer.check_range(&range));
        SliceMut::new(&mut self.buffer, range, None)
    }

    /// Iterate over clones of the elements.
    pub fn iter(&self) -> Iter<'_, T, D> {
        self.buffer.iter_range(0..self.len())
    }

    /// Copy the elements out.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        self.buffer.copy_contents(0..self.len(), &mut out);
        out
    }

    /// Run `f` over the elements as one slice.
    pub fn with_contiguous<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.buffer.with_contiguous(f)
    }

    /// Run `f` over the elements as one mutable slice, copying first if
    /// the buffer is shared or foreign.
    pub fn with_contiguous_mut<R>(&mut self, f: impl FnOnce(&mut [T]) -> R) -> R {
        let count = self.len();
        self.buffer
            .mutate(count, false, |storage| f(storage.as_mut_slice()))
    }

    /// Verify every element against `D` now, so later reads skip checks.
    #[track_caller]
    pub fn verify_element_types(&mut self) {
        self.buffer.verify_element_types();
    }

    /// Whether reads currently verify elements against `D`.
    pub fn needs_element_type_check(&self) -> bool {
        self.buffer.needs_element_type_check()
    }

    /// Hand the contents out as a foreign array without copying.
    pub fn as_foreign(&self) -> Arc<dyn ForeignArray<T>>
    where
        T: Send + Sync + 'static,
    {
        self.buffer.as_foreign()
    }
}

#[track_caller]
pub(crate) fn checked_count(count: usize, additional: usize) -> usize {
    count
        .checked_add(additional)
        .unwrap_or_else(|| violation(ContractViolation::CapacityOverflow { count, additional }))
}

impl<T: Clone, D: DeclaredType<T>> FromIterator<T> for CowArray<T, D> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<T>>())
    }
}

impl<T: Clone, D: DeclaredType<T>> From<Vec<T>> for CowArray<T, D> {
    fn from(elements: Vec<T>) -> Self {
        Self::from_buffer(ArrayBuffer::from_vec(elements, GrowthPolicy::default()))
    }
}

impl<T: Clone, D: DeclaredType<T>> Extend<T> for CowArray<T, D> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        CowArray::extend(self, items);
    }
}

impl<'a, T: Clone, D: DeclaredType<T>> IntoIterator for &'a CowArray<T, D> {
    type Item = T;
    type IntoIter = Iter<'a, T, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone + PartialEq, D: DeclaredType<T>> PartialEq for CowArray<T, D> {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if self.storage_id() == other.storage_id() {
            return true;
        }
        self.iter().eq(other.iter())
    }
}

impl<T: Clone + Eq, D: DeclaredType<T>> Eq for CowArray<T, D> {}

impl<T: Clone + fmt::Debug, D: DeclaredType<T>> fmt::Debug for CowArray<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
