//! Owned slices over shared storage.
//!
//! An [`ArraySlice`] is a window `[start, end)` into a buffer that it owns
//! a strong reference to. Creating one never copies; it makes its own
//! copy-on-write decisions afterwards, independent of the array or the
//! sibling slices it shares storage with.

use std::fmt;
use std::iter;
use std::ops::Range;

use cowarray_core::{ContractViolation, DeclaredType, Exact, Representation, StorageId};
use smallvec::SmallVec;

use crate::array::{checked_count, CowArray};
use crate::facade::{expect_valid, ArrayBuffer, Iter};
use crate::slice_mut::SliceMut;

/// A window into shared array storage, with value semantics.
///
/// Indices are zero-based: element `i` of the slice is element
/// `start_index() + i` of the underlying buffer.
pub struct ArraySlice<T, D = Exact> {
    buffer: ArrayBuffer<T, D>,
    start: usize,
    end: usize,
}

impl<T, D> Clone for ArraySlice<T, D> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

impl<T, D> Default for ArraySlice<T, D> {
    fn default() -> Self {
        Self {
            buffer: ArrayBuffer::new(),
            start: 0,
            end: 0,
        }
    }
}

impl<T, D> ArraySlice<T, D> {
    pub(crate) fn from_parts(buffer: ArrayBuffer<T, D>, range: Range<usize>) -> Self {
        debug_assert!(range.start <= range.end && range.end <= buffer.count());
        Self {
            buffer,
            start: range.start,
            end: range.end,
        }
    }

    /// First buffer index covered by the slice.
    pub fn start_index(&self) -> usize {
        self.start
    }

    /// Buffer index one past the last element of the slice.
    pub fn end_index(&self) -> usize {
        self.end
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the slice has no elements.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The shared buffer facade.
    pub fn buffer(&self) -> &ArrayBuffer<T, D> {
        &self.buffer
    }

    /// Identity of the shared storage.
    pub fn storage_id(&self) -> StorageId {
        self.buffer.storage_id()
    }

    /// Representation of the shared storage.
    pub fn representation(&self) -> Representation {
        self.buffer.representation()
    }

    /// Whether this slice is the sole owner of a native buffer.
    pub fn is_uniquely_referenced(&self) -> bool {
        self.buffer.is_uniquely_referenced()
    }

    /// Address of the slice's first element, for native storage.
    pub fn first_element_address(&self) -> Option<*const T> {
        self.buffer
            .first_element_address_if_contiguous()
            .map(|base| base.wrapping_add(self.start))
    }

    /// Elements the slice can hold before it must reallocate.
    ///
    /// A window that ends at the buffer's last element can use the buffer's
    /// spare capacity. A uniquely owned slice can also reclaim the hidden
    /// elements past its end, which it drops before growing in place.
    pub fn capacity(&self) -> usize {
        let reaches_end = self.end == self.buffer.count();
        if self.buffer.is_native() && (reaches_end || self.is_uniquely_referenced()) {
            self.buffer.capacity() - self.start
        } else {
            self.len()
        }
    }

    fn check_index(&self, index: usize) -> Result<(), ContractViolation> {
        if index < self.len() {
            Ok(())
        } else {
            Err(ContractViolation::IndexOutOfBounds {
                index,
                count: self.len(),
            })
        }
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), ContractViolation> {
        if range.start <= range.end && range.end <= self.len() {
            Ok(())
        } else {
            Err(ContractViolation::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                count: self.len(),
            })
        }
    }

    fn absolute(&self, range: &Range<usize>) -> Range<usize> {
        self.start + range.start..self.start + range.end
    }
}

impl<T: Clone, D: DeclaredType<T>> ArraySlice<T, D> {
    /// The element at `index`.
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        expect_valid(self.check_index(index));
        self.buffer.get(self.start + index)
    }

    /// The element at `index`, or the violation an out-of-range read would
    /// trap with.
    pub fn try_get(&self, index: usize) -> Result<T, ContractViolation> {
        self.check_index(index)?;
        Ok(self.buffer.get(self.start + index))
    }

    /// The first element.
    pub fn first(&self) -> Option<T> {
        (!self.is_empty()).then(|| self.get(0))
    }

    /// The last element.
    pub fn last(&self) -> Option<T> {
        self.len().checked_sub(1).map(|i| self.get(i))
    }

    /// Copy the window into a fresh buffer of its own if the current one is
    /// shared or foreign. The window then starts at zero.
    fn make_unique(&mut self) {
        if !self.buffer.is_uniquely_referenced() {
            let len = self.len();
            let fresh = self.buffer.copy_window(self.start..self.end, len, false);
            self.buffer.rebind(fresh);
            self.start = 0;
            self.end = len;
        }
    }

    /// Overwrite the element at `index`.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: T) {
        ArrayBuffer::<T, D>::check_incoming(&value);
        expect_valid(self.check_index(index));
        self.make_unique();
        let absolute = self.start + index;
        let count = self.buffer.count();
        self.buffer
            .mutate(count, false, |storage| storage.set(absolute, value));
    }

    /// Swap two elements.
    #[track_caller]
    pub fn swap(&mut self, a: usize, b: usize) {
        expect_valid(self.check_index(a));
        expect_valid(self.check_index(b));
        self.make_unique();
        let (a, b) = (self.start + a, self.start + b);
        let count = self.buffer.count();
        self.buffer.mutate(count, false, |storage| storage.swap(a, b));
    }

    /// Replace the elements in `range` with `items`.
    ///
    /// A uniquely owned slice edits its buffer in place, first dropping any
    /// elements past its window since no handle can reach them. A shared
    /// slice is rebuilt into a buffer holding only its own window.
    #[track_caller]
    pub fn replace_subrange<I: IntoIterator<Item = T>>(&mut self, range: Range<usize>, items: I) {
        expect_valid(self.check_range(&range));
        let items: SmallVec<[T; 4]> = items.into_iter().collect();
        for value in &items {
            ArrayBuffer::<T, D>::check_incoming(value);
        }
        let new_len = checked_count(self.len() - range.len(), items.len());
        let absolute = self.absolute(&range);

        if self.buffer.is_uniquely_referenced() {
            let count = self.buffer.count();
            if self.end != count && range.len() != items.len() {
                let end = self.end;
                self.buffer
                    .mutate(count, false, |storage| storage.truncate(end));
            }
            let required = checked_count(self.buffer.count() - range.len(), items.len());
            self.buffer.mutate(required, true, |storage| {
                storage.replace_subrange(absolute, items)
            });
            self.end = self.start + new_len;
        } else {
            let capacity = self
                .buffer
                .policy()
                .capacity_for(self.capacity(), new_len, true);
            self.buffer
                .replace_out_of_place(self.start..self.end, absolute, items, capacity);
            self.start = 0;
            self.end = new_len;
        }
    }

    /// Append an element.
    #[track_caller]
    pub fn push(&mut self, value: T) {
        let len = self.len();
        self.replace_subrange(len..len, iter::once(value));
    }

    /// Append every element of `items`.
    #[track_caller]
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        let len = self.len();
        self.replace_subrange(len..len, items);
    }

    /// Insert `value` before the element at `index`.
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: T) {
        self.replace_subrange(index..index, iter::once(value));
    }

    /// Remove and return the element at `index`.
    #[track_caller]
    pub fn remove(&mut self, index: usize) -> T {
        let value = self.get(index);
        self.replace_subrange(index..index + 1, iter::empty());
        value
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        let last = self.len().checked_sub(1)?;
        Some(self.remove(last))
    }

    /// Keep only the first `len` elements.
    pub fn truncate(&mut self, len: usize) {
        let current = self.len();
        if len < current {
            self.replace_subrange(len..current, iter::empty());
        }
    }

    /// A sub-slice sharing this slice's storage.
    #[track_caller]
    pub fn slice(&self, range: Range<usize>) -> ArraySlice<T, D> {
        expect_valid(self.check_range(&range));
        let absolute = self.absolute(&range);
        self.buffer.type_check(absolute.clone());
        ArraySlice::from_parts(self.buffer.clone(), absolute)
    }

    /// A mutable view of `range` that edits this slice in place.
    ///
    /// A shared slice first copies its window into a buffer of its own.
    #[track_caller]
    pub fn slice_mut(&mut self, range: Range<usize>) -> SliceMut<'_, T, D> {
        expect_valid(self.check_range(&range));
        self.make_unique();
        let absolute = self.absolute(&range);
        SliceMut::new(&mut self.buffer, absolute, Some(&mut self.end))
    }

    /// Iterate over clones of the elements.
    pub fn iter(&self) -> Iter<'_, T, D> {
        self.buffer.iter_range(self.start..self.end)
    }

    /// Copy the elements out.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        self.buffer.copy_contents(self.start..self.end, &mut out);
        out
    }

    /// An array with the slice's elements.
    ///
    /// Shares the storage when the window covers the whole buffer and
    /// copies the window otherwise.
    pub fn to_array(&self) -> CowArray<T, D> {
        if self.start == 0 && self.end == self.buffer.count() {
            CowArray::from_buffer(self.buffer.clone())
        } else {
            CowArray::from_buffer(self.buffer.copied(self.start..self.end))
        }
    }

    /// Run `f` over the elements as one slice.
    pub fn with_contiguous<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        match self.buffer.request_native_buffer() {
            Some(native) => {
                self.buffer.type_check(self.start..self.end);
                f(&native.as_slice()[self.start..self.end])
            }
            None => f(&self.to_vec()),
        }
    }

    /// Run `f` over the elements as one mutable slice, copying the window
    /// first if the storage is shared or foreign.
    pub fn with_contiguous_mut<R>(&mut self, f: impl FnOnce(&mut [T]) -> R) -> R {
        self.make_unique();
        let window = self.start..self.end;
        let count = self.buffer.count();
        self.buffer
            .mutate(count, false, |storage| f(&mut storage.as_mut_slice()[window]))
    }
}

impl<T, D> From<CowArray<T, D>> for ArraySlice<T, D> {
    fn from(array: CowArray<T, D>) -> Self {
        let count = array.len();
        Self::from_parts(array.into_buffer(), 0..count)
    }
}

impl<'a, T: Clone, D: DeclaredType<T>> IntoIterator for &'a ArraySlice<T, D> {
    type Item = T;
    type IntoIter = Iter<'a, T, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone + PartialEq, D: DeclaredType<T>> PartialEq for ArraySlice<T, D> {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if self.storage_id() == other.storage_id() && self.start == other.start {
            return true;
        }
        self.iter().eq(other.iter())
    }
}

impl<T: Clone + fmt::Debug, D: DeclaredType<T>> fmt::Debug for ArraySlice<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
