//! Mutable sub-range views.
//!
//! A [`SliceMut`] borrows an array's (or slice's) buffer exclusively and
//! edits a window of it in place. It is the building block for
//! divide-and-conquer algorithms: split a view into halves with
//! [`SliceMut::slice_mut`], recurse, and every write lands directly in the
//! owner's storage with no per-level copy.
//!
//! The borrow guarantees the owner cannot observe the storage while the
//! view lives. The buffer itself may still be shared with *other* handles
//! (for example an [`ArraySlice`] produced by [`SliceMut::to_slice`]); in
//! that case the first write copies the whole buffer, keeping every index
//! where it was, and rebinds the owner to the copy.

use std::iter;
use std::ops::Range;

use cowarray_core::{ContractViolation, DeclaredType, Exact, Representation, StorageId};
use smallvec::SmallVec;

use crate::array::checked_count;
use crate::facade::{expect_valid, ArrayBuffer, Iter};
use crate::slice::ArraySlice;

/// An exclusive, in-place view of `[start, end)` of a buffer.
///
/// Length changes shift the rest of the buffer and are reported to the
/// enclosing view or slice when this view is dropped.
pub struct SliceMut<'a, T, D = Exact> {
    buffer: &'a mut ArrayBuffer<T, D>,
    start: usize,
    end: usize,
    parent_end: Option<&'a mut usize>,
    count_at_borrow: usize,
}

impl<'a, T, D> SliceMut<'a, T, D> {
    pub(crate) fn new(
        buffer: &'a mut ArrayBuffer<T, D>,
        range: Range<usize>,
        parent_end: Option<&'a mut usize>,
    ) -> Self {
        let count_at_borrow = buffer.count();
        Self {
            buffer,
            start: range.start,
            end: range.end,
            parent_end,
            count_at_borrow,
        }
    }

    /// First buffer index covered by the view.
    pub fn start_index(&self) -> usize {
        self.start
    }

    /// Buffer index one past the view's last element.
    pub fn end_index(&self) -> usize {
        self.end
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Identity of the storage currently being edited.
    pub fn storage_id(&self) -> StorageId {
        self.buffer.storage_id()
    }

    /// Representation of the storage currently being edited.
    pub fn representation(&self) -> Representation {
        self.buffer.representation()
    }

    /// Whether writes will land in place.
    pub fn is_uniquely_referenced(&self) -> bool {
        self.buffer.is_uniquely_referenced()
    }

    /// Address of the view's first element, for native storage.
    pub fn first_element_address(&self) -> Option<*const T> {
        self.buffer
            .first_element_address_if_contiguous()
            .map(|base| base.wrapping_add(self.start))
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
}

impl<T: Clone, D: DeclaredType<T>> SliceMut<'_, T, D> {
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

    /// Overwrite the element at `index`.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: T) {
        ArrayBuffer::<T, D>::check_incoming(&value);
        expect_valid(self.check_index(index));
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
        let (a, b) = (self.start + a, self.start + b);
        let count = self.buffer.count();
        self.buffer.mutate(count, false, |storage| storage.swap(a, b));
    }

    /// Replace the elements in `range` with `items`, shifting everything
    /// after the view.
    #[track_caller]
    pub fn replace_subrange<I: IntoIterator<Item = T>>(&mut self, range: Range<usize>, items: I) {
        expect_valid(self.check_range(&range));
        let items: SmallVec<[T; 4]> = items.into_iter().collect();
        for value in &items {
            ArrayBuffer::<T, D>::check_incoming(value);
        }
        let new_len = checked_count(self.len() - range.len(), items.len());
        let required = checked_count(self.buffer.count() - range.len(), items.len());
        let absolute = self.start + range.start..self.start + range.end;
        self.buffer.mutate(required, true, |storage| {
            storage.replace_subrange(absolute, items)
        });
        self.end = self.start + new_len;
    }

    /// Append an element at the end of the view.
    #[track_caller]
    pub fn push(&mut self, value: T) {
        let len = self.len();
        self.replace_subrange(len..len, iter::once(value));
    }

    /// Append every element of `items` at the end of the view.
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

    /// Remove and return the last element of the view.
    pub fn pop(&mut self) -> Option<T> {
        let last = self.len().checked_sub(1)?;
        Some(self.remove(last))
    }

    /// A narrower view of `range`, relative to this one.
    #[track_caller]
    pub fn slice_mut(&mut self, range: Range<usize>) -> SliceMut<'_, T, D> {
        expect_valid(self.check_range(&range));
        let absolute = self.start + range.start..self.start + range.end;
        SliceMut::new(&mut *self.buffer, absolute, Some(&mut self.end))
    }

    /// An owned slice of the view's current contents.
    ///
    /// The slice is a second owner of the buffer, so the next write through
    /// this view copies.
    pub fn to_slice(&self) -> ArraySlice<T, D> {
        let window = self.start..self.end;
        self.buffer.type_check(window.clone());
        ArraySlice::from_parts(self.buffer.clone(), window)
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

    /// Run `f` over the view as one mutable slice.
    pub fn with_contiguous_mut<R>(&mut self, f: impl FnOnce(&mut [T]) -> R) -> R {
        let window = self.start..self.end;
        let count = self.buffer.count();
        self.buffer
            .mutate(count, false, |storage| f(&mut storage.as_mut_slice()[window]))
    }
}

impl<T, D> Drop for SliceMut<'_, T, D> {
    fn drop(&mut self) {
        if let Some(parent_end) = self.parent_end.take() {
            *parent_end = *parent_end + self.buffer.count() - self.count_at_borrow;
        }
    }
}
