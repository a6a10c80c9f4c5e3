//! The array buffer facade.
//!
//! [`ArrayBuffer`] is what array and slice handles own. It dispatches every
//! read over the three storage cases, applies deferred element checks for
//! the handle's declared type `D`, and implements the mutation gate:
//!
//! 1. Ask [`request_mutable_backing_buffer`](ArrayBuffer::request_mutable_backing_buffer)
//!    for the native block. It is handed out only when the storage is
//!    native, uniquely referenced, and large enough.
//! 2. Otherwise allocate a new native block, copy (or, from a unique
//!    block, move) the visible elements into it, verifying them against
//!    `D` on the way, and rebind to it. The new block is labelled
//!    type-checked.
//! 3. Mutate the block that is now exclusively owned.
//!
//! No step ever writes to a block another handle can observe.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::Arc;

use cowarray_core::{
    violation, ContractViolation, DeclaredType, Exact, ForeignArray, Representation, StorageId,
};

use crate::config::GrowthPolicy;
use crate::metrics;
use crate::native::{NativeBuffer, NativeStorage};
use crate::storage::{ForeignRef, Storage};

/// Storage plus the declared element type of the handle that owns it.
pub struct ArrayBuffer<T, D = Exact> {
    storage: Storage<T>,
    declared: PhantomData<fn() -> D>,
}

impl<T, D> Clone for ArrayBuffer<T, D> {
    fn clone(&self) -> Self {
        Self::from_storage(self.storage.clone())
    }
}

impl<T: fmt::Debug, D> fmt::Debug for ArrayBuffer<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayBuffer")
            .field("storage", &self.storage)
            .finish()
    }
}

impl<T, D> Default for ArrayBuffer<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D> ArrayBuffer<T, D> {
    /// An empty buffer with no capacity.
    pub fn new() -> Self {
        Self::from_storage(Storage::empty(GrowthPolicy::default()))
    }

    /// An empty native buffer with room for `capacity` elements.
    pub fn with_policy(capacity: usize, policy: GrowthPolicy) -> Self {
        Self::from_storage(Storage::NativeTypeChecked(NativeBuffer::allocate(
            capacity, policy,
        )))
    }

    /// A buffer reading through to `array`. Elements are checked against
    /// `D` as they are read.
    pub fn from_foreign(array: Arc<dyn ForeignArray<T>>) -> Self {
        Self::from_storage(Storage::Foreign(ForeignRef::new(array)))
    }

    pub(crate) fn from_storage(storage: Storage<T>) -> Self {
        Self {
            storage,
            declared: PhantomData,
        }
    }

    /// The storage reference.
    pub fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    /// The current representation tag.
    pub fn representation(&self) -> Representation {
        self.storage.representation()
    }

    /// Whether the storage is a native buffer.
    pub fn is_native(&self) -> bool {
        self.representation().is_native()
    }

    /// Whether the storage is a native buffer with verified elements.
    pub fn is_native_type_checked(&self) -> bool {
        self.representation().is_native_type_checked()
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.storage.count()
    }

    /// Elements storable without reallocating. For foreign storage this is
    /// the count.
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Native(buffer) | Storage::NativeTypeChecked(buffer) => buffer.capacity(),
            Storage::Foreign(foreign) => foreign.count(),
        }
    }

    /// Growth policy used when this buffer has to be replaced.
    pub fn policy(&self) -> GrowthPolicy {
        self.storage
            .native()
            .map_or_else(GrowthPolicy::default, NativeBuffer::policy)
    }

    /// Identity of the underlying buffer or foreign array.
    pub fn storage_id(&self) -> StorageId {
        self.storage.storage_id()
    }

    /// Strong owners of the underlying buffer or foreign array.
    pub fn strong_count(&self) -> usize {
        self.storage.strong_count()
    }

    /// Whether this is the only handle to a native buffer.
    ///
    /// Foreign storage is read-only, so it never qualifies.
    pub fn is_uniquely_referenced(&self) -> bool {
        self.storage
            .native()
            .is_some_and(NativeBuffer::is_uniquely_referenced)
    }

    /// Whether the buffer may be mutated in place right now.
    pub fn is_mutable_and_uniquely_referenced(&self) -> bool {
        self.is_uniquely_referenced()
    }

    /// The native buffer, if the storage is native.
    pub fn request_native_buffer(&self) -> Option<&NativeBuffer<T>> {
        self.storage.native()
    }

    /// The native block for in-place mutation.
    ///
    /// Returns `None` when the storage is foreign, the block is shared with
    /// another handle, or it cannot hold `minimum_capacity` elements.
    pub fn request_mutable_backing_buffer(
        &mut self,
        minimum_capacity: usize,
    ) -> Option<&mut NativeStorage<T>> {
        let storage = self.storage.native_mut()?.storage_mut()?;
        if storage.capacity() >= minimum_capacity {
            Some(storage)
        } else {
            None
        }
    }

    /// Address of the first element, if the storage is contiguous.
    pub fn first_element_address_if_contiguous(&self) -> Option<*const T> {
        self.storage.native().map(NativeBuffer::first_element_address)
    }

    /// Check `index` against the count without trapping.
    pub fn check_index(&self, index: usize) -> Result<(), ContractViolation> {
        let count = self.count();
        if index < count {
            Ok(())
        } else {
            Err(ContractViolation::IndexOutOfBounds { index, count })
        }
    }

    /// Check that `range` is ordered and within the count without trapping.
    pub fn check_range(&self, range: &Range<usize>) -> Result<(), ContractViolation> {
        let count = self.count();
        if range.start <= range.end && range.end <= count {
            Ok(())
        } else {
            Err(ContractViolation::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                count,
            })
        }
    }

    /// Trap unless the representation is still `expected`.
    #[track_caller]
    pub fn check_representation(&self, expected: Representation) {
        let found = self.representation();
        if found != expected {
            violation(ContractViolation::ExclusivityViolated { expected, found });
        }
    }

    /// Re-verify the nativeness recorded at the start of an operation and,
    /// for native storage, bounds-check `index`.
    #[track_caller]
    pub fn check_inout_and_native_bounds(&self, index: usize, was_native: bool) {
        if self.is_native() != was_native {
            let expected = if was_native {
                Representation::Native
            } else {
                Representation::Foreign
            };
            violation(ContractViolation::ExclusivityViolated {
                expected,
                found: self.representation(),
            });
        }
        if let Some(buffer) = self.storage.native() {
            buffer.check_valid_subscript(index);
        }
    }

    /// Re-verify the type-checked flag recorded at the start of an
    /// operation and, when it was set, bounds-check `index`.
    #[track_caller]
    pub fn check_inout_and_native_type_checked_bounds(
        &self,
        index: usize,
        was_native_type_checked: bool,
    ) {
        if self.is_native_type_checked() != was_native_type_checked {
            let expected = if was_native_type_checked {
                Representation::NativeTypeChecked
            } else {
                Representation::Native
            };
            violation(ContractViolation::ExclusivityViolated {
                expected,
                found: self.representation(),
            });
        }
        if was_native_type_checked {
            if let Some(buffer) = self.storage.native() {
                buffer.check_valid_subscript(index);
            }
        }
    }

    /// Reinterpret as holding `D2`, checking nothing now.
    ///
    /// When `D2` can fail at runtime the storage loses its verified label,
    /// so each element is checked against `D2` when it is next read.
    pub fn downcast_deferred<D2: DeclaredType<T>>(self) -> ArrayBuffer<T, D2> {
        let mut storage = self.storage;
        if D2::NEEDS_CHECK {
            storage.downgrade();
        }
        ArrayBuffer::from_storage(storage)
    }

    /// Forget the declared type. Always succeeds.
    pub fn upcast(self) -> ArrayBuffer<T, Exact> {
        ArrayBuffer::from_storage(self.storage)
    }

    /// Rebind to a freshly built block whose elements are all verified.
    pub(crate) fn rebind(&mut self, storage: NativeStorage<T>) {
        self.storage = Storage::NativeTypeChecked(NativeBuffer::from_storage(storage));
    }

    fn record_copy(&self) {
        let reason = if !self.is_native() {
            Reason::Bridge
        } else if !self.is_uniquely_referenced() {
            Reason::Shared
        } else {
            Reason::Growth
        };
        metrics::record(|m| match reason {
            Reason::Bridge => m.foreign_bridges += 1,
            Reason::Shared => m.cow_copies += 1,
            Reason::Growth => m.growth_reallocations += 1,
        });
    }
}

#[derive(Clone, Copy)]
enum Reason {
    Bridge,
    Shared,
    Growth,
}

impl<T: Clone, D: DeclaredType<T>> ArrayBuffer<T, D> {
    /// Adopt a native buffer. Unless `D` is trivially satisfied the
    /// elements count as unverified.
    pub fn from_native(buffer: NativeBuffer<T>) -> Self {
        if D::NEEDS_CHECK {
            Self::from_storage(Storage::Native(buffer))
        } else {
            Self::from_storage(Storage::NativeTypeChecked(buffer))
        }
    }

    /// Build verified native storage from `elements`.
    ///
    /// Traps if an element does not match `D`.
    #[track_caller]
    pub fn from_vec(elements: Vec<T>, policy: GrowthPolicy) -> Self {
        for value in &elements {
            Self::check_incoming(value);
        }
        Self::from_storage(Storage::NativeTypeChecked(NativeBuffer::from_vec(
            elements, policy,
        )))
    }

    /// Whether reads must verify elements against `D`.
    pub fn needs_element_type_check(&self) -> bool {
        D::NEEDS_CHECK && !self.is_native_type_checked()
    }

    #[track_caller]
    fn verify(value: &T, foreign: bool) {
        metrics::record(|m| m.element_type_checks += 1);
        if !D::matches(value) {
            violation(ContractViolation::ElementTypeMismatch {
                foreign,
                expected: D::type_name(),
                found: D::found_type_name(value),
            });
        }
    }

    /// Trap if a value about to be stored does not match `D`.
    #[track_caller]
    pub fn check_incoming(value: &T) {
        if D::NEEDS_CHECK && !D::matches(value) {
            violation(ContractViolation::ElementTypeMismatch {
                foreign: false,
                expected: D::type_name(),
                found: D::found_type_name(value),
            });
        }
    }

    /// Read the element at `index`.
    ///
    /// `was_native_type_checked` is the flag the caller recorded when it
    /// started; when it is set and still true, the read is a plain indexed
    /// load. Anything else goes through the dispatching slow path.
    #[track_caller]
    pub fn get_element(&self, index: usize, was_native_type_checked: bool) -> T {
        match &self.storage {
            Storage::NativeTypeChecked(buffer) if was_native_type_checked => buffer.get(index),
            _ => self.get_element_slow_path(index),
        }
    }

    #[track_caller]
    fn get_element_slow_path(&self, index: usize) -> T {
        match &self.storage {
            Storage::NativeTypeChecked(buffer) => buffer.get(index),
            Storage::Native(buffer) => {
                let value = buffer.get(index);
                if D::NEEDS_CHECK {
                    Self::verify(&value, false);
                }
                value
            }
            Storage::Foreign(foreign) => {
                let count = foreign.count();
                if index >= count {
                    violation(ContractViolation::IndexOutOfBounds { index, count });
                }
                let value = foreign.get(index);
                if D::NEEDS_CHECK {
                    Self::verify(&value, true);
                }
                value
            }
        }
    }

    /// Bounds-checked, type-checked read.
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        self.get_element(index, self.is_native_type_checked())
    }

    /// Overwrite the element at `index`, copying first if the buffer is
    /// shared or foreign.
    #[track_caller]
    pub fn set_element(&mut self, index: usize, value: T) {
        Self::check_incoming(&value);
        expect_valid(self.check_index(index));
        let count = self.count();
        self.mutate(count, false, |storage| storage.set(index, value));
    }

    /// Verify the elements in `range` against `D`, if they need it.
    #[track_caller]
    pub fn type_check(&self, range: Range<usize>) {
        if !self.needs_element_type_check() {
            return;
        }
        match &self.storage {
            Storage::Native(buffer) => {
                for value in &buffer.as_slice()[range] {
                    Self::verify(value, false);
                }
            }
            Storage::Foreign(foreign) => {
                for index in range {
                    Self::verify(&foreign.get(index), true);
                }
            }
            Storage::NativeTypeChecked(_) => {}
        }
    }

    /// Verify every element and, for native storage, keep the verified
    /// label so later reads skip the check.
    #[track_caller]
    pub fn verify_element_types(&mut self) {
        self.type_check(0..self.count());
        self.storage.mark_type_checked();
    }

    /// Append the elements in `range`, verified against `D`, to `target`.
    /// Returns the past-the-end offset of `target`.
    #[track_caller]
    pub fn copy_contents(&self, range: Range<usize>, target: &mut Vec<T>) -> usize {
        expect_valid(self.check_range(&range));
        self.type_check(range.clone());
        match &self.storage {
            Storage::Native(buffer) | Storage::NativeTypeChecked(buffer) => {
                buffer.copy_into(range, target)
            }
            Storage::Foreign(foreign) => foreign.array().copy_range_into(range, target),
        }
    }

    /// Run `f` over the verified elements as one contiguous slice.
    ///
    /// Foreign storage is copied into a temporary first.
    pub fn with_contiguous<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let count = self.count();
        self.type_check(0..count);
        match &self.storage {
            Storage::Native(buffer) | Storage::NativeTypeChecked(buffer) => f(buffer.as_slice()),
            Storage::Foreign(foreign) => {
                let mut elements = Vec::with_capacity(count);
                foreign.array().copy_range_into(0..count, &mut elements);
                f(&elements)
            }
        }
    }

    /// Hand the contents out as a foreign array.
    ///
    /// O(1): native buffers are shared, not copied.
    pub fn as_foreign(&self) -> Arc<dyn ForeignArray<T>>
    where
        T: Send + Sync + 'static,
    {
        match &self.storage {
            Storage::Native(buffer) | Storage::NativeTypeChecked(buffer) => {
                Arc::new(buffer.clone())
            }
            Storage::Foreign(foreign) => Arc::clone(foreign.array()),
        }
    }

    /// Iterate over the elements in `range`.
    #[track_caller]
    pub fn iter_range(&self, range: Range<usize>) -> Iter<'_, T, D> {
        expect_valid(self.check_range(&range));
        Iter {
            buffer: self,
            range,
            was_native_type_checked: self.is_native_type_checked(),
        }
    }

    /// Run `f` on exclusively owned native storage holding at least
    /// `minimum_capacity` elements of room.
    ///
    /// Copies first when the buffer is shared, foreign, or too small; the
    /// copy keeps every element at its index. Growth of native storage goes
    /// through [`NativeBuffer::reallocate`].
    #[track_caller]
    pub fn mutate<R>(
        &mut self,
        minimum_capacity: usize,
        grow_for_append: bool,
        f: impl FnOnce(&mut NativeStorage<T>) -> R,
    ) -> R {
        if let Some(storage) = self.request_mutable_backing_buffer(minimum_capacity) {
            metrics::record(|m| m.in_place_mutations += 1);
            return f(storage);
        }
        if grow_for_append && self.is_native() {
            self.record_copy();
            self.verify_element_types();
            if let Some(buffer) = self.storage.native_mut() {
                return f(buffer.reallocate(minimum_capacity));
            }
        }
        let count = self.count();
        let mut fresh = self.copy_window(0..count, minimum_capacity, grow_for_append);
        let result = f(&mut fresh);
        self.rebind(fresh);
        result
    }

    /// Build a new block holding the elements of `window`, sized by the
    /// growth policy for at least `minimum_capacity` elements.
    ///
    /// Elements are moved out of a uniquely owned block and cloned
    /// otherwise. The caller rebinds to the result.
    #[track_caller]
    pub(crate) fn copy_window(
        &mut self,
        window: Range<usize>,
        minimum_capacity: usize,
        grow_for_append: bool,
    ) -> NativeStorage<T> {
        let policy = self.policy();
        let capacity = policy
            .capacity_for(self.capacity(), minimum_capacity, grow_for_append)
            .max(window.len());
        self.record_copy();
        let mut fresh = NativeStorage::allocate(capacity, policy);
        let needs_check = self.needs_element_type_check();
        if let Some(old) = self
            .storage
            .native_mut()
            .and_then(|buffer| buffer.storage_mut())
        {
            if needs_check {
                for value in &old.as_slice()[window.clone()] {
                    Self::verify(value, false);
                }
            }
            old.take_elements(window, &mut fresh.elements);
            return fresh;
        }
        self.copy_contents(window, &mut fresh.elements);
        fresh
    }

    /// A new, unshared buffer holding verified clones of `window`.
    #[track_caller]
    pub(crate) fn copied(&self, window: Range<usize>) -> Self {
        let mut fresh = NativeStorage::allocate(window.len(), self.policy());
        self.copy_contents(window, &mut fresh.elements);
        Self::from_storage(Storage::NativeTypeChecked(NativeBuffer::from_storage(
            fresh,
        )))
    }

    /// Rebind to a new block holding `window` with `range` replaced by
    /// `items`. The visible elements are copied; the replaced ones are not.
    #[track_caller]
    pub(crate) fn replace_out_of_place<I: IntoIterator<Item = T>>(
        &mut self,
        window: Range<usize>,
        range: Range<usize>,
        items: I,
        capacity: usize,
    ) {
        self.record_copy();
        let mut fresh = NativeStorage::allocate(capacity, self.policy());
        self.copy_contents(window.start..range.start, &mut fresh.elements);
        fresh.elements.extend(items);
        self.copy_contents(range.end..window.end, &mut fresh.elements);
        debug_assert!(fresh.count() <= fresh.capacity());
        self.rebind(fresh);
    }
}

/// Iterator over a range of an [`ArrayBuffer`], yielding clones.
///
/// The type-checked flag is recorded once, when iteration starts, and
/// re-verified on every step.
pub struct Iter<'a, T, D = Exact> {
    buffer: &'a ArrayBuffer<T, D>,
    range: Range<usize>,
    was_native_type_checked: bool,
}

impl<T: Clone, D: DeclaredType<T>> Iter<'_, T, D> {
    #[track_caller]
    fn read(&self, index: usize) -> T {
        self.buffer
            .check_inout_and_native_type_checked_bounds(index, self.was_native_type_checked);
        self.buffer.get_element(index, self.was_native_type_checked)
    }
}

impl<T: Clone, D: DeclaredType<T>> Iterator for Iter<'_, T, D> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let index = self.range.next()?;
        Some(self.read(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl<T: Clone, D: DeclaredType<T>> DoubleEndedIterator for Iter<'_, T, D> {
    fn next_back(&mut self) -> Option<T> {
        let index = self.range.next_back()?;
        Some(self.read(index))
    }
}

impl<T: Clone, D: DeclaredType<T>> ExactSizeIterator for Iter<'_, T, D> {}

/// Trap with `v` if `result` is an error.
#[track_caller]
pub(crate) fn expect_valid(result: Result<(), ContractViolation>) {
    if let Err(v) = result {
        violation(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{reset, snapshot};
    use cowarray_core::{element, AnyObject, Class};

    struct Dog;
    struct Cat;

    struct ObjectList(Vec<AnyObject>);

    impl ForeignArray<AnyObject> for ObjectList {
        fn count(&self) -> usize {
            self.0.len()
        }

        fn get(&self, index: usize) -> AnyObject {
            Arc::clone(&self.0[index])
        }
    }

    fn ints(values: &[i32]) -> ArrayBuffer<i32> {
        ArrayBuffer::from_vec(values.to_vec(), GrowthPolicy::default())
    }

    fn dogs(n: usize) -> Vec<AnyObject> {
        (0..n).map(|_| element::erase(Arc::new(Dog))).collect()
    }

    #[test]
    fn new_buffer_is_empty_and_checked() {
        let buf = ArrayBuffer::<u8>::new();
        assert_eq!(buf.count(), 0);
        assert_eq!(buf.capacity(), 0);
        assert_eq!(buf.representation(), Representation::NativeTypeChecked);
        assert!(buf.is_mutable_and_uniquely_referenced());
    }

    #[test]
    fn gate_hands_out_unique_storage_with_room() {
        let mut buf = ints(&[1, 2, 3]);
        assert!(buf.request_mutable_backing_buffer(3).is_some());
        assert!(buf.request_mutable_backing_buffer(4).is_none());
    }

    #[test]
    fn gate_refuses_shared_storage() {
        let mut buf = ints(&[1, 2, 3]);
        let other = buf.clone();
        assert!(buf.request_mutable_backing_buffer(0).is_none());
        assert!(!buf.is_uniquely_referenced());
        drop(other);
        assert!(buf.request_mutable_backing_buffer(0).is_some());
    }

    #[test]
    fn gate_refuses_foreign_storage() {
        let mut buf: ArrayBuffer<i32> =
            ArrayBuffer::from_foreign(Arc::new(ints(&[1]).request_native_buffer().unwrap().clone()));
        assert_eq!(buf.representation(), Representation::Foreign);
        assert!(buf.request_mutable_backing_buffer(0).is_none());
        assert!(buf.request_native_buffer().is_none());
    }

    #[test]
    fn set_on_shared_copies_and_leaves_alias_alone() {
        reset();
        let mut buf = ints(&[1, 2, 3]);
        let alias = buf.clone();
        buf.set_element(1, 20);
        assert_eq!(buf.get(1), 20);
        assert_eq!(alias.get(1), 2);
        assert_ne!(buf.storage_id(), alias.storage_id());
        assert_eq!(snapshot().cow_copies, 1);
        // The copy is exact: a plain write never grows the buffer.
        assert_eq!(buf.capacity(), 3);
    }

    #[test]
    fn set_on_unique_is_in_place() {
        reset();
        let mut buf = ints(&[1, 2, 3]);
        let id = buf.storage_id();
        buf.set_element(0, 7);
        assert_eq!(buf.storage_id(), id);
        let m = snapshot();
        assert_eq!(m.in_place_mutations, 1);
        assert_eq!(m.reallocations(), 0);
    }

    #[test]
    fn mutate_grows_unique_buffer_by_moving() {
        reset();
        let mut buf = ints(&[1, 2, 3, 4]);
        let before = buf.storage_id();
        buf.mutate(5, true, |s| s.push(5));
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.count(), 5);
        assert_ne!(buf.storage_id(), before);
        assert!(buf.is_uniquely_referenced());
        assert_eq!(snapshot().growth_reallocations, 1);
    }

    #[test]
    fn mutate_grows_shared_buffer_by_cloning() {
        let mut buf = ints(&[1, 2, 3]);
        let alias = buf.clone();
        reset();
        buf.mutate(4, true, |s| s.push(4));
        assert_eq!(buf.iter_range(0..4).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(alias.iter_range(0..3).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(buf.capacity(), 6);
        assert_ne!(buf.storage_id(), alias.storage_id());
        assert_eq!(snapshot().cow_copies, 1);
        assert_eq!(snapshot().growth_reallocations, 0);
    }

    #[test]
    fn growing_unverified_storage_checks_and_relabels() {
        let objects: ArrayBuffer<AnyObject> = ArrayBuffer::from_vec(dogs(2), GrowthPolicy::default());
        let mut typed: ArrayBuffer<AnyObject, Class<Dog>> = objects.downcast_deferred();
        reset();
        typed.mutate(3, true, |s| s.push(element::erase(Arc::new(Dog))));
        assert_eq!(typed.representation(), Representation::NativeTypeChecked);
        assert_eq!(snapshot().element_type_checks, 2);
        assert_eq!(typed.count(), 3);
    }

    #[test]
    fn foreign_reads_delegate_and_first_write_bridges() {
        reset();
        let foreign = Arc::new(ints(&[3, 4, 5]).request_native_buffer().unwrap().clone());
        let mut buf: ArrayBuffer<i32> = ArrayBuffer::from_foreign(foreign);
        assert_eq!(buf.get(2), 5);
        assert_eq!(buf.capacity(), 3);
        buf.set_element(0, 30);
        assert_eq!(buf.representation(), Representation::NativeTypeChecked);
        assert_eq!(snapshot().foreign_bridges, 1);
        let mut out = Vec::new();
        buf.copy_contents(0..3, &mut out);
        assert_eq!(out, vec![30, 4, 5]);
    }

    #[test]
    fn deferred_downcast_checks_nothing_until_read() {
        let objects: ArrayBuffer<AnyObject> = ArrayBuffer::from_vec(dogs(4), GrowthPolicy::default());
        reset();
        let typed: ArrayBuffer<AnyObject, Class<Dog>> = objects.downcast_deferred();
        assert_eq!(typed.representation(), Representation::Native);
        assert!(typed.needs_element_type_check());
        assert_eq!(snapshot().element_type_checks, 0);
        typed.get(1);
        assert_eq!(snapshot().element_type_checks, 1);
    }

    #[test]
    fn verify_element_types_relabels() {
        let objects: ArrayBuffer<AnyObject> = ArrayBuffer::from_vec(dogs(3), GrowthPolicy::default());
        let mut typed: ArrayBuffer<AnyObject, Class<Dog>> = objects.downcast_deferred();
        reset();
        typed.verify_element_types();
        assert_eq!(snapshot().element_type_checks, 3);
        assert!(typed.is_native_type_checked());
        typed.get(0);
        assert_eq!(snapshot().element_type_checks, 3);
    }

    #[test]
    #[should_panic(expected = "down-casted array element failed to match the target type")]
    fn mismatched_native_element_traps_on_read() {
        let mut mixed = dogs(2);
        mixed.push(element::erase(Arc::new(Cat)));
        let objects: ArrayBuffer<AnyObject> = ArrayBuffer::from_vec(mixed, GrowthPolicy::default());
        let typed: ArrayBuffer<AnyObject, Class<Dog>> = objects.downcast_deferred();
        typed.get(0);
        typed.get(2);
    }

    #[test]
    #[should_panic(expected = "foreign array element failed to match the declared element type")]
    fn mismatched_foreign_element_traps_on_read() {
        let list = ObjectList(vec![element::erase(Arc::new(Cat))]);
        let typed: ArrayBuffer<AnyObject, Class<Dog>> = ArrayBuffer::from_foreign(Arc::new(list));
        typed.get(0);
    }

    #[test]
    #[should_panic(expected = "inout rules were violated")]
    fn representation_change_is_detected() {
        let buf = ints(&[1, 2]);
        buf.check_inout_and_native_type_checked_bounds(0, false);
    }

    #[test]
    #[should_panic(expected = "inout rules were violated")]
    fn lost_type_checked_label_is_detected() {
        let typed: ArrayBuffer<AnyObject, Class<Dog>> =
            ArrayBuffer::<AnyObject>::from_vec(dogs(2), GrowthPolicy::default()).downcast_deferred();
        typed.check_inout_and_native_type_checked_bounds(0, true);
    }

    #[test]
    #[should_panic(expected = "inout rules were violated")]
    fn native_storage_recorded_as_foreign_is_detected() {
        ints(&[1, 2]).check_inout_and_native_bounds(0, false);
    }

    #[test]
    #[should_panic(expected = "inout rules were violated")]
    fn foreign_storage_recorded_as_native_is_detected() {
        let buf: ArrayBuffer<i32> = ArrayBuffer::from_foreign(ints(&[1, 2]).as_foreign());
        buf.check_inout_and_native_bounds(0, true);
    }

    #[test]
    #[should_panic(expected = "index out of bounds: the index is 2 but the count is 2")]
    fn native_bounds_are_checked_after_the_flag() {
        ints(&[1, 2]).check_inout_and_native_bounds(2, true);
    }

    #[test]
    fn matching_flags_pass() {
        let buf = ints(&[1, 2]);
        buf.check_inout_and_native_bounds(1, true);
        buf.check_inout_and_native_type_checked_bounds(1, true);
        let foreign: ArrayBuffer<i32> = ArrayBuffer::from_foreign(buf.as_foreign());
        foreign.check_inout_and_native_bounds(7, false);
        foreign.check_inout_and_native_type_checked_bounds(7, false);
    }

    #[test]
    fn iteration_records_the_flag_once() {
        let objects: ArrayBuffer<AnyObject> = ArrayBuffer::from_vec(dogs(3), GrowthPolicy::default());
        let typed: ArrayBuffer<AnyObject, Class<Dog>> = objects.downcast_deferred();
        let iter = typed.iter_range(0..3);
        assert!(!iter.was_native_type_checked);
        reset();
        assert_eq!(iter.count(), 3);
        assert_eq!(snapshot().element_type_checks, 3);

        let checked = ints(&[1, 2, 3]);
        assert!(checked.iter_range(0..3).was_native_type_checked);
    }

    #[test]
    #[should_panic(expected = "index out of bounds: the index is 5 but the count is 2")]
    fn out_of_bounds_read_traps() {
        ints(&[1, 2]).get(5);
    }

    #[test]
    fn check_probes_do_not_trap() {
        let buf = ints(&[1, 2]);
        assert!(buf.check_index(1).is_ok());
        assert_eq!(
            buf.check_index(2),
            Err(ContractViolation::IndexOutOfBounds { index: 2, count: 2 })
        );
        assert!(buf.check_range(&(0..2)).is_ok());
        assert!(buf.check_range(&(1..3)).is_err());
    }

    #[test]
    fn as_foreign_shares_native_storage() {
        let buf = ints(&[1, 2, 3]);
        let foreign = buf.as_foreign();
        assert_eq!(foreign.count(), 3);
        assert_eq!(buf.strong_count(), 2);
        let wrapped: ArrayBuffer<i32> = ArrayBuffer::from_foreign(foreign);
        assert_eq!(wrapped.get(2), 3);
    }

    #[test]
    fn with_contiguous_sees_all_elements() {
        let buf = ints(&[4, 5, 6]);
        assert_eq!(buf.with_contiguous(|s| s.iter().sum::<i32>()), 15);
        let foreign: ArrayBuffer<i32> = ArrayBuffer::from_foreign(buf.as_foreign());
        assert_eq!(foreign.with_contiguous(<[i32]>::to_vec), vec![4, 5, 6]);
        assert!(foreign.first_element_address_if_contiguous().is_none());
    }

    #[test]
    fn iter_range_yields_in_both_directions() {
        let buf = ints(&[1, 2, 3, 4]);
        assert_eq!(buf.iter_range(1..3).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(buf.iter_range(0..4).rev().collect::<Vec<_>>(), vec![4, 3, 2, 1]);
        assert_eq!(buf.iter_range(0..4).len(), 4);
    }

    #[test]
    fn replace_out_of_place_skips_replaced_elements() {
        reset();
        let mut buf = ints(&[0, 1, 2, 3, 4]);
        let alias = buf.clone();
        buf.replace_out_of_place(0..5, 1..4, [9], 3);
        assert_eq!(buf.iter_range(0..3).collect::<Vec<_>>(), vec![0, 9, 4]);
        assert_eq!(alias.count(), 5);
        assert_eq!(snapshot().cow_copies, 1);
    }
}
