//! The variant storage reference.
//!
//! An array's storage is exactly one of three cases:
//!
//! ```text
//! Storage<T>
//! ├── Native(NativeBuffer<T>)             elements not yet verified against
//! │                                       the handle's declared type
//! ├── NativeTypeChecked(NativeBuffer<T>)  every element verified
//! └── Foreign(ForeignRef<T>)              read-only, owned elsewhere
//! ```
//!
//! The enum holds a strong reference in every case, so cloning a
//! `Storage` shares the underlying buffer or foreign array.

use std::sync::Arc;

use cowarray_core::{ForeignArray, OwnershipOracle, Representation, StorageId};

use crate::config::GrowthPolicy;
use crate::native::NativeBuffer;

/// A strong reference to a foreign array.
pub struct ForeignRef<T> {
    array: Arc<dyn ForeignArray<T>>,
}

impl<T> Clone for ForeignRef<T> {
    fn clone(&self) -> Self {
        Self {
            array: Arc::clone(&self.array),
        }
    }
}

impl<T> std::fmt::Debug for ForeignRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignRef")
            .field("label", &self.array.type_label())
            .field("count", &self.array.count())
            .finish()
    }
}

impl<T> ForeignRef<T> {
    /// Wrap a foreign array.
    pub fn new(array: Arc<dyn ForeignArray<T>>) -> Self {
        Self { array }
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.array.count()
    }

    /// The element at `index`, unchecked against the count.
    pub fn get(&self, index: usize) -> T {
        self.array.get(index)
    }

    /// The wrapped array.
    pub fn array(&self) -> &Arc<dyn ForeignArray<T>> {
        &self.array
    }
}

impl<T> OwnershipOracle for ForeignRef<T> {
    fn storage_id(&self) -> StorageId {
        StorageId::of(Arc::as_ptr(&self.array))
    }

    fn strong_count(&self) -> usize {
        Arc::strong_count(&self.array)
    }

    fn is_uniquely_referenced(&self) -> bool {
        self.strong_count() == 1 && self.array.is_uniquely_referenced()
    }
}

/// Which storage an array currently uses.
#[derive(Debug)]
pub enum Storage<T> {
    /// A native buffer whose elements have not been verified.
    Native(NativeBuffer<T>),
    /// A native buffer whose elements all match the declared type.
    NativeTypeChecked(NativeBuffer<T>),
    /// A foreign array.
    Foreign(ForeignRef<T>),
}

impl<T> Clone for Storage<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Native(buffer) => Self::Native(buffer.clone()),
            Self::NativeTypeChecked(buffer) => Self::NativeTypeChecked(buffer.clone()),
            Self::Foreign(foreign) => Self::Foreign(foreign.clone()),
        }
    }
}

impl<T> Storage<T> {
    /// Empty native storage with no capacity.
    pub fn empty(policy: GrowthPolicy) -> Self {
        Self::NativeTypeChecked(NativeBuffer::allocate(0, policy))
    }

    /// The representation tag.
    pub fn representation(&self) -> Representation {
        match self {
            Self::Native(_) => Representation::Native,
            Self::NativeTypeChecked(_) => Representation::NativeTypeChecked,
            Self::Foreign(_) => Representation::Foreign,
        }
    }

    /// The native buffer, checked or not.
    pub fn native(&self) -> Option<&NativeBuffer<T>> {
        match self {
            Self::Native(buffer) | Self::NativeTypeChecked(buffer) => Some(buffer),
            Self::Foreign(_) => None,
        }
    }

    /// The native buffer, mutably.
    pub fn native_mut(&mut self) -> Option<&mut NativeBuffer<T>> {
        match self {
            Self::Native(buffer) | Self::NativeTypeChecked(buffer) => Some(buffer),
            Self::Foreign(_) => None,
        }
    }

    /// The foreign array, if any.
    pub fn foreign(&self) -> Option<&ForeignRef<T>> {
        match self {
            Self::Foreign(foreign) => Some(foreign),
            _ => None,
        }
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        match self {
            Self::Native(buffer) | Self::NativeTypeChecked(buffer) => buffer.count(),
            Self::Foreign(foreign) => foreign.count(),
        }
    }

    /// Identity of the buffer or foreign array.
    pub fn storage_id(&self) -> StorageId {
        match self {
            Self::Native(buffer) | Self::NativeTypeChecked(buffer) => buffer.storage_id(),
            Self::Foreign(foreign) => foreign.storage_id(),
        }
    }

    /// Strong owners of the buffer or foreign array.
    pub fn strong_count(&self) -> usize {
        match self {
            Self::Native(buffer) | Self::NativeTypeChecked(buffer) => buffer.strong_count(),
            Self::Foreign(foreign) => foreign.strong_count(),
        }
    }

    /// Drop the verified label. Foreign storage is unaffected.
    pub fn downgrade(&mut self) {
        if let Self::NativeTypeChecked(buffer) = self {
            let buffer = buffer.clone();
            *self = Self::Native(buffer);
        }
    }

    /// Label native storage as verified. Callers must have checked every
    /// element against the declared type.
    pub(crate) fn mark_type_checked(&mut self) {
        if let Self::Native(buffer) = self {
            let buffer = buffer.clone();
            *self = Self::NativeTypeChecked(buffer);
        }
    }
}
