//! Storage identities and representation tags.

use std::fmt;

/// Identifies a storage block by the address of its allocation.
///
/// Stable for the lifetime of the block and used as the equality key for
/// "same storage". Reallocation always produces a block with a new
/// identity, so comparing two `StorageId`s taken before and after an
/// operation tells whether that operation copied.
///
/// An identity is only meaningful while some handle keeps the block alive:
/// once a block is released its address may be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(pub usize);

impl StorageId {
    /// The identity of the allocation `ptr` points into.
    pub fn of<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<()>().addr())
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<usize> for StorageId {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// Which kind of storage a variant storage reference currently denotes.
///
/// `NativeTypeChecked` is a strictly stronger guarantee than `Native` for
/// the same buffer: it may be downgraded freely, but upgrading requires
/// verifying every element against the declared element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Representation {
    /// A native buffer whose elements have not been verified against the
    /// declared element type.
    Native,
    /// A native buffer known to hold only instances of the declared
    /// element type.
    NativeTypeChecked,
    /// An opaque foreign array.
    Foreign,
}

impl Representation {
    /// Whether the storage is a native buffer (checked or not).
    pub fn is_native(self) -> bool {
        !matches!(self, Self::Foreign)
    }

    /// Whether the storage is a native buffer that needs no element checks.
    pub fn is_native_type_checked(self) -> bool {
        matches!(self, Self::NativeTypeChecked)
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::NativeTypeChecked => write!(f, "native (type-checked)"),
            Self::Foreign => write!(f, "foreign"),
        }
    }
}
