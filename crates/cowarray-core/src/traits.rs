//! Capability traits consumed by the storage layer.

use std::ops::Range;

use crate::id::StorageId;

/// Answers "how many strong owners does this storage have right now?".
///
/// The storage layer only ever asks this question; it never manages the
/// count itself. Answers are snapshots: they are not linearizable against
/// clones or drops happening concurrently on other threads without
/// external synchronization.
pub trait OwnershipOracle {
    /// Identity of the storage being asked about.
    fn storage_id(&self) -> StorageId;

    /// Number of strong owners, including the caller.
    fn strong_count(&self) -> usize;

    /// Whether the caller is the only strong owner.
    fn is_uniquely_referenced(&self) -> bool {
        self.strong_count() == 1
    }

    /// Whether exactly `owners` strong owners exist.
    ///
    /// Diagnostic generalization of [`is_uniquely_referenced`]; the
    /// copy-on-write gate only relies on the unique form.
    ///
    /// [`is_uniquely_referenced`]: OwnershipOracle::is_uniquely_referenced
    fn is_referenced_exactly(&self, owners: usize) -> bool {
        self.strong_count() == owners
    }
}

/// An opaque, read-only, indexable array owned outside this crate.
///
/// Arrays may be backed by a foreign array instead of a native buffer.
/// Reads are delegated to it; the first mutation bridges the contents
/// into a native buffer.
pub trait ForeignArray<T>: Send + Sync {
    /// Number of elements.
    fn count(&self) -> usize;

    /// The element at `index`.
    ///
    /// Callers bounds-check against [`count`](ForeignArray::count) first.
    fn get(&self, index: usize) -> T;

    /// Append the elements in `range` to `target`, returning the
    /// past-the-end offset of `target`.
    fn copy_range_into(&self, range: Range<usize>, target: &mut Vec<T>) -> usize {
        target.reserve(range.len());
        for i in range {
            target.push(self.get(i));
        }
        target.len()
    }

    /// The foreign representation's own notion of exclusive ownership.
    ///
    /// Conservatively `false` when the representation has none.
    fn is_uniquely_referenced(&self) -> bool {
        false
    }

    /// Short label for diagnostics.
    fn type_label(&self) -> &'static str {
        "foreign array"
    }
}
