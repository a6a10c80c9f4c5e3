//! Test utilities and mock types for cowarray development.
//!
//! Provides a mock [`ForeignArray`] implementation ([`MockForeignArray`]),
//! sample element classes and sequences in [`fixtures`], and the
//! divide-and-conquer stress harness in [`scramble`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod scramble;

use std::sync::atomic::{AtomicUsize, Ordering};

use cowarray_core::ForeignArray;

/// Mock implementation of [`ForeignArray`].
///
/// Backed by a `Vec<T>`. Counts element reads so tests can tell whether
/// an operation went to the foreign array or stayed on a native copy.
/// Uses `AtomicUsize` for the counter so it satisfies `Sync`.
pub struct MockForeignArray<T> {
    elements: Vec<T>,
    unique: bool,
    reads: AtomicUsize,
}

impl<T> MockForeignArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self {
            elements,
            unique: false,
            reads: AtomicUsize::new(0),
        }
    }

    /// Report the array as exclusively owned through
    /// [`ForeignArray::is_uniquely_referenced`].
    pub fn claiming_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// How many elements have been read so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Reset the read counter.
    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
    }
}

impl<T: Clone + Send + Sync> ForeignArray<T> for MockForeignArray<T> {
    fn count(&self) -> usize {
        self.elements.len()
    }

    fn get(&self, index: usize) -> T {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.elements[index].clone()
    }

    fn is_uniquely_referenced(&self) -> bool {
        self.unique
    }

    fn type_label(&self) -> &'static str {
        "mock foreign array"
    }
}
