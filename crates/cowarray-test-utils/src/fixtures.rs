//! Reusable element types and sequences.
//!
//! - [`Dog`] and [`Cat`] — two unrelated object classes for exercising
//!   deferred element checks.
//! - [`sequence`] / [`foreign_sequence`] — `0..n` as a native array or as
//!   a mock foreign array.

use std::sync::Arc;

use cowarray_buffer::CowArray;
use cowarray_core::element::erase;
use cowarray_core::AnyObject;

use crate::MockForeignArray;

/// An object class used as the declared element type in tests.
#[derive(Debug, PartialEq, Eq)]
pub struct Dog {
    pub id: usize,
}

/// A class that never matches [`Dog`].
#[derive(Debug, PartialEq, Eq)]
pub struct Cat {
    pub id: usize,
}

/// The integers `0..n` in a native array.
pub fn sequence(n: i64) -> CowArray<i64> {
    (0..n).collect()
}

/// The integers `0..n` in a mock foreign array.
pub fn foreign_sequence(n: i64) -> Arc<MockForeignArray<i64>> {
    Arc::new(MockForeignArray::new((0..n).collect()))
}

/// `n` erased dogs with ids `0..n`.
pub fn dogs(n: usize) -> Vec<AnyObject> {
    (0..n).map(|id| erase(Arc::new(Dog { id }))).collect()
}

/// `n` erased animals: dogs at even indices, cats at odd ones.
pub fn mixed_animals(n: usize) -> Vec<AnyObject> {
    (0..n)
        .map(|id| {
            if id % 2 == 0 {
                erase(Arc::new(Dog { id }))
            } else {
                erase(Arc::new(Cat { id }))
            }
        })
        .collect()
}

/// An object array of `n` dogs, not yet declared as such.
pub fn dog_array(n: usize) -> CowArray<AnyObject> {
    dogs(n).into()
}
