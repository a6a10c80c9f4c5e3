//! Arrays of dynamically typed objects.
//!
//! [`ObjectArray<U>`] is an array of [`AnyObject`] elements declared to be
//! instances of `U`. It is what a deferred downcast produces:
//!
//! ```
//! use std::sync::Arc;
//! use cowarray_buffer::{CowArray, ObjectArray};
//! use cowarray_core::{element, AnyObject};
//!
//! struct Dog(&'static str);
//!
//! let objects: CowArray<AnyObject> =
//!     [element::erase(Arc::new(Dog("rex")))].into_iter().collect();
//! let dogs: ObjectArray<Dog> = objects.downcast_deferred();
//! assert_eq!(dogs.get_object(0).0, "rex");
//! ```

use std::any::{self, Any};
use std::sync::Arc;

use cowarray_core::element::{class_name_of, downcast_object, erase};
use cowarray_core::{violation, AnyObject, Class, ContractViolation};

use crate::array::CowArray;

/// An array of objects declared to be instances of `U`.
pub type ObjectArray<U> = CowArray<AnyObject, Class<U>>;

impl<U: Any + Send + Sync> CowArray<AnyObject, Class<U>> {
    /// An array of `objects`, already known to be instances of `U`.
    pub fn from_objects<I: IntoIterator<Item = Arc<U>>>(objects: I) -> Self {
        objects.into_iter().map(erase).collect()
    }

    /// The element at `index` as a typed handle.
    ///
    /// # Panics
    ///
    /// If `index` is out of bounds or the element is not a `U`.
    #[track_caller]
    pub fn get_object(&self, index: usize) -> Arc<U> {
        let object = self.get(index);
        match downcast_object::<U>(Arc::clone(&object)) {
            Some(typed) => typed,
            None => violation(ContractViolation::ElementTypeMismatch {
                foreign: false,
                expected: any::type_name::<U>(),
                found: class_name_of(&object),
            }),
        }
    }

    /// Overwrite the element at `index` with a typed handle.
    #[track_caller]
    pub fn set_object(&mut self, index: usize, object: Arc<U>) {
        self.set(index, erase(object));
    }

    /// Append a typed handle.
    pub fn push_object(&mut self, object: Arc<U>) {
        self.push(erase(object));
    }

    /// Iterate over the elements as typed handles.
    pub fn objects(&self) -> impl Iterator<Item = Arc<U>> + '_ {
        (0..self.len()).map(move |i| self.get_object(i))
    }
}
