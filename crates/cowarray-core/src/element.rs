//! Declared element types and the dynamically typed object model.
//!
//! Every array handle carries a type-level declaration `D` of what its
//! elements are. For ordinary element types the declaration is [`Exact`]:
//! the Rust type system already guarantees every element is a `T`, so no
//! runtime check is ever needed.
//!
//! Arrays of [`AnyObject`] can additionally be *reinterpreted* as holding a
//! narrower class `U` ([`Class<U>`]) without touching the elements. The
//! reinterpretation is O(1); each element is verified against `U` only
//! when it is actually read (a deferred type check).

use std::any::{self, Any};
use std::marker::PhantomData;
use std::sync::Arc;

/// A shareable value whose concrete type is only known at runtime.
///
/// Implemented for every `Any + Send + Sync` type; used through
/// [`AnyObject`].
pub trait Object: Any + Send + Sync {
    /// Name of the concrete runtime type, for diagnostics.
    fn class_name(&self) -> &'static str;

    /// View as `Any` for type tests.
    fn as_any(&self) -> &(dyn Any + Send + Sync);

    /// Convert into an `Any` handle for downcasting.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> Object for T {
    fn class_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A type-erased, reference-counted object element.
pub type AnyObject = Arc<dyn Object>;

/// Erase a typed object handle.
pub fn erase<U: Any + Send + Sync>(object: Arc<U>) -> AnyObject {
    object
}

/// Runtime type name of the object behind `object`.
pub fn class_name_of(object: &AnyObject) -> &'static str {
    // Deref explicitly: `Arc<dyn Object>` is itself an `Object`.
    let inner: &dyn Object = &**object;
    inner.class_name()
}

/// Whether `object` is an instance of `U`.
pub fn is_instance<U: Any>(object: &AnyObject) -> bool {
    let inner: &dyn Object = &**object;
    inner.as_any().is::<U>()
}

/// Recover the typed handle, or `None` if `object` is not a `U`.
pub fn downcast_object<U: Any + Send + Sync>(object: AnyObject) -> Option<Arc<U>> {
    if !is_instance::<U>(&object) {
        return None;
    }
    <dyn Object as Object>::into_any(object).downcast::<U>().ok()
}

/// A type-level declaration of what an array's elements are.
///
/// The storage layer consults it whenever an element is read from storage
/// that has not been verified yet.
pub trait DeclaredType<T> {
    /// Whether stored values can fail to match the declaration at runtime.
    const NEEDS_CHECK: bool;

    /// Name of the declared type, for diagnostics.
    fn type_name() -> &'static str;

    /// Whether `value` is an instance of the declared type.
    fn matches(value: &T) -> bool;

    /// Name of `value`'s actual runtime type, for diagnostics.
    fn found_type_name(value: &T) -> &'static str;
}

/// The declaration "every element is exactly a `T`". Never checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Exact;

impl<T> DeclaredType<T> for Exact {
    const NEEDS_CHECK: bool = false;

    fn type_name() -> &'static str {
        any::type_name::<T>()
    }

    fn matches(_value: &T) -> bool {
        true
    }

    fn found_type_name(_value: &T) -> &'static str {
        any::type_name::<T>()
    }
}

/// The declaration "every [`AnyObject`] element is an instance of `U`".
pub struct Class<U: ?Sized>(PhantomData<fn() -> U>);

impl<U: Any + Send + Sync> DeclaredType<AnyObject> for Class<U> {
    const NEEDS_CHECK: bool = true;

    fn type_name() -> &'static str {
        any::type_name::<U>()
    }

    fn matches(value: &AnyObject) -> bool {
        is_instance::<U>(value)
    }

    fn found_type_name(value: &AnyObject) -> &'static str {
        class_name_of(value)
    }
}
