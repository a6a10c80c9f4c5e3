//! cowarray: copy-on-write, reference-counted dynamic arrays.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the cowarray sub-crates. For most users, adding `cowarray` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cowarray::prelude::*;
//!
//! let mut a: CowArray<i32> = (0..5).collect();
//! let b = a.clone();
//! assert_eq!(a.storage_id(), b.storage_id());
//!
//! // The first write to a shared buffer copies it.
//! a.set(0, 42);
//! assert_ne!(a.storage_id(), b.storage_id());
//! assert_eq!(b.get(0), 0);
//!
//! // Edits through a borrowed window land in the parent.
//! a.slice_mut(1..2).push(7);
//! assert_eq!(a.to_vec(), vec![42, 1, 7, 2, 3, 4]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cowarray-core` | Storage ids, violations, ownership and foreign-array traits, declared element types |
//! | [`buffer`] | `cowarray-buffer` | Native buffers, variant storage, the facade, arrays and slices, metrics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`cowarray-core`).
///
/// Contains [`types::StorageId`], [`types::Representation`], the
/// [`types::ContractViolation`] diagnostics and the fundamental traits
/// ([`types::OwnershipOracle`], [`types::ForeignArray`],
/// [`types::DeclaredType`]).
pub use cowarray_core as types;

/// Copy-on-write storage and handles (`cowarray-buffer`).
///
/// [`buffer::CowArray`] and [`buffer::ArraySlice`] are the value types;
/// [`buffer::ArrayBuffer`] is the facade they share, and
/// [`buffer::metrics`] counts storage events per thread.
pub use cowarray_buffer as buffer;

/// Common imports for typical cowarray usage.
///
/// ```rust
/// use cowarray::prelude::*;
/// ```
pub mod prelude {
    // Handles
    pub use cowarray_buffer::{ArraySlice, CowArray, ObjectArray, SliceMut};

    // Storage
    pub use cowarray_buffer::{ArrayBuffer, CowMetrics, GrowthPolicy};

    // Core types and traits
    pub use cowarray_core::{
        AnyObject, Class, DeclaredType, Exact, ForeignArray, OwnershipOracle, Representation,
        StorageId,
    };

    // Errors
    pub use cowarray_core::ContractViolation;
}
