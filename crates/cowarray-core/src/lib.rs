//! Core types and traits for the cowarray storage layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions shared by the rest of the workspace:
//! storage identities and representation tags, contract-violation
//! diagnostics, the exclusive-ownership oracle, the foreign array
//! capability, and the declared-element-type model used for deferred
//! type checking.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod element;
pub mod error;
pub mod id;
pub mod traits;

pub use element::{AnyObject, Class, DeclaredType, Exact, Object};
pub use error::{violation, ContractViolation};
pub use id::{Representation, StorageId};
pub use traits::{ForeignArray, OwnershipOracle};
