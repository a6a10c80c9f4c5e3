//! Copy-on-write storage for cowarray.
//!
//! Provides reference-counted native buffers, the variant storage
//! reference, and the array and slice handles built on them. Handles have
//! value semantics: clones share storage, and a handle only writes in place
//! when it can prove it is the sole owner of its buffer.
//!
//! # Architecture
//!
//! ```text
//! CowArray<T, D> / ArraySlice<T, D> / SliceMut<'_, T, D>   (handles)
//! └── ArrayBuffer<T, D>          (facade: dispatch, checks, mutation gate)
//!     └── Storage<T>
//!         ├── Native / NativeTypeChecked
//!         │   └── NativeBuffer<T> = Arc<NativeStorage<T>>
//!         │       └── header (capacity, GrowthPolicy) + Vec<T>
//!         └── Foreign
//!             └── Arc<dyn ForeignArray<T>>
//! ```
//!
//! # Mutation gate
//!
//! Every write first asks the facade for exclusive native storage with
//! enough room. The facade hands it out only when `Arc` reports a single
//! strong owner. Otherwise the visible elements are copied (or moved, from
//! a uniquely owned buffer that is merely too small) into a new block,
//! the handle is rebound, and the write proceeds there.
//!
//! # Deferred element checks
//!
//! The declared element type `D` may be narrower than what the storage is
//! known to hold (see [`ObjectArray`]). Such storage is tagged `Native`
//! rather than `NativeTypeChecked`, and elements are verified one at a time
//! as they are read, or all together when the array is copied.
//!
//! All code is safe Rust; counters for every storage event live in
//! [`metrics`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod config;
pub mod facade;
pub mod metrics;
pub mod native;
pub mod object;
pub mod slice;
pub mod slice_mut;
pub mod storage;

// Public re-exports for the primary API surface.
pub use array::CowArray;
pub use config::GrowthPolicy;
pub use facade::{ArrayBuffer, Iter};
pub use metrics::CowMetrics;
pub use native::{NativeBuffer, NativeStorage};
pub use object::ObjectArray;
pub use slice::ArraySlice;
pub use slice_mut::SliceMut;
pub use storage::{ForeignRef, Storage};
