//! Query parameter and result value types shared by every index node.
//!
//! A [`QueryState`] is an immutable handle: builders never mutate in place,
//! they return a new handle, or the very same handle when the requested change
//! would not alter anything. Consumers rely on [`QueryState::ptr_eq`] rather
//! than deep equality to detect changes.

/// Left-to-right merging of several states into one query.
pub mod merge;
/// Search parameters and the shared `QueryState` handle.
pub mod parameters;
/// Partial parameter sets applied on top of a state.
pub mod plain;
/// Requests sent to the transport and the results it returns.
pub mod results;

pub use merge::merge_search_parameters;
pub use parameters::{QueryState, SearchParameters};
pub use plain::PlainParameters;
pub use results::{FacetHit, FacetValuesResponse, SearchRequest, SearchResults};
