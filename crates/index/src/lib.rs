//! Index node tree for coordinated multi-index search.
//!
//! An [`IndexTree`] holds index nodes in an arena. Each node owns a list of
//! child widgets (leaf [`Widget`]s or nested index nodes), derives its own
//! [`QueryState`] from them, takes part in one shared multi-query round-trip
//! through a [`SearchExecutor`] slot, and keeps an [`IndexUiState`] fragment in
//! sync with its live query state.
//!
//! [`SearchRuntime`] is the hosting runtime: it owns the tree and the
//! [`SearchClient`], coalesces scheduled searches and renders, and awaits
//! round-trips.

/// Transport abstraction consumed by the runtime.
pub mod client;
/// Error types.
pub mod error;
/// Shared multi-query executor and derivation slots.
pub mod executor;
/// Generational identifiers for nodes and slots.
pub mod ids;
/// Index node data and construction options.
pub mod node;
/// Pure widget-list folds into UI state and query state.
pub mod reconcile;
/// Copy-on-write render state shared by the whole tree.
pub mod render_state;
/// Hosting runtime.
pub mod runtime;
/// Coalescing scheduler for searches, renders and notifications.
pub mod scheduler;
/// Cross-index result flattening.
pub mod scoped;
/// Query state store with change notifications.
pub mod store;
/// Widget usage telemetry and its header encoding.
pub mod telemetry;
/// Index node tree and lifecycle.
pub mod tree;
/// UI state types and query-string codec.
pub mod ui_state;
/// Widget capability model and call contexts.
pub mod widget;

pub use client::{FacetValuesRequest, SearchClient};
pub use error::{ClientError, ConfigurationError, IndexError, Result};
pub use executor::{Completion, Delivery, PreparedSearch, RequestHeaders, RoundTripId, SearchExecutor};
pub use ids::{NodeId, SlotId, SubscriptionId};
pub use node::{IndexNode, IndexOptions, Lifecycle, NodeArena};
pub use prism_params::{
	FacetHit, FacetValuesResponse, PlainParameters, QueryState, SearchParameters, SearchRequest,
	SearchResults,
};
pub use render_state::{IndexRenderState, RenderState, RenderStateStore};
pub use runtime::{RuntimeOptions, SearchRuntime};
pub use scheduler::{ScheduledWork, Scheduler};
pub use scoped::{ScopedResult, resolve_scoped_results};
pub use store::{ChangeEvent, ChangePhase, QueryStateStore, SetStateOptions};
pub use telemetry::{PackedTelemetryEncoder, TELEMETRY_HEADER, TelemetryEncoder, TelemetryPayload, WidgetUsage};
pub use tree::IndexTree;
pub use ui_state::{IndexUiState, UiState};
pub use widget::{
	DisposeContext, InitContext, RenderContext, RenderStateContext, SearchMetadata, SearchParametersContext,
	UiStateContext, Widget, WidgetCapabilities, WidgetRef,
};
