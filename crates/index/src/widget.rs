//! Widget capability model.
//!
//! Widgets are heterogeneous: each one declares which optional methods it
//! implements through [`WidgetCapabilities`], and the tree only calls methods
//! whose capability is present. Index nodes are children too, tagged as
//! [`WidgetRef::Index`].

use std::fmt;
use std::rc::Rc;

use prism_params::{QueryState, SearchResults};

use crate::render_state::{IndexRenderState, RenderState};
use crate::scoped::ScopedResult;
use crate::ui_state::{IndexUiState, UiState};
use crate::NodeId;

bitflags::bitflags! {
	/// Optional widget methods a widget implements.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct WidgetCapabilities: u8 {
		/// [`Widget::init`].
		const INIT = 1 << 0;
		/// [`Widget::render`].
		const RENDER = 1 << 1;
		/// [`Widget::dispose`].
		const DISPOSE = 1 << 2;
		/// [`Widget::get_widget_ui_state`].
		const UI_STATE = 1 << 3;
		/// [`Widget::get_widget_state`], the deprecated name of the UI state accessor.
		const LEGACY_UI_STATE = 1 << 4;
		/// [`Widget::get_widget_search_parameters`].
		const SEARCH_PARAMETERS = 1 << 5;
		/// [`Widget::get_render_state`].
		const RENDER_STATE = 1 << 6;
	}
}

impl WidgetCapabilities {
	/// Capabilities every index node exposes when used as a child.
	pub const INDEX: Self = Self::INIT
		.union(Self::RENDER)
		.union(Self::DISPOSE)
		.union(Self::UI_STATE)
		.union(Self::SEARCH_PARAMETERS);

	/// Either of `init` or `render`, the minimum for a mountable widget.
	pub fn is_mountable(self) -> bool {
		self.intersects(Self::INIT | Self::RENDER)
	}
}

/// Search progress information passed to widgets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchMetadata {
	/// A round-trip has been outstanding longer than the stalled delay.
	pub is_search_stalled: bool,
}

/// Context for [`Widget::init`].
pub struct InitContext<'a> {
	/// Index node owning the widget.
	pub parent: NodeId,
	pub index_id: &'a str,
	/// Current query state of the owning index.
	pub state: &'a QueryState,
	/// UI state the runtime started with.
	pub ui_state: &'a UiState,
	pub render_state: &'a RenderState,
	/// Always empty: scoped results exist only once a round-trip returned.
	pub scoped_results: &'a [ScopedResult],
	pub search_metadata: SearchMetadata,
	pub url_builder: &'a dyn Fn(&QueryState) -> String,
}

impl InitContext<'_> {
	/// URL reflecting the owning index in `state`.
	pub fn create_url(&self, state: &QueryState) -> String {
		(self.url_builder)(state)
	}
}

/// Context for [`Widget::render`].
pub struct RenderContext<'a> {
	pub parent: NodeId,
	pub index_id: &'a str,
	/// Cached results of the owning index.
	pub results: &'a SearchResults,
	/// The query the results answer.
	pub state: &'a QueryState,
	pub render_state: &'a RenderState,
	/// Results of every sibling index and their descendants.
	pub scoped_results: &'a [ScopedResult],
	pub search_metadata: SearchMetadata,
	pub url_builder: &'a dyn Fn(&QueryState) -> String,
}

impl RenderContext<'_> {
	pub fn create_url(&self, state: &QueryState) -> String {
		(self.url_builder)(state)
	}
}

/// Context for [`Widget::get_render_state`], which runs before both `init`
/// and `render`.
pub enum RenderStateContext<'a> {
	Init(&'a InitContext<'a>),
	Render(&'a RenderContext<'a>),
}

impl RenderStateContext<'_> {
	pub fn parent(&self) -> NodeId {
		match self {
			Self::Init(ctx) => ctx.parent,
			Self::Render(ctx) => ctx.parent,
		}
	}

	pub fn index_id(&self) -> &str {
		match self {
			Self::Init(ctx) => ctx.index_id,
			Self::Render(ctx) => ctx.index_id,
		}
	}

	pub fn state(&self) -> &QueryState {
		match self {
			Self::Init(ctx) => ctx.state,
			Self::Render(ctx) => ctx.state,
		}
	}

	/// `None` during `init`.
	pub fn results(&self) -> Option<&SearchResults> {
		match self {
			Self::Init(_) => None,
			Self::Render(ctx) => Some(ctx.results),
		}
	}

	pub fn render_state(&self) -> &RenderState {
		match self {
			Self::Init(ctx) => ctx.render_state,
			Self::Render(ctx) => ctx.render_state,
		}
	}

	pub fn scoped_results(&self) -> &[ScopedResult] {
		match self {
			Self::Init(ctx) => ctx.scoped_results,
			Self::Render(ctx) => ctx.scoped_results,
		}
	}

	pub fn create_url(&self, state: &QueryState) -> String {
		match self {
			Self::Init(ctx) => ctx.create_url(state),
			Self::Render(ctx) => ctx.create_url(state),
		}
	}
}

/// Context for [`Widget::dispose`].
pub struct DisposeContext<'a> {
	pub parent: NodeId,
	/// Running query state; earlier disposals in the same batch are applied.
	pub state: &'a QueryState,
}

/// Context for [`Widget::get_widget_ui_state`].
pub struct UiStateContext<'a> {
	/// The query state the fragment should reflect.
	pub state: &'a QueryState,
}

/// Context for [`Widget::get_widget_search_parameters`].
pub struct SearchParametersContext<'a> {
	/// The fragment the query state should reflect.
	pub ui_state: &'a IndexUiState,
}

/// A mountable widget.
///
/// Every method has a neutral default; [`Widget::capabilities`] tells the tree
/// which ones are meaningful. Methods take `&self`: widgets that track state
/// across calls use interior mutability.
pub trait Widget {
	fn capabilities(&self) -> WidgetCapabilities;

	/// Type tag reported in telemetry.
	fn widget_type(&self) -> &str {
		"custom"
	}

	/// Names of the options the widget was built with. `None` for widgets
	/// built directly from a connector.
	fn widget_params(&self) -> Option<Vec<String>> {
		None
	}

	fn init(&self, _ctx: &InitContext<'_>) {}

	fn render(&self, _ctx: &RenderContext<'_>) {}

	/// Releases the widget. May return the query state with the widget's own
	/// parameters removed.
	fn dispose(&self, _ctx: &DisposeContext<'_>) -> Option<QueryState> {
		None
	}

	fn get_widget_ui_state(&self, ui_state: IndexUiState, _ctx: &UiStateContext<'_>) -> IndexUiState {
		ui_state
	}

	/// Deprecated name of [`Widget::get_widget_ui_state`].
	fn get_widget_state(&self, ui_state: IndexUiState, ctx: &UiStateContext<'_>) -> IndexUiState {
		self.get_widget_ui_state(ui_state, ctx)
	}

	fn get_widget_search_parameters(&self, state: QueryState, _ctx: &SearchParametersContext<'_>) -> QueryState {
		state
	}

	/// Slice merged into the owning index's render state.
	fn get_render_state(&self, _render_state: &IndexRenderState, _ctx: &RenderStateContext<'_>) -> IndexRenderState {
		IndexRenderState::new()
	}
}

/// A child of an index node.
#[derive(Clone)]
pub enum WidgetRef {
	Widget(Rc<dyn Widget>),
	Index(NodeId),
}

impl WidgetRef {
	pub fn new<W: Widget + 'static>(widget: W) -> Self {
		Self::Widget(Rc::new(widget))
	}

	pub fn is_index(&self) -> bool {
		matches!(self, Self::Index(_))
	}

	pub fn as_index(&self) -> Option<NodeId> {
		match self {
			Self::Index(id) => Some(*id),
			Self::Widget(_) => None,
		}
	}

	pub fn as_widget(&self) -> Option<&Rc<dyn Widget>> {
		match self {
			Self::Widget(widget) => Some(widget),
			Self::Index(_) => None,
		}
	}

	pub fn capabilities(&self) -> WidgetCapabilities {
		match self {
			Self::Widget(widget) => widget.capabilities(),
			Self::Index(_) => WidgetCapabilities::INDEX,
		}
	}

	/// Reference identity: same allocation, or same node.
	pub fn same(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Widget(a), Self::Widget(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
			(Self::Index(a), Self::Index(b)) => a == b,
			_ => false,
		}
	}
}

impl fmt::Debug for WidgetRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Widget(widget) => f
				.debug_struct("Widget")
				.field("type", &widget.widget_type())
				.field("capabilities", &widget.capabilities())
				.finish(),
			Self::Index(id) => f.debug_tuple("Index").field(id).finish(),
		}
	}
}

impl From<NodeId> for WidgetRef {
	fn from(id: NodeId) -> Self {
		Self::Index(id)
	}
}

impl<W: Widget + 'static> From<Rc<W>> for WidgetRef {
	fn from(widget: Rc<W>) -> Self {
		Self::Widget(widget)
	}
}
