//! Shared widgets and client for index tree integration tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use prism_index::{
	ClientError, DisposeContext, FacetValuesRequest, FacetValuesResponse, IndexUiState, InitContext, QueryState,
	RenderContext, RequestHeaders, SearchClient, SearchParametersContext, SearchRequest, SearchResults,
	UiStateContext, Widget, WidgetCapabilities,
};
use serde_json::{Value, json};

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Builds a fragment from a JSON object literal.
pub fn fragment(value: Value) -> IndexUiState {
	match value {
		Value::Object(map) => map,
		other => panic!("not an object: {other}"),
	}
}

/// One recorded network call.
#[derive(Debug, Clone)]
pub struct Call {
	pub requests: Vec<SearchRequest>,
	pub headers: RequestHeaders,
}

/// Answers immediately with one hit per query.
#[derive(Default)]
pub struct RecordingClient {
	calls: RefCell<Vec<Call>>,
}

impl RecordingClient {
	pub fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.borrow().clone()
	}

	pub fn call_count(&self) -> usize {
		self.calls.borrow().len()
	}

	pub fn last_call(&self) -> Call {
		self.calls.borrow().last().cloned().expect("no search was sent")
	}
}

impl SearchClient for RecordingClient {
	fn search(
		&self,
		requests: Vec<SearchRequest>,
		headers: &RequestHeaders,
	) -> LocalBoxFuture<'static, Result<Vec<SearchResults>, ClientError>> {
		self.calls.borrow_mut().push(Call {
			requests: requests.clone(),
			headers: headers.clone(),
		});
		let results = requests
			.into_iter()
			.map(|request| {
				let hit = json!({ "objectID": "1", "index": request.index_name });
				SearchResults::empty(request.params).with_hits(vec![hit])
			})
			.collect();
		futures::future::ready(Ok(results)).boxed_local()
	}

	fn search_for_facet_values(
		&self,
		_request: FacetValuesRequest,
		_headers: &RequestHeaders,
	) -> LocalBoxFuture<'static, Result<FacetValuesResponse, ClientError>> {
		futures::future::ready(Ok(FacetValuesResponse::default())).boxed_local()
	}
}

/// Full-text query bound to the `query` key of the fragment.
#[derive(Default)]
pub struct SearchBox {
	pub inits: Cell<usize>,
	pub disposals: Cell<usize>,
	pub last_url: RefCell<Option<String>>,
}

impl Widget for SearchBox {
	fn capabilities(&self) -> WidgetCapabilities {
		WidgetCapabilities::INIT
			| WidgetCapabilities::DISPOSE
			| WidgetCapabilities::UI_STATE
			| WidgetCapabilities::SEARCH_PARAMETERS
	}

	fn widget_type(&self) -> &str {
		"searchBox"
	}

	fn widget_params(&self) -> Option<Vec<String>> {
		Some(vec!["placeholder".into()])
	}

	fn init(&self, ctx: &InitContext<'_>) {
		self.inits.set(self.inits.get() + 1);
		*self.last_url.borrow_mut() = Some(ctx.create_url(&ctx.state.with_query("shoes")));
	}

	fn dispose(&self, ctx: &DisposeContext<'_>) -> Option<QueryState> {
		self.disposals.set(self.disposals.get() + 1);
		Some(ctx.state.update(|parameters| parameters.query = None))
	}

	fn get_widget_ui_state(&self, mut ui_state: IndexUiState, ctx: &UiStateContext<'_>) -> IndexUiState {
		match ctx.state.query.as_deref() {
			Some(query) if !query.is_empty() => {
				ui_state.insert("query".into(), Value::from(query));
			}
			_ => {
				ui_state.remove("query");
			}
		}
		ui_state
	}

	fn get_widget_search_parameters(&self, state: QueryState, ctx: &SearchParametersContext<'_>) -> QueryState {
		match ctx.ui_state.get("query").and_then(Value::as_str) {
			Some(query) => state.with_query(query),
			None => state.update(|parameters| parameters.query = None),
		}
	}
}

/// Disjunctive refinements of one attribute, bound to
/// `refinementList.<attribute>`.
pub struct RefinementList {
	pub attribute: &'static str,
}

impl Widget for RefinementList {
	fn capabilities(&self) -> WidgetCapabilities {
		WidgetCapabilities::RENDER
			| WidgetCapabilities::DISPOSE
			| WidgetCapabilities::UI_STATE
			| WidgetCapabilities::SEARCH_PARAMETERS
	}

	fn get_widget_ui_state(&self, mut ui_state: IndexUiState, ctx: &UiStateContext<'_>) -> IndexUiState {
		let values = ctx
			.state
			.disjunctive_facets_refinements
			.get(self.attribute)
			.cloned()
			.unwrap_or_default();
		let mut list = ui_state
			.remove("refinementList")
			.and_then(|list| list.as_object().cloned())
			.unwrap_or_default();
		if values.is_empty() {
			list.remove(self.attribute);
		} else {
			list.insert(self.attribute.into(), json!(values));
		}
		if !list.is_empty() {
			ui_state.insert("refinementList".into(), Value::Object(list));
		}
		ui_state
	}

	fn get_widget_search_parameters(&self, state: QueryState, ctx: &SearchParametersContext<'_>) -> QueryState {
		let wanted: Vec<String> = ctx
			.ui_state
			.get("refinementList")
			.and_then(|list| list.get(self.attribute))
			.and_then(|values| serde_json::from_value(values.clone()).ok())
			.unwrap_or_default();
		let mut next = state.add_disjunctive_facet(self.attribute);
		let current = next
			.disjunctive_facets_refinements
			.get(self.attribute)
			.cloned()
			.unwrap_or_default();
		for value in current.iter().filter(|value| !wanted.contains(value)) {
			next = next.remove_disjunctive_facet_refinement(self.attribute, value);
		}
		for value in &wanted {
			next = next.add_disjunctive_facet_refinement(self.attribute, value);
		}
		next
	}
}

/// Counts lifecycle calls and remembers what it saw while rendering.
#[derive(Default)]
pub struct Probe {
	pub inits: Cell<usize>,
	pub renders: Cell<usize>,
	pub disposals: Cell<usize>,
	pub scoped_ids: RefCell<Vec<String>>,
	pub hits: Cell<u64>,
}

impl Widget for Probe {
	fn capabilities(&self) -> WidgetCapabilities {
		WidgetCapabilities::INIT | WidgetCapabilities::RENDER | WidgetCapabilities::DISPOSE
	}

	fn init(&self, _ctx: &InitContext<'_>) {
		self.inits.set(self.inits.get() + 1);
	}

	fn render(&self, ctx: &RenderContext<'_>) {
		self.renders.set(self.renders.get() + 1);
		self.hits.set(ctx.results.nb_hits);
		*self.scoped_ids.borrow_mut() = ctx
			.scoped_results
			.iter()
			.map(|scoped| scoped.index_id.clone())
			.collect();
	}

	fn dispose(&self, _ctx: &DisposeContext<'_>) -> Option<QueryState> {
		self.disposals.set(self.disposals.get() + 1);
		None
	}
}
