//! Index node tree and lifecycle.
//!
//! [`IndexTree`] owns every node, the shared [`SearchExecutor`], the render
//! state and the [`Scheduler`]. Operations never search or render directly:
//! they raise scheduler flags that the hosting runtime drains once per tick.
//!
//! # Lifecycle
//!
//! A node is `Created` until [`IndexTree::init`] makes it `Live`: its store is
//! created, its derivation slot attached, and its children initialized.
//! [`IndexTree::dispose`] releases the node but keeps it in its parent's child
//! list, so initializing it again is allowed.
//!
//! # Change phases
//!
//! Every accepted [`IndexTree::set_state`] runs the store's phases in
//! subscription order. The page reset cascade is subscribed before the
//! children are initialized and therefore always completes before the UI
//! state of the node is recomputed.

use std::sync::Arc;

use prism_params::{QueryState, SearchResults};
use rustc_hash::FxHashMap as HashMap;

use crate::error::{ClientError, ConfigurationError, IndexError, Result};
use crate::executor::{Completion, PreparedSearch, RoundTripId, SearchExecutor};
use crate::node::{IndexNode, IndexOptions, Lifecycle, NodeArena};
use crate::reconcile::{derive_query_state, derive_ui_state};
use crate::render_state::RenderStateStore;
use crate::scheduler::Scheduler;
use crate::scoped::resolve_scoped_results;
use crate::store::{ChangeEvent, ChangePhase, QueryStateStore, SetStateOptions};
use crate::telemetry::{PackedTelemetryEncoder, TELEMETRY_HEADER, TelemetryEncoder, TelemetryPayload, WidgetUsage};
use crate::ui_state::{self, IndexUiState, UiState};
use crate::widget::{
	DisposeContext, InitContext, RenderContext, RenderStateContext, SearchMetadata, SearchParametersContext,
	UiStateContext, WidgetCapabilities, WidgetRef,
};
use crate::{NodeId, SlotId, SubscriptionId};

/// Telemetry type tag of index nodes.
const INDEX_WIDGET_TYPE: &str = "index";

pub struct IndexTree {
	arena: NodeArena,
	executor: SearchExecutor<NodeArena>,
	slot_owners: HashMap<SlotId, NodeId>,
	scheduler: Scheduler,
	render_state: RenderStateStore,
	telemetry: TelemetryPayload,
	encoder: Box<dyn TelemetryEncoder>,
	initial_ui_state: UiState,
	root: Option<NodeId>,
	controlled: bool,
	is_search_stalled: bool,
}

impl Default for IndexTree {
	fn default() -> Self {
		Self::with_encoder(PackedTelemetryEncoder)
	}
}

impl IndexTree {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_encoder(encoder: impl TelemetryEncoder + 'static) -> Self {
		Self {
			arena: NodeArena::new(),
			executor: SearchExecutor::new(),
			slot_owners: HashMap::default(),
			scheduler: Scheduler::new(),
			render_state: RenderStateStore::new(),
			telemetry: TelemetryPayload::default(),
			encoder: Box::new(encoder),
			initial_ui_state: UiState::new(),
			root: None,
			controlled: false,
			is_search_stalled: false,
		}
	}

	/// Creates a detached node.
	pub fn create_index(&mut self, options: IndexOptions) -> Result<NodeId> {
		options.validate()?;
		let id = self.arena.insert(&options);
		tracing::trace!(node = ?id, index = %options.index_name, "index node created");
		Ok(id)
	}

	pub fn arena(&self) -> &NodeArena {
		&self.arena
	}

	pub fn node(&self, id: NodeId) -> Result<&IndexNode> {
		self.arena.node(id)
	}

	pub fn executor(&self) -> &SearchExecutor<NodeArena> {
		&self.executor
	}

	/// Mutable executor access, e.g. to observe a node's slot.
	pub fn executor_mut(&mut self) -> &mut SearchExecutor<NodeArena> {
		&mut self.executor
	}

	pub fn scheduler(&self) -> &Scheduler {
		&self.scheduler
	}

	pub fn scheduler_mut(&mut self) -> &mut Scheduler {
		&mut self.scheduler
	}

	pub fn render_state(&self) -> &RenderStateStore {
		&self.render_state
	}

	pub fn telemetry(&self) -> &TelemetryPayload {
		&self.telemetry
	}

	pub fn root(&self) -> Option<NodeId> {
		self.root
	}

	pub fn initial_ui_state(&self) -> &UiState {
		&self.initial_ui_state
	}

	/// A controlled tree leaves searching to the owner of the UI state.
	pub fn is_controlled(&self) -> bool {
		self.controlled
	}

	pub fn set_controlled(&mut self, controlled: bool) {
		self.controlled = controlled;
	}

	pub fn is_search_stalled(&self) -> bool {
		self.is_search_stalled
	}

	pub fn set_search_stalled(&mut self, stalled: bool) {
		self.is_search_stalled = stalled;
	}

	fn search_metadata(&self) -> SearchMetadata {
		SearchMetadata {
			is_search_stalled: self.is_search_stalled,
		}
	}

	/// Current query state of a live node.
	pub fn state(&self, node: NodeId) -> Result<&QueryState> {
		self.arena.node(node)?.state().ok_or(IndexError::NotLive(node))
	}

	pub fn results(&self, node: NodeId) -> Result<Option<&Arc<SearchResults>>> {
		Ok(self.arena.node(node)?.results())
	}

	/// Makes `root` the root of the tree, initializes it with
	/// `initial_ui_state` and schedules the first search.
	pub fn start(&mut self, root: NodeId, initial_ui_state: UiState) -> Result<()> {
		self.arena.node(root)?;
		self.root = Some(root);
		self.initial_ui_state = initial_ui_state;
		self.init(root, None)?;
		self.scheduler.schedule_search();
		Ok(())
	}

	/// Initializes `node` under `parent`. No-op on a live node.
	pub fn init(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<()> {
		let entry = self.arena.node(node)?;
		if entry.is_live() {
			return Ok(());
		}
		self.telemetry
			.update(WidgetUsage::new(INDEX_WIDGET_TYPE, Some(entry.params.clone())));

		let ui_state = self.initial_ui_state.get(&entry.id).cloned().unwrap_or_default();
		let parameters = derive_query_state(
			&entry.children,
			&SearchParametersContext { ui_state: &ui_state },
			QueryState::new(entry.name.clone()),
		);
		let children = entry.children.clone();

		let slot = self
			.executor
			.derive(move |arena: &NodeArena| arena.resolve_search_parameters(node).unwrap_or_default());
		self.slot_owners.insert(slot, node);

		let mut store = QueryStateStore::new(parameters);
		store.subscribe(ChangePhase::PageReset);

		let entry = self.arena.node_mut(node)?;
		entry.parent = parent;
		entry.ui_state = ui_state;
		entry.store = Some(store);
		entry.slot = Some(slot);
		entry.telemetry_header = None;
		entry.lifecycle = Lifecycle::Live;
		tracing::debug!(?node, ?parent, index_id = %entry.id, "index node initialized");

		self.mount(node, &children)?;

		if let Some(store) = self.arena.node_mut(node)?.store.as_mut() {
			store.subscribe(ChangePhase::UiStateSync);
		}
		Ok(())
	}

	/// Runs the render state pass, then the init pass, over `widgets` of a
	/// live node.
	fn mount(&mut self, node: NodeId, widgets: &[WidgetRef]) -> Result<()> {
		for widget in widgets.iter().filter_map(WidgetRef::as_widget) {
			if !widget.capabilities().contains(WidgetCapabilities::RENDER_STATE) {
				continue;
			}
			let slice = self.with_init_context(node, |ctx| {
				let current = self.render_state.index(ctx.index_id);
				widget.get_render_state(&current, &RenderStateContext::Init(ctx))
			})?;
			self.render_state.merge(&self.arena.node(node)?.id, slice);
		}

		for child in widgets {
			match child {
				WidgetRef::Index(child) => self.init(*child, Some(node))?,
				WidgetRef::Widget(widget) => {
					let caps = widget.capabilities();
					if caps.contains(WidgetCapabilities::LEGACY_UI_STATE) {
						tracing::warn!(
							widget = widget.widget_type(),
							"`get_widget_state` is renamed `get_widget_ui_state`; implement `get_widget_ui_state` instead"
						);
					}
					if caps.contains(WidgetCapabilities::INIT) {
						self.telemetry
							.update(WidgetUsage::new(widget.widget_type(), widget.widget_params()));
						self.with_init_context(node, |ctx| widget.init(ctx))?;
					}
				}
			}
		}
		Ok(())
	}

	fn with_init_context<R>(&self, node: NodeId, f: impl FnOnce(&InitContext<'_>) -> R) -> Result<R> {
		let entry = self.arena.node(node)?;
		let state = entry.state().ok_or(IndexError::NotLive(node))?;
		let render_state = self.render_state.snapshot();
		let url_builder = |next: &QueryState| self.node_url(node, next);
		let ctx = InitContext {
			parent: node,
			index_id: &entry.id,
			state,
			ui_state: &self.initial_ui_state,
			render_state: &render_state,
			scoped_results: &[],
			search_metadata: self.search_metadata(),
			url_builder: &url_builder,
		};
		Ok(f(&ctx))
	}

	fn with_render_context<R>(
		&self,
		node: NodeId,
		results: &SearchResults,
		f: impl FnOnce(&RenderContext<'_>) -> R,
	) -> Result<R> {
		let entry = self.arena.node(node)?;
		let scoped = resolve_scoped_results(&self.arena, node);
		let render_state = self.render_state.snapshot();
		let url_builder = |next: &QueryState| self.node_url(node, next);
		let ctx = RenderContext {
			parent: node,
			index_id: &entry.id,
			results,
			state: &results.state,
			render_state: &render_state,
			scoped_results: &scoped,
			search_metadata: self.search_metadata(),
			url_builder: &url_builder,
		};
		Ok(f(&ctx))
	}

	/// Appends `widgets` to `node`. On a live node the query state is
	/// recomputed, only the new widgets are initialized and a search is
	/// scheduled; otherwise they wait for [`init`](Self::init).
	pub fn add_widgets(&mut self, node: NodeId, widgets: Vec<WidgetRef>) -> Result<()> {
		if widgets.is_empty() {
			return Err(ConfigurationError::EmptyWidgetList.into());
		}
		if let Some(position) = widgets.iter().position(|widget| !widget.capabilities().is_mountable()) {
			return Err(ConfigurationError::MissingInitOrRender { position }.into());
		}
		self.check_sibling_ids(node, &widgets)?;

		let entry = self.arena.node_mut(node)?;
		entry.children.extend(widgets.iter().cloned());
		tracing::debug!(?node, added = widgets.len(), live = entry.is_live(), "widgets added");
		if !entry.is_live() {
			return Ok(());
		}

		let entry = self.arena.node(node)?;
		let ui_state = entry.ui_state.clone();
		let current = entry.state().cloned().ok_or(IndexError::NotLive(node))?;
		let next = derive_query_state(
			&entry.children,
			&SearchParametersContext { ui_state: &ui_state },
			current,
		);
		self.set_state(node, next, SetStateOptions::with_ui_state(ui_state))?;

		self.mount(node, &widgets)?;
		self.scheduler.schedule_search();
		Ok(())
	}

	/// Resolves every index in `widgets` and warns when one reuses the id of
	/// a sibling. The later index wins in the UI state.
	fn check_sibling_ids(&self, node: NodeId, widgets: &[WidgetRef]) -> Result<()> {
		let entry = self.arena.node(node)?;
		let mut seen: Vec<&str> = entry
			.index_children()
			.filter_map(|child| self.arena.get(child))
			.map(IndexNode::id)
			.collect();
		for child in widgets.iter().filter_map(WidgetRef::as_index) {
			let id = self.arena.node(child)?.id();
			if seen.contains(&id) {
				tracing::warn!(parent = %entry.id, index_id = id, "sibling indices share an id");
			}
			seen.push(id);
		}
		Ok(())
	}

	/// Removes `widgets` from `node` by reference identity and disposes them.
	///
	/// The state returned by each disposal feeds the next one. A search is
	/// scheduled only while children remain.
	pub fn remove_widgets(&mut self, node: NodeId, widgets: &[WidgetRef]) -> Result<()> {
		if let Some(position) = widgets
			.iter()
			.position(|widget| !widget.capabilities().contains(WidgetCapabilities::DISPOSE))
		{
			return Err(ConfigurationError::MissingDispose { position }.into());
		}

		let entry = self.arena.node_mut(node)?;
		entry.children.retain(|child| !widgets.iter().any(|widget| widget.same(child)));
		tracing::debug!(?node, removed = widgets.len(), live = entry.is_live(), "widgets removed");
		if !entry.is_live() || widgets.is_empty() {
			return Ok(());
		}

		let mut state = entry.state().cloned().ok_or(IndexError::NotLive(node))?;
		for widget in widgets {
			match widget {
				WidgetRef::Widget(widget) => {
					if let Some(next) = widget.dispose(&DisposeContext { parent: node, state: &state }) {
						state = next;
					}
				}
				WidgetRef::Index(child) => self.dispose(*child)?,
			}
		}

		let entry = self.arena.node(node)?;
		let ui_state = derive_ui_state(&entry.children, &UiStateContext { state: &state }, IndexUiState::new());
		let next = derive_query_state(
			&entry.children,
			&SearchParametersContext { ui_state: &ui_state },
			state,
		);
		let has_children = !entry.children.is_empty();

		self.arena.node_mut(node)?.ui_state = ui_state;
		self.set_state(node, next, SetStateOptions::default())?;
		if has_children {
			self.scheduler.schedule_search();
		}
		Ok(())
	}

	/// Renders `node` and its index descendants. No-op until the node
	/// received results.
	pub fn render(&self, node: NodeId) -> Result<()> {
		let entry = self.arena.node(node)?;
		let Some(results) = entry.results.clone() else {
			return Ok(());
		};

		for widget in entry.children.iter().filter_map(WidgetRef::as_widget) {
			if !widget.capabilities().contains(WidgetCapabilities::RENDER_STATE) {
				continue;
			}
			let slice = self.with_render_context(node, &results, |ctx| {
				let current = self.render_state.index(ctx.index_id);
				widget.get_render_state(&current, &RenderStateContext::Render(ctx))
			})?;
			self.render_state.merge(&entry.id, slice);
		}

		for child in &entry.children {
			match child {
				WidgetRef::Index(child) => self.render(*child)?,
				WidgetRef::Widget(widget) if widget.capabilities().contains(WidgetCapabilities::RENDER) => {
					self.with_render_context(node, &results, |ctx| widget.render(ctx))?;
				}
				WidgetRef::Widget(_) => {}
			}
		}
		Ok(())
	}

	/// Releases `node` and its index descendants. The node stays in its
	/// parent's child list. No-op unless live.
	pub fn dispose(&mut self, node: NodeId) -> Result<()> {
		let entry = self.arena.node(node)?;
		if !entry.is_live() {
			return Ok(());
		}
		let children = entry.children.clone();
		let state = entry.state().cloned().ok_or(IndexError::NotLive(node))?;

		for child in &children {
			match child {
				WidgetRef::Index(child) => self.dispose(*child)?,
				WidgetRef::Widget(widget) if widget.capabilities().contains(WidgetCapabilities::DISPOSE) => {
					widget.dispose(&DisposeContext { parent: node, state: &state });
				}
				WidgetRef::Widget(_) => {}
			}
		}

		let entry = self.arena.node_mut(node)?;
		entry.parent = None;
		if let Some(mut store) = entry.store.take() {
			store.remove_all_listeners();
		}
		entry.results = None;
		entry.telemetry_header = None;
		entry.lifecycle = Lifecycle::Disposed;
		if let Some(slot) = entry.slot.take() {
			self.executor.detach(slot);
			self.slot_owners.remove(&slot);
		}
		tracing::debug!(?node, "index node disposed");
		Ok(())
	}

	/// Frees `node` and its index descendants, disposing them first when
	/// live. Meant for nodes taken out with
	/// [`remove_widgets`](Self::remove_widgets); a parent still listing
	/// `node` drops it without recomputing its own state. Released ids are
	/// stale and their render state is dropped.
	pub fn release(&mut self, node: NodeId) -> Result<()> {
		self.dispose(node)?;
		self.arena.forget_child(node);
		if self.root == Some(node) {
			self.root = None;
		}
		self.free(node);
		Ok(())
	}

	fn free(&mut self, node: NodeId) {
		let Some(entry) = self.arena.remove(node) else {
			return;
		};
		for child in entry.index_children() {
			self.free(child);
		}
		if !self.arena.contains_index_id(&entry.id) {
			self.render_state.remove(&entry.id);
		}
		tracing::debug!(?node, index_id = %entry.id, "index node released");
	}

	/// Replaces the query state of `node` and runs its change phases.
	/// Returns `false` when `next` is the current state.
	pub fn set_state(&mut self, node: NodeId, next: QueryState, options: SetStateOptions) -> Result<bool> {
		let store = self
			.arena
			.node_mut(node)?
			.store
			.as_mut()
			.ok_or(IndexError::NotLive(node))?;
		let Some(event) = store.set_state(next, options) else {
			return Ok(false);
		};
		let phases = store.phases().to_vec();
		tracing::trace!(?node, page_reset = event.is_page_reset, "query state changed");

		for phase in phases {
			match phase {
				ChangePhase::PageReset if event.is_page_reset => self.reset_page_from_children(node)?,
				ChangePhase::PageReset => {}
				ChangePhase::UiStateSync => self.sync_ui_state(node, &event)?,
			}
		}
		Ok(true)
	}

	/// Resets the page of every index descendant, pre-order.
	fn reset_page_from_children(&mut self, node: NodeId) -> Result<()> {
		let children: Vec<NodeId> = self.arena.node(node)?.index_children().collect();
		for child in children {
			let Some(state) = self.arena.node(child)?.state().cloned() else {
				continue;
			};
			self.set_state(child, state.with_page_reset(), SetStateOptions::page_reset())?;
			self.reset_page_from_children(child)?;
		}
		Ok(())
	}

	fn sync_ui_state(&mut self, node: NodeId, event: &ChangeEvent) -> Result<()> {
		let entry = self.arena.node(node)?;
		let seed = event.ui_state.clone().unwrap_or_default();
		let ui_state = derive_ui_state(&entry.children, &UiStateContext { state: &event.state }, seed);
		self.arena.node_mut(node)?.ui_state = ui_state;
		if !self.controlled {
			self.scheduler.notify_state_change();
		}
		Ok(())
	}

	/// Applies a user refinement to `node`: pagination is reset before
	/// `update` runs, and a search is requested.
	pub fn refine(&mut self, node: NodeId, update: impl FnOnce(&QueryState) -> QueryState) -> Result<bool> {
		let next = update(&self.state(node)?.with_page_reset());
		let changed = self.set_state(node, next, SetStateOptions::page_reset())?;
		self.search(node)?;
		Ok(changed)
	}

	/// Requests a search on behalf of `node`. A controlled tree asks the
	/// owner of the UI state instead.
	pub fn search(&mut self, node: NodeId) -> Result<()> {
		if !self.arena.node(node)?.is_live() {
			return Err(IndexError::NotLive(node));
		}
		if self.controlled {
			self.scheduler.notify_controlled_state_change();
		} else {
			self.scheduler.schedule_search();
		}
		Ok(())
	}

	/// Observes accepted changes of `node`'s query state.
	pub fn on_change(
		&mut self,
		node: NodeId,
		observer: impl FnMut(&ChangeEvent) + 'static,
	) -> Result<SubscriptionId> {
		let store = self
			.arena
			.node_mut(node)?
			.store
			.as_mut()
			.ok_or(IndexError::NotLive(node))?;
		Ok(store.on_change(observer))
	}

	/// Adds the fragments of `node` and its index descendants to `ui_state`,
	/// keyed by index id.
	pub fn get_widget_ui_state(&self, node: NodeId, mut ui_state: UiState) -> Result<UiState> {
		let entry = self.arena.node(node)?;
		ui_state.insert(entry.id.clone(), entry.ui_state.clone());
		for child in entry.index_children() {
			ui_state = self.get_widget_ui_state(child, ui_state)?;
		}
		Ok(ui_state)
	}

	/// Deprecated name of [`get_widget_ui_state`](Self::get_widget_ui_state).
	pub fn get_widget_state(&self, node: NodeId, ui_state: UiState) -> Result<UiState> {
		tracing::warn!("`get_widget_state` is renamed `get_widget_ui_state`; use `get_widget_ui_state` instead");
		self.get_widget_ui_state(node, ui_state)
	}

	/// Folds the search parameters of `node`'s widgets over `state`.
	pub fn get_widget_search_parameters(
		&self,
		node: NodeId,
		state: QueryState,
		ui_state: &IndexUiState,
	) -> Result<QueryState> {
		let entry = self.arena.node(node)?;
		Ok(derive_query_state(&entry.children, &SearchParametersContext { ui_state }, state))
	}

	/// Recomputes the fragment of `node` from its current state.
	pub fn refresh_ui_state(&mut self, node: NodeId) -> Result<()> {
		let entry = self.arena.node(node)?;
		let state = entry.state().ok_or(IndexError::NotLive(node))?;
		let ui_state = derive_ui_state(&entry.children, &UiStateContext { state }, IndexUiState::new());
		self.arena.node_mut(node)?.ui_state = ui_state;
		Ok(())
	}

	/// UI state of the whole tree. Empty before [`start`](Self::start).
	pub fn ui_state(&self) -> UiState {
		match self.root {
			Some(root) => self.get_widget_ui_state(root, UiState::new()).unwrap_or_default(),
			None => UiState::new(),
		}
	}

	/// Pushes `ui_state` into every live node and schedules a search.
	pub fn set_ui_state(&mut self, ui_state: &UiState) -> Result<()> {
		let Some(root) = self.root else {
			return Ok(());
		};
		self.apply_ui_state(root, ui_state)?;
		self.scheduler.schedule_search();
		self.scheduler.notify_state_change();
		Ok(())
	}

	fn apply_ui_state(&mut self, node: NodeId, ui_state: &UiState) -> Result<()> {
		let entry = self.arena.node(node)?;
		let Some(current) = entry.state().cloned() else {
			return Ok(());
		};
		let empty = IndexUiState::new();
		let fragment = ui_state.get(&entry.id).unwrap_or(&empty);
		let next = derive_query_state(
			&entry.children,
			&SearchParametersContext { ui_state: fragment },
			current,
		);
		let children: Vec<NodeId> = entry.index_children().collect();

		self.set_state(node, next, SetStateOptions::default())?;
		for child in children {
			self.apply_ui_state(child, ui_state)?;
		}
		Ok(())
	}

	/// URL of a whole UI state.
	pub fn create_url(&self, ui_state: &UiState) -> String {
		format!("?{}", ui_state::to_query_string(ui_state))
	}

	/// URL of the tree with `node` moved to `state`.
	fn node_url(&self, node: NodeId, state: &QueryState) -> String {
		let mut ui_state = self.ui_state();
		if let Some(entry) = self.arena.get(node) {
			let fragment = derive_ui_state(&entry.children, &UiStateContext { state }, IndexUiState::new());
			ui_state.insert(entry.id.clone(), fragment);
		}
		self.create_url(&ui_state)
	}

	/// Starts a round-trip over every live node. Each participating node
	/// refreshes the telemetry header and requests a stalled render.
	pub fn begin_search(&mut self) -> Option<PreparedSearch> {
		let prepared = self.executor.begin(&self.arena)?;
		for slot in &prepared.slots {
			let Some(&owner) = self.slot_owners.get(slot) else {
				continue;
			};
			self.attach_telemetry_header(owner);
			self.scheduler.schedule_stalled_render();
		}
		Some(prepared)
	}

	/// Attaches the encoded payload when it differs from the header this
	/// node attached last, removes the header otherwise.
	fn attach_telemetry_header(&mut self, node: NodeId) {
		let encoded = self.encoder.encode(&self.telemetry);
		let Some(entry) = self.arena.get_mut(node) else {
			return;
		};
		if entry.telemetry_header.as_deref() == Some(encoded.as_str()) {
			self.executor.headers_mut().remove(TELEMETRY_HEADER);
		} else {
			entry.telemetry_header = Some(encoded.clone());
			self.executor.headers_mut().insert(TELEMETRY_HEADER, encoded);
		}
	}

	/// Completes a round-trip. Delivered results are cached on their nodes
	/// and a render is scheduled; nodes disposed meanwhile receive nothing.
	pub fn complete_search(
		&mut self,
		id: RoundTripId,
		response: std::result::Result<Vec<SearchResults>, ClientError>,
	) -> Completion {
		let completion = self.executor.complete(id, response);
		match &completion {
			Completion::Delivered(deliveries) => {
				for delivery in deliveries {
					let Some(entry) = self
						.slot_owners
						.get(&delivery.slot)
						.and_then(|owner| self.arena.get_mut(*owner))
					else {
						continue;
					};
					entry.results = Some(Arc::clone(&delivery.results));
					if let Some(store) = entry.store.as_mut() {
						store.set_last_results(Arc::clone(&delivery.results));
					}
					self.scheduler.schedule_render();
				}
				tracing::debug!(round_trip = ?id, delivered = deliveries.len(), "results delivered");
			}
			Completion::Outdated => tracing::trace!(round_trip = ?id, "outdated round-trip ignored"),
			Completion::Failed(error) => tracing::warn!(round_trip = ?id, %error, "search round-trip failed"),
		}
		completion
	}
}

impl std::fmt::Debug for IndexTree {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IndexTree")
			.field("root", &self.root)
			.field("nodes", &self.arena.len())
			.field("executor", &self.executor)
			.field("controlled", &self.controlled)
			.finish()
	}
}
