//! Hosting runtime.
//!
//! [`SearchRuntime`] owns an [`IndexTree`] and a [`SearchClient`]. Tree
//! operations only raise scheduler flags; [`SearchRuntime::tick`] drains them
//! in a fixed order:
//!
//! 1. controlled-mode hook, when a search was requested while controlled
//! 2. UI state listeners
//! 3. search dispatch
//! 4. render
//!
//! Round-trips run concurrently in a [`FuturesUnordered`]. Delivery only
//! schedules a render, so every index answered by the same round-trip has its
//! results before anything renders.

use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use prism_params::{FacetValuesResponse, PlainParameters, QueryState, SearchResults};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::client::{FacetValuesRequest, SearchClient};
use crate::error::{ClientError, IndexError, Result};
use crate::executor::{Completion, RoundTripId};
use crate::node::IndexOptions;
use crate::tree::IndexTree;
use crate::ui_state::UiState;
use crate::widget::WidgetRef;
use crate::NodeId;

/// Default delay before an outstanding round-trip counts as stalled.
pub const DEFAULT_STALLED_SEARCH_DELAY_MS: u64 = 200;

fn default_stalled_search_delay_ms() -> u64 {
	DEFAULT_STALLED_SEARCH_DELAY_MS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuntimeOptions {
	/// Collection searched by the main index.
	pub index_name: String,
	/// UI state key of the main index. Defaults to `index_name`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub index_id: Option<String>,
	#[serde(default = "default_stalled_search_delay_ms")]
	pub stalled_search_delay_ms: u64,
	/// UI state applied when the tree starts.
	#[serde(default)]
	pub initial_ui_state: UiState,
}

impl RuntimeOptions {
	pub fn new(index_name: impl Into<String>) -> Self {
		Self {
			index_name: index_name.into(),
			index_id: None,
			stalled_search_delay_ms: DEFAULT_STALLED_SEARCH_DELAY_MS,
			initial_ui_state: UiState::new(),
		}
	}

	pub fn stalled_search_delay(&self) -> Duration {
		Duration::from_millis(self.stalled_search_delay_ms)
	}

	fn main_index(&self) -> IndexOptions {
		IndexOptions {
			index_name: self.index_name.clone(),
			index_id: self.index_id.clone(),
		}
	}
}

type RoundTrip = LocalBoxFuture<'static, (RoundTripId, std::result::Result<Vec<SearchResults>, ClientError>)>;
type StateChangeHook = Box<dyn FnMut(&UiState) -> UiState>;

pub struct SearchRuntime<Client> {
	tree: IndexTree,
	client: Client,
	main_index: NodeId,
	stalled_search_delay: Duration,
	initial_ui_state: UiState,
	in_flight: FuturesUnordered<RoundTrip>,
	/// Deadline of the stalled timer while armed.
	stalled_deadline: Option<Instant>,
	state_change_hook: Option<StateChangeHook>,
	ui_state_listeners: Vec<Box<dyn FnMut(&UiState)>>,
	error_listeners: Vec<Box<dyn FnMut(&ClientError)>>,
	started: bool,
}

impl<Client: SearchClient> SearchRuntime<Client> {
	/// Creates the runtime and its main index. Nothing is searched before
	/// [`start`](Self::start).
	pub fn new(client: Client, options: RuntimeOptions) -> Result<Self> {
		let mut tree = IndexTree::new();
		let main_index = tree.create_index(options.main_index())?;
		Ok(Self {
			tree,
			client,
			main_index,
			stalled_search_delay: options.stalled_search_delay(),
			initial_ui_state: options.initial_ui_state,
			in_flight: FuturesUnordered::new(),
			stalled_deadline: None,
			state_change_hook: None,
			ui_state_listeners: Vec::new(),
			error_listeners: Vec::new(),
			started: false,
		})
	}

	pub fn tree(&self) -> &IndexTree {
		&self.tree
	}

	pub fn tree_mut(&mut self) -> &mut IndexTree {
		&mut self.tree
	}

	pub fn client(&self) -> &Client {
		&self.client
	}

	pub fn main_index(&self) -> NodeId {
		self.main_index
	}

	pub fn is_started(&self) -> bool {
		self.started
	}

	/// Round-trips awaiting a response.
	pub fn pending_round_trips(&self) -> usize {
		self.in_flight.len()
	}

	/// Takes control of the UI state. On every search request the hook
	/// receives the proposed UI state and returns the one to apply; the
	/// runtime then searches with it.
	pub fn on_state_change(&mut self, hook: impl FnMut(&UiState) -> UiState + 'static) {
		self.state_change_hook = Some(Box::new(hook));
		self.tree.set_controlled(true);
	}

	/// Notified with the whole UI state after it changed.
	pub fn on_ui_state_change(&mut self, listener: impl FnMut(&UiState) + 'static) {
		self.ui_state_listeners.push(Box::new(listener));
	}

	/// Notified when a round-trip fails.
	pub fn on_error(&mut self, listener: impl FnMut(&ClientError) + 'static) {
		self.error_listeners.push(Box::new(listener));
	}

	/// Initializes the tree and schedules the first search.
	pub fn start(&mut self) -> Result<()> {
		if self.started {
			return Ok(());
		}
		self.tree.start(self.main_index, self.initial_ui_state.clone())?;
		self.started = true;
		tracing::debug!(main_index = ?self.main_index, "runtime started");
		Ok(())
	}

	/// Disposes the tree and drops pending round-trips. The runtime may be
	/// started again.
	pub fn dispose(&mut self) -> Result<()> {
		self.tree.dispose(self.main_index)?;
		self.tree.executor_mut().abandon_all();
		self.in_flight = FuturesUnordered::new();
		self.stalled_deadline = None;
		self.tree.set_search_stalled(false);
		self.tree.scheduler_mut().take();
		self.started = false;
		tracing::debug!("runtime disposed");
		Ok(())
	}

	/// Frees an index node; see [`IndexTree::release`].
	pub fn release(&mut self, node: NodeId) -> Result<()> {
		self.tree.release(node)
	}

	pub fn add_widgets(&mut self, widgets: Vec<WidgetRef>) -> Result<()> {
		self.tree.add_widgets(self.main_index, widgets)
	}

	pub fn remove_widgets(&mut self, widgets: &[WidgetRef]) -> Result<()> {
		self.tree.remove_widgets(self.main_index, widgets)
	}

	/// Applies a user refinement on `node`; see [`IndexTree::refine`].
	pub fn refine(&mut self, node: NodeId, update: impl FnOnce(&QueryState) -> QueryState) -> Result<bool> {
		self.tree.refine(node, update)
	}

	pub fn ui_state(&self) -> UiState {
		self.tree.ui_state()
	}

	/// Replaces the UI state of the whole tree and searches. Never calls the
	/// controlled-mode hook.
	pub fn set_ui_state(&mut self, ui_state: &UiState) -> Result<()> {
		self.tree.set_ui_state(ui_state)
	}

	pub fn create_url(&self, ui_state: &UiState) -> String {
		self.tree.create_url(ui_state)
	}

	/// Drains the scheduled work once. Returns `false` when nothing was
	/// scheduled.
	pub fn tick(&mut self) -> Result<bool> {
		let mut work = self.tree.scheduler_mut().take();
		if work.is_empty() {
			return Ok(false);
		}

		if work.controlled_state_change {
			self.apply_controlled_state()?;
			work = work.merge(self.tree.scheduler_mut().take());
		}

		if work.state_change && !self.ui_state_listeners.is_empty() {
			let ui_state = self.tree.ui_state();
			for listener in &mut self.ui_state_listeners {
				listener(&ui_state);
			}
		}

		if work.search {
			self.dispatch();
		}

		if work.stalled_render && !self.in_flight.is_empty() && self.stalled_deadline.is_none() {
			self.stalled_deadline = Some(Instant::now() + self.stalled_search_delay);
		}

		if work.render {
			self.render()?;
		}
		Ok(true)
	}

	fn apply_controlled_state(&mut self) -> Result<()> {
		let Some(hook) = self.state_change_hook.as_mut() else {
			self.tree.scheduler_mut().schedule_search();
			return Ok(());
		};
		let proposed = self.tree.ui_state();
		let next = hook(&proposed);
		self.tree.set_ui_state(&next)
	}

	fn dispatch(&mut self) {
		let Some(prepared) = self.tree.begin_search() else {
			return;
		};
		let id = prepared.id;
		let response = self.client.search(prepared.requests, self.tree.executor().headers());
		self.in_flight.push(response.map(move |response| (id, response)).boxed_local());
	}

	fn render(&mut self) -> Result<()> {
		if self.in_flight.is_empty() {
			self.stalled_deadline = None;
			self.tree.set_search_stalled(false);
		}
		match self.tree.root() {
			Some(root) => self.tree.render(root),
			None => Ok(()),
		}
	}

	fn deliver(&mut self, id: RoundTripId, response: std::result::Result<Vec<SearchResults>, ClientError>) {
		if let Completion::Failed(error) = self.tree.complete_search(id, response) {
			for listener in &mut self.error_listeners {
				listener(&error);
			}
		}
		// The render clears the stalled flag once nothing is in flight.
		if self.in_flight.is_empty() && self.stalled_deadline.is_some() {
			self.tree.scheduler_mut().schedule_render();
		}
	}

	/// Ticks and awaits round-trips until no work is scheduled and nothing is
	/// in flight. While a round-trip is outstanding past the stalled delay,
	/// the search is marked stalled and a render runs.
	pub async fn run_until_idle(&mut self) -> Result<()> {
		loop {
			while self.tick()? {}
			if self.in_flight.is_empty() {
				return Ok(());
			}

			let next = match self.stalled_deadline.filter(|_| !self.tree.is_search_stalled()) {
				Some(deadline) => match tokio::time::timeout_at(deadline, self.in_flight.next()).await {
					Ok(next) => next,
					Err(_) => {
						tracing::debug!("search stalled");
						self.tree.set_search_stalled(true);
						self.tree.scheduler_mut().schedule_render();
						continue;
					}
				},
				None => self.in_flight.next().await,
			};
			if let Some((id, response)) = next {
				self.deliver(id, response);
			}
		}
	}

	/// Searches the values of `facet_name` matching `facet_query` in `node`'s
	/// index, with `parameters` applied over the node's state.
	pub async fn search_for_facet_values(
		&self,
		node: NodeId,
		facet_name: &str,
		facet_query: &str,
		max_facet_hits: Option<u32>,
		parameters: &PlainParameters,
	) -> Result<FacetValuesResponse> {
		let state = self.tree.state(node)?.set_query_parameters(parameters);
		let request = FacetValuesRequest {
			index_name: state.index.clone(),
			facet_name: facet_name.to_owned(),
			facet_query: facet_query.to_owned(),
			max_facet_hits,
			params: state,
		};
		tracing::debug!(?node, facet = facet_name, "facet value search");
		let response = self
			.client
			.search_for_facet_values(request, self.tree.executor().headers());
		response.await.map_err(IndexError::from)
	}
}

impl<Client> std::fmt::Debug for SearchRuntime<Client> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SearchRuntime")
			.field("tree", &self.tree)
			.field("in_flight", &self.in_flight.len())
			.field("started", &self.started)
			.finish()
	}
}
