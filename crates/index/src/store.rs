//! Query state store.
//!
//! Holds one [`QueryState`] and emits a [`ChangeEvent`] only when a new,
//! non-identical state is set. The owning tree subscribes the two
//! [`ChangePhase`]s and runs them after every accepted change; external code
//! may add plain observers with [`QueryStateStore::on_change`].

use std::fmt;
use std::sync::Arc;

use prism_params::{QueryState, SearchResults};

use crate::SubscriptionId;
use crate::ui_state::IndexUiState;

/// Options for [`QueryStateStore::set_state`].
#[derive(Debug, Clone, Default)]
pub struct SetStateOptions {
	/// The change resets pagination and must cascade to descendant indices.
	pub is_page_reset: bool,
	/// UI state fragment that seeds the recomputed fragment.
	pub ui_state: Option<IndexUiState>,
}

impl SetStateOptions {
	pub fn page_reset() -> Self {
		Self {
			is_page_reset: true,
			ui_state: None,
		}
	}

	pub fn with_ui_state(ui_state: IndexUiState) -> Self {
		Self {
			is_page_reset: false,
			ui_state: Some(ui_state),
		}
	}
}

/// Payload of an accepted state change.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
	pub state: QueryState,
	pub last_results: Option<Arc<SearchResults>>,
	pub is_page_reset: bool,
	pub ui_state: Option<IndexUiState>,
}

/// Tree-owned reactions to a change, run in subscription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePhase {
	/// Subscribed before children are initialized: cascades page resets to
	/// every descendant index.
	PageReset,
	/// Subscribed once children are initialized: recomputes the node's UI
	/// state fragment and notifies the runtime.
	UiStateSync,
}

type Observer = Box<dyn FnMut(&ChangeEvent)>;

pub struct QueryStateStore {
	state: QueryState,
	last_results: Option<Arc<SearchResults>>,
	phases: Vec<ChangePhase>,
	observers: Vec<(SubscriptionId, Observer)>,
	next_subscription: u64,
}

impl QueryStateStore {
	pub fn new(state: QueryState) -> Self {
		Self {
			state,
			last_results: None,
			phases: Vec::new(),
			observers: Vec::new(),
			next_subscription: 0,
		}
	}

	pub fn state(&self) -> &QueryState {
		&self.state
	}

	pub fn last_results(&self) -> Option<&Arc<SearchResults>> {
		self.last_results.as_ref()
	}

	pub(crate) fn set_last_results(&mut self, results: Arc<SearchResults>) {
		self.last_results = Some(results);
	}

	/// Replaces the state unless `next` is the current handle.
	///
	/// Observers are called before the event is returned; the caller runs the
	/// subscribed phases afterwards.
	pub fn set_state(&mut self, next: QueryState, options: SetStateOptions) -> Option<ChangeEvent> {
		if next.ptr_eq(&self.state) {
			return None;
		}
		self.state = next;
		let event = ChangeEvent {
			state: self.state.clone(),
			last_results: self.last_results.clone(),
			is_page_reset: options.is_page_reset,
			ui_state: options.ui_state,
		};
		for (_, observer) in &mut self.observers {
			observer(&event);
		}
		Some(event)
	}

	pub fn subscribe(&mut self, phase: ChangePhase) {
		self.phases.push(phase);
	}

	/// Phases in subscription order.
	pub fn phases(&self) -> &[ChangePhase] {
		&self.phases
	}

	pub fn on_change(&mut self, observer: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
		self.next_subscription += 1;
		let id = SubscriptionId(self.next_subscription);
		self.observers.push((id, Box::new(observer)));
		id
	}

	/// Returns `false` when `id` was not subscribed.
	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		let before = self.observers.len();
		self.observers.retain(|(sub, _)| *sub != id);
		self.observers.len() != before
	}

	/// Drops every phase and observer.
	pub fn remove_all_listeners(&mut self) {
		self.phases.clear();
		self.observers.clear();
	}
}

impl fmt::Debug for QueryStateStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QueryStateStore")
			.field("state", &self.state)
			.field("has_results", &self.last_results.is_some())
			.field("phases", &self.phases)
			.field("observers", &self.observers.len())
			.finish()
	}
}
