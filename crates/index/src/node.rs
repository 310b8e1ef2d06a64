//! Index node data and the arena holding it.
//!
//! Nodes reference each other by [`NodeId`] only: a node lists its children
//! as [`WidgetRef::Index`] entries and keeps a non-owning parent id, set while
//! it is live.

use std::sync::Arc;

use prism_params::{QueryState, SearchResults, merge_search_parameters};
use serde::{Deserialize, Serialize};
use slab::Slab;

use crate::error::{ConfigurationError, IndexError, Result};
use crate::ids::GenerationClock;
use crate::store::QueryStateStore;
use crate::ui_state::IndexUiState;
use crate::widget::WidgetRef;
use crate::{NodeId, SlotId};

/// Construction options of an index node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IndexOptions {
	/// Name of the searched collection.
	pub index_name: String,
	/// Key of the node's UI state fragment. Defaults to `index_name`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub index_id: Option<String>,
}

impl IndexOptions {
	pub fn new(index_name: impl Into<String>) -> Self {
		Self {
			index_name: index_name.into(),
			index_id: None,
		}
	}

	pub fn with_id(mut self, index_id: impl Into<String>) -> Self {
		self.index_id = Some(index_id.into());
		self
	}

	pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
		if self.index_name.trim().is_empty() {
			return Err(ConfigurationError::MissingIndexName);
		}
		Ok(())
	}

	/// Effective id.
	pub fn id(&self) -> &str {
		self.index_id.as_deref().unwrap_or(&self.index_name)
	}

	/// Option names reported in telemetry.
	pub(crate) fn param_names(&self) -> Vec<String> {
		let mut names = vec!["indexName".to_owned()];
		if self.index_id.is_some() {
			names.push("indexId".to_owned());
		}
		names
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
	#[default]
	Created,
	Live,
	Disposed,
}

#[derive(Debug)]
pub struct IndexNode {
	generation: u32,
	pub(crate) name: String,
	pub(crate) id: String,
	pub(crate) params: Vec<String>,
	pub(crate) children: Vec<WidgetRef>,
	pub(crate) store: Option<QueryStateStore>,
	pub(crate) ui_state: IndexUiState,
	pub(crate) parent: Option<NodeId>,
	pub(crate) slot: Option<SlotId>,
	pub(crate) results: Option<Arc<SearchResults>>,
	pub(crate) lifecycle: Lifecycle,
	/// Telemetry header last attached on behalf of this node.
	pub(crate) telemetry_header: Option<String>,
}

impl IndexNode {
	fn new(generation: u32, options: &IndexOptions) -> Self {
		Self {
			generation,
			name: options.index_name.clone(),
			id: options.id().to_owned(),
			params: options.param_names(),
			children: Vec::new(),
			store: None,
			ui_state: IndexUiState::new(),
			parent: None,
			slot: None,
			results: None,
			lifecycle: Lifecycle::Created,
			telemetry_header: None,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	/// Parent node, `None` for the root or while not live.
	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	pub fn widgets(&self) -> &[WidgetRef] {
		&self.children
	}

	/// Query state, `None` while not live.
	pub fn state(&self) -> Option<&QueryState> {
		self.store.as_ref().map(QueryStateStore::state)
	}

	pub fn store(&self) -> Option<&QueryStateStore> {
		self.store.as_ref()
	}

	/// Results of the last round-trip this node took part in.
	pub fn results(&self) -> Option<&Arc<SearchResults>> {
		self.results.as_ref()
	}

	pub fn ui_state(&self) -> &IndexUiState {
		&self.ui_state
	}

	pub fn lifecycle(&self) -> Lifecycle {
		self.lifecycle
	}

	pub fn is_live(&self) -> bool {
		self.lifecycle == Lifecycle::Live
	}

	pub fn slot(&self) -> Option<SlotId> {
		self.slot
	}

	/// Index children in child order.
	pub fn index_children(&self) -> impl Iterator<Item = NodeId> + '_ {
		self.children.iter().filter_map(WidgetRef::as_index)
	}
}

/// Storage for every node of a tree.
#[derive(Debug, Default)]
pub struct NodeArena {
	slab: Slab<IndexNode>,
	clock: GenerationClock,
}

impl NodeArena {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, options: &IndexOptions) -> NodeId {
		let generation = self.clock.next();
		let key = self.slab.insert(IndexNode::new(generation, options));
		NodeId::new(key, generation)
	}

	pub fn get(&self, id: NodeId) -> Option<&IndexNode> {
		self.slab.get(id.index()).filter(|node| node.generation == id.generation)
	}

	pub fn get_mut(&mut self, id: NodeId) -> Option<&mut IndexNode> {
		self.slab
			.get_mut(id.index())
			.filter(|node| node.generation == id.generation)
	}

	pub fn node(&self, id: NodeId) -> Result<&IndexNode> {
		self.get(id).ok_or(IndexError::UnknownNode(id))
	}

	pub fn node_mut(&mut self, id: NodeId) -> Result<&mut IndexNode> {
		self.get_mut(id).ok_or(IndexError::UnknownNode(id))
	}

	/// Frees the slot of `id`. Stale ids are ignored.
	pub fn remove(&mut self, id: NodeId) -> Option<IndexNode> {
		self.get(id)?;
		Some(self.slab.remove(id.index()))
	}

	/// Drops `child` from every child list still referencing it.
	pub(crate) fn forget_child(&mut self, child: NodeId) {
		for (_, node) in self.slab.iter_mut() {
			node.children.retain(|widget| widget.as_index() != Some(child));
		}
	}

	pub(crate) fn contains_index_id(&self, index_id: &str) -> bool {
		self.slab.iter().any(|(_, node)| node.id == index_id)
	}

	pub fn len(&self) -> usize {
		self.slab.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slab.is_empty()
	}

	/// Query sent on behalf of `id`: the states along the path from the root
	/// down to `id`, merged root first. `None` when `id` is not live.
	pub fn resolve_search_parameters(&self, id: NodeId) -> Option<QueryState> {
		let node = self.get(id)?;
		let mut path = vec![node.state()?];
		let mut current = node.parent;
		while let Some(parent) = current.and_then(|parent| self.get(parent)) {
			if let Some(state) = parent.state() {
				path.push(state);
			}
			current = parent.parent;
		}
		merge_search_parameters(path.into_iter().rev())
	}
}
