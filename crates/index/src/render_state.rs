//! Render state shared by every node of a tree.
//!
//! Widgets contribute slices through [`Widget::get_render_state`]. Each
//! contribution replaces the whole map with a merged copy, so a snapshot
//! taken at the start of a pass never changes under its reader.
//!
//! [`Widget::get_render_state`]: crate::Widget::get_render_state

use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Render state of one index node.
pub type IndexRenderState = Map<String, Value>;

/// Render state of a whole tree, keyed by index id.
pub type RenderState = IndexMap<String, IndexRenderState>;

pub struct RenderStateStore {
	snap: ArcSwap<RenderState>,
}

impl Default for RenderStateStore {
	fn default() -> Self {
		Self::new()
	}
}

impl RenderStateStore {
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(RenderState::new()),
		}
	}

	#[inline]
	pub fn snapshot(&self) -> Arc<RenderState> {
		self.snap.load_full()
	}

	/// Current render state of one index, empty when it has none yet.
	pub fn index(&self, index_id: &str) -> IndexRenderState {
		self.snap.load().get(index_id).cloned().unwrap_or_default()
	}

	/// Merges `slice` into the render state of `index_id`. Keys of `slice`
	/// replace existing keys; other keys are kept.
	pub fn merge(&self, index_id: &str, slice: IndexRenderState) {
		if slice.is_empty() {
			return;
		}
		self.snap.rcu(|cur| {
			let mut next = (**cur).clone();
			let entry = next.entry(index_id.to_owned()).or_default();
			for (key, value) in &slice {
				entry.insert(key.clone(), value.clone());
			}
			next
		});
	}

	/// Drops the render state of `index_id`.
	pub fn remove(&self, index_id: &str) {
		self.snap.rcu(|cur| {
			let mut next = (**cur).clone();
			next.shift_remove(index_id);
			next
		});
	}
}

impl std::fmt::Debug for RenderStateStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RenderStateStore")
			.field("indices", &self.snap.load().len())
			.finish()
	}
}
