//! Cross-index result flattening.
//!
//! A widget rendering in one index may read results from every index at its
//! own level and below: its index's siblings (or the root alone), each
//! followed by its index descendants in pre-order.

use std::sync::Arc;

use prism_params::{QueryState, SearchResults};

use crate::NodeId;
use crate::node::NodeArena;

/// Read-only view on one index, valid for the pass that produced it.
#[derive(Debug, Clone)]
pub struct ScopedResult {
	pub index_id: String,
	/// `None` until the index took part in a round-trip.
	pub results: Option<Arc<SearchResults>>,
	pub state: QueryState,
}

pub fn resolve_scoped_results(arena: &NodeArena, node: NodeId) -> Vec<ScopedResult> {
	let siblings: Vec<NodeId> = match arena.get(node).and_then(|entry| entry.parent()) {
		Some(parent) => arena
			.get(parent)
			.map(|parent| parent.index_children().collect())
			.unwrap_or_default(),
		None => vec![node],
	};
	let mut scoped = Vec::new();
	collect(arena, &siblings, &mut scoped);
	scoped
}

fn collect(arena: &NodeArena, nodes: &[NodeId], out: &mut Vec<ScopedResult>) {
	for &id in nodes {
		let Some(node) = arena.get(id) else {
			continue;
		};
		// Not live: no state to report, and its subtree was disposed with it.
		let Some(state) = node.state() else {
			continue;
		};
		out.push(ScopedResult {
			index_id: node.id().to_owned(),
			results: node.results().cloned(),
			state: state.clone(),
		});
		let children: Vec<NodeId> = node.index_children().collect();
		collect(arena, &children, out);
	}
}
