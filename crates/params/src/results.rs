use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::QueryState;

/// One query of a multi-query round-trip.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
	pub index_name: String,
	pub params: QueryState,
}

impl SearchRequest {
	pub fn new(params: QueryState) -> Self {
		Self {
			index_name: params.index.clone(),
			params,
		}
	}
}

/// Result snapshot for one query.
///
/// `state` is the query the engine answered, which may differ from the
/// current state of the node that issued it once the user keeps refining.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
	pub index: String,
	#[serde(default)]
	pub hits: Vec<Value>,
	#[serde(default)]
	pub nb_hits: u64,
	#[serde(default)]
	pub page: u32,
	#[serde(default)]
	pub nb_pages: u32,
	#[serde(default)]
	pub hits_per_page: u32,
	#[serde(default, rename = "processingTimeMS")]
	pub processing_time_ms: u64,
	/// Value counts per facet.
	#[serde(default)]
	pub facets: IndexMap<String, IndexMap<String, u64>>,
	#[serde(rename = "_state", default)]
	pub state: QueryState,
}

impl SearchResults {
	/// Empty results answering `state`.
	pub fn empty(state: QueryState) -> Self {
		Self {
			index: state.index.clone(),
			hits: Vec::new(),
			nb_hits: 0,
			page: state.page(),
			nb_pages: 0,
			hits_per_page: state.hits_per_page.unwrap_or(20),
			processing_time_ms: 0,
			facets: IndexMap::new(),
			state,
		}
	}

	pub fn with_hits(mut self, hits: Vec<Value>) -> Self {
		self.nb_hits = hits.len() as u64;
		self.nb_pages = u32::from(!hits.is_empty());
		self.hits = hits;
		self
	}

	/// Counts for `facet`, if the engine returned any.
	pub fn facet_values(&self, facet: &str) -> Option<&IndexMap<String, u64>> {
		self.facets.get(facet)
	}
}

/// One value returned by a facet value search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetHit {
	pub value: String,
	pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetValuesResponse {
	pub facet_hits: Vec<FacetHit>,
	#[serde(default)]
	pub exhaustive_facets_count: bool,
}
