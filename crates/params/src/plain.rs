use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SearchParameters;

/// A partial set of parameters. Only the fields that are `Some` (or the
/// non-empty `extra` entries) are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlainParameters {
	pub index: Option<String>,
	pub query: Option<String>,
	pub page: Option<u32>,
	pub hits_per_page: Option<u32>,
	pub filters: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl PlainParameters {
	/// Writes every present field into `target`.
	pub fn apply_to(&self, target: &mut SearchParameters) {
		if let Some(index) = &self.index {
			target.index.clone_from(index);
		}
		if let Some(query) = &self.query {
			target.query = Some(query.clone());
		}
		if let Some(page) = self.page {
			target.page = Some(page);
		}
		if let Some(hits_per_page) = self.hits_per_page {
			target.hits_per_page = Some(hits_per_page);
		}
		if let Some(filters) = &self.filters {
			target.filters = Some(filters.clone());
		}
		for (key, value) in &self.extra {
			target.extra.insert(key.clone(), value.clone());
		}
	}

	pub fn is_empty(&self) -> bool {
		self.index.is_none()
			&& self.query.is_none()
			&& self.page.is_none()
			&& self.hits_per_page.is_none()
			&& self.filters.is_none()
			&& self.extra.is_empty()
	}
}
