//! UI state: the externally addressable mirror of the index tree.
//!
//! Each index node contributes one [`IndexUiState`] fragment keyed by its id.
//! Nested indices are flattened into the same [`UiState`] map, so a tree of
//! any depth round-trips through a single query string.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::{IndexError, Result};

/// UI state fragment for one index node.
pub type IndexUiState = Map<String, Value>;

/// UI state for a whole tree, keyed by index id.
pub type UiState = IndexMap<String, IndexUiState>;

/// Encodes `ui_state` as `application/x-www-form-urlencoded` pairs, one per
/// index id, each value being the JSON fragment.
pub fn to_query_string(ui_state: &UiState) -> String {
	let mut serializer = form_urlencoded::Serializer::new(String::new());
	for (index_id, fragment) in ui_state {
		let json = Value::Object(fragment.clone()).to_string();
		serializer.append_pair(index_id, &json);
	}
	serializer.finish()
}

/// Decodes a query string produced by [`to_query_string`].
///
/// A leading `?` is ignored. Repeated index ids keep the last fragment.
pub fn from_query_string(query: &str) -> Result<UiState> {
	let query = query.strip_prefix('?').unwrap_or(query);
	let mut ui_state = UiState::new();
	for (index_id, json) in form_urlencoded::parse(query.as_bytes()) {
		let fragment: IndexUiState = serde_json::from_str(&json).map_err(|source| IndexError::UiState {
			index_id: index_id.to_string(),
			source,
		})?;
		ui_state.insert(index_id.into_owned(), fragment);
	}
	Ok(ui_state)
}
