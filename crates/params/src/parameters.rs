//! Search parameters and the identity-preserving [`QueryState`] handle.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::PlainParameters;

/// Plain search parameters for one index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParameters {
	/// Target index (collection) name.
	pub index: String,
	/// Full-text query.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub query: Option<String>,
	/// Zero-based page. `None` means "never paginated".
	#[serde(skip_serializing_if = "Option::is_none")]
	pub page: Option<u32>,
	/// Number of hits per page.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hits_per_page: Option<u32>,
	/// Raw filter expression forwarded untouched.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub filters: Option<String>,
	/// Conjunctive facets.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub facets: Vec<String>,
	/// Disjunctive facets.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub disjunctive_facets: Vec<String>,
	/// Selected values per conjunctive facet.
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub facets_refinements: IndexMap<String, Vec<String>>,
	/// Selected values per disjunctive facet.
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub disjunctive_facets_refinements: IndexMap<String, Vec<String>>,
	/// Numeric bounds per attribute, keyed by operator (`=`, `>=`, `<` ...).
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub numeric_refinements: IndexMap<String, IndexMap<String, Vec<f64>>>,
	/// Tag filters.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub tag_refinements: Vec<String>,
	/// Any other engine parameter, passed through as-is.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl SearchParameters {
	/// Creates parameters targeting `index` with nothing else set.
	pub fn new(index: impl Into<String>) -> Self {
		Self {
			index: index.into(),
			..Self::default()
		}
	}
}

/// Shared immutable handle over [`SearchParameters`].
///
/// Cloning is cheap and preserves identity. Every builder returns either a new
/// handle or `self` unchanged when the result would be equal, so that
/// identity comparison is a reliable change signal.
#[derive(Clone, Default)]
pub struct QueryState(Arc<SearchParameters>);

impl QueryState {
	/// Empty state scoped to `index`.
	pub fn new(index: impl Into<String>) -> Self {
		Self(Arc::new(SearchParameters::new(index)))
	}

	/// Wraps owned parameters in a fresh handle.
	pub fn from_parameters(parameters: SearchParameters) -> Self {
		Self(Arc::new(parameters))
	}

	/// Returns `true` when both handles point to the same parameters.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}

	/// Borrows the underlying parameters.
	pub fn parameters(&self) -> &SearchParameters {
		&self.0
	}

	/// Current page, defaulting to 0.
	pub fn page(&self) -> u32 {
		self.0.page.unwrap_or(0)
	}

	/// Applies `f` to a copy; returns `self` when nothing changed.
	pub fn update(&self, f: impl FnOnce(&mut SearchParameters)) -> Self {
		let mut next = (*self.0).clone();
		f(&mut next);
		if next == *self.0 { self.clone() } else { Self(Arc::new(next)) }
	}

	/// Resets pagination. States that were never paginated are returned as-is.
	pub fn with_page_reset(&self) -> Self {
		match self.0.page {
			None | Some(0) => self.clone(),
			Some(_) => self.update(|p| p.page = Some(0)),
		}
	}

	pub fn with_page(&self, page: u32) -> Self {
		self.update(|p| p.page = Some(page))
	}

	pub fn with_query(&self, query: impl Into<String>) -> Self {
		let query = query.into();
		self.update(|p| p.query = Some(query))
	}

	pub fn with_hits_per_page(&self, hits_per_page: u32) -> Self {
		self.update(|p| p.hits_per_page = Some(hits_per_page))
	}

	pub fn with_index(&self, index: impl Into<String>) -> Self {
		let index = index.into();
		self.update(|p| p.index = index)
	}

	/// Sets one pass-through engine parameter.
	pub fn with_extra(&self, key: impl Into<String>, value: Value) -> Self {
		let key = key.into();
		self.update(|p| {
			p.extra.insert(key, value);
		})
	}

	/// Applies every field present in `partial`.
	pub fn set_query_parameters(&self, partial: &PlainParameters) -> Self {
		self.update(|p| partial.apply_to(p))
	}

	/// Declares a conjunctive facet.
	pub fn add_facet(&self, facet: &str) -> Self {
		self.update(|p| push_unique(&mut p.facets, facet))
	}

	/// Declares a disjunctive facet.
	pub fn add_disjunctive_facet(&self, facet: &str) -> Self {
		self.update(|p| push_unique(&mut p.disjunctive_facets, facet))
	}

	pub fn add_facet_refinement(&self, facet: &str, value: &str) -> Self {
		self.update(|p| push_unique(p.facets_refinements.entry(facet.to_string()).or_default(), value))
	}

	pub fn remove_facet_refinement(&self, facet: &str, value: &str) -> Self {
		self.update(|p| remove_value(&mut p.facets_refinements, facet, value))
	}

	pub fn add_disjunctive_facet_refinement(&self, facet: &str, value: &str) -> Self {
		self.update(|p| {
			push_unique(p.disjunctive_facets_refinements.entry(facet.to_string()).or_default(), value);
		})
	}

	pub fn remove_disjunctive_facet_refinement(&self, facet: &str, value: &str) -> Self {
		self.update(|p| remove_value(&mut p.disjunctive_facets_refinements, facet, value))
	}

	/// Adds the refinement when absent, removes it otherwise.
	pub fn toggle_disjunctive_facet_refinement(&self, facet: &str, value: &str) -> Self {
		if self.is_disjunctive_facet_refined(facet, value) {
			self.remove_disjunctive_facet_refinement(facet, value)
		} else {
			self.add_disjunctive_facet_refinement(facet, value)
		}
	}

	/// Adds `attribute operator value`. Non-finite values are ignored.
	pub fn add_numeric_refinement(&self, attribute: &str, operator: &str, value: f64) -> Self {
		if !value.is_finite() {
			return self.clone();
		}
		self.update(|p| {
			let values = p
				.numeric_refinements
				.entry(attribute.to_string())
				.or_default()
				.entry(operator.to_string())
				.or_default();
			if !values.contains(&value) {
				values.push(value);
			}
		})
	}

	/// Removes `attribute operator value`, or every value of the operator
	/// when `value` is `None`.
	pub fn remove_numeric_refinement(&self, attribute: &str, operator: &str, value: Option<f64>) -> Self {
		self.update(|p| {
			let Some(operators) = p.numeric_refinements.get_mut(attribute) else {
				return;
			};
			match value {
				Some(value) => {
					if let Some(values) = operators.get_mut(operator) {
						values.retain(|v| *v != value);
						if values.is_empty() {
							operators.shift_remove(operator);
						}
					}
				}
				None => {
					operators.shift_remove(operator);
				}
			}
			if operators.is_empty() {
				p.numeric_refinements.shift_remove(attribute);
			}
		})
	}

	pub fn add_tag_refinement(&self, tag: &str) -> Self {
		self.update(|p| push_unique(&mut p.tag_refinements, tag))
	}

	/// Clears refinements for `attribute`, or every refinement when `None`.
	pub fn clear_refinements(&self, attribute: Option<&str>) -> Self {
		self.update(|p| match attribute {
			Some(attr) => {
				p.facets_refinements.shift_remove(attr);
				p.disjunctive_facets_refinements.shift_remove(attr);
				p.numeric_refinements.shift_remove(attr);
			}
			None => {
				p.facets_refinements.clear();
				p.disjunctive_facets_refinements.clear();
				p.numeric_refinements.clear();
				p.tag_refinements.clear();
			}
		})
	}

	pub fn is_facet_refined(&self, facet: &str, value: &str) -> bool {
		is_refined(&self.0.facets_refinements, facet, value)
	}

	pub fn is_disjunctive_facet_refined(&self, facet: &str, value: &str) -> bool {
		is_refined(&self.0.disjunctive_facets_refinements, facet, value)
	}
}

fn push_unique(values: &mut Vec<String>, value: &str) {
	if !values.iter().any(|v| v == value) {
		values.push(value.to_string());
	}
}

fn remove_value(map: &mut IndexMap<String, Vec<String>>, facet: &str, value: &str) {
	let Some(values) = map.get_mut(facet) else {
		return;
	};
	values.retain(|v| v != value);
	if values.is_empty() {
		map.shift_remove(facet);
	}
}

fn is_refined(map: &IndexMap<String, Vec<String>>, facet: &str, value: &str) -> bool {
	map.get(facet).is_some_and(|values| values.iter().any(|v| v == value))
}

impl Deref for QueryState {
	type Target = SearchParameters;

	fn deref(&self) -> &SearchParameters {
		&self.0
	}
}

impl fmt::Debug for QueryState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl From<SearchParameters> for QueryState {
	fn from(parameters: SearchParameters) -> Self {
		Self::from_parameters(parameters)
	}
}

impl Serialize for QueryState {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.0.serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for QueryState {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		SearchParameters::deserialize(deserializer).map(Self::from_parameters)
	}
}
