use crate::{QueryState, SearchParameters};

/// Merges `states` left to right into a single query.
///
/// Scalar fields set on a later state override earlier ones, facet lists and
/// tag refinements are unioned, and refinement maps are merged per attribute
/// with the later state winning. A single state is returned as the same
/// handle; an empty input yields `None`.
pub fn merge_search_parameters<'a, I>(states: I) -> Option<QueryState>
where
	I: IntoIterator<Item = &'a QueryState>,
{
	let mut iter = states.into_iter();
	let first = iter.next()?.clone();
	Some(iter.fold(first, |left, right| merge_pair(&left, right)))
}

fn merge_pair(left: &QueryState, right: &QueryState) -> QueryState {
	if left.ptr_eq(right) {
		return left.clone();
	}
	let right: &SearchParameters = right;
	left.update(|merged| {
		merged.index.clone_from(&right.index);
		if right.query.is_some() {
			merged.query.clone_from(&right.query);
		}
		if right.page.is_some() {
			merged.page = right.page;
		}
		if right.hits_per_page.is_some() {
			merged.hits_per_page = right.hits_per_page;
		}
		if right.filters.is_some() {
			merged.filters.clone_from(&right.filters);
		}
		union(&mut merged.facets, &right.facets);
		union(&mut merged.disjunctive_facets, &right.disjunctive_facets);
		union(&mut merged.tag_refinements, &right.tag_refinements);
		for (facet, values) in &right.facets_refinements {
			merged.facets_refinements.insert(facet.clone(), values.clone());
		}
		for (facet, values) in &right.disjunctive_facets_refinements {
			merged.disjunctive_facets_refinements.insert(facet.clone(), values.clone());
		}
		for (attribute, operators) in &right.numeric_refinements {
			merged.numeric_refinements.insert(attribute.clone(), operators.clone());
		}
		for (key, value) in &right.extra {
			merged.extra.insert(key.clone(), value.clone());
		}
	})
}

fn union(into: &mut Vec<String>, from: &[String]) {
	for value in from {
		if !into.contains(value) {
			into.push(value.clone());
		}
	}
}
