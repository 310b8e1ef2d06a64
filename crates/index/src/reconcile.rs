//! Folds over an index node's widget list.
//!
//! Both folds skip index children (they keep their own fragment and state)
//! and run left to right in child order, so a later widget may override an
//! earlier widget's choices. Widgets lacking the capability are an identity
//! step. Neither fold deduplicates: a widget must produce the same output when
//! its contribution is already present in the input.

use prism_params::QueryState;

use crate::ui_state::IndexUiState;
use crate::widget::{SearchParametersContext, UiStateContext, WidgetCapabilities, WidgetRef};

/// Folds `get_widget_ui_state` over the non-index widgets, starting at `seed`.
///
/// Widgets that only expose the deprecated `get_widget_state` accessor are
/// folded through it.
pub fn derive_ui_state(widgets: &[WidgetRef], ctx: &UiStateContext<'_>, seed: IndexUiState) -> IndexUiState {
	widgets
		.iter()
		.filter_map(WidgetRef::as_widget)
		.fold(seed, |ui_state, widget| {
			let caps = widget.capabilities();
			if caps.contains(WidgetCapabilities::UI_STATE) {
				widget.get_widget_ui_state(ui_state, ctx)
			} else if caps.contains(WidgetCapabilities::LEGACY_UI_STATE) {
				widget.get_widget_state(ui_state, ctx)
			} else {
				ui_state
			}
		})
}

/// Folds `get_widget_search_parameters` over the non-index widgets, starting
/// at `initial`.
pub fn derive_query_state(widgets: &[WidgetRef], ctx: &SearchParametersContext<'_>, initial: QueryState) -> QueryState {
	widgets
		.iter()
		.filter_map(WidgetRef::as_widget)
		.filter(|widget| widget.capabilities().contains(WidgetCapabilities::SEARCH_PARAMETERS))
		.fold(initial, |state, widget| widget.get_widget_search_parameters(state, ctx))
}
