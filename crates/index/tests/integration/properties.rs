//! Behavioral properties of the index tree.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use prism_index::reconcile::{derive_query_state, derive_ui_state};
use prism_index::{
	IndexOptions, NodeId, QueryState, RuntimeOptions, SearchParametersContext, SearchRuntime, SetStateOptions,
	UiState, UiStateContext, WidgetRef,
};
use proptest::prelude::*;
use serde_json::json;

use crate::common::{Probe, RecordingClient, RefinementList, SearchBox, fragment, init_tracing};

fn widgets() -> Vec<WidgetRef> {
	vec![
		Rc::new(SearchBox::default()).into(),
		Rc::new(RefinementList { attribute: "brand" }).into(),
		Rc::new(RefinementList { attribute: "color" }).into(),
	]
}

fn runtime(client: &Rc<RecordingClient>) -> SearchRuntime<Rc<RecordingClient>> {
	init_tracing();
	SearchRuntime::new(Rc::clone(client), RuntimeOptions::new("products")).unwrap()
}

fn index(runtime: &mut SearchRuntime<Rc<RecordingClient>>, name: &str) -> NodeId {
	runtime.tree_mut().create_index(IndexOptions::new(name)).unwrap()
}

fn dedup(mut values: Vec<String>) -> Vec<String> {
	values.sort();
	values.dedup();
	values
}

fn ui_fragment() -> impl Strategy<Value = prism_index::IndexUiState> {
	let values = prop::collection::vec("[a-z]{1,6}", 0..4);
	(prop::option::of("[a-z]{1,8}"), values.clone(), values).prop_map(|(query, brands, colors)| {
		let mut ui_state = fragment(json!({}));
		if let Some(query) = query {
			ui_state.insert("query".into(), json!(query));
		}
		let mut list = serde_json::Map::new();
		let brands = dedup(brands);
		let colors = dedup(colors);
		if !brands.is_empty() {
			list.insert("brand".into(), json!(brands));
		}
		if !colors.is_empty() {
			list.insert("color".into(), json!(colors));
		}
		if !list.is_empty() {
			ui_state.insert("refinementList".into(), json!(list));
		}
		ui_state
	})
}

proptest! {
	#[test]
	fn reconciliation_is_reference_stable(ui_state in ui_fragment()) {
		let widgets = widgets();
		let ctx = SearchParametersContext { ui_state: &ui_state };
		let first = derive_query_state(&widgets, &ctx, QueryState::new("products"));
		let second = derive_query_state(&widgets, &ctx, first.clone());
		prop_assert!(second.ptr_eq(&first));
	}

	#[test]
	fn ui_state_round_trips(ui_state in ui_fragment()) {
		let widgets = widgets();
		let state = derive_query_state(&widgets, &SearchParametersContext { ui_state: &ui_state }, QueryState::new("products"));
		let first = derive_ui_state(&widgets, &UiStateContext { state: &state }, Default::default());
		let state = derive_query_state(&widgets, &SearchParametersContext { ui_state: &first }, state.clone());
		let second = derive_ui_state(&widgets, &UiStateContext { state: &state }, Default::default());
		prop_assert_eq!(&first, &second);
		prop_assert_eq!(&first, &ui_state);
	}
}

#[tokio::test(flavor = "current_thread")]
async fn applying_the_same_ui_state_twice_emits_no_change() {
	let client = RecordingClient::new();
	let mut runtime = runtime(&client);
	runtime.add_widgets(widgets()).unwrap();
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();

	let changes = Rc::new(Cell::new(0));
	let counter = Rc::clone(&changes);
	let main = runtime.main_index();
	runtime.tree_mut().on_change(main, move |_| counter.set(counter.get() + 1)).unwrap();

	let mut ui_state = UiState::new();
	ui_state.insert("products".into(), fragment(json!({ "query": "phone", "refinementList": { "brand": ["apple"] } })));
	runtime.set_ui_state(&ui_state).unwrap();
	runtime.set_ui_state(&ui_state).unwrap();
	assert_eq!(changes.get(), 1);
	assert_eq!(runtime.ui_state(), ui_state);
}

#[tokio::test(flavor = "current_thread")]
async fn every_index_shares_one_round_trip() {
	let client = RecordingClient::new();
	let mut runtime = runtime(&client);
	let a = index(&mut runtime, "a");
	let b = index(&mut runtime, "b");
	let b1 = index(&mut runtime, "b1");
	runtime.tree_mut().add_widgets(b, vec![b1.into()]).unwrap();
	runtime.add_widgets(vec![a.into(), b.into()]).unwrap();

	let results = Rc::new(Cell::new(0));
	runtime.start().unwrap();
	for node in [runtime.main_index(), a, b, b1] {
		let slot = runtime.tree().node(node).unwrap().slot().unwrap();
		let counter = Rc::clone(&results);
		runtime
			.tree_mut()
			.executor_mut()
			.on_result(slot, move |_| counter.set(counter.get() + 1));
	}
	runtime.run_until_idle().await.unwrap();

	assert_eq!(client.call_count(), 1);
	let indices: Vec<String> = client.last_call().requests.into_iter().map(|r| r.index_name).collect();
	assert_eq!(indices, vec!["products", "a", "b", "b1"]);
	assert_eq!(results.get(), 4);
	assert_eq!(runtime.tree().executor().dispatched_total(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn page_reset_cascades_through_three_levels() {
	let client = RecordingClient::new();
	let mut runtime = runtime(&client);
	let child = index(&mut runtime, "child");
	let grandchild = index(&mut runtime, "grandchild");
	runtime.tree_mut().add_widgets(child, vec![grandchild.into()]).unwrap();
	runtime.add_widgets(vec![child.into()]).unwrap();
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();

	let root = runtime.main_index();
	for node in [root, child, grandchild] {
		let paged = runtime.tree().state(node).unwrap().with_page(3);
		runtime.tree_mut().set_state(node, paged, SetStateOptions::default()).unwrap();
	}
	let before = client.call_count();

	runtime.refine(root, |state| state.with_query("phone")).unwrap();
	runtime.run_until_idle().await.unwrap();

	for node in [root, child, grandchild] {
		assert_eq!(runtime.tree().state(node).unwrap().page(), 0);
	}
	assert_eq!(client.call_count(), before + 1);
	assert!(client.last_call().requests.iter().all(|request| request.params.page() == 0));
}

#[tokio::test(flavor = "current_thread")]
async fn sibling_indices_see_each_other() {
	let client = RecordingClient::new();
	let mut runtime = runtime(&client);
	let a = index(&mut runtime, "a");
	let b = index(&mut runtime, "b");
	let probe_a = Rc::new(Probe::default());
	let probe_b = Rc::new(Probe::default());
	runtime.tree_mut().add_widgets(a, vec![Rc::clone(&probe_a).into()]).unwrap();
	runtime.tree_mut().add_widgets(b, vec![Rc::clone(&probe_b).into()]).unwrap();
	runtime.add_widgets(vec![a.into(), b.into()]).unwrap();
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();

	assert_eq!(*probe_a.scoped_ids.borrow(), vec!["a", "b"]);
	assert_eq!(*probe_b.scoped_ids.borrow(), vec!["a", "b"]);
	assert_eq!(probe_a.hits.get(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn disposal_before_delivery_silences_the_node() {
	let client = RecordingClient::new();
	let mut runtime = runtime(&client);
	let a = index(&mut runtime, "a");
	let probe = Rc::new(Probe::default());
	runtime.tree_mut().add_widgets(a, vec![Rc::clone(&probe).into()]).unwrap();
	runtime.add_widgets(vec![a.into()]).unwrap();
	runtime.start().unwrap();

	let delivered = Rc::new(RefCell::new(Vec::new()));
	let slot = runtime.tree().node(a).unwrap().slot().unwrap();
	let sink = Rc::clone(&delivered);
	runtime
		.tree_mut()
		.executor_mut()
		.on_result(slot, move |event| sink.borrow_mut().push(event.slot));

	assert!(runtime.tick().unwrap());
	assert_eq!(runtime.pending_round_trips(), 1);
	runtime.remove_widgets(&[a.into()]).unwrap();
	runtime.run_until_idle().await.unwrap();

	assert!(delivered.borrow().is_empty());
	assert_eq!(probe.renders.get(), 0);
	assert_eq!(probe.disposals.get(), 1);
	assert!(runtime.tree().results(a).unwrap().is_none());
	assert!(!runtime.tree().executor().is_attached(slot));
}

#[tokio::test(flavor = "current_thread")]
async fn adding_a_widget_initializes_only_that_widget() {
	let client = RecordingClient::new();
	let mut runtime = runtime(&client);
	let x = Rc::new(Probe::default());
	let y = Rc::new(Probe::default());
	runtime
		.add_widgets(vec![Rc::clone(&x).into(), Rc::clone(&y).into()])
		.unwrap();
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();
	let before = client.call_count();

	let z = Rc::new(Probe::default());
	runtime.add_widgets(vec![Rc::clone(&z).into()]).unwrap();
	runtime.run_until_idle().await.unwrap();

	assert_eq!((x.inits.get(), y.inits.get(), z.inits.get()), (1, 1, 1));
	assert_eq!(client.call_count(), before + 1);
	assert_eq!(z.renders.get(), 1);
}
