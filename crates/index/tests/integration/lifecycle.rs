//! Runtime lifecycle: start, routing, telemetry and teardown.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use prism_index::ui_state::{from_query_string, to_query_string};
use prism_index::{
	ConfigurationError, IndexError, IndexOptions, PackedTelemetryEncoder, RuntimeOptions, SearchRuntime,
	TELEMETRY_HEADER, UiState, WidgetRef,
};
use serde_json::json;

use crate::common::{RecordingClient, SearchBox, fragment, init_tracing};

fn runtime_with(
	client: &Rc<RecordingClient>,
	options: RuntimeOptions,
) -> (SearchRuntime<Rc<RecordingClient>>, Rc<SearchBox>) {
	init_tracing();
	let mut runtime = SearchRuntime::new(Rc::clone(client), options).unwrap();
	let search_box = Rc::new(SearchBox::default());
	runtime.add_widgets(vec![Rc::clone(&search_box).into()]).unwrap();
	(runtime, search_box)
}

fn query_of(ui_state: &UiState) -> Option<String> {
	ui_state
		.get("products")?
		.get("query")?
		.as_str()
		.map(str::to_owned)
}

#[tokio::test]
async fn controlled_mode_searches_with_the_state_returned_by_the_hook() {
	let client = RecordingClient::new();
	let (mut runtime, _) = runtime_with(&client, RuntimeOptions::new("products"));
	let proposed = Rc::new(RefCell::new(Vec::new()));
	let notified = Rc::new(RefCell::new(Vec::new()));
	{
		let proposed = Rc::clone(&proposed);
		runtime.on_state_change(move |ui_state: &UiState| {
			proposed.borrow_mut().push(query_of(ui_state));
			UiState::from([("products".to_owned(), fragment(json!({ "query": "forced" })))])
		});
		let notified = Rc::clone(&notified);
		runtime.on_ui_state_change(move |ui_state: &UiState| notified.borrow_mut().push(query_of(ui_state)));
	}
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();
	assert_eq!(client.call_count(), 1);
	assert!(proposed.borrow().is_empty());

	let root = runtime.main_index();
	runtime.refine(root, |state| state.with_query("typed")).unwrap();
	runtime.run_until_idle().await.unwrap();

	assert_eq!(*proposed.borrow(), vec![Some("typed".to_owned())]);
	assert_eq!(notified.borrow().last().cloned().flatten().as_deref(), Some("forced"));
	assert_eq!(client.call_count(), 2);
	let call = client.last_call();
	assert_eq!(call.requests[0].params.query.as_deref(), Some("forced"));
	assert_eq!(query_of(&runtime.ui_state()).as_deref(), Some("forced"));
}

#[tokio::test]
async fn refinement_notifies_ui_state_listeners() {
	let client = RecordingClient::new();
	let (mut runtime, _) = runtime_with(&client, RuntimeOptions::new("products"));
	let notified = Rc::new(RefCell::new(Vec::new()));
	{
		let notified = Rc::clone(&notified);
		runtime.on_ui_state_change(move |ui_state: &UiState| notified.borrow_mut().push(ui_state.clone()));
	}
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();

	let root = runtime.main_index();
	assert!(runtime.refine(root, |state| state.with_query("phone")).unwrap());
	runtime.run_until_idle().await.unwrap();

	let last = notified.borrow().last().cloned().unwrap();
	assert_eq!(last, UiState::from([("products".to_owned(), fragment(json!({ "query": "phone" })))]));
	assert_eq!(client.last_call().requests[0].params.query.as_deref(), Some("phone"));
}

#[tokio::test]
async fn initial_ui_state_from_a_url_drives_the_first_search() {
	let client = RecordingClient::new();
	let wanted = UiState::from([("products".to_owned(), fragment(json!({ "query": "tv" })))]);
	let mut options = RuntimeOptions::new("products");
	options.initial_ui_state = from_query_string(&format!("?{}", to_query_string(&wanted))).unwrap();
	let (mut runtime, _) = runtime_with(&client, options);

	runtime.start().unwrap();
	assert_eq!(runtime.ui_state(), wanted);
	runtime.run_until_idle().await.unwrap();

	assert_eq!(client.call_count(), 1);
	assert_eq!(client.last_call().requests[0].params.query.as_deref(), Some("tv"));
}

#[tokio::test]
async fn widgets_build_urls_for_a_hypothetical_state() {
	let client = RecordingClient::new();
	let (mut runtime, search_box) = runtime_with(&client, RuntimeOptions::new("products"));
	runtime.start().unwrap();

	let url = search_box.last_url.borrow().clone().unwrap();
	let decoded = from_query_string(&url).unwrap();
	assert_eq!(query_of(&decoded).as_deref(), Some("shoes"));
	// Building a URL never moves the live state.
	assert_eq!(query_of(&runtime.ui_state()), None);
}

#[tokio::test]
async fn telemetry_header_is_sent_only_when_it_changes() {
	let client = RecordingClient::new();
	let (mut runtime, _) = runtime_with(&client, RuntimeOptions::new("products"));
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();

	let first = client.last_call();
	let header = first.headers.get(TELEMETRY_HEADER).unwrap();
	let payload = PackedTelemetryEncoder::decode(header).unwrap();
	let types: Vec<&str> = payload.widgets.iter().map(|usage| usage.widget_type.as_str()).collect();
	assert!(types.contains(&"index"));
	assert!(types.contains(&"searchBox"));

	let root = runtime.main_index();
	runtime.refine(root, |state| state.with_query("phone")).unwrap();
	runtime.run_until_idle().await.unwrap();

	assert_eq!(client.call_count(), 2);
	assert!(client.last_call().headers.get(TELEMETRY_HEADER).is_none());
}

#[tokio::test]
async fn restart_after_dispose_initializes_again() {
	let client = RecordingClient::new();
	let (mut runtime, search_box) = runtime_with(&client, RuntimeOptions::new("products"));
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();

	runtime.dispose().unwrap();
	assert!(!runtime.is_started());
	assert_eq!(search_box.disposals.get(), 1);
	assert!(!runtime.tree().node(runtime.main_index()).unwrap().is_live());

	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();
	assert_eq!(search_box.inits.get(), 2);
	assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn removing_the_last_widget_does_not_search() {
	let client = RecordingClient::new();
	let (mut runtime, search_box) = runtime_with(&client, RuntimeOptions::new("products"));
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();

	let widget: WidgetRef = Rc::clone(&search_box).into();
	runtime.remove_widgets(&[widget]).unwrap();
	runtime.run_until_idle().await.unwrap();

	assert_eq!(search_box.disposals.get(), 1);
	assert!(runtime.tree().node(runtime.main_index()).unwrap().widgets().is_empty());
	assert_eq!(client.call_count(), 1);
}

#[test]
fn adding_nothing_is_rejected() {
	let client = RecordingClient::new();
	let (mut runtime, _) = runtime_with(&client, RuntimeOptions::new("products"));
	let error = runtime.add_widgets(Vec::new()).unwrap_err();
	assert!(matches!(
		error,
		IndexError::Configuration(ConfigurationError::EmptyWidgetList)
	));
}

#[tokio::test]
async fn released_subtrees_free_their_slots() {
	let client = RecordingClient::new();
	let (mut runtime, _) = runtime_with(&client, RuntimeOptions::new("products"));
	runtime.start().unwrap();
	runtime.run_until_idle().await.unwrap();

	for _ in 0..20 {
		let child = runtime.tree_mut().create_index(IndexOptions::new("articles")).unwrap();
		runtime.add_widgets(vec![child.into()]).unwrap();
		runtime.run_until_idle().await.unwrap();
		runtime.remove_widgets(&[child.into()]).unwrap();
		runtime.release(child).unwrap();
	}

	assert_eq!(runtime.tree().arena().len(), 1);
	assert_eq!(runtime.tree().executor().len(), 1);
	assert_eq!(runtime.ui_state().keys().collect::<Vec<_>>(), vec!["products"]);
}
