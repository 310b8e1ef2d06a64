//! Shared multi-query executor.
//!
//! Each index node registers one derivation slot: a pure function computing
//! the node's query from a context `C`. A search round-trip asks every
//! attached slot for its query and sends them all in a single request. The
//! response is split back per slot.
//!
//! Ordering within one round-trip: [`SearchExecutor::begin`] fires every
//! slot's search observers, [`SearchExecutor::complete`] later fires result
//! observers, so no result is observed before every search was.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use prism_params::{QueryState, SearchRequest, SearchResults};
use rustc_hash::FxHashMap as HashMap;
use slab::Slab;

use crate::error::ClientError;
use crate::ids::GenerationClock;
use crate::SlotId;

/// Computes one slot's query from the shared context.
pub type DeriveFn<C> = Box<dyn Fn(&C) -> QueryState>;

/// Monotonic round-trip identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundTripId(u64);

/// A slot took part in a round-trip.
#[derive(Debug, Clone)]
pub struct SearchEvent {
	pub slot: SlotId,
	pub round_trip: RoundTripId,
	pub state: QueryState,
}

/// A slot received its share of a response.
#[derive(Debug, Clone)]
pub struct ResultEvent {
	pub slot: SlotId,
	pub round_trip: RoundTripId,
	pub results: Arc<SearchResults>,
}

/// String-valued headers attached to every outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders(IndexMap<String, String>);

impl RequestHeaders {
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.0.insert(name.into(), value.into());
	}

	pub fn remove(&mut self, name: &str) -> Option<String> {
		self.0.shift_remove(name)
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Requests of one round-trip, ready for the transport.
#[derive(Debug, Clone)]
pub struct PreparedSearch {
	pub id: RoundTripId,
	pub requests: Vec<SearchRequest>,
	/// Slot of each request, same order.
	pub slots: Vec<SlotId>,
}

/// One slot's share of a response.
#[derive(Debug, Clone)]
pub struct Delivery {
	pub slot: SlotId,
	pub results: Arc<SearchResults>,
}

/// Outcome of [`SearchExecutor::complete`].
#[derive(Debug)]
pub enum Completion {
	/// Results for the slots still attached.
	Delivered(Vec<Delivery>),
	/// A newer round-trip was already completed, or the id is unknown.
	Outdated,
	Failed(ClientError),
}

struct Slot<C> {
	generation: u32,
	derive: DeriveFn<C>,
	on_search: Vec<Box<dyn FnMut(&SearchEvent)>>,
	on_result: Vec<Box<dyn FnMut(&ResultEvent)>>,
	last_results: Option<Arc<SearchResults>>,
}

pub struct SearchExecutor<C> {
	slots: Slab<Slot<C>>,
	/// Attached slots in registration order.
	order: Vec<SlotId>,
	clock: GenerationClock,
	next_round_trip: u64,
	in_flight: HashMap<RoundTripId, Vec<SlotId>>,
	last_completed: Option<RoundTripId>,
	headers: RequestHeaders,
	dispatched_total: u64,
}

impl<C> Default for SearchExecutor<C> {
	fn default() -> Self {
		Self {
			slots: Slab::new(),
			order: Vec::new(),
			clock: GenerationClock::default(),
			next_round_trip: 0,
			in_flight: HashMap::default(),
			last_completed: None,
			headers: RequestHeaders::default(),
			dispatched_total: 0,
		}
	}
}

impl<C> SearchExecutor<C> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a derivation slot.
	pub fn derive(&mut self, derive: impl Fn(&C) -> QueryState + 'static) -> SlotId {
		let generation = self.clock.next();
		let key = self.slots.insert(Slot {
			generation,
			derive: Box::new(derive),
			on_search: Vec::new(),
			on_result: Vec::new(),
			last_results: None,
		});
		let id = SlotId::new(key, generation);
		self.order.push(id);
		tracing::trace!(slot = ?id, "derivation slot attached");
		id
	}

	/// Removes the slot from future round-trips and drops its observers.
	/// Returns `false` when the slot was already detached.
	pub fn detach(&mut self, slot: SlotId) -> bool {
		if self.slot(slot).is_none() {
			return false;
		}
		self.slots.remove(slot.key as usize);
		self.order.retain(|id| *id != slot);
		tracing::trace!(?slot, "derivation slot detached");
		true
	}

	pub fn is_attached(&self, slot: SlotId) -> bool {
		self.slot(slot).is_some()
	}

	/// Number of attached slots.
	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	/// Observes the slot's participation in each round-trip. Returns `false`
	/// for a detached slot.
	pub fn on_search(&mut self, slot: SlotId, observer: impl FnMut(&SearchEvent) + 'static) -> bool {
		match self.slot_mut(slot) {
			Some(entry) => {
				entry.on_search.push(Box::new(observer));
				true
			}
			None => false,
		}
	}

	/// Observes the slot's results. Returns `false` for a detached slot.
	pub fn on_result(&mut self, slot: SlotId, observer: impl FnMut(&ResultEvent) + 'static) -> bool {
		match self.slot_mut(slot) {
			Some(entry) => {
				entry.on_result.push(Box::new(observer));
				true
			}
			None => false,
		}
	}

	pub fn last_results(&self, slot: SlotId) -> Option<&Arc<SearchResults>> {
		self.slot(slot)?.last_results.as_ref()
	}

	pub fn headers(&self) -> &RequestHeaders {
		&self.headers
	}

	pub fn headers_mut(&mut self) -> &mut RequestHeaders {
		&mut self.headers
	}

	/// Round-trips started so far.
	pub fn dispatched_total(&self) -> u64 {
		self.dispatched_total
	}

	/// Round-trips started and not yet completed.
	pub fn pending(&self) -> usize {
		self.in_flight.len()
	}

	/// Forgets every round-trip in flight. Their responses later complete as
	/// [`Completion::Outdated`]. Returns how many were dropped.
	pub fn abandon_all(&mut self) -> usize {
		let abandoned = self.in_flight.len();
		self.in_flight.clear();
		if abandoned > 0 {
			tracing::debug!(abandoned, "in-flight round-trips abandoned");
		}
		abandoned
	}

	/// Starts a round-trip: derives every attached slot's query and fires the
	/// search observers. `None` when no slot is attached.
	pub fn begin(&mut self, ctx: &C) -> Option<PreparedSearch> {
		if self.order.is_empty() {
			return None;
		}
		self.next_round_trip += 1;
		let id = RoundTripId(self.next_round_trip);
		let mut requests = Vec::with_capacity(self.order.len());
		let slots = self.order.clone();

		for &slot_id in &slots {
			let Some(slot) = self.slots.get_mut(slot_id.key as usize) else {
				continue;
			};
			let state = (slot.derive)(ctx);
			let event = SearchEvent {
				slot: slot_id,
				round_trip: id,
				state: state.clone(),
			};
			for observer in &mut slot.on_search {
				observer(&event);
			}
			requests.push(SearchRequest::new(state));
		}

		self.in_flight.insert(id, slots.clone());
		self.dispatched_total += 1;
		tracing::debug!(round_trip = id.0, queries = requests.len(), "search round-trip started");
		Some(PreparedSearch { id, requests, slots })
	}

	/// Completes a round-trip, splitting `response` across its slots.
	///
	/// Slots detached since [`begin`](Self::begin) are skipped without any
	/// observer call. A round-trip older than the last completed one is
	/// discarded.
	pub fn complete(&mut self, id: RoundTripId, response: Result<Vec<SearchResults>, ClientError>) -> Completion {
		let Some(slots) = self.in_flight.remove(&id) else {
			return Completion::Outdated;
		};
		if self.last_completed.is_some_and(|last| last > id) {
			tracing::trace!(round_trip = id.0, "discarding outdated response");
			return Completion::Outdated;
		}
		self.last_completed = Some(id);

		let results = match response {
			Ok(results) => results,
			Err(error) => return Completion::Failed(error),
		};
		if results.len() != slots.len() {
			tracing::warn!(
				round_trip = id.0,
				expected = slots.len(),
				received = results.len(),
				"response size does not match the number of queries"
			);
		}

		let mut deliveries = Vec::with_capacity(slots.len());
		for (slot_id, results) in slots.into_iter().zip(results) {
			let Some(slot) = self.slot_mut(slot_id) else {
				continue;
			};
			let results = Arc::new(results);
			slot.last_results = Some(Arc::clone(&results));
			let event = ResultEvent {
				slot: slot_id,
				round_trip: id,
				results: Arc::clone(&results),
			};
			for observer in &mut slot.on_result {
				observer(&event);
			}
			deliveries.push(Delivery { slot: slot_id, results });
		}
		Completion::Delivered(deliveries)
	}

	fn slot(&self, id: SlotId) -> Option<&Slot<C>> {
		self.slots
			.get(id.key as usize)
			.filter(|slot| slot.generation == id.generation)
	}

	fn slot_mut(&mut self, id: SlotId) -> Option<&mut Slot<C>> {
		self.slots
			.get_mut(id.key as usize)
			.filter(|slot| slot.generation == id.generation)
	}
}

impl<C> fmt::Debug for SearchExecutor<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SearchExecutor")
			.field("slots", &self.order)
			.field("in_flight", &self.in_flight.len())
			.field("dispatched_total", &self.dispatched_total)
			.finish()
	}
}
