//! Coalescing work scheduler.
//!
//! Requests raised while the tree reacts to an event only set flags. The
//! runtime drains them once per tick with [`Scheduler::take`], so any number of
//! requests inside one tick yields a single search, render or notification.

/// Work drained by one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduledWork {
	/// The controlled-mode hook must be asked for the next UI state.
	pub controlled_state_change: bool,
	/// UI state listeners must be notified.
	pub state_change: bool,
	pub search: bool,
	pub render: bool,
	/// Render with the search marked as stalled.
	pub stalled_render: bool,
}

impl ScheduledWork {
	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}

	/// Union of both sets of work.
	pub fn merge(self, other: Self) -> Self {
		Self {
			controlled_state_change: self.controlled_state_change || other.controlled_state_change,
			state_change: self.state_change || other.state_change,
			search: self.search || other.search,
			render: self.render || other.render,
			stalled_render: self.stalled_render || other.stalled_render,
		}
	}
}

#[derive(Debug, Default)]
pub struct Scheduler {
	pending: ScheduledWork,
}

impl Scheduler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn schedule_search(&mut self) {
		self.pending.search = true;
	}

	pub fn schedule_render(&mut self) {
		self.pending.render = true;
	}

	pub fn schedule_stalled_render(&mut self) {
		self.pending.stalled_render = true;
	}

	pub fn notify_state_change(&mut self) {
		self.pending.state_change = true;
	}

	pub fn notify_controlled_state_change(&mut self) {
		self.pending.controlled_state_change = true;
	}

	/// Returns and clears the pending work.
	pub fn take(&mut self) -> ScheduledWork {
		std::mem::take(&mut self.pending)
	}

	pub fn pending(&self) -> ScheduledWork {
		self.pending
	}

	pub fn is_idle(&self) -> bool {
		self.pending.is_empty()
	}
}
