/// A generational index node identifier.
///
/// `key` addresses the arena slot; `generation` is unique per created node so
/// an id kept after its node was released never resolves to a newer node
/// that reused the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
	pub(crate) key: u32,
	pub(crate) generation: u32,
}

impl NodeId {
	pub(crate) const fn new(key: usize, generation: u32) -> Self {
		Self {
			key: key as u32,
			generation,
		}
	}

	/// Returns the arena slot index.
	pub const fn index(self) -> usize {
		self.key as usize
	}
}

/// A generational derivation slot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
	pub(crate) key: u32,
	pub(crate) generation: u32,
}

impl SlotId {
	pub(crate) const fn new(key: usize, generation: u32) -> Self {
		Self {
			key: key as u32,
			generation,
		}
	}
}

/// Handle returned by observer registrations, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Monotonic generation counter shared by an arena.
#[derive(Debug, Default)]
pub(crate) struct GenerationClock {
	next: u32,
}

impl GenerationClock {
	/// Returns the next generation. Wraps after `u32::MAX` allocations.
	pub fn next(&mut self) -> u32 {
		self.next = self.next.wrapping_add(1);
		self.next
	}
}
