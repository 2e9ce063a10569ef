//! Scheduler queues.
//!
//! Ordered lanes carry a membership set so every coordinate appears at most
//! once per lane.

use loam_core::ChunkCoord;
use std::collections::{HashSet, VecDeque};

/// FIFO of unique chunk coordinates.
#[derive(Debug, Clone, Default)]
pub struct CoordQueue {
    order: VecDeque<ChunkCoord>,
    members: HashSet<ChunkCoord>,
}

impl CoordQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `coord` unless already queued. Returns true if added.
    pub fn push_back(&mut self, coord: ChunkCoord) -> bool {
        if !self.members.insert(coord) {
            return false;
        }
        self.order.push_back(coord);
        true
    }

    /// Takes the head of the queue.
    pub fn pop_front(&mut self) -> Option<ChunkCoord> {
        let coord = self.order.pop_front()?;
        self.members.remove(&coord);
        Some(coord)
    }

    /// Drops `coord` wherever it is. Returns true if it was queued.
    pub fn remove(&mut self, coord: ChunkCoord) -> bool {
        if !self.members.remove(&coord) {
            return false;
        }
        self.order.retain(|c| *c != coord);
        true
    }

    /// Replaces the contents, keeping the given order and dropping repeats.
    pub fn replace(&mut self, coords: impl IntoIterator<Item = ChunkCoord>) {
        self.clear();
        for coord in coords {
            self.push_back(coord);
        }
    }

    /// Empties the queue.
    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.members.contains(&coord)
    }

    /// Number of queued coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates front to back.
    pub fn iter(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.order.iter().copied()
    }
}

/// Snapshot of queue sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueLengths {
    /// Chunks that should exist but have not been requested.
    pub to_add: usize,
    /// Chunks due for teardown.
    pub to_remove: usize,
    /// Allocated chunks, pending ones included.
    pub in_memory: usize,
    /// Chunks awaiting generator data.
    pub pending_creation: usize,
    /// Routine remesh backlog.
    pub to_mesh: usize,
    /// Priority remesh lane.
    pub to_mesh_first: usize,
}
