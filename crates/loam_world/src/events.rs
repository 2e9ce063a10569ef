//! World notifications and generator messages.
//!
//! Each event has its own observer list. Generator traffic goes over
//! channels instead: one [`DataRequest`] out per chunk, one [`ChunkData`]
//! back.

use loam_core::{ChunkCoord, VoxelBuffer};
use std::any::Any;
use std::fmt;

/// Handle returned by [`Observers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Box<dyn FnMut(&T) + Send>;

/// Listener list for one event.
pub struct Observers<T> {
    listeners: Vec<(ListenerId, Listener<T>)>,
    next_id: u64,
}

impl<T> Observers<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Adds a listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&T) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Calls every listener in subscription order.
    pub fn emit(&mut self, value: &T) {
        for (_, listener) in &mut self.listeners {
            listener(value);
        }
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True if nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Every event the world emits.
#[derive(Debug, Default)]
pub struct WorldEvents {
    /// A chunk's data was applied and it joined the world.
    pub chunk_added: Observers<ChunkCoord>,
    /// A voxel inside the chunk was edited.
    pub chunk_changed: Observers<ChunkCoord>,
    /// A chunk is about to be disposed.
    pub chunk_being_removed: Observers<ChunkCoord>,
    /// A chunk's meshes were rebuilt.
    pub chunk_mesh_updated: Observers<ChunkCoord>,
    /// The reference point moved into a different chunk.
    pub player_entered_chunk: Observers<ChunkCoord>,
}

/// Request for a chunk's voxel data.
///
/// The generator fills `buffer` with raw block ids over the whole padded
/// region. Local `(-1,-1,-1)` is world voxel `origin - 1`.
#[derive(Debug)]
pub struct DataRequest {
    /// Chunk to fill.
    pub coord: ChunkCoord,
    /// World voxel coordinate of local `(0,0,0)`.
    pub origin: [i32; 3],
    /// All-air padded buffer.
    pub buffer: VoxelBuffer,
}

impl DataRequest {
    /// Wraps a filled buffer as a response.
    #[must_use]
    pub fn complete(self) -> ChunkData {
        ChunkData {
            coord: self.coord,
            buffer: self.buffer,
            user_data: None,
        }
    }
}

/// Generator response.
pub struct ChunkData {
    /// Chunk the data belongs to.
    pub coord: ChunkCoord,
    /// Filled buffer (raw ids).
    pub buffer: VoxelBuffer,
    /// Opaque payload stored on the chunk.
    pub user_data: Option<Box<dyn Any + Send>>,
}

impl ChunkData {
    /// Attaches a payload.
    #[must_use]
    pub fn with_user_data(mut self, data: impl Any + Send) -> Self {
        self.user_data = Some(Box::new(data));
        self
    }
}

impl fmt::Debug for ChunkData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkData")
            .field("coord", &self.coord)
            .field("cells", &self.buffer.len())
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}
