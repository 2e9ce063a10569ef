//! Renderer seam.

use loam_core::ChunkCoord;
use loam_mesh::{ObjectBatch, TerrainMesh};

/// Receives geometry for upload. Call order per chunk:
/// `prepare_chunk`, then any number of mesh add/remove pairs, then
/// `dispose_chunk`.
pub trait RenderSink {
    /// A chunk joined the world.
    fn prepare_chunk(&mut self, coord: ChunkCoord);

    /// A chunk is leaving the world. Its meshes were already removed.
    fn dispose_chunk(&mut self, coord: ChunkCoord);

    /// New terrain geometry for a chunk.
    fn add_terrain_mesh(&mut self, coord: ChunkCoord, mesh: TerrainMesh);

    /// Drops the chunk's terrain geometry.
    fn remove_terrain_mesh(&mut self, coord: ChunkCoord);

    /// One instanced object batch for a chunk.
    fn add_object_batch(&mut self, coord: ChunkCoord, batch: ObjectBatch);

    /// Drops every object batch of a chunk.
    fn remove_object_batches(&mut self, coord: ChunkCoord);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn prepare_chunk(&mut self, _coord: ChunkCoord) {}
    fn dispose_chunk(&mut self, _coord: ChunkCoord) {}
    fn add_terrain_mesh(&mut self, _coord: ChunkCoord, _mesh: TerrainMesh) {}
    fn remove_terrain_mesh(&mut self, _coord: ChunkCoord) {}
    fn add_object_batch(&mut self, _coord: ChunkCoord, _batch: ObjectBatch) {}
    fn remove_object_batches(&mut self, _coord: ChunkCoord) {}
}
