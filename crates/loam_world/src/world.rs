//! Chunk streaming scheduler.
//!
//! The world decides which chunks exist around a reference point, requests
//! their data from an external generator, applies the data when it comes
//! back, keeps meshes current after edits, and tears distant chunks down.
//!
//! All work is synchronous and time-sliced: [`World::tick`] and
//! [`World::render`] loop over small units of work until their budget,
//! measured with the injected [`Clock`], is spent.
//!
//! ```text
//!   to_add ──create──▶ pending ──set_chunk_data──▶ resident ──▶ to_remove
//!                                                      │
//!                                        to_mesh / to_mesh_first
//! ```

use crate::chunk::{Chunk, MeshOutcome};
use crate::clock::{Clock, SystemClock};
use crate::config::WorldConfig;
use crate::error::{WorldError, WorldResult};
use crate::events::{ChunkData, DataRequest, WorldEvents};
use crate::queues::{CoordQueue, QueueLengths};
use crate::sink::{NullSink, RenderSink};
use crossbeam_channel::{Receiver, Sender};
use loam_core::{BlockId, BlockRegistry, ChunkCoord, ChunkGeometry, VoxelBuffer};
use loam_mesh::{GreedyMesher, ObjectMesher};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Data requests sent to the generator.
    pub chunks_requested: u64,
    /// Chunks whose data was applied.
    pub chunks_added: u64,
    /// Chunks disposed.
    pub chunks_removed: u64,
    /// `update_meshes` calls that rebuilt geometry.
    pub meshes_built: u64,
    /// Generator responses dropped (chunk gone, invalid or not pending).
    pub data_discarded: u64,
    /// Calls to `tick`.
    pub ticks: u64,
}

/// Streaming voxel world.
pub struct World<S: RenderSink = NullSink> {
    config: WorldConfig,
    geometry: ChunkGeometry,
    registry: Arc<BlockRegistry>,
    sink: S,
    clock: Box<dyn Clock>,
    chunks: HashMap<ChunkCoord, Chunk>,
    to_add: CoordQueue,
    to_remove: CoordQueue,
    pending: HashSet<ChunkCoord>,
    to_mesh: CoordQueue,
    to_mesh_first: CoordQueue,
    mesher: GreedyMesher,
    object_mesher: ObjectMesher,
    events: WorldEvents,
    requests: Sender<DataRequest>,
    data_tx: Sender<ChunkData>,
    data_rx: Receiver<ChunkData>,
    player_chunk: Option<ChunkCoord>,
    player_chunk_loaded: bool,
    rebuild_queues: bool,
    stats: WorldStats,
}

impl<S: RenderSink> World<S> {
    /// Creates a world driven by the system clock.
    ///
    /// Returns the world and the receiving end of its data requests.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] if the configuration is invalid.
    pub fn new(
        config: WorldConfig,
        registry: Arc<BlockRegistry>,
        sink: S,
    ) -> WorldResult<(Self, Receiver<DataRequest>)> {
        Self::with_clock(config, registry, sink, Box::new(SystemClock::new()))
    }

    /// Creates a world with an explicit time source.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] if the configuration is invalid.
    pub fn with_clock(
        config: WorldConfig,
        registry: Arc<BlockRegistry>,
        sink: S,
        clock: Box<dyn Clock>,
    ) -> WorldResult<(Self, Receiver<DataRequest>)> {
        let config = config.normalized()?;
        let (requests, request_rx) = crossbeam_channel::unbounded();
        let (data_tx, data_rx) = crossbeam_channel::unbounded();

        tracing::info!(
            chunk_size = config.chunk_size,
            add = config.chunk_add_distance,
            remove = config.chunk_remove_distance,
            ao = config.meshing.ao,
            "world created"
        );

        let world = Self {
            geometry: ChunkGeometry::new(config.chunk_size),
            mesher: GreedyMesher::new(config.meshing),
            config,
            registry,
            sink,
            clock,
            chunks: HashMap::new(),
            to_add: CoordQueue::new(),
            to_remove: CoordQueue::new(),
            pending: HashSet::new(),
            to_mesh: CoordQueue::new(),
            to_mesh_first: CoordQueue::new(),
            object_mesher: ObjectMesher::new(),
            events: WorldEvents::default(),
            requests,
            data_tx,
            data_rx,
            player_chunk: None,
            player_chunk_loaded: false,
            rebuild_queues: true,
            stats: WorldStats::default(),
        };
        Ok((world, request_rx))
    }

    // =========================================================================
    // FRAME DRIVERS
    // =========================================================================

    /// Runs one simulation tick around `reference` (world position).
    pub fn tick(&mut self, reference: [f64; 3]) {
        self.stats.ticks += 1;
        self.drain_incoming();

        let start = self.clock.now();
        let cutoff = start + budget(self.config.max_processing_per_tick_ms);

        let current = self.geometry.chunk_of_position(reference);
        if self.player_chunk != Some(current) {
            self.player_chunk = Some(current);
            self.rebuild_queues = true;
            tracing::debug!(coord = %current, "reference point entered chunk");
            self.events.player_entered_chunk.emit(&current);
        }
        if self.rebuild_queues {
            self.rebuild_queues = false;
            self.build_add_queue(current);
            self.build_remove_queue(current);
        }

        let mut passes = 0_u32;
        loop {
            let meshed = self.process_mesh_queues(false);
            let removed = self.process_remove_queue();
            let created = self.process_add_queue();
            passes += 1;
            if !(meshed || removed || created) || self.clock.now() >= cutoff {
                break;
            }
        }

        self.player_chunk_loaded = self
            .chunks
            .get(&current)
            .is_some_and(|c| c.is_generated() && !c.is_invalid());

        let elapsed = self.clock.now().saturating_sub(start);
        tracing::trace!(
            passes,
            ?elapsed,
            to_add = self.to_add.len(),
            pending = self.pending.len(),
            "tick"
        );
    }

    /// Services the priority mesh lane under the render budget.
    pub fn render(&mut self) {
        let cutoff = self.clock.now() + budget(self.config.max_processing_per_render_ms);
        while self.process_mesh_queues(true) {
            if self.clock.now() >= cutoff {
                break;
            }
        }
    }

    /// Whether the reference point's chunk was generated and valid at the
    /// end of the last tick. Gameplay should not trust terrain queries
    /// while this is false.
    #[must_use]
    pub const fn player_chunk_loaded(&self) -> bool {
        self.player_chunk_loaded
    }

    /// Chunk containing the reference point as of the last tick.
    #[must_use]
    pub const fn player_chunk(&self) -> Option<ChunkCoord> {
        self.player_chunk
    }

    // =========================================================================
    // GENERATOR DATA
    // =========================================================================

    /// Applies generator output to a pending chunk.
    ///
    /// Data for a chunk that is gone, invalidated, or not awaiting data is
    /// discarded silently.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::BufferSize`] if the buffer was built for a
    /// different chunk size. The chunk stays pending.
    pub fn set_chunk_data(
        &mut self,
        coord: ChunkCoord,
        buffer: VoxelBuffer,
        user_data: Option<Box<dyn Any + Send>>,
    ) -> WorldResult<()> {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            self.discard(coord, "chunk not in memory");
            return Ok(());
        };
        if !self.pending.contains(&coord) {
            self.discard(coord, "chunk not awaiting data");
            return Ok(());
        }
        if chunk.is_invalid() {
            self.pending.remove(&coord);
            self.discard(coord, "chunk invalidated while pending");
            return Ok(());
        }

        let padded = self.config.chunk_size as usize + 2;
        let expected = padded * padded * padded;
        if buffer.len() != expected {
            return Err(WorldError::BufferSize {
                coord,
                expected,
                actual: buffer.len(),
            });
        }
        self.pending.remove(&coord);

        chunk.init_data(buffer);
        chunk.set_user_data(user_data);
        let needs_mesh = chunk.needs_remesh();

        self.sink.prepare_chunk(coord);
        if needs_mesh {
            self.to_mesh.push_back(coord);
        }
        self.stats.chunks_added += 1;
        tracing::debug!(coord = %coord, needs_mesh, "chunk added");
        self.events.chunk_added.emit(&coord);
        Ok(())
    }

    /// Sender for delivering [`ChunkData`] from other threads. Messages are
    /// applied at the start of the next tick.
    #[must_use]
    pub fn data_sender(&self) -> Sender<ChunkData> {
        self.data_tx.clone()
    }

    fn drain_incoming(&mut self) {
        let incoming: Vec<ChunkData> = self.data_rx.try_iter().collect();
        for data in incoming {
            let coord = data.coord;
            if let Err(err) = self.set_chunk_data(coord, data.buffer, data.user_data) {
                tracing::warn!(coord = %coord, error = %err, "rejected chunk data");
            }
        }
    }

    fn discard(&mut self, coord: ChunkCoord, reason: &'static str) {
        self.stats.data_discarded += 1;
        tracing::debug!(coord = %coord, reason, "chunk data discarded");
    }

    // =========================================================================
    // QUEUE BUILDING
    // =========================================================================

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn build_add_queue(&mut self, center: ChunkCoord) {
        let add = f64::from(self.config.chunk_add_distance);
        let add_sq = add * add;
        let radius = add.ceil() as i32;

        let mut wanted = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for dz in -radius..=radius {
                    let coord = center.offset(dx, dy, dz);
                    if self.chunks.contains_key(&coord) {
                        continue;
                    }
                    let dist = center.distance_sq(coord);
                    if (dist as f64) < add_sq {
                        wanted.push((dist, coord));
                    }
                }
            }
        }
        wanted.sort_unstable();
        self.to_add.replace(wanted.into_iter().map(|(_, c)| c));
    }

    #[allow(clippy::cast_precision_loss)]
    fn build_remove_queue(&mut self, center: ChunkCoord) {
        let remove = f64::from(self.config.chunk_remove_distance);
        let remove_sq = remove * remove;

        let mut doomed: Vec<(bool, i64, ChunkCoord)> = self
            .chunks
            .values()
            .filter_map(|chunk| {
                let coord = chunk.coord();
                let dist = center.distance_sq(coord);
                (chunk.is_invalid() || dist as f64 > remove_sq)
                    .then_some((!chunk.is_invalid(), -dist, coord))
            })
            .collect();
        // Invalid first, then farthest first.
        doomed.sort_unstable();
        self.to_remove.replace(doomed.into_iter().map(|(_, _, c)| c));
    }

    // =========================================================================
    // QUEUE PROCESSING
    // =========================================================================

    fn process_mesh_queues(&mut self, first_only: bool) -> bool {
        let (coord, priority) = match self.to_mesh_first.pop_front() {
            Some(coord) => (coord, true),
            None if first_only => return false,
            None => match self.to_mesh.pop_front() {
                Some(coord) => (coord, false),
                None => return false,
            },
        };

        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return true;
        };
        if chunk.is_invalid() {
            return true;
        }

        match chunk.update_meshes(&mut self.mesher, &self.object_mesher, &mut self.sink) {
            MeshOutcome::NotReady => {
                if priority {
                    self.to_mesh_first.push_back(coord);
                } else {
                    self.to_mesh.push_back(coord);
                }
                false
            }
            MeshOutcome::Updated { terrain, objects } => {
                if terrain || objects {
                    self.stats.meshes_built += 1;
                    self.events.chunk_mesh_updated.emit(&coord);
                }
                true
            }
        }
    }

    fn process_remove_queue(&mut self) -> bool {
        while let Some(coord) = self.to_remove.pop_front() {
            let Some(mut chunk) = self.chunks.remove(&coord) else {
                continue;
            };
            let generated = chunk.is_generated();
            if generated {
                self.events.chunk_being_removed.emit(&coord);
            }
            chunk.dispose(&mut self.sink);
            if generated {
                self.sink.dispose_chunk(coord);
            }

            self.pending.remove(&coord);
            self.to_mesh.remove(coord);
            self.to_mesh_first.remove(coord);
            if chunk.is_invalid() {
                self.rebuild_queues = true;
            }
            self.stats.chunks_removed += 1;
            tracing::debug!(coord = %coord, invalid = chunk.is_invalid(), "chunk removed");
            return true;
        }
        false
    }

    fn process_add_queue(&mut self) -> bool {
        if self.pending.len() >= self.config.max_chunks_pending_creation {
            return false;
        }
        while let Some(coord) = self.to_add.pop_front() {
            if self.chunks.contains_key(&coord) {
                continue;
            }
            self.create_chunk(coord);
            return true;
        }
        false
    }

    fn create_chunk(&mut self, coord: ChunkCoord) {
        let chunk = Chunk::new(coord, self.config.chunk_size, Arc::clone(&self.registry));
        let request = DataRequest {
            coord,
            origin: chunk.origin(),
            buffer: VoxelBuffer::new(self.config.chunk_size as usize),
        };
        self.chunks.insert(coord, chunk);
        self.pending.insert(coord);
        self.stats.chunks_requested += 1;

        tracing::trace!(coord = %coord, "chunk data requested");
        if self.requests.send(request).is_err() {
            tracing::warn!(coord = %coord, "generator disconnected, request dropped");
        }
    }

    // =========================================================================
    // VOXEL ACCESS
    // =========================================================================

    /// Writes a block at a world voxel coordinate.
    ///
    /// Border voxels are mirrored into the padding of every resident
    /// neighbor that shares the face, edge or corner. Every touched chunk
    /// goes onto the priority mesh lane.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownBlock`] for unregistered ids and
    /// [`WorldError::ChunkNotReady`] if the owning chunk has no data.
    pub fn set_block(&mut self, world: [i32; 3], id: BlockId) -> WorldResult<()> {
        if !self.registry.is_registered(id) {
            return Err(WorldError::UnknownBlock(id.raw()));
        }
        let coord = self.geometry.chunk_of(world);
        let local = self.geometry.local_of(world);
        let chunk = self
            .chunks
            .get_mut(&coord)
            .filter(|c| c.is_generated() && !c.is_invalid())
            .ok_or(WorldError::ChunkNotReady(coord))?;

        if !chunk.set(local[0], local[1], local[2], id) {
            return Ok(());
        }
        self.to_mesh_first.push_back(coord);
        self.events.chunk_changed.emit(&coord);

        let size = self.geometry.size();
        let offsets = |l: i32| {
            [0, -1, 1]
                .into_iter()
                .filter(move |d| *d == 0 || (*d == -1 && l == 0) || (*d == 1 && l == size - 1))
        };
        for dx in offsets(local[0]) {
            for dy in offsets(local[1]) {
                for dz in offsets(local[2]) {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let neighbor = coord.offset(dx, dy, dz);
                    let Some(chunk) = self
                        .chunks
                        .get_mut(&neighbor)
                        .filter(|c| c.is_generated())
                    else {
                        continue;
                    };
                    let changed = chunk.set(
                        local[0] - dx * size,
                        local[1] - dy * size,
                        local[2] - dz * size,
                        id,
                    );
                    // An unchanged padding cell leaves the neighbor's mesh valid.
                    if changed {
                        self.to_mesh_first.push_back(neighbor);
                    }
                }
            }
        }
        Ok(())
    }

    /// Block at a world voxel coordinate. Air if the chunk has no data.
    #[must_use]
    pub fn get_block(&self, world: [i32; 3]) -> BlockId {
        let local = self.geometry.local_of(world);
        self.chunks
            .get(&self.geometry.chunk_of(world))
            .map_or(BlockId::AIR, |c| c.get(local[0], local[1], local[2]))
    }

    /// Solidity at a world voxel coordinate. False if the chunk has no data.
    #[must_use]
    pub fn is_solid_at(&self, world: [i32; 3]) -> bool {
        let local = self.geometry.local_of(world);
        self.chunks
            .get(&self.geometry.chunk_of(world))
            .is_some_and(|c| c.solidity_at(local[0], local[1], local[2]))
    }

    // =========================================================================
    // CHUNK MANAGEMENT
    // =========================================================================

    /// Chunk at a coordinate, pending or resident.
    #[must_use]
    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Allocated chunks, pending ones included.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Marks a chunk for teardown. It is requested again afterwards if
    /// still in range. Returns false if the chunk is not in memory.
    pub fn invalidate_chunk(&mut self, coord: ChunkCoord) -> bool {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        chunk.invalidate();
        self.rebuild_queues = true;
        true
    }

    /// Marks every chunk for teardown.
    pub fn invalidate_all_chunks(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.invalidate();
        }
        self.rebuild_queues = true;
        tracing::info!(chunks = self.chunks.len(), "all chunks invalidated");
    }

    /// Changes the streaming radii. Remove is clamped up to add.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] for negative or non-finite values.
    pub fn set_add_remove_distance(&mut self, add: f32, remove: f32) -> WorldResult<()> {
        let config = WorldConfig {
            chunk_add_distance: add,
            chunk_remove_distance: remove,
            ..self.config.clone()
        }
        .normalized()?;
        self.config = config;
        self.rebuild_queues = true;
        Ok(())
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Current queue sizes.
    #[must_use]
    pub fn queue_lengths(&self) -> QueueLengths {
        QueueLengths {
            to_add: self.to_add.len(),
            to_remove: self.to_remove.len(),
            in_memory: self.chunks.len(),
            pending_creation: self.pending.len(),
            to_mesh: self.to_mesh.len(),
            to_mesh_first: self.to_mesh_first.len(),
        }
    }

    /// Coordinates waiting in the add queue, nearest first.
    pub fn add_queue(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.to_add.iter()
    }

    /// Lifetime counters.
    #[must_use]
    pub const fn stats(&self) -> &WorldStats {
        &self.stats
    }

    /// Event lists, for subscribing.
    pub fn events_mut(&mut self) -> &mut WorldEvents {
        &mut self.events
    }

    /// Renderer sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable renderer sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Coordinate math for the configured chunk size.
    #[must_use]
    pub const fn geometry(&self) -> &ChunkGeometry {
        &self.geometry
    }

    /// Block registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }
}

fn budget(ms: f64) -> Duration {
    Duration::from_secs_f64(ms.max(0.0) / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use loam_core::{BlockOptions, MaterialDef};

    fn registry() -> Arc<BlockRegistry> {
        let mut reg = BlockRegistry::new();
        reg.register_material("stone", MaterialDef::color(0.5, 0.5, 0.5));
        reg.register_block(1, BlockOptions::solid("stone")).unwrap();
        Arc::new(reg)
    }

    fn world(add: f32, remove: f32) -> (World, Receiver<DataRequest>) {
        let config = WorldConfig {
            chunk_add_distance: add,
            chunk_remove_distance: remove,
            ..WorldConfig::testing()
        };
        World::with_clock(config, registry(), NullSink, Box::new(ManualClock::new())).unwrap()
    }

    #[test]
    fn test_add_queue_sorted_by_distance() {
        let (mut w, _rx) = world(2.0, 2.0);
        w.build_add_queue(ChunkCoord::default());
        let dists: Vec<i64> = w
            .add_queue()
            .map(|c| ChunkCoord::default().distance_sq(c))
            .collect();
        assert_eq!(dists.first(), Some(&0));
        assert!(dists.windows(2).all(|p| p[0] <= p[1]));
        // 1 + 6 + 12 + 8 neighbors with distance^2 < 4
        assert_eq!(dists.len(), 27);
    }

    #[test]
    fn test_remove_queue_invalid_first() {
        let (mut w, _rx) = world(1.0, 1.0);
        for coord in [
            ChunkCoord::new(3, 0, 0),
            ChunkCoord::new(5, 0, 0),
            ChunkCoord::new(0, 0, 0),
            ChunkCoord::new(1, 0, 0),
        ] {
            w.create_chunk(coord);
        }
        w.invalidate_chunk(ChunkCoord::new(1, 0, 0));
        w.build_remove_queue(ChunkCoord::default());
        let order: Vec<_> = w.to_remove.iter().collect();
        assert_eq!(
            order,
            vec![
                ChunkCoord::new(1, 0, 0),
                ChunkCoord::new(5, 0, 0),
                ChunkCoord::new(3, 0, 0),
            ]
        );
    }

    #[test]
    fn test_budget_conversion() {
        assert!((budget(9.0).as_secs_f64() - 0.009).abs() < 1e-9);
        assert_eq!(budget(-1.0), Duration::ZERO);
    }
}
