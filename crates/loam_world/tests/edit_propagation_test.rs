//! # Edit Propagation Integration Test
//!
//! Border edits must reach the padding of every resident neighbor, queue
//! each touched chunk for a priority remesh, and never produce a face twice.

use crossbeam_channel::Receiver;
use loam_core::{
    BlockHandlers, BlockId, BlockOptions, BlockRegistry, ChunkCoord, MaterialDef, VoxelBuffer,
};
use loam_mesh::{ObjectBatch, TerrainMesh};
use loam_world::{DataRequest, ManualClock, RenderSink, World, WorldConfig, WorldError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const STONE: BlockId = BlockId(1);
const FLOWER: BlockId = BlockId(2);

/// Keeps whatever the world hands over.
#[derive(Default)]
struct RecordingSink {
    prepared: Vec<ChunkCoord>,
    disposed: Vec<ChunkCoord>,
    terrain: HashMap<ChunkCoord, TerrainMesh>,
    objects: HashMap<ChunkCoord, Vec<ObjectBatch>>,
}

impl RenderSink for RecordingSink {
    fn prepare_chunk(&mut self, coord: ChunkCoord) {
        self.prepared.push(coord);
    }

    fn dispose_chunk(&mut self, coord: ChunkCoord) {
        self.disposed.push(coord);
    }

    fn add_terrain_mesh(&mut self, coord: ChunkCoord, mesh: TerrainMesh) {
        assert!(self.terrain.insert(coord, mesh).is_none(), "mesh for {coord} not removed first");
    }

    fn remove_terrain_mesh(&mut self, coord: ChunkCoord) {
        self.terrain.remove(&coord);
    }

    fn add_object_batch(&mut self, coord: ChunkCoord, batch: ObjectBatch) {
        self.objects.entry(coord).or_default().push(batch);
    }

    fn remove_object_batches(&mut self, coord: ChunkCoord) {
        self.objects.remove(&coord);
    }
}

type Log = Arc<Mutex<Vec<[i32; 3]>>>;

fn registry(set_log: &Log) -> Arc<BlockRegistry> {
    let mut reg = BlockRegistry::new();
    reg.register_material("stone", MaterialDef::color(0.5, 0.5, 0.5));
    reg.register_material("petal", MaterialDef::color(1.0, 0.3, 0.6));
    let log = Arc::clone(set_log);
    reg.register_block(
        u32::from(STONE.raw()),
        BlockOptions::solid("stone")
            .with_handlers(BlockHandlers::default().on_set(move |p| log.lock().push(p))),
    )
    .unwrap();
    reg.register_block(u32::from(FLOWER.raw()), BlockOptions::object("flower", "petal"))
        .unwrap();
    Arc::new(reg)
}

/// A 3x3x3 block of resident all-air chunks around the origin chunk.
fn loaded_world() -> (World<RecordingSink>, Receiver<DataRequest>, Log) {
    loaded_world_on(ManualClock::new(), WorldConfig::testing().max_processing_per_render_ms)
}

fn loaded_world_on(
    clock: ManualClock,
    render_budget_ms: f64,
) -> (World<RecordingSink>, Receiver<DataRequest>, Log) {
    let log = Log::default();
    let config = WorldConfig {
        chunk_add_distance: 2.0,
        chunk_remove_distance: 3.0,
        max_chunks_pending_creation: 64,
        max_processing_per_render_ms: render_budget_ms,
        ..WorldConfig::testing()
    };
    let (mut world, requests) =
        World::with_clock(config, registry(&log), RecordingSink::default(), Box::new(clock))
            .unwrap();

    world.tick([0.5, 0.5, 0.5]);
    for request in requests.try_iter() {
        world.set_chunk_data(request.coord, request.buffer, None).unwrap();
    }
    world.tick([0.5, 0.5, 0.5]);
    assert_eq!(world.chunk_count(), 27);
    assert!(world.player_chunk_loaded());
    assert_eq!(world.queue_lengths().to_mesh, 0);
    (world, requests, log)
}

fn changed_counter(world: &mut World<RecordingSink>) -> Arc<Mutex<Vec<ChunkCoord>>> {
    let changed: Arc<Mutex<Vec<ChunkCoord>>> = Arc::default();
    let sink = Arc::clone(&changed);
    world
        .events_mut()
        .chunk_changed
        .subscribe(move |c| sink.lock().push(*c));
    changed
}

#[test]
fn test_face_border_edit_reaches_neighbor_padding() {
    let (mut world, _rx, _log) = loaded_world();
    let changed = changed_counter(&mut world);

    world.set_block([0, 1, 1], STONE).unwrap();

    let west = world.get_chunk(ChunkCoord::new(-1, 0, 0)).unwrap();
    assert_eq!(west.get(4, 1, 1), STONE);
    assert!(west.terrain_dirty());
    assert_eq!(world.get_block([0, 1, 1]), STONE);
    assert!(world.is_solid_at([0, 1, 1]));
    assert_eq!(world.queue_lengths().to_mesh_first, 2);
    assert_eq!(*changed.lock(), vec![ChunkCoord::default()]);
}

#[test]
fn test_positive_border_edit() {
    let (mut world, _rx, _log) = loaded_world();
    world.set_block([3, 1, 1], STONE).unwrap();
    let east = world.get_chunk(ChunkCoord::new(1, 0, 0)).unwrap();
    assert_eq!(east.get(-1, 1, 1), STONE);
    assert_eq!(world.queue_lengths().to_mesh_first, 2);
}

#[test]
fn test_corner_edit_touches_seven_neighbors() {
    let (mut world, _rx, log) = loaded_world();
    let changed = changed_counter(&mut world);

    world.set_block([0, 0, 0], STONE).unwrap();

    for (dx, dy, dz) in [
        (-1, 0, 0),
        (0, -1, 0),
        (0, 0, -1),
        (-1, -1, 0),
        (-1, 0, -1),
        (0, -1, -1),
        (-1, -1, -1),
    ] {
        let chunk = world.get_chunk(ChunkCoord::new(dx, dy, dz)).unwrap();
        assert_eq!(chunk.get(-dx * 4, -dy * 4, -dz * 4), STONE, "neighbor {dx},{dy},{dz}");
    }
    assert_eq!(world.queue_lengths().to_mesh_first, 8);
    // chunk_changed and on_set fire for the owning chunk only
    assert_eq!(changed.lock().len(), 1);
    assert_eq!(*log.lock(), vec![[0, 0, 0]]);
}

#[test]
fn test_render_budget_limits_priority_meshing() {
    let clock = ManualClock::new();
    let (mut world, _rx, _log) = loaded_world_on(clock.clone(), 5.0);
    world.set_block([0, 0, 0], STONE).unwrap();
    assert_eq!(world.queue_lengths().to_mesh_first, 8);

    // Each clock read costs the whole render budget: one chunk per frame.
    clock.set_step(Duration::from_millis(5));
    world.render();
    assert_eq!(world.queue_lengths().to_mesh_first, 7);
    world.render();
    assert_eq!(world.queue_lengths().to_mesh_first, 6);

    clock.set_step(Duration::ZERO);
    world.render();
    assert_eq!(world.queue_lengths().to_mesh_first, 0);
    assert_eq!(world.sink().terrain.len(), 1);
}

#[test]
fn test_object_edit_on_border_queues_neighbor() {
    let (mut world, _rx, _log) = loaded_world();
    world.set_block([0, 1, 1], FLOWER).unwrap();

    let west = world.get_chunk(ChunkCoord::new(-1, 0, 0)).unwrap();
    assert_eq!(west.get(4, 1, 1), FLOWER);
    assert!(!west.needs_remesh());
    assert_eq!(world.queue_lengths().to_mesh_first, 2);

    world.render();
    assert_eq!(world.queue_lengths().to_mesh_first, 0);
    assert_eq!(world.sink().objects.len(), 1);
    assert!(world.sink().terrain.is_empty());
}

#[test]
fn test_interior_edit_touches_only_owner() {
    let (mut world, _rx, _log) = loaded_world();
    world.set_block([1, 2, 1], STONE).unwrap();
    assert_eq!(world.queue_lengths().to_mesh_first, 1);
    for chunk in [ChunkCoord::new(-1, 0, 0), ChunkCoord::new(1, 0, 0)] {
        assert!(!world.get_chunk(chunk).unwrap().terrain_dirty());
    }
}

#[test]
fn test_negative_world_coordinates() {
    let (mut world, _rx, _log) = loaded_world();
    world.set_block([-1, -1, -4], STONE).unwrap();
    let owner = world.get_chunk(ChunkCoord::new(-1, -1, -1)).unwrap();
    assert_eq!(owner.get(3, 3, 0), STONE);
    let above = world.get_chunk(ChunkCoord::new(-1, 0, -1)).unwrap();
    assert_eq!(above.get(3, -1, 0), STONE);
}

#[test]
fn test_render_meshes_priority_lane_without_duplicate_faces() {
    let (mut world, _rx, _log) = loaded_world();
    let updated: Arc<Mutex<Vec<ChunkCoord>>> = Arc::default();
    let sink = Arc::clone(&updated);
    world
        .events_mut()
        .chunk_mesh_updated
        .subscribe(move |c| sink.lock().push(*c));

    world.set_block([0, 1, 1], STONE).unwrap();
    world.render();

    assert_eq!(world.queue_lengths().to_mesh_first, 0);
    assert_eq!(updated.lock().len(), 2);
    // The stone's six faces all belong to the chunk that owns it.
    let terrain = &world.sink().terrain;
    assert_eq!(terrain.len(), 1);
    assert_eq!(terrain[&ChunkCoord::default()].quad_count(), 6);
    assert!(!world.get_chunk(ChunkCoord::new(-1, 0, 0)).unwrap().has_terrain_mesh());

    // Removing the stone clears the mesh again.
    world.set_block([0, 1, 1], BlockId::AIR).unwrap();
    world.render();
    assert!(world.sink().terrain.is_empty());
}

#[test]
fn test_object_edit_builds_batches() {
    let (mut world, _rx, _log) = loaded_world();
    world.set_block([2, 0, 2], FLOWER).unwrap();
    world.set_block([1, 0, 2], FLOWER).unwrap();
    world.render();

    let batches = &world.sink().objects[&ChunkCoord::default()];
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].instances.len(), 2);
    assert!(world.sink().terrain.is_empty());
}

#[test]
fn test_edit_errors() {
    let (mut world, _rx, _log) = loaded_world();
    assert_eq!(
        world.set_block([40, 0, 0], STONE),
        Err(WorldError::ChunkNotReady(ChunkCoord::new(10, 0, 0)))
    );
    assert_eq!(
        world.set_block([0, 0, 0], BlockId(77)),
        Err(WorldError::UnknownBlock(77))
    );
    assert_eq!(world.get_block([40, 0, 0]), BlockId::AIR);
    assert!(!world.is_solid_at([40, 0, 0]));
}

#[test]
fn test_same_block_edit_is_quiet() {
    let (mut world, _rx, _log) = loaded_world();
    let changed = changed_counter(&mut world);
    world.set_block([0, 0, 0], BlockId::AIR).unwrap();
    assert!(changed.lock().is_empty());
    assert_eq!(world.queue_lengths().to_mesh_first, 0);
}

#[test]
fn test_streamed_terrain_meshes_on_tick() {
    let log = Log::default();
    let (mut world, requests) = World::with_clock(
        WorldConfig::testing(),
        registry(&log),
        RecordingSink::default(),
        Box::new(ManualClock::new()),
    )
    .unwrap();

    world.tick([0.0, 0.0, 0.0]);
    let request = requests.recv().unwrap();
    let mut buffer: VoxelBuffer = request.buffer;
    // Floor of stone, padding included, so the bottom face is culled below.
    for z in -1..=4 {
        for x in -1..=4 {
            buffer.set(x, -1, z, STONE.raw());
            buffer.set(x, 0, z, STONE.raw());
        }
    }
    world.set_chunk_data(request.coord, buffer, None).unwrap();
    assert_eq!(world.queue_lengths().to_mesh, 1);
    assert_eq!(world.sink().prepared, vec![ChunkCoord::default()]);

    // render() only serves the priority lane
    world.render();
    assert!(world.sink().terrain.is_empty());

    world.tick([0.0, 0.0, 0.0]);
    let mesh = &world.sink().terrain[&ChunkCoord::default()];
    assert!(mesh.quad_count() >= 1);
    assert_eq!(world.stats().meshes_built, 1);

    // on_load is not on_set
    assert!(log.lock().is_empty());
}

#[test]
fn test_removed_chunk_disposed_in_sink() {
    let (mut world, requests, _log) = loaded_world();
    world.set_block([1, 1, 1], STONE).unwrap();
    world.render();
    assert_eq!(world.sink().terrain.len(), 1);

    world.set_add_remove_distance(0.5, 0.5).unwrap();
    for _ in 0..3 {
        world.tick([0.5, 0.5, 0.5]);
    }
    assert!(requests.is_empty());
    assert_eq!(world.chunk_count(), 1);
    assert_eq!(world.sink().disposed.len(), 26);
    // the origin chunk keeps its mesh
    assert_eq!(world.sink().terrain.len(), 1);
}
