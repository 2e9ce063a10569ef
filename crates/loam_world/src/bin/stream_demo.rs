//! Streams a small rolling-hills world while the reference point walks
//! along +x, then prints what the scheduler did.
//!
//! ```text
//! cargo run -p loam_world --bin stream_demo [config.toml]
//! ```

use loam_core::{BlockOptions, BlockRegistry, ChunkCoord, MaterialDef, VoxelBuffer};
use loam_mesh::{ObjectBatch, TerrainMesh};
use loam_world::{RenderSink, World, WorldConfig};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const GRASS: u16 = 1;
const DIRT: u16 = 2;
const FLOWER: u16 = 3;

/// Tallies what a GPU upload would receive.
#[derive(Debug, Default)]
struct UploadTally {
    submeshes: usize,
    vertex_bytes: usize,
    index_bytes: usize,
    instances: usize,
}

impl RenderSink for UploadTally {
    fn prepare_chunk(&mut self, _coord: ChunkCoord) {}

    fn dispose_chunk(&mut self, _coord: ChunkCoord) {}

    fn add_terrain_mesh(&mut self, _coord: ChunkCoord, mesh: TerrainMesh) {
        for submesh in mesh.into_submeshes() {
            self.submeshes += 1;
            self.vertex_bytes += submesh.position_bytes().len();
            self.index_bytes += submesh.index_bytes().len();
        }
    }

    fn remove_terrain_mesh(&mut self, _coord: ChunkCoord) {}

    fn add_object_batch(&mut self, _coord: ChunkCoord, batch: ObjectBatch) {
        self.instances += batch.instances.len();
    }

    fn remove_object_batches(&mut self, _coord: ChunkCoord) {}
}

fn registry() -> Result<BlockRegistry, Box<dyn std::error::Error>> {
    let mut reg = BlockRegistry::new();
    reg.register_material("grass_top", MaterialDef::color(0.3, 0.7, 0.2));
    reg.register_material("dirt", MaterialDef::color(0.45, 0.3, 0.15));
    reg.register_material("petal", MaterialDef::color(0.9, 0.8, 0.1));
    reg.register_block(
        u32::from(GRASS),
        BlockOptions::solid_faces(&["grass_top", "dirt", "dirt"]),
    )?;
    reg.register_block(u32::from(DIRT), BlockOptions::solid("dirt"))?;
    reg.register_block(u32::from(FLOWER), BlockOptions::object("flower", "petal"))?;
    Ok(reg)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn generate(buffer: &mut VoxelBuffer, origin: [i32; 3]) {
    let size = buffer.size() as i32;
    for z in -1..=size {
        for x in -1..=size {
            let wx = f64::from(origin[0] + x);
            let wz = f64::from(origin[2] + z);
            let height = (4.0 * (wx * 0.11).sin() + 3.0 * (wz * 0.07).cos()) as i32;
            for y in -1..=size {
                let wy = origin[1] + y;
                let id = match wy.cmp(&height) {
                    std::cmp::Ordering::Less if wy < height - 1 => DIRT,
                    std::cmp::Ordering::Less => GRASS,
                    std::cmp::Ordering::Equal if (origin[0] + x + origin[2] + z) % 7 == 0 => FLOWER,
                    _ => 0,
                };
                buffer.set(x, y, z, id);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => WorldConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => WorldConfig {
            chunk_size: 16,
            chunk_add_distance: 3.0,
            chunk_remove_distance: 4.0,
            ..WorldConfig::default()
        },
    };

    let (mut world, requests) = World::new(config, Arc::new(registry()?), UploadTally::default())?;
    let data = world.data_sender();
    let generator = thread::spawn(move || {
        for mut request in requests {
            generate(&mut request.buffer, request.origin);
            if data.send(request.complete()).is_err() {
                break;
            }
        }
    });

    let started = Instant::now();
    let mut position = [8.0, 4.0, 8.0];
    let mut ticks_until_loaded = None;
    for tick in 0..600_u32 {
        world.tick(position);
        world.render();
        if world.player_chunk_loaded() && ticks_until_loaded.is_none() {
            ticks_until_loaded = Some(tick);
        }
        if tick >= 100 {
            position[0] += 0.5;
        }
        thread::sleep(Duration::from_millis(1));
    }

    let stats = *world.stats();
    let queues = world.queue_lengths();
    let uploads = std::mem::take(world.sink_mut());
    drop(world);
    generator.join().map_err(|_| "generator thread panicked")?;

    println!("stream_demo finished in {:.2?}", started.elapsed());
    println!("  first tick with player chunk loaded: {ticks_until_loaded:?}");
    println!("  ticks:            {}", stats.ticks);
    println!("  chunks requested: {}", stats.chunks_requested);
    println!("  chunks added:     {}", stats.chunks_added);
    println!("  chunks removed:   {}", stats.chunks_removed);
    println!("  meshes built:     {}", stats.meshes_built);
    println!("  data discarded:   {}", stats.data_discarded);
    println!("  queues at exit:   {queues:?}");
    println!(
        "  uploaded:         {} submeshes, {} vertex bytes, {} index bytes, {} instances",
        uploads.submeshes, uploads.vertex_bytes, uploads.index_bytes, uploads.instances
    );
    Ok(())
}
