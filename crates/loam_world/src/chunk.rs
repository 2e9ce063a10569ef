//! A single chunk: padded voxels, derived flags, handler dispatch.
//!
//! Chunks are allocated by the world before their data exists. The
//! generator's buffer is applied once with [`Chunk::init_data`]; after that
//! the chunk accepts edits until [`Chunk::dispose`].
//!
//! Whole-chunk flags are computed from scratch only in `init_data`. Edits
//! can only clear them (`is_empty`, `is_full` are one-way latches).

use crate::sink::RenderSink;
use loam_core::packing::{self, ID_MASK};
use loam_core::{BlockId, BlockRegistry, ChunkCoord, PackedVoxel, VoxelBuffer};
use loam_mesh::{GreedyMesher, ObjectBlocks, ObjectMesher};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Result of [`Chunk::update_meshes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshOutcome {
    /// Data has not arrived; the caller should queue the chunk again.
    NotReady,
    /// Meshes that were rebuilt.
    Updated {
        /// Terrain geometry was rebuilt.
        terrain: bool,
        /// Object batches were rebuilt.
        objects: bool,
    },
}

/// One chunk of the world.
pub struct Chunk {
    coord: ChunkCoord,
    size: i32,
    origin: [i32; 3],
    registry: Arc<BlockRegistry>,
    voxels: Option<VoxelBuffer>,
    objects: ObjectBlocks,
    generated: bool,
    empty: bool,
    full: bool,
    invalid: bool,
    disposed: bool,
    terrain_dirty: bool,
    objects_dirty: bool,
    has_terrain_mesh: bool,
    has_object_batches: bool,
    times_meshed: u32,
    user_data: Option<Box<dyn Any + Send>>,
}

impl Chunk {
    /// Allocates an ungenerated chunk.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or exceeds `i32::MAX`.
    #[must_use]
    pub fn new(coord: ChunkCoord, size: u32, registry: Arc<BlockRegistry>) -> Self {
        let size = i32::try_from(size)
            .ok()
            .filter(|s| *s > 0)
            .unwrap_or_else(|| panic!("invalid chunk size {size}"));
        Self {
            coord,
            size,
            origin: coord.origin(size),
            registry,
            voxels: None,
            objects: ObjectBlocks::new(),
            generated: false,
            empty: true,
            full: false,
            invalid: false,
            disposed: false,
            terrain_dirty: false,
            objects_dirty: false,
            has_terrain_mesh: false,
            has_object_batches: false,
            times_meshed: 0,
            user_data: None,
        }
    }

    /// Chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Voxels per edge.
    #[must_use]
    pub const fn size(&self) -> i32 {
        self.size
    }

    /// World voxel coordinate of local `(0,0,0)`.
    #[must_use]
    pub const fn origin(&self) -> [i32; 3] {
        self.origin
    }

    /// Applies generator output.
    ///
    /// `buffer` holds block ids over the whole padded region. Flag bits in
    /// the input are ignored and rebuilt from the registry. Ids that are
    /// not registered become air. Fires `on_load` for interior voxels.
    ///
    /// # Panics
    ///
    /// Panics if the chunk was disposed, or if the buffer's edge length does
    /// not match the chunk's.
    pub fn init_data(&mut self, mut buffer: VoxelBuffer) {
        assert!(!self.disposed, "init_data on disposed chunk {}", self.coord);
        assert_eq!(
            i32::try_from(buffer.size()).ok(),
            Some(self.size),
            "buffer size mismatch for chunk {}",
            self.coord
        );

        let registry = Arc::clone(&self.registry);
        let padded = buffer.padded_size();
        let size = buffer.size();
        let mut all_opaque = true;
        let mut all_air = true;
        let mut unknown = 0_usize;
        self.objects.clear();

        for pz in 0..padded {
            for py in 0..padded {
                for px in 0..padded {
                    let raw = buffer.get_padded(px, py, pz);
                    let id = packing::block_id_of(raw);
                    let id = if registry.is_registered(id) {
                        id
                    } else {
                        unknown += 1;
                        BlockId::AIR
                    };
                    let packed = registry.pack(id);
                    let idx = buffer.index_padded(px, py, pz);
                    buffer.as_mut_slice()[idx] = packed;

                    all_opaque &= packing::is_opaque(packed);
                    all_air &= id.is_air();

                    let interior = (1..=size).contains(&px)
                        && (1..=size).contains(&py)
                        && (1..=size).contains(&pz);
                    if !interior || id.is_air() {
                        continue;
                    }
                    #[allow(clippy::cast_possible_truncation)]
                    let key = [(px - 1) as u32, (py - 1) as u32, (pz - 1) as u32];
                    if packing::is_object(packed) {
                        self.objects.add(id, key);
                    }
                    if let Some(on_load) = registry.handlers(id).and_then(|h| h.on_load.as_ref()) {
                        on_load(self.world_of(key));
                    }
                }
            }
        }

        if unknown > 0 {
            tracing::warn!(
                coord = %self.coord,
                count = unknown,
                "unregistered block ids replaced with air"
            );
        }

        self.full = all_opaque;
        self.empty = all_air;
        self.terrain_dirty = !(self.full || self.empty);
        self.objects_dirty = !self.objects.is_empty();
        self.generated = true;
        self.voxels = Some(buffer);
    }

    #[allow(clippy::cast_possible_wrap)]
    fn world_of(&self, key: [u32; 3]) -> [i32; 3] {
        [
            self.origin[0] + key[0] as i32,
            self.origin[1] + key[1] as i32,
            self.origin[2] + key[2] as i32,
        ]
    }

    fn packed(&self, x: i32, y: i32, z: i32) -> PackedVoxel {
        self.voxels.as_ref().map_or(0, |v| v.get(x, y, z))
    }

    /// Block id at a local coordinate (`-1..=size`). Air before data arrives.
    #[must_use]
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockId {
        BlockId(self.packed(x, y, z) & ID_MASK)
    }

    /// Solid bit at a local coordinate.
    #[must_use]
    pub fn solidity_at(&self, x: i32, y: i32, z: i32) -> bool {
        packing::is_solid(self.packed(x, y, z))
    }

    /// Writes a block at a local coordinate (`-1..=size`).
    ///
    /// Returns false if nothing changed, including when the chunk has no
    /// data yet. Padding writes update flags and dirty state only; interior
    /// writes also maintain the object map and fire `on_unset` for the old
    /// block, then `on_set` for the new one.
    ///
    /// # Panics
    ///
    /// Panics if the chunk was disposed.
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> bool {
        assert!(!self.disposed, "set on disposed chunk {}", self.coord);
        let registry = Arc::clone(&self.registry);
        let Some(voxels) = self.voxels.as_mut() else {
            return false;
        };

        let old = voxels.get(x, y, z);
        let old_id = packing::block_id_of(old);
        if old_id == id {
            return false;
        }
        let new = registry.pack(id);
        voxels.set(x, y, z, new);
        let padding = voxels.is_padding(x, y, z);

        if !id.is_air() {
            self.empty = false;
        }
        if !packing::is_opaque(new) {
            self.full = false;
        }
        if registry.is_terrain(old_id) || registry.is_terrain(id) {
            self.terrain_dirty = true;
        }
        if padding {
            return true;
        }

        #[allow(clippy::cast_sign_loss)]
        let key = [x as u32, y as u32, z as u32];
        if packing::is_object(old) {
            self.objects.remove(key);
            self.objects_dirty = true;
        }
        if packing::is_object(new) {
            self.objects.add(id, key);
            self.objects_dirty = true;
        }

        let world = self.world_of(key);
        if let Some(on_unset) = registry.handlers(old_id).and_then(|h| h.on_unset.as_ref()) {
            on_unset(world);
        }
        if let Some(on_set) = registry.handlers(id).and_then(|h| h.on_set.as_ref()) {
            on_set(world);
        }
        true
    }

    /// Rebuilds whichever meshes are dirty and hands them to the sink.
    pub fn update_meshes(
        &mut self,
        mesher: &mut GreedyMesher,
        object_mesher: &ObjectMesher,
        sink: &mut dyn RenderSink,
    ) -> MeshOutcome {
        let Some(voxels) = self.voxels.as_ref().filter(|_| self.generated) else {
            return MeshOutcome::NotReady;
        };

        let terrain = self.terrain_dirty;
        if terrain {
            if self.has_terrain_mesh {
                sink.remove_terrain_mesh(self.coord);
            }
            let mesh = mesher.mesh(voxels, self.registry.as_ref());
            self.has_terrain_mesh = !mesh.is_empty();
            if self.has_terrain_mesh {
                tracing::trace!(coord = %self.coord, quads = mesh.quad_count(), "terrain meshed");
                sink.add_terrain_mesh(self.coord, mesh);
            }
            self.terrain_dirty = false;
        }

        let objects = self.objects_dirty;
        if objects {
            if self.has_object_batches {
                sink.remove_object_batches(self.coord);
            }
            let batches = object_mesher.build(&self.objects, &self.registry, self.origin);
            self.has_object_batches = !batches.is_empty();
            for batch in batches {
                sink.add_object_batch(self.coord, batch);
            }
            self.objects_dirty = false;
        }

        if terrain || objects {
            self.times_meshed += 1;
        }
        MeshOutcome::Updated { terrain, objects }
    }

    /// Tears the chunk down: `on_unload` for every interior non-air voxel,
    /// then its meshes are removed from the sink.
    ///
    /// # Panics
    ///
    /// Panics on a second call.
    pub fn dispose(&mut self, sink: &mut dyn RenderSink) {
        assert!(!self.disposed, "chunk {} disposed twice", self.coord);

        if let Some(voxels) = self.voxels.take() {
            let registry = Arc::clone(&self.registry);
            for z in 0..self.size {
                for y in 0..self.size {
                    for x in 0..self.size {
                        let id = packing::block_id_of(voxels.get(x, y, z));
                        if id.is_air() {
                            continue;
                        }
                        if let Some(on_unload) =
                            registry.handlers(id).and_then(|h| h.on_unload.as_ref())
                        {
                            #[allow(clippy::cast_sign_loss)]
                            let key = [x as u32, y as u32, z as u32];
                            on_unload(self.world_of(key));
                        }
                    }
                }
            }
        }

        if self.has_terrain_mesh {
            sink.remove_terrain_mesh(self.coord);
            self.has_terrain_mesh = false;
        }
        if self.has_object_batches {
            sink.remove_object_batches(self.coord);
            self.has_object_batches = false;
        }
        self.objects.clear();
        self.user_data = None;
        self.terrain_dirty = false;
        self.objects_dirty = false;
        self.generated = false;
        self.disposed = true;
    }

    /// Marks the chunk for forced teardown.
    pub fn invalidate(&mut self) {
        self.invalid = true;
    }

    /// Data has been applied.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        self.generated
    }

    /// No voxel, padding included, holds anything but air.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.empty
    }

    /// Every voxel, padding included, is opaque.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.full
    }

    /// Marked for teardown.
    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Disposed.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Terrain remesh owed.
    #[must_use]
    pub const fn terrain_dirty(&self) -> bool {
        self.terrain_dirty
    }

    /// Object rebuild owed.
    #[must_use]
    pub const fn objects_dirty(&self) -> bool {
        self.objects_dirty
    }

    /// Any remesh owed.
    #[must_use]
    pub const fn needs_remesh(&self) -> bool {
        self.terrain_dirty || self.objects_dirty
    }

    /// A terrain mesh is currently installed in the sink.
    #[must_use]
    pub const fn has_terrain_mesh(&self) -> bool {
        self.has_terrain_mesh
    }

    /// Number of `update_meshes` calls that rebuilt something.
    #[must_use]
    pub const fn times_meshed(&self) -> u32 {
        self.times_meshed
    }

    /// Object voxels of the interior.
    #[must_use]
    pub fn object_blocks(&self) -> &ObjectBlocks {
        &self.objects
    }

    /// Padded voxel data, once generated.
    #[must_use]
    pub fn voxels(&self) -> Option<&VoxelBuffer> {
        self.voxels.as_ref()
    }

    /// Generator payload.
    #[must_use]
    pub fn user_data(&self) -> Option<&(dyn Any + Send)> {
        self.user_data.as_deref()
    }

    /// Replaces the generator payload.
    pub fn set_user_data(&mut self, data: Option<Box<dyn Any + Send>>) {
        self.user_data = data;
    }

    /// Removes and returns the generator payload.
    pub fn take_user_data(&mut self) -> Option<Box<dyn Any + Send>> {
        self.user_data.take()
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("coord", &self.coord)
            .field("size", &self.size)
            .field("generated", &self.generated)
            .field("empty", &self.empty)
            .field("full", &self.full)
            .field("invalid", &self.invalid)
            .field("disposed", &self.disposed)
            .field("terrain_dirty", &self.terrain_dirty)
            .field("objects_dirty", &self.objects_dirty)
            .field("objects", &self.objects.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use loam_core::{BlockHandlers, BlockOptions, MaterialDef};
    use loam_mesh::MeshingOptions;
    use parking_lot::Mutex;

    const SIZE: u32 = 4;

    struct Fixture {
        registry: Arc<BlockRegistry>,
        stone: BlockId,
        glass: BlockId,
        flower: BlockId,
        log: Arc<Mutex<Vec<(&'static str, [i32; 3])>>>,
    }

    fn fixture() -> Fixture {
        let log: Arc<Mutex<Vec<(&'static str, [i32; 3])>>> = Arc::default();
        let mut reg = BlockRegistry::new();
        reg.register_material("stone", MaterialDef::color(0.5, 0.5, 0.5));
        reg.register_material("glass", MaterialDef::color(0.8, 0.9, 1.0).with_alpha());
        reg.register_material("petal", MaterialDef::color(1.0, 0.0, 0.5));

        let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());
        let handlers = BlockHandlers::default()
            .on_load(move |p| l1.lock().push(("load", p)))
            .on_unload(move |p| l2.lock().push(("unload", p)))
            .on_set(move |p| l3.lock().push(("set", p)))
            .on_unset(move |p| l4.lock().push(("unset", p)));

        let stone = reg
            .register_block(1, BlockOptions::solid("stone").with_handlers(handlers))
            .unwrap();
        let glass = reg.register_block(2, BlockOptions::translucent("glass")).unwrap();
        let flower = reg.register_block(3, BlockOptions::object("flower", "petal")).unwrap();
        Fixture {
            registry: Arc::new(reg),
            stone,
            glass,
            flower,
            log,
        }
    }

    fn chunk(fx: &Fixture, coord: ChunkCoord) -> Chunk {
        Chunk::new(coord, SIZE, Arc::clone(&fx.registry))
    }

    fn filled(id: BlockId) -> VoxelBuffer {
        let mut buf = VoxelBuffer::new(SIZE as usize);
        buf.fill(id.raw());
        buf
    }

    #[test]
    fn test_new_chunk_has_no_data() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::new(1, 0, 0));
        assert!(!c.is_generated());
        assert_eq!(c.origin(), [4, 0, 0]);
        assert_eq!(c.get(0, 0, 0), BlockId::AIR);
        assert!(!c.set(0, 0, 0, fx.stone));
        assert_eq!(
            c.update_meshes(&mut GreedyMesher::default(), &ObjectMesher::new(), &mut NullSink),
            MeshOutcome::NotReady
        );
    }

    #[test]
    fn test_init_all_air() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(VoxelBuffer::new(SIZE as usize));
        assert!(c.is_generated());
        assert!(c.is_empty());
        assert!(!c.is_full());
        assert!(!c.terrain_dirty());
        assert!(!c.needs_remesh());
    }

    #[test]
    fn test_init_all_opaque() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(filled(fx.stone));
        assert!(c.is_full());
        assert!(!c.is_empty());
        assert!(!c.terrain_dirty());
        // on_load fires for the interior only
        assert_eq!(fx.log.lock().len(), 64);
        assert!(c.solidity_at(-1, 2, 4));
    }

    #[test]
    fn test_init_translucent_is_dirty() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(filled(fx.glass));
        assert!(!c.is_full());
        assert!(!c.is_empty());
        assert!(c.terrain_dirty());
    }

    #[test]
    fn test_init_opaque_interior_air_padding_not_full() {
        let fx = fixture();
        let mut buf = VoxelBuffer::new(SIZE as usize);
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    buf.set(x, y, z, fx.stone.raw());
                }
            }
        }
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(buf);
        assert!(!c.is_full());
        assert!(c.terrain_dirty());
    }

    #[test]
    fn test_init_replaces_unregistered_ids() {
        let fx = fixture();
        let mut buf = VoxelBuffer::new(SIZE as usize);
        buf.set(1, 1, 1, 999);
        buf.set(2, 2, 2, packing::OPAQUE_BIT | 77);
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(buf);
        assert_eq!(c.get(1, 1, 1), BlockId::AIR);
        assert_eq!(c.get(2, 2, 2), BlockId::AIR);
        assert!(c.is_empty());
    }

    #[test]
    fn test_init_repacks_flagged_input() {
        let fx = fixture();
        let mut buf = VoxelBuffer::new(SIZE as usize);
        buf.set(1, 1, 1, packing::SOLID_BIT | fx.stone.raw());
        buf.set(2, 2, 2, packing::OPAQUE_BIT | fx.glass.raw());
        let mut c = chunk(&fx, ChunkCoord::new(1, 0, 0));
        c.init_data(buf);

        assert_eq!(c.get(1, 1, 1), fx.stone);
        assert_eq!(c.get(2, 2, 2), fx.glass);
        let voxels = c.voxels().unwrap();
        assert_eq!(voxels.get(1, 1, 1), fx.registry.pack(fx.stone));
        assert_eq!(voxels.get(2, 2, 2), fx.registry.pack(fx.glass));
        assert!(!packing::is_opaque(voxels.get(2, 2, 2)));
        assert_eq!(*fx.log.lock(), vec![("load", [5, 1, 1])]);
    }

    #[test]
    fn test_init_tracks_objects() {
        let fx = fixture();
        let mut buf = VoxelBuffer::new(SIZE as usize);
        buf.set(1, 0, 2, fx.flower.raw());
        buf.set(-1, 0, 0, fx.flower.raw());
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(buf);
        assert_eq!(c.object_blocks().len(), 1);
        assert_eq!(c.object_blocks().get([1, 0, 2]), Some(fx.flower));
        assert!(c.objects_dirty());
        assert!(!c.is_empty());
    }

    #[test]
    fn test_set_get_round_trip() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::new(-1, 2, 0));
        c.init_data(VoxelBuffer::new(SIZE as usize));
        let ids = [fx.stone, fx.glass, fx.flower, BlockId::AIR];
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    for id in ids {
                        c.set(x, y, z, id);
                        assert_eq!(c.get(x, y, z), id);
                    }
                }
            }
        }
        assert!(c.object_blocks().is_empty());
    }

    #[test]
    fn test_set_same_id_is_noop() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(filled(fx.stone));
        fx.log.lock().clear();
        assert!(!c.set(1, 1, 1, fx.stone));
        assert!(!c.terrain_dirty());
        assert!(fx.log.lock().is_empty());
    }

    #[test]
    fn test_set_fires_unset_then_set_with_world_coords() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::new(1, 0, -1));
        c.init_data(VoxelBuffer::new(SIZE as usize));
        assert!(c.set(1, 2, 3, fx.stone));
        assert!(c.set(1, 2, 3, fx.glass));
        assert_eq!(
            *fx.log.lock(),
            vec![("set", [5, 2, -1]), ("unset", [5, 2, -1])]
        );
    }

    #[test]
    fn test_latches_only_narrow() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(filled(fx.stone));
        c.set(0, 0, 0, BlockId::AIR);
        assert!(!c.is_full());
        c.set(0, 0, 0, fx.stone);
        assert!(!c.is_full());

        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(VoxelBuffer::new(SIZE as usize));
        c.set(0, 0, 0, fx.stone);
        c.set(0, 0, 0, BlockId::AIR);
        assert!(!c.is_empty());
    }

    #[test]
    fn test_padding_write_skips_handlers_and_objects() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(VoxelBuffer::new(SIZE as usize));
        assert!(c.set(4, 0, 0, fx.stone));
        assert!(c.set(-1, 1, 1, fx.flower));
        assert_eq!(c.get(4, 0, 0), fx.stone);
        assert!(c.terrain_dirty());
        assert!(!c.objects_dirty());
        assert!(c.object_blocks().is_empty());
        assert!(fx.log.lock().is_empty());
    }

    #[test]
    fn test_object_edit_does_not_dirty_terrain() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(VoxelBuffer::new(SIZE as usize));
        c.set(2, 0, 2, fx.flower);
        assert!(!c.terrain_dirty());
        assert!(c.objects_dirty());

        let outcome =
            c.update_meshes(&mut GreedyMesher::default(), &ObjectMesher::new(), &mut NullSink);
        assert_eq!(
            outcome,
            MeshOutcome::Updated {
                terrain: false,
                objects: true
            }
        );
        c.set(2, 0, 2, BlockId::AIR);
        assert!(c.object_blocks().is_empty());
        assert!(c.objects_dirty());
    }

    #[test]
    fn test_update_meshes_clears_dirty() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(VoxelBuffer::new(SIZE as usize));
        c.set(1, 1, 1, fx.stone);
        let mut mesher = GreedyMesher::new(MeshingOptions::flat());
        let outcome = c.update_meshes(&mut mesher, &ObjectMesher::new(), &mut NullSink);
        assert_eq!(
            outcome,
            MeshOutcome::Updated {
                terrain: true,
                objects: false
            }
        );
        assert!(c.has_terrain_mesh());
        assert!(!c.needs_remesh());
        assert_eq!(c.times_meshed(), 1);

        let outcome = c.update_meshes(&mut mesher, &ObjectMesher::new(), &mut NullSink);
        assert_eq!(
            outcome,
            MeshOutcome::Updated {
                terrain: false,
                objects: false
            }
        );
        assert_eq!(c.times_meshed(), 1);
    }

    #[test]
    fn test_dispose_fires_unload() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(VoxelBuffer::new(SIZE as usize));
        c.set(0, 0, 0, fx.stone);
        c.set(3, 3, 3, fx.stone);
        c.set(-1, 0, 0, fx.stone);
        c.set_user_data(Some(Box::new(5_u8)));
        fx.log.lock().clear();

        c.dispose(&mut NullSink);
        let log = fx.log.lock();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|(kind, _)| *kind == "unload"));
        assert!(c.is_disposed());
        assert!(!c.is_generated());
        assert!(c.user_data().is_none());
    }

    #[test]
    #[should_panic(expected = "disposed twice")]
    fn test_double_dispose_panics() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.dispose(&mut NullSink);
        c.dispose(&mut NullSink);
    }

    #[test]
    #[should_panic(expected = "set on disposed chunk")]
    fn test_set_after_dispose_panics() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.init_data(VoxelBuffer::new(SIZE as usize));
        c.dispose(&mut NullSink);
        c.set(0, 0, 0, fx.stone);
    }

    #[test]
    fn test_user_data() {
        let fx = fixture();
        let mut c = chunk(&fx, ChunkCoord::default());
        c.set_user_data(Some(Box::new(String::from("biome:plains"))));
        let data = c.user_data().and_then(|d| d.downcast_ref::<String>());
        assert_eq!(data.map(String::as_str), Some("biome:plains"));
        assert!(c.take_user_data().is_some());
        assert!(c.user_data().is_none());
    }
}
