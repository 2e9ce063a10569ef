//! Object-block meshing.
//!
//! Voxels flagged `OBJECT_BIT` are drawn as instances of a shared mesh rather
//! than merged terrain quads. Each chunk tracks its object voxels in an
//! [`ObjectBlocks`] map; [`ObjectMesher::build`] turns that map into one
//! instanced batch per (material, block type). Every rebuild is a full
//! tear-down: the previous batches are discarded by the caller.

use loam_core::{BlockId, BlockRegistry, MaterialId, ObjectInstance};
use std::collections::BTreeMap;

/// Local voxel coordinate key (`0..size` on each axis).
pub type LocalKey = [u32; 3];

/// Offset from a voxel's minimum corner to an instance's nominal origin.
pub const INSTANCE_CENTER: [f32; 3] = [0.5, 0.0, 0.5];

/// Object voxels of one chunk, keyed by local coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectBlocks {
    entries: BTreeMap<LocalKey, BlockId>,
}

impl ObjectBlocks {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an object voxel, replacing any previous entry at `key`.
    pub fn add(&mut self, block: BlockId, key: LocalKey) {
        self.entries.insert(key, block);
    }

    /// Forgets the object voxel at `key`.
    pub fn remove(&mut self, key: LocalKey) -> Option<BlockId> {
        self.entries.remove(&key)
    }

    /// Block at `key`, if it is an object voxel.
    #[must_use]
    pub fn get(&self, key: LocalKey) -> Option<BlockId> {
        self.entries.get(&key).copied()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of object voxels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the chunk has no object voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (LocalKey, BlockId)> + '_ {
        self.entries.iter().map(|(k, b)| (*k, *b))
    }
}

/// One instanced draw batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectBatch {
    /// Render material shared by all instances.
    pub material: MaterialId,
    /// Block type of all instances.
    pub block: BlockId,
    /// Renderer-side mesh key.
    pub mesh: String,
    /// Instance transforms in chunk-local space.
    pub instances: Vec<ObjectInstance>,
    /// Object blocks are static once placed.
    pub frozen: bool,
}

impl ObjectBatch {
    /// Instance data as bytes for upload.
    #[must_use]
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// Builds instanced batches from a chunk's object voxels.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectMesher;

impl ObjectMesher {
    /// Creates an object mesher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Builds all batches for one chunk.
    ///
    /// `origin` is the chunk's world voxel origin; custom placement handlers
    /// see instances in world space and world voxel coordinates.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn build(
        &self,
        blocks: &ObjectBlocks,
        registry: &BlockRegistry,
        origin: [i32; 3],
    ) -> Vec<ObjectBatch> {
        let bias = origin.map(|o| o as f32);
        let mut groups: BTreeMap<(MaterialId, BlockId), Vec<ObjectInstance>> = BTreeMap::new();

        for (key, block) in blocks.iter() {
            let Some(def) = registry.object_mesh(block) else {
                tracing::warn!(block = block.raw(), "object voxel without object mesh, skipped");
                continue;
            };

            let mut instance = ObjectInstance::at([
                key[0] as f32 + INSTANCE_CENTER[0],
                key[1] as f32 + INSTANCE_CENTER[1],
                key[2] as f32 + INSTANCE_CENTER[2],
            ]);

            let hook = registry
                .handlers(block)
                .and_then(|h| h.on_custom_mesh_create.as_ref());
            if let Some(hook) = hook {
                #[allow(clippy::cast_possible_wrap)]
                let world = [
                    origin[0] + key[0] as i32,
                    origin[1] + key[1] as i32,
                    origin[2] + key[2] as i32,
                ];
                for axis in 0..3 {
                    instance.position[axis] += bias[axis];
                }
                hook(&mut instance, world);
                for axis in 0..3 {
                    instance.position[axis] -= bias[axis];
                }
            }

            groups.entry((def.material, block)).or_default().push(instance);
        }

        groups
            .into_iter()
            .filter_map(|((material, block), instances)| {
                let mesh = registry.object_mesh(block)?.mesh.clone();
                Some(ObjectBatch {
                    material,
                    block,
                    mesh,
                    instances,
                    frozen: true,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_core::{BlockHandlers, BlockOptions, MaterialDef};

    fn registry() -> (BlockRegistry, BlockId, BlockId, BlockId) {
        let mut reg = BlockRegistry::new();
        reg.register_material("petal", MaterialDef::color(1.0, 0.2, 0.4));
        reg.register_material("stem", MaterialDef::color(0.1, 0.7, 0.1));
        let rose = reg
            .register_block(10, BlockOptions::object("rose", "petal"))
            .unwrap();
        let tulip = reg
            .register_block(11, BlockOptions::object("tulip", "petal"))
            .unwrap();
        let fern = reg
            .register_block(
                12,
                BlockOptions::object("fern", "stem").with_handlers(
                    BlockHandlers::default().on_custom_mesh_create(|inst, world| {
                        // Lift by the world x coordinate to prove world space is visible.
                        #[allow(clippy::cast_precision_loss)]
                        let lift = world[0] as f32;
                        inst.position[1] += lift;
                        inst.scale = [2.0; 3];
                    }),
                ),
            )
            .unwrap();
        (reg, rose, tulip, fern)
    }

    #[test]
    fn test_add_remove() {
        let mut blocks = ObjectBlocks::new();
        blocks.add(BlockId(10), [1, 2, 3]);
        blocks.add(BlockId(11), [1, 2, 3]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.get([1, 2, 3]), Some(BlockId(11)));
        assert_eq!(blocks.remove([1, 2, 3]), Some(BlockId(11)));
        assert!(blocks.is_empty());
        assert_eq!(blocks.remove([1, 2, 3]), None);
    }

    #[test]
    fn test_grouping_by_material_then_block() {
        let (reg, rose, tulip, fern) = registry();
        let mut blocks = ObjectBlocks::new();
        blocks.add(tulip, [0, 0, 0]);
        blocks.add(rose, [1, 0, 0]);
        blocks.add(rose, [2, 0, 0]);
        blocks.add(fern, [3, 0, 0]);

        let batches = ObjectMesher::new().build(&blocks, &reg, [0, 0, 0]);
        let order: Vec<_> = batches.iter().map(|b| (b.material.raw(), b.block)).collect();
        assert_eq!(order, vec![(1, rose), (1, tulip), (2, fern)]);
        assert_eq!(batches[0].instances.len(), 2);
        assert_eq!(batches[0].mesh, "rose");
        assert!(batches.iter().all(|b| b.frozen));
    }

    #[test]
    fn test_instances_at_voxel_center() {
        let (reg, rose, _, _) = registry();
        let mut blocks = ObjectBlocks::new();
        blocks.add(rose, [4, 5, 6]);
        let batches = ObjectMesher::new().build(&blocks, &reg, [32, 0, -32]);
        assert_eq!(batches[0].instances[0].position, [4.5, 5.0, 6.5]);
        assert_eq!(batches[0].instance_bytes().len(), 36);
    }

    #[test]
    fn test_custom_placement_sees_world_space() {
        let (reg, _, _, fern) = registry();
        let mut blocks = ObjectBlocks::new();
        blocks.add(fern, [1, 0, 1]);
        let batches = ObjectMesher::new().build(&blocks, &reg, [16, 0, 0]);
        let inst = batches[0].instances[0];
        // Handler lifted by world x = 17, result is back in local space.
        assert_eq!(inst.position, [1.5, 17.0, 1.5]);
        assert_eq!(inst.scale, [2.0; 3]);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (reg, rose, tulip, _) = registry();
        let mut blocks = ObjectBlocks::new();
        blocks.add(rose, [0, 1, 0]);
        blocks.add(tulip, [2, 1, 0]);
        let mesher = ObjectMesher::new();
        assert_eq!(
            mesher.build(&blocks, &reg, [0, 0, 0]),
            mesher.build(&blocks, &reg, [0, 0, 0])
        );
        blocks.remove([0, 1, 0]);
        assert_eq!(mesher.build(&blocks, &reg, [0, 0, 0]).len(), 1);
    }
}
