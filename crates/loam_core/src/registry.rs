//! Block registry.
//!
//! Flat lookup tables indexed by block id, plus the material table they
//! reference. Chunks and meshers hold the registry through an `Arc` and only
//! read it; all registration happens before the world starts streaming.
//!
//! Material lists follow a compact convention:
//!
//! | len | meaning |
//! |-----|---------|
//! | 1 | every face |
//! | 2 | `[top/bottom, sides]` |
//! | 3 | `[top, bottom, sides]` |
//! | 6 | `[+x, -x, +y, -y, +z, -z]` |

use crate::error::{RegistryError, RegistryResult};
use crate::packing::{
    BlockId, FaceDir, MaterialId, PackedVoxel, ID_MASK, MAX_BLOCK_ID, OBJECT_BIT, OPAQUE_BIT,
    SOLID_BIT,
};
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;

/// Number of slots in every block table.
const TABLE_SIZE: usize = MAX_BLOCK_ID as usize + 1;

/// Color used for materials that were never registered.
const DEFAULT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Render material definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDef {
    /// Base RGB color, multiplied by AO factors at mesh time.
    pub color: [f32; 3],
    /// Optional texture key, opaque to this crate.
    pub texture: Option<String>,
    /// Whether the renderer must treat the material as translucent.
    pub has_alpha: bool,
}

impl MaterialDef {
    /// A flat-colored material.
    #[must_use]
    pub const fn color(r: f32, g: f32, b: f32) -> Self {
        Self {
            color: [r, g, b],
            texture: None,
            has_alpha: false,
        }
    }

    /// A textured material with a white base color.
    #[must_use]
    pub fn textured(texture: impl Into<String>) -> Self {
        Self {
            color: DEFAULT_COLOR,
            texture: Some(texture.into()),
            has_alpha: false,
        }
    }

    /// Marks the material as translucent.
    #[must_use]
    pub fn with_alpha(mut self) -> Self {
        self.has_alpha = true;
        self
    }
}

impl Default for MaterialDef {
    fn default() -> Self {
        Self::color(DEFAULT_COLOR[0], DEFAULT_COLOR[1], DEFAULT_COLOR[2])
    }
}

/// Transform of one object-block instance.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectInstance {
    /// Position (chunk-local, except while a custom-placement handler runs).
    pub position: [f32; 3],
    /// Euler rotation in radians.
    pub rotation: [f32; 3],
    /// Per-axis scale.
    pub scale: [f32; 3],
}

impl ObjectInstance {
    /// Instance at a position with identity rotation and unit scale.
    #[must_use]
    pub const fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// Resolved instanced-mesh description of an object block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeshDef {
    /// Renderer-side mesh key.
    pub mesh: String,
    /// Render material the instances are grouped under.
    pub material: MaterialId,
}

/// Per-voxel lifecycle handler. Receives world voxel coordinates.
pub type VoxelHandler = Box<dyn Fn([i32; 3]) + Send + Sync>;

/// Custom placement hook for object-block instances. Receives the instance
/// (positioned in world space) and the world voxel coordinates.
pub type CustomMeshHandler = Box<dyn Fn(&mut ObjectInstance, [i32; 3]) + Send + Sync>;

/// Optional per-block-type handlers.
#[derive(Default)]
pub struct BlockHandlers {
    /// Fired for each interior voxel of this type when chunk data arrives.
    pub on_load: Option<VoxelHandler>,
    /// Fired for each interior voxel of this type when a chunk is disposed.
    pub on_unload: Option<VoxelHandler>,
    /// Fired after a voxel is set to this type.
    pub on_set: Option<VoxelHandler>,
    /// Fired when a voxel of this type is overwritten.
    pub on_unset: Option<VoxelHandler>,
    /// Adjusts object-block instances as they are built.
    pub on_custom_mesh_create: Option<CustomMeshHandler>,
}

impl BlockHandlers {
    /// Sets the load handler.
    #[must_use]
    pub fn on_load(mut self, f: impl Fn([i32; 3]) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Box::new(f));
        self
    }

    /// Sets the unload handler.
    #[must_use]
    pub fn on_unload(mut self, f: impl Fn([i32; 3]) + Send + Sync + 'static) -> Self {
        self.on_unload = Some(Box::new(f));
        self
    }

    /// Sets the set handler.
    #[must_use]
    pub fn on_set(mut self, f: impl Fn([i32; 3]) + Send + Sync + 'static) -> Self {
        self.on_set = Some(Box::new(f));
        self
    }

    /// Sets the unset handler.
    #[must_use]
    pub fn on_unset(mut self, f: impl Fn([i32; 3]) + Send + Sync + 'static) -> Self {
        self.on_unset = Some(Box::new(f));
        self
    }

    /// Sets the custom placement hook.
    #[must_use]
    pub fn on_custom_mesh_create(
        mut self,
        f: impl Fn(&mut ObjectInstance, [i32; 3]) + Send + Sync + 'static,
    ) -> Self {
        self.on_custom_mesh_create = Some(Box::new(f));
        self
    }

    /// True if no handler is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on_load.is_none()
            && self.on_unload.is_none()
            && self.on_set.is_none()
            && self.on_unset.is_none()
            && self.on_custom_mesh_create.is_none()
    }
}

/// Block registration options.
#[derive(Default)]
pub struct BlockOptions {
    /// Participates in physics and AO.
    pub solid: bool,
    /// Occludes neighbor faces.
    pub opaque: bool,
    /// Fluid block (never solid).
    pub fluid: bool,
    /// Material names, see the module docs for list semantics.
    pub materials: Vec<String>,
    /// Mesh key for object blocks.
    pub object_mesh: Option<String>,
    /// Lifecycle handlers.
    pub handlers: BlockHandlers,
}

impl BlockOptions {
    /// A solid opaque block using one material on every face.
    #[must_use]
    pub fn solid(material: &str) -> Self {
        Self {
            solid: true,
            opaque: true,
            materials: vec![material.to_string()],
            ..Self::default()
        }
    }

    /// A solid opaque block with a per-face material list.
    #[must_use]
    pub fn solid_faces(materials: &[&str]) -> Self {
        Self {
            solid: true,
            opaque: true,
            materials: materials.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// A solid block that does not occlude its neighbors (glass, leaves).
    #[must_use]
    pub fn translucent(material: &str) -> Self {
        Self {
            solid: true,
            opaque: false,
            materials: vec![material.to_string()],
            ..Self::default()
        }
    }

    /// A non-solid, non-opaque fluid.
    #[must_use]
    pub fn fluid(material: &str) -> Self {
        Self {
            fluid: true,
            materials: vec![material.to_string()],
            ..Self::default()
        }
    }

    /// An instanced object block.
    #[must_use]
    pub fn object(mesh: &str, material: &str) -> Self {
        Self {
            materials: vec![material.to_string()],
            object_mesh: Some(mesh.to_string()),
            ..Self::default()
        }
    }

    /// Sets solidity.
    #[must_use]
    pub fn with_solid(mut self, solid: bool) -> Self {
        self.solid = solid;
        self
    }

    /// Attaches handlers.
    #[must_use]
    pub fn with_handlers(mut self, handlers: BlockHandlers) -> Self {
        self.handlers = handlers;
        self
    }
}

/// Flat block lookup tables.
pub struct BlockRegistry {
    registered: Vec<bool>,
    solid: Vec<bool>,
    opaque: Vec<bool>,
    fluid: Vec<bool>,
    object: Vec<bool>,
    face_materials: Vec<[MaterialId; 6]>,
    object_meshes: Vec<Option<ObjectMeshDef>>,
    handlers: Vec<Option<Box<BlockHandlers>>>,
    /// Index 0 is the "no material" slot.
    materials: Vec<MaterialDef>,
    material_names: HashMap<String, MaterialId>,
}

#[inline]
const fn slot(id: BlockId) -> usize {
    (id.0 & ID_MASK) as usize
}

impl BlockRegistry {
    /// Creates a registry containing only air.
    #[must_use]
    pub fn new() -> Self {
        let mut registered = vec![false; TABLE_SIZE];
        registered[0] = true;
        Self {
            registered,
            solid: vec![false; TABLE_SIZE],
            opaque: vec![false; TABLE_SIZE],
            fluid: vec![false; TABLE_SIZE],
            object: vec![false; TABLE_SIZE],
            face_materials: vec![[MaterialId::NONE; 6]; TABLE_SIZE],
            object_meshes: vec![None; TABLE_SIZE],
            handlers: (0..TABLE_SIZE).map(|_| None).collect(),
            materials: vec![MaterialDef::default()],
            material_names: HashMap::new(),
        }
    }

    /// Registers (or redefines) a named material.
    ///
    /// Re-registering a name keeps its id.
    #[allow(clippy::cast_possible_truncation)]
    pub fn register_material(&mut self, name: &str, def: MaterialDef) -> MaterialId {
        if let Some(&id) = self.material_names.get(name) {
            self.materials[id.raw() as usize] = def;
            return id;
        }
        let id = MaterialId::new(self.materials.len() as u16);
        self.materials.push(def);
        self.material_names.insert(name.to_string(), id);
        tracing::debug!(material = name, id = id.raw(), "registered material");
        id
    }

    /// Looks up a material id by name.
    #[must_use]
    pub fn material_id(&self, name: &str) -> Option<MaterialId> {
        self.material_names.get(name).copied()
    }

    /// Material definition, if registered.
    #[must_use]
    pub fn material(&self, id: MaterialId) -> Option<&MaterialDef> {
        if id.is_none() {
            return None;
        }
        self.materials.get(id.raw() as usize)
    }

    /// Registers a block type at an explicit id.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is 0 or above [`MAX_BLOCK_ID`], if a
    /// material name is unknown, if the material list has an unsupported
    /// length, or if an object block is declared opaque.
    pub fn register_block(&mut self, id: u32, options: BlockOptions) -> RegistryResult<BlockId> {
        let raw = u16::try_from(id)
            .ok()
            .filter(|&r| r != 0 && r <= MAX_BLOCK_ID)
            .ok_or(RegistryError::IdOutOfRange { id, max: MAX_BLOCK_ID })?;
        let block = BlockId::new(raw);

        if options.object_mesh.is_some() && options.opaque {
            return Err(RegistryError::ObjectBlockOpaque { id: raw });
        }

        let resolved = options
            .materials
            .iter()
            .map(|name| {
                self.material_id(name)
                    .ok_or_else(|| RegistryError::UnknownMaterial(name.clone()))
            })
            .collect::<RegistryResult<Vec<_>>>()?;

        let faces = match resolved.as_slice() {
            [] => [MaterialId::NONE; 6],
            &[all] => [all; 6],
            &[top_bottom, sides] => [sides, sides, top_bottom, top_bottom, sides, sides],
            &[top, bottom, sides] => [sides, sides, top, bottom, sides, sides],
            &[px, nx, py, ny, pz, nz] => [px, nx, py, ny, pz, nz],
            other => {
                return Err(RegistryError::BadMaterialList {
                    id: raw,
                    len: other.len(),
                })
            }
        };

        let i = slot(block);
        self.registered[i] = true;
        self.solid[i] = options.solid && !options.fluid;
        self.opaque[i] = options.opaque;
        self.fluid[i] = options.fluid;
        self.object[i] = options.object_mesh.is_some();
        self.face_materials[i] = faces;
        self.object_meshes[i] = options.object_mesh.map(|mesh| ObjectMeshDef {
            mesh,
            material: faces[0],
        });
        self.handlers[i] = if options.handlers.is_empty() {
            None
        } else {
            Some(Box::new(options.handlers))
        };

        tracing::debug!(
            block = raw,
            solid = self.solid[i],
            opaque = self.opaque[i],
            object = self.object[i],
            "registered block"
        );
        Ok(block)
    }

    /// Packs a block id with its flag bits.
    #[inline]
    #[must_use]
    pub fn pack(&self, id: BlockId) -> PackedVoxel {
        let i = slot(id);
        let mut packed = id.0 & ID_MASK;
        if self.solid[i] {
            packed |= SOLID_BIT;
        }
        if self.opaque[i] {
            packed |= OPAQUE_BIT;
        }
        if self.object[i] {
            packed |= OBJECT_BIT;
        }
        packed
    }

    /// True if the id is air or has been registered.
    #[inline]
    #[must_use]
    pub fn is_registered(&self, id: BlockId) -> bool {
        id.0 <= MAX_BLOCK_ID && self.registered[slot(id)]
    }

    /// Solidity lookup.
    #[inline]
    #[must_use]
    pub fn is_solid(&self, id: BlockId) -> bool {
        self.solid[slot(id)]
    }

    /// Opacity lookup.
    #[inline]
    #[must_use]
    pub fn is_opaque(&self, id: BlockId) -> bool {
        self.opaque[slot(id)]
    }

    /// Fluidity lookup.
    #[inline]
    #[must_use]
    pub fn is_fluid(&self, id: BlockId) -> bool {
        self.fluid[slot(id)]
    }

    /// Object-mesh lookup.
    #[inline]
    #[must_use]
    pub fn is_object(&self, id: BlockId) -> bool {
        self.object[slot(id)]
    }

    /// Whether a block counts as terrain for remeshing purposes.
    ///
    /// Air is never terrain. Object blocks are terrain only when solid, since
    /// they then contribute to neighbor AO.
    #[inline]
    #[must_use]
    pub fn is_terrain(&self, id: BlockId) -> bool {
        if id.is_air() {
            return false;
        }
        if self.is_object(id) {
            return self.is_solid(id);
        }
        true
    }

    /// Material drawn on one face of a block.
    #[inline]
    #[must_use]
    pub fn face_material(&self, id: BlockId, face: FaceDir) -> MaterialId {
        self.face_materials[slot(id)][face.index()]
    }

    /// Base color of a material. Unknown materials are white.
    #[inline]
    #[must_use]
    pub fn material_color(&self, id: MaterialId) -> [f32; 3] {
        self.materials
            .get(id.raw() as usize)
            .map_or(DEFAULT_COLOR, |m| m.color)
    }

    /// Object mesh description for object blocks.
    #[inline]
    #[must_use]
    pub fn object_mesh(&self, id: BlockId) -> Option<&ObjectMeshDef> {
        self.object_meshes[slot(id)].as_ref()
    }

    /// Handler set, or `None` for the common no-handler case.
    #[inline]
    #[must_use]
    pub fn handlers(&self, id: BlockId) -> Option<&BlockHandlers> {
        self.handlers[slot(id)].as_deref()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
