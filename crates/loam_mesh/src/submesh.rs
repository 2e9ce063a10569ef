//! Per-material geometry accumulators.

use loam_core::MaterialId;
use std::collections::BTreeMap;

/// Geometry for one material within one chunk.
///
/// All arrays are flattened: 3 floats per position/normal, 4 per color
/// (RGBA), 2 per uv, 4 vertices and 6 indices per quad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submesh {
    /// Material these quads are drawn with.
    pub material: MaterialId,
    /// Vertex positions in chunk-local space.
    pub positions: Vec<f32>,
    /// Triangle indices into the vertex arrays.
    pub indices: Vec<u32>,
    /// Flat per-vertex normals.
    pub normals: Vec<f32>,
    /// AO-modulated per-vertex colors.
    pub colors: Vec<f32>,
    /// Texture coordinates, in voxel units.
    pub uvs: Vec<f32>,
}

impl Submesh {
    /// Creates an empty submesh for a material.
    #[must_use]
    pub fn new(material: MaterialId) -> Self {
        Self {
            material,
            ..Self::default()
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of quads.
    #[must_use]
    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Returns true if no geometry has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Position data as bytes for upload.
    #[must_use]
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Index data as bytes for upload.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Normal data as bytes for upload.
    #[must_use]
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    /// Color data as bytes for upload.
    #[must_use]
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    /// UV data as bytes for upload.
    #[must_use]
    pub fn uv_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uvs)
    }
}

/// Terrain geometry for one chunk, keyed by material.
///
/// Ordered by material id so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainMesh {
    submeshes: BTreeMap<MaterialId, Submesh>,
}

impl TerrainMesh {
    /// Creates an empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submesh for a material, created on first use.
    pub fn entry(&mut self, material: MaterialId) -> &mut Submesh {
        self.submeshes
            .entry(material)
            .or_insert_with(|| Submesh::new(material))
    }

    /// Submesh for a material, if any quads use it.
    #[must_use]
    pub fn get(&self, material: MaterialId) -> Option<&Submesh> {
        self.submeshes.get(&material)
    }

    /// Iterates submeshes in material order.
    pub fn iter(&self) -> impl Iterator<Item = &Submesh> {
        self.submeshes.values()
    }

    /// Number of materials used.
    #[must_use]
    pub fn len(&self) -> usize {
        self.submeshes.len()
    }

    /// True if the mesh has no geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.submeshes.values().all(Submesh::is_empty)
    }

    /// Total quads across materials.
    #[must_use]
    pub fn quad_count(&self) -> usize {
        self.submeshes.values().map(Submesh::quad_count).sum()
    }

    /// Consumes the mesh, yielding its submeshes in material order.
    #[must_use]
    pub fn into_submeshes(self) -> Vec<Submesh> {
        self.submeshes.into_values().collect()
    }
}
