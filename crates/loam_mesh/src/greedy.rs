//! Greedy Meshing with baked ambient occlusion.
//!
//! Converts a padded voxel grid into per-material quad geometry.
//!
//! ## Algorithm
//!
//! 1. For each axis `d` (u, v = the other two axes in cyclic order):
//! 2. Sweep `size + 1` boundary planes along `d`
//! 3. Build a 2D face mask (`±material`) and a packed AO mask per plane
//! 4. Greedily merge runs of identical mask cells, row-major
//! 5. Emit one quad (4 vertices, 6 indices) per merged rectangle
//!
//! Plane `i` separates local voxels `i-1` and `i` along `d`. The planes at
//! `0` and `size` keep only faces of interior voxels; faces of padding voxels
//! belong to the neighboring chunk.

use crate::submesh::TerrainMesh;
use loam_core::packing::{block_id_of, is_object, is_opaque, is_solid, PackedVoxel};
use loam_core::{BlockId, BlockRegistry, FaceDir, MaterialId, VoxelBuffer};
use serde::{Deserialize, Serialize};

/// Highest AO level (fully occluded corner).
pub const AO_MAX: u8 = 3;

/// Material callbacks consumed by the mesher.
pub trait MaterialSource {
    /// Material drawn on one face of a block.
    fn face_material(&self, block: BlockId, face: FaceDir) -> MaterialId;

    /// Base RGB color of a material.
    fn material_color(&self, material: MaterialId) -> [f32; 3];
}

impl MaterialSource for BlockRegistry {
    fn face_material(&self, block: BlockId, face: FaceDir) -> MaterialId {
        BlockRegistry::face_material(self, block, face)
    }

    fn material_color(&self, material: MaterialId) -> [f32; 3] {
        BlockRegistry::material_color(self, material)
    }
}

/// AO settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshingOptions {
    /// Bake ambient occlusion into vertex colors.
    pub ao: bool,
    /// Color multipliers for AO levels 1, 2 and 3.
    pub ao_levels: [f32; 3],
    /// Color multiplier for level 0 (exposed edge).
    pub reverse_ao: f32,
}

impl Default for MeshingOptions {
    fn default() -> Self {
        Self {
            ao: true,
            ao_levels: [0.93, 0.8, 0.5],
            reverse_ao: 1.05,
        }
    }
}

impl MeshingOptions {
    /// Options with AO disabled.
    #[must_use]
    pub fn flat() -> Self {
        Self {
            ao: false,
            ..Self::default()
        }
    }

    #[inline]
    fn multiplier(&self, level: u8) -> f32 {
        match level {
            0 => self.reverse_ao,
            l => self.ao_levels[usize::from(l.min(AO_MAX)) - 1],
        }
    }
}

/// Unpacks the four 2-bit AO levels as `[a00, a01, a10, a11]`.
///
/// `a{j}{k}`: `j`/`k` select the low (0) or high (1) corner along u/v.
#[inline]
#[must_use]
pub const fn unpack_ao(packed: u8) -> [u8; 4] {
    [packed & 3, (packed >> 2) & 3, (packed >> 4) & 3, (packed >> 6) & 3]
}

#[inline]
const fn pack_ao_levels(a00: u8, a01: u8, a10: u8, a11: u8) -> u8 {
    a11 << 6 | a10 << 4 | a01 << 2 | a00
}

/// Which neighbor owns a face, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaceOwner {
    /// Voxel at `i-1`, face points `+d`.
    Low,
    /// Voxel at `i`, face points `-d`.
    High,
}

/// Decides whether a face exists between two packed voxels.
///
/// Two different non-opaque, non-air, non-object blocks get no face.
#[inline]
fn face_owner(low: PackedVoxel, high: PackedVoxel) -> Option<FaceOwner> {
    if low == high {
        return None;
    }
    let (op_low, op_high) = (is_opaque(low), is_opaque(high));
    if op_low && op_high {
        return None;
    }
    if op_low {
        return Some(FaceOwner::Low);
    }
    if op_high {
        return Some(FaceOwner::High);
    }
    let empty_low = block_id_of(low).is_air() || is_object(low);
    let empty_high = block_id_of(high).is_air() || is_object(high);
    match (empty_low, empty_high) {
        (false, true) => Some(FaceOwner::Low),
        (true, false) => Some(FaceOwner::High),
        _ => None,
    }
}

/// A transposed view over padded cells: `at(d, u, v)`.
struct AxisView<'a> {
    cells: &'a [PackedVoxel],
    sd: usize,
    su: usize,
    sv: usize,
}

impl AxisView<'_> {
    #[inline]
    fn at(&self, pd: usize, pu: usize, pv: usize) -> PackedVoxel {
        self.cells[pd * self.sd + pu * self.su + pv * self.sv]
    }

    #[inline]
    fn solid(&self, pd: usize, pu: usize, pv: usize) -> bool {
        is_solid(self.at(pd, pu, pv))
    }

    /// AO levels for the face between layers `ipos` (faced into) and
    /// `ineg` (behind), at padded in-plane cell `(j, k)`.
    fn pack_ao(&self, ipos: usize, ineg: usize, j: usize, k: usize) -> u8 {
        let (mut a00, mut a01, mut a10, mut a11) = (1u8, 1u8, 1u8, 1u8);

        if self.solid(ipos, j + 1, k) {
            a10 += 1;
            a11 += 1;
        }
        if self.solid(ipos, j - 1, k) {
            a00 += 1;
            a01 += 1;
        }
        if self.solid(ipos, j, k + 1) {
            a01 += 1;
            a11 += 1;
        }
        if self.solid(ipos, j, k - 1) {
            a00 += 1;
            a10 += 1;
        }

        // Facing into a solid (non-opaque) voxel: corners saturate.
        if self.solid(ipos, j, k) {
            let sat = |a: u8, corner: bool| if a == AO_MAX || corner { AO_MAX } else { 2 };
            a11 = sat(a11, self.solid(ipos, j + 1, k + 1));
            a01 = sat(a01, self.solid(ipos, j - 1, k + 1));
            a10 = sat(a10, self.solid(ipos, j + 1, k - 1));
            a00 = sat(a00, self.solid(ipos, j - 1, k - 1));
            return pack_ao_levels(a00, a01, a10, a11);
        }

        // Facing open space: an unoccluded corner drops to 0 unless the
        // three voxels behind it are all solid.
        let open = |a: u8, ju: usize, kv: usize| -> u8 {
            if a != 1 {
                return a;
            }
            if self.solid(ipos, ju, kv) {
                return 2;
            }
            let backed = self.solid(ineg, j, kv) && self.solid(ineg, ju, k) && self.solid(ineg, ju, kv);
            if backed {
                1
            } else {
                0
            }
        };
        a11 = open(a11, j + 1, k + 1);
        a10 = open(a10, j + 1, k - 1);
        a01 = open(a01, j - 1, k + 1);
        a00 = open(a00, j - 1, k - 1);
        pack_ao_levels(a00, a01, a10, a11)
    }
}

/// Picks the quad diagonal. `true` splits along 00-11.
#[inline]
fn split_along_00_11(ao: [u8; 4]) -> bool {
    let [a00, a01, a10, a11] = ao;
    if a00 == a11 {
        if a01 == a10 {
            a01 == AO_MAX
        } else {
            true
        }
    } else if a01 == a10 {
        false
    } else {
        a00 + a11 > a01 + a10
    }
}

/// Greedy meshing engine.
///
/// Mask buffers are kept between calls; one mesher serves every chunk.
pub struct GreedyMesher {
    options: MeshingOptions,
    /// `+material` / `-material` per in-plane cell, 0 = no face.
    mask: Vec<i32>,
    /// Packed AO levels per in-plane cell.
    ao_mask: Vec<u8>,
}

impl GreedyMesher {
    /// Creates a mesher with the given AO settings.
    #[must_use]
    pub fn new(options: MeshingOptions) -> Self {
        Self {
            options,
            mask: Vec::new(),
            ao_mask: Vec::new(),
        }
    }

    /// Active AO settings.
    #[must_use]
    pub fn options(&self) -> &MeshingOptions {
        &self.options
    }

    /// Meshes a padded voxel grid.
    ///
    /// Output is deterministic: the same grid and materials always produce
    /// identical arrays in identical order.
    pub fn mesh<M: MaterialSource + ?Sized>(
        &mut self,
        voxels: &VoxelBuffer,
        materials: &M,
    ) -> TerrainMesh {
        let size = voxels.size();
        let area = size * size;
        self.mask.clear();
        self.mask.resize(area, 0);
        self.ao_mask.clear();
        self.ao_mask.resize(area, 0);

        let strides = voxels.strides();
        let mut mesh = TerrainMesh::new();

        for d in 0..3 {
            let u = (d + 1) % 3;
            let v = (d + 2) % 3;
            let view = AxisView {
                cells: voxels.as_slice(),
                sd: strides[d],
                su: strides[u],
                sv: strides[v],
            };
            for i in 0..=size {
                if self.build_masks(&view, materials, d, i, size) == 0 {
                    continue;
                }
                self.extract_quads(&mut mesh, materials, d, i, size);
            }
        }

        tracing::trace!(
            quads = mesh.quad_count(),
            materials = mesh.len(),
            "greedy mesh built"
        );
        mesh
    }

    /// Fills the face and AO masks for plane `i`. Returns the face count.
    fn build_masks<M: MaterialSource + ?Sized>(
        &mut self,
        view: &AxisView<'_>,
        materials: &M,
        d: usize,
        i: usize,
        size: usize,
    ) -> usize {
        let pos_dir = FaceDir::from_axis(d, true);
        let neg_dir = FaceDir::from_axis(d, false);
        let mut faces = 0;
        let mut n = 0;

        for k in 0..size {
            for j in 0..size {
                let (pu, pv) = (j + 1, k + 1);
                // Padded layer i holds local i-1, layer i+1 holds local i.
                let low = view.at(i, pu, pv);
                let high = view.at(i + 1, pu, pv);

                let face = match face_owner(low, high) {
                    Some(FaceOwner::Low) if i > 0 => {
                        let m = materials.face_material(block_id_of(low), pos_dir);
                        Some((i32::from(m.raw()), i + 1, i))
                    }
                    Some(FaceOwner::High) if i < size => {
                        let m = materials.face_material(block_id_of(high), neg_dir);
                        Some((-i32::from(m.raw()), i, i + 1))
                    }
                    _ => None,
                };

                if let Some((value, ipos, ineg)) = face {
                    if value != 0 {
                        self.mask[n] = value;
                        if self.options.ao {
                            self.ao_mask[n] = view.pack_ao(ipos, ineg, pu, pv);
                        }
                        faces += 1;
                    }
                }
                n += 1;
            }
        }
        faces
    }

    /// Merges mask cells into quads and appends them to `mesh`.
    fn extract_quads<M: MaterialSource + ?Sized>(
        &mut self,
        mesh: &mut TerrainMesh,
        materials: &M,
        d: usize,
        i: usize,
        size: usize,
    ) {
        let u = (d + 1) % 3;
        let v = (d + 2) % 3;

        for k in 0..size {
            let mut j = 0;
            while j < size {
                let n = j + k * size;
                let value = self.mask[n];
                if value == 0 {
                    j += 1;
                    continue;
                }
                let ao = self.ao_mask[n];
                let same = |idx: usize| self.mask[idx] == value && self.ao_mask[idx] == ao;

                let mut w = 1;
                while j + w < size && same(n + w) {
                    w += 1;
                }

                let mut h = 1;
                'height: while k + h < size {
                    for m in 0..w {
                        if !same(n + m + h * size) {
                            break 'height;
                        }
                    }
                    h += 1;
                }

                self.emit_quad(mesh, materials, value, ao, [d, u, v], [i, j, k], w, h);

                for dh in 0..h {
                    let row = n + dh * size;
                    self.mask[row..row + w].fill(0);
                }
                j += w;
            }
        }
    }

    #[allow(clippy::too_many_arguments, clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn emit_quad<M: MaterialSource + ?Sized>(
        &self,
        mesh: &mut TerrainMesh,
        materials: &M,
        value: i32,
        ao: u8,
        [d, u, v]: [usize; 3],
        [i, j, k]: [usize; 3],
        w: usize,
        h: usize,
    ) {
        let material = MaterialId::new(value.unsigned_abs() as u16);
        let base = materials.material_color(material);
        let sub = mesh.entry(material);
        let dir: f32 = if value > 0 { 1.0 } else { -1.0 };
        let (wf, hf) = (w as f32, h as f32);

        // Vertex order: x, x+du, x+du+dv, x+dv.
        let levels = unpack_ao(ao);
        let [a00, a01, a10, a11] = levels;
        let split = if self.options.ao {
            for level in [a00, a10, a11, a01] {
                let mult = self.options.multiplier(level);
                sub.colors
                    .extend_from_slice(&[base[0] * mult, base[1] * mult, base[2] * mult, 1.0]);
            }
            split_along_00_11(levels)
        } else {
            for _ in 0..4 {
                sub.colors.extend_from_slice(&[base[0], base[1], base[2], 1.0]);
            }
            true
        };

        let mut x = [0.0f32; 3];
        x[d] = i as f32;
        x[u] = j as f32;
        x[v] = k as f32;
        let mut du = [0.0f32; 3];
        du[u] = wf;
        let mut dv = [0.0f32; 3];
        dv[v] = hf;

        let vs = sub.vertex_count() as u32;
        sub.positions.extend_from_slice(&[
            x[0],
            x[1],
            x[2],
            x[0] + du[0],
            x[1] + du[1],
            x[2] + du[2],
            x[0] + du[0] + dv[0],
            x[1] + du[1] + dv[1],
            x[2] + du[2] + dv[2],
            x[0] + dv[0],
            x[1] + dv[1],
            x[2] + dv[2],
        ]);

        if d == 2 {
            sub.uvs
                .extend_from_slice(&[0.0, hf, -dir * wf, hf, -dir * wf, 0.0, 0.0, 0.0]);
        } else {
            sub.uvs
                .extend_from_slice(&[0.0, wf, 0.0, 0.0, dir * hf, 0.0, dir * hf, wf]);
        }

        let indices = match (value < 0, split) {
            (true, true) => [vs, vs + 1, vs + 2, vs, vs + 2, vs + 3],
            (true, false) => [vs + 1, vs + 2, vs + 3, vs, vs + 1, vs + 3],
            (false, true) => [vs, vs + 2, vs + 1, vs, vs + 3, vs + 2],
            (false, false) => [vs + 3, vs + 1, vs, vs + 3, vs + 2, vs + 1],
        };
        sub.indices.extend_from_slice(&indices);

        let mut normal = [0.0f32; 3];
        normal[d] = dir;
        for _ in 0..4 {
            sub.normals.extend_from_slice(&normal);
        }
    }
}

impl Default for GreedyMesher {
    fn default() -> Self {
        Self::new(MeshingOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_core::packing::{OBJECT_BIT, OPAQUE_BIT, SOLID_BIT};

    const STONE: PackedVoxel = 1 | SOLID_BIT | OPAQUE_BIT;
    const GLASS: PackedVoxel = 2 | SOLID_BIT;
    const LEAVES: PackedVoxel = 3 | SOLID_BIT;
    const FLOWER: PackedVoxel = 4 | OBJECT_BIT;

    #[test]
    fn test_face_rules() {
        assert_eq!(face_owner(STONE, STONE), None);
        assert_eq!(face_owner(STONE, 0), Some(FaceOwner::Low));
        assert_eq!(face_owner(0, STONE), Some(FaceOwner::High));
        assert_eq!(face_owner(STONE, GLASS), Some(FaceOwner::Low));
        assert_eq!(face_owner(GLASS, 0), Some(FaceOwner::Low));
        assert_eq!(face_owner(FLOWER, GLASS), Some(FaceOwner::High));
        assert_eq!(face_owner(FLOWER, 0), None);
        assert_eq!(face_owner(GLASS, GLASS), None);
    }

    #[test]
    fn test_different_non_opaque_blocks_get_no_face() {
        // Known gap: glass against leaves draws nothing on either side.
        assert_eq!(face_owner(GLASS, LEAVES), None);
        assert_eq!(face_owner(LEAVES, GLASS), None);
    }

    #[test]
    fn test_ao_pack_round_trip() {
        let packed = pack_ao_levels(0, 1, 2, 3);
        assert_eq!(unpack_ao(packed), [0, 1, 2, 3]);
    }

    #[test]
    fn test_split_heuristic() {
        // Equal diagonals on both sides: split depends on max occlusion.
        assert!(split_along_00_11([1, 3, 3, 1]));
        assert!(!split_along_00_11([1, 2, 2, 1]));
        // Only 00-11 equal.
        assert!(split_along_00_11([1, 0, 2, 1]));
        // Only 01-10 equal.
        assert!(!split_along_00_11([0, 1, 1, 2]));
        // Neither equal: greater occlusion sum wins.
        assert!(split_along_00_11([3, 0, 1, 2]));
        assert!(!split_along_00_11([0, 3, 2, 1]));
    }

    #[test]
    fn test_multiplier_table() {
        let opts = MeshingOptions::default();
        assert!((opts.multiplier(0) - 1.05).abs() < f32::EPSILON);
        assert!((opts.multiplier(1) - 0.93).abs() < f32::EPSILON);
        assert!((opts.multiplier(3) - 0.5).abs() < f32::EPSILON);
    }
}
