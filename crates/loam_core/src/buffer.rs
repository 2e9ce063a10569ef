//! Padded voxel storage.
//!
//! A chunk of edge `size` is stored as `(size+2)^3` cells: one voxel of
//! padding on every face, mirrored from the neighboring chunk. Neighbor-aware
//! passes (face culling, AO) therefore never cross a chunk boundary.
//!
//! Layout: `cells[(z+1) * p * p + (y+1) * p + (x+1)]` with `p = size + 2`,
//! local coordinates running `-1..=size` on each axis.

use crate::packing::PackedVoxel;

/// Padded `(size+2)^3` voxel grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelBuffer {
    size: usize,
    padded: usize,
    cells: Box<[PackedVoxel]>,
}

impl VoxelBuffer {
    /// Creates an all-air buffer for chunks of edge `size`.
    #[must_use]
    pub fn new(size: usize) -> Self {
        let padded = size + 2;
        Self {
            size,
            padded,
            cells: vec![0; padded * padded * padded].into_boxed_slice(),
        }
    }

    /// Unpadded edge length.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Padded edge length (`size + 2`).
    #[inline]
    #[must_use]
    pub const fn padded_size(&self) -> usize {
        self.padded
    }

    /// Total number of cells, padding included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a buffer holds at least the 27 cells of a size-1 chunk.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index strides for the x, y and z axes.
    #[inline]
    #[must_use]
    pub const fn strides(&self) -> [usize; 3] {
        [1, self.padded, self.padded * self.padded]
    }

    /// Flat index of a padded coordinate (`0..size+2`).
    #[inline]
    #[must_use]
    pub const fn index_padded(&self, px: usize, py: usize, pz: usize) -> usize {
        px + py * self.padded + pz * self.padded * self.padded
    }

    /// Flat index of a local coordinate (`-1..=size`).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn index(&self, x: i32, y: i32, z: i32) -> usize {
        debug_assert!(self.in_range(x, y, z), "local ({x},{y},{z}) outside padded grid");
        self.index_padded((x + 1) as usize, (y + 1) as usize, (z + 1) as usize)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn in_range(&self, x: i32, y: i32, z: i32) -> bool {
        let max = self.size as i32;
        [x, y, z].iter().all(|&c| (-1..=max).contains(&c))
    }

    /// True if the local coordinate lies in the padding shell.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn is_padding(&self, x: i32, y: i32, z: i32) -> bool {
        let max = self.size as i32;
        [x, y, z].iter().any(|&c| c < 0 || c >= max)
    }

    /// Reads the cell at a local coordinate.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32, z: i32) -> PackedVoxel {
        self.cells[self.index(x, y, z)]
    }

    /// Writes the cell at a local coordinate.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, value: PackedVoxel) {
        let idx = self.index(x, y, z);
        self.cells[idx] = value;
    }

    /// Reads the cell at a padded coordinate.
    #[inline]
    #[must_use]
    pub fn get_padded(&self, px: usize, py: usize, pz: usize) -> PackedVoxel {
        self.cells[self.index_padded(px, py, pz)]
    }

    /// Fills every cell, padding included.
    pub fn fill(&mut self, value: PackedVoxel) {
        self.cells.fill(value);
    }

    /// Raw cell slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[PackedVoxel] {
        &self.cells
    }

    /// Mutable raw cell slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [PackedVoxel] {
        &mut self.cells
    }

    /// Cells as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }
}
