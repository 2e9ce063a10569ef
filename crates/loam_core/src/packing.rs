//! Voxel packing.
//!
//! Every voxel is a single `u16`:
//!
//! - Bits 0-11: block-type id (4096 block types, 0 = air)
//! - Bit 12: reserved
//! - Bit 13: `OBJECT_BIT` - rendered as an instanced object mesh
//! - Bit 14: `SOLID_BIT` - participates in physics and AO
//! - Bit 15: `OPAQUE_BIT` - fully occludes neighbor faces
//!
//! Flag bits are derived from the registry when a voxel is written
//! (`BlockRegistry::pack`) and are never set independently.

use bytemuck::{Pod, Zeroable};

/// A packed voxel value (block id + flags).
pub type PackedVoxel = u16;

/// Number of low bits holding the block-type id.
pub const ID_BITS: u32 = 12;

/// Mask selecting the block-type id.
pub const ID_MASK: PackedVoxel = (1 << ID_BITS) - 1;

/// Highest registrable block-type id.
pub const MAX_BLOCK_ID: u16 = ID_MASK;

/// Voxel renders as an instanced object mesh rather than terrain quads.
pub const OBJECT_BIT: PackedVoxel = 1 << 13;

/// Voxel participates in physics and ambient occlusion.
pub const SOLID_BIT: PackedVoxel = 1 << 14;

/// Voxel fully occludes the faces of its neighbors.
pub const OPAQUE_BIT: PackedVoxel = 1 << 15;

/// Extracts the block-type id from a packed voxel.
#[inline]
#[must_use]
pub const fn block_id_of(voxel: PackedVoxel) -> BlockId {
    BlockId(voxel & ID_MASK)
}

/// Returns true if the packed voxel has `SOLID_BIT` set.
#[inline]
#[must_use]
pub const fn is_solid(voxel: PackedVoxel) -> bool {
    voxel & SOLID_BIT != 0
}

/// Returns true if the packed voxel has `OPAQUE_BIT` set.
#[inline]
#[must_use]
pub const fn is_opaque(voxel: PackedVoxel) -> bool {
    voxel & OPAQUE_BIT != 0
}

/// Returns true if the packed voxel has `OBJECT_BIT` set.
#[inline]
#[must_use]
pub const fn is_object(voxel: PackedVoxel) -> bool {
    voxel & OBJECT_BIT != 0
}

/// Block-type identifier (the unpacked low bits of a voxel).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct BlockId(pub u16);

impl BlockId {
    /// Air (always id 0).
    pub const AIR: Self = Self(0);

    /// Creates a new block id.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Returns true for air.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }
}

/// Render material identifier. Id 0 means "no material" (no face drawn).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// No material.
    pub const NONE: Self = Self(0);

    /// Creates a new material id.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Returns true for the "no material" id.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// One of the six axis-aligned face directions.
///
/// The discriminant is `axis * 2 + (0 for +, 1 for -)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceDir {
    /// +X
    PosX = 0,
    /// -X
    NegX = 1,
    /// +Y
    PosY = 2,
    /// -Y
    NegY = 3,
    /// +Z
    PosZ = 4,
    /// -Z
    NegZ = 5,
}

impl FaceDir {
    /// All six directions in discriminant order.
    pub const ALL: [Self; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    /// Face direction for an axis (0..3) and sign.
    #[inline]
    #[must_use]
    pub const fn from_axis(axis: usize, positive: bool) -> Self {
        match (axis, positive) {
            (0, true) => Self::PosX,
            (0, false) => Self::NegX,
            (1, true) => Self::PosY,
            (1, false) => Self::NegY,
            (2, true) => Self::PosZ,
            _ => Self::NegZ,
        }
    }

    /// Axis index (0 = X, 1 = Y, 2 = Z).
    #[inline]
    #[must_use]
    pub const fn axis(self) -> usize {
        self as usize / 2
    }

    /// True for the + directions.
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self as usize % 2 == 0
    }

    /// Index into per-face tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}
