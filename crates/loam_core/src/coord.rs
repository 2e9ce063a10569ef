//! Chunk identity and world <-> chunk coordinate math.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Chunk coordinate in chunk space.
///
/// World voxel coordinate = chunk coordinate * chunk size.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkCoord {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the coordinate shifted by the given chunk offsets.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Squared Euclidean distance in chunk units.
    ///
    /// This is the only distance metric used for streaming decisions.
    #[inline]
    #[must_use]
    pub const fn distance_sq(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// World voxel coordinate of this chunk's (0,0,0) voxel.
    #[inline]
    #[must_use]
    pub const fn origin(self, size: i32) -> [i32; 3] {
        [self.x * size, self.y * size, self.z * size]
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.x, self.y, self.z)
    }
}

/// Coordinate conversion for a fixed chunk size.
///
/// Power-of-two sizes use shift/mask. Any other positive size falls back
/// to `div_euclid`/`rem_euclid`. Both paths floor toward negative infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkGeometry {
    size: i32,
    shift: Option<u32>,
}

impl ChunkGeometry {
    /// Creates the geometry for `size` voxels per chunk edge.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or does not fit in an `i32`.
    #[must_use]
    pub fn new(size: u32) -> Self {
        assert!(size > 0, "chunk size must be positive");
        let signed = i32::try_from(size).unwrap_or_else(|_| panic!("chunk size {size} too large"));
        let shift = size.is_power_of_two().then(|| size.trailing_zeros());
        Self { size: signed, shift }
    }

    /// Voxels per chunk edge.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> i32 {
        self.size
    }

    /// True when the shift/mask fast path is active.
    #[inline]
    #[must_use]
    pub const fn is_power_of_two(&self) -> bool {
        self.shift.is_some()
    }

    #[inline]
    fn div(&self, v: i32) -> i32 {
        match self.shift {
            Some(shift) => v >> shift,
            None => v.div_euclid(self.size),
        }
    }

    #[inline]
    fn rem(&self, v: i32) -> i32 {
        match self.shift {
            Some(_) => v & (self.size - 1),
            None => v.rem_euclid(self.size),
        }
    }

    /// Chunk containing a world voxel coordinate.
    #[inline]
    #[must_use]
    pub fn chunk_of(&self, world: [i32; 3]) -> ChunkCoord {
        ChunkCoord::new(self.div(world[0]), self.div(world[1]), self.div(world[2]))
    }

    /// Local offset (`0..size`) of a world voxel coordinate inside its chunk.
    #[inline]
    #[must_use]
    pub fn local_of(&self, world: [i32; 3]) -> [i32; 3] {
        [self.rem(world[0]), self.rem(world[1]), self.rem(world[2])]
    }

    /// Chunk containing a continuous position (e.g. the player).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn chunk_of_position(&self, position: [f64; 3]) -> ChunkCoord {
        self.chunk_of([
            position[0].floor() as i32,
            position[1].floor() as i32,
            position[2].floor() as i32,
        ])
    }

    /// World origin of a chunk.
    #[inline]
    #[must_use]
    pub const fn origin(&self, coord: ChunkCoord) -> [i32; 3] {
        coord.origin(self.size)
    }
}
