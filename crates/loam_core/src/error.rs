//! # Registry Error Types
//!
//! Registration mistakes are configuration errors: they are returned to the
//! caller immediately and never recovered internally.

use thiserror::Error;

/// Errors raised while registering blocks or materials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Block id is 0 (reserved for air) or above the packing limit.
    #[error("block id {id} out of range: must be in 1..={max}")]
    IdOutOfRange {
        /// The rejected id.
        id: u32,
        /// Highest valid id.
        max: u16,
    },

    /// A block referenced a material that was never registered.
    #[error("unknown material: {0}")]
    UnknownMaterial(String),

    /// Material list has a length other than 0, 1, 2, 3 or 6.
    #[error("block {id}: material list must have 1, 2, 3 or 6 entries, got {len}")]
    BadMaterialList {
        /// The block being registered.
        id: u16,
        /// Length of the supplied list.
        len: usize,
    },

    /// Object blocks cannot be opaque.
    #[error("block {id}: object blocks cannot be opaque")]
    ObjectBlockOpaque {
        /// The block being registered.
        id: u16,
    },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
