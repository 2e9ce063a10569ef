//! # LOAM Core
//!
//! Data primitives shared by the mesher and the streaming scheduler.
//!
//! ## Core Components
//!
//! - `packing`: 16-bit voxel layout (block id + derived flag bits)
//! - `ChunkCoord` / `ChunkGeometry`: chunk identity and coordinate math
//! - `VoxelBuffer`: padded `(size+2)^3` voxel storage
//! - `BlockRegistry`: flat block lookup tables, materials and handlers
//!
//! ## Example
//!
//! ```rust,ignore
//! use loam_core::{BlockOptions, BlockRegistry, MaterialDef};
//!
//! let mut registry = BlockRegistry::new();
//! registry.register_material("dirt", MaterialDef::color(0.4, 0.3, 0.2));
//! let dirt = registry.register_block(1, BlockOptions::solid("dirt"))?;
//!
//! let packed = registry.pack(dirt);
//! assert!(loam_core::packing::is_opaque(packed));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod buffer;
pub mod coord;
pub mod error;
pub mod packing;
pub mod registry;

pub use buffer::VoxelBuffer;
pub use coord::{ChunkCoord, ChunkGeometry};
pub use error::{RegistryError, RegistryResult};
pub use packing::{BlockId, FaceDir, MaterialId, PackedVoxel};
pub use registry::{
    BlockHandlers, BlockOptions, BlockRegistry, MaterialDef, ObjectInstance, ObjectMeshDef,
};
