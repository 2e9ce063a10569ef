//! # LOAM Mesh
//!
//! Turns padded voxel grids into renderable geometry.
//!
//! ## Core Components
//!
//! - `GreedyMesher`: per-material quad geometry with baked AO
//! - `TerrainMesh` / `Submesh`: flattened position/index/normal/color/uv arrays
//! - `ObjectMesher`: instanced batches for object voxels
//!
//! ## Example
//!
//! ```rust,ignore
//! use loam_mesh::{GreedyMesher, MeshingOptions};
//!
//! let mut mesher = GreedyMesher::new(MeshingOptions::default());
//! let mesh = mesher.mesh(&voxels, &registry);
//! for submesh in mesh.iter() {
//!     renderer.upload(submesh.material, submesh.position_bytes());
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod greedy;
pub mod object;
pub mod submesh;

pub use greedy::{unpack_ao, GreedyMesher, MaterialSource, MeshingOptions, AO_MAX};
pub use object::{LocalKey, ObjectBatch, ObjectBlocks, ObjectMesher, INSTANCE_CENTER};
pub use submesh::{Submesh, TerrainMesh};
