//! # LOAM World
//!
//! Chunk lifecycle and streaming around a moving reference point.
//!
//! ## Core Components
//!
//! - `Chunk`: padded voxels, whole-chunk flags, block handler dispatch
//! - `World`: add/remove/create/mesh queues under time budgets
//! - `WorldConfig`: TOML-loadable settings
//! - `Clock`: injected time source (`SystemClock`, `ManualClock`)
//! - `WorldEvents`: per-event observer lists
//! - `RenderSink`: where finished geometry goes
//!
//! ## Example
//!
//! ```rust,ignore
//! use loam_world::{NullSink, World, WorldConfig};
//!
//! let (mut world, requests) = World::new(WorldConfig::default(), registry, NullSink)?;
//! let data = world.data_sender();
//! std::thread::spawn(move || {
//!     for mut request in requests {
//!         generate(&mut request.buffer, request.origin);
//!         let _ = data.send(request.complete());
//!     }
//! });
//!
//! loop {
//!     world.tick(player_position);
//!     world.render();
//!     if world.player_chunk_loaded() {
//!         physics.step();
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chunk;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod queues;
pub mod sink;
pub mod world;

pub use chunk::{Chunk, MeshOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::WorldConfig;
pub use error::{ConfigError, WorldError, WorldResult};
pub use events::{ChunkData, DataRequest, ListenerId, Observers, WorldEvents};
pub use queues::{CoordQueue, QueueLengths};
pub use sink::{NullSink, RenderSink};
pub use world::{World, WorldStats};
