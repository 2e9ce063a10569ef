//! # World Error Types
//!
//! Recoverable errors of the streaming layer. Contract violations (writing to
//! a disposed chunk, disposing twice) panic instead.

use loam_core::ChunkCoord;
use thiserror::Error;

/// Invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),

    /// Chunk size must be a positive integer small enough for `i32` math.
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(u32),

    /// Distances must be finite and non-negative.
    #[error("invalid {name}: {value}")]
    InvalidDistance {
        /// Option name.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// Time budgets must be finite and non-negative.
    #[error("invalid {name}: {value}")]
    InvalidBudget {
        /// Option name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// At least one chunk must be allowed to be pending.
    #[error("max_chunks_pending_creation must be at least 1")]
    NoPendingCapacity,
}

/// Errors raised by the world scheduler.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorldError {
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Chunk data does not match the configured chunk size.
    #[error("chunk {coord}: buffer has {actual} cells, expected {expected}")]
    BufferSize {
        /// Target chunk.
        coord: ChunkCoord,
        /// Cells for the configured size.
        expected: usize,
        /// Cells supplied.
        actual: usize,
    },

    /// The block id was never registered.
    #[error("block {0} is not registered")]
    UnknownBlock(u16),

    /// The chunk is not resident or its data has not arrived yet.
    #[error("chunk {0} is not loaded")]
    ChunkNotReady(ChunkCoord),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
