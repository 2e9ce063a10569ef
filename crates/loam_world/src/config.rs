//! World configuration.
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! document is a valid configuration.
//!
//! ```toml
//! chunk_size = 32
//! chunk_add_distance = 3.0
//! chunk_remove_distance = 4.0
//!
//! [meshing]
//! ao = true
//! ```

use crate::error::ConfigError;
use loam_mesh::MeshingOptions;
use serde::{Deserialize, Serialize};

/// Streaming and meshing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Voxels per chunk edge. Powers of two use the fast coordinate path.
    pub chunk_size: u32,
    /// Chunks closer than this (chunk units, spherical) are requested.
    pub chunk_add_distance: f32,
    /// Chunks farther than this are disposed. Clamped to at least the add
    /// distance.
    pub chunk_remove_distance: f32,
    /// Cap on chunks awaiting generator data.
    pub max_chunks_pending_creation: usize,
    /// Wall-clock budget per `tick`, milliseconds.
    pub max_processing_per_tick_ms: f64,
    /// Wall-clock budget per `render`, milliseconds.
    pub max_processing_per_render_ms: f64,
    /// Mesher settings.
    pub meshing: MeshingOptions,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: 24,
            chunk_add_distance: 2.0,
            chunk_remove_distance: 3.0,
            max_chunks_pending_creation: 10,
            max_processing_per_tick_ms: 9.0,
            max_processing_per_render_ms: 5.0,
            meshing: MeshingOptions::default(),
        }
    }
}

impl WorldConfig {
    /// Small chunks and distances for tests.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            chunk_size: 4,
            chunk_add_distance: 1.0,
            chunk_remove_distance: 1.0,
            ..Self::default()
        }
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown types.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first invalid option found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || i32::try_from(self.chunk_size).is_err() {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        for (name, value) in [
            ("chunk_add_distance", self.chunk_add_distance),
            ("chunk_remove_distance", self.chunk_remove_distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDistance { name, value });
            }
        }
        for (name, value) in [
            ("max_processing_per_tick_ms", self.max_processing_per_tick_ms),
            ("max_processing_per_render_ms", self.max_processing_per_render_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidBudget { name, value });
            }
        }
        if self.max_chunks_pending_creation == 0 {
            return Err(ConfigError::NoPendingCapacity);
        }
        Ok(())
    }

    /// Validates and applies the remove >= add clamp.
    ///
    /// # Errors
    ///
    /// Returns the first invalid option found.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.validate()?;
        if self.chunk_remove_distance < self.chunk_add_distance {
            tracing::warn!(
                add = self.chunk_add_distance,
                remove = self.chunk_remove_distance,
                "chunk_remove_distance below chunk_add_distance, clamping"
            );
            self.chunk_remove_distance = self.chunk_add_distance;
        }
        Ok(self)
    }
}
