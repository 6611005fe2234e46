//! Error types for the pipeline facade.

use thiserror::Error;

/// Errors surfaced by [`crate::Pipeline`] and configuration loading.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// I/O error reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Configuration values are out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query document could not be parsed.
    #[error(transparent)]
    Query(#[from] osmterra_geo::QueryError),

    /// Terrain operation failed.
    #[error(transparent)]
    Terrain(#[from] osmterra_terrain::TerrainError),
}
