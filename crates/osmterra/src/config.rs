//! Pipeline configuration.
//!
//! Configuration is plain YAML; every field has a default so an empty document
//! is valid:
//!
//! ```yaml
//! query:
//!   endpoint_tolerance: 1.0e-6
//!   max_iterations: 1000
//! terrain:
//!   max_height: 1000.0
//!   ignore_version: false
//! ```

use crate::PipelineError;
use osmterra_geo::{RingAssembler, DEFAULT_MAX_ITERATIONS, ENDPOINT_TOLERANCE};
use osmterra_terrain::TerrainCodec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default height mapped to the top of the quantized range.
pub const DEFAULT_MAX_HEIGHT: f32 = 1000.0;

/// Settings for query parsing and ring assembly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Per-axis endpoint tolerance for joining fragments, in degrees.
    pub endpoint_tolerance: f64,
    /// Extension steps allowed per assembled ring.
    pub max_iterations: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            endpoint_tolerance: ENDPOINT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl QueryConfig {
    /// Build the ring assembler described by this configuration.
    pub fn assembler(&self) -> RingAssembler {
        RingAssembler::new(self.endpoint_tolerance, self.max_iterations)
    }
}

/// Settings for the terrain codec.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Height mapped to the top of the 16-bit range.
    pub max_height: f32,
    /// Accept records whose version byte does not match.
    pub ignore_version: bool,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig {
            max_height: DEFAULT_MAX_HEIGHT,
            ignore_version: false,
        }
    }
}

impl TerrainConfig {
    /// Build the codec described by this configuration.
    pub fn codec(&self) -> TerrainCodec {
        TerrainCodec::new(self.max_height).with_ignore_version(self.ignore_version)
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Query parsing settings.
    pub query: QueryConfig,
    /// Terrain codec settings.
    pub terrain: TerrainConfig,
}

impl PipelineConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml_string(&self) -> Result<String, PipelineError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check that values are in range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.terrain.max_height.is_finite() && self.terrain.max_height > 0.0) {
            return Err(PipelineError::Config(format!(
                "terrain.max_height must be positive, got {}",
                self.terrain.max_height
            )));
        }
        if !(self.query.endpoint_tolerance.is_finite() && self.query.endpoint_tolerance > 0.0) {
            return Err(PipelineError::Config(format!(
                "query.endpoint_tolerance must be positive, got {}",
                self.query.endpoint_tolerance
            )));
        }
        if self.query.max_iterations == 0 {
            return Err(PipelineError::Config(
                "query.max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PipelineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.query.max_iterations, 1000);
        assert_eq!(config.query.endpoint_tolerance, 1e-6);
        assert!(!config.terrain.ignore_version);
    }

    #[test]
    fn test_partial_document() {
        let yaml = "terrain:\n  max_height: 250.0\n  ignore_version: true\n";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.terrain.max_height, 250.0);
        assert!(config.terrain.ignore_version);
        assert_eq!(config.query, QueryConfig::default());

        let codec = config.terrain.codec();
        assert_eq!(codec.max_height, 250.0);
        assert!(codec.ignore_version);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = PipelineConfig::default();
        config.query.max_iterations = 50;
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(PipelineConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("terrain:\n  max_height: 0\n"),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml_str("query:\n  max_iterations: 0\n"),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml_str("query:\n  endpoint_tolerance: -1.0\n"),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml_str("query: [1, 2]"),
            Err(PipelineError::ConfigParse(_))
        ));
    }
}
