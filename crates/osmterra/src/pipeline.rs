//! The pipeline facade.

use crate::config::PipelineConfig;
use crate::PipelineError;
use osmterra_geo::{BoundingBox, QueryParser, QueryResult};
use osmterra_terrain::{GridRect, ImageProjector, TerrainCell, TerrainCodec, TerrainGrid};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, PipelineError>;

/// Query parsing and terrain encoding configured from one place.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    parser: QueryParser,
    codec: TerrainCodec,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::build(PipelineConfig::default())
    }
}

impl Pipeline {
    /// Create a pipeline with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline from a validated configuration.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Load a YAML configuration file and create a pipeline from it.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = PipelineConfig::load(path)?;
        info!(path = %path.display(), "loaded pipeline configuration");
        Ok(Self::build(config))
    }

    fn build(config: PipelineConfig) -> Self {
        Pipeline {
            parser: QueryParser::new(config.query.assembler()),
            codec: config.terrain.codec(),
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Terrain codec in use.
    pub fn codec(&self) -> &TerrainCodec {
        &self.codec
    }

    /// Parse an Overpass JSON document.
    pub fn parse_query(&self, json: &str, bbox: BoundingBox) -> Result<QueryResult> {
        let result = self.parser.parse(json, bbox)?;
        debug!(
            ways = result.way_count(),
            relations = result.relation_count(),
            "parsed query"
        );
        Ok(result)
    }

    /// Parse an Overpass JSON document from a reader.
    pub fn parse_query_reader<R: Read>(&self, reader: R, bbox: BoundingBox) -> Result<QueryResult> {
        Ok(self.parser.parse_reader(reader, bbox)?)
    }

    /// Encode a square grid.
    pub fn encode(&self, grid: &TerrainGrid) -> Result<Vec<u8>> {
        Ok(self.codec.encode(grid)?)
    }

    /// Encode a grid to a writer.
    pub fn write_terrain<W: Write>(&self, writer: &mut W, grid: &TerrainGrid) -> Result<()> {
        Ok(self.codec.write_to(writer, grid)?)
    }

    /// Decode a terrain record.
    pub fn decode(&self, data: &[u8]) -> Result<TerrainGrid> {
        Ok(self.codec.decode(data)?)
    }

    /// Decode a terrain record from a reader.
    pub fn read_terrain<R: Read>(&self, reader: &mut R) -> Result<TerrainGrid> {
        Ok(self.codec.read_from(reader)?)
    }

    /// Encode a blank `size` x `size` record: zero height, first material.
    pub fn blank_terrain<S: AsRef<str>>(&self, size: usize, materials: &[S]) -> Result<Vec<u8>> {
        Ok(self
            .codec
            .encode_template(size, TerrainCell::default(), materials)?)
    }

    /// Write projected imagery into a grid.
    pub fn project(&self, grid: &mut TerrainGrid, projector: &dyn ImageProjector) -> Result<()> {
        let projection = projector.project(grid.width(), grid.height())?;
        grid.apply_projection(&projection)?;
        Ok(())
    }

    /// Composite `src_rect` of `src` into `dst_rect` of `dst`.
    pub fn draw(
        &self,
        dst: &mut TerrainGrid,
        src: &TerrainGrid,
        dst_rect: GridRect,
        src_rect: GridRect,
        height_scale: f32,
    ) -> Result<()> {
        Ok(osmterra_terrain::draw(dst, src, dst_rect, src_rect, height_scale)?)
    }
}
