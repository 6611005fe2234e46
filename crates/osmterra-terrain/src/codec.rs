//! Versioned binary terrain format.
//!
//! This module encodes a square [`TerrainGrid`] to bytes and decodes it back.
//! The encoding is a lossy projection of the grid: heights are quantized to
//! 16 bits against a caller-supplied maximum height, and hole cells lose their
//! material index.
//!
//! ## Record Format (little-endian)
//!
//! | Offset          | Field          | Size                 | Description                                  |
//! |-----------------|----------------|----------------------|----------------------------------------------|
//! | 0               | version        | 1                    | Format version, currently 9.                 |
//! | 1               | size           | 4 (u32)              | Side length; the grid is `size` x `size`.    |
//! | 5               | heights        | 2 x size²  (u16)     | Quantized heights, row-major.                |
//! | 5 + 2·size²     | materials      | size² (u8)           | Material indices, 255 marks a hole.          |
//! | ...             | name_count     | 4 (u32)              | Number of material names.                    |
//! | ...             | names          | variable             | Each: length (u8) + UTF-8 bytes.             |
//!
//! No bytes may follow the name table.

use crate::grid::{check_unique, TerrainCell, TerrainGrid};
use crate::{Result, TerrainError};
use bytes::{Buf, BufMut};
use osmterra_metrics::metric_defs;
use std::io::{Read, Write};
use tracing::{debug, warn};

/// Format version written by this codec.
pub const FORMAT_VERSION: u8 = 9;

/// Material byte reserved for hole cells.
///
/// Decoding maps it to `is_hole = true, material = 0`; the material a hole
/// cell carried before encoding is not recoverable.
pub const HOLE_MATERIAL: u8 = 255;

/// Largest material index a solid cell can carry.
pub const MAX_MATERIAL_INDEX: usize = HOLE_MATERIAL as usize - 1;

/// Longest material name, in UTF-8 bytes.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Full scale of a quantized height.
const QUANT_MAX: f32 = u16::MAX as f32;

/// version(1) + size(4)
const HEADER_SIZE: usize = 5;

/// Cells per chunk when streaming a template record.
const TEMPLATE_CHUNK_CELLS: usize = 16 * 1024;

// ============================================================================
// Quantization
// ============================================================================

/// Quantize a height: `clamp(round(height / max_height * 65535), 0, 65535)`.
pub fn quantize_height(height: f32, max_height: f32) -> u16 {
    (height / max_height * QUANT_MAX).round().clamp(0.0, QUANT_MAX) as u16
}

/// Dequantize a height: `value / 65535 * max_height`.
pub fn dequantize_height(value: u16, max_height: f32) -> f32 {
    value as f32 / QUANT_MAX * max_height
}

/// Exact encoded size of a record with `resolution`² cells and these names.
pub fn calc_approx_size<S: AsRef<str>>(resolution: usize, names: &[S]) -> usize {
    let cells = resolution * resolution;
    let names_len: usize = names.iter().map(|n| 1 + n.as_ref().len()).sum();
    HEADER_SIZE + cells * 2 + cells + 4 + names_len
}

/// Encode a grid with the default codec settings.
pub fn serialize(grid: &TerrainGrid, max_height: f32) -> Result<Vec<u8>> {
    TerrainCodec::new(max_height).encode(grid)
}

/// Decode a record with the default codec settings.
pub fn deserialize(data: &[u8], max_height: f32) -> Result<TerrainGrid> {
    TerrainCodec::new(max_height).decode(data)
}

// ============================================================================
// Codec
// ============================================================================

/// Terrain record encoder/decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainCodec {
    /// Height mapped to the top of the 16-bit range.
    pub max_height: f32,
    /// Decode records whose version byte differs from [`FORMAT_VERSION`].
    ///
    /// The trailing-byte check still applies, which catches most records
    /// written by an incompatible version.
    pub ignore_version: bool,
}

impl TerrainCodec {
    /// Create a codec that enforces the format version.
    pub fn new(max_height: f32) -> Self {
        Self {
            max_height,
            ignore_version: false,
        }
    }

    /// Set whether the version byte is enforced on decode.
    pub fn with_ignore_version(mut self, ignore_version: bool) -> Self {
        self.ignore_version = ignore_version;
        self
    }

    fn check_max_height(&self) -> Result<()> {
        if self.max_height.is_finite() && self.max_height > 0.0 {
            Ok(())
        } else {
            Err(TerrainError::InvalidMaxHeight(self.max_height))
        }
    }

    // ------------------------------------------------------------------------
    // Encoding
    // ------------------------------------------------------------------------

    /// Encode a square grid.
    pub fn encode(&self, grid: &TerrainGrid) -> Result<Vec<u8>> {
        self.check_max_height()?;
        let size = match grid.size() {
            Some(size) => size,
            None => {
                return Err(TerrainError::NotSquare {
                    width: grid.width(),
                    height: grid.height(),
                })
            }
        };
        grid.check_materials()?;
        check_names(grid.materials())?;

        let material_bytes = grid
            .cells()
            .iter()
            .enumerate()
            .map(|(i, cell)| encode_material(cell, i % size, i / size))
            .collect::<Result<Vec<u8>>>()?;

        let mut buf = Vec::with_capacity(calc_approx_size(size, grid.materials()));

        // 1. Header
        buf.put_u8(FORMAT_VERSION);
        buf.put_u32_le(encode_len(size, "size")?);

        // 2. Heights
        for cell in grid.cells() {
            buf.put_u16_le(quantize_height(cell.height, self.max_height));
        }

        // 3. Materials
        buf.put_slice(&material_bytes);

        // 4. Name table
        put_names(&mut buf, grid.materials())?;

        debug!(size, bytes = buf.len(), "encoded terrain");
        metrics::counter!(metric_defs::TERRAIN_BYTES_ENCODED.name).increment(buf.len() as u64);
        Ok(buf)
    }

    /// Encode a grid to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W, grid: &TerrainGrid) -> Result<()> {
        let bytes = self.encode(grid)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Encode a `size` x `size` record in which every cell equals `cell`.
    pub fn encode_template<S: AsRef<str>>(
        &self,
        size: usize,
        cell: TerrainCell,
        names: &[S],
    ) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(calc_approx_size(size, names));
        self.write_template_to(&mut buf, size, cell, names)?;
        Ok(buf)
    }

    /// Stream a uniform record to a writer without building the grid.
    pub fn write_template_to<W: Write, S: AsRef<str>>(
        &self,
        writer: &mut W,
        size: usize,
        cell: TerrainCell,
        names: &[S],
    ) -> Result<()> {
        self.check_max_height()?;
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        check_unique(&names)?;
        check_names(&names)?;
        if !cell.is_hole && cell.material >= names.len() && cell.material != 0 {
            return Err(TerrainError::MaterialOutOfRange {
                x: 0,
                y: 0,
                index: cell.material,
                count: names.len(),
            });
        }
        let material = encode_material(&cell, 0, 0)?;
        let height = quantize_height(cell.height, self.max_height).to_le_bytes();

        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.put_u8(FORMAT_VERSION);
        header.put_u32_le(encode_len(size, "size")?);
        writer.write_all(&header)?;

        let cells = size * size;
        let mut chunk = Vec::with_capacity(TEMPLATE_CHUNK_CELLS * 2);
        let mut remaining = cells;
        while remaining > 0 {
            let n = remaining.min(TEMPLATE_CHUNK_CELLS);
            chunk.clear();
            for _ in 0..n {
                chunk.put_slice(&height);
            }
            writer.write_all(&chunk)?;
            remaining -= n;
        }

        let mut remaining = cells;
        while remaining > 0 {
            let n = remaining.min(TEMPLATE_CHUNK_CELLS);
            chunk.clear();
            chunk.put_bytes(material, n);
            writer.write_all(&chunk)?;
            remaining -= n;
        }

        let mut table = Vec::new();
        put_names(&mut table, &names)?;
        writer.write_all(&table)?;

        let total = calc_approx_size(size, &names);
        debug!(size, bytes = total, "encoded terrain template");
        metrics::counter!(metric_defs::TERRAIN_BYTES_ENCODED.name).increment(total as u64);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Decoding
    // ------------------------------------------------------------------------

    /// Decode a record from bytes.
    ///
    /// The whole slice must be consumed; trailing bytes are an error.
    pub fn decode(&self, data: &[u8]) -> Result<TerrainGrid> {
        self.check_max_height()?;
        let mut reader = Reader::new(data);

        // 1. Version
        reader.need(1, "version")?;
        let version = reader.buf.get_u8();
        if version != FORMAT_VERSION {
            if !self.ignore_version {
                return Err(TerrainError::UnsupportedVersion {
                    expected: FORMAT_VERSION,
                    found: version,
                });
            }
            warn!(
                found = version,
                expected = FORMAT_VERSION,
                "decoding terrain record with mismatched version"
            );
        }

        // 2. Size
        reader.need(4, "size")?;
        let size = reader.buf.get_u32_le() as usize;
        let cells = size
            .checked_mul(size)
            .ok_or_else(|| TerrainError::decode_at(1, format!("size {} overflows", size)))?;

        // 3. Heights
        reader.need(cells.saturating_mul(2), "height array")?;
        let mut grid_cells = Vec::with_capacity(cells);
        for _ in 0..cells {
            let height = dequantize_height(reader.buf.get_u16_le(), self.max_height);
            grid_cells.push(TerrainCell::new(height, 0));
        }

        // 4. Materials
        reader.need(cells, "material array")?;
        for cell in grid_cells.iter_mut() {
            match reader.buf.get_u8() {
                HOLE_MATERIAL => *cell = TerrainCell { height: cell.height, ..TerrainCell::hole() },
                material => cell.material = material as usize,
            }
        }

        // 5. Name table
        reader.need(4, "name count")?;
        let count = reader.buf.get_u32_le() as usize;
        let mut names = Vec::with_capacity(count.min(reader.buf.remaining()));
        for i in 0..count {
            reader.need(1, "name length")?;
            let len = reader.buf.get_u8() as usize;
            let start = reader.offset();
            reader.need(len, "name")?;
            let name = std::str::from_utf8(&reader.buf[..len])
                .map_err(|e| TerrainError::decode_at(start, format!("name {} is not UTF-8: {}", i, e)))?
                .to_string();
            reader.buf.advance(len);
            names.push(name);
        }

        if reader.buf.has_remaining() {
            return Err(TerrainError::TrailingBytes {
                count: reader.buf.remaining(),
            });
        }

        let grid = TerrainGrid::from_cells(size, size, grid_cells, names)?;
        grid.check_materials()?;

        debug!(size, bytes = data.len(), "decoded terrain");
        metrics::counter!(metric_defs::TERRAIN_BYTES_DECODED.name).increment(data.len() as u64);
        Ok(grid)
    }

    /// Decode a record from a reader, consuming it to the end.
    pub fn read_from<R: Read>(&self, reader: &mut R) -> Result<TerrainGrid> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.decode(&data)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Cursor over the input that reports truncation with offsets.
struct Reader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            total: data.len(),
        }
    }

    fn offset(&self) -> usize {
        self.total - self.buf.remaining()
    }

    fn need(&self, len: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(TerrainError::decode_at(
                self.offset(),
                format!(
                    "not enough data for {}: need {} bytes, have {}",
                    what,
                    len,
                    self.buf.remaining()
                ),
            ));
        }
        Ok(())
    }
}

fn encode_material(cell: &TerrainCell, x: usize, y: usize) -> Result<u8> {
    if cell.is_hole {
        return Ok(HOLE_MATERIAL);
    }
    if cell.material > MAX_MATERIAL_INDEX {
        return Err(TerrainError::UnrepresentableMaterial {
            x,
            y,
            index: cell.material,
            max: MAX_MATERIAL_INDEX,
        });
    }
    Ok(cell.material as u8)
}

fn encode_len(len: usize, what: &'static str) -> Result<u32> {
    u32::try_from(len).map_err(|_| TerrainError::LengthOverflow { what, len })
}

fn check_names(names: &[String]) -> Result<()> {
    match names.iter().find(|n| n.len() > MAX_NAME_LEN) {
        Some(name) => Err(TerrainError::NameTooLong {
            len: name.len(),
            max: MAX_NAME_LEN,
        }),
        None => Ok(()),
    }
}

fn put_names(buf: &mut Vec<u8>, names: &[String]) -> Result<()> {
    buf.put_u32_le(encode_len(names.len(), "name count")?);
    for name in names {
        buf.put_u8(name.len() as u8);
        buf.put_slice(name.as_bytes());
    }
    Ok(())
}
