//! Error types for the terrain crate.

use thiserror::Error;

/// Errors that can occur when working with terrain grids.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// I/O error reading or writing a stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored format version differs from the supported one.
    #[error("Unsupported terrain format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version this codec reads and writes.
        expected: u8,
        /// Version found in the stream.
        found: u8,
    },

    /// Structural decode error at a specific offset.
    #[error("Decode error at offset {offset}: {message}")]
    DecodeError {
        /// Byte offset where the error occurred.
        offset: usize,
        /// Description of the error.
        message: String,
    },

    /// A length does not fit the format's 32-bit field.
    #[error("{what} {len} does not fit in a 32-bit field")]
    LengthOverflow {
        /// Which length overflowed.
        what: &'static str,
        /// The length.
        len: usize,
    },

    /// Bytes left over after the name table.
    #[error("{count} trailing bytes after terrain record")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// The binary format only stores square grids.
    #[error("Terrain grid must be square to serialize, got {width}x{height}")]
    NotSquare {
        /// Grid width in cells.
        width: usize,
        /// Grid height in cells.
        height: usize,
    },

    /// Maximum height used for quantization must be positive and finite.
    #[error("Invalid maximum height {0} (must be positive and finite)")]
    InvalidMaxHeight(f32),

    /// A cell's material index cannot be stored in one byte.
    #[error("Material index {index} at cell ({x}, {y}) exceeds the encodable maximum {max}")]
    UnrepresentableMaterial {
        /// Cell column.
        x: usize,
        /// Cell row.
        y: usize,
        /// Offending index.
        index: usize,
        /// Largest encodable index.
        max: usize,
    },

    /// A cell's material index points past the end of the name table.
    #[error("Material index {index} at cell ({x}, {y}) is out of range for {count} material names")]
    MaterialOutOfRange {
        /// Cell column.
        x: usize,
        /// Cell row.
        y: usize,
        /// Offending index.
        index: usize,
        /// Length of the name table.
        count: usize,
    },

    /// The material name table contains the same name twice.
    #[error("Duplicate material name: {0}")]
    DuplicateMaterial(String),

    /// A material name does not fit the one-byte length prefix.
    #[error("Material name too long: {len} bytes (max {max})")]
    NameTooLong {
        /// Encoded length of the name.
        len: usize,
        /// Maximum encodable length.
        max: usize,
    },

    /// A rectangle does not fit inside its grid.
    #[error("Rectangle {x},{y} {width}x{height} exceeds grid bounds {grid_width}x{grid_height}")]
    RectOutOfBounds {
        /// Rectangle left edge.
        x: isize,
        /// Rectangle top edge.
        y: isize,
        /// Rectangle width.
        width: usize,
        /// Rectangle height.
        height: usize,
        /// Grid width.
        grid_width: usize,
        /// Grid height.
        grid_height: usize,
    },

    /// The source rectangle of a draw covers no cells.
    #[error("Source rectangle is empty")]
    EmptySourceRect,

    /// An array does not match the grid it is applied to.
    #[error("Array length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Which array was mismatched.
        what: &'static str,
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// Invalid raster supplied to a projector.
    #[error("Invalid raster: {0}")]
    InvalidRaster(String),
}

impl TerrainError {
    /// Create a decode error at a specific offset.
    pub fn decode_at(offset: usize, message: impl Into<String>) -> Self {
        TerrainError::DecodeError {
            offset,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TerrainError::decode_at(17, "truncated height array");
        assert!(err.to_string().contains("offset 17"));

        let err = TerrainError::UnsupportedVersion {
            expected: 9,
            found: 8,
        };
        assert!(err.to_string().contains("version 8"));
    }
}
