//! Tile pull contract.
//!
//! Tiles are produced lazily: the image is generated only when asked for and
//! nothing is retained afterwards. Caching happens at a different level.

use std::io::{Cursor, Read};

use image::DynamicImage;

use crate::bbox::Envelope;

/// A single tile of map data.
pub trait Tile: Send + Sync {
    /// Decode or render the tile into an image.
    fn as_image(&self) -> Result<DynamicImage, TileError>;

    /// Stream the raw encoded tile bytes. Each call yields a fresh stream.
    fn as_stream(&self) -> Result<Box<dyn Read + Send>, TileError>;

    /// Envelope of the tile data, measured from the outer bounds of the border pixels.
    fn envelope(&self) -> &Envelope;
}

/// A tile backed by already encoded image bytes (PNG, JPEG, ...).
#[derive(Debug, Clone)]
pub struct EncodedTile {
    data: Vec<u8>,
    envelope: Envelope,
}

impl EncodedTile {
    pub fn new(data: Vec<u8>, envelope: Envelope) -> Self {
        Self { data, envelope }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Tile for EncodedTile {
    fn as_image(&self) -> Result<DynamicImage, TileError> {
        if self.data.is_empty() {
            return Err(TileError::Empty);
        }
        image::load_from_memory(&self.data).map_err(|e| TileError::Decode(e.to_string()))
    }

    fn as_stream(&self) -> Result<Box<dyn Read + Send>, TileError> {
        Ok(Box::new(Cursor::new(self.data.clone())))
    }

    fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("Tile has no data")]
    Empty,

    #[error("Failed to decode tile image: {0}")]
    Decode(String),

    #[error("Tile I/O error: {0}")]
    Io(#[from] std::io::Error),
}
