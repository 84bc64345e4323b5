#![doc = "Tile coordinate, tile kind and compression helpers shared by the localtiles crates."]

use std::fmt::{Display, Formatter};
use std::str::FromStr;

mod decoders;
pub use decoders::{decode_gzip, decode_zlib, encode_gzip, encode_zlib};

/// The highest zoom level whose rows still fit the `u32` row arithmetic.
pub const MAX_ZOOM: u8 = 30;

/// Value of the `format` metadata key that marks an archive as vector content.
pub const VECTOR_FORMAT: &str = "pbf";

/// A tile address in the XYZ scheme (origin at the top-left corner).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    #[must_use]
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// The row of this tile in the TMS scheme (origin at the bottom-left corner),
    /// as stored in the `tile_row` column of an `MBTiles` file.
    ///
    /// Returns `None` when the row does not exist at this zoom level.
    #[must_use]
    pub fn tms_row(&self) -> Option<u32> {
        invert_y_value(self.z, self.y)
    }
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{}/{}/{}", self.z, self.x, self.y)
        } else {
            write!(f, "{},{},{}", self.z, self.x, self.y)
        }
    }
}

/// Flip a tile row between the XYZ and TMS schemes: `(2^z - 1) - y`.
///
/// Applying it twice with the same zoom yields the original row.
#[must_use]
pub fn invert_y_value(zoom: u8, y: u32) -> Option<u32> {
    if zoom > MAX_ZOOM {
        return None;
    }
    let last_row = (1_u32 << zoom) - 1;
    last_row.checked_sub(y)
}

/// What an archive stores, decided by its `format` metadata value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileKind {
    /// Gzip-framed Mapbox vector tiles (`format = pbf`)
    Vector,
    /// Any image format, served as stored
    Raster,
}

impl TileKind {
    /// `pbf` is vector content, every other format is treated as raster imagery.
    #[must_use]
    pub fn from_format(format: &str) -> Self {
        if format == VECTOR_FORMAT {
            Self::Vector
        } else {
            Self::Raster
        }
    }

    /// File suffix used by tile request paths of this kind.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vector => "pbf",
            Self::Raster => "png",
        }
    }
}

impl Display for TileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Vector => "vector",
            Self::Raster => "raster",
        })
    }
}

impl FromStr for TileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vector" | "pbf" | "mvt" => Ok(Self::Vector),
            "raster" | "png" => Ok(Self::Raster),
            _ => Err(format!(
                "Invalid tile kind '{s}'. Valid options: vector or raster"
            )),
        }
    }
}

/// Compression framing of a stored tile blob, detected from its magic bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Encoding {
    Uncompressed,
    Gzip,
    Zlib,
}

impl Encoding {
    #[must_use]
    pub fn detect(data: &[u8]) -> Self {
        match data {
            [0x1f, 0x8b, ..] => Self::Gzip,
            [0x78, 0x01 | 0x5e | 0x9c | 0xda, ..] => Self::Zlib,
            _ => Self::Uncompressed,
        }
    }
}
