use localtiles_tile_utils::{TileCoord, TileKind};

/// Prefix of the paths that address tiles
pub const TILES_PREFIX: &str = "/tiles";

/// A decoded local path, classified once.
///
/// The `coord` of a tile variant is `None` when one of the numbers is too large
/// for a tile address. No archive holds such a tile, so it resolves to a miss.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalPath {
    /// `/tiles/<name>/<z>/<x>/<y>.pbf`
    VectorTile {
        name: String,
        coord: Option<TileCoord>,
    },
    /// `/tiles/<name>/<z>/<x>/<y>.png`
    RasterTile {
        name: String,
        coord: Option<TileCoord>,
    },
    /// Any path outside of `/tiles`, relative to the storage directory
    LocalFile { path: String },
    /// A `/tiles` path that does not address a tile
    Unmatched,
}

impl LocalPath {
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let Some(rest) = path.strip_prefix(TILES_PREFIX) else {
            return Self::LocalFile {
                path: path.to_string(),
            };
        };
        let Some(rest) = rest.strip_prefix('/') else {
            return Self::Unmatched;
        };
        let Some((kind, rest)) = [TileKind::Vector, TileKind::Raster]
            .into_iter()
            .find_map(|kind| {
                let rest = rest.strip_suffix(kind.extension())?.strip_suffix('.')?;
                Some((kind, rest))
            })
        else {
            return Self::Unmatched;
        };

        // The name may itself contain slashes, so the coordinates are taken from the end
        let mut parts = rest.rsplitn(4, '/');
        let (Some(y), Some(x), Some(z), Some(name)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Self::Unmatched;
        };
        if name.is_empty() {
            return Self::Unmatched;
        }
        if !(is_decimal(z) && is_decimal(x) && is_decimal(y)) {
            return Self::Unmatched;
        }
        // Digits only, so parsing can only fail on overflow
        let coord = match (z.parse(), x.parse(), y.parse()) {
            (Ok(z), Ok(x), Ok(y)) => Some(TileCoord::new(z, x, y)),
            _ => None,
        };

        let name = name.to_string();
        match kind {
            TileKind::Vector => Self::VectorTile { name, coord },
            TileKind::Raster => Self::RasterTile { name, coord },
        }
    }
}

/// A non-empty run of ASCII digits. Signs and whitespace are rejected.
fn is_decimal(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
