//! Tile lookups across the archives of a [`ArchiveCatalog`].

use std::sync::Arc;

use clap::ValueEnum;
use localtiles_tile_utils::{Encoding, TileCoord, TileKind, decode_gzip, decode_zlib};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::LocalTilesError;
use crate::LocalTilesError::{DecodeError, TileQueryError};
use crate::catalog::{Archive, ArchiveCatalog};

/// Which archives are asked for a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Ask every archive of the requested kind in name order, ignoring the name
    /// given in the path. The first archive holding the tile wins.
    #[default]
    ScanAll,
    /// Only ask the archive named in the path.
    ByName,
}

/// Outcome of asking a single archive for a tile.
#[derive(Debug)]
pub enum ArchiveQuery {
    Found(Vec<u8>),
    Miss,
    Failed(LocalTilesError),
}

/// Outcome of a tile lookup across the candidate archives.
#[derive(Debug)]
pub enum TileLookup {
    Found {
        archive: String,
        data: Vec<u8>,
    },
    /// No archive had the tile. Archives whose query failed are listed with their error.
    Miss {
        failures: Vec<(String, LocalTilesError)>,
    },
}

impl TileLookup {
    /// The tile payload, or an empty body on a miss.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        match self {
            Self::Found { data, .. } => data,
            Self::Miss { .. } => Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TileResolver {
    catalog: Arc<ArchiveCatalog>,
    strategy: ResolutionStrategy,
}

impl TileResolver {
    #[must_use]
    pub fn new(catalog: Arc<ArchiveCatalog>, strategy: ResolutionStrategy) -> Self {
        Self { catalog, strategy }
    }

    #[must_use]
    pub fn catalog(&self) -> &ArchiveCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// Get the tile payload, vector tiles decompressed. A miss yields an empty body.
    pub async fn fetch(&self, kind: TileKind, name: &str, coord: TileCoord) -> Vec<u8> {
        self.lookup(kind, name, coord).await.into_data()
    }

    pub async fn lookup(&self, kind: TileKind, name: &str, coord: TileCoord) -> TileLookup {
        debug!("Fetching {kind} tile {coord:#} from {name}");
        let candidates: Vec<&Archive> = match self.strategy {
            ResolutionStrategy::ScanAll => self.catalog.index(kind).values().collect(),
            ResolutionStrategy::ByName => self.catalog.get(kind, name).into_iter().collect(),
        };

        let mut failures = Vec::new();
        for archive in candidates {
            trace!("Trying {coord:#} in {}", archive.name());
            match query_archive(archive, coord).await {
                ArchiveQuery::Found(data) => {
                    return TileLookup::Found {
                        archive: archive.name().to_string(),
                        data,
                    };
                }
                ArchiveQuery::Miss => {}
                ArchiveQuery::Failed(e) => {
                    warn!("{e}");
                    failures.push((archive.name().to_string(), e));
                }
            }
        }
        trace!("No {kind} archive has tile {coord:#}");
        TileLookup::Miss { failures }
    }
}

/// Ask one archive for a tile, decompressing gzip or zlib framed vector content.
///
/// An empty blob counts as a miss.
pub async fn query_archive(archive: &Archive, coord: TileCoord) -> ArchiveQuery {
    let data = match archive.pool().get_tile(coord).await {
        Ok(Some(data)) if !data.is_empty() => data,
        Ok(_) => return ArchiveQuery::Miss,
        Err(e) => {
            return ArchiveQuery::Failed(TileQueryError(e, coord, archive.name().to_string()));
        }
    };
    match archive.kind() {
        TileKind::Raster => ArchiveQuery::Found(data),
        TileKind::Vector => {
            let decoded = match Encoding::detect(&data) {
                Encoding::Gzip => decode_gzip(&data),
                Encoding::Zlib => decode_zlib(&data),
                Encoding::Uncompressed => {
                    trace!(
                        "Tile {coord:#} of {} is not compressed, serving as stored",
                        archive.name()
                    );
                    return ArchiveQuery::Found(data);
                }
            };
            match decoded {
                Ok(data) => ArchiveQuery::Found(data),
                Err(e) => ArchiveQuery::Failed(DecodeError(e, coord, archive.name().to_string())),
            }
        }
    }
}
