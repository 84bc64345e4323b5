use std::io;
use std::path::PathBuf;

use localtiles_mbtiles::MbtError;
use localtiles_tile_utils::{TileCoord, TileKind};

/// A convenience [`Result`] for the localtiles crate.
pub type LocalTilesResult<T> = Result<T, LocalTilesError>;

#[derive(thiserror::Error, Debug)]
pub enum LocalTilesError {
    #[error("Storage directory {1} is not accessible: {0}")]
    StorageDirError(#[source] io::Error, PathBuf),

    #[error("Unable to locate the storage directory of application '{1}': {0}")]
    StorageLocatorError(#[source] io::Error, String),

    #[error(
        "No storage directory configured. Set storage.dir, or both storage.app_id and storage.data_root"
    )]
    NoStorageConfigured,

    #[error("Unable to open archive {1}: {0}")]
    ArchiveOpenError(#[source] MbtError, PathBuf),

    #[error("Unable to read metadata of archive {1}: {0}")]
    InvalidMetadata(#[source] MbtError, PathBuf),

    #[error("Archive {0} has no 'format' metadata value")]
    MissingFormat(PathBuf),

    #[error("Unable to query tile {1:#} in archive {2}: {0}")]
    TileQueryError(#[source] MbtError, TileCoord, String),

    #[error("Unable to decompress tile {1:#} of archive {2}: {0}")]
    DecodeError(#[source] io::Error, TileCoord, String),

    #[error("{0} is not served locally")]
    NotServedLocally(String),

    #[error("Tile {1:#} was not found in any {0} archive")]
    TileNotFound(TileKind, TileCoord),

    #[error(transparent)]
    ConfigFileError(#[from] crate::config::ConfigFileError),

    #[error(transparent)]
    IoError(#[from] io::Error),
}
