use std::ffi::OsStr;
use std::fmt::{Display, Formatter};
use std::path::Path;

use localtiles_tile_utils::TileCoord;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection as _, SqliteConnection, SqliteExecutor, query_scalar};
use tracing::{debug, trace};

use crate::errors::{MbtError, MbtResult};

/// A path to an `MBTiles` file, plus the name it is known by (the file stem).
///
/// This type does not hold a connection. Use [`Mbtiles::open_readonly`] for a single
/// connection or [`MbtilesPool`](crate::MbtilesPool) for concurrent access.
#[derive(Clone, Debug)]
pub struct Mbtiles {
    filepath: String,
    filename: String,
}

impl Display for Mbtiles {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.filepath)
    }
}

impl Mbtiles {
    pub fn new<P: AsRef<Path>>(filepath: P) -> MbtResult<Self> {
        let path = filepath.as_ref();
        Ok(Self {
            filepath: path
                .to_str()
                .ok_or_else(|| MbtError::UnsupportedCharsInFilepath(path.to_path_buf()))?
                .to_string(),
            filename: path
                .file_stem()
                .unwrap_or_else(|| OsStr::new("unknown"))
                .to_string_lossy()
                .to_string(),
        })
    }

    pub async fn open_readonly(&self) -> MbtResult<SqliteConnection> {
        debug!("Opening as readonly {self}");
        let opt = self.readonly_options();
        Ok(SqliteConnection::connect_with(&opt).await?)
    }

    pub(crate) fn readonly_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(self.filepath())
            .read_only(true)
    }

    #[must_use]
    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    /// The file name without its extension
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Get the blob stored for an XYZ tile coordinate.
    ///
    /// The row is flipped to the TMS scheme used by the `tiles` table.
    /// Coordinates that do not exist at their zoom level are reported as missing.
    pub async fn get_tile<T>(&self, conn: &mut T, coord: TileCoord) -> MbtResult<Option<Vec<u8>>>
    where
        for<'e> &'e mut T: SqliteExecutor<'e>,
    {
        let Some(tms_row) = coord.tms_row() else {
            trace!("Tile {coord:#} is outside of its zoom level in {self}");
            return Ok(None);
        };
        let row = query_scalar::<_, Option<Vec<u8>>>(
            "SELECT tile_data FROM tiles WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?",
        )
        .bind(coord.z)
        .bind(coord.x)
        .bind(tms_row)
        .fetch_optional(conn)
        .await?;
        Ok(row.flatten())
    }
}
