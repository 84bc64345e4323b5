use std::path::Path;

use localtiles_tile_utils::TileCoord;
use sqlx::{Pool, Sqlite, SqlitePool};

use crate::errors::MbtResult;
use crate::{Mbtiles, Metadata};

/// Connection pool for concurrent read access to an `MBTiles` file.
///
/// The pool is opened read-only and is cheap to clone. All clones share the same
/// connections, so a single pool per archive can serve every concurrent request.
///
/// ```
/// use localtiles_mbtiles::MbtilesPool;
/// use localtiles_tile_utils::TileCoord;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = MbtilesPool::open_readonly("world.mbtiles").await?;
/// let format = pool.get_metadata_value("format").await?;
/// if let Some(tile_data) = pool.get_tile(TileCoord::new(3, 2, 1)).await? {
///     println!("{format:?} tile size: {} bytes", tile_data.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MbtilesPool {
    mbtiles: Mbtiles,
    pool: Pool<Sqlite>,
}

impl MbtilesPool {
    /// Opens an `MBTiles` file in read-only mode with connection pooling.
    ///
    /// Fails if the file does not exist or cannot be opened by `SQLite`.
    /// A file that is not a database only fails on the first query.
    pub async fn open_readonly<P: AsRef<Path>>(filepath: P) -> MbtResult<Self> {
        let mbtiles = Mbtiles::new(filepath)?;
        let pool = SqlitePool::connect_with(mbtiles.readonly_options()).await?;
        Ok(Self { mbtiles, pool })
    }

    #[must_use]
    pub fn mbtiles(&self) -> &Mbtiles {
        &self.mbtiles
    }

    pub async fn get_metadata(&self) -> MbtResult<Metadata> {
        let mut conn = self.pool.acquire().await?;
        self.mbtiles.get_metadata(&mut *conn).await
    }

    pub async fn get_metadata_value(&self, key: &str) -> MbtResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        self.mbtiles.get_metadata_value(&mut *conn, key).await
    }

    /// Get a tile by its XYZ coordinate, see [`Mbtiles::get_tile`].
    pub async fn get_tile(&self, coord: TileCoord) -> MbtResult<Option<Vec<u8>>> {
        let mut conn = self.pool.acquire().await?;
        self.mbtiles.get_tile(&mut *conn, coord).await
    }
}
