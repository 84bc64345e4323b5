//! Discovery and classification of the `MBTiles` archives in the storage directory.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};

use localtiles_mbtiles::MbtilesPool;
use localtiles_tile_utils::TileKind;
use tracing::{debug, info, warn};

use crate::LocalTilesError::{
    ArchiveOpenError, InvalidMetadata, MissingFormat, StorageDirError,
};
use crate::LocalTilesResult;

/// Default file extension of tile archives
pub const ARCHIVE_EXTENSION: &str = "mbtiles";

/// An opened archive, classified by the `format` value of its metadata.
#[derive(Clone)]
pub struct Archive {
    name: String,
    kind: TileKind,
    format: String,
    path: PathBuf,
    pool: MbtilesPool,
}

#[expect(clippy::missing_fields_in_debug)]
impl Debug for Archive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("path", &self.path)
            .finish()
    }
}

impl Archive {
    /// Open the archive read-only and classify it.
    ///
    /// Fails if the file cannot be opened, the metadata cannot be queried,
    /// or there is no `format` value.
    pub async fn open(name: String, path: PathBuf) -> LocalTilesResult<Self> {
        let pool = MbtilesPool::open_readonly(&path)
            .await
            .map_err(|e| ArchiveOpenError(e, path.clone()))?;
        let format = pool
            .get_metadata_value("format")
            .await
            .map_err(|e| InvalidMetadata(e, path.clone()))?
            .ok_or_else(|| MissingFormat(path.clone()))?;
        Ok(Self {
            name,
            kind: TileKind::from_format(&format),
            format,
            path,
            pool,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> TileKind {
        self.kind
    }

    /// The raw `format` metadata value
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn pool(&self) -> &MbtilesPool {
        &self.pool
    }
}

/// Archives found in a storage directory, indexed by name, one index per [`TileKind`].
///
/// The catalog is never modified once built. Its archives stay open until it is dropped.
#[derive(Clone, Debug, Default)]
pub struct ArchiveCatalog {
    storage_dir: PathBuf,
    vector: BTreeMap<String, Archive>,
    raster: BTreeMap<String, Archive>,
}

impl ArchiveCatalog {
    /// Scan `storage_dir` for files ending in `.{extension}` and open each of them.
    ///
    /// Only an unreadable directory is an error. An entry that cannot be read, or an
    /// archive that cannot be opened or classified, is logged and left out, and the
    /// scan continues with the next one.
    pub async fn build(storage_dir: &Path, extension: &str) -> LocalTilesResult<Self> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(storage_dir)
            .await
            .map_err(|e| StorageDirError(e, storage_dir.into()))?;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {e}", storage_dir.display());
                    continue;
                }
            };
            let path = entry.path();
            debug!("Found {} in the storage directory", path.display());
            if path.extension() != Some(OsStr::new(extension)) {
                continue;
            }
            // Follows symlinks, like the archive open does
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push(path),
                Ok(_) => debug!("Ignoring {}, it is not a file", path.display()),
                Err(e) => warn!("Skipping archive {}: {e}", path.display()),
            }
        }
        files.sort();

        let mut catalog = Self {
            storage_dir: storage_dir.to_path_buf(),
            ..Self::default()
        };
        for path in files {
            let Some(name) = path.file_stem().and_then(OsStr::to_str) else {
                warn!("Ignoring archive with a non UTF-8 name: {}", path.display());
                continue;
            };
            match Archive::open(name.to_string(), path.clone()).await {
                Ok(archive) => {
                    info!(
                        "Opened {} archive {name} ({}) at {}",
                        archive.kind(),
                        archive.format(),
                        path.display()
                    );
                    catalog.insert(archive);
                }
                Err(e) => warn!("Skipping archive {}: {e}", path.display()),
            }
        }
        Ok(catalog)
    }

    fn insert(&mut self, archive: Archive) {
        let index = match archive.kind() {
            TileKind::Vector => &mut self.vector,
            TileKind::Raster => &mut self.raster,
        };
        index.insert(archive.name().to_string(), archive);
    }

    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    #[must_use]
    pub fn vector(&self) -> &BTreeMap<String, Archive> {
        &self.vector
    }

    #[must_use]
    pub fn raster(&self) -> &BTreeMap<String, Archive> {
        &self.raster
    }

    #[must_use]
    pub fn index(&self, kind: TileKind) -> &BTreeMap<String, Archive> {
        match kind {
            TileKind::Vector => &self.vector,
            TileKind::Raster => &self.raster,
        }
    }

    #[must_use]
    pub fn get(&self, kind: TileKind, name: &str) -> Option<&Archive> {
        self.index(kind).get(name)
    }

    /// All archives, vector ones first, each group ordered by name
    pub fn archives(&self) -> impl Iterator<Item = &Archive> {
        self.vector.values().chain(self.raster.values())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vector.len() + self.raster.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for ArchiveCatalog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for archive in self.archives() {
            writeln!(
                f,
                "{:<8}{} (format={})",
                archive.kind().to_string(),
                archive.name(),
                archive.format()
            )?;
        }
        Ok(())
    }
}
