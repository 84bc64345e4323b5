//! Decides whether a response is served locally, and from where.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use localtiles_tile_utils::{TileCoord, TileKind};
use percent_encoding::percent_decode_str;
use tracing::{debug, trace, warn};

use crate::catalog::ArchiveCatalog;
use crate::http::HttpResponse;
use crate::resolver::{ResolutionStrategy, TileResolver};

mod path;
pub use path::{LocalPath, TILES_PREFIX};

/// Authority prefix of the URLs served locally
pub const LOCAL_PREFIX: &str = "https://local";

#[derive(Clone, Debug)]
pub struct RequestRouter {
    resolver: TileResolver,
    local_prefix: String,
}

impl RequestRouter {
    #[must_use]
    pub fn new(
        catalog: Arc<ArchiveCatalog>,
        strategy: ResolutionStrategy,
        local_prefix: impl Into<String>,
    ) -> Self {
        Self {
            resolver: TileResolver::new(catalog, strategy),
            local_prefix: local_prefix.into(),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &TileResolver {
        &self.resolver
    }

    #[must_use]
    pub fn catalog(&self) -> &ArchiveCatalog {
        self.resolver.catalog()
    }

    #[must_use]
    pub fn is_local(&self, url: &str) -> bool {
        url.starts_with(&self.local_prefix)
    }

    /// Strip the local prefix from a percent-decoded URL.
    ///
    /// `+` is decoded to a space, as in form encoding.
    /// Returns `None` for non-local URLs and for URLs that do not decode to UTF-8.
    #[must_use]
    pub fn local_path(&self, url: &str) -> Option<String> {
        if !self.is_local(url) {
            return None;
        }
        let url = url.replace('+', " ");
        let decoded = percent_decode_str(&url).decode_utf8().ok()?;
        decoded
            .strip_prefix(&self.local_prefix)
            .map(ToString::to_string)
    }

    /// Substitute the response for a local request, or return it unchanged.
    pub async fn route(&self, response: HttpResponse) -> HttpResponse {
        let url = &response.request.url;
        let Some(path) = self.local_path(url) else {
            trace!("Network response: {url}");
            return response;
        };
        match self.resolve(&path).await {
            Some(data) => response.substitute(data),
            None => response,
        }
    }

    /// Get the local body for a decoded local path, if there is one.
    pub async fn resolve(&self, path: &str) -> Option<Vec<u8>> {
        match LocalPath::parse(path) {
            LocalPath::VectorTile { name, coord } => {
                Some(self.fetch_tile(TileKind::Vector, &name, coord, path).await)
            }
            LocalPath::RasterTile { name, coord } => {
                Some(self.fetch_tile(TileKind::Raster, &name, coord, path).await)
            }
            LocalPath::LocalFile { path } => self.read_local_file(&path).await,
            LocalPath::Unmatched => {
                debug!("No tile matches {path}");
                None
            }
        }
    }

    async fn fetch_tile(
        &self,
        kind: TileKind,
        name: &str,
        coord: Option<TileCoord>,
        path: &str,
    ) -> Vec<u8> {
        let Some(coord) = coord else {
            debug!("Tile numbers of {path} are out of range, answering with an empty {kind} tile");
            return Vec::new();
        };
        let data = self.resolver.fetch(kind, name, coord).await;
        debug!("Got {kind} tile {name}/{coord:#} of length {}", data.len());
        data
    }

    async fn read_local_file(&self, path: &str) -> Option<Vec<u8>> {
        let Some(file) = safe_join(self.catalog().storage_dir(), path) else {
            warn!("Refusing to serve {path} from outside of the storage directory");
            return None;
        };
        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                debug!("Not a file: {}", file.display());
                return None;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("File not found: {}", file.display());
                return None;
            }
            Err(e) => {
                warn!("Unable to access {}: {e}", file.display());
                return None;
            }
        }
        match tokio::fs::read(&file).await {
            Ok(data) => {
                debug!("Serving local file {}", file.display());
                Some(data)
            }
            Err(e) => {
                warn!("Unable to read {}: {e}", file.display());
                None
            }
        }
    }
}

/// Join a request path under `root`, rejecting anything that could leave it.
fn safe_join(root: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let mut joined = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}
