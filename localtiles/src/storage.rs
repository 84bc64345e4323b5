//! Discovery of the directory that holds the archives and local files.

use std::fmt::Debug;
use std::io;
use std::path::PathBuf;

/// Translates an application identifier into its private storage directory.
///
/// Invoked once, when the catalog is first needed.
pub trait StorageLocator: Send + Sync + Debug {
    fn storage_dir(&self, app_id: &str) -> io::Result<PathBuf>;
}

/// A storage directory known up front. The application id is ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedStorage(pub PathBuf);

impl StorageLocator for FixedStorage {
    fn storage_dir(&self, _app_id: &str) -> io::Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Per-application data directories laid out as `<data_root>/<app_id>/files`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppDataStorage {
    pub data_root: PathBuf,
}

impl StorageLocator for AppDataStorage {
    fn storage_dir(&self, app_id: &str) -> io::Result<PathBuf> {
        if app_id.is_empty() || app_id.contains(['/', '\\']) || app_id == ".." {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{app_id}' is not a valid application id"),
            ));
        }
        let dir = self.data_root.join(app_id).join("files");
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("application data directory {} does not exist", dir.display()),
            ))
        }
    }
}
