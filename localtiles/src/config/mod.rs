//! Configuration file handling.
//!
//! The file is YAML. `${VAR}` references are substituted from the environment
//! before parsing, and every value has a default.

use std::collections::HashMap;
use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use subst::VariableMap;
use tracing::warn;

use crate::LocalTilesError::NoStorageConfigured;
use crate::LocalTilesResult;
use crate::catalog::ARCHIVE_EXTENSION;
use crate::resolver::ResolutionStrategy;
use crate::router::LOCAL_PREFIX;
use crate::storage::{AppDataStorage, FixedStorage, StorageLocator};

mod error;
pub use error::{ConfigFileError, ConfigFileResult};

/// Marker appended to the user agent of every outgoing request
pub const USER_AGENT_MARKER: &str = "Flutter Plugin";

pub type UnrecognizedValues = HashMap<String, serde_yaml::Value>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub interceptor: InterceptorConfig,
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

/// Where the archives and local files live.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage directory. Takes precedence over `app_id` and `data_root`.
    pub dir: Option<PathBuf>,
    /// Application identifier, resolved to `<data_root>/<app_id>/files`
    pub app_id: Option<String>,
    pub data_root: Option<PathBuf>,
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

impl StorageConfig {
    pub fn locator(&self) -> LocalTilesResult<Box<dyn StorageLocator>> {
        match (&self.dir, &self.app_id, &self.data_root) {
            (Some(dir), _, _) => Ok(Box::new(FixedStorage(dir.clone()))),
            (None, Some(_), Some(data_root)) => Ok(Box::new(AppDataStorage {
                data_root: data_root.clone(),
            })),
            _ => Err(NoStorageConfigured),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptorConfig {
    /// URLs starting with this prefix are served locally
    pub local_prefix: String,
    /// Appended to the `User-Agent` header. Empty to leave requests untouched.
    pub user_agent_marker: String,
    pub archive_extension: String,
    pub strategy: ResolutionStrategy,
    #[serde(flatten)]
    pub unrecognized: UnrecognizedValues,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            local_prefix: LOCAL_PREFIX.to_string(),
            user_agent_marker: USER_AGENT_MARKER.to_string(),
            archive_extension: ARCHIVE_EXTENSION.to_string(),
            strategy: ResolutionStrategy::default(),
            unrecognized: UnrecognizedValues::default(),
        }
    }
}

impl Config {
    /// Validate the values and report unknown keys.
    pub fn finalize(&self) -> ConfigFileResult<()> {
        report_unrecognized("", &self.unrecognized);
        report_unrecognized("storage.", &self.storage.unrecognized);
        report_unrecognized("interceptor.", &self.interceptor.unrecognized);

        let prefix = &self.interceptor.local_prefix;
        if !(prefix.starts_with("https://") || prefix.starts_with("http://"))
            || prefix.ends_with('/')
        {
            return Err(ConfigFileError::InvalidLocalPrefix(prefix.clone()));
        }
        let ext = &self.interceptor.archive_extension;
        if ext.is_empty() || ext.contains(['.', '/']) {
            return Err(ConfigFileError::InvalidArchiveExtension(ext.clone()));
        }
        Ok(())
    }
}

fn report_unrecognized(prefix: &str, values: &UnrecognizedValues) {
    for key in values.keys() {
        warn!("Ignoring unrecognized configuration key '{prefix}{key}'. Please check your configuration file for typos.");
    }
}

/// Read config from a file
pub fn read_config<'a, M>(file_name: &Path, env: &'a M) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    let mut file =
        File::open(file_name).map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    parse_config(&contents, env, file_name)
}

pub fn parse_config<'a, M>(contents: &str, env: &'a M, file_name: &Path) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    subst::yaml::from_str(contents, env)
        .map_err(|e| ConfigFileError::ConfigParseError(e, file_name.into()))
}
