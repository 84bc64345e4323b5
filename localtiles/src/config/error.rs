use std::path::PathBuf;

pub type ConfigFileResult<T> = Result<T, ConfigFileError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigFileError {
    #[error("Unable to load config file {1}: {0}")]
    ConfigLoadError(#[source] std::io::Error, PathBuf),

    #[error("Unable to parse config file {1}: {0}")]
    ConfigParseError(#[source] subst::yaml::Error, PathBuf),

    #[error("The local prefix must be an absolute URL prefix such as https://local, but is '{0}'")]
    InvalidLocalPrefix(String),

    #[error("The archive extension must be a non-empty extension without a dot, but is '{0}'")]
    InvalidArchiveExtension(String),
}
