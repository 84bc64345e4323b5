use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum MbtError {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),

    #[error("MBTile filepath contains unsupported characters: {}", .0.display())]
    UnsupportedCharsInFilepath(PathBuf),
}

pub type MbtResult<T> = Result<T, MbtError>;
