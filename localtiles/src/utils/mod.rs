mod error;
pub use error::{LocalTilesError, LocalTilesResult};
