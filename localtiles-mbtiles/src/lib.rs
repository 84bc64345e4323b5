#![doc = "Read-only access to `MBTiles` archives: metadata values and tiles addressed in the XYZ scheme."]

// Re-export sqlx so that users of this crate can match on its errors
pub use sqlx;

mod errors;
pub use errors::{MbtError, MbtResult};

mod mbtiles;
pub use mbtiles::Mbtiles;

mod metadata;
pub use metadata::Metadata;

mod pool;
pub use pool::MbtilesPool;
