use std::fmt::Display;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use sqlx::{SqliteExecutor, query_as, query_scalar};
use tilejson::{Bounds, Center, TileJSON, tilejson};
use tracing::{debug, warn};

use crate::Mbtiles;
use crate::errors::MbtResult;

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metadata {
    pub id: String,
    /// Raw value of the `format` key, e.g. `pbf` or `png`
    pub format: Option<String>,
    pub layer_type: Option<String>,
    pub tilejson: TileJSON,
}

impl Mbtiles {
    fn to_val<V, E: Display>(&self, val: Result<V, E>, title: &str) -> Option<V> {
        match val {
            Ok(v) => Some(v),
            Err(err) => {
                let name = &self.filename();
                warn!("Unable to parse metadata {title} value in {name}: {err}");
                None
            }
        }
    }

    /// Get a single metadata value from the metadata table
    pub async fn get_metadata_value<T>(&self, conn: &mut T, key: &str) -> MbtResult<Option<String>>
    where
        for<'e> &'e mut T: SqliteExecutor<'e>,
    {
        let value = query_scalar::<_, Option<String>>("SELECT value FROM metadata WHERE name = ?")
            .bind(key)
            .fetch_optional(conn)
            .await?;
        Ok(value.flatten())
    }

    pub async fn get_metadata<T>(&self, conn: &mut T) -> MbtResult<Metadata>
    where
        for<'e> &'e mut T: SqliteExecutor<'e>,
    {
        let rows = query_as::<_, (Option<String>, Option<String>)>(
            "SELECT name, value FROM metadata WHERE value IS NOT ''",
        )
        .fetch_all(conn)
        .await?;

        let mut tj = tilejson! { tiles: vec![] };
        let mut format: Option<String> = None;
        let mut layer_type: Option<String> = None;

        for row in rows {
            if let (Some(name), Some(value)) = row {
                match name.as_ref() {
                    "name" => tj.name = Some(value),
                    "version" => tj.version = Some(value),
                    "bounds" => tj.bounds = self.to_val(Bounds::from_str(value.as_str()), &name),
                    "center" => tj.center = self.to_val(Center::from_str(value.as_str()), &name),
                    "minzoom" => tj.minzoom = self.to_val(value.parse(), &name),
                    "maxzoom" => tj.maxzoom = self.to_val(value.parse(), &name),
                    "description" => tj.description = Some(value),
                    "attribution" => tj.attribution = Some(value),
                    "type" => layer_type = Some(value),
                    "format" => format = Some(value),
                    "scheme" => {
                        if value != "tms" {
                            let file = &self.filename();
                            warn!(
                                "File {file} has an unexpected metadata value {name}='{value}'. Only 'tms' is supported. Ignoring."
                            );
                        }
                    }
                    _ => {
                        debug!("{} has an extra metadata value {name}={value}", self.filename());
                        tj.other.insert(name, Value::String(value));
                    }
                }
            }
        }

        Ok(Metadata {
            id: self.filename().to_string(),
            format,
            layer_type,
            tilejson: tj,
        })
    }
}
