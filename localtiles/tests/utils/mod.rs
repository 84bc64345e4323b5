#![allow(clippy::missing_panics_doc)]
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use localtiles::catalog::ArchiveCatalog;
use localtiles::config::InterceptorConfig;
use localtiles::http::{HttpRequest, HttpRequestError, HttpResponse};
use localtiles::interceptor::LocalHttpService;
use localtiles::storage::FixedStorage;
use localtiles_mbtiles::sqlx::sqlite::SqliteConnectOptions;
use localtiles_mbtiles::sqlx::{Connection as _, Executor as _, SqliteConnection, query};
use localtiles_tile_utils::encode_gzip;
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE metadata (name text, value text);
    CREATE TABLE tiles (zoom_level integer, tile_column integer, tile_row integer, tile_data blob);
    CREATE UNIQUE INDEX tile_index on tiles (zoom_level, tile_column, tile_row);";

/// A tile as stored in the archive: zoom, column, TMS row and blob.
pub type StoredTile<'a> = (u8, u32, u32, &'a [u8]);

/// Create an archive in `dir`. A `None` format leaves the `format` row out.
pub async fn create_archive(
    dir: &Path,
    file_name: &str,
    format: Option<&str>,
    tiles: &[StoredTile<'_>],
) {
    let opt = SqliteConnectOptions::new()
        .filename(dir.join(file_name))
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&opt).await.unwrap();
    conn.execute(SCHEMA).await.unwrap();
    query("INSERT INTO metadata (name, value) VALUES ('name', ?)")
        .bind(file_name)
        .execute(&mut conn)
        .await
        .unwrap();
    if let Some(format) = format {
        query("INSERT INTO metadata (name, value) VALUES ('format', ?)")
            .bind(format)
            .execute(&mut conn)
            .await
            .unwrap();
    }
    for &(z, x, y, data) in tiles {
        query("INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?, ?, ?, ?)")
            .bind(z)
            .bind(x)
            .bind(y)
            .bind(data)
            .execute(&mut conn)
            .await
            .unwrap();
    }
    conn.close().await.unwrap();
}

#[must_use]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    encode_gzip(data).unwrap()
}

/// Storage directory with:
/// - `world.mbtiles`: pbf, gzipped `PBF-BYTES` at XYZ 3/2/1 (TMS row 6)
/// - `satellite.mbtiles`: png, raw `PNG-BYTES` at XYZ 1/0/0 (TMS row 1)
/// - `style.json`
pub async fn storage() -> TempDir {
    let dir = TempDir::new().unwrap();
    let pbf = gzip(b"PBF-BYTES");
    create_archive(dir.path(), "world.mbtiles", Some("pbf"), &[(3, 2, 6, pbf.as_slice())]).await;
    create_archive(
        dir.path(),
        "satellite.mbtiles",
        Some("png"),
        &[(1, 0, 1, &b"\x89PNG-BYTES"[..])],
    )
    .await;
    std::fs::write(dir.path().join("style.json"), br#"{"version":8}"#).unwrap();
    dir
}

#[must_use]
pub fn service(dir: &Path, config: InterceptorConfig) -> LocalHttpService {
    LocalHttpService::new(
        Box::new(FixedStorage(dir.to_path_buf())),
        "com.example.maps",
        config,
    )
}

pub async fn catalog(dir: &Path) -> Arc<ArchiveCatalog> {
    Arc::new(ArchiveCatalog::build(dir, "mbtiles").await.unwrap())
}

/// A transport response for `url` that failed, as it does for the `local` host.
#[must_use]
pub fn failed_response(url: &str) -> HttpResponse {
    HttpResponse::new(
        HttpRequest::new(url).with_header("Accept", "*/*"),
        Err(HttpRequestError::new("Failed host lookup: 'local'")),
    )
}

/// The body of a substituted response, `None` if the response was passed through.
#[must_use]
pub fn substituted_body(original: &HttpResponse, response: HttpResponse) -> Option<Vec<u8>> {
    if &response == original {
        return None;
    }
    let data = response.outcome.unwrap();
    assert_eq!(data.code, 200);
    assert_eq!(data.headers, original.request.headers);
    Some(data.data)
}
