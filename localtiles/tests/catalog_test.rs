use std::path::Path;

use insta::assert_snapshot;
use localtiles::LocalTilesError;
use localtiles::catalog::ArchiveCatalog;
use localtiles::resolver::{ResolutionStrategy, TileLookup, TileResolver};
use localtiles_mbtiles::sqlx::sqlite::SqliteConnectOptions;
use localtiles_mbtiles::sqlx::{Connection as _, Executor as _, SqliteConnection};
use localtiles_tile_utils::{TileCoord, TileKind, encode_zlib};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

pub mod utils;
pub use utils::*;

/// An archive with a `format` row but no `tiles` table, so every tile query fails.
async fn create_tableless(dir: &Path, file_name: &str) {
    let opt = SqliteConnectOptions::new()
        .filename(dir.join(file_name))
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&opt).await.unwrap();
    conn.execute(
        "CREATE TABLE metadata (name text, value text);
         INSERT INTO metadata (name, value) VALUES ('format', 'pbf');",
    )
    .await
    .unwrap();
    conn.close().await.unwrap();
}

async fn mixed_storage() -> TempDir {
    let dir = storage().await;
    let path = dir.path();
    create_archive(path, "hillshade.mbtiles", Some("webp"), &[]).await;
    create_archive(path, "contours.mbtiles", Some("pbf"), &[]).await;
    create_archive(path, "unformatted.mbtiles", None, &[]).await;
    create_archive(path, "uppercase.mbtiles", Some("PBF"), &[]).await;
    create_archive(path, "other.sqlite", Some("pbf"), &[]).await;
    std::fs::write(path.join("junk.mbtiles"), "not a database").unwrap();
    std::fs::create_dir(path.join("folder.mbtiles")).unwrap();
    dir
}

#[actix_rt::test]
#[tracing_test::traced_test]
async fn catalog_classification() {
    let dir = mixed_storage().await;
    let catalog = ArchiveCatalog::build(dir.path(), "mbtiles").await.unwrap();
    assert_eq!(catalog.storage_dir(), dir.path());
    assert_eq!(catalog.len(), 5);
    assert!(catalog.get(TileKind::Vector, "world").is_some());
    assert!(catalog.get(TileKind::Raster, "world").is_none());
    assert!(catalog.get(TileKind::Vector, "unformatted").is_none());
    assert!(catalog.get(TileKind::Raster, "unformatted").is_none());
    assert!(catalog.get(TileKind::Vector, "junk").is_none());
    assert!(catalog.get(TileKind::Raster, "junk").is_none());
    assert_snapshot!(catalog.to_string().trim_end(), @r"
    vector  contours (format=pbf)
    vector  world (format=pbf)
    raster  hillshade (format=webp)
    raster  satellite (format=png)
    raster  uppercase (format=PBF)
    ");
}

#[actix_rt::test]
async fn other_extension() {
    let dir = mixed_storage().await;
    let catalog = ArchiveCatalog::build(dir.path(), "sqlite").await.unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(
        catalog.get(TileKind::Vector, "other").unwrap().format(),
        "pbf"
    );
}

#[cfg(unix)]
#[actix_rt::test]
async fn unreadable_entry_is_skipped() {
    let dir = storage().await;
    std::os::unix::fs::symlink(
        dir.path().join("nowhere.mbtiles"),
        dir.path().join("dangling.mbtiles"),
    )
    .unwrap();
    let catalog = ArchiveCatalog::build(dir.path(), "mbtiles").await.unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(catalog.get(TileKind::Vector, "world").is_some());
    assert!(catalog.get(TileKind::Raster, "satellite").is_some());
}

#[actix_rt::test]
async fn missing_storage_dir() {
    let dir = TempDir::new().unwrap();
    let result = ArchiveCatalog::build(&dir.path().join("missing"), "mbtiles").await;
    assert!(matches!(result, Err(LocalTilesError::StorageDirError(..))));
}

async fn two_worlds() -> TempDir {
    let dir = TempDir::new().unwrap();
    let path = dir.path();
    let a = gzip(b"from-a");
    let b = gzip(b"from-b");
    create_archive(path, "a.mbtiles", Some("pbf"), &[(2, 1, 1, a.as_slice())]).await;
    create_archive(
        path,
        "b.mbtiles",
        Some("pbf"),
        &[(2, 1, 1, b.as_slice()), (2, 3, 3, &b"plain"[..])],
    )
    .await;
    dir
}

#[rstest]
#[case::scan_first_by_name(ResolutionStrategy::ScanAll, "b", 2, Some("a"), b"from-a")]
#[case::scan_later_archive(ResolutionStrategy::ScanAll, "a", 0, Some("b"), b"plain")]
#[case::by_name(ResolutionStrategy::ByName, "b", 2, Some("b"), b"from-b")]
#[case::by_name_miss(ResolutionStrategy::ByName, "a", 0, None, b"")]
#[case::by_name_unknown(ResolutionStrategy::ByName, "c", 2, None, b"")]
#[actix_rt::test]
async fn resolution_strategy(
    #[case] strategy: ResolutionStrategy,
    #[case] name: &str,
    #[case] y: u32,
    #[case] archive: Option<&str>,
    #[case] expected: &[u8],
) {
    let dir = two_worlds().await;
    let x = if y == 0 { 3 } else { 1 };
    let resolver = TileResolver::new(catalog(dir.path()).await, strategy);
    let coord = TileCoord::new(2, x, y);
    match resolver.lookup(TileKind::Vector, name, coord).await {
        TileLookup::Found { archive: found, data } => {
            assert_eq!(Some(found.as_str()), archive);
            assert_eq!(data, expected);
        }
        TileLookup::Miss { failures } => {
            assert_eq!(archive, None);
            assert!(failures.is_empty());
        }
    }
    assert_eq!(resolver.fetch(TileKind::Vector, name, coord).await, expected);
}

#[actix_rt::test]
async fn failing_archives_are_skipped() {
    let dir = two_worlds().await;
    create_tableless(dir.path(), "0_tableless.mbtiles").await;
    // gzip magic with a truncated stream
    create_archive(
        dir.path(),
        "1_truncated.mbtiles",
        Some("pbf"),
        &[(2, 1, 1, &b"\x1f\x8b\x08\x00trunc"[..])],
    )
    .await;

    let resolver = TileResolver::new(catalog(dir.path()).await, ResolutionStrategy::ScanAll);
    let TileLookup::Found { archive, data } = resolver
        .lookup(TileKind::Vector, "any", TileCoord::new(2, 1, 2))
        .await
    else {
        panic!("tile not found");
    };
    assert_eq!(archive, "a");
    assert_eq!(data, b"from-a");

    let TileLookup::Miss { failures } = resolver
        .lookup(TileKind::Vector, "any", TileCoord::new(2, 0, 0))
        .await
    else {
        panic!("unexpected tile");
    };
    let failures: Vec<_> = failures
        .iter()
        .map(|(name, e)| (name.as_str(), matches!(e, LocalTilesError::TileQueryError(..))))
        .collect();
    assert_eq!(failures, vec![("0_tableless", true)]);
}

#[actix_rt::test]
async fn truncated_tile_is_a_failure() {
    let dir = TempDir::new().unwrap();
    create_archive(
        dir.path(),
        "truncated.mbtiles",
        Some("pbf"),
        &[(0, 0, 0, &b"\x1f\x8b\x08\x00trunc"[..])],
    )
    .await;
    let resolver = TileResolver::new(catalog(dir.path()).await, ResolutionStrategy::ByName);
    let TileLookup::Miss { failures } = resolver
        .lookup(TileKind::Vector, "truncated", TileCoord::new(0, 0, 0))
        .await
    else {
        panic!("a truncated tile must not be served");
    };
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].1, LocalTilesError::DecodeError(..)));
}

#[actix_rt::test]
async fn empty_blob_is_a_miss() {
    let dir = TempDir::new().unwrap();
    create_archive(dir.path(), "empty.mbtiles", Some("png"), &[(0, 0, 0, &b""[..])]).await;
    let resolver = TileResolver::new(catalog(dir.path()).await, ResolutionStrategy::ScanAll);
    assert!(matches!(
        resolver
            .lookup(TileKind::Raster, "empty", TileCoord::new(0, 0, 0))
            .await,
        TileLookup::Miss { failures } if failures.is_empty()
    ));
}

#[actix_rt::test]
async fn vector_tiles_are_decompressed() {
    let dir = TempDir::new().unwrap();
    let gz = gzip(b"gzip-tile");
    let zlib = encode_zlib(b"zlib-tile").unwrap();
    create_archive(
        dir.path(),
        "mixed.mbtiles",
        Some("pbf"),
        &[
            (1, 0, 1, gz.as_slice()),
            (1, 1, 1, zlib.as_slice()),
            (1, 0, 0, &b"\x1a\x02raw"[..]),
        ],
    )
    .await;
    let resolver = TileResolver::new(catalog(dir.path()).await, ResolutionStrategy::ByName);
    for (x, y, expected) in [
        (0, 0, &b"gzip-tile"[..]),
        (1, 0, &b"zlib-tile"[..]),
        (0, 1, &b"\x1a\x02raw"[..]),
    ] {
        let coord = TileCoord::new(1, x, y);
        assert_eq!(resolver.fetch(TileKind::Vector, "mixed", coord).await, expected);
    }
}
