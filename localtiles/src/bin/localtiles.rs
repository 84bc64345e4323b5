use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, Subcommand};
use localtiles::LocalTilesError::{NotServedLocally, StorageLocatorError, TileNotFound};
use localtiles::LocalTilesResult;
use localtiles::catalog::ArchiveCatalog;
use localtiles::config::{Config, read_config};
use localtiles::http::{HttpRequest, HttpRequestError, HttpResponse};
use localtiles::interceptor::{HttpServiceInterceptor, LocalHttpService};
use localtiles::logging::init_tracing;
use localtiles::resolver::{ResolutionStrategy, TileLookup, TileResolver};
use localtiles_tile_utils::{TileCoord, TileKind};
use tokio::io::AsyncWriteExt;
use tracing::{Level, error, info, warn};

const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, PartialEq, Debug)]
#[command(
    version,
    name = "localtiles",
    about = "Serve https://local tile and file requests from a directory of MBTiles archives",
    after_help = "Use RUST_LOG to control the logging level, e.g. RUST_LOG=debug, and LOCALTILES_FORMAT to pick the log format (json, full, compact, bare or pretty).",
    styles = HELP_STYLES
)]
struct Args {
    /// Path to a configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Storage directory with the archives and local files. Overrides the configuration file.
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, PartialEq, Debug)]
enum Commands {
    /// List the archives found in the storage directory
    #[command(name = "catalog", alias = "list")]
    Catalog,
    /// Run a URL through the interceptor and print the body it would be answered with
    #[command(name = "get")]
    Get {
        /// URL to request, e.g. https://local/tiles/world/3/2/1.pbf
        url: String,
        /// Write the body to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Look up a single tile by its XYZ coordinates
    #[command(name = "tile")]
    Tile {
        /// Archive name, without the extension
        name: String,
        z: u8,
        x: u32,
        y: u32,
        /// Tile kind, `vector` or `raster`
        #[arg(long, default_value = "vector")]
        kind: TileKind,
        /// Overrides the configured resolution strategy
        #[arg(long, value_enum)]
        strategy: Option<ResolutionStrategy>,
        /// Write the tile to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

async fn start(args: Args) -> LocalTilesResult<()> {
    let mut config = if let Some(ref cfg_filename) = args.config {
        info!("Using {}", cfg_filename.display());
        read_config(cfg_filename, &subst::Env)?
    } else {
        Config::default()
    };
    if let Some(dir) = args.dir {
        config.storage.dir = Some(dir);
    }
    config.finalize()?;

    match args.command {
        Commands::Catalog => {
            let catalog = build_catalog(&config).await?;
            if catalog.is_empty() {
                println!("No archives in {}", catalog.storage_dir().display());
            }
            for archive in catalog.archives() {
                let tj = archive.pool().get_metadata().await.ok().map(|m| m.tilejson);
                let title = tj.as_ref().and_then(|tj| tj.name.as_deref()).unwrap_or("");
                println!(
                    "{:<8}{:<24}{:<8}{title}",
                    archive.kind().to_string(),
                    archive.name(),
                    archive.format()
                );
            }
        }
        Commands::Get { url, output } => {
            let service = LocalHttpService::from_config(&config)?;
            let request = service.on_request(HttpRequest::new(url.clone()));
            let response = HttpResponse::new(
                request,
                Err(HttpRequestError::new("not sent, only local responses are printed")),
            );
            match service.on_response(response).await.outcome {
                Ok(body) => write_output(output.as_deref(), &body.data).await?,
                Err(_) => return Err(NotServedLocally(url)),
            }
        }
        Commands::Tile {
            name,
            z,
            x,
            y,
            kind,
            strategy,
            output,
        } => {
            let catalog = build_catalog(&config).await?;
            let strategy = strategy.unwrap_or(config.interceptor.strategy);
            let coord = TileCoord::new(z, x, y);
            let resolver = TileResolver::new(Arc::new(catalog), strategy);
            match resolver.lookup(kind, &name, coord).await {
                TileLookup::Found { archive, data } => {
                    info!("Found {kind} tile {coord:#} in {archive}");
                    write_output(output.as_deref(), &data).await?;
                }
                TileLookup::Miss { failures } => {
                    for (archive, e) in failures {
                        warn!("Archive {archive} failed: {e}");
                    }
                    return Err(TileNotFound(kind, coord));
                }
            }
        }
    }
    Ok(())
}

async fn build_catalog(config: &Config) -> LocalTilesResult<ArchiveCatalog> {
    let app_id = config.storage.app_id.clone().unwrap_or_default();
    let storage_dir = config
        .storage
        .locator()?
        .storage_dir(&app_id)
        .map_err(|e| StorageLocatorError(e, app_id))?;
    ArchiveCatalog::build(&storage_dir, &config.interceptor.archive_extension).await
}

async fn write_output(output: Option<&Path>, data: &[u8]) -> LocalTilesResult<()> {
    if let Some(path) = output {
        tokio::fs::write(path, data).await?;
        info!("Wrote {} bytes to {}", data.len(), path.display());
    } else {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(data).await?;
        stdout.flush().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing(
        env::var("RUST_LOG").ok().as_deref(),
        env::var("LOCALTILES_FORMAT").ok().as_deref(),
    );

    let args = Args::parse();
    if let Err(e) = start(args).await {
        // Ensure the message is printed, even if the logging is disabled
        if tracing::enabled!(Level::ERROR) {
            error!("{e}");
        } else {
            eprintln!("{e}");
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile() {
        let args = Args::parse_from([
            "localtiles", "--dir", "/tmp/files", "tile", "world", "3", "2", "1", "--strategy",
            "by-name",
        ]);
        assert_eq!(args.dir, Some(PathBuf::from("/tmp/files")));
        assert_eq!(
            args.command,
            Commands::Tile {
                name: "world".to_string(),
                z: 3,
                x: 2,
                y: 1,
                kind: TileKind::Vector,
                strategy: Some(ResolutionStrategy::ByName),
                output: None,
            }
        );
    }

    #[test]
    fn test_parse_get() {
        let args = Args::parse_from(["localtiles", "get", "https://local/style.json", "-o", "s.json"]);
        assert_eq!(args.config, None);
        assert_eq!(
            args.command,
            Commands::Get {
                url: "https://local/style.json".to_string(),
                output: Some(PathBuf::from("s.json")),
            }
        );
    }

    #[test]
    fn test_invalid_kind() {
        assert!(
            Args::try_parse_from(["localtiles", "tile", "w", "0", "0", "0", "--kind", "svg"])
                .is_err()
        );
    }
}
