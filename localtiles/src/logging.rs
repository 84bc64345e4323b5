//! Logging initialization using `tracing` and `tracing-subscriber`.
//!
//! - [`EnvFilter`]: log level filtering, from `RUST_LOG`
//! - [`LogFormat`]: output format (json, full, compact, bare, pretty), from `LOCALTILES_FORMAT`

use std::io;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Log output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, single-line logs
    Full,
    /// A variant of the full format, optimized for short line lengths (default)
    Compact,
    /// Compact, without timestamps, targets or ANSI colors
    Bare,
    /// Multi-line logs for local debugging
    Pretty,
    /// Newline-delimited JSON
    Json,
}

impl LogFormat {
    /// Install the global subscriber for this format.
    ///
    /// Does nothing if a global subscriber is already set.
    pub fn init(self, env_filter: EnvFilter) {
        let builder = tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_span_events(FmtSpan::NONE)
            .with_env_filter(env_filter);
        let result = match self {
            Self::Full => builder.try_init(),
            Self::Compact => builder.compact().try_init(),
            Self::Pretty => builder.pretty().try_init(),
            Self::Bare => builder
                .compact()
                .without_time()
                .with_target(false)
                .with_ansi(false)
                .try_init(),
            Self::Json => builder.json().try_init(),
        };
        if let Err(e) = result {
            eprintln!("Warning: logging was already initialized: {e}");
        }
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" | "verbose" => Ok(Self::Pretty),
            "bare" => Ok(Self::Bare),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid log format '{s}'. Valid options: json, full, compact, bare or pretty"
            )),
        }
    }
}

/// The filter to use when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "localtiles=info,localtiles_mbtiles=info";

/// Initialize the global tracing subscriber for the given filter and format.
///
/// An invalid filter falls back to `debug`, an invalid or missing format to [`LogFormat::default`].
pub fn init_tracing(filter: Option<&str>, format: Option<&str>) {
    let filter = filter.unwrap_or(DEFAULT_FILTER);
    let env_filter = EnvFilter::from_str(filter).unwrap_or_else(|_| {
        eprintln!("Warning: Invalid filter string '{filter}' passed. Since you passed a filter, you likely want to debug us, so we set the filter to debug");
        EnvFilter::new("debug")
    });

    let log_format = format
        .and_then(|s| {
            s.parse::<LogFormat>()
                .map_err(|e| {
                    eprintln!("Warning: {e}");
                    eprintln!(
                        "Falling back to default format ({:?})",
                        LogFormat::default()
                    );
                })
                .ok()
        })
        .unwrap_or_default();

    log_format.init(env_filter);
}
