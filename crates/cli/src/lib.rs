pub mod commands;
pub mod util;

use axmarker_core::config::BACKEND_ENV;
use axmarker_core::{BackendRegistry, MarkerConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::decode::DecodeArgs;
use crate::commands::encode::RecordArgs;
use crate::util::CliResult;

// Backends register themselves through inventory; they only need to be linked.
use axmarker_backend_webcore as _;
#[cfg(feature = "mock-backend")]
use axmarker_backend_mock as _;

/// Inspect and exercise accessibility text marker payloads.
#[derive(Parser, Debug)]
#[command(name = "axmarker", version, about)]
pub struct Cli {
    /// Tracing filter, e.g. `info` or `axmarker_core=trace`.
    #[arg(long = "log-level", env = "AXMARKER_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Backend to use instead of the highest-priority ready one.
    #[arg(long = "backend", env = BACKEND_ENV, global = true)]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the byte layout of the marker payload.
    Layout {
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Decode a raw marker payload.
    Decode(DecodeArgs),
    /// Encode a marker payload from field values.
    Encode(RecordArgs),
    /// List registered backends and their availability. Calls no primitive.
    Status {
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Create a marker on the selected backend and read it back through a range.
    Roundtrip(RecordArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let output = execute(&cli)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Runs a parsed command against the discovered backends and returns its output.
pub fn execute(cli: &Cli) -> CliResult<String> {
    let registry = BackendRegistry::discover();
    let config = effective_config(MarkerConfig::from_env(), cli.backend.as_deref());
    tracing::debug!(?config, command = ?cli.command, "executing");

    match &cli.command {
        Command::Layout { format } => commands::layout::run(*format),
        Command::Decode(args) => commands::decode::run(args),
        Command::Encode(args) => commands::encode::run(args),
        Command::Status { format } => commands::status::run(&registry, &config, *format),
        Command::Roundtrip(args) => {
            let backend = registry.select(&config)?;
            commands::roundtrip::run(backend, args)
        }
    }
}

/// Applies `--backend` on top of `config`. Blank values are ignored the same
/// way the environment lookup ignores them.
fn effective_config(mut config: MarkerConfig, backend: Option<&str>) -> MarkerConfig {
    if let Some(backend) = backend.map(str::trim).filter(|backend| !backend.is_empty()) {
        config.backend = Some(backend.to_owned());
    }
    config
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when running inside tests.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
