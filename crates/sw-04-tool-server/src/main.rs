//! seekwire-server: search tools over stdin/stdout.
//!
//! Protocol traffic owns stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use sw_04_tool_server::{serve, DirectoryBackend, ServerConfig, ToolServer};
use sw_telemetry::{init_telemetry, TelemetryConfig};

/// Line-framed JSON-RPC search tool server
#[derive(Parser, Debug)]
#[command(name = "seekwire-server")]
#[command(about = "Serve semantic, regex and hybrid code search over stdio")]
struct Args {
    /// Directory that relative tool paths resolve against
    #[arg(short, long, default_value = ".", env = "SW_ROOT")]
    root: PathBuf,

    /// JSON file with server and session settings
    #[arg(short, long, env = "SW_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `sw_04_tool_server=trace`
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ServerConfig::default(),
    };
    config.root = args.root.clone();
    config.validate().context("invalid server configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::for_component("server");
    if let Some(level) = &args.log_level {
        telemetry.log_level = level.clone();
    }
    telemetry.json_logs |= args.json_logs;
    let _telemetry = init_telemetry(telemetry).context("initializing telemetry")?;

    let mut config = load_config(&args)?;
    config.root = config
        .root
        .canonicalize()
        .with_context(|| format!("root {} is not accessible", config.root.display()))?;
    let root = config.root.clone();
    info!(root = %root.display(), version = %config.server_version, "Starting seekwire server");

    let backend = Arc::new(DirectoryBackend::new(root));
    let server = Arc::new(ToolServer::new(config, backend)?);
    let sweeper = server.sessions().spawn_sweeper();

    serve(server, tokio::io::stdin(), tokio::io::stdout()).await?;

    sweeper.abort();
    info!("Shutdown complete");
    Ok(())
}
