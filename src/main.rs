//! Standalone probe server.
//!
//! Loads the observability config, brings up logging, trace context and
//! the probe HTTP surface, marks the process ready and serves until
//! SIGINT/SIGTERM.
//!
//! ```text
//! tech-observability --config service.toml --command api
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use tech_observability::config::{load_config, load_default};
use tech_observability::lifecycle::{wait_for_signal, Tech, TechOptions};

#[derive(Parser)]
#[command(name = "tech-observability")]
#[command(about = "Liveness, readiness and metrics endpoints for a service", long_about = None)]
struct Cli {
    /// Service config file; the `[tech]` table is merged over built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Command name attached to request spans.
    #[arg(long, default_value = "serve")]
    command: String,

    /// Address to bind the probe server to.
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_default()?,
    };

    let options = TechOptions {
        command: cli.command,
        host: cli.host,
        install_globals: true,
    };

    let tech = Tech::start(config, options).await?;

    tracing::info!(
        address = %tech.local_addr(),
        liveness_timeout = ?tech.config().http.liveness_timeout(),
        "tech-observability v{} ready",
        env!("CARGO_PKG_VERSION")
    );
    tech.readiness().mark_ready();

    wait_for_signal().await;
    tech.shutdown().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
