use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use studio_telemetry::{Telemetry, TelemetryConfig};
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Serves the telemetry exports over HTTP.
#[derive(Debug, Parser)]
#[command(name = "studio-telemetry-server", version)]
struct Args {
    /// TOML file with telemetry settings; defaults apply when omitted.
    #[arg(long, env = "STUDIO_TELEMETRY_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "STUDIO_TELEMETRY_LISTEN", default_value = "127.0.0.1:9464")]
    listen: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;

    let config = match &args.config {
        Some(path) => TelemetryConfig::load(path)?,
        None => TelemetryConfig::default(),
    };
    let telemetry = Arc::new(Telemetry::new(config)?);

    let app = studio_telemetry::http::router(telemetry);
    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    tracing::info!(listen = %args.listen, "studio-telemetry-server listening");
    studio_telemetry::http::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(json_logs: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = if json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
