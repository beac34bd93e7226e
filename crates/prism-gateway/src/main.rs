//! Gateway binary entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use prism_gateway::{server, AppState, GatewayConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "prism-gateway",
    about = "HTTP gateway fronting a local LLM runtime and live-data APIs",
    version
)]
struct Args {
    /// Address to bind, overriding PRISM_BIND.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Log filter when RUST_LOG is unset, e.g. "info" or
    /// "prism_gateway=debug".
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = GatewayConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let state = Arc::new(AppState::from_config(config));
    server::serve(state).await?;
    Ok(())
}
