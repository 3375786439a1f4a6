//! Serve the routes of a route file until Ctrl-C.
//!
//! Usage:
//!   rift-mock --config routes.yaml [--host 0.0.0.0] [--port 8080]
//!
//! Unmatched requests and other deferred failures are printed at shutdown
//! and make the process exit with a non-zero status.

use anyhow::Context;
use clap::Parser;
use rift_mock_dsl::{MockWebServer, RoutesFile, RoutingDispatcher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "rift-mock")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Route file (YAML or JSON)
    #[arg(short, long, env = "RIFT_MOCK_CONFIG")]
    config: PathBuf,

    /// Override the listen host of the route file
    #[arg(long, env = "RIFT_MOCK_HOST")]
    host: Option<String>,

    /// Override the listen port of the route file (0 = ephemeral)
    #[arg(short, long, env = "RIFT_MOCK_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut routes = RoutesFile::from_file(&args.config)?;
    if let Some(host) = args.host {
        routes.server.host = host;
    }
    if let Some(port) = args.port {
        routes.server.port = port;
    }

    let dispatcher = Arc::new(RoutingDispatcher::new());
    routes.install(dispatcher.routing())?;

    let server = MockWebServer::start_with(&routes.server, dispatcher)
        .await
        .context("Failed to start mock server")?;
    info!("Serving {} route(s) on {}", routes.route_count(), server.url("/"));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    server.shutdown().await?;
    Ok(())
}
