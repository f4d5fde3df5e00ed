//! Virtual-host reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request       ┌──────────────────────────────────────────────────┐
//!     ─────────────────────┼─▶ net::listener ─▶ http::server ─▶ pre-filter    │
//!                          │                                     │            │
//!                          │                                     ▼            │
//!                          │              routing::router (Host → vhost)      │
//!                          │                                     │            │
//!                          │                                     ▼            │
//!                          │        routing::rewrite ──(absolute)──▶ 301      │
//!                          │                                     │            │
//!                          │                                     ▼            │
//!                          │        routing::hooks ──(claimed)──▶ hook reply  │
//!                          │                                     │            │
//!     Client Response      │                                     ▼            │
//!     ◀────────────────────┼── post-filter ◀── http::forward ◀──────▶ Backend │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::task::JoinSet;

use vhost_proxy::config::load_config;
use vhost_proxy::lifecycle::{wait_for_signal, Shutdown};
use vhost_proxy::net::bind_all;
use vhost_proxy::observability::logging;
use vhost_proxy::{HttpServer, RouteTable};

#[derive(Parser, Debug)]
#[command(name = "vhost-proxy", version, about = "Virtual-host HTTP reverse proxy")]
struct Cli {
    /// Route configuration file
    #[arg(short, long, default_value = "./rewrites.toml")]
    config: PathBuf,

    /// Listen port, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,

    /// Log at debug level
    #[arg(short, long)]
    debug: bool,

    /// Print the compiled route table and exit
    #[arg(long)]
    dump: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init(&config.observability.log_level, cli.debug);

    if cli.dump {
        let routes = RouteTable::compile(&config.vhosts, config.default_vhost.as_deref())?;
        print!("{}", routes);
        return Ok(());
    }

    tracing::info!(
        config = %cli.config.display(),
        port = config.listener.port,
        vhosts = config.vhosts.len(),
        "vhost-proxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let server = HttpServer::new(&config)?;
    let listeners = bind_all(&config.listener).await?;

    let shutdown = Shutdown::new();
    let mut tasks = JoinSet::new();
    for listener in listeners {
        tasks.spawn(server.clone().run(listener, shutdown.subscribe()));
    }

    tokio::select! {
        _ = wait_for_signal() => shutdown.trigger(),
        Some(result) = tasks.join_next() => {
            // A listener stopped on its own; take the others down with it.
            shutdown.trigger();
            match result {
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
                Err(e) => tracing::error!(error = %e, "HTTP server task aborted"),
                Ok(Ok(())) => {}
            }
        }
    }

    while let Some(result) = tasks.join_next().await {
        if let Ok(Err(e)) = result {
            tracing::error!(error = %e, "HTTP server failed");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
