//! ecp-ical server entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ecp_ical_core::{TracingConfig, init_tracing};
use ecp_ical_scrape::HttpFetcher;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ecp_ical_server::cli::Cli;
use ecp_ical_server::config::{ServerConfig, StorageBackend};
use ecp_ical_server::error::ServerResult;
use ecp_ical_server::{FeedService, router};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let tracing = if cli.debug {
        TracingConfig::debug()
    } else {
        match config.log_format() {
            Ok(format) => TracingConfig::server().with_format(format),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ServerResult<ServerConfig> {
    let config = match cli.config {
        Some(ref path) => ServerConfig::load_from(path)?,
        None => ServerConfig::load()?,
    };
    Ok(cli.apply(config))
}

async fn run(config: ServerConfig) -> ServerResult<()> {
    let site = config.to_site_config()?;
    let fetcher = HttpFetcher::new(&site)?;
    let store = config.open_store();
    match config.storage.backend {
        StorageBackend::File => info!(data_dir = %config.data_dir().display(), "Using file store"),
        StorageBackend::Memory => warn!("Using in-memory store; cache is lost on exit"),
    }

    let service = FeedService::new(site, config.feed_settings()?, store, Arc::new(fetcher));
    let app = router(Arc::new(service)).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.bind).await?;
    info!(addr = %listener.local_addr()?, "Serving feed on /cal");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
