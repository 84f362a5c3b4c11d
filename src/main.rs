use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use spartan_forwarder::config::Config;
use spartan_forwarder::error::Result;
use spartan_forwarder::metrics::Metrics;
use spartan_forwarder::permit::PermitManager;
use spartan_forwarder::router::{NullZoneCache, Router};
use spartan_forwarder::shutdown::GracefulShutdown;
use spartan_forwarder::{http, listener};

/// All tunables are read from `SPARTAN_*` env vars; these flags only cover
/// the two things an operator typically wants at the command line.
#[derive(Debug, Parser)]
#[command(name = "spartan-forwarder", version, about = "Fast-failover DNS forwarder")]
struct Cli {
    /// Override RUST_LOG / the default "info" filter.
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Load configuration and exit without binding any sockets.
    #[arg(long)]
    check_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level.clone()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    if cli.check_config {
        tracing::info!(?config, "configuration is valid");
        return Ok(());
    }

    // `worker_threads == 0` means let Tokio pick (its default, one per core);
    // otherwise the runtime is sized explicitly before anything is spawned on it.
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if config.worker_threads > 0 {
        builder.worker_threads(config.worker_threads);
    }
    let runtime = builder.enable_all().build()?;

    runtime.block_on(run(Arc::new(config)))
}

async fn run(config: Arc<Config>) -> Result<()> {
    tracing::info!(
        udp_bind_addr = %config.udp_bind_addr,
        tcp_bind_addr = %config.tcp_bind_addr,
        max_concurrent_queries = config.max_concurrent_queries,
        "starting spartan-forwarder"
    );

    let router = Arc::new(Router::new((*config).clone(), Box::new(NullZoneCache)));
    let metrics = Arc::new(Metrics::new()?);
    let permits = PermitManager::new(config.max_concurrent_queries);
    let shutdown = Arc::new(GracefulShutdown::new());

    let udp_handle = tokio::spawn(listener::udp::run(
        config.clone(),
        router.clone(),
        metrics.clone(),
        permits.clone(),
        shutdown.subscribe(),
    ));

    let tcp_handle = tokio::spawn(listener::tcp::run(
        config.clone(),
        router.clone(),
        metrics.clone(),
        permits.clone(),
        shutdown.subscribe(),
    ));

    let http_handle = config.http_bind_addr.map(|addr| {
        let server = http::HttpServer::new(metrics.clone(), addr);
        tokio::spawn(server.start(shutdown.subscribe()))
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("received ctrl-c, shutting down");

    shutdown.shutdown();

    match udp_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!(%err, "udp listener exited with an error"),
        Err(err) => tracing::error!(%err, "udp listener task panicked"),
    }
    match tcp_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!(%err, "tcp listener exited with an error"),
        Err(err) => tracing::error!(%err, "tcp listener task panicked"),
    }
    if let Some(handle) = http_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(%err, "http server exited with an error"),
            Err(err) => tracing::error!(%err, "http server task panicked"),
        }
    }

    Ok(())
}
