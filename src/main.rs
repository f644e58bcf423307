//! statewatch - forwards Kubernetes resource state changes to a notification
//! backend.
//!
//! Events are read as JSON lines from stdin (or `--events FILE`) and handed,
//! in order, to the handler selected by `handler.name`.

use anyhow::{Context, Result};
use clap::Parser;
use statewatch::{
    app::Dispatcher,
    cli::Cli,
    config::Config,
    handlers::{registry, Handler},
    source,
};
use std::sync::Arc;
use tokio::{
    fs::File,
    io::{stdin, AsyncBufRead, BufReader},
    sync::{mpsc, watch},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; `RUST_LOG` takes precedence over the configured level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        init_tracing("info");
        error!("Failed to load configuration: {:#}", err);
        std::process::exit(1);
    });

    init_tracing(&config.log_level);
    info!("statewatch starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Handler: {}", config.handler.name);
    info!("Request Timeout: {}s", config.handler.timeout_seconds);
    info!(
        "Message Title: {}",
        if config.message.title.is_empty() {
            "(handler default)"
        } else {
            config.message.title.as_str()
        }
    );
    match &cli.events {
        Some(path) => info!("Events: {}", path.display()),
        None => info!("Events: stdin"),
    }
    info!("-------------------------------------------------------");

    // A handler that cannot start must stop the process before any event is read.
    let handler: Arc<dyn Handler> = match registry::init_handler(&config.handler.name, &config) {
        Ok(handler) => Arc::from(handler),
        Err(e) => {
            error!("Failed to initialize handler: {}", e);
            std::process::exit(1);
        }
    };

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.events {
        Some(path) => Box::new(BufReader::new(
            File::open(path)
                .await
                .with_context(|| format!("failed to open events file {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(stdin())),
    };

    let (events_tx, events_rx) = mpsc::channel(100);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader_task = tokio::spawn(async move {
        match source::read_events(reader, events_tx).await {
            Ok(count) => info!("Event input exhausted after {} events.", count),
            Err(e) => error!("Failed reading events: {}", e),
        }
    });

    let mut dispatcher_task = tokio::spawn(Dispatcher::new(handler).run(events_rx, shutdown_rx));

    tokio::select! {
        result = &mut dispatcher_task => {
            if let Err(e) = result {
                error!("Dispatcher task panicked: {:?}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Shutting down gracefully...");
            shutdown_tx.send(true).ok();
            if let Err(e) = dispatcher_task.await {
                error!("Dispatcher task panicked: {:?}", e);
            }
        }
    }

    reader_task.abort();
    info!("Exiting.");
    Ok(())
}
