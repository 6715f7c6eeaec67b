use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use newsreel::config::Config;
use newsreel::feed::Fetcher;
use newsreel::ingest::{spawn_ingest_scheduler, Ingestor, PassClock, PassError};
use newsreel::storage::{Database, DatabaseError};
use newsreel::web::{self, AppState, Channel, Presentation};

#[derive(Parser, Debug)]
#[command(
    name = "newsreel",
    about = "Aggregate news feeds into a web page and a searchable RSS feed"
)]
struct Args {
    /// Configuration file (TOML); defaults are used when it does not exist
    #[arg(long, value_name = "FILE", default_value = "newsreel.toml")]
    config: PathBuf,

    /// SQLite database file, overrides `database` from the config
    #[arg(long, value_name = "FILE")]
    database: Option<String>,

    /// Listen address, overrides `listen` from the config
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Run a single ingestion pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from '{}'", args.config.display()))?;
    if let Some(database) = args.database {
        config.database = database;
    }
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    let tz = config.reference_timezone()?;
    let feeds = config.valid_feeds();
    if feeds.is_empty() {
        tracing::warn!("No valid feeds configured, passes will store nothing");
    }

    let db = match Database::open(&config.database).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            anyhow::bail!(
                "Database '{}' is locked by another writer, try again once it is released",
                config.database
            );
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open database '{}'", config.database));
        }
    };

    let fetcher = Fetcher::new(&config.user_agent, config.fetch_timeout())
        .context("Failed to build HTTP client")?;
    let clock = PassClock::new();
    let ingestor = Arc::new(Ingestor::new(db.clone(), fetcher, feeds, tz, clock.clone()));

    // Initial pass before serving, so the first page view has content
    match ingestor.run_pass().await {
        Ok(report) => tracing::debug!(?report, "Initial pass complete"),
        Err(PassError::Busy) => {}
        Err(e) => tracing::error!(error = %e, "Initial pass failed, continuing"),
    }

    if args.once {
        db.close().await;
        return Ok(());
    }

    let scheduler = spawn_ingest_scheduler(ingestor, config.refresh_interval());

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;

    let presentation = Presentation {
        tz,
        page_size: config.page_size,
        feed_size: config.feed_size,
        channel: Channel {
            title: config.channel_title.clone(),
            link: config.channel_link.clone(),
            description: config.channel_description.clone(),
        },
    };
    let state = AppState::new(db.clone(), clock, presentation);

    let served = web::serve(listener, state, shutdown_signal()).await;

    tracing::info!("Shutting down");
    scheduler.shutdown().await;
    db.close().await;

    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        // Without a signal handler, run until killed
        std::future::pending::<()>().await;
    }
}
