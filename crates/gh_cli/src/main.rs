use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gh_core::{RawArticle, StoryStorage};
use gh_dedup::{DedupConfig, Deduplicator};
use gh_feeds::{default_sources, init_logging, load_sources, FeedSource, IngestionManager, RssFeedReader};
use gh_inference::{create_enricher, InferenceConfig, ModelKind};
use gh_storage::{create_storage, StorageConfig, StorageKind};
use gh_web::AppState;
use serde_json::json;
use tracing::{error, info};

mod duration;

use duration::HumanDuration;

#[derive(Parser, Debug)]
#[command(name = "glasshouse", author, version, about = "RSS ingestion with cross-source story deduplication", long_about = None)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = StorageKind::Memory, global = true)]
    storage: StorageKind,
    /// SQLite file used by `--storage sqlite`
    #[arg(long, default_value = "glasshouse.db", global = true)]
    database: PathBuf,
    /// JSON file with feed sources; the built-in list is used otherwise
    #[arg(long, global = true)]
    feeds: Option<PathBuf>,
    #[arg(long, default_value_t = ModelKind::Heuristic, global = true, help = "Enrichment model: heuristic (default) or gemini")]
    model: ModelKind,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    #[arg(long, default_value_t = gh_dedup::config::DEFAULT_SIMILARITY_THRESHOLD, global = true)]
    similarity_threshold: f64,
    #[arg(long, default_value_t = gh_dedup::config::DEFAULT_TIME_WINDOW_HOURS, global = true)]
    time_window_hours: i64,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Group a JSON array of articles and print the story groups
    Dedup {
        #[arg(long)]
        input: PathBuf,
    },
    /// Fetch every feed, group the items and store them
    Fetch {
        /// Run in periodic mode with the specified interval (e.g. 2h, 30m, 1h15m)
        #[arg(long)]
        interval: Option<HumanDuration>,
        /// Enrich pending stories after each fetch
        #[arg(long)]
        enrich: bool,
    },
    /// Enrich stories that have not been processed yet
    Process {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete stories older than the retention period
    Cleanup {
        #[arg(long, default_value_t = 30)]
        retention_days: i64,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
        /// Also fetch and enrich in the background at this interval
        #[arg(long)]
        fetch_interval: Option<HumanDuration>,
    },
    /// List the configured feed sources
    Feeds,
}

impl Cli {
    fn dedup(&self) -> Deduplicator {
        Deduplicator::new(
            DedupConfig::default()
                .with_similarity_threshold(self.similarity_threshold)
                .with_time_window_hours(self.time_window_hours),
        )
    }

    fn sources(&self) -> anyhow::Result<Vec<FeedSource>> {
        match &self.feeds {
            Some(path) => load_sources(path).with_context(|| format!("loading feeds from {}", path.display())),
            None => Ok(default_sources()),
        }
    }

    fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model: self.model,
            api_key: self.api_key.clone(),
            ..InferenceConfig::default()
        }
    }

    fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            kind: self.storage,
            database_path: self.database.clone(),
        }
    }
}

/// Probes the backend, retrying a few times while it comes up.
async fn check_storage(storage: &Arc<dyn StoryStorage>, max_retries: u32, timeout: Duration) -> anyhow::Result<()> {
    let mut last_error = None;
    for attempt in 1..=max_retries {
        match tokio::time::timeout(timeout, storage.get_unprocessed(1)).await {
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(e)) => last_error = Some(anyhow::Error::new(e)),
            Err(elapsed) => last_error = Some(anyhow::anyhow!("storage health check timed out: {}", elapsed)),
        }
        if attempt < max_retries {
            info!("Storage health check failed, retrying {}/{}...", attempt, max_retries);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("storage health check failed")))
}

async fn build_manager(cli: &Cli) -> anyhow::Result<IngestionManager> {
    let storage = create_storage(&cli.storage_config()).await?;
    check_storage(&storage, 3, Duration::from_secs(10)).await?;
    info!("🏦 Storage initialized successfully (using {:?})", cli.storage);

    let enricher = create_enricher(&cli.inference_config())?;
    info!("🧠 Enrichment model initialized successfully (using {})", enricher.name());

    let sources = cli.sources()?;
    info!("📚 {} feed sources configured", sources.len());
    let reader = RssFeedReader::new(
        sources,
        gh_feeds::CircuitBreaker::new(Arc::new(gh_feeds::MemoryCircuitStore::new())),
        gh_feeds::IngestConfig::default(),
    )?;

    Ok(IngestionManager::new(Arc::new(reader), storage, enricher, cli.dedup()))
}

async fn run_cycle(manager: &IngestionManager, enrich: bool) -> gh_core::Result<()> {
    manager.run_ingestion().await?;
    if enrich {
        manager.run_enrichment(None).await?;
    }
    Ok(())
}

async fn run_periodically(manager: &IngestionManager, interval: HumanDuration, enrich: bool) {
    info!("⏰ Running in periodic mode every {}", interval);
    loop {
        info!("Starting fetch cycle");
        if let Err(e) = run_cycle(manager, enrich).await {
            error!("Error during fetch cycle: {}", e);
        }
        info!("Waiting {} before next fetch", interval);
        tokio::time::sleep(interval.0).await;
    }
}

fn dedup_file(cli: &Cli, input: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let articles: Vec<RawArticle> =
        serde_json::from_str(&raw).with_context(|| format!("parsing articles from {}", input.display()))?;
    for article in &articles {
        article.validate()?;
    }

    let (groups, report) = cli.dedup().run(&articles);
    println!("{}", serde_json::to_string_pretty(&json!({ "groups": groups, "report": report }))?);
    Ok(())
}

fn print_feeds(sources: &[FeedSource]) {
    for source in sources {
        println!(
            "{:<28} {:<14} {:<7} {}",
            source.name,
            source.category.as_str(),
            format!("{:?}", source.priority).to_lowercase(),
            source.url
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Dedup { input } => dedup_file(&cli, input)?,
        Commands::Feeds => print_feeds(&cli.sources()?),
        Commands::Fetch { interval, enrich } => {
            let manager = build_manager(&cli).await?;
            match interval {
                Some(interval) => run_periodically(&manager, *interval, *enrich).await,
                None => {
                    let report = manager.run_ingestion().await?;
                    info!("✨ Stored {} stories from {} articles", report.saved, report.fetched);
                    if *enrich {
                        manager.run_enrichment(None).await?;
                    }
                }
            }
        }
        Commands::Process { limit } => {
            let manager = build_manager(&cli).await?;
            let report = manager.run_enrichment(*limit).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Cleanup { retention_days } => {
            let manager = build_manager(&cli).await?;
            let removed = manager.cleanup(*retention_days).await?;
            println!("Removed {} stories", removed);
        }
        Commands::Serve { addr, fetch_interval } => {
            let manager = Arc::new(build_manager(&cli).await?);
            let state = AppState::new(manager.storage(), cli.dedup());

            if let Some(interval) = *fetch_interval {
                let background = manager.clone();
                tokio::spawn(async move {
                    run_periodically(&background, interval, true).await;
                });
            }
            gh_web::serve(*addr, state).await?;
        }
    }

    Ok(())
}
