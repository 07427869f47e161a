//! # Grader - Behavioral scoring engine
//!
//! This is the main entry point that wires everything together.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  main.rs (this file) - Dependency Injection & Wiring            │
//! │    │                                                            │
//! │    ├── Loads: EngineConfig + scenario directory (adapter)       │
//! │    ├── Creates: in-memory stores, seeded from the scenario      │
//! │    ├── Creates: classifier chain (service + heuristic)          │
//! │    ├── Creates: GradingEngine (use case)                        │
//! │    └── Runs: broadcast tick, classification tick, change feed   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Engine events are written to stdout as JSON lines, logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use grader_adapter::{
    consume, BroadcastPublisher, InMemoryAgentRepository, InMemoryObjectiveRepository,
    InMemoryStatsRepository, OpenAiClassificationService, ScenarioLoader, SystemClock,
};
use grader_usecase::{default_chain, ClassificationService, EngineError, GradingEngine, Stores};
use shared::EngineConfig;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grader")]
#[command(about = "Scores player actions against level rules and broadcasts health")]
#[command(version)]
struct Cli {
    /// Engine configuration (.json, .yaml or .yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory with level_order.json and the level folders
    #[arg(short, long)]
    scenario_dir: Option<PathBuf>,

    /// NDJSON change feed, `-` for stdin
    #[arg(short, long)]
    feed: Option<String>,

    /// Level to start at
    #[arg(short, long)]
    level: Option<u32>,
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.scenario_dir {
        config.scenario_dir = dir.clone();
    }
    if let Some(level) = cli.level {
        config.start_level = level;
    }
    config.validate()?;
    Ok(config)
}

async fn open_feed(source: &str) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if source == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("opening feed {}", source))?;
    Ok(Box::new(BufReader::new(file)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // ========================================
    // Scenario and stores
    // ========================================

    let scenario = ScenarioLoader::new(&config.scenario_dir)
        .load()
        .with_context(|| format!("loading scenario {}", config.scenario_dir.display()))?;

    let mut agents = InMemoryAgentRepository::new();
    let mut objectives = InMemoryObjectiveRepository::new();
    scenario
        .seed(&mut agents, &mut objectives)
        .map_err(EngineError::from)?;

    // ========================================
    // Classification
    // ========================================

    let service: Option<Arc<dyn ClassificationService>> =
        match OpenAiClassificationService::from_env(&config.classifier) {
            Ok(service) => {
                info!(model = %config.classifier.model, "Classification service configured");
                Some(Arc::new(service))
            }
            Err(err) => {
                warn!(error = %err, "Running with the heuristic classifier only");
                None
            }
        };
    let chain = default_chain(&config.classifier, service)?;

    // ========================================
    // Engine
    // ========================================

    let publisher = Arc::new(BroadcastPublisher::default());
    let mut events = publisher.subscribe();

    let engine = Arc::new(GradingEngine::new(
        &config,
        Stores {
            agents,
            objectives,
            stats: InMemoryStatsRepository::new(),
        },
        scenario.rules,
        chain,
        Arc::new(SystemClock),
        publisher,
    )?);

    let output = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(err) => warn!(event = event.name(), error = %err, "Unserializable event"),
                },
                Err(RecvError::Lagged(missed)) => warn!(missed, "Event output fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let (broadcast, classification) = engine.spawn_ticks();

    let feed = match cli.feed.as_deref() {
        Some(source) => {
            let reader = open_feed(source).await?;
            let engine = Arc::clone(&engine);
            Some(tokio::spawn(async move {
                if let Err(err) = consume(reader, engine.as_ref()).await {
                    warn!(error = %err, "Change feed stopped");
                }
            }))
        }
        None => {
            info!("No change feed given, broadcasting scores only");
            None
        }
    };

    info!(
        level = config.start_level,
        scenario = %config.scenario_dir.display(),
        "Grader running, Ctrl-C to stop"
    );
    tokio::signal::ctrl_c().await?;

    info!(pending = engine.pending(), "Shutting down");
    if let Some(feed) = feed {
        feed.abort();
    }
    broadcast.abort();
    classification.abort();
    output.abort();
    Ok(())
}
