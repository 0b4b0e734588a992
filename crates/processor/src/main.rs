//! ROS-OCP report processor
//!
//! Consumes upload events, loads the usage reports they reference and feeds
//! them to the recommendation service.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use processor_lib::{
    health::{components, HealthRegistry},
    observability::{ProcessorMetrics, StructuredLogger},
    ConsumerConfig, ConsumerLoop, CsvReportLoader, EventSource, JsonLinesSource, KruizeClient,
    ReportProcessor,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

use config::ProcessorConfig;

const PROCESSOR_VERSION: &str = env!("CARGO_PKG_VERSION");
const SERVICE_NAME: &str = "rosocp-processor";

#[derive(Parser)]
#[command(name = "rosocp-processor")]
#[command(author, version, long_about = None)]
#[command(about = "Feeds usage reports to the recommendation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Consume upload events from the message broker (default)
    Consume,

    /// Replay events from a newline-delimited JSON file
    Replay {
        /// Events file, or `-` for stdin
        #[arg(long)]
        events: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ProcessorConfig::load()?;

    // JSON logs; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(fmt::layer().json())
        .init();

    info!(kruize_url = %config.kruize_url(), "Processor configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CONSUMER).await;
    health_registry.register(components::REPORT_LOADER).await;
    health_registry
        .register(components::RECOMMENDATION_SERVICE)
        .await;

    let metrics = ProcessorMetrics::new();
    let logger = StructuredLogger::new(SERVICE_NAME);

    let loader = CsvReportLoader::new(config.request_timeout())
        .context("failed to build report loader")?;
    let service = KruizeClient::new(&config.kruize_client())
        .context("failed to build recommendation service client")?;
    let processor = ReportProcessor::new(Arc::new(loader), Arc::new(service), config.pipeline())
        .with_logger(logger.clone())
        .with_health(health_registry.clone());

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let consumer_config = ConsumerConfig {
        auto_commit: config.kafka_auto_commit,
    };

    let stats = match cli.command.unwrap_or(Command::Consume) {
        Command::Consume => {
            let source = subscribe(&config)?;
            logger.log_startup(PROCESSOR_VERSION, &config.upload_topic);
            run(source, processor, consumer_config, &health_registry, &logger, shutdown_rx).await
        }
        Command::Replay { events } => {
            let source = JsonLinesSource::new(open_events(&events).await?);
            logger.log_startup(PROCESSOR_VERSION, &events.display().to_string());
            run(source, processor, consumer_config, &health_registry, &logger, shutdown_rx).await
        }
    };

    info!(
        received = stats.received,
        processed = stats.processed,
        dropped = stats.dropped,
        "Shutting down"
    );
    api_handle.abort();

    Ok(())
}

async fn run<S: EventSource>(
    source: S,
    processor: ReportProcessor,
    consumer_config: ConsumerConfig,
    health_registry: &HealthRegistry,
    logger: &StructuredLogger,
    shutdown: broadcast::Receiver<()>,
) -> processor_lib::ConsumerStats {
    ConsumerLoop::new(source, processor, consumer_config)
        .with_logger(logger.clone())
        .with_health(health_registry.clone())
        .run(shutdown)
        .await
}

async fn open_events(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open events file {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

#[cfg(feature = "kafka")]
fn subscribe(config: &ProcessorConfig) -> Result<processor_lib::source::KafkaSource> {
    processor_lib::source::KafkaSource::subscribe(&config.kafka_source())
        .context("failed to subscribe to upload topic")
}

#[cfg(not(feature = "kafka"))]
fn subscribe(_config: &ProcessorConfig) -> Result<JsonLinesSource<tokio::io::Empty>> {
    anyhow::bail!("built without the `kafka` feature; use `replay --events <file>` instead")
}
