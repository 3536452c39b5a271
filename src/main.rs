use anyhow::Result;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use events_writer::alert::{AlertSink, HttpAlertSink, NoopAlertSink};
use events_writer::config::{Config, DEFAULT_CONFIG_PATH};
use events_writer::db::{EventSink, PgSink};
use events_writer::ingest::next_block;
use events_writer::{EventClassifier, PersistenceEngine};

async fn connect_sinks(config: &Config) -> Result<Vec<Box<dyn EventSink>>> {
    let schema = config.schema_sql()?;
    let mut sinks: Vec<Box<dyn EventSink>> = Vec::with_capacity(config.database.conn_strings.len());

    for dsn in &config.database.conn_strings {
        let sink = PgSink::connect(dsn, schema.as_deref(), &config.service.blockchain).await?;
        sink.test_connection().await?;
        info!("Connected sink {}", sink.name());
        sinks.push(Box::new(sink));
    }

    Ok(sinks)
}

fn build_alert_sink(config: &Config) -> Result<Box<dyn AlertSink>> {
    match &config.alert.url {
        Some(url) => {
            info!("Reporting failures to alert endpoint");
            Ok(Box::new(HttpAlertSink::new(url, config.alert.token.clone(), config.alert.timeout())?))
        }
        None => {
            warn!("Alert endpoint not configured - failures will only be logged");
            Ok(Box::new(NoopAlertSink))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("EVENTS_WRITER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_from(&config_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    info!("Configuration loaded from {}", config_path);
    info!(
        "Watching {} contracts, writing to {} sinks, failure policy: {:?}",
        config.contracts.hashes.len(),
        config.database.conn_strings.len(),
        config.service.failure_policy
    );

    let engine = PersistenceEngine::new(
        EventClassifier::new(&config.contracts.hashes),
        connect_sinks(&config).await?,
        build_alert_sink(&config)?,
        config.service.failure_policy,
    );

    let input = std::env::args().nth(1).unwrap_or_else(|| "-".to_string());
    let reader: Box<dyn AsyncBufRead + Unpin> = if input == "-" {
        info!("Reading blocks from stdin");
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        info!("Reading blocks from {}", input);
        Box::new(BufReader::new(tokio::fs::File::open(&input).await?))
    };

    let result = run(&engine, reader).await;

    // Dropping the engine closes the sink connections
    drop(engine);
    result
}

async fn run(engine: &PersistenceEngine, mut reader: Box<dyn AsyncBufRead + Unpin>) -> Result<()> {
    let mut blocks = 0u64;
    while let Some(block) = next_block(&mut reader).await? {
        let executions = block.execution_results()?;
        match engine.on_block_persisted(block.block_number, block.timestamp, &executions).await {
            Ok(report) => {
                blocks += 1;
                if report.failures > 0 {
                    warn!("Block {} finished with {} isolated failures", report.block_number, report.failures);
                }
            }
            Err(e) => {
                error!("Aborting at block {}: {}", block.block_number, e);
                return Err(e.into());
            }
        }
    }

    info!("Processed {} blocks", blocks);
    Ok(())
}
