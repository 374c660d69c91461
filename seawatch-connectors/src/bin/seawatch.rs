//! SeaWatch fusion service
//!
//! Reads sensor observations as JSON lines (one `SensorObservation` per line)
//! from a file or stdin, fuses them, and publishes heartbeats and alerts over
//! MQTT or to stdout.
//!
//! ```text
//! seawatch --config seawatch.toml --input reports.jsonl
//! cat reports.jsonl | seawatch --stdout --replay
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use seawatch_connectors::{
    console::ConsoleConnector, AsyncConnector, FusionService, ServiceConfig, Topics,
};
use seawatch_core::{FixedTime, FusionConfig, FusionOrchestrator, SensorObservation};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::mpsc,
};

#[derive(Parser, Debug)]
#[command(name = "seawatch", about = "Multi-sensor maritime track fusion", version)]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON-lines observation file ("-" for stdin)
    #[arg(long, value_name = "PATH", default_value = "-")]
    input: String,

    /// Publish to stdout instead of MQTT
    #[arg(long)]
    stdout: bool,

    /// Clock the fusion cycle by observation timestamps instead of wall time
    #[arg(long)]
    replay: bool,

    /// Override the MQTT broker host
    #[arg(long)]
    mqtt_host: Option<String>,

    /// Override the MQTT broker port
    #[arg(long)]
    mqtt_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(host) = args.mqtt_host.clone() {
        config.mqtt.host = host;
    }
    if let Some(port) = args.mqtt_port {
        config.mqtt.port = port;
    }
    config.validate().context("Invalid configuration")?;
    info!("SeaWatch {} starting", seawatch_core::VERSION);

    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let reader = spawn_reader(&args.input, tx).await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let topics = config.mqtt.topics.clone();
    if args.stdout {
        serve(&config.fusion, args.replay, ConsoleConnector::stdout(), topics, rx, shutdown).await;
    } else {
        serve_mqtt(&config, args.replay, topics, rx, shutdown).await?;
    }

    reader.abort();
    Ok(())
}

#[cfg(feature = "mqtt")]
async fn serve_mqtt(
    config: &ServiceConfig,
    replay: bool,
    topics: Topics,
    rx: mpsc::Receiver<SensorObservation>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let connector = seawatch_connectors::MqttConnector::connect(&config.mqtt)
        .context("Failed to create MQTT client")?;
    serve(&config.fusion, replay, connector, topics, rx, shutdown).await;
    Ok(())
}

#[cfg(not(feature = "mqtt"))]
async fn serve_mqtt(
    _config: &ServiceConfig,
    _replay: bool,
    _topics: Topics,
    _rx: mpsc::Receiver<SensorObservation>,
    _shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    anyhow::bail!("built without MQTT support; use --stdout")
}

async fn serve<C: AsyncConnector>(
    fusion: &FusionConfig,
    replay: bool,
    connector: C,
    topics: Topics,
    rx: mpsc::Receiver<SensorObservation>,
    shutdown: impl std::future::Future<Output = ()>,
) {
    let report = if replay {
        let orchestrator = FusionOrchestrator::with_clock(fusion.clone(), FixedTime::new(0));
        FusionService::with_orchestrator(orchestrator, connector, topics)
            .run(rx, shutdown)
            .await
    } else {
        FusionService::new(fusion.clone(), connector, topics).run(rx, shutdown).await
    };
    info!(
        "published {} messages, {} failures",
        report.messages_published, report.publish_failures
    );
}

/// Start the JSON-lines reader task
async fn spawn_reader(
    input: &str,
    tx: mpsc::Sender<SensorObservation>,
) -> Result<tokio::task::JoinHandle<()>> {
    if input == "-" {
        let reader = BufReader::new(tokio::io::stdin());
        return Ok(tokio::spawn(read_lines(reader, tx, "stdin".to_string())));
    }

    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input))?;
    Ok(tokio::spawn(read_lines(BufReader::new(file), tx, input.to_string())))
}

async fn read_lines<R: AsyncBufRead + Unpin>(
    reader: R,
    tx: mpsc::Sender<SensorObservation>,
    name: String,
) {
    let mut lines = reader.lines();
    let mut line_no = 0u64;
    let mut accepted = 0u64;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("read error on {}: {}", name, e);
                break;
            }
        };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SensorObservation>(&line) {
            Ok(observation) => {
                if tx.send(observation).await.is_err() {
                    break;
                }
                accepted += 1;
            }
            Err(e) => warn!("{}:{}: skipping malformed observation: {}", name, line_no, e),
        }
    }

    info!("{}: {} observations read", name, accepted);
}
