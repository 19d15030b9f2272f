//! Watch directories and print their change events until Ctrl-C.
//!
//! Usage: filewatch [--config FILE] [--buffer-size N] [--interval-ms N] [--json] [PATH]...

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use filewatch::{DrainScheduler, FileEvent, FileWatch, WatchConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "filewatch",
    version,
    about = "Print file changes under the given directories"
)]
struct Args {
    /// JSON config file; flags below override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Notification buffer size per watched directory, in bytes.
    #[arg(long, value_name = "N")]
    buffer_size: Option<usize>,

    /// How often queued events are printed, in milliseconds.
    #[arg(long, value_name = "N")]
    interval_ms: Option<u64>,

    /// Print one JSON object per event instead of text.
    #[arg(long)]
    json: bool,

    /// Directories to watch, in addition to those in the config file.
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<WatchConfig> {
        let mut config = match &self.config {
            Some(path) => WatchConfig::from_json_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => WatchConfig::new(),
        };

        if let Some(size) = self.buffer_size {
            config = config.with_buffer_size(size);
        }
        if let Some(ms) = self.interval_ms {
            config = config.with_drain_interval(Duration::from_millis(ms));
        }
        for path in self.paths {
            config = config.with_path(path);
        }

        config.validate()?;
        Ok(config)
    }
}

fn format_event(event: &FileEvent, json: bool) -> Option<String> {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => Some(line),
            Err(e) => {
                warn!("Failed to serialize event: {e}");
                None
            }
        }
    } else {
        Some(format!(
            "{} {:<6} {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.kind,
            event.path.display()
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let json = args.json;
    let config = args.into_config()?;
    if config.paths.is_empty() {
        anyhow::bail!("no directories to watch");
    }
    let interval = config.drain_interval();

    let mut watch = FileWatch::new(config);
    if !watch.init() {
        anyhow::bail!("file watch could not be initialized");
    }
    watch.start()?;
    if !watch.is_running() {
        anyhow::bail!("none of the given directories could be watched");
    }

    let dispatcher = watch
        .dispatcher()
        .context("file watch has no event queue")?;
    let scheduler = DrainScheduler::spawn(dispatcher, interval, move |event: FileEvent| {
        if let Some(line) = format_event(&event, json) {
            println!("{line}");
        }
    });

    info!(
        "Watching {} of {} directories; press Ctrl-C to stop",
        watch.active_workers(),
        watch.watched_paths().len()
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    watch.stop();
    let total = scheduler.stop().await;
    watch.shutdown();
    info!("Printed {total} events");
    Ok(())
}
