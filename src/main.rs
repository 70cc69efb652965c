//! Binary entry point for tracing-dedup.
//!
//! Reads lines from stdin and logs each one through a [`DedupLogger`], so
//! repeated lines are withheld and summarized. Summaries of everything still
//! tracked are emitted when input ends.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead};
use std::time::Duration;
use tracing::Level;
use tracing_dedup::domain::config::{
    DEFAULT_CAPACITY, DEFAULT_MEMORY_LIMIT_BYTES, DEFAULT_THRESHOLD, DEFAULT_TIME_TO_LIVE,
};
use tracing_dedup::{DedupConfig, DedupLogger, TracingSink};
use tracing_subscriber::EnvFilter;

/// Withhold repeated lines read from stdin and summarize them on eviction.
#[derive(Debug, Parser)]
#[command(name = "tracing-dedup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Maximum number of distinct lines tracked at once.
    #[arg(long, env = "DEDUP_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Occurrences of a line logged before it is withheld.
    #[arg(long, env = "DEDUP_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    threshold: usize,

    /// Milliseconds a line stays tracked after its first occurrence.
    #[arg(long, env = "DEDUP_TTL_MILLIS", default_value_t = DEFAULT_TIME_TO_LIVE.as_millis() as u64)]
    ttl_millis: u64,

    /// Estimated memory footprint that triggers a sweep.
    #[arg(long, env = "DEDUP_MEMORY_LIMIT_BYTES", default_value_t = DEFAULT_MEMORY_LIMIT_BYTES)]
    memory_limit_bytes: u64,

    /// Level at which every input line is logged.
    #[arg(long, env = "DEDUP_LEVEL", default_value_t = Level::INFO)]
    level: Level,
}

impl Cli {
    fn config(&self) -> DedupConfig {
        DedupConfig::default()
            .with_capacity(self.capacity)
            .with_threshold(self.threshold)
            .with_time_to_live(Duration::from_millis(self.ttl_millis))
            .with_memory_limit_bytes(self.memory_limit_bytes)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let logger = DedupLogger::builder(TracingSink::new())
        .with_config(cli.config())
        .build()
        .context("invalid deduplication settings")?;
    let _guard = logger.flush_on_drop();

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read from stdin")?;
        logger.log(cli.level, None, &line);
    }

    let snapshot = logger.metrics().snapshot();
    tracing::debug!(
        admitted = snapshot.messages_admitted,
        suppressed = snapshot.messages_suppressed,
        "input exhausted"
    );

    Ok(())
}
