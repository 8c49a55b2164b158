//! CLI for lcodl: download a request's frames from the LCO science archive.

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use lcodl_core::archive::ArchiveClient;
use lcodl_core::config::{self, LcoConfig};
use lcodl_core::options::{OptionArgs, Options};
use lcodl_core::pipeline::{run_request, Transfers};
use std::path::PathBuf;
use std::time::Instant;

use commands::Console;

/// Download the frames of an observing request from the LCO archive.
#[derive(Debug, Parser)]
#[command(name = "lcodl")]
#[command(about = "Download LCO archive frames for a request", long_about = None)]
pub struct Cli {
    /// Request ID (e.g. 1234567).
    #[arg(short = 'r', long = "requestid", value_name = "ID")]
    pub request_id: String,

    /// Directory for downloads (default: current directory).
    #[arg(short = 'd', long)]
    pub directory: Option<PathBuf>,

    /// Filter to download (default: all).
    #[arg(short = 'f', long)]
    pub filter: Option<String>,

    /// Maximum number of frames per filter to download; negative means all.
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub numframes: Option<i64>,

    /// First frame to download in each filter, 1-based (default: 1).
    #[arg(short = 's', long, allow_negative_numbers = true)]
    pub start: Option<i64>,

    /// Download raw data (default is reduced data).
    #[arg(long)]
    pub raw: bool,

    /// Only display the count of frames, no download.
    #[arg(long = "count_only")]
    pub count_only: bool,

    /// Download each filter's frames at once as a zip package.
    #[arg(short = 'z', long)]
    pub zipfile: bool,

    /// Number of simultaneous downloads (default 6, or `streams` in config.toml).
    #[arg(long, value_name = "N")]
    pub streams: Option<usize>,

    /// LCO API access token (overrides `token` in config.toml).
    #[arg(long)]
    pub token: Option<String>,

    /// Write into a per-observation directory with one subdirectory per filter.
    #[arg(long)]
    pub organize: bool,
}

impl Cli {
    pub fn option_args(&self) -> OptionArgs {
        OptionArgs {
            request_id: self.request_id.clone(),
            directory: self.directory.clone(),
            filter: self.filter.clone(),
            numframes: self.numframes,
            start: self.start,
            raw: self.raw,
            count_only: self.count_only,
            zipfile: self.zipfile,
            streams: self.streams,
            token: self.token.clone(),
            organize: self.organize,
        }
    }

    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!(
            archive = %cfg.archive_url,
            portal = %cfg.portal_url,
            streams = cfg.streams,
            "loaded config"
        );
        let opts = Options::resolve(&cli.option_args(), &cfg)?;

        // curl transfers block; keep them off the runtime's worker threads.
        tokio::task::spawn_blocking(move || run(&opts, &cfg))
            .await
            .context("download task failed")?
    }
}

/// Request info, listing, selection, then counts, zips or frames.
fn run(opts: &Options, cfg: &LcoConfig) -> Result<()> {
    let started = Instant::now();
    let client = ArchiveClient::new(cfg, Some(opts.token.clone()))?;
    let mut console = Console::detect();
    let outcome = run_request(&client, opts, &cfg.retry_policy(), &mut console)?;

    if matches!(outcome.transfers, Transfers::Frames(_) | Transfers::Zips(_)) {
        println!(
            "Finished in {:.1} minutes.",
            started.elapsed().as_secs_f64() / 60.0
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests;
