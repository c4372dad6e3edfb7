//! `hrsync`: reconcile the SD personnel feed into the directory.
//!
//! # Usage
//!
//! ```
//! hrsync --config hrsync.toml init
//! hrsync sync --from 2020-03-01 --to 2020-03-02 --json
//! hrsync primary --national-id 0101801234
//! ```
//!
//! Settings come from the config file (default `hrsync.toml`, optional) and
//! `HRSYNC_*` environment variables; nested engine settings use `__`, e.g.
//! `HRSYNC_SYNC__LEAVE_TYPE=Barsel`.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hrsync_engine::{Catalog, Engine, RunSummary, SyncConfig};
use hrsync_feed_xml::XmlFeed;
use hrsync_store_sqlite::SqliteDirectory;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Personnel feed to directory integration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "hrsync.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the configured classes the directory is missing.
  Init,
  /// Apply one window of feed changes.
  Sync {
    #[arg(long, value_name = "DATE")]
    from: NaiveDate,
    #[arg(long, value_name = "DATE")]
    to:   NaiveDate,
    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,
  },
  /// Recompute the primary engagement of one person.
  Primary {
    #[arg(long)]
    national_id: String,
    #[arg(long)]
    json:        bool,
  },
}

// ─── Config file ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Settings {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
  #[serde(default = "default_feed_dir")]
  feed_dir:   PathBuf,
  #[serde(default)]
  sync:       SyncConfig,
}

fn default_store_path() -> PathBuf { PathBuf::from("hrsync.db") }

fn default_feed_dir() -> PathBuf { PathBuf::from("feed") }

fn load_settings(path: &Path) -> anyhow::Result<Settings> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("HRSYNC")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise settings")
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = load_settings(&cli.config)?;

  let directory = SqliteDirectory::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open directory at {:?}", settings.store_path))?;

  match cli.command {
    Command::Init => {
      let created = Catalog::seed(&directory, &settings.sync)
        .await
        .context("failed to seed classes")?;
      println!("created {created} classes");
    }
    Command::Sync { from, to, json } => {
      if to < from {
        bail!("--to {to} is before --from {from}");
      }
      let engine = Engine::new(XmlFeed::new(&settings.feed_dir), directory, settings.sync);
      let summary = engine
        .sync_window(from, to)
        .await
        .with_context(|| format!("sync of {from}..{to} aborted"))?;
      report(&summary, json)?;
    }
    Command::Primary { national_id, json } => {
      let engine = Engine::new(XmlFeed::new(&settings.feed_dir), directory, settings.sync);
      let summary = engine
        .recalculate_primary(&national_id)
        .await
        .with_context(|| format!("primary recalculation for {national_id} aborted"))?;
      report(&summary, json)?;
    }
  }

  Ok(())
}

fn report(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
  if json {
    println!(
      "{}",
      serde_json::to_string_pretty(summary).context("failed to serialise summary")?
    );
  } else {
    println!("{summary}");
  }
  Ok(())
}
