//! `samar` — terminal client for Samar messaging.
//!
//! # Usage
//!
//! ```text
//! samar --config samar.toml
//! SAMAR_STORE_PATH=~/chat.db samar
//! ```
//!
//! Type `/help` once running.

mod config;
mod repl;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use samar_session::Client;
use samar_store_sqlite::SqliteStore;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{config::AppConfig, repl::Repl};

#[derive(Parser)]
#[command(name = "samar", author, version, about = "Terminal client for Samar messaging")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "samar.toml")]
  config: PathBuf,

  /// Override the store path from the config file.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut app_config = AppConfig::load(&cli.config)?;
  if let Some(store) = cli.store {
    app_config.store_path = store;
  }

  let store = SqliteStore::open(&app_config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", app_config.store_path))?;
  let store = Arc::new(store);

  let mut client = Client::new(store.clone(), store.clone(), store, app_config.session.clone());
  if let Some(me) = client.resume().await.context("failed to resume session")? {
    println!("* welcome back, {}", me.display_name);
  } else {
    println!("* not signed in; /signin or /signup (see /help)");
  }

  let mut repl = Repl::default();
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut heartbeat =
    tokio::time::interval(Duration::from_secs(app_config.heartbeat_secs.max(1)));
  heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
  let mut pumping = true;

  loop {
    tokio::select! {
      line = lines.next_line() => {
        let Some(line) = line.context("failed to read stdin")? else {
          break;
        };
        if !repl.handle(&mut client, &line).await? {
          break;
        }
      }
      event = client.pump(), if pumping => match event {
        Ok(Some(event)) => repl.render(&client, &event),
        Ok(None) => pumping = false,
        Err(e) => tracing::warn!(error = %e, "failed to apply identity change"),
      },
      _ = heartbeat.tick() => {
        if let Some(session) = client.session() {
          session.heartbeat().await;
        }
      }
    }
  }

  if let Some(session) = client.session_mut() {
    session.release_all();
  }
  Ok(())
}
