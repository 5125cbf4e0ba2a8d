//! `sica-kiosk`: the entry-gate terminal.
//!
//! Logs in as a kiosk operator, then reads one scan per line from stdin
//! (USB barcode and QR scanners type like a keyboard and end with Enter)
//! and shows the verdict for each.
//!
//! # Usage
//!
//! ```
//! sica-kiosk --url http://localhost:8420 --user gate1 --pin 1234
//! sica-kiosk --config ~/.config/sica/kiosk.toml
//! ```
//!
//! Type `:logout` or `:quit` to end the session.

mod client;
mod display;
mod gate;

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use sica_core::role::Capability;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sica-kiosk", about = "Entry-gate terminal for SICA")]
struct Args {
  /// Path to a TOML config file (url, username, pin).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the SICA server (default: http://localhost:8420).
  #[arg(long, env = "SICA_URL")]
  url: Option<String>,

  /// Operator username.
  #[arg(long, env = "SICA_USER")]
  user: Option<String>,

  /// Operator PIN.
  #[arg(long, env = "SICA_PIN")]
  pin: Option<String>,

  /// Per-request timeout in milliseconds.
  #[arg(long, default_value_t = 5000)]
  timeout_ms: u64,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  pin:      String,
}

fn pick(flag: Option<String>, file: &str) -> Option<String> {
  flag.or_else(|| (!file.is_empty()).then(|| file.to_string()))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags and env override the config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: pick(args.url, &file_cfg.url).unwrap_or_else(|| "http://localhost:8420".to_string()),
    username: pick(args.user, &file_cfg.username).context("no username given")?,
    pin:      pick(args.pin, &file_cfg.pin).context("no PIN given")?,
  };

  let mut client = ApiClient::new(api_config, Duration::from_millis(args.timeout_ms))?;
  let session = client.login().await?;
  if !session.capabilities.contains(&Capability::ScanAccess) {
    client.logout().await.ok();
    bail!("{} may not operate the gate", session.user.username);
  }
  tracing::info!(user = %session.user.username, "kiosk ready");
  println!("Ready. Scan a student ID.");

  let result = run_gate(&mut client).await;
  client.logout().await.ok();
  result
}

// ─── Gate loop ────────────────────────────────────────────────────────────────

/// Only losing the scanner input ends the loop early.
async fn run_gate(client: &mut ApiClient) -> Result<()> {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  while let Some(line) = lines.next_line().await.context("reading scanner input")? {
    match line.trim() {
      ":quit" | ":logout" => break,
      _ => {}
    }

    if let Some(screen) = gate::process_line(client, &line).await {
      print!("{screen}");
    }
  }

  Ok(())
}
