//! sica-server binary.
//!
//! Reads `sica.toml` (or the path given with `--config`) layered under
//! `SICA_*` environment variables, opens the SQLite store, and serves the
//! JSON API. Provisioning subcommands share the same configuration.
//!
//! ```
//! sica-server                                   # serve
//! sica-server add-user --username gate1 --name "Gate 1" --role kiosk
//! sica-server import-students enrollment.json
//! sica-server hash-pin
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sica_core::{
  pin::hash_pin,
  role::Role,
  session::{User, provision_user},
  student::{Student, import_students},
};
use sica_server::{AppState, ServerConfig};
use sica_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "SICA campus access server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "sica.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a PIN entered on stdin and exit.
  HashPin,
  /// Create or replace a staff account. The PIN is read from stdin.
  AddUser {
    #[arg(long)]
    username: String,
    #[arg(long)]
    name:     String,
    /// kiosk, director, prefecto, general or admin.
    #[arg(long)]
    role:     String,
  },
  /// Upsert students from a JSON array of `{key, name, group, status}`.
  ImportStudents { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if let Some(Command::HashPin) = cli.command {
    let pin = read_pin()?;
    println!("{}", hash_pin(&pin)?);
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SICA").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    None | Some(Command::Serve) => serve(store, server_cfg).await,
    Some(Command::AddUser { username, name, role }) => {
      let role = Role::parse(&role);
      let pin = read_pin()?;
      let user = User { username, display_name: name, role };
      let user = provision_user(&store, user, &pin, server_cfg.io_timeout())
        .await
        .context("failed to add user")?;
      println!("{} ({})", user.username, user.role.label());
      Ok(())
    }
    Some(Command::ImportStudents { file }) => {
      let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {file:?}"))?;
      let students: Vec<Student> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {file:?}"))?;
      let written = import_students(&store, students, server_cfg.io_timeout())
        .await
        .context("import stopped")?;
      println!("imported {written} students");
      Ok(())
    }
    Some(Command::HashPin) => Ok(()),
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(Arc::new(store), server_cfg).context("invalid configuration")?;

  // Idle sessions would otherwise only be dropped when next presented.
  let sessions = state.sessions.clone();
  tokio::spawn(async move {
    let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
    loop {
      tick.tick().await;
      let dropped = sessions.purge_expired(chrono::Utc::now()).await;
      if dropped > 0 {
        tracing::debug!(dropped, "purged idle sessions");
      }
    }
  });

  let app = sica_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a PIN from stdin.
fn read_pin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("PIN: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
