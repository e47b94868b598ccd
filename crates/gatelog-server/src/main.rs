//! gatelog server binary.
//!
//! Reads `gatelog.toml` (or the path given with `--config`) plus `GATELOG_*`
//! environment variables, opens the SQLite store, and serves the JSON API.
//!
//! # Setup helpers
//!
//! ```text
//! gatelog-server hash-password             # argon2 hash for admin_password_hash
//! gatelog-server register-device TABLET-01 # prints the device's API key once
//! gatelog-server deactivate-device TABLET-01
//! ```

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gatelog_api::{
  AppState,
  admin::hash_password,
  device_auth::{generate_api_key, hash_api_key},
};
use gatelog_core::store::EventStore;
use gatelog_server::ServerConfig;
use gatelog_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Gate logbook server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "gatelog.toml", env = "GATELOG_CONFIG")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Register a capture device, or rotate its key, and print the new key.
  RegisterDevice {
    device_id: String,
  },
  /// Stop accepting batches signed with a device's key.
  DeactivateDevice {
    device_id: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if let Some(Command::HashPassword) = cli.command {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;
  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg, store).await,
    Command::HashPassword => Ok(()),
    Command::RegisterDevice { device_id } => {
      let device_id = device_id.trim().to_owned();
      anyhow::ensure!(!device_id.is_empty(), "device id must not be empty");
      let key = generate_api_key();
      store
        .register_device(device_id.clone(), hash_api_key(&key))
        .await
        .context("failed to register device")?;
      tracing::info!(device = %device_id, "device registered");
      println!("{key}");
      Ok(())
    }
    Command::DeactivateDevice { device_id } => {
      let found = store
        .deactivate_device(device_id.clone())
        .await
        .context("failed to deactivate device")?;
      anyhow::ensure!(found, "no device named {device_id}");
      tracing::info!(device = %device_id, "device deactivated");
      Ok(())
    }
  }
}

async fn serve(server_cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let settings = server_cfg.api_settings().context("invalid configuration")?;
  if settings.admin.is_none() {
    tracing::warn!("no admin credentials configured; reporting endpoints are open");
  }
  if !settings.require_device_auth {
    tracing::warn!("device authentication is off; batches are accepted unauthenticated");
  }

  let state = AppState::new(Arc::new(store), settings);
  let app = gatelog_server::app(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .await
    .context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
