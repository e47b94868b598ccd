//! `gatelog-capture`: gate-side capture tool with an offline queue.
//!
//! Records are saved locally first and pushed to the server with `sync`
//! whenever the network allows.
//!
//! # Usage
//!
//! ```text
//! gatelog-capture record entry --kind vehicle --plate abc123 --name "Ana Ruiz" \
//!   --area "Dock 3" --purpose Delivery
//! gatelog-capture record exit --kind vehicle --plate ABC123
//! gatelog-capture sync --url http://gate-server:8080 --api-key <key>
//! ```

mod client;
mod form;
mod queue;
mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use form::Form;
use gatelog_core::{
  event::{Direction, EntityKind, Event, PersonCategory, SubjectFields},
  identity::IdentityKey,
  occupancy::Presence,
};
use queue::Queue;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "gatelog-capture", about = "Gate-side capture tool for gatelog")]
struct Args {
  /// Path to a TOML config file (url, device_id, api_key, db).
  #[arg(short, long, value_name = "FILE", env = "GATELOG_CAPTURE_CONFIG")]
  config: Option<PathBuf>,

  /// Local queue database (default: gatelog-capture.db).
  #[arg(long, env = "GATELOG_CAPTURE_DB")]
  db: Option<PathBuf>,

  /// Base URL of the gatelog server (default: http://localhost:8080).
  #[arg(long, env = "GATELOG_URL")]
  url: Option<String>,

  /// Identifier of this capture device.
  #[arg(long, env = "GATELOG_DEVICE_ID")]
  device_id: Option<String>,

  /// Device API key issued by `gatelog-server register-device`.
  #[arg(long, env = "GATELOG_API_KEY")]
  api_key: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Record an entry or exit.
  Record(RecordArgs),
  /// List records not yet sent to the server.
  Pending,
  /// List local records, most recent first.
  History {
    #[arg(short, long, default_value_t = 20)]
    limit: usize,
  },
  /// Show the latest local record for an identity.
  Lookup(KeyArgs),
  /// Send pending records to the server.
  Sync,
}

#[derive(ClapArgs, Debug)]
struct RecordArgs {
  /// `entry` or `exit`.
  direction: Direction,

  /// `pedestrian` or `vehicle`.
  #[arg(long, default_value = "pedestrian")]
  kind: EntityKind,

  /// `employee`, `supplier` or `visitor`.
  #[arg(long, default_value = "visitor")]
  category: PersonCategory,

  #[arg(long)]
  name:            Option<String>,
  #[arg(long)]
  employee_number: Option<String>,
  #[arg(long)]
  company:         Option<String>,
  #[arg(long)]
  area:            Option<String>,
  #[arg(long)]
  purpose:         Option<String>,
  #[arg(long)]
  plate:           Option<String>,
  #[arg(long)]
  model:           Option<String>,
  #[arg(long)]
  color:           Option<String>,
  /// Payload of a scanned badge or QR code.
  #[arg(long)]
  code:            Option<String>,

  /// Record an entry even if the identity already looks inside.
  #[arg(long)]
  force: bool,
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
struct KeyArgs {
  #[arg(long)]
  plate:    Option<String>,
  #[arg(long)]
  employee: Option<String>,
  #[arg(long)]
  code:     Option<String>,
}

impl KeyArgs {
  fn key(&self) -> Option<IdentityKey> {
    let present = |v: &Option<String>| {
      v.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
    };
    if let Some(plate) = present(&self.plate) {
      return Some(IdentityKey::Plate(plate.to_uppercase()));
    }
    if let Some(number) = present(&self.employee) {
      return Some(IdentityKey::Employee(number));
    }
    present(&self.code).map(IdentityKey::Code)
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:       String,
  #[serde(default)]
  device_id: String,
  #[serde(default)]
  api_key:   String,
  db:        Option<PathBuf>,
}

struct Settings {
  db:  PathBuf,
  api: ApiConfig,
}

fn non_empty(value: &str) -> Option<String> {
  (!value.is_empty()).then(|| value.to_owned())
}

/// CLI flags override the config file, which overrides defaults.
fn resolve(args: &Args) -> Result<Settings> {
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  Ok(Settings {
    db:  args
      .db
      .clone()
      .or(file_cfg.db)
      .unwrap_or_else(|| PathBuf::from("gatelog-capture.db")),
    api: ApiConfig {
      base_url:  args
        .url
        .clone()
        .or_else(|| non_empty(&file_cfg.url))
        .unwrap_or_else(|| "http://localhost:8080".to_string()),
      device_id: args
        .device_id
        .clone()
        .or_else(|| non_empty(&file_cfg.device_id))
        .unwrap_or_else(|| "CAPTURE-01".to_string()),
      api_key:   args
        .api_key
        .clone()
        .or_else(|| non_empty(&file_cfg.api_key))
        .unwrap_or_default(),
    },
  })
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let settings = resolve(&args)?;
  let queue = Queue::open(&settings.db).await?;

  match args.command {
    Command::Record(record) => {
      let form = Form {
        direction:   record.direction,
        entity_kind: record.kind,
        category:    record.category,
        subject:     SubjectFields {
          name:            record.name,
          employee_number: record.employee_number,
          company:         record.company,
          area:            record.area,
          purpose:         record.purpose,
          plate:           record.plate,
          vehicle_model:   record.model,
          vehicle_color:   record.color,
          scanned_code:    record.code,
        },
        force:       record.force,
      };
      let related = match form.identity_key() {
        Some(key) => queue.related(&key).await?,
        None => Vec::new(),
      };
      let event = form.into_event(&related, &settings.api.device_id, Utc::now())?;
      queue.push(&event).await?;
      tracing::info!(id = %event.id, direction = %event.direction, "record saved");
      if event.exit_without_entry {
        tracing::warn!("no matching entry on this device; exit flagged");
      }
      println!("{}", line(&event));
    }
    Command::Pending => {
      for event in queue.pending(usize::MAX).await? {
        println!("{}", line(&event));
      }
    }
    Command::History { limit } => {
      for capture in queue.history(limit).await? {
        let mark = if capture.synced { "synced " } else { "pending" };
        println!("{mark} {}", line(&capture.event));
      }
    }
    Command::Lookup(key_args) => {
      let key = key_args.key().context("an identity value must not be empty")?;
      let related = queue.related(&key).await?;
      let presence = Presence::reconstruct(&related);
      match presence.latest(&key) {
        Some(event) => {
          let state = if presence.is_inside(&key) { "inside" } else { "outside" };
          println!("{key} {state}");
          println!("{}", line(event));
        }
        None => println!("{key} has no local records"),
      }
    }
    Command::Sync => {
      let client = ApiClient::new(settings.api)?;
      tracing::info!(device = client.device_id(), "syncing");
      let report = sync::sync(&queue, &client).await?;
      println!(
        "sent {}, confirmed {}, {} still pending",
        report.sent, report.confirmed, report.remaining
      );
    }
  }

  Ok(())
}

/// One-line summary of a record.
fn line(event: &Event) -> String {
  let s = &event.subject;
  let who = s
    .plate
    .as_deref()
    .or(s.name.as_deref())
    .or(s.scanned_code.as_deref())
    .unwrap_or("?");
  let flag = if event.exit_without_entry { " [no entry]" } else { "" };
  format!(
    "{} {:<5} {:<10} {:<8} {} ({}){flag}",
    event.occurred_at.format("%Y-%m-%d %H:%M:%S"),
    event.direction,
    event.entity_kind,
    event.category,
    who,
    event.id,
  )
}
