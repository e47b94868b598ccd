//! Server assembly for the gate logbook.
//!
//! Turns a [`ServerConfig`] into the axum application: the JSON API nested
//! under `/api`, wrapped in request tracing.

pub mod error;

use std::path::{Path, PathBuf};

use axum::Router;
use gatelog_api::{AdminCredentials, ApiSettings, AppState, api_router};
use gatelog_core::{
  store::EventStore,
  zone::{DEFAULT_REFERENCE_ZONE, ReferenceZone},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ConfigError;

/// Prefix of the environment variables that override the config file.
pub const ENV_PREFIX: &str = "GATELOG";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `gatelog.toml` and
/// `GATELOG_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// IANA zone whose calendar day defines "today".
  #[serde(default = "default_zone")]
  pub reference_time_zone: String,
  #[serde(default)]
  pub require_device_auth: bool,
  /// Behind a reverse proxy: record `x-forwarded-for` as the client address.
  #[serde(default)]
  pub trust_proxy:         bool,
  pub admin_username:      Option<String>,
  /// argon2 PHC string; see `gatelog-server hash-password`.
  pub admin_password_hash: Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("gatelog.db") }

fn default_zone() -> String { DEFAULT_REFERENCE_ZONE.to_string() }

impl ServerConfig {
  /// Read `path` (optional) and then the environment, later sources winning.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()?
      .try_deserialize()
  }

  /// Validate the behavioural settings and turn them into [`ApiSettings`].
  pub fn api_settings(&self) -> Result<ApiSettings, ConfigError> {
    let zone = ReferenceZone::parse(&self.reference_time_zone)?;
    let admin = match (&self.admin_username, &self.admin_password_hash) {
      (Some(username), Some(password_hash)) => Some(AdminCredentials {
        username:      username.clone(),
        password_hash: password_hash.clone(),
      }),
      (None, None) => None,
      _ => return Err(ConfigError::IncompleteAdmin),
    };
    Ok(ApiSettings {
      zone,
      require_device_auth: self.require_device_auth,
      admin,
      trust_forwarded_for: self.trust_proxy,
    })
  }

  /// `store_path` with a leading `~` expanded to the user's home directory.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The full HTTP application for `state`.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: EventStore + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
