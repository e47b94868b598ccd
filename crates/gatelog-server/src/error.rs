//! Configuration errors detected at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid reference_time_zone: {0}")]
  TimeZone(#[from] gatelog_core::Error),

  /// Only one of the two admin settings was given.
  #[error("admin_username and admin_password_hash must be set together")]
  IncompleteAdmin,
}
