//! Error types for `gatelog-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("batch is empty")]
  EmptyBatch,

  #[error("batch holds {got} events; the limit is {max}")]
  BatchTooLarge { got: usize, max: usize },

  /// A single record failed structural validation. `index` is its position
  /// in the submitted batch.
  #[error("event #{index}: {reason}")]
  InvalidEvent { index: usize, reason: String },

  #[error("invalid event id: {0:?}")]
  InvalidEventId(String),

  #[error("unknown time zone: {0:?}")]
  UnknownTimeZone(String),

  #[error("local midnight of {0} does not exist in the reference time zone")]
  NonexistentMidnight(chrono::NaiveDate),

  #[error("unknown {kind} value: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
