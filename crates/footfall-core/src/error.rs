//! Error types for `footfall-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("profile not found: {0}")]
  ProfileNotFound(String),

  #[error("validation error: {0}")]
  Validation(String),

  /// The same external identifier appears on two different profiles.
  /// Surfaced at import time only; never reaches the read path.
  #[error("{kind} {value:?} is claimed by both {first} and {second}")]
  IdentifierCollision {
    kind:   &'static str,
    value:  String,
    first:  String,
    second: String,
  },

  #[error("embedding has {got} dimensions, expected {expected}")]
  EmbeddingDimension { expected: usize, got: usize },

  #[error("unknown event kind: {0:?}")]
  UnknownEventKind(String),

  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
