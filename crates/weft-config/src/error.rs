use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid YAML: {0}")]
  Yaml(#[from] serde_yaml::Error),
}
