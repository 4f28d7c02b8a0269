use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine settings, read from `settings.json` in the data directory.
///
/// Missing keys fall back to their defaults, and a missing file yields
/// [`Settings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Upper bound on steps running at the same time within one run.
  pub max_concurrent_steps: usize,
  /// Per-attempt timeout for steps that do not set their own.
  pub default_step_timeout_seconds: u64,
  /// Database connection string. Defaults to a SQLite file in the data directory.
  pub database_url: Option<String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      max_concurrent_steps: 4,
      default_step_timeout_seconds: 300,
      database_url: None,
    }
  }
}

impl Settings {
  /// Load settings from a JSON file, or defaults if it does not exist.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    match std::fs::read_to_string(path) {
      Ok(content) => Ok(serde_json::from_str(&content)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
      Err(source) => Err(ConfigError::Io {
        path: path.to_path_buf(),
        source,
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
    assert_eq!(settings, Settings::default());
  }

  #[test]
  fn test_partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{ "max_concurrent_steps": 16 }"#).unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.max_concurrent_steps, 16);
    assert_eq!(settings.default_step_timeout_seconds, 300);
    assert!(settings.database_url.is_none());
  }

  #[test]
  fn test_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(matches!(Settings::load(&path), Err(ConfigError::Json(_))));
  }
}
