use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::step::StepDef;

/// Lifecycle state of a stored workflow definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
  Draft,
  #[default]
  Active,
  Archived,
}

impl WorkflowStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      WorkflowStatus::Draft => "draft",
      WorkflowStatus::Active => "active",
      WorkflowStatus::Archived => "archived",
    }
  }
}

/// On-disk encoding of a workflow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
  Json,
  Yaml,
}

impl DefinitionFormat {
  /// Pick the format from a file extension. Anything that is not
  /// `.yaml`/`.yml` is treated as JSON.
  pub fn from_path(path: &Path) -> Self {
    match path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(|ext| ext.to_ascii_lowercase())
      .as_deref()
    {
      Some("yaml") | Some("yml") => DefinitionFormat::Yaml,
      _ => DefinitionFormat::Json,
    }
  }
}

/// A workflow definition as authored by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  #[serde(alias = "id")]
  pub workflow_id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,
  #[serde(default = "default_version")]
  pub version: String,
  #[serde(default)]
  pub status: WorkflowStatus,
  #[serde(default)]
  pub steps: Vec<StepDef>,
}

fn default_version() -> String {
  "1.0.0".to_string()
}

impl WorkflowDef {
  /// Parse a definition from a string in the given format.
  pub fn parse(content: &str, format: DefinitionFormat) -> Result<Self, ConfigError> {
    match format {
      DefinitionFormat::Json => Ok(serde_json::from_str(content)?),
      DefinitionFormat::Yaml => Ok(serde_yaml::from_str(content)?),
    }
  }

  /// Read and parse a definition file, choosing the format by extension.
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&content, DefinitionFormat::from_path(path))
  }

  /// Find a step by its number.
  pub fn step(&self, step_number: u32) -> Option<&StepDef> {
    self.steps.iter().find(|s| s.step_number == step_number)
  }
}
