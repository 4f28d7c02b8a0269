use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::Params;
use crate::error::SchemaError;
use crate::param::{ParameterSchema, ParameterViolation};

/// Describes a handler: identity, grouping, inputs, outputs.
///
/// Built once per handler implementation and immutable after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerSchema {
  /// Stable dispatch name, unique across the registry.
  pub name: String,
  pub display_name: String,
  #[serde(default)]
  pub description: String,
  pub category: String,
  pub version: String,
  #[serde(default)]
  pub input_schema: Vec<ParameterSchema>,
  #[serde(default)]
  pub output_schema: Vec<ParameterSchema>,
  /// Lower-cased extensions with a leading dot, e.g. `.pdf`.
  #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
  pub supported_file_types: BTreeSet<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
}

impl HandlerSchema {
  /// Start a schema for `name` in the `general` category.
  pub fn new(name: impl Into<String>) -> Self {
    let name = name.into();
    Self {
      display_name: title_case(&name),
      name,
      description: String::new(),
      category: "general".to_string(),
      version: "1.0.0".to_string(),
      input_schema: Vec::new(),
      output_schema: Vec::new(),
      supported_file_types: BTreeSet::new(),
      tags: Vec::new(),
    }
  }

  pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
    self.display_name = display_name.into();
    self
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn category(mut self, category: impl Into<String>) -> Self {
    self.category = category.into();
    self
  }

  pub fn version(mut self, version: impl Into<String>) -> Self {
    self.version = version.into();
    self
  }

  pub fn input(mut self, parameter: ParameterSchema) -> Self {
    self.input_schema.push(parameter);
    self
  }

  pub fn output(mut self, parameter: ParameterSchema) -> Self {
    self.output_schema.push(parameter);
    self
  }

  pub fn tag(mut self, tag: impl Into<String>) -> Self {
    self.tags.push(tag.into());
    self
  }

  pub fn file_types<I, S>(mut self, extensions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self
      .supported_file_types
      .extend(extensions.into_iter().map(|e| normalize_extension(e.as_ref())));
    self
  }

  /// Look up an input parameter by name.
  pub fn parameter(&self, name: &str) -> Option<&ParameterSchema> {
    self.input_schema.iter().find(|p| p.name == name)
  }

  /// Required inputs that are absent from `params`, in declaration order.
  pub fn missing_parameters(&self, params: &Params) -> Vec<&str> {
    self
      .input_schema
      .iter()
      .filter(|p| p.required && !params.contains_key(&p.name))
      .map(|p| p.name.as_str())
      .collect()
  }

  /// Presence check: every required input must be supplied.
  ///
  /// This is the only validation performed before a handler is invoked.
  pub fn validate(&self, params: &Params) -> bool {
    self.missing_parameters(params).is_empty()
  }

  /// Full constraint check for tooling: missing inputs, types, choices,
  /// bounds, patterns, email and URL shape. Unknown keys are ignored.
  pub fn violations(&self, params: &Params) -> Vec<ParameterViolation> {
    let mut violations = Vec::new();
    for parameter in &self.input_schema {
      match params.get(&parameter.name) {
        Some(value) => violations.extend(parameter.check_value(value)),
        None if parameter.required => violations.push(ParameterViolation {
          parameter: parameter.name.clone(),
          message: "required parameter is missing".to_string(),
        }),
        None => {}
      }
    }
    violations
  }

  /// Structural sanity: non-empty name, unique parameter names within
  /// inputs and within outputs, defaults drawn from choices.
  pub fn check(&self) -> Result<(), SchemaError> {
    if self.name.trim().is_empty() {
      return Err(SchemaError::EmptyName);
    }

    for parameters in [&self.input_schema, &self.output_schema] {
      let mut seen = HashSet::new();
      for parameter in parameters {
        if !seen.insert(parameter.name.as_str()) {
          return Err(SchemaError::DuplicateParameter {
            handler: self.name.clone(),
            parameter: parameter.name.clone(),
          });
        }
        if !parameter.default_is_valid_choice() {
          return Err(SchemaError::DefaultNotInChoices {
            handler: self.name.clone(),
            parameter: parameter.name.clone(),
          });
        }
      }
    }

    Ok(())
  }

  /// Whether this handler declares `extension` (matched case-insensitively).
  pub fn supports_file_type(&self, extension: &str) -> bool {
    self
      .supported_file_types
      .contains(&normalize_extension(extension))
  }
}

/// Lower-case an extension and ensure it has a leading dot.
pub fn normalize_extension(extension: &str) -> String {
  let lowered = extension.trim().to_lowercase();
  if lowered.starts_with('.') {
    lowered
  } else {
    format!(".{}", lowered)
  }
}

/// `process_pdf` -> `Process Pdf`.
pub fn title_case(name: &str) -> String {
  name
    .split('_')
    .filter(|word| !word.is_empty())
    .map(|word| {
      let mut chars = word.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
      }
    })
    .collect::<Vec<String>>()
    .join(" ")
}
