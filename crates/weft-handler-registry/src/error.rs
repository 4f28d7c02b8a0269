use thiserror::Error;
use weft_handler::SchemaError;

/// Errors that can occur when registering handlers.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// The handler's declared schema is not registrable.
  #[error("invalid handler schema: {0}")]
  InvalidSchema(#[from] SchemaError),

  /// The handler's constructor panicked while computing its schema.
  #[error("handler constructor panicked")]
  ConstructorPanicked,
}

/// A handler source could not enumerate its handlers.
#[derive(Debug, Error)]
#[error("handler source '{source_name}' failed: {message}")]
pub struct SourceError {
  pub source_name: String,
  pub message: String,
}
