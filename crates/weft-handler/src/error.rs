use thiserror::Error;

/// Errors raised inside a handler. They never leave [`crate::Handler::execute`];
/// they are turned into a failed [`crate::ActionResult`].
#[derive(Debug, Error)]
pub enum HandlerError {
  #[error("missing required parameter: {name}")]
  MissingParameter { name: String },

  #[error("invalid parameter '{name}': {message}")]
  InvalidParameter { name: String, message: String },

  #[error("{message}")]
  Failed { message: String },
}

impl HandlerError {
  pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
    HandlerError::InvalidParameter {
      name: name.into(),
      message: message.into(),
    }
  }

  pub fn failed(message: impl Into<String>) -> Self {
    HandlerError::Failed {
      message: message.into(),
    }
  }
}

/// A handler schema that cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
  #[error("handler name must not be empty")]
  EmptyName,

  #[error("handler '{handler}' declares parameter '{parameter}' more than once")]
  DuplicateParameter { handler: String, parameter: String },

  #[error("handler '{handler}': default for '{parameter}' is not one of its choices")]
  DefaultNotInChoices { handler: String, parameter: String },
}
