//! Weft Handler
//!
//! The contract every unit of work implements, and the declarative schema
//! that describes it.
//!
//! - [`ParameterSchema`] describes one named value (type, required-ness,
//!   default, constraints).
//! - [`HandlerSchema`] describes a handler's identity, category, inputs,
//!   outputs, and supported file types.
//! - [`Handler`] is the execution contract: a parameter map in, an
//!   [`ActionResult`] out.
//!
//! Only required-parameter presence is enforced before a handler runs
//! ([`HandlerSchema::validate`]). The richer checks in
//! [`HandlerSchema::violations`] exist for tooling.

mod error;
mod extract;
mod handler;
mod param;
mod result;
mod schema;

pub use error::{HandlerError, SchemaError};
pub use extract::{optional_bool, optional_f64, optional_i64, optional_str, require_str};
pub use handler::Handler;
pub use param::{ParameterSchema, ParameterType, ParameterViolation};
pub use result::ActionResult;
pub use schema::{HandlerSchema, normalize_extension, title_case};

/// Parameters and handler output data are plain JSON objects.
pub type Params = serde_json::Map<String, serde_json::Value>;
