//! Weft Handlers
//!
//! The handlers that ship with weft. Most of them simulate their work and
//! return canned data; they exist so workflows can be authored and run
//! end to end before real integrations are plugged in. `http_request`
//! performs a real request.
//!
//! [`builtin_sources`] is the static registration list handed to
//! [`HandlerRegistry::discover`].

mod database;
mod echo;
mod email;
mod http;
mod image;
mod pdf;
mod text;

pub use database::DatabaseQueryHandler;
pub use echo::EchoHandler;
pub use email::SendEmailHandler;
pub use http::HttpRequestHandler;
pub use image::ProcessImageHandler;
pub use pdf::ProcessPdfHandler;
pub use text::AnalyzeTextHandler;

use weft_handler_registry::{DiscoveryReport, HandlerRegistry, HandlerSource, StaticSource};

/// The built-in handlers, grouped by source.
pub fn builtin_sources() -> Vec<Box<dyn HandlerSource>> {
  vec![
    Box::new(
      StaticSource::new("core")
        .with(|| EchoHandler)
        .with(|| DatabaseQueryHandler)
        .with(|| SendEmailHandler)
        .with(|| HttpRequestHandler),
    ),
    Box::new(
      StaticSource::new("file")
        .with(|| ProcessPdfHandler)
        .with(|| ProcessImageHandler),
    ),
    Box::new(StaticSource::new("ai").with(|| AnalyzeTextHandler)),
  ]
}

/// Unwrap a `json!` object literal.
pub(crate) fn into_params(value: serde_json::Value) -> weft_handler::Params {
  match value {
    serde_json::Value::Object(map) => map,
    _ => weft_handler::Params::new(),
  }
}

/// A registry populated with every built-in handler.
pub fn builtin_registry() -> (HandlerRegistry, DiscoveryReport) {
  let mut registry = HandlerRegistry::new();
  let report = registry.discover(&builtin_sources());
  (registry, report)
}
