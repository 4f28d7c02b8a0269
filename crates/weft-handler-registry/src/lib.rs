//! Weft Handler Registry
//!
//! The catalog that maps handler names to constructors and schemas, with
//! secondary indexes by category and by file extension.
//!
//! A registry is built once at startup, usually through
//! [`HandlerRegistry::discover`] over a static list of [`HandlerSource`]s,
//! then shared behind an `Arc` and only read afterwards.

mod error;
mod registry;
mod source;

pub use error::{RegistryError, SourceError};
pub use registry::{
  Constructor, DiscoveryFailure, DiscoveryReport, HandlerRegistry, RegisteredHandler,
};
pub use source::{HandlerSource, StaticSource};
