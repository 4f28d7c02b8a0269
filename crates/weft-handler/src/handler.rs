use async_trait::async_trait;

use crate::Params;
use crate::result::ActionResult;
use crate::schema::HandlerSchema;

/// A named unit of work.
///
/// Implementations must not let failures escape `execute`: every error is
/// reported as a failed [`ActionResult`]. The executor additionally treats a
/// panic inside `execute` as a failed attempt.
#[async_trait]
pub trait Handler: Send + Sync {
  /// Declared metadata. Called once at registration.
  fn schema(&self) -> HandlerSchema;

  /// Run the handler against fully resolved parameters.
  async fn execute(&self, params: Params) -> ActionResult;

  /// File extensions this handler processes. Merged into the schema and
  /// indexed by the registry.
  fn supported_file_types(&self) -> Vec<String> {
    Vec::new()
  }
}
