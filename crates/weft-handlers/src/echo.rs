use async_trait::async_trait;
use weft_handler::{ActionResult, Handler, HandlerSchema, ParameterSchema, ParameterType, Params};

/// Returns its parameters unchanged as output data.
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("echo")
      .description("Return the given parameters as output")
      .tag("debug")
      .input(ParameterSchema::new("text", ParameterType::String).description("Text to echo"))
      .output(ParameterSchema::new("text", ParameterType::String).description("The same text"))
  }

  async fn execute(&self, params: Params) -> ActionResult {
    ActionResult::ok(params)
  }
}
