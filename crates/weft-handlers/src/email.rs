use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use weft_handler::{
  ActionResult, Handler, HandlerError, HandlerSchema, ParameterSchema, ParameterType, Params,
  require_str,
};

use crate::into_params;

const SIMULATED_WORK: Duration = Duration::from_millis(300);

/// Sends an email (simulated).
pub struct SendEmailHandler;

impl SendEmailHandler {
  async fn run(&self, params: Params) -> Result<Params, HandlerError> {
    let to = require_str(&params, "to")?;
    require_str(&params, "subject")?;
    require_str(&params, "body")?;

    tokio::time::sleep(SIMULATED_WORK).await;

    Ok(into_params(json!({
      "message_id": format!("msg_{}", uuid::Uuid::new_v4().simple()),
      "status": "sent",
      "sent_at": chrono::Utc::now().to_rfc3339(),
      "recipient": to,
    })))
  }
}

#[async_trait]
impl Handler for SendEmailHandler {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("send_email")
      .display_name("Email Sender")
      .description("Send emails with attachments and templating")
      .category("integration")
      .tag("email")
      .tag("notification")
      .input(ParameterSchema::new("to", ParameterType::Email).description("Recipient address"))
      .input(ParameterSchema::new("subject", ParameterType::String))
      .input(ParameterSchema::new("body", ParameterType::String))
      .input(ParameterSchema::new("from_email", ParameterType::Email).optional())
      .input(ParameterSchema::new("cc", ParameterType::Array).optional())
      .input(ParameterSchema::new("bcc", ParameterType::Array).optional())
      .input(
        ParameterSchema::new("attachments", ParameterType::Array)
          .description("File paths to attach")
          .optional(),
      )
      .output(ParameterSchema::new("message_id", ParameterType::String))
      .output(ParameterSchema::new("status", ParameterType::String))
      .output(ParameterSchema::new("sent_at", ParameterType::String))
  }

  async fn execute(&self, params: Params) -> ActionResult {
    self.run(params).await.into()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_send() {
    let result = SendEmailHandler
      .execute(into_params(json!({
        "to": "ops@example.com",
        "subject": "Report ready",
        "body": "See attached."
      })))
      .await;

    let data = result.data.unwrap();
    assert_eq!(data["status"], "sent");
    assert_eq!(data["recipient"], "ops@example.com");
    assert!(data["message_id"].as_str().unwrap().starts_with("msg_"));
  }

  #[test]
  fn test_schema_requires_core_fields() {
    let schema = SendEmailHandler.schema();
    let missing = schema.missing_parameters(&Params::new());
    assert_eq!(missing, vec!["to", "subject", "body"]);
  }
}
