//! Digest delivery.

use crate::PipelineSettings;
use async_trait::async_trait;
use newsbrief_core::error::ToolError;
use newsbrief_core::{Tool, ToolResult};
use newsbrief_mail::GraphMailClient;
use std::sync::Arc;
use tracing::info;

pub struct SendEmailTool {
    mail: Arc<GraphMailClient>,
    settings: Arc<PipelineSettings>,
}

impl SendEmailTool {
    pub fn new(mail: Arc<GraphMailClient>, settings: Arc<PipelineSettings>) -> Self {
        Self { mail, settings }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an HTML email. Defaults to the configured digest recipient when no recipient \
         is given."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "subject": {
                    "type": "string",
                    "description": "Email subject line"
                },
                "body": {
                    "type": "string",
                    "description": "HTML body of the email"
                },
                "recipient": {
                    "type": "string",
                    "description": "Destination address (optional)"
                }
            },
            "required": ["subject", "body"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let subject = arguments["subject"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("subject is required".into()))?;
        let body = arguments["body"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("body is required".into()))?;
        let recipient = arguments["recipient"]
            .as_str()
            .unwrap_or(&self.settings.receiver_email);

        if recipient.is_empty() {
            return Err(ToolError::InvalidArguments(
                "No recipient given and no default configured".into(),
            ));
        }

        self.mail
            .send_mail(subject, body, recipient)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        info!(%recipient, "Email dispatched");

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format!("Email \"{subject}\" sent to {recipient}"),
            data: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsbrief_mail::GraphAuthenticator;

    fn build_tool(receiver: &str) -> SendEmailTool {
        let auth = Arc::new(GraphAuthenticator::new("tenant", "client", "secret"));
        SendEmailTool::new(
            Arc::new(GraphMailClient::new(auth, "bot@example.com")),
            Arc::new(PipelineSettings {
                model: "gpt-4o-mini".into(),
                embedding_model: "text-embedding-3-small".into(),
                temperature: 0.0,
                senders: vec![],
                receiver_email: receiver.to_string(),
                chunk_size: 512,
                chunk_overlap: 50,
            }),
        )
    }

    #[tokio::test]
    async fn missing_subject_is_invalid_arguments() {
        let tool = build_tool("me@example.com");
        let err = tool
            .execute(serde_json::json!({"body": "<p>hi</p>"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn missing_body_is_invalid_arguments() {
        let tool = build_tool("me@example.com");
        let err = tool
            .execute(serde_json::json!({"subject": "Digest"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn no_recipient_anywhere_is_invalid_arguments() {
        let tool = build_tool("");
        let err = tool
            .execute(serde_json::json!({"subject": "Digest", "body": "<p>hi</p>"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn schema_requires_subject_and_body() {
        let tool = build_tool("me@example.com");
        let schema = tool.parameters_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["subject", "body"]);
    }
}
