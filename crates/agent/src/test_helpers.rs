//! Shared test helpers for agent tests.

use async_trait::async_trait;
use newsbrief_core::error::{ProviderError, ToolError};
use newsbrief_core::message::{Message, MessageToolCall};
use newsbrief_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use newsbrief_core::tool::{Tool, ToolResult};
use std::sync::Mutex;

/// A mock provider that returns scripted responses in order.
///
/// `complete` and `complete_structured` draw from separate queues, so a
/// test can interleave executor turns with planner/re-planner turns.
/// Panics if a queue runs dry.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    structured: Mutex<Vec<serde_json::Value>>,
    complete_calls: Mutex<usize>,
    structured_calls: Mutex<usize>,
    last_structured_request: Mutex<Option<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses, Vec::new())
    }

    /// A provider that only answers structured calls.
    pub fn structured(values: Vec<serde_json::Value>) -> Self {
        Self::scripted(Vec::new(), values)
    }

    /// A fully scripted provider: text/tool-call responses plus
    /// structured values.
    pub fn scripted(responses: Vec<ProviderResponse>, structured: Vec<serde_json::Value>) -> Self {
        Self {
            responses: Mutex::new(responses),
            structured: Mutex::new(structured),
            complete_calls: Mutex::new(0),
            structured_calls: Mutex::new(0),
            last_structured_request: Mutex::new(None),
        }
    }

    pub fn complete_calls(&self) -> usize {
        *self.complete_calls.lock().unwrap()
    }

    pub fn structured_calls(&self) -> usize {
        *self.structured_calls.lock().unwrap()
    }

    /// The request passed to the most recent structured call.
    pub fn last_structured_request(&self) -> Option<ProviderRequest> {
        self.last_structured_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(
        &self,
        _request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.complete_calls.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        Ok(response)
    }

    async fn complete_structured(
        &self,
        request: ProviderRequest,
        _schema_name: &str,
        _schema: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        *self.last_structured_request.lock().unwrap() = Some(request);
        let mut count = self.structured_calls.lock().unwrap();
        let values = self.structured.lock().unwrap();

        if *count >= values.len() {
            panic!(
                "SequentialMockProvider: no more structured values (call #{}, have {})",
                *count,
                values.len()
            );
        }

        let value = values[*count].clone();
        *count += 1;
        Ok(value)
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut msg = Message::assistant(thought);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// A trivial tool that echoes its `text` argument.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes back the input"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    }
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let text = arguments["text"].as_str().unwrap_or("").to_string();
        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: text,
            data: None,
        })
    }
}
