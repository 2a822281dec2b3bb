//! Step execution.
//!
//! The executor works on exactly one plan step per call. The model sees
//! the rendered plan, the current step, the run history, and the bound
//! tool catalog. Tool failures of any kind are fed back to the model as
//! error tool-results; they never abort the run. Every assistant message
//! carrying tool calls is immediately followed by one tool-result message
//! per call, in call order, with matching call ids.

use crate::plan::RunState;
use newsbrief_core::Result;
use newsbrief_core::error::AgentError;
use newsbrief_core::message::Message;
use newsbrief_core::provider::{Provider, ProviderRequest};
use newsbrief_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Executor {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: f32,
}

impl Executor {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            temperature,
        }
    }

    /// Execute the current plan step, appending the assistant message and
    /// any tool results to the history, then advance the cursor by one.
    pub async fn execute_step(&self, state: &mut RunState) -> Result<()> {
        // The runner only calls with steps remaining; a stray call would
        // break the one-step-per-call accounting, so it is an error.
        let Some(task) = state.current_step().map(String::from) else {
            return Err(AgentError::PlanExhausted.into());
        };

        let system = format!(
            "For the following plan:\n{}\n\nYou are tasked with executing step {}, {task}.",
            state.plan.render(),
            state.cursor + 1,
        );

        let mut messages = vec![Message::system(system)];
        messages.extend(state.history.iter().cloned());

        let mut request = ProviderRequest::new(self.model.clone(), messages, self.temperature);
        request.tools = self.tools.definitions();

        debug!(step = state.cursor + 1, task = %task, "Executing plan step");

        let response = self.provider.complete(request).await?;
        let assistant = response.message;
        let tool_calls = assistant.tool_calls.clone();

        state.history.push(assistant);

        // Resolve tool calls sequentially, in the order the model issued
        // them, so each result lands right after its call.
        for call in tool_calls {
            let result_text = match serde_json::from_str::<serde_json::Value>(&call.arguments) {
                Ok(arguments) => {
                    let tool_call = ToolCall {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        arguments,
                    };
                    match self.tools.execute(&tool_call).await {
                        Ok(result) => result.output,
                        Err(e) => {
                            warn!(tool = %call.name, error = %e, "Tool call failed");
                            format!("Error: {e}")
                        }
                    }
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Unparseable tool arguments");
                    format!("Error: invalid tool arguments: {e}")
                }
            };

            state.history.push(Message::tool_result(call.id, result_text));
        }

        state.cursor += 1;
        Ok(())
    }
}
