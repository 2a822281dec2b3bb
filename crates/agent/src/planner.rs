//! Initial planning.

use crate::plan::Plan;
use newsbrief_core::Result;
use newsbrief_core::message::Message;
use newsbrief_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::info;

const PLANNER_PROMPT: &str = "For the given objective, come up with a simple step by step plan. \
This plan should involve individual tasks, that if executed correctly will yield the correct \
answer. Do not add any superfluous steps. The result of the final step should be the final \
answer. Make sure that each step has all the information needed - do not skip steps.";

/// Turns an objective into an initial plan via structured output.
pub struct Planner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl Planner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    /// Produce the initial plan for an objective. The tool catalog is
    /// included so the plan only leans on capabilities that exist.
    pub async fn plan(&self, objective: &str, tool_catalog: &str) -> Result<Plan> {
        let system = format!("{PLANNER_PROMPT}\n\nAvailable tools:\n{tool_catalog}");

        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(system), Message::user(objective)],
            self.temperature,
        );

        let value = self
            .provider
            .complete_structured(request, "plan", Plan::schema())
            .await?;

        let plan = Plan::from_value(value)?;
        info!(steps = plan.len(), "Initial plan created");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockProvider;
    use newsbrief_core::Error;
    use newsbrief_core::error::AgentError;

    #[tokio::test]
    async fn planner_decodes_structured_plan() {
        let provider = Arc::new(SequentialMockProvider::structured(vec![serde_json::json!({
            "steps": ["process emails", "analyze each email", "synthesize and send"]
        })]));
        let planner = Planner::new(provider, "mock-model", 0.0);

        let plan = planner
            .plan("digest my newsletters", "- process_emails: fetch emails")
            .await
            .unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.get(0), Some("process emails"));
    }

    #[tokio::test]
    async fn planner_rejects_empty_plan() {
        let provider = Arc::new(SequentialMockProvider::structured(vec![serde_json::json!({
            "steps": []
        })]));
        let planner = Planner::new(provider, "mock-model", 0.0);

        let err = planner.plan("objective", "").await.unwrap_err();
        assert!(matches!(err, Error::Agent(AgentError::EmptyPlan)));
    }
}
