//! Re-planning after each execution pass.

use crate::plan::{Action, RunState};
use newsbrief_core::Result;
use newsbrief_core::message::{Message, Role};
use newsbrief_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::info;

const REPLANNER_PROMPT: &str = "For the given objective, come up with a simple step by step plan. \
This plan should involve individual tasks, that if executed correctly will yield the correct \
answer. Do not add any superfluous steps. The result of the final step should be the final \
answer. Make sure that each step has all the information needed - do not skip steps.";

/// Decides after each execution pass whether the run is finished or the
/// plan needs revising.
pub struct RePlanner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl RePlanner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    /// Render what has happened so far: executed steps paired with the
    /// observations that came back.
    fn render_progress(state: &RunState) -> String {
        let executed: Vec<String> = state
            .plan
            .steps()
            .iter()
            .take(state.cursor)
            .enumerate()
            .map(|(i, step)| format!("{}. {step}", i + 1))
            .collect();

        let observations: Vec<String> = state
            .history
            .iter()
            .filter(|m| m.role == Role::Tool || m.role == Role::Assistant)
            .filter(|m| !m.content.is_empty())
            .map(|m| format!("- {}", m.content))
            .collect();

        format!(
            "Executed steps:\n{}\n\nObservations:\n{}",
            executed.join("\n"),
            observations.join("\n"),
        )
    }

    /// Ask the model whether to respond or revise. The tool catalog is
    /// included so a revised plan only leans on capabilities that exist.
    pub async fn replan(&self, state: &RunState, tool_catalog: &str) -> Result<Action> {
        let system = format!("{REPLANNER_PROMPT}\n\nAvailable tools:\n{tool_catalog}");
        let user = format!(
            "Your objective was this:\n{}\n\nYour original plan was this:\n{}\n\nYou have \
             currently done the following:\n{}\n\nUpdate your plan accordingly. If no more steps \
             are needed and you can return to the user, then respond with that. Otherwise, fill \
             out the plan. Only add steps to the plan that still NEED to be done. Do not return \
             previously done steps as part of the plan.",
            state.objective,
            state.plan.render(),
            Self::render_progress(state),
        );

        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(system), Message::user(user)],
            self.temperature,
        );

        let value = self
            .provider
            .complete_structured(request, "replan_action", Action::schema())
            .await?;

        let action = Action::from_value(value)?;
        match &action {
            Action::Respond(_) => info!("Re-planner chose to respond"),
            Action::Revise(plan) => info!(steps = plan.len(), "Re-planner revised the plan"),
        }
        Ok(action)
    }
}
