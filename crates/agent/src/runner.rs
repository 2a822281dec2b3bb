//! The plan-execute-replan run loop.
//!
//! Transition accounting: entering PLANNING, each EXECUTING step, and each
//! REPLANNING pass all consume one transition from the run budget. The
//! budget check happens before the transition is taken, so a run that
//! would exceed the budget fails with `BudgetExceeded` carrying the count
//! it reached.

use crate::executor::Executor;
use crate::plan::{Action, RunState, RunStore};
use crate::planner::Planner;
use crate::replanner::RePlanner;
use newsbrief_core::Result;
use newsbrief_core::error::AgentError;
use newsbrief_core::message::Message;
use newsbrief_core::provider::Provider;
use newsbrief_core::tool::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info};

/// Default transition budget per run.
pub const DEFAULT_MAX_TRANSITIONS: u32 = 20;

/// The completed result of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    /// The user-facing response text
    pub response: String,
    /// Transitions consumed
    pub transitions: u32,
    /// Full execution history
    pub history: Vec<Message>,
}

/// Drives a run from objective to response.
pub struct PlanRunner {
    planner: Planner,
    executor: Executor,
    replanner: RePlanner,
    tools: Arc<ToolRegistry>,
    store: Arc<RunStore>,
    max_transitions: u32,
}

impl PlanRunner {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        let model = model.into();
        Self {
            planner: Planner::new(provider.clone(), model.clone(), temperature),
            executor: Executor::new(provider.clone(), tools.clone(), model.clone(), temperature),
            replanner: RePlanner::new(provider, model, temperature),
            tools,
            store: Arc::new(RunStore::new()),
            max_transitions: DEFAULT_MAX_TRANSITIONS,
        }
    }

    /// Set the transition budget.
    pub fn with_max_transitions(mut self, max: u32) -> Self {
        self.max_transitions = max;
        self
    }

    /// Use a shared checkpoint store.
    pub fn with_store(mut self, store: Arc<RunStore>) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> Arc<RunStore> {
        self.store.clone()
    }

    /// Consume one transition, or fail when the budget is spent.
    fn take_transition(&self, state: &mut RunState) -> std::result::Result<(), AgentError> {
        if state.transitions >= self.max_transitions {
            return Err(AgentError::BudgetExceeded {
                transitions: state.transitions,
            });
        }
        state.transitions += 1;
        Ok(())
    }

    /// Run an objective to completion.
    pub async fn run(&self, objective: &str) -> Result<RunOutcome> {
        let mut state = RunState::new(objective);
        let run_id = state.run_id.clone();
        info!(%run_id, %objective, "Run started");

        let outcome = self.drive(&mut state).await;

        // Terminal either way; evict the checkpoint.
        self.store.remove(&run_id).await;
        outcome
    }

    async fn drive(&self, state: &mut RunState) -> Result<RunOutcome> {
        let catalog = self.tools.catalog();

        // PLANNING
        self.store.checkpoint(state).await;
        self.take_transition(state)?;
        let plan = self.planner.plan(&state.objective, &catalog).await?;
        state.replace_plan(plan);

        loop {
            // EXECUTING: one transition per step
            while !state.plan_exhausted() {
                self.store.checkpoint(state).await;
                self.take_transition(state)?;
                debug!(
                    run_id = %state.run_id,
                    step = state.cursor + 1,
                    of = state.plan.len(),
                    transitions = state.transitions,
                    "Executing"
                );
                self.executor.execute_step(state).await?;
            }

            // REPLANNING
            self.store.checkpoint(state).await;
            self.take_transition(state)?;
            match self.replanner.replan(state, &catalog).await? {
                Action::Respond(response) => {
                    state.response = Some(response.clone());
                    info!(
                        run_id = %state.run_id,
                        transitions = state.transitions,
                        "Run complete"
                    );
                    return Ok(RunOutcome {
                        run_id: state.run_id.clone(),
                        response,
                        transitions: state.transitions,
                        history: state.history.clone(),
                    });
                }
                Action::Revise(plan) => {
                    debug!(
                        run_id = %state.run_id,
                        steps = plan.len(),
                        "Plan revised, continuing"
                    );
                    state.replace_plan(plan);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        EchoTool, SequentialMockProvider, make_text_response, make_tool_call,
        make_tool_call_response,
    };
    use newsbrief_core::Error;
    use newsbrief_core::message::Role;

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        Arc::new(registry)
    }

    fn respond(text: &str) -> serde_json::Value {
        serde_json::json!({"action": "respond", "response": text})
    }

    fn revise(steps: &[&str]) -> serde_json::Value {
        serde_json::json!({"action": "revise", "steps": steps})
    }

    fn plan(steps: &[&str]) -> serde_json::Value {
        serde_json::json!({"steps": steps})
    }

    #[tokio::test]
    async fn terminates_after_one_pass_and_respond() {
        let provider = Arc::new(SequentialMockProvider::scripted(
            vec![make_text_response("step done")],
            vec![plan(&["single step"]), respond("all finished")],
        ));
        let runner = PlanRunner::new(provider.clone(), registry(), "mock-model", 0.0);

        let outcome = runner.run("small objective").await.unwrap();
        assert_eq!(outcome.response, "all finished");
        // PLANNING + 1 EXECUTING + REPLANNING
        assert_eq!(outcome.transitions, 3);
        // One executor turn, one plan + one replan structured call
        assert_eq!(provider.complete_calls(), 1);
        assert_eq!(provider.structured_calls(), 2);
    }

    #[tokio::test]
    async fn two_step_scenario_with_tools() {
        // "fetch 2 emails and summarize them": two executing passes with a
        // tool call each, then respond.
        let provider = Arc::new(SequentialMockProvider::scripted(
            vec![
                make_tool_call_response(
                    vec![make_tool_call("echo", serde_json::json!({"text": "fetched"}))],
                    "fetching",
                ),
                make_tool_call_response(
                    vec![make_tool_call("echo", serde_json::json!({"text": "summarized"}))],
                    "summarizing",
                ),
            ],
            vec![plan(&["fetch 2 emails", "summarize them"]), respond("done")],
        ));
        let runner = PlanRunner::new(provider, registry(), "mock-model", 0.0);

        let outcome = runner.run("fetch 2 emails and summarize them").await.unwrap();
        assert_eq!(outcome.response, "done");
        assert_eq!(outcome.transitions, 4);

        // History: objective, then for each step an assistant message
        // immediately followed by its tool result.
        assert_eq!(outcome.history[0].role, Role::User);
        let tool_results: Vec<&Message> = outcome
            .history
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_results.len(), 2);
        assert_eq!(tool_results[0].content, "fetched");
        assert_eq!(tool_results[1].content, "summarized");
    }

    #[tokio::test]
    async fn revision_resets_cursor_and_continues() {
        let provider = Arc::new(SequentialMockProvider::scripted(
            vec![
                make_text_response("first attempt"),
                make_text_response("second attempt"),
            ],
            vec![
                plan(&["try the thing"]),
                revise(&["retry the thing"]),
                respond("worked on retry"),
            ],
        ));
        let runner = PlanRunner::new(provider, registry(), "mock-model", 0.0);

        let outcome = runner.run("flaky objective").await.unwrap();
        assert_eq!(outcome.response, "worked on retry");
        // PLANNING, EXECUTING, REPLANNING(revise), EXECUTING, REPLANNING(respond)
        assert_eq!(outcome.transitions, 5);
    }

    #[tokio::test]
    async fn unknown_tool_does_not_abort_run() {
        let provider = Arc::new(SequentialMockProvider::scripted(
            vec![make_tool_call_response(
                vec![make_tool_call("nonexistent_tool", serde_json::json!({}))],
                "trying",
            )],
            vec![plan(&["use a tool"]), respond("recovered")],
        ));
        let runner = PlanRunner::new(provider, registry(), "mock-model", 0.0);

        let outcome = runner.run("objective").await.unwrap();
        assert_eq!(outcome.response, "recovered");

        let error_result = outcome
            .history
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(error_result.content.starts_with("Error:"));
    }

    #[tokio::test]
    async fn budget_exceeded_with_endless_revision() {
        // Cap of 3: PLANNING(1), EXECUTING(2), REPLANNING(3) revises, the
        // next EXECUTING attempt trips the budget.
        let provider = Arc::new(SequentialMockProvider::scripted(
            vec![make_text_response("step")],
            vec![plan(&["step one"]), revise(&["step again"])],
        ));
        let runner =
            PlanRunner::new(provider, registry(), "mock-model", 0.0).with_max_transitions(3);

        let err = runner.run("never ends").await.unwrap_err();
        match err {
            Error::Agent(AgentError::BudgetExceeded { transitions }) => {
                assert_eq!(transitions, 3);
            }
            other => panic!("expected BudgetExceeded, got {other}"),
        }
    }

    #[tokio::test]
    async fn checkpoint_evicted_on_completion() {
        let provider = Arc::new(SequentialMockProvider::scripted(
            vec![make_text_response("ok")],
            vec![plan(&["one step"]), respond("bye")],
        ));
        let runner = PlanRunner::new(provider, registry(), "mock-model", 0.0);
        let store = runner.store();

        runner.run("objective").await.unwrap();
        assert_eq!(store.live_count().await, 0);
    }

    #[tokio::test]
    async fn checkpoint_evicted_on_failure() {
        let provider = Arc::new(SequentialMockProvider::scripted(
            vec![make_text_response("step")],
            vec![plan(&["step"]), revise(&["again"])],
        ));
        let runner =
            PlanRunner::new(provider, registry(), "mock-model", 0.0).with_max_transitions(3);
        let store = runner.store();

        runner.run("objective").await.unwrap_err();
        assert_eq!(store.live_count().await, 0);
    }

    #[tokio::test]
    async fn history_is_append_only_across_the_run() {
        let provider = Arc::new(SequentialMockProvider::scripted(
            vec![
                make_text_response("one"),
                make_text_response("two"),
            ],
            vec![
                plan(&["a"]),
                revise(&["b"]),
                respond("done"),
            ],
        ));
        let runner = PlanRunner::new(provider, registry(), "mock-model", 0.0);

        let outcome = runner.run("objective").await.unwrap();
        // objective + two assistant turns survive revision
        assert_eq!(outcome.history.len(), 3);
        assert_eq!(outcome.history[1].content, "one");
        assert_eq!(outcome.history[2].content, "two");
    }
}
