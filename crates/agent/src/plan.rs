//! Plans, re-planning actions, and run state.
//!
//! A [`Plan`] is a non-empty ordered list of step descriptions; emptiness
//! is rejected at construction so the executor never faces a stepless
//! plan. [`RunState`] is the full mutable state of one run: replacing the
//! plan is atomic and resets the cursor, the history only ever grows.

use newsbrief_core::error::{AgentError, ProviderError};
use newsbrief_core::message::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A non-empty, ordered list of plan steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan(Vec<String>);

impl Plan {
    /// Build a plan, rejecting an empty step list.
    pub fn try_new(steps: Vec<String>) -> Result<Self, AgentError> {
        let steps: Vec<String> = steps
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if steps.is_empty() {
            return Err(AgentError::EmptyPlan);
        }
        Ok(Self(steps))
    }

    pub fn steps(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(|s| s.as_str())
    }

    /// Render the plan as a numbered list.
    pub fn render(&self) -> String {
        self.0
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {step}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// JSON schema for a structured plan response.
    pub fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "steps": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Different steps to follow, in sorted order"
                }
            },
            "required": ["steps"],
            "additionalProperties": false
        })
    }

    /// Decode a plan from a structured-output value.
    ///
    /// A value without the expected shape is a provider protocol violation;
    /// a well-shaped but empty plan is an agent error.
    pub fn from_value(value: serde_json::Value) -> Result<Self, newsbrief_core::Error> {
        #[derive(Deserialize)]
        struct Payload {
            steps: Vec<String>,
        }

        let payload: Payload =
            serde_json::from_value(value.clone()).map_err(|_| ProviderError::SchemaMismatch {
                raw: value.to_string(),
            })?;
        Ok(Self::try_new(payload.steps)?)
    }
}

/// The re-planner's verdict: finish with a response, or carry on with a
/// revised plan.
#[derive(Debug, Clone)]
pub enum Action {
    /// The objective is satisfied; this is the user-facing response.
    Respond(String),
    /// More work remains; replace the plan with these steps.
    Revise(Plan),
}

impl Action {
    /// JSON schema for a structured re-planning response.
    pub fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["respond", "revise"],
                    "description": "Whether to respond to the user or revise the plan"
                },
                "response": {
                    "type": "string",
                    "description": "Final response to the user (when action is respond)"
                },
                "steps": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Remaining steps (when action is revise)"
                }
            },
            "required": ["action"],
            "additionalProperties": false
        })
    }

    /// Decode an action from a structured-output value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, newsbrief_core::Error> {
        let mismatch = || ProviderError::SchemaMismatch {
            raw: value.to_string(),
        };

        match value["action"].as_str() {
            Some("respond") => {
                let response = value["response"].as_str().ok_or_else(mismatch)?;
                Ok(Action::Respond(response.to_string()))
            }
            Some("revise") => {
                let steps: Vec<String> = value["steps"]
                    .as_array()
                    .ok_or_else(mismatch)?
                    .iter()
                    .map(|s| s.as_str().map(String::from).ok_or_else(mismatch))
                    .collect::<Result<_, _>>()?;
                Ok(Action::Revise(Plan::try_new(steps)?))
            }
            _ => Err(mismatch().into()),
        }
    }
}

/// The full mutable state of one agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub objective: String,
    pub plan: Plan,
    /// Append-only conversation history
    pub history: Vec<Message>,
    /// Index of the next plan step to execute
    pub cursor: usize,
    /// Final response, set exactly once when the run completes
    pub response: Option<String>,
    /// Transitions consumed so far
    pub transitions: u32,
}

impl RunState {
    /// A fresh run with a placeholder single-step plan; the planner
    /// replaces it before execution.
    pub fn new(objective: impl Into<String>) -> Self {
        let objective = objective.into();
        Self {
            run_id: Uuid::new_v4().to_string(),
            plan: Plan(vec![objective.clone()]),
            history: vec![Message::user(objective.clone())],
            objective,
            cursor: 0,
            response: None,
            transitions: 0,
        }
    }

    /// Replace the plan wholesale and reset the cursor.
    pub fn replace_plan(&mut self, plan: Plan) {
        self.plan = plan;
        self.cursor = 0;
    }

    /// The step the executor works on next, if any remain.
    pub fn current_step(&self) -> Option<&str> {
        self.plan.get(self.cursor)
    }

    pub fn plan_exhausted(&self) -> bool {
        self.cursor >= self.plan.len()
    }
}

/// Checkpoint store for in-flight runs.
///
/// Runs checkpoint before every transition and are evicted on terminal
/// states, so the store only ever holds live runs.
pub struct RunStore {
    runs: RwLock<HashMap<String, RunState>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn checkpoint(&self, state: &RunState) {
        let mut runs = self.runs.write().await;
        runs.insert(state.run_id.clone(), state.clone());
    }

    pub async fn get(&self, run_id: &str) -> Result<RunState, AgentError> {
        let runs = self.runs.read().await;
        runs.get(run_id)
            .cloned()
            .ok_or_else(|| AgentError::RunNotFound(run_id.to_string()))
    }

    pub async fn remove(&self, run_id: &str) {
        let mut runs = self.runs.write().await;
        runs.remove(run_id);
    }

    pub async fn live_count(&self) -> usize {
        let runs = self.runs.read().await;
        runs.len()
    }
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new()
    }
}
