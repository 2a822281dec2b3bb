//! Plan-execute-replan agent runtime.
//!
//! A run moves through a small state machine:
//!
//! ```text
//! PLANNING ──► EXECUTING ──► EXECUTING (next step)
//!                  │
//!                  ▼ (plan exhausted)
//!             REPLANNING ──► EXECUTING (revised plan)
//!                  │
//!                  ▼ (respond)
//!                DONE
//! ```
//!
//! The planner produces an initial step list, the executor works through it
//! one step per transition with tools bound, and the re-planner decides
//! after each pass whether to respond or revise. Every transition is
//! counted against a hard budget; runs checkpoint their state before each
//! transition so an interrupted run is inspectable.

pub mod executor;
pub mod plan;
pub mod planner;
pub mod replanner;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use executor::Executor;
pub use plan::{Action, Plan, RunState, RunStore};
pub use planner::Planner;
pub use replanner::RePlanner;
pub use runner::{PlanRunner, RunOutcome};
