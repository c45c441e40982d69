//! # mindloop Agent
//!
//! The per-session orchestration loop: one run compiles a plan, then
//! alternates decision (think) and execution (execute) rounds under a step
//! budget, streaming progress to the session's one subscriber and always
//! terminating in `Finished` or `Error`.
//!
//! The pieces compose as follows:
//! - [`session::Session`] owns the lifecycle state, plan, bounded memory,
//!   and step counter; every state change goes through its transition table.
//! - [`planner::PlanCompiler`] turns the user's request into a plan or a
//!   direct-answer decision with exactly one model call.
//! - [`engine::DecisionEngine`] proposes the next action each round.
//! - [`dispatch::ToolDispatcher`] runs proposed tool calls sequentially and
//!   rebuilds memory wholesale from the round's transcript.
//! - [`controller::AgentLoopController`] drives the state machine.
//! - [`runner`] holds the agent profile, the session factory, and the
//!   asynchronous run trigger.

pub mod controller;
pub mod dispatch;
pub mod engine;
pub mod model;
pub mod planner;
pub mod runner;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use controller::AgentLoopController;
pub use dispatch::{DispatchOutcome, ToolDispatcher};
pub use engine::{Decision, DecisionEngine};
pub use model::ModelSettings;
pub use planner::{PlanCompiler, PlanOutcome};
pub use runner::{AgentProfile, ChatEvent, SessionFactory, spawn_run};
pub use session::{AgentState, Session};
