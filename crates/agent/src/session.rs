//! Session lifecycle state and the per-run session record.

use mindloop_core::error::Error;
use mindloop_core::message::SessionId;
use mindloop_core::plan::Plan;
use mindloop_memory::SessionMemory;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The closed set of lifecycle states a session moves through.
///
/// Exactly one value holds per live session at any instant. All transitions
/// pass through [`Session::transition`], which validates them against
/// [`AgentState::can_transition`] — there is no ad-hoc flag mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    Idle,
    Planning,
    Thinking,
    Executing,
    Finished,
    Error,
}

impl AgentState {
    /// Whether this state ends the run.
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentState::Finished | AgentState::Error)
    }

    /// The transition table.
    ///
    /// `Thinking -> Thinking` covers consecutive no-call rounds; any
    /// non-terminal state may fail into `Error`.
    pub fn can_transition(self, next: AgentState) -> bool {
        use AgentState::*;
        match (self, next) {
            (Finished | Error, _) => false,
            (_, Error) => true,
            (Idle, Planning) => true,
            (Planning, Thinking | Finished) => true,
            (Thinking, Executing | Thinking | Finished) => true,
            (Executing, Thinking | Finished) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentState::Idle => "Idle",
            AgentState::Planning => "Planning",
            AgentState::Thinking => "Thinking",
            AgentState::Executing => "Executing",
            AgentState::Finished => "Finished",
            AgentState::Error => "Error",
        };
        f.write_str(name)
    }
}

/// One bounded agent run: lifecycle state, the compiled plan, the bounded
/// memory window, and the step counter.
///
/// Sessions are created per run and conceptually destroyed once terminal —
/// durable history is the persistence collaborator's job.
pub struct Session {
    pub id: SessionId,
    state: AgentState,
    pub plan: Option<Plan>,
    pub memory: SessionMemory,
    pub step_count: u32,
}

impl Session {
    /// Create an idle session seeded with the agent's system prompt.
    pub fn new(id: SessionId, system_prompt: &str, max_messages: usize) -> Self {
        Self {
            id,
            state: AgentState::Idle,
            plan: None,
            memory: SessionMemory::new(system_prompt, max_messages),
            step_count: 0,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Move to the next lifecycle state, validating against the table.
    pub fn transition(&mut self, next: AgentState) -> Result<(), Error> {
        if !self.state.can_transition(next) {
            return Err(Error::InvalidState(self.state.to_string()));
        }
        debug!(session_id = %self.id, from = %self.state, to = %next, "State transition");
        self.state = next;
        Ok(())
    }

    /// Force the terminal `Error` state.
    ///
    /// Used by the controller when a run fails: a failure is terminal no
    /// matter which state the run had reached, including a failure while
    /// closing out an already-Finished run.
    pub(crate) fn fail(&mut self) {
        debug!(session_id = %self.id, from = %self.state, "Session failed");
        self.state = AgentState::Error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AgentState::*;

    #[test]
    fn valid_transitions() {
        for (from, to) in [
            (Idle, Planning),
            (Planning, Thinking),
            (Planning, Finished),
            (Thinking, Executing),
            (Thinking, Thinking),
            (Thinking, Finished),
            (Executing, Thinking),
            (Executing, Finished),
            (Idle, Error),
            (Planning, Error),
            (Thinking, Error),
            (Executing, Error),
        ] {
            assert!(from.can_transition(to), "{from} -> {to} should be legal");
        }
    }

    #[test]
    fn invalid_transitions() {
        for (from, to) in [
            (Idle, Thinking),
            (Idle, Executing),
            (Idle, Finished),
            (Planning, Executing),
            (Executing, Executing),
            (Finished, Planning),
            (Finished, Error),
            (Error, Planning),
            (Error, Finished),
        ] {
            assert!(!from.can_transition(to), "{from} -> {to} should be illegal");
        }
    }

    #[test]
    fn terminal_states() {
        assert!(Finished.is_terminal());
        assert!(Error.is_terminal());
        assert!(!Idle.is_terminal());
        assert!(!Thinking.is_terminal());
    }

    #[test]
    fn session_starts_idle_with_seeded_memory() {
        let session = Session::new(SessionId::from("s1"), "prompt", 10);
        assert_eq!(session.state(), Idle);
        assert!(session.plan.is_none());
        assert_eq!(session.step_count, 0);
        assert_eq!(session.memory.len(), 1);
    }

    #[test]
    fn transition_rejects_illegal_move_and_keeps_state() {
        let mut session = Session::new(SessionId::from("s1"), "prompt", 10);
        let err = session.transition(Executing).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(session.state(), Idle);
    }

    #[test]
    fn fail_is_terminal_from_anywhere() {
        let mut session = Session::new(SessionId::from("s1"), "prompt", 10);
        session.transition(Planning).unwrap();
        session.transition(Finished).unwrap();
        session.fail();
        assert_eq!(session.state(), Error);
    }
}
