use super::error::{StateError, StateResult};
use super::{SessionEvent, SessionState, StateTransition};

#[derive(Debug)]
pub struct StateMachine {
    state: SessionState,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    /// A new session starts out loading its photo and annotation.
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn can_transition(&self, event: SessionEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent::*;
        match (self.state, event) {
            (SessionState::Loading, Ready | Failed) => Some(SessionState::Editing),
            (SessionState::Editing, SaveRequested) => Some(SessionState::Saving),
            (SessionState::Saving, SaveSucceeded) => Some(SessionState::Closed),
            (SessionState::Saving, SaveFailed) => Some(SessionState::Editing),
            (state, Close) if state.is_open() => Some(SessionState::Closed),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: SessionEvent) -> StateResult<SessionState> {
        tracing::debug!(from = ?self.state, event = ?event, "request session transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid session transition requested");
            StateError::InvalidStateTransition { from, event }
        })?;

        let record = StateTransition::new(Some(self.state), event, next);
        self.state = next;
        self.transition_history.push(record);

        Ok(self.state)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionState::{:?}", self.state)
    }
}
