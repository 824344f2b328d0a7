use thiserror::Error;

/// Supervised server lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    ShuttingDown,
    Terminated,
}

#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("invalid transition: {0:?} -> {1:?}")]
    InvalidTransition(State, State),
}

/// 수명주기 상태 머신 — 허용된 전이만 통과시킵니다.
///
/// `Running → Terminated`는 자식이 스스로 종료한 경우,
/// `Running → ShuttingDown → Terminated`는 시그널로 내려가는 경우입니다.
#[derive(Debug)]
pub struct StateMachine {
    pub state: State,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: State::Running,
        }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_transition(&self, to: &State) -> bool {
        matches!(
            (&self.state, to),
            (State::Running, State::ShuttingDown)
                | (State::Running, State::Terminated)
                | (State::ShuttingDown, State::Terminated)
        )
    }

    pub fn transition(&mut self, to: State) -> Result<(), TransitionError> {
        if self.can_transition(&to) {
            tracing::debug!("State transition: {:?} -> {:?}", self.state, to);
            self.state = to;
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition(self.state, to))
        }
    }
}
