//! Trigger state machine.

use std::fmt;

use log::info;
use serde::Serialize;

use crate::error::TriggerError;

/// A step of a trigger run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Init,
    LearnBefore,
    Skip,
    Proceed,
    ApplyChange,
    LearnAfter,
    Verify,
    Pass,
    Fail,
    Recover,
    Done,
}

impl State {
    /// States reachable in one transition.
    ///
    /// `Verify -> LearnAfter` is the retry edge of the verification poll.
    /// `ApplyChange -> Recover` and `LearnAfter -> Recover` are taken when
    /// a step errors after the recovery point was saved; `Proceed -> Done`
    /// when saving the recovery point itself fails.
    pub fn successors(self) -> &'static [State] {
        use State::*;
        match self {
            Init => &[LearnBefore],
            LearnBefore => &[Skip, Proceed, Done],
            Skip => &[Done],
            Proceed => &[ApplyChange, Done],
            ApplyChange => &[LearnAfter, Recover],
            LearnAfter => &[Verify, Recover],
            Verify => &[Pass, Fail, LearnAfter],
            Pass => &[Recover],
            Fail => &[Recover],
            Recover => &[Done],
            Done => &[],
        }
    }

    /// Check if `next` is reachable in one transition.
    pub fn can_reach(self, next: State) -> bool {
        self.successors().contains(&next)
    }

    /// Name as shown in reports, e.g. `LEARN_BEFORE`.
    pub fn name(self) -> &'static str {
        match self {
            State::Init => "INIT",
            State::LearnBefore => "LEARN_BEFORE",
            State::Skip => "SKIP",
            State::Proceed => "PROCEED",
            State::ApplyChange => "APPLY_CHANGE",
            State::LearnAfter => "LEARN_AFTER",
            State::Verify => "VERIFY",
            State::Pass => "PASS",
            State::Fail => "FAIL",
            State::Recover => "RECOVER",
            State::Done => "DONE",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One visit to a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// The state visited.
    pub state: State,

    /// Poll attempts made while in it.
    pub attempts: u32,
}

/// Tracks the current state of a run and the path taken.
#[derive(Debug, Clone)]
pub struct StateMachine {
    name: String,
    current: State,
    history: Vec<StepRecord>,
}

impl StateMachine {
    /// Start in [`State::Init`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: State::Init,
            history: vec![StepRecord {
                state: State::Init,
                attempts: 0,
            }],
        }
    }

    /// The current state.
    pub fn current(&self) -> State {
        self.current
    }

    /// Move to `next`, refusing edges the machine does not have.
    pub fn transition(&mut self, next: State) -> Result<(), TriggerError> {
        if !self.current.can_reach(next) {
            return Err(TriggerError::IllegalTransition {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }
        info!("{}: {} -> {}", self.name, self.current, next);
        self.current = next;
        self.history.push(StepRecord {
            state: next,
            attempts: 0,
        });
        Ok(())
    }

    /// Count a poll attempt in the current state.
    pub fn attempt(&mut self) {
        if let Some(record) = self.history.last_mut() {
            record.attempts += 1;
        }
    }

    /// Check if a state was ever entered.
    pub fn visited(&self, state: State) -> bool {
        self.history.iter().any(|r| r.state == state)
    }

    /// Every state entered, in order.
    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    /// Consume the machine, keeping its history.
    pub fn into_history(self) -> Vec<StepRecord> {
        self.history
    }
}
