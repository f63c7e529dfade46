//! Modifier evaluation outcome
//!
//! Flow control and "value changed" are kept apart: a modifier picks one
//! [`Action`] and separately reports whether it touched the value. An
//! aborted evaluation never reports a change.

/// What the evaluation loop does after a modifier ran
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Run the next modifier
    Continue,
    /// Stop, keep the current value
    Return,
    /// Abort the whole evaluation
    Error,
}

/// Result of one modifier step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Evaluation {
    action: Action,
    changed: bool,
}

impl Evaluation {
    /// Keep going, value untouched
    pub const CONTINUE: Evaluation = Evaluation {
        action: Action::Continue,
        changed: false,
    };

    /// Stop here, value untouched
    pub const RETURN: Evaluation = Evaluation {
        action: Action::Return,
        changed: false,
    };

    /// Abort (veto on set, last-known value on get)
    pub const ERROR: Evaluation = Evaluation {
        action: Action::Error,
        changed: false,
    };

    /// Mark the value as modified. No effect on `ERROR`.
    #[must_use]
    pub const fn changed(self) -> Evaluation {
        Evaluation {
            action: self.action,
            changed: !matches!(self.action, Action::Error),
        }
    }

    /// Continue or changed-continue depending on `changed`
    pub const fn continue_if(changed: bool) -> Evaluation {
        if changed {
            Self::CONTINUE.changed()
        } else {
            Self::CONTINUE
        }
    }

    /// The flow-control decision
    #[inline]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Whether the value was modified
    #[inline]
    pub const fn is_changed(&self) -> bool {
        self.changed
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Self::CONTINUE
    }
}
