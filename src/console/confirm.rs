//! Confirm-before-write protocol for status toggles.
//!
//! `Idle → ConfirmPending → Mutating → Succeeded | Failed`. Cancelling a
//! pending confirmation never touches the network, and a confirmation that
//! arrives while a write is running is refused.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::notify::Notifier;
use crate::client::ClientError;
use crate::models::{PlanStatus, StatusFilter, UserStatus};
use crate::query::MutationError;

pub const FALLBACK_FAILURE: &str = "Failed to update status";

/// A status with exactly two states the operator can flip between.
pub trait Toggleable: StatusFilter + PartialEq + Send + Sync {
    /// Entity noun used in notifications.
    const NOUN: &'static str;

    fn toggled(self) -> Self;
    fn applied_verb(self) -> &'static str;
}

impl Toggleable for UserStatus {
    const NOUN: &'static str = "User";

    fn toggled(self) -> Self {
        UserStatus::toggled(self)
    }

    fn applied_verb(self) -> &'static str {
        UserStatus::applied_verb(self)
    }
}

impl Toggleable for PlanStatus {
    const NOUN: &'static str = "Plan";

    fn toggled(self) -> Self {
        PlanStatus::toggled(self)
    }

    fn applied_verb(self) -> &'static str {
        PlanStatus::applied_verb(self)
    }
}

/// The row the operator clicked, copied at request time.
#[derive(Debug, Clone, PartialEq)]
pub struct Target<S> {
    pub id: String,
    pub name: String,
    pub current: S,
}

impl<S: Toggleable> Target<S> {
    pub fn new(id: impl Into<String>, name: impl Into<String>, current: S) -> Self {
        Target {
            id: id.into(),
            name: name.into(),
            current,
        }
    }

    pub fn next(&self) -> S {
        self.current.toggled()
    }

    pub fn prompt(&self) -> String {
        format!(
            "Change status of \"{}\" to {}?",
            self.name,
            self.next().as_str().to_uppercase()
        )
    }

    pub fn success_message(&self) -> String {
        format!(
            "{} {} {} successfully",
            S::NOUN,
            self.name,
            self.next().applied_verb()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmState<S> {
    Idle,
    ConfirmPending(Target<S>),
    Mutating(Target<S>),
    Succeeded(Target<S>),
    Failed { target: Target<S>, message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("There is nothing waiting for confirmation")]
    NothingPending,

    #[error("A status change is already in progress")]
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    ConfirmPending,
    Mutating,
    Succeeded,
    Failed,
}

/// Serializable picture of the dialog.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmView {
    pub phase: Phase,
    pub target_id: Option<String>,
    pub target_name: Option<String>,
    pub prompt: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct StatusToggle<S> {
    state: ConfirmState<S>,
}

impl<S: Toggleable> Default for StatusToggle<S> {
    fn default() -> Self {
        StatusToggle {
            state: ConfirmState::Idle,
        }
    }
}

impl<S: Toggleable> StatusToggle<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConfirmState<S> {
        &self.state
    }

    pub fn is_mutating(&self) -> bool {
        matches!(self.state, ConfirmState::Mutating(_))
    }

    /// Opens the dialog for `target`, replacing any unconfirmed request.
    pub fn request(&mut self, target: Target<S>) -> Result<String, ConfirmError> {
        if self.is_mutating() {
            return Err(ConfirmError::InProgress);
        }
        let prompt = target.prompt();
        self.state = ConfirmState::ConfirmPending(target);
        Ok(prompt)
    }

    /// Closes a pending dialog. Returns false when there was none.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            ConfirmState::ConfirmPending(_) => {
                self.state = ConfirmState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Moves to `Mutating` and hands out the target to write.
    pub fn confirm(&mut self) -> Result<Target<S>, ConfirmError> {
        match std::mem::replace(&mut self.state, ConfirmState::Idle) {
            ConfirmState::ConfirmPending(target) => {
                self.state = ConfirmState::Mutating(target.clone());
                Ok(target)
            }
            ConfirmState::Mutating(target) => {
                self.state = ConfirmState::Mutating(target);
                Err(ConfirmError::InProgress)
            }
            other => {
                self.state = other;
                Err(ConfirmError::NothingPending)
            }
        }
    }

    /// Records the write's outcome and emits the matching notification.
    /// Outcomes arriving in any state other than `Mutating` are ignored.
    pub fn settle(&mut self, result: &Result<Value, MutationError>, notifier: &Notifier) {
        let ConfirmState::Mutating(target) = std::mem::replace(&mut self.state, ConfirmState::Idle)
        else {
            return;
        };
        self.state = match result {
            Ok(_) => {
                notifier.success(target.success_message());
                ConfirmState::Succeeded(target)
            }
            Err(err) => {
                let message = failure_message(err);
                notifier.error(message.clone());
                ConfirmState::Failed { target, message }
            }
        };
    }

    pub fn view(&self) -> ConfirmView {
        let (phase, target, error) = match &self.state {
            ConfirmState::Idle => (Phase::Idle, None, None),
            ConfirmState::ConfirmPending(t) => (Phase::ConfirmPending, Some(t), None),
            ConfirmState::Mutating(t) => (Phase::Mutating, Some(t), None),
            ConfirmState::Succeeded(t) => (Phase::Succeeded, Some(t), None),
            ConfirmState::Failed { target, message } => {
                (Phase::Failed, Some(target), Some(message.clone()))
            }
        };
        ConfirmView {
            phase,
            target_id: target.map(|t| t.id.clone()),
            target_name: target.map(|t| t.name.clone()),
            prompt: match phase {
                Phase::ConfirmPending | Phase::Mutating => target.map(Target::prompt),
                _ => None,
            },
            error,
        }
    }
}

/// Backend message verbatim, or the generic text when it sent none.
pub fn failure_message(err: &MutationError) -> String {
    match err {
        MutationError::Client(ClientError::Rejected { message, .. }) if message.trim().is_empty() => {
            FALLBACK_FAILURE.to_string()
        }
        other => other.user_message(),
    }
}
