use crate::session::model::{GroupingKey, MAX_WINDOW_SECS, SessionId, SessionKind};
use thiserror::Error;

/// Failures of the platform collaborator (roster lookups, message delivery).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Could not fetch the roster: {0}")]
    RosterUnavailable(String),

    #[error("Could not deliver the message: {0}")]
    DeliveryFailure(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Duration must be between 1 and {max} seconds (got {0})", max = MAX_WINDOW_SECS)]
    InvalidDuration(i64),

    #[error("Nobody is eligible to respond to this {0}")]
    EmptyRoster(SessionKind),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("{actor} is not allowed to {action}")]
    Unauthorized { actor: String, action: String },

    #[error("A {kind} session is already open for {key}")]
    SessionAlreadyOpen { kind: SessionKind, key: GroupingKey },

    #[error("Session {0} already exists")]
    DuplicateSession(SessionId),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl SessionError {
    pub fn unauthorized(actor: impl Into<String>, action: impl Into<String>) -> Self {
        SessionError::Unauthorized {
            actor: actor.into(),
            action: action.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("There is no closed session to export yet")]
    NoData,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),

    #[error("Unexpected CSV header: {0}")]
    UnexpectedHeader(String),
}
