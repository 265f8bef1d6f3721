//! Timed collection windows (attendance checks, quizzes, feedback polls) and
//! their reconciliation against a roster snapshot.

pub mod auth;
pub mod clock;
pub mod collector;
pub mod delivery;
pub mod error;
pub mod manager;
pub mod model;
pub mod reporter;
pub mod roster;
pub mod store;

pub use auth::{Actor, AuthorizationPolicy};
pub use clock::TokioClock;
pub use error::{PlatformError, ReportError};
pub use manager::SessionManager;
pub use model::{
    ChannelKey, OpenSession, Participant, ParticipantId, Response, SessionDuration, SessionId, SessionKind,
};
pub use reporter::Reporter;
pub use store::{RetentionPolicy, SessionStore};
