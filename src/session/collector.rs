use crate::session::model::{ParticipantId, Response, SessionId};
use crate::session::store::SessionStore;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownSession,
    SessionClosed,
    AlreadyResponded,
    NotOnRoster,
    PayloadMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    Ignored(IgnoreReason),
}

/// Inbound edge of the session core. Cheap to clone; every clone writes into
/// the same store.
#[derive(Clone)]
pub struct ResponseCollector {
    store: Arc<Mutex<SessionStore>>,
}

impl ResponseCollector {
    pub(crate) fn new(store: Arc<Mutex<SessionStore>>) -> Self {
        Self { store }
    }

    /// Records `payload` for `participant` if the session is open and the
    /// participant is on its roster. Everything else is a silent no-op.
    pub fn record_response(
        &self,
        session_id: SessionId,
        participant: ParticipantId,
        payload: Response,
    ) -> RecordOutcome {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());

        let Some(session) = store.get_mut(session_id) else {
            return RecordOutcome::Ignored(IgnoreReason::UnknownSession);
        };
        if !session.is_open() {
            return RecordOutcome::Ignored(IgnoreReason::SessionClosed);
        }
        if !session.is_eligible(participant) {
            return RecordOutcome::Ignored(IgnoreReason::NotOnRoster);
        }
        if !session.accepts(payload) {
            return RecordOutcome::Ignored(IgnoreReason::PayloadMismatch);
        }
        if !session.insert_response(participant, payload) {
            return RecordOutcome::Ignored(IgnoreReason::AlreadyResponded);
        }

        RecordOutcome::Recorded
    }

    /// Entry point for platform reaction events.
    pub fn on_response_event(&self, session_id: SessionId, participant: ParticipantId, payload: Response) {
        match self.record_response(session_id, participant, payload) {
            RecordOutcome::Recorded => {
                tracing::debug!("Recorded {:?} from {:?} for session {}", payload, participant, session_id);
            }
            RecordOutcome::Ignored(reason) => {
                tracing::debug!("Ignored response from {:?} for session {}: {:?}", participant, session_id, reason);
            }
        }
    }
}
