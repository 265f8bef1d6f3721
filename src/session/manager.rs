use crate::session::auth::{Actor, AuthorizationPolicy};
use crate::session::clock::{SessionClock, TimerOutcome};
use crate::session::collector::ResponseCollector;
use crate::session::error::SessionError;
use crate::session::model::{
    GroupingKey, OpenSession, Participant, ReconciliationResult, Session, SessionDuration, SessionId, SessionKind,
};
use crate::session::roster::{RosterFilter, RosterProvider};
use crate::session::store::SessionStore;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

pub const MAX_OPTIONS: usize = 10;

/// Opens timed collection windows and closes them when their clock expires.
///
/// Closed sessions are reconciled against their roster snapshot and the
/// result is sent on the channel returned by [`SessionManager::new`].
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<Mutex<SessionStore>>,
    clock: Arc<dyn SessionClock>,
    policy: AuthorizationPolicy,
    offset: FixedOffset,
    reports: mpsc::UnboundedSender<ReconciliationResult>,
}

impl SessionManager {
    pub fn new(
        store: SessionStore,
        clock: Arc<dyn SessionClock>,
        policy: AuthorizationPolicy,
        offset: FixedOffset,
    ) -> (Self, mpsc::UnboundedReceiver<ReconciliationResult>) {
        let (reports, receiver) = mpsc::unbounded_channel();
        let manager = Self {
            inner: Arc::new(Inner {
                store: Arc::new(Mutex::new(store)),
                clock,
                policy,
                offset,
                reports,
            }),
        };
        (manager, receiver)
    }

    pub fn collector(&self) -> ResponseCollector {
        ResponseCollector::new(self.inner.store.clone())
    }

    pub fn policy(&self) -> &AuthorizationPolicy {
        &self.inner.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        self.inner.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn grouping_key(&self, kind: SessionKind, id: SessionId, created_at: DateTime<Utc>) -> GroupingKey {
        match kind {
            SessionKind::Attendance => GroupingKey::Day(created_at.with_timezone(&self.inner.offset).date_naive()),
            SessionKind::Quiz | SessionKind::FeedbackPoll => GroupingKey::Session(id),
        }
    }

    /// Checks that `actor` could open a session of `kind` right now, without
    /// creating anything. Lets command handlers fail before posting a prompt.
    pub fn preflight(&self, actor: &Actor, kind: SessionKind, duration: SessionDuration) -> Result<(), SessionError> {
        self.inner.policy.authorize(actor, &format!("start a {}", kind))?;
        if !duration.is_valid() {
            return Err(SessionError::InvalidDuration(duration.as_secs()));
        }

        if kind == SessionKind::Attendance {
            let key = self.grouping_key(kind, SessionId(0), self.inner.clock.now());
            if self.store().find_open(kind, key).is_some() {
                return Err(SessionError::SessionAlreadyOpen { kind, key });
            }
        }
        Ok(())
    }

    pub fn open_session(&self, actor: &Actor, request: OpenSession) -> Result<SessionId, SessionError> {
        self.inner
            .policy
            .authorize(actor, &format!("start a {}", request.kind))?;
        validate_request(&request)?;

        let id = request.id;
        let kind = request.kind;
        let duration = request.duration;
        let created_at = self.inner.clock.now();
        let key = self.grouping_key(kind, id, created_at);

        {
            let mut store = self.store();
            if store.contains(id) {
                return Err(SessionError::DuplicateSession(id));
            }
            if store.find_open(kind, key).is_some() {
                return Err(SessionError::SessionAlreadyOpen { kind, key });
            }

            let session = Session::new(request, created_at, key);
            tracing::info!(
                "Opened {} session {} for {} participants, closing in {}s ({} already open)",
                kind,
                id,
                session.roster().len(),
                session.duration.as_secs(),
                store.open_count()
            );
            store.insert(session);

            let (handle, countdown) = self.inner.clock.start(duration);
            store.attach_timer(id, handle);

            let manager = self.clone();
            tokio::spawn(async move {
                match countdown.wait().await {
                    TimerOutcome::Elapsed => {
                        manager.expire(id);
                    }
                    TimerOutcome::Cancelled => {
                        tracing::info!("Timer for session {} was cancelled", id);
                    }
                }
            });
        }

        Ok(id)
    }

    /// Authorizes, then pulls the roster for a session of `kind` from
    /// `provider`. Call before posting the prompt so that `open_session` can
    /// follow the post without awaiting.
    pub async fn fetch_roster(
        &self,
        actor: &Actor,
        kind: SessionKind,
        provider: &dyn RosterProvider,
        filter: &RosterFilter,
    ) -> Result<Vec<Participant>, SessionError> {
        self.inner.policy.authorize(actor, &format!("start a {}", kind))?;
        let roster = provider.request_roster(filter).await?;
        if roster.is_empty() {
            return Err(SessionError::EmptyRoster(kind));
        }
        Ok(roster)
    }

    fn expire(&self, id: SessionId) -> Option<ReconciliationResult> {
        let result = {
            let mut store = self.store();
            store.take_timer(id);
            let result = store.get_mut(id).and_then(|session| session.close())?;
            let evicted = store.evict();
            if evicted > 0 {
                tracing::debug!("Evicted {} closed sessions, {} retained", evicted, store.len());
            }
            result
        };

        tracing::info!(
            "Closed {} session {}: {} responded, {} absent",
            result.kind,
            id,
            result.responded.len(),
            result.absent.len()
        );

        if self.inner.reports.send(result.clone()).is_err() {
            tracing::warn!("No report listener for session {}", id);
        }
        Some(result)
    }

    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.store().get(id).cloned()
    }

    pub fn closed_sessions(&self, kind: SessionKind) -> Vec<Session> {
        self.store().closed(kind)
    }

    #[cfg(test)]
    pub fn open_count(&self) -> usize {
        self.store().open_count()
    }
}

fn validate_request(request: &OpenSession) -> Result<(), SessionError> {
    if !request.duration.is_valid() {
        return Err(SessionError::InvalidDuration(request.duration.as_secs()));
    }
    if request.roster.is_empty() {
        return Err(SessionError::EmptyRoster(request.kind));
    }
    if request.kind.uses_choices() {
        let count = request.options.len();
        if !(2..=MAX_OPTIONS).contains(&count) {
            return Err(SessionError::InvalidOptions(format!(
                "between 2 and {} options are required (got {})",
                MAX_OPTIONS, count
            )));
        }
        if request.options.iter().any(|option| option.trim().is_empty()) {
            return Err(SessionError::InvalidOptions("options must not be blank".into()));
        }
        if let Some(answer) = request.answer {
            if answer >= count {
                return Err(SessionError::InvalidOptions(format!(
                    "answer {} is not one of the {} options",
                    answer + 1,
                    count
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;
    use crate::session::collector::{IgnoreReason, RecordOutcome};
    use crate::session::error::PlatformError;
    use crate::session::model::{ChannelKey, MAX_WINDOW_SECS, ParticipantId, Response};
    use crate::session::store::RetentionPolicy;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn teacher() -> Actor {
        Actor::new(100, "tess", false, vec!["Teacher".into()])
    }

    fn student() -> Actor {
        Actor::new(1, "alice", false, vec!["Student".into()])
    }

    fn roster() -> Vec<Participant> {
        vec![
            Participant::new(1, "A"),
            Participant::new(2, "B"),
            Participant::new(3, "C"),
        ]
    }

    fn setup(
        retention: RetentionPolicy,
    ) -> (SessionManager, Arc<ManualClock>, mpsc::UnboundedReceiver<ReconciliationResult>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()));
        let (manager, reports) = SessionManager::new(
            SessionStore::new(retention),
            clock.clone(),
            AuthorizationPolicy::role_any_of(["teacher", "ta"]),
            FixedOffset::east_opt(0).unwrap(),
        );
        (manager, clock, reports)
    }

    fn attendance(id: u64, secs: i64) -> OpenSession {
        OpenSession::attendance(SessionId(id), SessionDuration::from_secs(secs), roster(), ChannelKey(5))
    }

    #[tokio::test]
    async fn responders_and_absentees_are_reconciled_on_expiry() {
        let (manager, clock, mut reports) = setup(RetentionPolicy::KeepAll);
        let collector = manager.collector();
        manager.open_session(&teacher(), attendance(1, 5)).unwrap();

        clock.advance(2);
        assert_eq!(
            collector.record_response(SessionId(1), ParticipantId(2), Response::Present),
            RecordOutcome::Recorded
        );
        collector.record_response(SessionId(1), ParticipantId(3), Response::Present);
        assert_eq!(
            collector.record_response(SessionId(1), ParticipantId(3), Response::Present),
            RecordOutcome::Ignored(IgnoreReason::AlreadyResponded)
        );

        clock.advance(3);
        let result = reports.recv().await.unwrap();
        assert_eq!(result.responded_ids(), vec![ParticipantId(2), ParticipantId(3)]);
        assert_eq!(result.absent_ids(), vec![ParticipantId(1)]);
        assert_eq!(manager.open_count(), 0);
    }

    #[tokio::test]
    async fn zero_duration_creates_nothing() {
        let (manager, clock, _reports) = setup(RetentionPolicy::KeepAll);
        let err = manager.open_session(&teacher(), attendance(1, 0)).unwrap_err();

        assert!(matches!(err, SessionError::InvalidDuration(0)));
        assert!(manager.session(SessionId(1)).is_none());
        assert_eq!(clock.pending_timers(), 0);
    }

    #[tokio::test]
    async fn preflight_checks_duration_and_actor() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        assert!(matches!(
            manager.preflight(&teacher(), SessionKind::Quiz, SessionDuration::from_secs(0)),
            Err(SessionError::InvalidDuration(0))
        ));
        assert!(matches!(
            manager.preflight(&student(), SessionKind::Quiz, SessionDuration::from_secs(30)),
            Err(SessionError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn negative_duration_is_rejected() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        let err = manager.open_session(&teacher(), attendance(1, -30)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidDuration(-30)));
    }

    #[tokio::test]
    async fn empty_roster_is_rejected() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        let mut request = attendance(1, 5);
        request.roster.clear();

        let err = manager.open_session(&teacher(), request).unwrap_err();
        assert!(matches!(err, SessionError::EmptyRoster(SessionKind::Attendance)));
    }

    #[tokio::test]
    async fn students_cannot_open_sessions() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        let err = manager.open_session(&student(), attendance(1, 5)).unwrap_err();

        assert!(matches!(err, SessionError::Unauthorized { .. }));
        assert!(manager.session(SessionId(1)).is_none());
    }

    #[tokio::test]
    async fn second_attendance_on_same_day_is_rejected() {
        let (manager, clock, mut reports) = setup(RetentionPolicy::KeepAll);
        manager.open_session(&teacher(), attendance(1, 60)).unwrap();

        let err = manager.open_session(&teacher(), attendance(2, 60)).unwrap_err();
        assert!(matches!(err, SessionError::SessionAlreadyOpen { kind: SessionKind::Attendance, .. }));
        assert!(manager.preflight(&teacher(), SessionKind::Attendance, SessionDuration::from_secs(60)).is_err());

        // Once the first one closes the day is free again.
        clock.advance(60);
        reports.recv().await.unwrap();
        assert!(manager.preflight(&teacher(), SessionKind::Attendance, SessionDuration::from_secs(60)).is_ok());
        manager.open_session(&teacher(), attendance(2, 60)).unwrap();
    }

    #[tokio::test]
    async fn quizzes_may_overlap() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        for id in [1, 2] {
            let request = OpenSession::choices(
                SessionId(id),
                SessionKind::Quiz,
                SessionDuration::from_secs(30),
                roster(),
                vec!["yes".into(), "no".into()],
                Some(0),
                ChannelKey(5),
            );
            manager.open_session(&teacher(), request).unwrap();
        }
        assert_eq!(manager.open_count(), 2);
    }

    #[tokio::test]
    async fn reused_session_id_is_rejected() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        let poll = |id| {
            OpenSession::choices(
                SessionId(id),
                SessionKind::FeedbackPoll,
                SessionDuration::from_secs(30),
                roster(),
                vec!["good".into(), "bad".into()],
                None,
                ChannelKey(5),
            )
        };
        manager.open_session(&teacher(), poll(1)).unwrap();
        let err = manager.open_session(&teacher(), poll(1)).unwrap_err();
        assert!(matches!(err, SessionError::DuplicateSession(SessionId(1))));
    }

    #[tokio::test]
    async fn quiz_options_are_validated() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        let quiz = |options: Vec<&str>, answer| {
            OpenSession::choices(
                SessionId(1),
                SessionKind::Quiz,
                SessionDuration::from_secs(30),
                roster(),
                options.into_iter().map(String::from).collect(),
                answer,
                ChannelKey(5),
            )
        };

        assert!(matches!(
            manager.open_session(&teacher(), quiz(vec!["only"], None)),
            Err(SessionError::InvalidOptions(_))
        ));
        assert!(matches!(
            manager.open_session(&teacher(), quiz(vec!["yes", " "], None)),
            Err(SessionError::InvalidOptions(_))
        ));
        assert!(matches!(
            manager.open_session(&teacher(), quiz(vec!["yes", "no"], Some(2))),
            Err(SessionError::InvalidOptions(_))
        ));
    }

    #[tokio::test]
    async fn late_response_is_not_in_result() {
        let (manager, clock, mut reports) = setup(RetentionPolicy::KeepAll);
        let collector = manager.collector();
        manager.open_session(&teacher(), attendance(1, 5)).unwrap();

        collector.record_response(SessionId(1), ParticipantId(1), Response::Present);
        clock.advance(5);
        let result = reports.recv().await.unwrap();

        assert_eq!(
            collector.record_response(SessionId(1), ParticipantId(2), Response::Present),
            RecordOutcome::Ignored(IgnoreReason::SessionClosed)
        );
        assert_eq!(result.responded_ids(), vec![ParticipantId(1)]);
        let stored = manager.session(SessionId(1)).unwrap();
        assert_eq!(stored.response_count(), 1);
    }

    #[tokio::test]
    async fn responses_never_exceed_roster() {
        let (manager, clock, mut reports) = setup(RetentionPolicy::KeepAll);
        let collector = manager.collector();
        manager.open_session(&teacher(), attendance(1, 5)).unwrap();

        for participant in 0..20 {
            for _ in 0..3 {
                collector.record_response(SessionId(1), ParticipantId(participant), Response::Present);
            }
        }
        assert_eq!(manager.session(SessionId(1)).unwrap().response_count(), 3);

        clock.advance(5);
        let result = reports.recv().await.unwrap();
        assert_eq!(result.responded.len(), 3);
        assert!(result.absent.is_empty());
    }

    #[tokio::test]
    async fn retention_keeps_only_recent_closed_sessions() {
        let (manager, clock, mut reports) = setup(RetentionPolicy::KeepLast(1));
        let poll = |id| {
            OpenSession::choices(
                SessionId(id),
                SessionKind::FeedbackPoll,
                SessionDuration::from_secs(10),
                roster(),
                vec!["good".into(), "bad".into()],
                None,
                ChannelKey(5),
            )
        };
        manager.open_session(&teacher(), poll(1)).unwrap();
        clock.advance(10);
        reports.recv().await.unwrap();
        manager.open_session(&teacher(), poll(2)).unwrap();
        clock.advance(10);
        reports.recv().await.unwrap();

        let ids: Vec<_> = manager
            .closed_sessions(SessionKind::FeedbackPoll)
            .iter()
            .map(|session| session.id)
            .collect();
        assert_eq!(ids, vec![SessionId(2)]);
    }

    struct FixedRoster {
        calls: AtomicUsize,
        result: Result<Vec<Participant>, PlatformError>,
    }

    #[async_trait]
    impl RosterProvider for FixedRoster {
        async fn request_roster(&self, _filter: &RosterFilter) -> Result<Vec<Participant>, PlatformError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn roster_is_pulled_from_provider() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        let provider = FixedRoster {
            calls: AtomicUsize::new(0),
            result: Ok(vec![Participant::new(7, "G")]),
        };

        let fetched = manager
            .fetch_roster(&teacher(), SessionKind::Attendance, &provider, &RosterFilter::with_role("student"))
            .await
            .unwrap();
        let mut request = attendance(1, 5);
        request.roster = fetched;
        manager.open_session(&teacher(), request).unwrap();

        let session = manager.session(SessionId(1)).unwrap();
        assert_eq!(session.roster(), &[Participant::new(7, "G")]);
    }

    #[tokio::test]
    async fn reaction_right_after_opening_is_recorded() {
        let (manager, clock, mut reports) = setup(RetentionPolicy::KeepAll);
        let collector = manager.collector();
        let provider = FixedRoster {
            calls: AtomicUsize::new(0),
            result: Ok(roster()),
        };

        // Roster first, then the prompt id is known and the session opens
        // with no await in between.
        let fetched = manager
            .fetch_roster(&teacher(), SessionKind::Attendance, &provider, &RosterFilter::AllHumans)
            .await
            .unwrap();
        let mut request = attendance(42, 5);
        request.roster = fetched;
        manager.open_session(&teacher(), request).unwrap();
        assert_eq!(
            collector.record_response(SessionId(42), ParticipantId(1), Response::Present),
            RecordOutcome::Recorded
        );

        clock.advance(5);
        let result = reports.recv().await.unwrap();
        assert_eq!(result.responded_ids(), vec![ParticipantId(1)]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_fetched_roster_is_rejected_before_anything_is_posted() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        let provider = FixedRoster {
            calls: AtomicUsize::new(0),
            result: Ok(Vec::new()),
        };

        let err = manager
            .fetch_roster(&teacher(), SessionKind::Quiz, &provider, &RosterFilter::AllHumans)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyRoster(SessionKind::Quiz)));
    }

    #[tokio::test]
    async fn oversized_duration_is_rejected() {
        let (manager, clock, _reports) = setup(RetentionPolicy::KeepAll);
        for secs in [MAX_WINDOW_SECS + 1, 10_000_000_000_000, i64::MAX] {
            assert!(matches!(
                manager.preflight(&teacher(), SessionKind::Quiz, SessionDuration::from_secs(secs)),
                Err(SessionError::InvalidDuration(got)) if got == secs
            ));
            let err = manager.open_session(&teacher(), attendance(1, secs)).unwrap_err();
            assert!(matches!(err, SessionError::InvalidDuration(got) if got == secs));
        }
        assert!(manager.session(SessionId(1)).is_none());
        assert_eq!(clock.pending_timers(), 0);

        manager.open_session(&teacher(), attendance(1, MAX_WINDOW_SECS)).unwrap();
        assert_eq!(clock.pending_timers(), 1);
    }

    #[tokio::test]
    async fn unauthorized_actor_never_reaches_provider() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        let provider = FixedRoster {
            calls: AtomicUsize::new(0),
            result: Ok(roster()),
        };

        let err = manager
            .fetch_roster(&student(), SessionKind::Attendance, &provider, &RosterFilter::AllHumans)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Unauthorized { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_propagated() {
        let (manager, _clock, _reports) = setup(RetentionPolicy::KeepAll);
        let provider = FixedRoster {
            calls: AtomicUsize::new(0),
            result: Err(PlatformError::RosterUnavailable("gateway down".into())),
        };

        let err = manager
            .fetch_roster(&teacher(), SessionKind::Attendance, &provider, &RosterFilter::AllHumans)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Platform(PlatformError::RosterUnavailable(_))));
        assert!(manager.session(SessionId(1)).is_none());
    }
}
