use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifier of a session. The bot uses the id of the prompt message the
/// participants react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

/// Channel the summary of a session is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelKey(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

impl Participant {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId(id),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    Attendance,
    Quiz,
    FeedbackPoll,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Attendance => "attendance",
            SessionKind::Quiz => "quiz",
            SessionKind::FeedbackPoll => "feedback poll",
        }
    }

    /// Attendance and the choice-based kinds take different payloads.
    pub fn uses_choices(&self) -> bool {
        !matches!(self, SessionKind::Attendance)
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest window a session may stay open, one day.
pub const MAX_WINDOW_SECS: i64 = 86_400;

/// Length of a collection window, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionDuration(i64);

impl SessionDuration {
    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// True for 1..=[`MAX_WINDOW_SECS`] seconds.
    pub fn is_valid(&self) -> bool {
        (1..=MAX_WINDOW_SECS).contains(&self.0)
    }

    pub fn to_std(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.0.max(0) as u64)
    }

    /// `None` when the value does not fit a `TimeDelta`.
    pub fn to_chrono(&self) -> Option<chrono::TimeDelta> {
        chrono::TimeDelta::try_seconds(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Response {
    Present,
    Choice(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Open,
    Closed,
}

/// Key under which at most one session of a kind may be open at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupingKey {
    Day(NaiveDate),
    Session(SessionId),
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingKey::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            GroupingKey::Session(id) => write!(f, "session {}", id),
        }
    }
}

/// Everything a command handler supplies to open a session.
#[derive(Debug, Clone)]
pub struct OpenSession {
    pub id: SessionId,
    pub kind: SessionKind,
    pub duration: SessionDuration,
    pub roster: Vec<Participant>,
    pub options: Vec<String>,
    pub answer: Option<usize>,
    pub reply_to: ChannelKey,
}

impl OpenSession {
    pub fn attendance(
        id: SessionId,
        duration: SessionDuration,
        roster: Vec<Participant>,
        reply_to: ChannelKey,
    ) -> Self {
        Self {
            id,
            kind: SessionKind::Attendance,
            duration,
            roster,
            options: Vec::new(),
            answer: None,
            reply_to,
        }
    }

    pub fn choices(
        id: SessionId,
        kind: SessionKind,
        duration: SessionDuration,
        roster: Vec<Participant>,
        options: Vec<String>,
        answer: Option<usize>,
        reply_to: ChannelKey,
    ) -> Self {
        Self {
            id,
            kind,
            duration,
            roster,
            options,
            answer,
            reply_to,
        }
    }
}

/// One collection window with its roster snapshot and recorded responses.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    pub grouping_key: GroupingKey,
    pub duration: SessionDuration,
    pub options: Vec<String>,
    pub answer: Option<usize>,
    pub reply_to: ChannelKey,
    state: SessionState,
    roster: Vec<Participant>,
    eligible: HashSet<ParticipantId>,
    responses: HashMap<ParticipantId, Response>,
}

impl Session {
    pub fn new(request: OpenSession, created_at: DateTime<Utc>, grouping_key: GroupingKey) -> Self {
        // Duplicate roster entries collapse onto the first occurrence.
        let mut eligible = HashSet::with_capacity(request.roster.len());
        let roster: Vec<Participant> = request
            .roster
            .into_iter()
            .filter(|participant| eligible.insert(participant.id))
            .collect();

        Self {
            id: request.id,
            kind: request.kind,
            created_at,
            grouping_key,
            duration: request.duration,
            options: request.options,
            answer: request.answer,
            reply_to: request.reply_to,
            state: SessionState::Open,
            roster,
            eligible,
            responses: HashMap::new(),
        }
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    pub fn response_of(&self, participant: ParticipantId) -> Option<Response> {
        self.responses.get(&participant).copied()
    }

    #[cfg(test)]
    pub fn response_count(&self) -> usize {
        self.responses.len()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn is_eligible(&self, participant: ParticipantId) -> bool {
        self.eligible.contains(&participant)
    }

    pub fn accepts(&self, payload: Response) -> bool {
        match (self.kind.uses_choices(), payload) {
            (false, Response::Present) => true,
            (true, Response::Choice(index)) => index < self.options.len(),
            _ => false,
        }
    }

    /// Inserts a response. Callers check eligibility and payload first; an
    /// existing entry is never overwritten.
    pub(crate) fn insert_response(&mut self, participant: ParticipantId, payload: Response) -> bool {
        if self.responses.contains_key(&participant) {
            return false;
        }
        self.responses.insert(participant, payload);
        true
    }

    pub(crate) fn close(&mut self) -> Option<ReconciliationResult> {
        if !self.is_open() {
            return None;
        }
        self.state = SessionState::Closed;
        Some(self.reconcile())
    }

    /// Splits the roster into responders and absentees, both in roster order.
    pub fn reconcile(&self) -> ReconciliationResult {
        let mut responded = Vec::with_capacity(self.responses.len());
        let mut absent = Vec::new();

        for participant in &self.roster {
            match self.responses.get(&participant.id) {
                Some(response) => responded.push((participant.clone(), *response)),
                None => absent.push(participant.clone()),
            }
        }

        ReconciliationResult {
            session_id: self.id,
            kind: self.kind,
            created_at: self.created_at,
            options: self.options.clone(),
            answer: self.answer,
            reply_to: self.reply_to,
            responded,
            absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    pub session_id: SessionId,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    pub options: Vec<String>,
    pub answer: Option<usize>,
    pub reply_to: ChannelKey,
    pub responded: Vec<(Participant, Response)>,
    pub absent: Vec<Participant>,
}

impl ReconciliationResult {
    #[cfg(test)]
    pub fn responded_ids(&self) -> Vec<ParticipantId> {
        self.responded.iter().map(|(participant, _)| participant.id).collect()
    }

    #[cfg(test)]
    pub fn absent_ids(&self) -> Vec<ParticipantId> {
        self.absent.iter().map(|participant| participant.id).collect()
    }

    pub fn roster_size(&self) -> usize {
        self.responded.len() + self.absent.len()
    }
}
