use crate::session::clock::TimerHandle;
use crate::session::model::{GroupingKey, Session, SessionId, SessionKind};
use std::collections::{HashMap, VecDeque};

/// How many closed sessions are kept in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    #[default]
    KeepAll,
    KeepLast(usize),
}

/// Owns every session for the lifetime of the process. Creation order is kept
/// separately so exports stay stable.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
    order: VecDeque<SessionId>,
    timers: HashMap<SessionId, TimerHandle>,
    retention: RetentionPolicy,
}

impl SessionStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, session: Session) {
        self.order.push_back(session.id);
        self.sessions.insert(session.id, session);
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn find_open(&self, kind: SessionKind, key: GroupingKey) -> Option<&Session> {
        self.sessions
            .values()
            .find(|session| session.is_open() && session.kind == kind && session.grouping_key == key)
    }

    pub fn attach_timer(&mut self, id: SessionId, handle: TimerHandle) {
        self.timers.insert(id, handle);
    }

    pub fn take_timer(&mut self, id: SessionId) -> Option<TimerHandle> {
        self.timers.remove(&id)
    }

    pub fn open_count(&self) -> usize {
        self.sessions.values().filter(|session| session.is_open()).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Closed sessions of `kind`, oldest first.
    pub fn closed(&self, kind: SessionKind) -> Vec<Session> {
        self.order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .filter(|session| !session.is_open() && session.kind == kind)
            .cloned()
            .collect()
    }

    /// Drops the oldest closed sessions beyond the retention limit. Open
    /// sessions are never evicted. Returns the number of evicted sessions.
    pub fn evict(&mut self) -> usize {
        let RetentionPolicy::KeepLast(limit) = self.retention else {
            return 0;
        };

        let closed = self
            .order
            .iter()
            .filter(|id| self.sessions.get(id).is_some_and(|session| !session.is_open()))
            .count();
        let mut excess = closed.saturating_sub(limit);
        if excess == 0 {
            return 0;
        }

        let mut evicted = 0;
        let sessions = &mut self.sessions;
        self.order.retain(|id| {
            if excess > 0 && sessions.get(id).is_some_and(|session| !session.is_open()) {
                sessions.remove(id);
                excess -= 1;
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }
}
