//! Per-user conversation state table.
//!
//! At most one session per account. Submissions take the session out of the table while they
//! run, so a duplicate delivery of the same input finds nothing and cannot advance twice.

use super::flow::{FlowKind, Scratch, Step};
use crate::database::models::AccountId;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct Session {
    pub kind: FlowKind,
    pub step_index: usize,
    pub scratch: Scratch,
    pub touched_at: Instant,
}

impl Session {
    pub fn new(kind: FlowKind, scratch: Scratch) -> Self {
        Self {
            kind,
            step_index: 0,
            scratch,
            touched_at: Instant::now(),
        }
    }

    pub fn step(&self) -> Option<Step> {
        self.kind.steps().get(self.step_index).copied()
    }

    /// Move to the next step; `false` when the flow has no more steps.
    pub fn advance(&mut self) -> bool {
        self.step_index += 1;
        self.touched_at = Instant::now();
        self.step_index < self.kind.steps().len()
    }

    pub fn touch(&mut self) {
        self.touched_at = Instant::now();
    }

    pub fn is_idle(&self, timeout: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.touched_at) >= timeout
    }
}

pub struct SessionTable {
    sessions: Mutex<HashMap<AccountId, Session>>,
    idle_timeout: Duration,
}

impl SessionTable {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Install a fresh session, discarding any previous one.
    pub async fn install(&self, account: AccountId, session: Session) -> Option<Session> {
        self.sessions.lock().await.insert(account, session)
    }

    pub async fn take(&self, account: AccountId) -> Option<Session> {
        self.sessions.lock().await.remove(&account)
    }

    /// Put a session back after a submission. A session installed meanwhile (the user started
    /// another flow) wins; returns whether `session` was stored.
    pub async fn restore(&self, account: AccountId, session: Session) -> bool {
        let mut map = self.sessions.lock().await;
        if map.contains_key(&account) {
            return false;
        }
        map.insert(account, session);
        true
    }

    pub async fn current(&self, account: AccountId) -> Option<(FlowKind, Option<Step>)> {
        self.sessions
            .lock()
            .await
            .get(&account)
            .map(|s| (s.kind, s.step()))
    }

    /// Drop sessions idle for longer than the timeout. Returns the affected accounts.
    pub async fn sweep_idle(&self) -> Vec<AccountId> {
        let now = Instant::now();
        let mut map = self.sessions.lock().await;
        let expired: Vec<AccountId> = map
            .iter()
            .filter(|(_, s)| s.is_idle(self.idle_timeout, now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            map.remove(id);
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn restore_does_not_clobber_newer_session() {
        let table = SessionTable::new(Duration::from_secs(60));
        let id = AccountId(1);
        table.install(id, Session::new(FlowKind::TopUp, Scratch::new())).await;
        let old = table.take(id).await.unwrap();
        table.install(id, Session::new(FlowKind::Transfer, Scratch::new())).await;
        assert!(!table.restore(id, old).await);
        assert_eq!(table.current(id).await.map(|c| c.0), Some(FlowKind::Transfer));
    }

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let table = SessionTable::new(Duration::from_secs(60));
        let mut stale = Session::new(FlowKind::TopUp, Scratch::new());
        stale.touched_at = Instant::now() - Duration::from_secs(120);
        table.install(AccountId(1), stale).await;
        table
            .install(AccountId(2), Session::new(FlowKind::TopUp, Scratch::new()))
            .await;
        assert_eq!(table.sweep_idle().await, vec![AccountId(1)]);
        assert_eq!(table.len().await, 1);
    }
}
