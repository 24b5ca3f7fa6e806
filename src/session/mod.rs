//! Per-identity conversation transcripts
//!
//! One process-wide table, passed to handlers through the server state.
//! Each transcript sits behind its own async mutex so turns for different
//! identities never contend, and a turn for one identity holds that lock from
//! reading history to appending the reply.

use crate::chain::Role;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Identity shared by every banker who does not give one
pub const DEFAULT_BANKER_ID: &str = "default_banker";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Banker(String),
    Customer(String),
}

type Transcript = Arc<Mutex<Vec<String>>>;

/// Session Memory Store
#[derive(Default)]
pub struct SessionStore {
    transcripts: DashMap<SessionKey, Transcript>,
}

/// Exclusive access to one transcript for the duration of a turn.
///
/// Anonymous sessions (unidentified customers, unspecified roles) have no
/// transcript: history is empty and appends are dropped.
pub struct SessionTurn {
    guard: Option<OwnedMutexGuard<Vec<String>>>,
}

impl SessionTurn {
    pub fn history(&self) -> &[String] {
        self.guard.as_deref().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn append(&mut self, line: impl Into<String>) {
        if let Some(guard) = self.guard.as_mut() {
            guard.push(line.into());
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.guard.is_some()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Banker always resolves (explicit id or the shared default); Customer
    /// only with an id; no role never resolves.
    pub fn key_for(role: Option<Role>, identity: Option<&str>) -> Option<SessionKey> {
        let identity = identity.map(str::trim).filter(|id| !id.is_empty());
        match role? {
            Role::Banker => Some(SessionKey::Banker(
                identity.unwrap_or(DEFAULT_BANKER_ID).to_string(),
            )),
            Role::Customer => identity.map(|id| SessionKey::Customer(id.to_string())),
        }
    }

    fn transcript(&self, key: SessionKey) -> Transcript {
        self.transcripts.entry(key).or_default().clone()
    }

    /// Take the per-key lock for a whole turn
    pub async fn begin_turn(&self, role: Option<Role>, identity: Option<&str>) -> SessionTurn {
        let guard = match Self::key_for(role, identity) {
            Some(key) => Some(self.transcript(key).lock_owned().await),
            None => None,
        };
        SessionTurn { guard }
    }

    pub async fn append(&self, role: Option<Role>, identity: Option<&str>, line: impl Into<String>) {
        let Some(key) = Self::key_for(role, identity) else {
            return;
        };
        let transcript = self.transcript(key);
        transcript.lock().await.push(line.into());
    }

    pub async fn read(&self, role: Option<Role>, identity: Option<&str>) -> Vec<String> {
        let Some(key) = Self::key_for(role, identity) else {
            return Vec::new();
        };
        let transcript = match self.transcripts.get(&key) {
            Some(entry) => entry.value().clone(),
            None => return Vec::new(),
        };
        let lines = transcript.lock().await;
        lines.clone()
    }

    /// Drop the transcript entirely
    pub fn reset(&self, role: Option<Role>, identity: Option<&str>) {
        if let Some(key) = Self::key_for(role, identity) {
            if self.transcripts.remove(&key).is_some() {
                tracing::debug!("Reset conversation for {:?}", key);
            }
        }
    }

    /// Number of live transcripts
    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }
}
