// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Session taint tracking.
//!
//! Each session carries a single `tainted` flag. It is raised when malicious
//! input is detected and lowered only by an explicit reset. The tracker never
//! writes to the audit log; callers record the reason for each transition.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::engine_core::models::{SessionId, TaintState};

/// Per-session taint flag. No history beyond the present value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTaintState {
    pub tainted: bool,
}

impl SessionTaintState {
    pub fn state(&self) -> TaintState {
        if self.tainted {
            TaintState::Tainted
        } else {
            TaintState::Clean
        }
    }
}

/// Map of session id to taint flag behind one lock.
///
/// Writers and readers share a single `RwLock`, so no reader can observe a
/// half-applied transition. A poisoned lock is recovered: the guarded data is
/// a map of booleans and cannot be left torn by a panicking writer.
#[derive(Debug, Default)]
pub struct SessionTaintTracker {
    sessions: RwLock<HashMap<SessionId, SessionTaintState>>,
}

impl SessionTaintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh, clean session.
    pub fn open_session(&self) -> SessionId {
        let id = SessionId::generate();
        self.write().insert(id, SessionTaintState::default());
        debug!(session_id = %id, "session opened");
        id
    }

    /// Evict a session. Returns whether it was known.
    pub fn close_session(&self, id: &SessionId) -> bool {
        let removed = self.write().remove(id).is_some();
        debug!(session_id = %id, removed, "session closed");
        removed
    }

    pub fn is_tainted(&self, id: &SessionId) -> bool {
        self.read().get(id).map(|s| s.tainted).unwrap_or(false)
    }

    pub fn set_tainted(&self, id: &SessionId) {
        self.write().entry(*id).or_default().tainted = true;
    }

    pub fn clear(&self, id: &SessionId) {
        self.write().entry(*id).or_default().tainted = false;
    }

    /// Make sure `id` is tracked; unknown sessions start clean.
    pub fn ensure(&self, id: &SessionId) {
        if self.read().contains_key(id) {
            return;
        }
        let mut sessions = self.write();
        if !sessions.contains_key(id) {
            debug!(session_id = %id, "registering previously unseen session as clean");
            sessions.insert(*id, SessionTaintState::default());
        }
    }

    pub fn state(&self, id: &SessionId) -> TaintState {
        self.read().get(id).copied().unwrap_or_default().state()
    }

    pub fn session_count(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, SessionTaintState>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, SessionTaintState>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
