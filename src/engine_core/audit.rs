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

//! Audit Log Store.
//!
//! Append-only, persisted record of every security decision. The on-disk
//! format is a single JSON array of [`SecurityEvent`] objects which must stay
//! parseable as a whole after every append.
//!
//! Appends are serialized twice over: an in-process mutex orders threads of
//! this process, and an exclusive advisory lock on a sidecar `<file>.lock`
//! orders independent processes sharing the same store. The new array is
//! written to a temporary sibling, synced, then renamed over the store, so a
//! reader never observes a half-written file. Readers take a shared lock when
//! the lock file can be opened read-only and otherwise read unlocked; they
//! never create or write anything.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::engine_core::constants::audit;
use crate::engine_core::errors::LogError;
use crate::engine_core::models::SecurityEvent;

/// Persistence contract for audit records.
pub trait AuditStore: Send + Sync {
    /// Durably append one event. On `Ok` the event is visible to every later `load_all`.
    fn append(&self, event: &SecurityEvent) -> Result<(), LogError>;

    /// Full replay in write order. An empty or fresh store yields an empty vector.
    fn load_all(&self) -> Result<Vec<SecurityEvent>, LogError>;
}

/// What to do with an existing store that no longer parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptStorePolicy {
    /// Move the unreadable file aside for forensic review, then start fresh.
    #[default]
    Quarantine,
    /// Replace the unreadable file with a store holding only the new event.
    Overwrite,
}

impl CorruptStorePolicy {
    pub fn parse_safe(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "overwrite" | "discard" => CorruptStorePolicy::Overwrite,
            _ => CorruptStorePolicy::Quarantine,
        }
    }
}

/// JSON-array audit store on the local filesystem.
#[derive(Debug)]
pub struct JsonFileAuditStore {
    path: PathBuf,
    lock_path: PathBuf,
    policy: CorruptStorePolicy,
    write_guard: Mutex<()>,
}

impl JsonFileAuditStore {
    /// Open (and if needed initialise) the store at `path`.
    /// A missing file is created holding the empty list.
    pub fn open(path: impl Into<PathBuf>, policy: CorruptStorePolicy) -> Result<Self, LogError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| LogError::io(parent, e))?;
        }

        let store = Self {
            lock_path: sibling(&path, audit::LOCK_SUFFIX),
            path,
            policy,
            write_guard: Mutex::new(()),
        };

        if !store.path.exists() {
            let _guard = store.guard();
            let lock = store.lock_file()?;
            FileExt::lock_exclusive(&lock).map_err(|e| LogError::io(&store.lock_path, e))?;
            if !store.path.exists() {
                store.persist(&[])?;
                info!("Initialized empty audit log at {}", store.path.display());
            }
            let _ = FileExt::unlock(&lock);
        }

        Ok(store)
    }

    /// Handle for read-only consumers such as the report. `load_all` on it
    /// needs read access only.
    pub fn reader(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            lock_path: sibling(&path, audit::LOCK_SUFFIX),
            path,
            policy: CorruptStorePolicy::default(),
            write_guard: Mutex::new(()),
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_file(&self) -> Result<File, LogError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| LogError::io(&self.lock_path, e))
    }

    /// Read the persisted list. Missing, empty and whitespace-only files are the empty list.
    fn read_events(&self) -> Result<Vec<SecurityEvent>, LogError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(LogError::CorruptExistingStore {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
            Err(e) => return Err(LogError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| LogError::CorruptExistingStore {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn persist(&self, events: &[SecurityEvent]) -> Result<(), LogError> {
        let body = to_pretty_json(events)?;
        let tmp_path = sibling(&self.path, "tmp");

        let mut tmp = File::create(&tmp_path).map_err(|e| LogError::io(&tmp_path, e))?;
        tmp.write_all(&body).map_err(|e| LogError::io(&tmp_path, e))?;
        tmp.sync_all().map_err(|e| LogError::io(&tmp_path, e))?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).map_err(|e| LogError::io(&self.path, e))?;
        sync_parent(&self.path)
    }

    fn recover_corrupt(&self, reason: &str) -> Result<(), LogError> {
        match self.policy {
            CorruptStorePolicy::Quarantine => {
                let quarantine = sibling(
                    &self.path,
                    &format!("{}-{}", audit::CORRUPT_INFIX, crate::utils::time::file_stamp()),
                );
                fs::rename(&self.path, &quarantine).map_err(|e| LogError::io(&self.path, e))?;
                warn!(
                    "Audit log {} was unreadable ({}); quarantined to {}",
                    self.path.display(),
                    reason,
                    quarantine.display()
                );
            }
            CorruptStorePolicy::Overwrite => {
                warn!(
                    "Audit log {} was unreadable ({}); overwriting",
                    self.path.display(),
                    reason
                );
            }
        }
        Ok(())
    }
}

impl AuditStore for JsonFileAuditStore {
    fn append(&self, event: &SecurityEvent) -> Result<(), LogError> {
        let _guard = self.guard();
        let lock = self.lock_file()?;
        FileExt::lock_exclusive(&lock).map_err(|e| LogError::io(&self.lock_path, e))?;

        let result = (|| {
            let mut events = match self.read_events() {
                Ok(events) => events,
                Err(LogError::CorruptExistingStore { reason, .. }) => {
                    self.recover_corrupt(&reason)?;
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            events.push(event.clone());
            self.persist(&events)
        })();

        let _ = FileExt::unlock(&lock);
        result
    }

    fn load_all(&self) -> Result<Vec<SecurityEvent>, LogError> {
        let lock = File::open(&self.lock_path)
            .ok()
            .filter(|lock| match FileExt::lock_shared(lock) {
                Ok(()) => true,
                Err(e) => {
                    debug!("Reading {} without shared lock: {}", self.path.display(), e);
                    false
                }
            });
        let result = self.read_events();
        if let Some(lock) = &lock {
            let _ = FileExt::unlock(lock);
        }
        result
    }
}

/// Volatile store for tests, benchmarks and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    events: Mutex<Vec<SecurityEvent>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditStore for MemoryAuditStore {
    fn append(&self, event: &SecurityEvent) -> Result<(), LogError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<SecurityEvent>, LogError> {
        Ok(self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Front door used by the mediation engine: mirrors each record onto the
/// `audit` tracing target, then persists it.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn record(&self, event: &SecurityEvent) -> Result<(), LogError> {
        info!(
            target: "audit",
            event_type = %event.event_type,
            action = %event.action,
            risk_score = event.risk_score,
            "SECURITY_EVENT"
        );
        self.store.append(event)
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger").finish_non_exhaustive()
    }
}

/// Pretty JSON with four-space indentation, matching the established file layout.
fn to_pretty_json(events: &[SecurityEvent]) -> Result<Vec<u8>, LogError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    events.serialize(&mut ser)?;
    Ok(buf)
}

/// Flush the directory entry so a completed rename survives a crash.
#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<(), LogError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| LogError::io(dir, e))
}

// Directory handles cannot be synced on Windows; the rename is already durable there.
#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<(), LogError> {
    Ok(())
}

/// `dir/name.ext` -> `dir/name.ext.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| audit::DEFAULT_LOG_FILE.into());
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_core::models::{Action, EventType};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn event(action: Action) -> SecurityEvent {
        SecurityEvent::new(EventType::Info, action, 0.0, BTreeMap::new())
    }

    #[test]
    fn test_open_initializes_empty_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("security_events.json");
        let store = JsonFileAuditStore::open(&path, CorruptStorePolicy::default()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_zero_length_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, "").unwrap();
        let store = JsonFileAuditStore::open(&path, CorruptStorePolicy::default()).unwrap();
        assert!(store.load_all().unwrap().is_empty());

        store.append(&event(Action::AllowedInput)).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_append_preserves_order() {
        let dir = TempDir::new().unwrap();
        let store =
            JsonFileAuditStore::open(dir.path().join("e.json"), CorruptStorePolicy::default())
                .unwrap();
        for action in Action::ALL {
            store.append(&event(action)).unwrap();
        }
        let actions: Vec<Action> = store.load_all().unwrap().iter().map(|e| e.action).collect();
        assert_eq!(actions, Action::ALL.to_vec());
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/events.json");
        let store = JsonFileAuditStore::open(&path, CorruptStorePolicy::default()).unwrap();
        store.append(&event(Action::SessionReset)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryAuditStore::new();
        assert!(store.is_empty());
        store.append(&event(Action::AllowedOutput)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load_all().unwrap()[0].action, Action::AllowedOutput);
    }

    #[test]
    fn test_sync_parent_accepts_bare_and_nested_paths() {
        let dir = TempDir::new().unwrap();
        assert!(sync_parent(&dir.path().join("events.json")).is_ok());
        assert!(sync_parent(Path::new("events.json")).is_ok());
    }

    #[test]
    fn test_append_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        let store = JsonFileAuditStore::open(&path, CorruptStorePolicy::default()).unwrap();
        store.append(&event(Action::AllowedInput)).unwrap();
        assert!(!sibling(&path, "tmp").exists());
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_sibling_naming() {
        assert_eq!(
            sibling(Path::new("/tmp/log.json"), "lock"),
            PathBuf::from("/tmp/log.json.lock")
        );
    }

    #[test]
    fn test_policy_parse_safe_defaults_to_quarantine() {
        assert_eq!(CorruptStorePolicy::parse_safe("OVERWRITE"), CorruptStorePolicy::Overwrite);
        assert_eq!(CorruptStorePolicy::parse_safe("bogus"), CorruptStorePolicy::Quarantine);
    }
}
