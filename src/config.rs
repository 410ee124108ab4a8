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

use crate::engine_core::audit::CorruptStorePolicy;
use crate::engine_core::constants::{self, detection};
use crate::engine_core::errors::{InterceptorError, OracleError};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Process-level settings: where things live and how we log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub config_path: PathBuf,
    pub audit_log_path: PathBuf,
    pub log_level: String,
    pub log_format: String, // "json" or "text"
    pub corrupt_log_policy: CorruptStorePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, InterceptorError> {
        let defaults = Self::default();
        Ok(Self {
            config_path: env::var(constants::config::ENV_CONFIG_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            audit_log_path: env::var(constants::config::ENV_AUDIT_LOG_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.audit_log_path),
            log_level: env::var(constants::config::ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_format: env::var(constants::config::ENV_LOG_FORMAT)
                .unwrap_or(defaults.log_format),
            corrupt_log_policy: env::var(constants::config::ENV_CORRUPT_LOG_POLICY)
                .map(|s| CorruptStorePolicy::parse_safe(&s))
                .unwrap_or(defaults.corrupt_log_policy),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(constants::config::DEFAULT_CONFIG_FILE),
            audit_log_path: PathBuf::from(constants::audit::DEFAULT_LOG_FILE),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            corrupt_log_policy: CorruptStorePolicy::default(),
        }
    }
}

/// Which oracle a custom pattern feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTarget {
    #[default]
    Sensitive,
    Injection,
}

/// A named group of regular expressions supplied by the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    pub name: String,
    pub expressions: Vec<String>,
    #[serde(default = "default_custom_score")]
    pub score: f64,
    #[serde(default)]
    pub target: PatternTarget,
    #[serde(skip)]
    compiled: OnceLock<Result<Vec<Regex>, OracleError>>,
}

fn default_custom_score() -> f64 {
    detection::DEFAULT_CUSTOM_PATTERN_SCORE
}

impl CustomPattern {
    pub fn new(name: &str, expressions: &[&str], score: f64, target: PatternTarget) -> Self {
        Self {
            name: name.to_string(),
            expressions: expressions.iter().map(|e| e.to_string()).collect(),
            score,
            target,
            compiled: OnceLock::new(),
        }
    }

    /// Compiled expressions, built once per pattern.
    pub fn regexes(&self) -> Result<&[Regex], OracleError> {
        self.compiled
            .get_or_init(|| {
                self.expressions
                    .iter()
                    .map(|expr| {
                        Regex::new(expr).map_err(|e| OracleError::InvalidPattern {
                            name: self.name.clone(),
                            reason: e.to_string(),
                        })
                    })
                    .collect()
            })
            .as_deref()
            .map_err(Clone::clone)
    }
}

/// Detection settings consumed by the mediation engine and its oracles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediationConfig {
    pub enable_prompt_injection_scanner: bool,
    pub prompt_injection_threshold: f64,
    /// Entity types to report. Empty means every built-in entity.
    pub pii_entities_to_scan: BTreeSet<String>,
    pub pii_scan_redact: bool,
    pub pii_scan_threshold: f64,
    pub custom_regex_patterns: Vec<CustomPattern>,
}

impl Default for MediationConfig {
    fn default() -> Self {
        Self {
            enable_prompt_injection_scanner: true,
            prompt_injection_threshold: detection::DEFAULT_INJECTION_THRESHOLD,
            pii_entities_to_scan: BTreeSet::new(),
            pii_scan_redact: true,
            pii_scan_threshold: detection::DEFAULT_PII_THRESHOLD,
            custom_regex_patterns: Vec::new(),
        }
    }
}

impl MediationConfig {
    /// Read and validate a JSON (or `.yaml`/`.yml`) configuration file.
    pub fn load(path: &Path) -> Result<Self, InterceptorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InterceptorError::ConfigUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: Self = if is_yaml {
            serde_yaml_ng::from_str(&content).map_err(|e| {
                InterceptorError::ConfigUnavailable(format!(
                    "cannot parse {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| {
                InterceptorError::ConfigUnavailable(format!(
                    "cannot parse {}: {}",
                    path.display(),
                    e
                ))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load, falling back to the safe defaults when the source is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded mediation config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}; falling back to safe defaults", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), InterceptorError> {
        for (key, value) in [
            ("prompt_injection_threshold", self.prompt_injection_threshold),
            ("pii_scan_threshold", self.pii_scan_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(InterceptorError::ConfigUnavailable(format!(
                    "{} must be within [0, 1], got {}",
                    key, value
                )));
            }
        }
        for pattern in &self.custom_regex_patterns {
            if !(0.0..=1.0).contains(&pattern.score) {
                return Err(InterceptorError::ConfigUnavailable(format!(
                    "custom pattern '{}' score must be within [0, 1]",
                    pattern.name
                )));
            }
            pattern
                .regexes()
                .map_err(|e| InterceptorError::ConfigUnavailable(e.to_string()))?;
        }
        Ok(())
    }

    pub fn patterns_for(&self, target: PatternTarget) -> impl Iterator<Item = &CustomPattern> {
        self.custom_regex_patterns
            .iter()
            .filter(move |p| p.target == target)
    }

    /// Whether `entity` is selected for reporting (case-insensitive).
    pub fn scans_entity(&self, entity: &str) -> bool {
        self.pii_entities_to_scan.is_empty()
            || self
                .pii_entities_to_scan
                .iter()
                .any(|e| e.eq_ignore_ascii_case(entity))
    }
}

/// Immutable, versioned view of the configuration used for one mediation call.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub version: u64,
    pub config: Arc<MediationConfig>,
}

/// Holder of the current configuration snapshot.
///
/// Calls take a snapshot at entry; `reload` swaps in a new one atomically, so
/// a call in flight never sees a mix of old and new settings.
#[derive(Debug)]
pub struct ConfigHandle {
    source: Option<PathBuf>,
    current: RwLock<ConfigSnapshot>,
}

impl ConfigHandle {
    /// Fixed configuration with no backing file.
    pub fn fixed(config: MediationConfig) -> Self {
        Self {
            source: None,
            current: RwLock::new(ConfigSnapshot {
                version: 1,
                config: Arc::new(config),
            }),
        }
    }

    /// Load from `path`, substituting safe defaults if it is unavailable.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = MediationConfig::load_or_default(&path);
        Self {
            source: Some(path),
            current: RwLock::new(ConfigSnapshot {
                version: 1,
                config: Arc::new(config),
            }),
        }
    }

    /// Reload whenever the backing file changes. The parent directory is
    /// watched so saves that replace the file by rename are seen too.
    ///
    /// Reloading stops when the returned watcher is dropped. Must be called
    /// inside a Tokio runtime. Fixed configurations have nothing to watch.
    pub fn spawn_watcher(
        self: &Arc<Self>,
    ) -> Result<Option<RecommendedWatcher>, InterceptorError> {
        let Some(path) = self.source.clone() else {
            return Ok(None);
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|n| n.to_os_string());
        let watch_failed = |e: notify::Error| {
            InterceptorError::ConfigUnavailable(format!("cannot watch {}: {}", dir.display(), e))
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if ours && !event.kind.is_access() {
                        debug!("Config file event: {:?}", event.kind);
                        let _ = tx.send(());
                    }
                }
                Err(e) => warn!("Config watch error: {}", e),
            },
            notify::Config::default(),
        )
        .map_err(watch_failed)?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(watch_failed)?;

        let handle = Arc::clone(self);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // One save fires several events; let them settle, then reload once.
                tokio::time::sleep(Duration::from_millis(constants::config::RELOAD_DEBOUNCE_MS))
                    .await;
                while rx.try_recv().is_ok() {}
                // Failure keeps the previous snapshot and is logged by reload.
                let _ = handle.reload();
            }
        });

        info!("Watching {} for config changes", path.display());
        Ok(Some(watcher))
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new configuration, returning its version.
    pub fn replace(&self, config: MediationConfig) -> u64 {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.version += 1;
        current.config = Arc::new(config);
        current.version
    }

    /// Re-read the backing file. On failure the last good snapshot stays in place.
    pub fn reload(&self) -> Result<u64, InterceptorError> {
        let Some(path) = &self.source else {
            return Ok(self.snapshot().version);
        };
        match MediationConfig::load(path) {
            Ok(config) => {
                let version = self.replace(config);
                info!("Reloaded mediation config from {} (v{})", path.display(), version);
                Ok(version)
            }
            Err(e) => {
                warn!("Config reload failed, keeping current snapshot: {}", e);
                Err(e)
            }
        }
    }
}
