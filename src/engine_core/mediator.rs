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

//! Mediation Engine.
//!
//! The central brain of Aegis. It owns the decision protocol for inbound and
//! outbound text, drives the per-session taint state machine and writes one
//! audit record per call. It is pure software logic and does not know about
//! stdio, JSON-RPC framing or how detection is implemented.
//!
//! State machine per session:
//!
//! ```text
//!   CLEAN --(analyze_incoming detects injection)--> TAINTED
//!   TAINTED --(reset_session)--> CLEAN
//! ```
//!
//! While `TAINTED`, `scan_outgoing` denies without ever consulting the
//! sensitive-data scorer.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::ConfigHandle;
use crate::engine::{HeuristicInjectionScorer, RegexSensitiveScorer};
use crate::engine_core::audit::{AuditLogger, AuditStore};
use crate::engine_core::constants::{audit, risk};
use crate::engine_core::models::{
    clamp_risk, Action, AdminResult, EventType, IncomingResult, OutgoingResult, SecurityEvent,
    SessionId, Status, TaintState,
};
use crate::engine_core::taint::SessionTaintTracker;
use crate::engine_core::traits::{InjectionScorer, SensitiveScorer};

pub struct MediationEngine {
    config: Arc<ConfigHandle>,
    taint: SessionTaintTracker,
    audit: AuditLogger,
    injection: Arc<dyn InjectionScorer>,
    sensitive: Arc<dyn SensitiveScorer>,
}

impl MediationEngine {
    pub fn new(
        config: Arc<ConfigHandle>,
        store: Arc<dyn AuditStore>,
        injection: Arc<dyn InjectionScorer>,
        sensitive: Arc<dyn SensitiveScorer>,
    ) -> Self {
        Self {
            config,
            taint: SessionTaintTracker::new(),
            audit: AuditLogger::new(store),
            injection,
            sensitive,
        }
    }

    /// Engine wired to the built-in heuristic and regex scorers.
    pub fn with_default_oracles(config: Arc<ConfigHandle>, store: Arc<dyn AuditStore>) -> Self {
        Self::new(
            config,
            store,
            Arc::new(HeuristicInjectionScorer::new()),
            Arc::new(RegexSensitiveScorer::new()),
        )
    }

    pub fn open_session(&self) -> SessionId {
        self.taint.open_session()
    }

    pub fn close_session(&self, session: &SessionId) -> bool {
        self.taint.close_session(session)
    }

    pub fn session_state(&self, session: &SessionId) -> TaintState {
        self.taint.state(session)
    }

    /// Screen inbound text for prompt injection. A detection taints the session.
    pub fn analyze_incoming(&self, session: &SessionId, content: &str) -> IncomingResult {
        self.taint.ensure(session);
        let snapshot = self.config.snapshot();
        let config = &snapshot.config;

        let (valid, score, reason) = if !config.enable_prompt_injection_scanner {
            debug!(session_id = %session, "injection scanner disabled; allowing input");
            (true, risk::NONE, audit::REASON_INJECTION.to_string())
        } else {
            match self.injection.score_injection(content, config) {
                Ok(verdict) => (
                    verdict.valid,
                    clamp_risk(verdict.score),
                    audit::REASON_INJECTION.to_string(),
                ),
                Err(e) => {
                    warn!(session_id = %session, "Injection scorer failed, failing closed: {}", e);
                    (
                        false,
                        risk::DENIED,
                        format!("{}: {}", audit::REASON_INJECTION_INCONCLUSIVE, e),
                    )
                }
            }
        };

        if !valid {
            self.taint.set_tainted(session);
            warn!(session_id = %session, risk_score = score, "Blocked input; session tainted");
            self.record(SecurityEvent::new(
                EventType::InjectionDetected,
                Action::BlockedInput,
                score,
                details(
                    session,
                    [
                        (audit::KEY_REASON, reason.as_str()),
                        (audit::KEY_ORIGINAL_CONTENT, content),
                    ],
                ),
            ));
            return IncomingResult {
                status: Status::SecurityAlert,
                action: Action::BlockedInput,
                is_valid: false,
                risk_score: score,
                reason: Some(reason),
            };
        }

        self.record(SecurityEvent::new(
            EventType::Info,
            Action::AllowedInput,
            score,
            details(session, [(audit::KEY_SCANNED_CONTENT, content)]),
        ));
        IncomingResult {
            status: Status::Success,
            action: Action::AllowedInput,
            is_valid: true,
            risk_score: score,
            reason: None,
        }
    }

    /// Screen outbound text for sensitive data. A tainted session is denied unscanned.
    pub fn scan_outgoing(&self, session: &SessionId, data: &str) -> OutgoingResult {
        self.taint.ensure(session);

        if self.taint.is_tainted(session) {
            warn!(session_id = %session, "Denied output from tainted session");
            return self.deny_output(session, audit::REASON_SESSION_TAINTED.to_string());
        }

        let snapshot = self.config.snapshot();
        let verdict = match self.sensitive.score_sensitive(data, &snapshot.config) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(session_id = %session, "Sensitive-data scorer failed, failing closed: {}", e);
                return self.deny_output(
                    session,
                    format!("{}: {}", audit::REASON_SENSITIVE_INCONCLUSIVE, e),
                );
            }
        };

        if !verdict.valid {
            let score = clamp_risk(verdict.score);
            let entities = verdict.entities.join(",");
            info!(
                session_id = %session,
                risk_score = score,
                entities = %entities,
                "Redacted output"
            );
            self.record(SecurityEvent::new(
                EventType::PiiRedacted,
                Action::RedactedOutput,
                score,
                details(
                    session,
                    [
                        (audit::KEY_ORIGINAL_DATA, data),
                        (audit::KEY_REDACTED_DATA, verdict.redacted.as_str()),
                        (audit::KEY_REASON, audit::REASON_PII),
                        (audit::KEY_ENTITIES, entities.as_str()),
                    ],
                ),
            ));
            return OutgoingResult {
                status: Status::SuccessRedacted,
                action: Action::RedactedOutput,
                risk_score: score,
                sanitized_data: Some(verdict.redacted),
                reason: Some(audit::REASON_PII.to_string()),
            };
        }

        self.record(SecurityEvent::new(
            EventType::Info,
            Action::AllowedOutput,
            risk::NONE,
            details(session, [(audit::KEY_DATA, data)]),
        ));
        OutgoingResult {
            status: Status::Success,
            action: Action::AllowedOutput,
            risk_score: risk::NONE,
            sanitized_data: Some(data.to_string()),
            reason: None,
        }
    }

    /// Clear the session's taint. Unconditional; every call is audited.
    pub fn reset_session(&self, session: &SessionId) -> AdminResult {
        self.taint.clear(session);
        info!(session_id = %session, "Security session reset");
        self.record(SecurityEvent::new(
            EventType::AdminAction,
            Action::SessionReset,
            risk::NONE,
            details(session, [(audit::KEY_ACTION, audit::ADMIN_SESSION_RESET)]),
        ));
        AdminResult {
            status: Status::Success,
            action: Action::SessionReset,
            message: "Security session has been reset.".to_string(),
        }
    }

    fn deny_output(&self, session: &SessionId, reason: String) -> OutgoingResult {
        self.record(SecurityEvent::new(
            EventType::AccessDenied,
            Action::DeniedAccess,
            risk::DENIED,
            details(session, [(audit::KEY_REASON, reason.as_str())]),
        ));
        OutgoingResult {
            status: Status::AccessDenied,
            action: Action::DeniedAccess,
            risk_score: risk::DENIED,
            sanitized_data: None,
            reason: Some(reason),
        }
    }

    /// Persist an audit record. A failed write degrades observability only;
    /// the caller's decision stands.
    fn record(&self, event: SecurityEvent) {
        if let Err(e) = self.audit.record(&event) {
            error!(action = %event.action, "Failed to persist audit event: {}", e);
        }
    }
}

impl std::fmt::Debug for MediationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediationEngine")
            .field("sessions", &self.taint.session_count())
            .finish_non_exhaustive()
    }
}

fn details<const N: usize>(
    session: &SessionId,
    entries: [(&str, &str); N],
) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.insert(audit::KEY_SESSION_ID.to_string(), session.to_string());
    map
}
