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

//! Domain models for the Aegis mediator.
//!
//! This module contains pure data structures representing audit records,
//! the action taxonomy, mediation results and the JSON-RPC envelope.
//! It is designed to be free of I/O side effects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Newtype wrapper around Uuid for type-safe session identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random SessionId
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0.to_string()
    }
}

impl TryFrom<String> for SessionId {
    type Error = uuid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Uuid::parse_str(&s).map(SessionId)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of security event recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Info,
    InjectionDetected,
    PiiRedacted,
    AccessDenied,
    AdminAction,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Info => "INFO",
            EventType::InjectionDetected => "INJECTION_DETECTED",
            EventType::PiiRedacted => "PII_REDACTED",
            EventType::AccessDenied => "ACCESS_DENIED",
            EventType::AdminAction => "ADMIN_ACTION",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single mediation call. Closed set: every call yields exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    AllowedInput,
    BlockedInput,
    AllowedOutput,
    RedactedOutput,
    DeniedAccess,
    SessionReset,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::AllowedInput,
        Action::BlockedInput,
        Action::AllowedOutput,
        Action::RedactedOutput,
        Action::DeniedAccess,
        Action::SessionReset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::AllowedInput => "ALLOWED_INPUT",
            Action::BlockedInput => "BLOCKED_INPUT",
            Action::AllowedOutput => "ALLOWED_OUTPUT",
            Action::RedactedOutput => "REDACTED_OUTPUT",
            Action::DeniedAccess => "DENIED_ACCESS",
            Action::SessionReset => "SESSION_RESET",
        }
    }

    /// Monitoring category used to colour-code the action.
    pub fn category(&self) -> ActionCategory {
        match self {
            Action::BlockedInput | Action::DeniedAccess => ActionCategory::Alert,
            Action::RedactedOutput => ActionCategory::Warning,
            Action::SessionReset => ActionCategory::Info,
            Action::AllowedInput | Action::AllowedOutput => ActionCategory::Success,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    Alert,
    Warning,
    Info,
    Success,
}

/// One immutable audit record.
///
/// Field order matches the on-disk format consumed by the monitoring surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub timestamp: String,
    pub event_type: EventType,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    pub risk_score: f64,
    pub action: Action,
}

impl SecurityEvent {
    /// Build a record stamped with the current UTC time.
    /// The risk score is clamped into `[0.0, 1.0]`; NaN is recorded as maximal risk.
    pub fn new(
        event_type: EventType,
        action: Action,
        risk_score: f64,
        details: BTreeMap<String, String>,
    ) -> Self {
        Self {
            timestamp: crate::utils::time::now_iso8601(),
            event_type,
            details,
            risk_score: clamp_risk(risk_score),
            action,
        }
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

pub(crate) fn clamp_risk(score: f64) -> f64 {
    if score.is_nan() {
        1.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Result status reported to the caller of a mediation operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    SecurityAlert,
    SuccessRedacted,
    AccessDenied,
}

/// Observable taint state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaintState {
    Clean,
    Tainted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingResult {
    pub status: Status,
    pub action: Action,
    pub is_valid: bool,
    pub risk_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingResult {
    pub status: Status,
    pub action: Action,
    pub risk_score: f64,
    /// Absent when access is denied: nothing may leave a denied session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminResult {
    pub status: Status,
    pub action: Action,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

impl JsonRpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: serde_json::Value, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
                data: None,
            }),
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
