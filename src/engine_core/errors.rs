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

// Domain error types - Secure error handling with no information disclosure

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the mediator
#[derive(Error, Debug)]
pub enum InterceptorError {
    /// Configuration source missing, unreadable or invalid
    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// Invalid tool-call or JSON-RPC arguments
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Audit store failure
    #[error("Audit log error: {0}")]
    Log(#[from] LogError),

    /// Detection oracle failure
    #[error("Detection error: {0}")]
    Oracle(#[from] OracleError),

    /// Result could not be encoded for the wire
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O Error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Audit log store errors
#[derive(Error, Debug)]
pub enum LogError {
    /// The store could not be read, written, locked or renamed
    #[error("audit store I/O failure at {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted store exists but is not a valid event list
    #[error("audit store at {path} is corrupt: {reason}")]
    CorruptExistingStore { path: PathBuf, reason: String },

    /// An event could not be encoded
    #[error("failed to encode audit event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LogError::IoFailure {
            path: path.into(),
            source,
        }
    }
}

/// Detection oracle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The scorer could not produce a verdict
    #[error("scorer failed: {0}")]
    ScoringFailed(String),

    /// A configured pattern could not be compiled
    #[error("invalid pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },
}

impl InterceptorError {
    /// Get user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            InterceptorError::ConfigUnavailable(_) => "Configuration unavailable".to_string(),
            InterceptorError::ValidationError(reason) => format!("Validation failed: {}", reason),
            InterceptorError::Log(_) => "Internal error".to_string(),
            InterceptorError::Oracle(_) => "Scan inconclusive".to_string(),
            InterceptorError::Serialization(_) => "Internal error".to_string(),
            InterceptorError::IoError(_) => "Internal system error".to_string(),
        }
    }
}
