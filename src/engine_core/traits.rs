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

//! Detection Oracle Traits.
//!
//! The mediation engine treats detection as an opaque scoring capability.
//! Implementations may be probabilistic but must be deterministic for an
//! identical configuration and input.

use crate::config::MediationConfig;
use crate::engine_core::errors::OracleError;

/// Verdict of an injection scan.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionVerdict {
    /// `false` when the score reached the configured threshold.
    pub valid: bool,
    pub score: f64,
}

/// Verdict of a sensitive-data scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SensitiveVerdict {
    /// `false` when at least one sensitive entity was found.
    pub valid: bool,
    pub score: f64,
    /// Input with sensitive spans replaced (or unchanged when redaction is off).
    pub redacted: String,
    /// Entity types that matched, in first-seen order.
    pub entities: Vec<String>,
}

/// Scores inbound text for prompt-injection likelihood.
pub trait InjectionScorer: Send + Sync {
    fn score_injection(
        &self,
        text: &str,
        config: &MediationConfig,
    ) -> Result<InjectionVerdict, OracleError>;
}

/// Scores outbound text for sensitive personal data and produces a redacted variant.
pub trait SensitiveScorer: Send + Sync {
    fn score_sensitive(
        &self,
        text: &str,
        config: &MediationConfig,
    ) -> Result<SensitiveVerdict, OracleError>;
}
