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

//! Regex-based sensitive entity recognizer.
//!
//! Each built-in recognizer pairs a pattern with a confidence and an optional
//! checksum validator (Luhn for cards, mod-97 for IBANs). Operator-supplied
//! patterns become additional entities named after the pattern.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::{MediationConfig, PatternTarget};
use crate::engine_core::constants::detection;
use crate::engine_core::errors::OracleError;
use crate::engine_core::traits::{SensitiveScorer, SensitiveVerdict};

struct Recognizer {
    entity: &'static str,
    pattern: &'static str,
    confidence: f64,
    validate: Option<fn(&str) -> bool>,
}

const RECOGNIZERS: &[Recognizer] = &[
    Recognizer {
        entity: "CREDIT_CARD",
        pattern: r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{1,7}\b",
        confidence: 0.9,
        validate: Some(luhn_valid),
    },
    Recognizer {
        entity: "US_SSN",
        pattern: r"\b\d{3}-\d{2}-\d{4}\b",
        confidence: 0.85,
        validate: Some(ssn_valid),
    },
    Recognizer {
        entity: "EMAIL_ADDRESS",
        pattern: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        confidence: 0.85,
        validate: None,
    },
    Recognizer {
        entity: "IBAN_CODE",
        pattern: r"\b[A-Z]{2}\d{2}(?: ?[A-Z0-9]{4}){2,7}(?: ?[A-Z0-9]{1,3})?\b",
        confidence: 0.8,
        validate: Some(iban_valid),
    },
    Recognizer {
        entity: "CRYPTO",
        pattern: r"\b(?:bc1[a-z0-9]{25,39}|[13][a-km-zA-HJ-NP-Z1-9]{25,34})\b",
        confidence: 0.7,
        validate: None,
    },
    Recognizer {
        entity: "PHONE_NUMBER",
        pattern: r"(?:\+?1[ .-]?)?(?:\(\d{3}\)|\b\d{3})[ .-]\d{3}[ .-]\d{4}\b",
        confidence: 0.6,
        validate: None,
    },
    Recognizer {
        entity: "IP_ADDRESS",
        pattern: r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b",
        confidence: 0.6,
        validate: None,
    },
];

fn compiled() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        RECOGNIZERS
            .iter()
            .map(|r| {
                Regex::new(r.pattern)
                    .unwrap_or_else(|e| unreachable!("static regex {}: {e}", r.entity))
            })
            .collect()
    })
}

/// One recognized span.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMatch {
    pub entity: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f64,
}

#[derive(Debug, Default, Clone)]
pub struct RegexSensitiveScorer;

impl RegexSensitiveScorer {
    pub fn new() -> Self {
        Self
    }

    /// Matches selected by the config's entity set and confidence threshold, ordered by position.
    pub fn find(
        &self,
        text: &str,
        config: &MediationConfig,
    ) -> Result<Vec<EntityMatch>, OracleError> {
        let mut found = Vec::new();

        for (recognizer, re) in RECOGNIZERS.iter().zip(compiled()) {
            if !config.scans_entity(recognizer.entity)
                || recognizer.confidence < config.pii_scan_threshold
            {
                continue;
            }
            for m in re.find_iter(text) {
                if recognizer.validate.is_some_and(|check| !check(m.as_str())) {
                    continue;
                }
                found.push(EntityMatch {
                    entity: recognizer.entity.to_string(),
                    start: m.start(),
                    end: m.end(),
                    confidence: recognizer.confidence,
                });
            }
        }

        for pattern in config.patterns_for(PatternTarget::Sensitive) {
            if pattern.score < config.pii_scan_threshold {
                continue;
            }
            for re in pattern.regexes()? {
                for m in re.find_iter(text) {
                    found.push(EntityMatch {
                        entity: pattern.name.clone(),
                        start: m.start(),
                        end: m.end(),
                        confidence: pattern.score,
                    });
                }
            }
        }

        found.sort_by_key(|m| (m.start, m.end));
        Ok(found)
    }
}

impl SensitiveScorer for RegexSensitiveScorer {
    fn score_sensitive(
        &self,
        text: &str,
        config: &MediationConfig,
    ) -> Result<SensitiveVerdict, OracleError> {
        let found = self.find(text, config)?;

        let score = found.iter().map(|m| m.confidence).fold(0.0, f64::max);
        let mut entities: Vec<String> = Vec::new();
        for m in &found {
            if !entities.contains(&m.entity) {
                entities.push(m.entity.clone());
            }
        }

        let redacted = if config.pii_scan_redact {
            redact(text, &found)
        } else {
            text.to_string()
        };

        Ok(SensitiveVerdict {
            valid: found.is_empty(),
            score,
            redacted,
            entities,
        })
    }
}

/// Replace every matched span with the marker; overlapping spans are merged first.
fn redact(text: &str, sorted: &[EntityMatch]) -> String {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for m in sorted {
        match spans.last_mut() {
            Some(last) if m.start <= last.1 => last.1 = last.1.max(m.end),
            _ => spans.push((m.start, m.end)),
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in spans {
        out.push_str(&text[cursor..start]);
        out.push_str(detection::REDACTION_MARKER);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

fn ssn_valid(candidate: &str) -> bool {
    let mut parts = candidate.split('-');
    let (Some(area), Some(group), Some(serial)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    area != "000" && area != "666" && !area.starts_with('9') && group != "00" && serial != "0000"
}

fn iban_valid(candidate: &str) -> bool {
    let compact: String = candidate.chars().filter(|c| !c.is_whitespace()).collect();
    if !(15..=34).contains(&compact.len()) {
        return false;
    }
    let (head, tail) = compact.split_at(4);
    let mut remainder: u32 = 0;
    for c in tail.chars().chain(head.chars()) {
        let value = match c.to_digit(36) {
            Some(v) => v,
            None => return false,
        };
        let chunk = if value >= 10 { 100 } else { 10 };
        remainder = (remainder * chunk + value) % 97;
    }
    remainder == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomPattern;
    use std::collections::BTreeSet;

    fn scan(text: &str) -> SensitiveVerdict {
        RegexSensitiveScorer::new()
            .score_sensitive(text, &MediationConfig::default())
            .unwrap()
    }

    #[test]
    fn test_clean_text_passes_through() {
        let v = scan("the meeting is at noon");
        assert!(v.valid);
        assert_eq!(v.score, 0.0);
        assert_eq!(v.redacted, "the meeting is at noon");
        assert!(v.entities.is_empty());
    }

    #[test]
    fn test_ssn_is_redacted() {
        let v = scan("my ssn is 123-45-6789");
        assert!(!v.valid);
        assert_eq!(v.redacted, "my ssn is [REDACTED]");
        assert_eq!(v.entities, vec!["US_SSN".to_string()]);
        assert_eq!(v.score, 0.85);
    }

    #[test]
    fn test_multiple_entities() {
        let v = scan("mail jane.doe@example.com, card 4111 1111 1111 1111, host 10.0.0.12");
        assert!(!v.valid);
        assert_eq!(v.score, 0.9);
        assert!(v.entities.contains(&"EMAIL_ADDRESS".to_string()));
        assert!(v.entities.contains(&"CREDIT_CARD".to_string()));
        assert!(v.entities.contains(&"IP_ADDRESS".to_string()));
        assert_eq!(v.redacted, "mail [REDACTED], card [REDACTED], host [REDACTED]");
    }

    #[test]
    fn test_checksums_reject_lookalikes() {
        assert!(scan("order 4111 1111 1111 1112").valid);
        assert!(scan("ticket 000-12-3456").valid);
        assert!(luhn_valid("4111-1111-1111-1111"));
        assert!(iban_valid("GB82 WEST 1234 5698 7654 32"));
        assert!(!iban_valid("GB82 WEST 1234 5698 7654 33"));
    }

    #[test]
    fn test_entity_selection_and_threshold() {
        let only_email = MediationConfig {
            pii_entities_to_scan: BTreeSet::from(["EMAIL_ADDRESS".to_string()]),
            ..MediationConfig::default()
        };
        let v = RegexSensitiveScorer::new()
            .score_sensitive("ssn 123-45-6789", &only_email)
            .unwrap();
        assert!(v.valid);

        let high_threshold = MediationConfig {
            pii_scan_threshold: 0.95,
            ..MediationConfig::default()
        };
        let v = RegexSensitiveScorer::new()
            .score_sensitive("ssn 123-45-6789", &high_threshold)
            .unwrap();
        assert!(v.valid);
    }

    #[test]
    fn test_redaction_disabled_keeps_text() {
        let config = MediationConfig {
            pii_scan_redact: false,
            ..MediationConfig::default()
        };
        let v = RegexSensitiveScorer::new()
            .score_sensitive("ssn 123-45-6789", &config)
            .unwrap();
        assert!(!v.valid);
        assert_eq!(v.redacted, "ssn 123-45-6789");
    }

    #[test]
    fn test_custom_sensitive_pattern() {
        let config = MediationConfig {
            custom_regex_patterns: vec![CustomPattern::new(
                "EMPLOYEE_ID",
                &[r"EMP-\d{6}"],
                0.75,
                PatternTarget::Sensitive,
            )],
            ..MediationConfig::default()
        };
        let v = RegexSensitiveScorer::new()
            .score_sensitive("badge EMP-004211 checked in", &config)
            .unwrap();
        assert_eq!(v.entities, vec!["EMPLOYEE_ID".to_string()]);
        assert_eq!(v.redacted, "badge [REDACTED] checked in");
    }

    #[test]
    fn test_overlapping_spans_merge() {
        let found = vec![
            EntityMatch {
                entity: "A".into(),
                start: 2,
                end: 6,
                confidence: 0.9,
            },
            EntityMatch {
                entity: "B".into(),
                start: 4,
                end: 8,
                confidence: 0.9,
            },
        ];
        assert_eq!(redact("0123456789", &found), "01[REDACTED]89");
    }
}
