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

//! Monitoring report over the audit log.
//!
//! Renders KPI counters and a box-drawn table of every recorded event, one
//! row per event, colour-coded by action category. The report only reads the
//! store; it never writes or repairs it.

use colored::{ColoredString, Colorize};

use crate::engine_core::audit::AuditStore;
use crate::engine_core::constants::{audit, report};
use crate::engine_core::models::{Action, ActionCategory, SecurityEvent};
use crate::utils::time;

/// Cells longer than this are truncated with an ellipsis.
const MAX_CELL_CHARS: usize = 60;

const COLUMNS: [&str; 7] = [
    "timestamp",
    "event_type",
    "action",
    "risk_score",
    "details.reason",
    "details.original_content",
    "details.redacted_data",
];

pub const EMPTY_MESSAGE: &str = "No security events logged yet.";

/// Headline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub total: usize,
    pub injections_blocked: usize,
    pub pii_redacted: usize,
    pub access_denied: usize,
}

impl AuditSummary {
    pub fn from_events(events: &[SecurityEvent]) -> Self {
        let count = |action: Action| events.iter().filter(|e| e.action == action).count();
        Self {
            total: events.len(),
            injections_blocked: count(Action::BlockedInput),
            pii_redacted: count(Action::RedactedOutput),
            access_denied: count(Action::DeniedAccess),
        }
    }
}

/// Render the full report. With `colored` off the output is plain text.
pub fn render_report(events: &[SecurityEvent], colored: bool) -> String {
    let summary = AuditSummary::from_events(events);
    let mut out = String::new();

    out.push_str(&heading("Aegis Security Report", colored));
    out.push('\n');
    out.push_str(&format!(
        "Total Events: {}  |  Injections Blocked: {}  |  PII Leaks Prevented: {}  |  Access Denied: {}\n\n",
        summary.total, summary.injections_blocked, summary.pii_redacted, summary.access_denied
    ));

    if events.is_empty() {
        out.push_str(EMPTY_MESSAGE);
        out.push('\n');
        return out;
    }

    let mut table = Table::new(&COLUMNS);
    for event in events {
        table.add_row(row_for(event), event.action.category());
    }
    out.push_str(&table.render(colored));
    out.push('\n');
    out
}

/// Load the store and render it. A store that cannot be read yields an error
/// line instead of a table.
pub fn render_store(store: &dyn AuditStore, colored: bool) -> String {
    match store.load_all() {
        Ok(events) => render_report(&events, colored),
        Err(e) => {
            let line = format!("Error loading or parsing log file: {}", e);
            if colored {
                format!("{}\n", line.red().bold())
            } else {
                format!("{}\n", line)
            }
        }
    }
}

fn heading(text: &str, colored: bool) -> String {
    if colored {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

fn row_for(event: &SecurityEvent) -> Vec<String> {
    let detail = |key: &str| event.detail(key).map(clip).unwrap_or_default();
    vec![
        time::display(&event.timestamp, report::TIMESTAMP_FORMAT),
        event.event_type.to_string(),
        event.action.to_string(),
        format!("{:.2}", event.risk_score),
        detail(audit::KEY_REASON),
        detail(audit::KEY_ORIGINAL_CONTENT),
        detail(audit::KEY_REDACTED_DATA),
    ]
}

/// Single-line, bounded rendering of a detail value.
fn clip(value: &str) -> String {
    let flat: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= MAX_CELL_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(MAX_CELL_CHARS - 1).collect();
    cut.push('\u{2026}');
    cut
}

fn paint(text: String, category: ActionCategory) -> ColoredString {
    match category {
        ActionCategory::Alert => text.red(),
        ActionCategory::Warning => text.yellow(),
        ActionCategory::Info => text.blue(),
        ActionCategory::Success => text.green(),
    }
}

/// Box-drawn table. Widths are measured on plain text before colouring so
/// escape codes never skew the layout.
struct Table {
    headers: Vec<String>,
    rows: Vec<(Vec<String>, ActionCategory)>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn add_row(&mut self, cells: Vec<String>, category: ActionCategory) {
        let row = (0..self.headers.len())
            .map(|i| cells.get(i).cloned().unwrap_or_default())
            .collect();
        self.rows.push((row, category));
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for (row, _) in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        widths
    }

    fn pad(text: &str, width: usize) -> String {
        let len = text.chars().count();
        if len >= width {
            return text.to_string();
        }
        format!("{text}{}", " ".repeat(width - len))
    }

    fn border(widths: &[usize], left: &str, mid: &str, right: &str) -> String {
        let segments: Vec<String> = widths.iter().map(|w| "\u{2500}".repeat(w + 2)).collect();
        format!("{left}{}{right}", segments.join(mid))
    }

    fn render(&self, colored: bool) -> String {
        let widths = self.column_widths();
        let mut lines = Vec::with_capacity(self.rows.len() + 4);

        lines.push(Self::border(&widths, "\u{250c}", "\u{252c}", "\u{2510}"));

        let header: Vec<String> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let padded = Self::pad(h, widths[i]);
                if colored {
                    format!(" {} ", padded.bold())
                } else {
                    format!(" {} ", padded)
                }
            })
            .collect();
        lines.push(format!("\u{2502}{}\u{2502}", header.join("\u{2502}")));

        lines.push(Self::border(&widths, "\u{251c}", "\u{253c}", "\u{2524}"));

        for (row, category) in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let padded = Self::pad(cell, widths[i]);
                    if colored {
                        format!(" {} ", paint(padded, *category))
                    } else {
                        format!(" {} ", padded)
                    }
                })
                .collect();
            lines.push(format!("\u{2502}{}\u{2502}", cells.join("\u{2502}")));
        }

        lines.push(Self::border(&widths, "\u{2514}", "\u{2534}", "\u{2518}"));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_core::audit::MemoryAuditStore;
    use crate::engine_core::models::EventType;
    use std::collections::BTreeMap;

    fn event(action: Action, details: &[(&str, &str)]) -> SecurityEvent {
        SecurityEvent {
            timestamp: "2026-02-03T04:05:06.000007Z".to_string(),
            event_type: EventType::Info,
            details: details
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            risk_score: 0.5,
            action,
        }
    }

    #[test]
    fn test_summary_counts() {
        let events = vec![
            event(Action::BlockedInput, &[]),
            event(Action::DeniedAccess, &[]),
            event(Action::DeniedAccess, &[]),
            event(Action::RedactedOutput, &[]),
            event(Action::AllowedInput, &[]),
        ];
        assert_eq!(
            AuditSummary::from_events(&events),
            AuditSummary {
                total: 5,
                injections_blocked: 1,
                pii_redacted: 1,
                access_denied: 2,
            }
        );
    }

    #[test]
    fn test_empty_report() {
        let out = render_report(&[], false);
        assert!(out.contains("Total Events: 0"));
        assert!(out.contains(EMPTY_MESSAGE));
        assert!(!out.contains('\u{250c}'));
    }

    #[test]
    fn test_rows_and_columns() {
        let events = vec![event(
            Action::RedactedOutput,
            &[("reason", "PII"), ("redacted_data", "ssn [REDACTED]")],
        )];
        let out = render_report(&events, false);
        for column in COLUMNS {
            assert!(out.contains(column), "missing column {column}");
        }
        assert!(out.contains("2026-02-03 04:05:06"));
        assert!(out.contains("REDACTED_OUTPUT"));
        assert!(out.contains("ssn [REDACTED]"));
        assert!(out.contains("0.50"));

        let table_lines = out.lines().filter(|l| l.starts_with('\u{2502}')).count();
        assert_eq!(table_lines, 2);
    }

    #[test]
    fn test_long_content_is_clipped_to_one_line() {
        let long = format!("line one\n{}", "x".repeat(200));
        let clipped = clip(&long);
        assert!(!clipped.contains('\n'));
        assert_eq!(clipped.chars().count(), MAX_CELL_CHARS);
        assert!(clipped.ends_with('\u{2026}'));
    }

    #[test]
    fn test_store_rendering() {
        let store = MemoryAuditStore::new();
        assert!(render_store(&store, false).contains(EMPTY_MESSAGE));
        store.append(&event(Action::SessionReset, &[])).unwrap();
        assert!(render_store(&store, false).contains("SESSION_RESET"));
    }
}
