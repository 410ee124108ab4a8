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

//! Time utilities.
//!
//! Audit timestamps are UTC, RFC 3339 (an ISO-8601 profile) with microsecond
//! precision, so lexical order matches chronological order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Compact UTC stamp safe for use inside file names.
pub fn file_stamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%6fZ").to_string()
}

/// Re-format an audit timestamp for display. Offset-less timestamps written by
/// older stores are read as UTC; unparseable input is returned as-is.
pub fn display(timestamp: &str, format: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(timestamp) {
        return ts.with_timezone(&Utc).format(format).to_string();
    }
    match NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(ts) => ts.format(format).to_string(),
        Err(_) => timestamp.to_string(),
    }
}
