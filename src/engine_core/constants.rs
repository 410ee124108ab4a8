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

//! Aegis constants - Single source of truth for all configuration values.
//!
//! This module centralizes error codes, tool names, fixed risk scores and
//! audit reasons to keep the mediation engine, the MCP surface and the
//! report renderer consistent.

/// JSON-RPC 2.0 Error Codes
pub mod jsonrpc {
    /// Method not found (standard JSON-RPC)
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid request (standard JSON-RPC)
    pub const ERROR_INVALID_REQUEST: i32 = -32600;
    /// Invalid params (standard JSON-RPC)
    pub const ERROR_INVALID_PARAMS: i32 = -32602;
    /// Internal error (standard JSON-RPC)
    pub const ERROR_INTERNAL: i32 = -32603;
    /// Parse error (standard JSON-RPC)
    pub const ERROR_PARSE: i32 = -32700;
}

/// MCP Protocol Methods
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

/// MCP server identity and negotiated defaults
pub mod server {
    pub const NAME: &str = "aegis";
    pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
}

/// Tool names and argument keys exposed over MCP
pub mod tools {
    pub const ANALYZE_INCOMING: &str = "analyze_incoming_content";
    pub const SCAN_OUTPUT: &str = "scan_output_data";
    pub const RESET_SESSION: &str = "reset_security_session";

    pub const ARG_CONTENT: &str = "content_to_scan";
    pub const ARG_DATA: &str = "data_to_scan";
}

/// Fixed risk scores used by the mediation engine
pub mod risk {
    /// Risk reported for an access denial or a failed (inconclusive) scan
    pub const DENIED: f64 = 1.0;
    /// Risk reported for uneventful allows and admin actions
    pub const NONE: f64 = 0.0;
}

/// Reasons and keys written into audit record details
pub mod audit {
    pub const REASON_INJECTION: &str = "High-risk prompt injection attempt detected.";
    pub const REASON_SESSION_TAINTED: &str = "session tainted";
    pub const REASON_PII: &str = "Sensitive PII detected and redacted.";
    pub const REASON_INJECTION_INCONCLUSIVE: &str = "injection scan inconclusive";
    pub const REASON_SENSITIVE_INCONCLUSIVE: &str = "sensitive-data scan inconclusive";
    pub const ADMIN_SESSION_RESET: &str = "Session reset";

    pub const KEY_REASON: &str = "reason";
    pub const KEY_ORIGINAL_CONTENT: &str = "original_content";
    pub const KEY_SCANNED_CONTENT: &str = "scanned_content";
    pub const KEY_ORIGINAL_DATA: &str = "original_data";
    pub const KEY_REDACTED_DATA: &str = "redacted_data";
    pub const KEY_ENTITIES: &str = "entities";
    pub const KEY_DATA: &str = "data";
    pub const KEY_ACTION: &str = "action";
    pub const KEY_SESSION_ID: &str = "session_id";

    /// Default file name of the audit log store
    pub const DEFAULT_LOG_FILE: &str = "security_events.json";
    /// Suffix of the sidecar file used for cross-process locking
    pub const LOCK_SUFFIX: &str = "lock";
    /// Infix of quarantined (unparseable) store files
    pub const CORRUPT_INFIX: &str = "corrupt";
}

/// Detection defaults, applied when the configuration source is unavailable
pub mod detection {
    pub const DEFAULT_INJECTION_THRESHOLD: f64 = 0.90;
    pub const DEFAULT_PII_THRESHOLD: f64 = 0.5;
    pub const DEFAULT_CUSTOM_PATTERN_SCORE: f64 = 0.75;
    /// Replacement written over redacted spans
    pub const REDACTION_MARKER: &str = "[REDACTED]";
    /// Minimum run of base64 characters worth decoding and re-scanning
    pub const MIN_ENCODED_PAYLOAD_LEN: usize = 24;
}

/// Configuration Environment Variables
pub mod config {
    pub const ENV_CONFIG_PATH: &str = "AEGIS_CONFIG_PATH";
    pub const ENV_AUDIT_LOG_PATH: &str = "AEGIS_AUDIT_LOG_PATH";
    pub const ENV_LOG_LEVEL: &str = "AEGIS_LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "AEGIS_LOG_FORMAT";
    pub const ENV_CORRUPT_LOG_POLICY: &str = "AEGIS_CORRUPT_LOG_POLICY";

    pub const DEFAULT_CONFIG_FILE: &str = "config.json";
    /// How often the serving process checks the config file for changes, in seconds
    pub const RELOAD_DEBOUNCE_MS: u64 = 200;
}

/// Monitoring report defaults
pub mod report {
    /// Refresh interval of `aegis report --watch`, in seconds
    pub const DEFAULT_REFRESH_SECS: u64 = 2;
    /// Display format for timestamps in the report table
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}

/// Transport Limits (DoS Protection)
pub mod limits {
    /// Maximum allowed JSON-RPC message size (10 MB)
    pub const MAX_MESSAGE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    /// Maximum size of an LSP-style header block
    pub const MAX_HEADER_BYTES: usize = 4096;
}
