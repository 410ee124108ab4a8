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

//! MCP tool catalogue and dispatch onto the mediation engine.

use serde_json::{json, Value};

use crate::engine_core::constants::tools;
use crate::engine_core::errors::InterceptorError;
use crate::engine_core::mediator::MediationEngine;
use crate::engine_core::models::SessionId;

/// A validated `tools/call` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    AnalyzeIncoming { content: String },
    ScanOutput { data: String },
    ResetSession,
}

impl ToolCall {
    /// Parse `tools/call` params: `{"name": .., "arguments": {..}}`.
    pub fn parse(params: Option<&Value>) -> Result<Self, InterceptorError> {
        let params = params.and_then(Value::as_object).ok_or_else(|| {
            InterceptorError::ValidationError("params must be an object".to_string())
        })?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| InterceptorError::ValidationError("missing tool name".to_string()))?;
        let args = params.get("arguments");

        match name {
            tools::ANALYZE_INCOMING => Ok(ToolCall::AnalyzeIncoming {
                content: string_arg(args, tools::ARG_CONTENT)?,
            }),
            tools::SCAN_OUTPUT => Ok(ToolCall::ScanOutput {
                data: string_arg(args, tools::ARG_DATA)?,
            }),
            tools::RESET_SESSION => Ok(ToolCall::ResetSession),
            other => Err(InterceptorError::ValidationError(format!(
                "unknown tool '{}'",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::AnalyzeIncoming { .. } => tools::ANALYZE_INCOMING,
            ToolCall::ScanOutput { .. } => tools::SCAN_OUTPUT,
            ToolCall::ResetSession => tools::RESET_SESSION,
        }
    }
}

fn string_arg(args: Option<&Value>, key: &str) -> Result<String, InterceptorError> {
    args.and_then(|a| a.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            InterceptorError::ValidationError(format!("missing or non-string argument '{}'", key))
        })
}

/// The `tools/list` result.
pub fn tool_definitions() -> Value {
    json!({
        "tools": [
            {
                "name": tools::ANALYZE_INCOMING,
                "description": "Scans any inbound text for prompt injection attacks.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        (tools::ARG_CONTENT): { "type": "string" }
                    },
                    "required": [tools::ARG_CONTENT]
                }
            },
            {
                "name": tools::SCAN_OUTPUT,
                "description": "Scans any outbound text for sensitive PII.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        (tools::ARG_DATA): { "type": "string" }
                    },
                    "required": [tools::ARG_DATA]
                }
            },
            {
                "name": tools::RESET_SESSION,
                "description": "Resets the session's security state.",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            }
        ]
    })
}

/// Run the call against the engine and wrap the outcome as an MCP tool result.
pub fn dispatch(
    engine: &MediationEngine,
    session: &SessionId,
    call: &ToolCall,
) -> Result<Value, InterceptorError> {
    let outcome = match call {
        ToolCall::AnalyzeIncoming { content } => {
            serde_json::to_value(engine.analyze_incoming(session, content))?
        }
        ToolCall::ScanOutput { data } => serde_json::to_value(engine.scan_outgoing(session, data))?,
        ToolCall::ResetSession => serde_json::to_value(engine.reset_session(session))?,
    };

    Ok(json!({
        "content": [{ "type": "text", "text": serde_json::to_string(&outcome)? }],
        "structuredContent": outcome,
        "isError": false
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tools() {
        let call = ToolCall::parse(Some(&json!({
            "name": "scan_output_data",
            "arguments": { "data_to_scan": "hello" }
        })))
        .unwrap();
        assert_eq!(call, ToolCall::ScanOutput { data: "hello".into() });

        let call = ToolCall::parse(Some(&json!({ "name": "reset_security_session" }))).unwrap();
        assert_eq!(call, ToolCall::ResetSession);
        assert_eq!(call.name(), tools::RESET_SESSION);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ToolCall::parse(None).is_err());
        assert!(ToolCall::parse(Some(&json!({ "name": "rm_rf" }))).is_err());
        assert!(ToolCall::parse(Some(&json!({
            "name": "analyze_incoming_content",
            "arguments": { "content_to_scan": 42 }
        })))
        .is_err());
        assert!(ToolCall::parse(Some(&json!({ "name": "analyze_incoming_content" }))).is_err());
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let defs = tool_definitions();
        let names: Vec<&str> = defs["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![tools::ANALYZE_INCOMING, tools::SCAN_OUTPUT, tools::RESET_SESSION]
        );
    }
}
