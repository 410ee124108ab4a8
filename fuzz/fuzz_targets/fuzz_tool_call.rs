// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use aegis::engine_core::models::JsonRpcRequest;
use aegis::mcp::tools::ToolCall;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary JSON must either parse into a known call or be rejected.
    if let Ok(req) = serde_json::from_slice::<JsonRpcRequest>(data) {
        let _ = ToolCall::parse(req.params.as_ref());
    }
    if let Ok(params) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = ToolCall::parse(Some(&params));
    }
});
