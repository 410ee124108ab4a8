// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use aegis::mcp::codec::McpCodec;
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // No byte sequence may panic the framer, in either framing mode.
    let mut codec = McpCodec::new();
    let mut buffer = BytesMut::from(data);

    // Every successful frame consumes input, so this terminates.
    while let Ok(Some(_)) = codec.decode(&mut buffer) {}
});
