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

//! MCP Transport Codec.
//!
//! Handles the low-level framing of JSON-RPC messages.
//! Supports both standard MCP stdio (newline delimited) and LSP-style
//! Content-Length headers. The framing is detected per message and remembered
//! so the reply can be written back the same way. A message only enters header
//! mode when its first line is a `Name: value` header; any other line is a
//! newline-framed message, even if it is not JSON.

use crate::engine_core::constants::limits;
use crate::engine_core::models::JsonRpcResponse;
use anyhow::{anyhow, Context, Result};
use bytes::BytesMut;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

/// How a message was (or should be) delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// One JSON document per line.
    #[default]
    Newline,
    /// `Content-Length: N\r\n\r\n` header followed by N bytes of JSON.
    ContentLength,
}

/// One decoded frame. A frame whose body is not valid JSON is still delivered,
/// so the server can answer with a parse error instead of dropping the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub framing: Framing,
    pub payload: std::result::Result<Value, String>,
}

/// Outbound message paired with the framing to write it in.
#[derive(Debug, Clone, Copy)]
pub struct Reply<'a> {
    pub response: &'a JsonRpcResponse,
    pub framing: Framing,
}

// State machine for LSP-style headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Head,
    Body(usize),
}

pub struct McpCodec {
    state: DecodeState,
}

impl McpCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DecodeState::Head,
        }
    }

    fn decode_line(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let Some(pos) = src.iter().position(|b| *b == b'\n') else {
            if src.len() as u64 > limits::MAX_MESSAGE_SIZE_BYTES {
                return Err(anyhow!(
                    "Message exceeded size limit of {} bytes",
                    limits::MAX_MESSAGE_SIZE_BYTES
                ));
            }
            return Ok(None);
        };

        let line = src.split_to(pos + 1);
        if line.len() as u64 > limits::MAX_MESSAGE_SIZE_BYTES {
            return Err(anyhow!(
                "Message exceeded size limit of {} bytes",
                limits::MAX_MESSAGE_SIZE_BYTES
            ));
        }
        let payload =
            serde_json::from_slice::<Value>(trim_ascii(&line)).map_err(|e| e.to_string());
        trace!("Decoded newline-framed message: {:?}", payload);
        Ok(Some(Frame {
            framing: Framing::Newline,
            payload,
        }))
    }

    fn decode_header(&mut self, src: &mut BytesMut) -> Result<Option<()>> {
        let mut i = 0;
        let mut found_header = false;

        // Scan for \r\n\r\n or \n\n
        while i < src.len() {
            if src[i] == b'\n' {
                if i >= 1 && src[i - 1] == b'\n' {
                    found_header = true;
                    i += 1;
                    break;
                }
                if i >= 3 && src[i - 1] == b'\r' && src[i - 2] == b'\n' && src[i - 3] == b'\r' {
                    found_header = true;
                    i += 1;
                    break;
                }
            }
            i += 1;
        }

        if !found_header {
            if src.len() > limits::MAX_HEADER_BYTES {
                return Err(anyhow!("Header too large"));
            }
            return Ok(None);
        }

        let header_bytes = src.split_to(i);
        let header_str = std::str::from_utf8(&header_bytes).context("Invalid UTF-8 in headers")?;

        let mut len = 0;
        for line in header_str.lines() {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            if name.trim().eq_ignore_ascii_case("content-length") {
                len = value
                    .trim()
                    .parse::<usize>()
                    .context("Invalid content-length value")?;
                debug!("Found Content-Length: {}", len);
            }
        }

        if len == 0 {
            return Err(anyhow!("Missing or invalid Content-Length header"));
        }
        if len as u64 > limits::MAX_MESSAGE_SIZE_BYTES {
            return Err(anyhow!("Message length {} exceeds max limit", len));
        }

        self.state = DecodeState::Body(len);
        Ok(Some(()))
    }
}

impl Default for McpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for McpCodec {
    type Item = Frame;
    type Error = anyhow::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        trace!("Decoder attempting to read from {} bytes buffer", src.len());
        loop {
            match self.state {
                DecodeState::Head => {
                    // Blank lines between messages are noise in either framing.
                    let leading = src.iter().take_while(|b| b.is_ascii_whitespace()).count();
                    let _ = src.split_to(leading);

                    match src.first() {
                        None => return Ok(None),
                        Some(b'{') | Some(b'[') => return self.decode_line(src),
                        Some(_) => {
                            let is_header = src
                                .iter()
                                .position(|b| *b == b'\n')
                                .is_some_and(|end| is_header_line(&src[..end]));
                            if !is_header {
                                // Stray text, or a line still arriving
                                return self.decode_line(src);
                            }
                            if self.decode_header(src)?.is_none() {
                                return Ok(None);
                            }
                        }
                    }
                }
                DecodeState::Body(len) => {
                    if src.len() < len {
                        return Ok(None);
                    }
                    let body = src.split_to(len);
                    self.state = DecodeState::Head;
                    let payload =
                        serde_json::from_slice::<Value>(&body).map_err(|e| e.to_string());
                    trace!("Decoded content-length message: {:?}", payload);
                    return Ok(Some(Frame {
                        framing: Framing::ContentLength,
                        payload,
                    }));
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        match self.state {
            // Last line of the stream without its newline
            DecodeState::Head if !src.contains(&b'\n') => {
                src.extend_from_slice(b"\n");
                self.decode_line(src)
            }
            _ => Err(anyhow!("Stream ended inside a message ({} bytes pending)", src.len())),
        }
    }
}

impl<'a> Encoder<Reply<'a>> for McpCodec {
    type Error = anyhow::Error;

    fn encode(&mut self, item: Reply<'a>, dst: &mut BytesMut) -> Result<()> {
        let body = serde_json::to_vec(item.response)?;
        match item.framing {
            Framing::Newline => {
                dst.reserve(body.len() + 1);
                dst.extend_from_slice(&body);
                dst.extend_from_slice(b"\n");
            }
            Framing::ContentLength => {
                let header = format!("Content-Length: {}\r\n\r\n", body.len());
                dst.reserve(header.len() + body.len());
                dst.extend_from_slice(header.as_bytes());
                dst.extend_from_slice(&body);
            }
        }
        Ok(())
    }
}

/// `Name: value` with an RFC 7230 token as the name.
fn is_header_line(line: &[u8]) -> bool {
    let Some(colon) = line.iter().position(|b| *b == b':') else {
        return false;
    };
    let name = &line[..colon];
    !name.is_empty()
        && name
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    let end = bytes.len() - bytes.iter().rev().take_while(|b| b.is_ascii_whitespace()).count();
    if start >= end {
        &[]
    } else {
        &bytes[start..end]
    }
}
