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

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, error};

use crate::engine_core::models::JsonRpcRequest;
use crate::mcp::codec::{Framing, McpCodec};

/// Messages arriving from the client (the agent)
#[derive(Debug)]
pub enum ClientEvent {
    Request(JsonRpcRequest, Framing),
    /// A frame arrived but was not a JSON-RPC request. The server answers
    /// with a parse error carrying a null id.
    Malformed(String, Framing),
    /// Client disconnected (EOF) or explicit shutdown
    Disconnect,
    /// Unrecoverable framing error; the stream is abandoned
    Error(String),
}

/// Spawns a background task that frames the client stream into events.
pub fn spawn_client_reader<R>(stream: R, tx: mpsc::Sender<ClientEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut framed = FramedRead::new(stream, McpCodec::new());

        while let Some(result) = framed.next().await {
            let event = match result {
                Ok(frame) => match frame.payload {
                    Ok(val) => match serde_json::from_value::<JsonRpcRequest>(val) {
                        Ok(req) => ClientEvent::Request(req, frame.framing),
                        Err(e) => {
                            debug!("JSON-RPC request shape error: {}", e);
                            ClientEvent::Malformed(e.to_string(), frame.framing)
                        }
                    },
                    Err(e) => {
                        debug!("JSON parse error: {}", e);
                        ClientEvent::Malformed(e, frame.framing)
                    }
                },
                Err(e) => {
                    error!("Framing error: {}", e);
                    let _ = tx.send(ClientEvent::Error(e.to_string())).await;
                    break;
                }
            };
            if tx.send(event).await.is_err() {
                return;
            }
        }
        let _ = tx.send(ClientEvent::Disconnect).await;
    });
}
