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

//! Aegis: a security mediator for Model Context Protocol agents.
//!
//! Inbound text is screened for prompt injection; a detection taints the
//! session and every later outbound request from that session is denied.
//! Outbound text from a clean session is screened for sensitive personal data
//! and redacted. Every decision is appended to a durable audit log, which the
//! [`report`] module renders for monitoring.

pub mod config;
pub mod engine;
pub mod engine_core;
pub mod mcp;
pub mod report;
pub mod utils;
