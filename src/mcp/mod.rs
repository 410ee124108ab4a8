//! Model Context Protocol surface: framing, the client reader task, the tool
//! catalogue and the server loop.

pub mod codec;
pub mod pipeline;
pub mod server;
pub mod tools;

pub use server::McpServer;
