//! Upstream generation provider: chat client, SSE decoding, prompts.

mod client;
pub mod prompts;
mod sse;

pub use client::{ChatClient, Message};
pub use sse::{SseDecoder, SseEvent, parse_content_delta};
