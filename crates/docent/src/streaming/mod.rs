//! Token streaming core: per-request event channel, token filters, and
//! the orchestrator that guarantees stream termination.

mod channel;
mod events;
mod filter;
mod orchestrator;

pub use channel::{EventReceiver, EventSender, channel};
pub use events::StreamEvent;
pub use filter::{DelimiterFilter, PassthroughHandler, TokenHandler};
pub use orchestrator::run_generation;
