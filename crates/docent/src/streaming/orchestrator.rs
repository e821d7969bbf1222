//! Completion orchestration
//!
//! Drives one generation job end-to-end against a token handler. The
//! orchestrator owns the end-of-generation hook: it fires after the job
//! future resolves whether the job succeeded or failed, so every request
//! stream terminates with exactly one `EndStream` and clients never hang
//! on a dead connection.

use tracing::error;

use crate::error::Result;

use super::filter::TokenHandler;

/// Run `job` against `handler`, then terminate the stream.
///
/// The handler's `on_end` is invoked unconditionally once the job future
/// resolves. A job failure is surfaced as an ERROR-level tracing event and
/// returned to the caller; it never suppresses stream termination.
pub async fn run_generation<H, F>(mut handler: H, job: F) -> Result<()>
where
    H: TokenHandler,
    F: AsyncFnOnce(&mut H) -> Result<()>,
{
    let outcome = job(&mut handler).await;

    if let Err(ref e) = outcome {
        error!(error = %e, "generation job failed; terminating stream");
    }

    handler.on_end();
    outcome
}
