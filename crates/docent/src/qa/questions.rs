//! Question mining flow
//!
//! Runs every extracted block of a document through the question-mining
//! prompt. The model wraps each found question in the delimiter marker, so
//! a `DelimiterFilter` attached to the stream exposes only the questions.
//! A provider failure on one block skips that block; the remaining blocks
//! still run.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;
use crate::extract::extract_blocks;
use crate::generation::{ChatClient, Message, prompts};
use crate::streaming::TokenHandler;

pub async fn mine_questions<H>(
    handler: &mut H,
    chat: &ChatClient,
    document_path: &Path,
) -> Result<()>
where
    H: TokenHandler,
{
    let blocks = extract_blocks(document_path).await?;
    debug!(blocks = blocks.len(), "mining questions");

    for block in &blocks {
        let messages = [Message::user(prompts::question_mining_prompt(
            &block.content,
        ))];

        if let Err(e) = chat
            .stream(&chat.config().question_model, &messages, 0.0, handler)
            .await
        {
            warn!(
                source = %block.source,
                page = block.page,
                error = %e,
                "question mining failed for block; skipping"
            );
        }
    }

    Ok(())
}
