//! Retrieval-augmented answer flow
//!
//! Condenses chat history into a standalone question, retrieves the
//! user's most relevant chunks, and streams the final answer through a
//! passthrough handler. The sources backing the answer are returned for
//! logging.

use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

use tracing::debug;

use crate::auth::UserId;
use crate::config::RetrievalConfig;
use crate::embedding::TextEmbedder;
use crate::error::Result;
use crate::generation::{ChatClient, Message, prompts};
use crate::index::LanceIndex;
use crate::streaming::TokenHandler;

/// Completed answer with the distinct sources that backed it.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub answer: String,
    pub sources: Vec<String>,
}

#[allow(clippy::too_many_arguments)]
pub async fn ask_documents<H>(
    handler: &mut H,
    chat: &ChatClient,
    index: &Arc<TokioMutex<LanceIndex>>,
    embedder: &Arc<dyn TextEmbedder>,
    retrieval: &RetrievalConfig,
    user: &UserId,
    prompt: &str,
    chat_history: &[String],
) -> Result<AnswerOutcome>
where
    H: TokenHandler,
{
    let question = if chat_history.is_empty() {
        prompt.to_string()
    } else {
        let condensed = chat
            .complete(
                &chat.config().answer_model,
                &[Message::user(prompts::condense_prompt(chat_history, prompt))],
                0.0,
            )
            .await?;
        debug!(condensed = %condensed, "condensed follow-up prompt");
        condensed
    };

    let query_embedding = embedder.embed(&question)?;
    let chunks = index
        .lock()
        .await
        .search(user, &query_embedding, retrieval.top_k)
        .await?;
    debug!(chunks = chunks.len(), "retrieved context");

    let context = chunks
        .iter()
        .map(|c| prompts::context_block(&c.content, &c.source))
        .collect::<Vec<_>>()
        .join("\n\n");

    let messages = [Message::user(prompts::answer_prompt(&context, &question))];
    let answer = chat
        .stream(
            &chat.config().answer_model,
            &messages,
            chat.config().temperature,
            handler,
        )
        .await?;

    let mut sources = Vec::new();
    for chunk in &chunks {
        if !sources.contains(&chunk.source) {
            sources.push(chunk.source.clone());
        }
    }

    Ok(AnswerOutcome { answer, sources })
}
