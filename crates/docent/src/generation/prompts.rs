//! Prompt templates for the generation provider

/// Marker wrapping each mined question in model output; the streaming
/// filter toggles on it, so only the wrapped text reaches the client.
pub const QUESTION_DELIMITER: &str = "###QQQ###";

/// Marker the model emits when a document block contains no questions.
/// Falls outside any delimiter pair, so clients never see it.
pub const NONE_MARKER: &str = "###NO_LIST###";

/// Prompt for mining questions and tasks out of a document block.
pub fn question_mining_prompt(text: &str) -> String {
    format!(
        r#"You are a world-class document analysis tool designed to identify questions and tasks in a provided text.

You should always analyze the smallest question or task possible, refrain from creating large questions or to-do tasks.
The question may contain small hints.

Use {QUESTION_DELIMITER} to enclose each individual question or task.

For example:
"""
TEXT:
Some text extracted from a file

AI:
{QUESTION_DELIMITER} <Action (prove, answer, do, etc.)>: <VERBATIM question or task text> {QUESTION_DELIMITER}
{QUESTION_DELIMITER} <Action (prove, answer, do, etc.)>: <VERBATIM question or task text> {QUESTION_DELIMITER}
{QUESTION_DELIMITER} <Action (prove, answer, do, etc.)>: <VERBATIM question or task text> {QUESTION_DELIMITER}
...
"""

There won't always be questions or tasks. If there are none, respond with:
"""
{NONE_MARKER}
"""

REMEMBER(!), repeat the text VERBATIM.
TEXT:
{text}

AI:
"#
    )
}

/// Prompt condensing chat history and a follow-up into one standalone
/// question for retrieval.
pub fn condense_prompt(chat_history: &[String], question: &str) -> String {
    format!(
        r#"Given the following conversation and a follow up prompt, rephrase the follow up prompt to be a standalone prompt that keeps all of its tasks and questions.

Chat history:
{}

Follow up prompt:
{question}

Standalone prompt:"#,
        chat_history.join("\n")
    )
}

/// Format one retrieved chunk for the answer context.
pub fn context_block(content: &str, source: &str) -> String {
    format!("CONTENT: {content}\nSOURCE: {source}")
}

/// Final answer prompt over the assembled retrieval context.
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        r#"Given the following context and a prompt, create a final reply with references ("SOURCES").
Answer in the best way you can all the questions in the PROMPT. You can ask for clarifications if needed.

=========
CONTEXT:
{context}
=========
PROMPT:
{question}
=========
The CONTEXT was hidden from the PROMPT giver, you can use it only if it helps.
You won't always need the CONTEXT, you can answer on your own as well.
Do NOT state your strategy, or comment about the prompt or context, ONLY GIVE THE REPLY!
Now, complete all the tasks and answer all the questions in the PROMPT in the REPLY step by step with explanation.
=========
REPLY:"#
    )
}
