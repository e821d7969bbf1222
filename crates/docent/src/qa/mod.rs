//! Request flows: question mining and retrieval-augmented answering.

pub mod answer;
pub mod questions;

pub use answer::{AnswerOutcome, ask_documents};
pub use questions::mine_questions;
