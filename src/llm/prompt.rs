//! Prompt assembly from conversation history and retrieved documents.

use crate::models::{ConversationTurn, ScoredDocument, Sender};

/// Number of most recent turns carried into the prompt.
pub const HISTORY_TURNS: usize = 3;

const RULE_WIDTH: usize = 40;

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// Build the full prompt for one user question.
pub fn compose(
    query: &str,
    history: &[ConversationTurn],
    retrieved: &[ScoredDocument],
    system_prompt: &str,
    assistant_name: &str,
) -> String {
    let conversation = conversation_block(history, assistant_name);

    if retrieved.is_empty() {
        return format!(
            "{system_prompt}\n\n{conversation}\nCurrent User Question: {query}\n\n\
             I don't have specific information to answer this question. Please respond \
             based on the conversation context if relevant, or tell the user that you \
             don't have the information they're looking for. Keep the answer brief, \
             under 100 words."
        );
    }

    let documents = document_block(retrieved);
    format!(
        "{system_prompt}\n\n{conversation}\nRelevant Information:\n{documents}\n\n\
         Current User Question: {query}\n\n\
         Please answer based on the relevant information provided above. Reply in plain \
         text with short paragraphs separated by blank lines. If the \
         information doesn't answer the question, say you don't have that specific \
         information and give the most helpful answer the conversation allows. Keep the \
         answer brief, under 100 words."
    )
}

/// The last [`HISTORY_TURNS`] turns as labeled dialogue, or nothing.
fn conversation_block(history: &[ConversationTurn], assistant_name: &str) -> String {
    if history.is_empty() {
        return String::new();
    }

    let start = history.len().saturating_sub(HISTORY_TURNS);
    let mut block = String::from("Previous conversation:\n");
    for turn in &history[start..] {
        let label = match turn.sender {
            Sender::User => "User",
            Sender::Bot => assistant_name,
        };
        block.push_str(&format!("{label}: {}\n", turn.context_text()));
    }
    block.push_str(&rule());
    block.push('\n');
    block
}

fn document_block(retrieved: &[ScoredDocument]) -> String {
    let rule = rule();
    let mut block = String::new();
    for (i, hit) in retrieved.iter().enumerate() {
        block.push_str(&format!(
            "\nDocument {}: {}\n{}\n{rule}\n",
            i + 1,
            hit.document.title,
            hit.document.content
        ));
    }
    block
}
