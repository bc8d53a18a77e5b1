//! Requirements Summarization Flow

use tracing::debug;

use crate::provider::ChatModel;
use crate::types::{ChatMessage, LlmResult};

const SUMMARIZE_PROMPT: &str = "Summarize the key requirements, constraints, and objectives \
from the following document or problem statement:";

/// Summarize the requirements, constraints, and objectives from a document
/// or problem statement.
pub async fn summarize_requirements(model: &dyn ChatModel, document: &str) -> LlmResult<String> {
    debug!(model = model.model(), "summarizing requirements");
    let prompt = format!("{SUMMARIZE_PROMPT}\n\n{document}");
    let summary = model.complete(None, vec![ChatMessage::user(prompt)]).await?;
    Ok(summary.trim().to_string())
}
