//! Test-Case Generation Flow

use reqtrace_core::flowchart::TestCase;
use serde::Deserialize;
use tracing::debug;

use crate::provider::ChatModel;
use crate::types::{ChatMessage, LlmError, LlmResult};

const GENERATE_PROMPT: &str = r#"You are a test case generation expert. Based on the confirmed understanding of the requirements and specifications, generate a comprehensive set of test cases.

Generate test cases that cover various scenarios and edge cases to ensure full test coverage.
The output should be a valid JSON array of objects, where each object has an "id" (e.g., "TC1") and a "description" of the test case. Do not include anything else in the output.
Example format:
[
  {"id": "TC1", "description": "Verify user can log in with valid credentials."},
  {"id": "TC2", "description": "Verify user cannot log in with invalid credentials."}
]"#;

/// Generated test case before standards mapping.
#[derive(Debug, Deserialize)]
struct GeneratedCase {
    #[serde(default)]
    id: String,
    #[serde(default)]
    description: String,
}

/// Generate test cases from the confirmed understanding of the requirements.
///
/// Standards are left empty here; the mapping flow fills them in.
pub async fn generate_test_cases(
    model: &dyn ChatModel,
    confirmed_understanding: &str,
) -> LlmResult<Vec<TestCase>> {
    debug!(model = model.model(), "generating test cases");
    let prompt = format!("{GENERATE_PROMPT}\n\nConfirmed Understanding: {confirmed_understanding}");
    let raw = model.complete(None, vec![ChatMessage::user(prompt)]).await?;

    let cases: Vec<GeneratedCase> =
        serde_json::from_str(strip_code_fences(&raw)).map_err(|e| LlmError::ParseError {
            message: format!("test cases are not a JSON array: {e}"),
        })?;

    Ok(cases
        .into_iter()
        .map(|c| TestCase {
            id: c.id,
            description: c.description,
            standards: Vec::new(),
        })
        .collect())
}

/// Drop a surrounding markdown code fence, if the model added one anyway.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
