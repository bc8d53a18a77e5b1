//! Compliance-Standards Mapping Flow

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::test_cases::strip_code_fences;
use crate::provider::ChatModel;
use crate::types::{ChatMessage, LlmError, LlmResult};

const MAP_PROMPT: &str = r#"You are an expert in healthcare regulatory compliance.
Given a set of test case descriptions and the requirements document they are derived from, determine the relevant compliance standards for each test case.

For each test case description, identify the relevant compliance standards (e.g., FDA, IEC 62304, ISO 9001, ISO 13485, ISO 27001) based on the requirements document. If no standards apply to a test case, return an empty array for that test case.

Return a JSON object where the keys are the test case descriptions and the values are lists of relevant compliance standards, wrapped as:
{"testCaseToStandardsMap": {"<description>": ["FDA", "IEC 62304"]}}"#;

/// Map each test case description to the compliance standards it covers.
///
/// Descriptions the model does not mention simply stay absent; callers treat
/// a missing entry as "no standards".
pub async fn map_test_cases_to_standards(
    model: &dyn ChatModel,
    test_cases: &[String],
    requirements: &str,
) -> LlmResult<HashMap<String, Vec<String>>> {
    debug!(count = test_cases.len(), "mapping test cases to standards");

    let mut prompt = String::from(MAP_PROMPT);
    prompt.push_str("\n\nTest Case Descriptions:\n");
    for description in test_cases {
        prompt.push_str("- ");
        prompt.push_str(description);
        prompt.push('\n');
    }
    prompt.push_str("\nRequirements Document:\n");
    prompt.push_str(requirements);

    let raw = model.complete(None, vec![ChatMessage::user(prompt)]).await?;
    let doc: Value =
        serde_json::from_str(strip_code_fences(&raw)).map_err(|e| LlmError::ParseError {
            message: format!("standards map is not JSON: {e}"),
        })?;

    // Accept both the documented wrapper and a bare map.
    let map_value = doc.get("testCaseToStandardsMap").unwrap_or(&doc);
    serde_json::from_value(map_value.clone()).map_err(|e| LlmError::ParseError {
        message: format!("standards map has the wrong shape: {e}"),
    })
}
