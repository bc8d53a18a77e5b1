//! Flowchart Generation Flow
//!
//! Coerces a generative call into schema-valid flowchart JSON via a bounded
//! generate-validate-refine loop. Validation rules live in
//! `reqtrace_core::flowchart`; this module owns the loop and the best-effort
//! degraded result when attempts are exhausted.

use reqtrace_core::flowchart::{sanitize_json, validate_flowchart, ValidationIssue};
use serde_json::Value;
use tracing::{debug, warn};

use crate::provider::ChatModel;
use crate::types::{ChatMessage, LlmResult};

/// Total attempt budget: one generation plus up to four refinements.
pub const MAX_ATTEMPTS: usize = 5;

const GENERATE_PROMPT: &str = r#"You are an expert system for converting problem statements into flowcharts.

Generate a flowchart JSON with the following rules:
- Must strictly match schema: { "nodes": [...], "edges": [...] }
- Every node has "id", "label" and "description"; node ids must be unique (node1, node2, ...)
- Every edge has "source" and "target" referencing existing node ids
- If you make assumptions, include them in "assumptions"
- If input is ambiguous, add clarifications to "openQuestions"
- Do not include markdown/code blocks
- Output must be a single valid JSON object"#;

fn refine_prompt(last_output: &str, issues: &[ValidationIssue], original: &str) -> String {
    format!(
        "The last attempt produced invalid or incomplete JSON.\n\n\
         Original Problem: {original}\n\
         Last Output: {last_output}\n\
         Issues: {}\n\n\
         Fix the JSON so it:\n\
         1. Passes schema validation\n\
         2. Covers all steps in the problem\n\
         3. Includes assumptions for inferred logic\n\
         4. Adds openQuestions if ambiguous\n\
         Return only the corrected JSON object.",
        render_issues(issues)
    )
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate a flowchart document for the given problem-statement summary.
///
/// Attempt 1 runs the generation prompt; each further attempt feeds the prior
/// raw output and the accumulated issue list into a refinement prompt. A JSON
/// parse failure counts as a single issue rather than aborting the loop. The
/// first structurally clean document is returned immediately.
///
/// When all [`MAX_ATTEMPTS`] attempts leave issues, the last parsed document
/// is returned with a diagnostic appended to its `openQuestions`: a
/// best-effort degraded result, not an error. If the final output never
/// parsed, only the diagnostic object is returned.
pub async fn generate_interactive_flowchart(
    model: &dyn ChatModel,
    summary: &str,
) -> LlmResult<Value> {
    let mut raw = String::new();
    let mut parsed: Option<Value> = None;
    let mut issues: Vec<ValidationIssue> = Vec::new();

    for attempt in 1..=MAX_ATTEMPTS {
        let prompt = if attempt == 1 {
            format!("{GENERATE_PROMPT}\n\nProblem Statement Summary: {summary}")
        } else {
            refine_prompt(&raw, &issues, summary)
        };
        raw = model.complete(None, vec![ChatMessage::user(prompt)]).await?;

        match serde_json::from_str::<Value>(&sanitize_json(&raw)) {
            Ok(doc) => {
                issues = validate_flowchart(&doc);
                if issues.is_empty() {
                    debug!(attempt, "flowchart accepted");
                    return Ok(doc);
                }
                parsed = Some(doc);
            }
            Err(_) => {
                issues = vec![ValidationIssue::InvalidJson];
                parsed = None;
            }
        }
        warn!(attempt, issues = %render_issues(&issues), "flowchart attempt rejected");
    }

    let mut doc = parsed.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    let note = format!(
        "Analysis stopped after {MAX_ATTEMPTS} attempts with unresolved issues: {}",
        render_issues(&issues)
    );
    append_open_question(&mut doc, note);
    Ok(doc)
}

/// Append an entry to the document's `openQuestions` array, creating it if
/// needed and preserving any entries the model already produced.
fn append_open_question(doc: &mut Value, note: String) {
    let Some(obj) = doc.as_object_mut() else {
        *doc = serde_json::json!({ "openQuestions": [note] });
        return;
    };
    let questions = obj
        .entry("openQuestions")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Some(list) = questions.as_array_mut() {
        list.push(Value::String(note));
    } else {
        *questions = Value::Array(vec![questions.clone(), Value::String(note)]);
    }
}
