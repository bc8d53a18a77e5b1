//! Analysis Actions
//!
//! The two request/response actions of the pipeline, composed from the LLM
//! flows: turning raw requirements into an understanding (summary plus
//! flowchart), and turning a confirmed understanding into
//! compliance-mapped test cases.

use reqtrace_core::flowchart::{FlowchartData, TestCase};
use reqtrace_llm::flows::{
    generate_interactive_flowchart, generate_test_cases, map_test_cases_to_standards,
    summarize_requirements,
};
use reqtrace_llm::ChatModel;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::error::{AppError, AppResult};

/// Summary plus interpreted-logic flowchart for a requirements document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Understanding {
    pub summary: String,
    /// Parsed flowchart; `None` when the generated document did not fit
    /// the typed model
    pub flowchart: Option<FlowchartData>,
    /// Why the flowchart is missing, when it is
    pub flowchart_error: Option<String>,
}

/// Summarize the requirements and render the interpreted logic as a
/// flowchart.
///
/// A flowchart that fails the typed parse degrades to a summary-only
/// understanding with the error recorded; the summary is never discarded
/// over a flowchart problem.
pub async fn generate_understanding(
    model: &dyn ChatModel,
    requirements: &str,
) -> AppResult<Understanding> {
    if requirements.trim().is_empty() {
        return Err(AppError::validation("Requirements cannot be empty."));
    }

    let summary = summarize_requirements(model, requirements).await?;
    let doc = generate_interactive_flowchart(model, &summary).await?;

    match serde_json::from_value::<FlowchartData>(doc) {
        Ok(flowchart) => Ok(Understanding {
            summary,
            flowchart: Some(flowchart),
            flowchart_error: None,
        }),
        Err(e) => {
            warn!(error = %e, "flowchart did not match the typed model");
            Ok(Understanding {
                summary,
                flowchart: None,
                flowchart_error: Some(
                    "Failed to parse the flowchart data. The model may have returned an invalid format."
                        .to_string(),
                ),
            })
        }
    }
}

/// Generate test cases for a confirmed understanding and map each one to
/// the compliance standards it covers.
pub async fn generate_tests(
    model: &dyn ChatModel,
    confirmed_understanding: &str,
    original_requirements: &str,
) -> AppResult<Vec<TestCase>> {
    let cases = generate_test_cases(model, confirmed_understanding).await?;
    if cases.is_empty() {
        return Err(AppError::validation("No test cases were generated."));
    }

    let descriptions: Vec<String> = cases.iter().map(|c| c.description.clone()).collect();
    let standards_map =
        map_test_cases_to_standards(model, &descriptions, original_requirements).await?;

    Ok(cases
        .into_iter()
        .map(|mut case| {
            case.standards = standards_map
                .get(&case.description)
                .cloned()
                .unwrap_or_default();
            case
        })
        .collect())
}
