//! Analysis Flows
//!
//! The four LLM-backed steps of the requirements-analysis pipeline:
//! summarization, flowchart generation (with the bounded
//! generate-validate-refine loop), test-case generation, and
//! compliance-standards mapping.

pub mod flowchart;
pub mod standards;
pub mod summarize;
pub mod test_cases;

pub use flowchart::{generate_interactive_flowchart, MAX_ATTEMPTS};
pub use standards::map_test_cases_to_standards;
pub use summarize::summarize_requirements;
pub use test_cases::generate_test_cases;
