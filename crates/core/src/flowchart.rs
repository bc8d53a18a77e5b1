//! Flowchart Data Model & Validation
//!
//! Typed node/edge structures for the interpreted-logic flowchart, the
//! pre-parse sanitizer for model output, and the structural validation rules
//! that drive the generate-validate-refine loop in the LLM crate.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

// ============================================================================
// Data model
// ============================================================================

/// Canvas position hint for a node. Optional; layout is not this crate's
/// concern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

/// One step of interpreted logic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowchartNode {
    pub id: String,
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<NodePosition>,
}

/// A directed edge between two node ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowchartEdge {
    pub source: String,
    pub target: String,
}

/// The full interpreted-logic graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowchartData {
    pub nodes: Vec<FlowchartNode>,
    pub edges: Vec<FlowchartEdge>,
}

impl FlowchartData {
    /// Parse a serialized flowchart, stripping control characters first.
    ///
    /// This is the path results payloads take: the `flowChart` string may
    /// contain control characters the model leaked, which must be removed
    /// before parsing without altering node/edge content.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let cleaned = sanitize_json(raw);
        serde_json::from_str(&cleaned)
            .map_err(|e| CoreError::parse(format!("invalid flowchart JSON: {e}")))
    }
}

/// A generated test case with its mapped compliance standards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCase {
    pub id: String,
    pub description: String,
    pub standards: Vec<String>,
}

// ============================================================================
// Sanitizing & validation
// ============================================================================

/// Strip C0/C1 control characters (U+0000..U+001F, U+007F..U+009F) and trim.
///
/// Models occasionally leak raw control characters into "JSON" output, which
/// `serde_json` rightly rejects. Removing them wholesale matches the server
/// pipeline's cleanup and leaves semantic content untouched.
pub fn sanitize_json(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            let code = *c as u32;
            !(code <= 0x1F || (0x7F..=0x9F).contains(&code))
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// A structural defect found in a candidate flowchart document.
///
/// Rendered with `Display` when fed back to the refinement prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// `nodes` missing or not an array
    MissingNodes,
    /// `edges` missing or not an array
    MissingEdges,
    /// Two nodes share this id
    DuplicateNodeId(String),
    /// An edge references this source id, but no node has it
    MissingEdgeSource(String),
    /// An edge references this target id, but no node has it
    MissingEdgeTarget(String),
    /// The candidate did not parse as JSON at all
    InvalidJson,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::MissingNodes => write!(f, "missing or invalid nodes array"),
            ValidationIssue::MissingEdges => write!(f, "missing or invalid edges array"),
            ValidationIssue::DuplicateNodeId(id) => write!(f, "duplicate node id: {id}"),
            ValidationIssue::MissingEdgeSource(id) => write!(f, "edge source missing: {id}"),
            ValidationIssue::MissingEdgeTarget(id) => write!(f, "edge target missing: {id}"),
            ValidationIssue::InvalidJson => write!(f, "invalid JSON"),
        }
    }
}

/// Check a candidate flowchart document against the structural rules.
///
/// Every defect is recorded as an issue rather than a hard failure; the
/// caller decides whether to refine, accept, or degrade. Rules:
/// - `nodes` and `edges` must be arrays
/// - node ids must be unique (the first duplicate of each id is recorded)
/// - every edge source/target must reference an existing node id
pub fn validate_flowchart(doc: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let nodes = doc.get("nodes").and_then(Value::as_array);
    if nodes.is_none() {
        issues.push(ValidationIssue::MissingNodes);
    }
    let edges = doc.get("edges").and_then(Value::as_array);
    if edges.is_none() {
        issues.push(ValidationIssue::MissingEdges);
    }

    let mut node_ids: HashSet<String> = HashSet::new();
    for node in nodes.into_iter().flatten() {
        let id = node
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if !node_ids.insert(id.clone()) {
            issues.push(ValidationIssue::DuplicateNodeId(id));
        }
    }

    for edge in edges.into_iter().flatten() {
        let source = edge.get("source").and_then(Value::as_str).unwrap_or_default();
        if !node_ids.contains(source) {
            issues.push(ValidationIssue::MissingEdgeSource(source.to_string()));
        }
        let target = edge.get("target").and_then(Value::as_str).unwrap_or_default();
        if !node_ids.contains(target) {
            issues.push(ValidationIssue::MissingEdgeTarget(target.to_string()));
        }
    }

    issues
}
