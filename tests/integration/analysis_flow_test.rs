//! Analysis Pipeline Integration Tests
//!
//! Run the two actions end-to-end over a scripted model, including the
//! flowchart refinement loop kicking in mid-pipeline.

use reqtrace_app::services::analysis::{generate_tests, generate_understanding};
use reqtrace_llm::testing::ScriptedModel;

#[tokio::test]
async fn understanding_recovers_via_refinement() {
    let model = ScriptedModel::new(vec![
        // summarize
        "Infusion pump must alarm on occlusion within 2 seconds.",
        // flowchart attempt 1: duplicate ids
        r#"{"nodes":[{"id":"n1","label":"Start","description":"entry"},
            {"id":"n1","label":"Alarm","description":"dup"}],"edges":[]}"#,
        // refinement fixes it
        r#"{"nodes":[{"id":"n1","label":"Start","description":"entry"},
            {"id":"n2","label":"Alarm","description":"raise alarm"}],
            "edges":[{"source":"n1","target":"n2"}]}"#,
    ]);

    let understanding = generate_understanding(&model, "full requirements document")
        .await
        .unwrap();

    assert!(understanding.summary.contains("occlusion"));
    let chart = understanding.flowchart.unwrap();
    assert_eq!(chart.nodes.len(), 2);
    assert_eq!(chart.edges.len(), 1);

    // Three model calls: summary, generation, one refinement.
    let sent = model.requests();
    assert_eq!(sent.len(), 3);
    assert!(sent[2].contains("duplicate node id: n1"));
}

#[tokio::test]
async fn tests_are_generated_and_mapped() {
    let model = ScriptedModel::new(vec![
        r#"[{"id":"TC1","description":"Verify occlusion alarm fires within 2s."},
            {"id":"TC2","description":"Verify alarm is logged."}]"#,
        r#"{"testCaseToStandardsMap":{
            "Verify occlusion alarm fires within 2s.":["IEC 62304","FDA"],
            "Verify alarm is logged.":[]}}"#,
    ]);

    let cases = generate_tests(&model, "confirmed understanding", "original requirements")
        .await
        .unwrap();

    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].id, "TC1");
    assert_eq!(
        cases[0].standards,
        vec!["IEC 62304".to_string(), "FDA".to_string()]
    );
    assert!(cases[1].standards.is_empty());

    // The mapping prompt saw both descriptions and the original text.
    let sent = model.requests();
    assert!(sent[1].contains("Verify alarm is logged."));
    assert!(sent[1].contains("original requirements"));
}
