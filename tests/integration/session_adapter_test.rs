//! Session Adapter Integration Tests
//!
//! Drive a full analysis round over the real transport and check the
//! adapter's view at each step, including the queued-start handshake race.

use reqtrace_app::{AnalysisSession, SessionEvent, StartOutcome};
use reqtrace_core::protocol::{
    AnalysisStage, ChatRole, ChatTurn, Message, ProgressPayload, ResultsPayload,
};

use crate::support::{accept, bind_server, handshake, recv_envelope, send_message, STEP_TIMEOUT};

async fn next_event(session: &mut AnalysisSession) -> SessionEvent {
    tokio::time::timeout(STEP_TIMEOUT, session.next_event())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream ended")
}

#[tokio::test]
async fn full_analysis_round_trip() {
    let (listener, config) = bind_server(5).await;
    let mut session = AnalysisSession::connect(config);

    // Start before the handshake completes: must queue, not drop.
    assert_eq!(session.start_analysis("draft reqs"), StartOutcome::Queued);
    assert_eq!(
        session.start_analysis("pump requirements"),
        StartOutcome::Queued
    );

    let mut ws = accept(&listener).await;
    handshake(&mut ws, "S1").await;

    assert!(matches!(
        next_event(&mut session).await,
        SessionEvent::Opened { .. }
    ));
    assert!(matches!(
        next_event(&mut session).await,
        SessionEvent::ConnectAck(_)
    ));
    assert!(session.connected());
    assert_eq!(session.session_id(), Some("S1"));

    // Exactly one start_analysis flows out, with the latest text.
    let frame = recv_envelope(&mut ws).await.unwrap();
    let run_id = match frame.message {
        Message::StartAnalysis(payload) => {
            assert_eq!(payload.requirement, "pump requirements");
            payload.run_id.expect("start carries a run id")
        }
        other => panic!("expected start_analysis, got {other:?}"),
    };

    // Progress snapshots replace each other.
    for (stage, pct) in [
        (AnalysisStage::Initialization, 5u8),
        (AnalysisStage::Understanding, 55),
    ] {
        send_message(
            &mut ws,
            Message::ProgressUpdate(ProgressPayload {
                stage,
                progress: pct,
                message: None,
                run_id: Some(run_id),
            }),
            Some("S1"),
        )
        .await;
        next_event(&mut session).await;
    }
    let snapshot = session.progress().unwrap();
    assert_eq!(snapshot.progress, 55);
    assert_eq!(snapshot.stage, AnalysisStage::Understanding);

    // Clarifying question, answered through the adapter.
    send_message(
        &mut ws,
        Message::UserInput(serde_json::json!({"value": "Which wards?"})),
        Some("S1"),
    )
    .await;
    next_event(&mut session).await;
    assert_eq!(session.question(), Some("Which wards?"));

    session.answer_question("ICU only").unwrap();
    let frame = recv_envelope(&mut ws).await.unwrap();
    match frame.message {
        Message::UserAnswer(payload) => assert_eq!(payload.response, "ICU only"),
        other => panic!("expected user_answer, got {other:?}"),
    }

    // Results land and clear the pending question.
    send_message(
        &mut ws,
        Message::Results(ResultsPayload {
            insights: vec!["alarm within 2s of occlusion".into()],
            conversation_history: vec![ChatTurn {
                role: ChatRole::User,
                content: "pump requirements".into(),
            }],
            visited_urls: None,
            flow_chart: Some(r#"{"nodes":[],"edges":[]}"#.into()),
            run_id: Some(run_id),
        }),
        Some("S1"),
    )
    .await;
    next_event(&mut session).await;

    assert!(session.question().is_none());
    let results = session.view().results.as_ref().unwrap();
    assert_eq!(results.insights.len(), 1);

    session.disconnect(Some("done"));
    let farewell = recv_envelope(&mut ws).await.unwrap();
    assert!(matches!(farewell.message, Message::Disconnect(_)));
}

#[tokio::test]
async fn stale_results_from_a_superseded_run_never_surface() {
    let (listener, config) = bind_server(5).await;
    let mut session = AnalysisSession::connect(config);

    let mut ws = accept(&listener).await;
    handshake(&mut ws, "S1").await;
    next_event(&mut session).await; // Opened
    next_event(&mut session).await; // ConnectAck

    let first = match session.start_analysis("first run") {
        StartOutcome::Sent { run_id } => run_id,
        other => panic!("expected immediate send, got {other:?}"),
    };
    recv_envelope(&mut ws).await.unwrap();

    // Supersede before the first run finishes.
    let second = match session.start_analysis("second run") {
        StartOutcome::Sent { run_id } => run_id,
        other => panic!("expected immediate send, got {other:?}"),
    };
    recv_envelope(&mut ws).await.unwrap();
    assert!(second > first);

    // A late result for the first run arrives after the second started.
    send_message(
        &mut ws,
        Message::Results(ResultsPayload {
            insights: vec!["stale".into()],
            run_id: Some(first),
            ..Default::default()
        }),
        Some("S1"),
    )
    .await;
    send_message(
        &mut ws,
        Message::Results(ResultsPayload {
            insights: vec!["fresh".into()],
            run_id: Some(second),
            ..Default::default()
        }),
        Some("S1"),
    )
    .await;

    // Only the fresh result surfaces; the stale one is swallowed.
    match next_event(&mut session).await {
        SessionEvent::Results(payload) => assert_eq!(payload.insights, vec!["fresh".to_string()]),
        other => panic!("expected results, got {other:?}"),
    }
    assert_eq!(
        session.view().results.as_ref().unwrap().insights,
        vec!["fresh".to_string()]
    );
}
