//! ReqTrace headless client entry point.
//!
//! Connects to the analysis server, submits one requirements document, and
//! streams the run to stdout: progress lines, interactive clarifying
//! questions, then the final insights and flowchart summary.

use std::io::Read;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reqtrace_app::{AnalysisSession, AppConfig, SessionEvent, StartOutcome};
use reqtrace_core::flowchart::FlowchartData;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();
    config.validate().context("invalid configuration")?;

    let requirement = read_requirement().context("no requirements text provided")?;

    let mut session = AnalysisSession::connect(config.ws.clone());
    if session.start_analysis(&requirement) == StartOutcome::Queued {
        info!("waiting for session handshake before starting analysis");
    }

    let mut answers = BufReader::new(tokio::io::stdin()).lines();

    while let Some(event) = session.next_event().await {
        match event {
            SessionEvent::ConnectAck(_) => {
                info!(session_id = ?session.session_id(), "session established");
            }
            SessionEvent::Progress(p) => {
                println!(
                    "[{}] {:>3}% {}",
                    p.stage,
                    p.progress,
                    p.message.unwrap_or_default()
                );
            }
            SessionEvent::Question { value } => {
                println!("? {value}");
                let answer = answers
                    .next_line()
                    .await
                    .context("failed to read answer")?
                    .unwrap_or_default();
                if let Err(reason) = session.answer_question(answer.trim()) {
                    warn!(%reason, "answer dropped");
                }
            }
            SessionEvent::Results(results) => {
                for insight in &results.insights {
                    println!("- {insight}");
                }
                if let Some(raw) = &results.flow_chart {
                    match FlowchartData::parse(raw) {
                        Ok(chart) => println!(
                            "flowchart: {} nodes, {} edges",
                            chart.nodes.len(),
                            chart.edges.len()
                        ),
                        Err(e) => warn!(error = %e, "results carried an unparseable flowchart"),
                    }
                }
                session.disconnect(Some("done"));
                return Ok(());
            }
            SessionEvent::ServerError(e) => {
                bail!("analysis failed ({}): {}", e.code, e.message);
            }
            SessionEvent::ReconnectsExhausted { attempts } => {
                bail!("gave up after {attempts} reconnect attempts");
            }
            SessionEvent::Closed { .. } => {
                info!("connection closed");
            }
            SessionEvent::Opened { .. } | SessionEvent::Rejected { .. } => {}
        }
    }

    Ok(())
}

/// The requirements text: command-line arguments joined, or stdin when no
/// arguments were given.
fn read_requirement() -> anyhow::Result<String> {
    let from_args = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !from_args.trim().is_empty() {
        return Ok(from_args);
    }
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    if buffer.trim().is_empty() {
        bail!("pass requirements as arguments or on stdin");
    }
    Ok(buffer)
}
