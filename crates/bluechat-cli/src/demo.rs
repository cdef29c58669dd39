//! Two sessions talking over the in-memory radio

use std::time::Duration;

use bluechat_core::{AppEvent, Provenance};
use bluechat_runtime::LoopbackAir;
use tracing::info;

use crate::app::{render_message, BluechatApp};
use crate::config::AppConfig;
use crate::error::Result;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a short scripted conversation and return the printed transcript
pub async fn run_demo(config: &AppConfig) -> Result<Vec<String>> {
    let air = LoopbackAir::new();
    let mut alice =
        BluechatApp::start(config.clone(), Box::new(air.radio("alice-radio", "alice").await)).await?;
    let mut bob =
        BluechatApp::start(config.clone(), Box::new(air.radio("bob-radio", "bob").await)).await?;

    let mut transcript = Vec::new();
    exchange(&mut alice, &mut bob, ("alice", "bob"), "hello bob", &mut transcript).await?;
    exchange(
        &mut bob,
        &mut alice,
        ("bob", "alice"),
        "hi alice, loud and clear",
        &mut transcript,
    )
    .await?;

    info!("Demo finished after {} lines", transcript.len());
    alice.shutdown().await?;
    bob.shutdown().await?;
    Ok(transcript)
}

/// One line from `speaker`, recorded on both ends
async fn exchange(
    speaker: &mut BluechatApp,
    listener: &mut BluechatApp,
    names: (&str, &str),
    text: &str,
    transcript: &mut Vec<String>,
) -> Result<()> {
    let sent = speaker.send_once(text, STEP_TIMEOUT).await?;
    transcript.push(format!("[{}] {}", names.0, render_message(&sent)));

    let received = listener
        .wait_for(STEP_TIMEOUT, |event| {
            matches!(event, AppEvent::MessagePublished(m) if m.provenance() == Provenance::Remote)
        })
        .await?;
    if let AppEvent::MessagePublished(message) = received {
        transcript.push(format!("[{}] {}", names.1, render_message(&message)));
    }
    Ok(())
}
