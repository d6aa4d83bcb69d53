//! Inactivity timeout behaviour under paused Tokio time.
//!
//! Every test runs with `start_paused = true`: sleeping auto-advances the
//! clock, so the 6.5 second window is exercised without real waiting.

use std::time::Duration;

use doorknock_core::{CodeTable, KnockSource, Zone};
use doorknock_recognizer::{MatchState, PatternRecognizer, RecognizerEvent};
use Zone::{Left as L, Right as R};

const TIMEOUT: Duration = Duration::from_millis(6500);

fn recognizer() -> PatternRecognizer {
    PatternRecognizer::new(CodeTable::reference(), TIMEOUT)
}

fn knock(recognizer: &PatternRecognizer, zones: &[Zone]) {
    for zone in zones {
        recognizer.register_knock(*zone, KnockSource::Transport);
    }
}

/// Sleep past the deadline and let the reset task run.
async fn wait_past(duration: Duration) {
    tokio::time::sleep(duration + Duration::from_millis(1)).await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn test_partial_sequence_expires() {
    let recognizer = recognizer();
    knock(&recognizer, &[L, L, R]);
    assert!(recognizer.has_pending_reset());

    wait_past(TIMEOUT).await;

    assert!(recognizer.sequence().is_empty());
    assert_eq!(recognizer.match_state(), MatchState::Listening);
    assert!(!recognizer.has_pending_reset());

    let next = recognizer.register_knock(R, KnockSource::Transport);
    assert_eq!(next.buffered, 1);
    assert!(next.state.is_listening());
}

#[tokio::test(start_paused = true)]
async fn test_knock_before_deadline_extends_window() {
    let recognizer = recognizer();
    knock(&recognizer, &[L]);

    tokio::time::sleep(Duration::from_secs(6)).await;
    knock(&recognizer, &[L]);

    tokio::time::sleep(Duration::from_secs(6)).await;
    tokio::task::yield_now().await;
    assert_eq!(recognizer.sequence(), vec![L, L]);

    knock(&recognizer, &[R, R]);
    assert!(recognizer.match_state().is_matched());
}

#[tokio::test(start_paused = true)]
async fn test_matched_state_expires_to_listening() {
    let recognizer = recognizer();
    let mut state = recognizer.subscribe();
    knock(&recognizer, &[R, R, L, L]);
    assert!(state.borrow_and_update().is_matched());

    wait_past(TIMEOUT).await;

    assert!(state.has_changed().unwrap());
    assert!(state.borrow_and_update().is_listening());
    assert!(recognizer.sequence().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_state_expires_to_listening() {
    let recognizer = recognizer();
    let mut events = recognizer.events();
    knock(&recognizer, &[R, L, R, L]);
    assert!(recognizer.match_state().is_invalid());

    wait_past(TIMEOUT).await;

    let mut changes = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let RecognizerEvent::MatchChanged(state) = event {
            changes.push(state);
        }
    }
    assert_eq!(changes, vec![MatchState::Invalid, MatchState::Listening]);
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_deadline() {
    let recognizer = recognizer();
    let mut state = recognizer.subscribe();
    knock(&recognizer, &[L, L, R, R]);

    recognizer.reset();
    let _ = state.borrow_and_update();

    wait_past(TIMEOUT).await;

    assert!(!state.has_changed().unwrap());
    assert!(!recognizer.has_pending_reset());
}

#[tokio::test(start_paused = true)]
async fn test_quiet_listening_window_publishes_nothing() {
    let recognizer = recognizer();
    let mut events = recognizer.events();
    knock(&recognizer, &[L]);

    wait_past(TIMEOUT).await;

    assert!(matches!(
        events.try_recv().unwrap(),
        RecognizerEvent::KnockObserved(_)
    ));
    assert!(events.try_recv().is_err());
    assert!(recognizer.sequence().is_empty());
}
