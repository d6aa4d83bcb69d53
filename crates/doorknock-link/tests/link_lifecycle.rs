//! Integration tests for the link lifecycle.
//!
//! A mock transport plays the peripheral: it sends knock lines, hangs up,
//! and records every payload the host writes.

use std::time::Duration;

use doorknock_core::{CodeName, CodeTable, Zone};
use doorknock_link::mock::{MockTransport, MockTransportHandle};
use doorknock_link::{LinkConfig, LinkError, LinkManager, LinkState, PeerDevice};
use doorknock_recognizer::{MatchState, PatternRecognizer};

const TIMEOUT: Duration = Duration::from_millis(6500);

/// Helper function to create a manager over a mock transport.
fn create_manager(bonded: Vec<PeerDevice>) -> (LinkManager<MockTransport>, MockTransportHandle) {
    let (transport, handle) = MockTransport::with_devices(bonded);
    let recognizer = PatternRecognizer::new(CodeTable::reference(), TIMEOUT);
    (
        LinkManager::new(transport, recognizer, LinkConfig::default()),
        handle,
    )
}

fn hc05() -> PeerDevice {
    PeerDevice::new("HC-05", "00:21:13:00:AB:CD")
}

/// Yield to the pump task until `condition` holds.
async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Give the pump a chance to run without waiting for anything in particular.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

async fn connected_manager() -> (LinkManager<MockTransport>, MockTransportHandle) {
    let (manager, handle) = create_manager(vec![hc05()]);
    manager.connect().await.unwrap();
    (manager, handle)
}

#[tokio::test]
async fn test_connect_prefers_named_peripheral() {
    let speaker = PeerDevice::new("Speaker", "11:22:33:44:55:66");
    let (manager, handle) = create_manager(vec![speaker, hc05()]);
    let mut states = manager.subscribe_state();

    manager.connect().await.unwrap();

    assert_eq!(manager.state(), LinkState::Connected(hc05()));
    assert_eq!(handle.opened(), vec![hc05()]);
    assert!(handle.is_subscribed());
    assert!(states.borrow_and_update().is_connected());
}

#[tokio::test]
async fn test_connect_falls_back_to_first_bonded() {
    let other = PeerDevice::new("DOOR-BRIDGE", "AA:BB:CC:DD:EE:FF");
    let (manager, _handle) = create_manager(vec![other.clone()]);

    manager.connect().await.unwrap();

    assert_eq!(manager.state().peer(), Some(&other));
}

#[tokio::test]
async fn test_connect_without_bonded_device() {
    let (manager, handle) = create_manager(Vec::new());

    let error = manager.connect().await.unwrap_err();

    assert!(matches!(error, LinkError::NoBondedDevice { .. }));
    let message = "No bonded HC-05 found. Pair it in system settings first.";
    assert_eq!(manager.state(), LinkState::Error(message.to_string()));
    assert_eq!(manager.last_error().as_deref(), Some(message));
    assert!(handle.opened().is_empty());
}

#[tokio::test]
async fn test_session_open_failure_then_manual_retry() {
    let (manager, handle) = create_manager(vec![hc05()]);
    handle.fail_next_open("page timeout");

    let error = manager.connect().await.unwrap_err();
    assert!(matches!(error, LinkError::SessionOpen { .. }));
    assert_eq!(
        manager.state().error_message(),
        Some("page timeout")
    );
    assert_eq!(manager.last_error().as_deref(), Some("page timeout"));

    // No automatic retry: the link stays in Error until connect is called again.
    settle().await;
    assert!(manager.state().is_error());

    manager.connect().await.unwrap();
    assert!(manager.is_connected());
    assert!(manager.last_error().is_none());
}

#[tokio::test]
async fn test_listing_failure_is_surfaced() {
    let (manager, handle) = create_manager(vec![hc05()]);
    handle.fail_next_listing("adapter powered off");

    assert!(manager.connect().await.is_err());
    assert_eq!(
        manager.state(),
        LinkState::Error("adapter powered off".to_string())
    );
}

#[tokio::test]
async fn test_transport_knocks_send_one_unlock() {
    let (manager, handle) = connected_manager().await;

    for knock in ["L", "l", "2", "r"] {
        handle.send_line(knock).await.unwrap();
    }

    eventually(|| !handle.written().is_empty()).await;
    settle().await;

    assert_eq!(handle.written_text(), vec!["UNLOCK:kevin\n".to_string()]);
    assert_eq!(manager.last_message().as_deref(), Some("r"));
    assert!(manager.recognizer().match_state().is_matched());
}

#[tokio::test]
async fn test_danny_over_fragmented_chunks() {
    let (manager, handle) = connected_manager().await;

    handle.send_data("R\nR").await.unwrap();
    handle.send_data("\nLE").await.unwrap();
    handle.send_data("FT\n1\n").await.unwrap();

    eventually(|| !handle.written().is_empty()).await;

    assert_eq!(handle.written_text(), vec!["UNLOCK:danny\n".to_string()]);
    assert_eq!(manager.last_message().as_deref(), Some("1"));
}

#[tokio::test]
async fn test_unrecognized_line_updates_last_message_only() {
    let (manager, handle) = connected_manager().await;
    let mut messages = manager.subscribe_last_message();

    handle.send_line("  BOOT OK ").await.unwrap();
    messages.changed().await.unwrap();

    assert_eq!(messages.borrow_and_update().as_deref(), Some("  BOOT OK "));
    assert!(manager.recognizer().sequence().is_empty());
}

#[tokio::test]
async fn test_invalid_sequence_sends_nothing() {
    let (manager, handle) = connected_manager().await;

    for knock in ["L", "R", "L", "R"] {
        handle.send_line(knock).await.unwrap();
    }

    eventually(|| manager.last_message().as_deref() == Some("R")).await;
    eventually(|| manager.recognizer().match_state() == MatchState::Invalid).await;
    assert!(handle.written().is_empty());
}

#[tokio::test]
async fn test_simulated_match_while_connected_sends_unlock() {
    let (manager, handle) = connected_manager().await;

    let mut last = None;
    for zone in [Zone::Right, Zone::Right, Zone::Left, Zone::Left] {
        last = Some(manager.simulate_knock(zone).await);
    }

    assert_eq!(last.unwrap().matched().map(CodeName::as_str), Some("danny"));
    assert_eq!(handle.written_text(), vec!["UNLOCK:danny\n".to_string()]);
}

#[tokio::test]
async fn test_simulated_match_while_idle_records_error() {
    let (manager, handle) = create_manager(vec![hc05()]);

    for zone in [Zone::Left, Zone::Left, Zone::Right, Zone::Right] {
        manager.simulate_knock(zone).await;
    }

    assert!(handle.written().is_empty());
    assert_eq!(manager.state(), LinkState::Idle);
    assert_eq!(
        manager.last_error().as_deref(),
        Some("Connect to HC-05 before sending commands.")
    );
}

#[tokio::test]
async fn test_send_appends_delimiter() {
    let (manager, handle) = connected_manager().await;

    manager.send("PING").await.unwrap();
    manager
        .send_unlock(&CodeName::new("kevin").unwrap())
        .await
        .unwrap();

    assert_eq!(
        handle.written_text(),
        vec!["PING\n".to_string(), "UNLOCK:kevin\n".to_string()]
    );
}

#[tokio::test]
async fn test_send_when_idle_fails_without_state_change() {
    let (manager, handle) = create_manager(vec![hc05()]);

    let error = manager.send("PING").await.unwrap_err();

    assert!(matches!(error, LinkError::Write { .. }));
    assert_eq!(manager.state(), LinkState::Idle);
    assert!(handle.written().is_empty());
}

#[tokio::test]
async fn test_send_on_read_only_session() {
    let (manager, handle) = connected_manager().await;
    handle.set_read_only(true);

    let error = manager.send("PING").await.unwrap_err();

    assert!(matches!(error, LinkError::Configuration { .. }));
    assert!(manager.is_connected());
}

#[tokio::test]
async fn test_write_failure_keeps_link_connected() {
    let (manager, handle) = connected_manager().await;
    handle.fail_writes(Some("buffer full".to_string()));

    let error = manager.send("PING").await.unwrap_err();

    assert!(matches!(error, LinkError::Write { .. }));
    assert!(manager.is_connected());
    assert_eq!(
        manager.last_error().as_deref(),
        Some("buffer full")
    );

    handle.fail_writes(None);
    manager.send("PING").await.unwrap();
    assert_eq!(handle.written_text(), vec!["PING\n".to_string()]);
}

#[tokio::test]
async fn test_disconnect_unsubscribes_and_goes_idle() {
    let (manager, handle) = connected_manager().await;

    manager.disconnect().await.unwrap();

    assert_eq!(manager.state(), LinkState::Idle);
    assert!(!handle.is_subscribed());
    assert_eq!(handle.close_count(), 1);
    assert!(handle.send_line("L").await.is_err());
}

#[tokio::test]
async fn test_disconnect_close_failure_still_idle() {
    let (manager, handle) = connected_manager().await;
    handle.fail_next_close("radio stuck");

    let error = manager.disconnect().await.unwrap_err();

    assert!(matches!(error, LinkError::Disconnect { .. }));
    assert_eq!(manager.state(), LinkState::Idle);
    assert_eq!(
        manager.last_error().as_deref(),
        Some("radio stuck")
    );
}

#[tokio::test]
async fn test_disconnect_when_idle_is_noop() {
    let (manager, handle) = create_manager(vec![hc05()]);

    manager.disconnect().await.unwrap();
    manager.disconnect().await.unwrap();

    assert_eq!(manager.state(), LinkState::Idle);
    assert_eq!(handle.close_count(), 0);
}

#[tokio::test]
async fn test_remote_hang_up_goes_idle() {
    let (manager, handle) = connected_manager().await;

    handle.hang_up().await.unwrap();
    eventually(|| manager.state().is_idle()).await;

    assert_eq!(handle.close_count(), 1);
    assert!(manager.send("PING").await.is_err());
}

#[tokio::test]
async fn test_reconnect_starts_with_fresh_decoder() {
    let (manager, handle) = connected_manager().await;

    // Undelimited fragment left in the first session's decoder.
    handle.send_data("L").await.unwrap();
    settle().await;
    manager.disconnect().await.unwrap();

    manager.connect().await.unwrap();
    handle.send_line("R").await.unwrap();
    eventually(|| manager.last_message().is_some()).await;

    assert_eq!(manager.last_message().as_deref(), Some("R"));
    assert_eq!(manager.recognizer().sequence(), vec![Zone::Right]);
}

#[tokio::test]
async fn test_backgrounding_disconnects_once() {
    let (manager, handle) = connected_manager().await;

    manager.on_host_visibility_changed(false).await.unwrap();
    assert_eq!(manager.state(), LinkState::Idle);
    assert_eq!(handle.close_count(), 1);

    // Returning to the foreground never reconnects.
    manager.on_host_visibility_changed(true).await.unwrap();
    settle().await;
    assert_eq!(manager.state(), LinkState::Idle);
    assert_eq!(handle.opened().len(), 1);
}

#[tokio::test]
async fn test_hidden_to_hidden_does_nothing() {
    let (manager, handle) = connected_manager().await;

    manager.on_host_visibility_changed(false).await.unwrap();
    manager.connect().await.unwrap();
    manager.on_host_visibility_changed(false).await.unwrap();

    assert!(manager.is_connected());
    assert_eq!(handle.close_count(), 1);
}
