//! Reconnection E2E tests: link loss -> bounded retries -> recovery or give-up.

use crate::common::{
    arduino_port, fast_config, TestBridge, ARDUINO_PATH, CONNECTED_ARDUINO, EXHAUSTED,
};
use pretty_assertions::assert_eq;
use serial_button_bridge::{BridgeEvent, ConnectionState};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_unplug_and_replug() {
    let mut h = TestBridge::new(fast_config(5), vec![arduino_port()]);
    h.connect_arduino().await;

    h.transport.set_fail_all_opens(true);
    h.transport.end_stream();
    assert_eq!(h.next_event().await, BridgeEvent::Disconnected);
    assert_eq!(h.next_status().await, "reconnecting (1/5)");

    // Two failed automatic attempts, then the device comes back
    let statuses = h.statuses_until("reconnecting (3/5)").await;
    assert_eq!(statuses.last().map(String::as_str), Some("reconnecting (3/5)"));
    h.transport.set_fail_all_opens(false);

    h.statuses_until(CONNECTED_ARDUINO).await;
    assert!(h.bridge.is_connected());

    // Counter was reset by the successful open
    h.transport.end_stream();
    let statuses = h.statuses_until(CONNECTED_ARDUINO).await;
    assert_eq!(statuses, vec!["reconnecting (1/5)", CONNECTED_ARDUINO]);
    assert_eq!(h.transport.open_attempts().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_exactly_max_failed_attempts() {
    let mut h = TestBridge::new(fast_config(4), vec![arduino_port()]);
    h.connect_arduino().await;

    h.transport.set_fail_all_opens(true);
    h.transport.fail_link("device reports an error");

    let events = h.events_until(&BridgeEvent::MaxReconnectReached).await;
    let errors = events
        .iter()
        .filter_map(BridgeEvent::as_status)
        .filter(|s| s.starts_with("error: "))
        .count();
    // The link error itself, then four failed opens
    assert_eq!(errors, 5);
    assert_eq!(h.bridge.state(), ConnectionState::Exhausted);
    assert_eq!(h.transport.open_attempts().len(), 5);

    // Nothing else is scheduled
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.transport.open_attempts().len(), 5);
    assert_eq!(h.bridge.state(), ConnectionState::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_status_sequence() {
    let mut h = TestBridge::new(fast_config(2), vec![arduino_port()]);
    h.connect_arduino().await;
    h.transport.set_fail_all_opens(true);
    h.transport.end_stream();

    let reconnecting: Vec<String> = h
        .statuses_until(EXHAUSTED)
        .await
        .into_iter()
        .filter(|s| !s.starts_with("error: "))
        .collect();
    assert_eq!(
        reconnecting,
        vec!["reconnecting (1/2)", "reconnecting (2/2)", EXHAUSTED]
    );
}

#[tokio::test(start_paused = true)]
async fn test_manual_reconnect_after_exhaustion() {
    let mut h = TestBridge::new(fast_config(1), vec![arduino_port()]);
    h.connect_arduino().await;
    h.transport.set_fail_all_opens(true);
    h.transport.end_stream();
    h.statuses_until(EXHAUSTED).await;

    h.transport.set_fail_all_opens(false);
    assert!(h.bridge.reconnect().await);
    assert_eq!(h.next_status().await, CONNECTED_ARDUINO);
    assert_eq!(h.bridge.state(), ConnectionState::Open);
    assert_eq!(h.transport.open_attempts().last().map(String::as_str), Some(ARDUINO_PATH));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_suppresses_reconnect() {
    let mut h = TestBridge::new(fast_config(5), vec![arduino_port()]);
    h.connect_arduino().await;

    h.transport.end_stream();
    h.statuses_until("reconnecting (1/5)").await;
    h.bridge.disconnect().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.bridge.state(), ConnectionState::Idle);
    assert_eq!(h.transport.open_attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_button_state_survives_reconnect() {
    let mut config = fast_config(5);
    config.filter.debounce_ms = 500;
    let mut h = TestBridge::new(config, vec![arduino_port()]);
    h.connect_arduino().await;

    h.transport.send_line("2");
    assert_eq!(h.next_button().await, "2");
    h.transport.end_stream();
    h.statuses_until(CONNECTED_ARDUINO).await;

    // Still inside the debounce window of the press before the drop
    h.transport.send_line("2");
    h.transport.send_line("3");
    assert_eq!(h.next_button().await, "3");
    assert_eq!(h.bridge.stats().await.blocked_presses, 1);
}
