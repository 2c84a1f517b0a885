//! Complete workflow E2E tests: discover -> connect -> press -> stats -> close

use crate::common::{arduino_port, TestBridge, ARDUINO_PATH, CONNECTED_ARDUINO};
use pretty_assertions::assert_eq;
use serial_button_bridge::{BridgeEvent, Config, ConnectionState};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_full_session() {
    let mut h = TestBridge::with_arduino();

    let device = h.bridge.auto_select().await.unwrap();
    assert!(h.bridge.connect(&device.path).await);
    assert_eq!(h.next_status().await, CONNECTED_ARDUINO);

    for label in ["1", "3", "5"] {
        h.transport.send_line(label);
        assert_eq!(h.next_button().await, label);
    }

    let stats = h.bridge.stats().await;
    assert_eq!(stats.total_presses, 3);
    assert_eq!(stats.success_rate, 100.0);

    h.bridge.disconnect().await;
    assert_eq!(h.bridge.state(), ConnectionState::Idle);
    assert_eq!(h.transport.links_open(), 0);
    assert!(!h.transport.send_line("1"));
}

#[tokio::test(start_paused = true)]
async fn test_close_is_idempotent() {
    let mut h = TestBridge::with_arduino();
    h.bridge.disconnect().await;
    h.connect_arduino().await;

    h.bridge.disconnect().await;
    h.bridge.disconnect().await;
    h.bridge.disconnect().await;

    assert_eq!(h.bridge.state(), ConnectionState::Idle);
    assert_eq!(h.transport.closed_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_to_missing_device_reports_error() {
    let mut h = TestBridge::with_arduino();
    h.transport.fail_next_opens(1);

    assert!(!h.bridge.connect("/dev/ttyUSB9").await);
    let status = h.next_status().await;
    assert!(status.starts_with("error: "), "unexpected status {status:?}");
    assert!(status.contains("/dev/ttyUSB9"));
    assert_eq!(h.bridge.state(), ConnectionState::Idle);
    assert!(h.bridge.selected_device().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_switch_device_while_open() {
    let mut h = TestBridge::new(
        Config::default(),
        vec![arduino_port(), serial_button_bridge::RawPortInfo::new("/dev/ttyACM1")],
    );
    h.connect_arduino().await;

    assert!(h.bridge.connect("/dev/ttyACM1").await);
    assert_eq!(h.next_status().await, "connected: /dev/ttyACM1");
    assert_eq!(h.transport.links_open(), 1);
    assert_eq!(
        h.bridge.selected_device().map(|d| d.path),
        Some("/dev/ttyACM1".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_connects_only_one_wins() {
    let h = TestBridge::with_arduino();
    h.transport.set_open_delay(Duration::from_millis(200));

    let first = h.bridge.clone();
    let second = h.bridge.clone();
    let (a, b) = tokio::join!(first.connect(ARDUINO_PATH), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        second.connect(ARDUINO_PATH).await
    });

    assert!(a);
    assert!(!b);
    assert_eq!(h.transport.open_attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stats_window_resets_periodically() {
    let mut config = Config::default();
    config.filter.stats_reset_interval_secs = 10;
    let mut h = TestBridge::new(config, vec![arduino_port()]);
    h.connect_arduino().await;

    h.transport.send_line("1");
    assert_eq!(h.next_button().await, "1");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.bridge.stats().await.uptime_secs, 5);

    tokio::time::sleep(Duration::from_secs(6)).await;
    let stats = h.bridge.stats().await;
    assert_eq!(stats.total_presses, 0);
    assert_eq!(stats.uptime_secs, 1);
    assert_eq!(stats.success_rate, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_event_order_on_connect() {
    let mut h = TestBridge::with_arduino();
    assert!(h.bridge.connect(ARDUINO_PATH).await);

    assert_eq!(h.next_event().await, BridgeEvent::status(CONNECTED_ARDUINO));
    assert_eq!(
        h.next_event().await,
        BridgeEvent::Connected(ARDUINO_PATH.to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_device() {
    let mut h = TestBridge::with_arduino();
    h.connect_arduino().await;

    h.bridge.shutdown().await;
    assert_eq!(h.transport.links_open(), 0);
    assert!(!h.bridge.is_connected());
    assert!(h.events.recv().await.is_none());
}
