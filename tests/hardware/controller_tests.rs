//! Tests requiring an attached button controller.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyACM0          # optional, auto-detected otherwise
//! export TEST_BAUD=9600                  # optional, default: 9600
//!
//! cargo test --features hardware-tests -- --ignored --nocapture
//! ```
//!
//! The press test waits for a human to push a button on the controller.

use super::utils::{native_bridge, wait_for_press, TestControllerConfig};
use serial_button_bridge::ConnectionState;
use std::time::Duration;

async fn connect(settings: &TestControllerConfig) -> serial_button_bridge::ButtonBridge {
    let (bridge, _events) = native_bridge(settings);
    let connected = match &settings.port_name {
        Some(path) => bridge.connect(path).await,
        None => bridge.auto_connect().await,
    };
    assert!(connected, "could not connect to the controller");
    bridge
}

#[tokio::test]
#[ignore]
async fn test_connect_and_close() {
    let settings = TestControllerConfig::from_env();
    let bridge = connect(&settings).await;

    assert_eq!(bridge.state(), ConnectionState::Open);
    assert!(bridge.selected_device().is_some());

    bridge.disconnect().await;
    bridge.disconnect().await;
    assert_eq!(bridge.state(), ConnectionState::Idle);
    bridge.shutdown().await;
}

#[tokio::test]
#[ignore]
async fn test_reopen_after_close() {
    let settings = TestControllerConfig::from_env();
    let bridge = connect(&settings).await;
    bridge.disconnect().await;

    // The OS must have released the handle
    assert!(bridge.reconnect().await);
    assert!(bridge.is_connected());
    bridge.shutdown().await;
}

#[tokio::test]
#[ignore]
async fn test_button_press_arrives() {
    let settings = TestControllerConfig::from_env();
    let (bridge, mut events) = native_bridge(&settings);
    let connected = match &settings.port_name {
        Some(path) => bridge.connect(path).await,
        None => bridge.auto_connect().await,
    };
    assert!(connected, "could not connect to the controller");

    println!("Press any button on the controller within 30 seconds...");
    let label = wait_for_press(&mut events, Duration::from_secs(30))
        .await
        .expect("no button press received");
    println!("Received button {}", label);

    let stats = bridge.stats().await;
    assert!(stats.total_presses >= 1);
    bridge.shutdown().await;
}
