//! Configuration E2E tests: TOML file and environment -> running bridge.

use crate::common::{arduino_port, TestBridge};
use pretty_assertions::assert_eq;
use serial_button_bridge::{Config, ConfigError, ConfigLoader};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_custom_labels_from_file() {
    let file = write_config(
        r#"
[filter]
labels = ["A", "B"]
debounce_ms = 0
"#,
    );
    let config = ConfigLoader::load_from(file.path()).unwrap().into_config();
    assert_eq!(config.device.baud_rate, 9600);

    let mut h = TestBridge::new(config, vec![arduino_port()]);
    h.connect_arduino().await;

    h.transport.send_line("1");
    h.transport.send_line("B");
    assert_eq!(h.next_button().await, "B");
    assert_eq!(h.bridge.stats().await.blocked_presses, 1);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_env_overrides_file() {
    let file = write_config(
        r#"
[device]
max_reconnect_attempts = 9
reconnect_delay_ms = 100
"#,
    );
    std::env::set_var("BUTTON_BRIDGE_DEVICE_MAX_RECONNECT_ATTEMPTS", "1");
    let loaded = ConfigLoader::load_from(file.path());
    std::env::remove_var("BUTTON_BRIDGE_DEVICE_MAX_RECONNECT_ATTEMPTS");
    let config = loaded.unwrap().into_config();
    assert_eq!(config.device.max_reconnect_attempts, 1);

    let mut h = TestBridge::new(config, vec![arduino_port()]);
    h.connect_arduino().await;
    h.transport.set_fail_all_opens(true);
    h.transport.end_stream();

    let statuses = h
        .statuses_until("disconnected: max attempts reached")
        .await;
    assert!(statuses.contains(&"reconnecting (1/1)".to_string()));
}

#[test]
#[serial]
fn test_invalid_file_is_rejected() {
    let file = write_config(
        r#"
[filter]
max_presses_per_second = 500
history_capacity = 100
"#,
    );
    let result = ConfigLoader::load_from(file.path());
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

#[test]
#[serial]
fn test_saved_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("button-bridge.toml");

    let mut loader = ConfigLoader::with_defaults();
    loader.config.filter.debounce_ms = 120;
    loader.save_to(&path).unwrap();

    let reloaded: Config = ConfigLoader::load_from(&path).unwrap().into_config();
    assert_eq!(reloaded.filter.debounce_ms, 120);
    assert_eq!(reloaded, loader.config);
}
