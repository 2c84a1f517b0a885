//! Device discovery E2E tests: list -> classify -> auto-select -> connect.

use crate::common::{arduino_port, plain_uart, TestBridge, ARDUINO_PATH};
use pretty_assertions::assert_eq;
use serial_button_bridge::{pick, Config, DeviceEnumerator, RawPortInfo};
use serial_button_bridge::config::DiscoveryConfig;

#[tokio::test(start_paused = true)]
async fn test_allow_listed_vendor_wins_over_enumeration_order() {
    let mut config = Config::default();
    config.discovery = DiscoveryConfig {
        vendor_ids: vec!["2341".to_string()],
        port_keywords: Vec::new(),
        match_com_ports: false,
    };
    let h = TestBridge::new(
        config,
        vec![
            RawPortInfo::new("/dev/ttyUSB0").with_usb_ids(0x9999, 0x0001),
            RawPortInfo::new("/dev/ttyUSB1").with_usb_ids(0x2341, 0x0043),
        ],
    );

    let selected = h.bridge.auto_select().await.unwrap();
    assert_eq!(selected.path, "/dev/ttyUSB1");
    assert_eq!(h.bridge.selected_device(), Some(selected));
}

#[tokio::test(start_paused = true)]
async fn test_descriptor_fields() {
    let h = TestBridge::new(Config::default(), vec![arduino_port(), plain_uart("/dev/ttyS0")]);
    let devices = h.bridge.list_devices().await;

    assert_eq!(devices.len(), 2);
    let arduino = &devices[0];
    assert_eq!(arduino.manufacturer, "Arduino (www.arduino.cc)");
    assert_eq!(arduino.vendor_id, "2341");
    assert_eq!(arduino.product_id, "0043");
    assert_eq!(
        arduino.description,
        "Arduino (www.arduino.cc) | VID:2341 PID:0043 | S/N:75830333238351F0A1A1"
    );
    assert!(arduino.is_candidate);

    let uart = &devices[1];
    assert_eq!(uart.manufacturer, "Unknown");
    assert_eq!(uart.vendor_id, "N/A");
    assert_eq!(uart.serial_number, "N/A");
    assert_eq!(uart.description, "/dev/ttyS0");
    assert!(!uart.is_candidate);
}

#[tokio::test(start_paused = true)]
async fn test_keyword_in_manufacturer_or_path() {
    let h = TestBridge::new(
        Config::default(),
        vec![
            plain_uart("/dev/ttyS0"),
            RawPortInfo::new("/dev/ttyUSB3").with_manufacturer("wch.cn CH340"),
            plain_uart("/dev/cu.usbmodem14101"),
        ],
    );
    let candidates: Vec<String> = h
        .bridge
        .list_devices()
        .await
        .into_iter()
        .filter(|d| d.is_candidate)
        .map(|d| d.path)
        .collect();

    assert_eq!(candidates, vec!["/dev/ttyUSB3", "/dev/cu.usbmodem14101"]);
}

#[test]
fn test_com_port_rule_is_configurable() {
    let ports = vec![plain_uart("/dev/ttyS0"), plain_uart("COM7")];

    let mut discovery = DiscoveryConfig::default();
    discovery.match_com_ports = true;
    let devices = DeviceEnumerator::with_source(&discovery, ports.clone())
        .list()
        .unwrap();
    assert_eq!(pick(&devices).map(|d| d.path.as_str()), Some("COM7"));

    discovery.match_com_ports = false;
    let devices = DeviceEnumerator::with_source(&discovery, ports).list().unwrap();
    assert_eq!(pick(&devices).map(|d| d.path.as_str()), Some("/dev/ttyS0"));
}

#[tokio::test(start_paused = true)]
async fn test_no_devices() {
    let h = TestBridge::new(Config::default(), Vec::new());
    assert!(h.bridge.list_devices().await.is_empty());
    assert!(h.bridge.auto_select().await.is_none());
    assert!(h.bridge.selected_device().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_auto_connect_uses_pick() {
    let mut h = TestBridge::new(
        Config::default(),
        vec![plain_uart("/dev/ttyS0"), arduino_port()],
    );

    assert!(h.bridge.auto_connect().await);
    assert_eq!(h.next_status().await, "connected: /dev/ttyACM0");
    assert_eq!(h.transport.open_attempts(), vec![ARDUINO_PATH]);
    assert_eq!(
        h.bridge.selected_device().map(|d| d.vendor_id),
        Some("2341".to_string())
    );
}
