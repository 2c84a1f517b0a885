//! Shared test utilities for the button bridge integration tests.
//!
//! This module provides common test infrastructure including:
//! - A bridge wired to a mock transport and a fixed device listing
//! - Helpers that wait for specific events on the bridge's event stream
//! - Common device and configuration builders

#![allow(dead_code)]

use serial_button_bridge::{
    BridgeEvent, ButtonBridge, Config, DeviceEnumerator, MockTransport, RawPortInfo,
};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const ARDUINO_PATH: &str = "/dev/ttyACM0";
pub const CONNECTED_ARDUINO: &str = "connected: /dev/ttyACM0";
pub const EXHAUSTED: &str = "disconnected: max attempts reached";

/// An Arduino Uno as the OS would report it.
pub fn arduino_port() -> RawPortInfo {
    RawPortInfo::new(ARDUINO_PATH)
        .with_manufacturer("Arduino (www.arduino.cc)")
        .with_usb_ids(0x2341, 0x0043)
        .with_serial_number("75830333238351F0A1A1")
}

/// A built-in UART with no USB information.
pub fn plain_uart(path: &str) -> RawPortInfo {
    RawPortInfo::new(path)
}

/// Default config with a short reconnect delay.
pub fn fast_config(max_attempts: u32) -> Config {
    let mut config = Config::default();
    config.device.reconnect_delay_ms = 100;
    config.device.max_reconnect_attempts = max_attempts;
    config
}

/// A bridge over a mock transport, plus the handles a test drives it with.
pub struct TestBridge {
    pub bridge: ButtonBridge,
    pub transport: MockTransport,
    pub events: mpsc::UnboundedReceiver<BridgeEvent>,
}

impl TestBridge {
    pub fn new(config: Config, ports: Vec<RawPortInfo>) -> Self {
        let transport = MockTransport::new();
        let enumerator = DeviceEnumerator::with_source(&config.discovery, ports);
        let (bridge, events) = ButtonBridge::new(&config, Arc::new(transport.clone()), enumerator);
        Self {
            bridge,
            transport,
            events,
        }
    }

    /// Default config with one Arduino attached.
    pub fn with_arduino() -> Self {
        Self::new(Config::default(), vec![arduino_port()])
    }

    pub async fn next_event(&mut self) -> BridgeEvent {
        self.events.recv().await.expect("event stream closed")
    }

    pub async fn next_status(&mut self) -> String {
        loop {
            if let BridgeEvent::Status(text) = self.next_event().await {
                return text;
            }
        }
    }

    pub async fn next_button(&mut self) -> String {
        loop {
            if let BridgeEvent::ButtonPressed(press) = self.next_event().await {
                return press.label;
            }
        }
    }

    /// Status lines up to and including `last`.
    pub async fn statuses_until(&mut self, last: &str) -> Vec<String> {
        let mut seen = Vec::new();
        loop {
            let status = self.next_status().await;
            let done = status == last;
            seen.push(status);
            if done {
                return seen;
            }
        }
    }

    /// All events up to and including the first one equal to `last`.
    pub async fn events_until(&mut self, last: &BridgeEvent) -> Vec<BridgeEvent> {
        let mut seen = Vec::new();
        loop {
            let event = self.next_event().await;
            let done = &event == last;
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    /// Connect to the Arduino and consume the connection events.
    pub async fn connect_arduino(&mut self) {
        assert!(self.bridge.connect(ARDUINO_PATH).await, "connect failed");
        assert_eq!(self.next_status().await, CONNECTED_ARDUINO);
        assert_eq!(
            self.next_event().await,
            BridgeEvent::Connected(ARDUINO_PATH.to_string())
        );
    }
}

/// Count the button presses and status lines among `events`.
pub fn tally(events: &[BridgeEvent]) -> (usize, Vec<String>) {
    let presses = events
        .iter()
        .filter(|e| matches!(e, BridgeEvent::ButtonPressed(_)))
        .count();
    let statuses = events
        .iter()
        .filter_map(|e| e.as_status().map(str::to_string))
        .collect();
    (presses, statuses)
}
