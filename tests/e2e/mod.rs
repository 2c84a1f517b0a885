//! End-to-end tests for the button bridge.
//!
//! These tests run the real supervisor task against a mock transport and a
//! fixed device listing, covering the path from discovery through button
//! events, reconnection and shutdown.

pub mod config_tests;
pub mod discovery_tests;
pub mod reconnect_tests;
pub mod workflow_tests;
