//! Serial Button Bridge Library
//!
//! A resilient input channel for USB serial button controllers: it finds the
//! controller, keeps a connection to it alive with bounded automatic
//! reconnection, and turns the raw line stream into validated, debounced,
//! rate-limited button events with rolling statistics.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `discovery`: Serial device enumeration and controller detection
//! - `error`: Bridge error taxonomy
//! - `event`: Events delivered to the host
//! - `filter`: Validation, debounce, spam suppression and statistics
//! - `port`: Serial transport abstraction (tokio-serial backend and mock)
//! - `service`: `ButtonBridge`, the host-facing facade
//! - `state`: Connection state machine states
//! - `supervisor`: The task that owns the connection
//!
//! # Example
//!
//! ```no_run
//! use serial_button_bridge::{BridgeEvent, ButtonBridge, Config};
//!
//! # async fn run() {
//! let (bridge, mut events) = ButtonBridge::native(&Config::default());
//! bridge.auto_connect().await;
//!
//! while let Some(event) = events.recv().await {
//!     if let BridgeEvent::ButtonPressed(press) = event {
//!         println!("button {}", press.label);
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod event;
pub mod filter;
pub mod port;
pub mod service;
pub mod state;
pub mod supervisor;

// Re-export commonly used types for convenience
pub use discovery::{pick, DeviceDescriptor, DeviceEnumerator, PortSource, RawPortInfo};
pub use error::{BridgeError, BridgeResult};
pub use event::{BridgeEvent, ButtonEvent};
pub use filter::{EventFilter, FilterOutcome, Rejection, StatsSnapshot};
pub use port::{MockTransport, PortConfiguration, PortError, SerialLink, SerialTransport};
pub use service::ButtonBridge;
pub use state::ConnectionState;
pub use supervisor::SupervisorHandle;

#[cfg(feature = "native-serial")]
pub use port::TokioSerialTransport;

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
