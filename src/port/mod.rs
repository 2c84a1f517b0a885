//! Transport layer for serial button controllers.
//!
//! Provides the async traits the supervisor opens devices through, a newline
//! framer, the tokio-serial backend and a mock for tests.

pub mod error;
pub mod lines;
pub mod mock;
pub mod traits;

#[cfg(feature = "native-serial")]
pub mod async_port;

pub use error::PortError;
pub use lines::LineDecoder;
pub use mock::{MockLink, MockTransport};
pub use traits::*;

#[cfg(feature = "native-serial")]
pub use async_port::{TokioSerialLink, TokioSerialTransport};
