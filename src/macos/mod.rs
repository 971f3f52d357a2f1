//! IOKit access to the PhysMemRW driver
//!
//! This module reaches the driver through the IOKit user client interface:
//! the service is matched by class name, a user client is opened for the
//! current task, and every transfer is a single `IOConnectCallMethod` on
//! selector 0 with the request record as both struct input and struct output.
//!
//! # Usage
//!
//! ```rust,ignore
//! use physbridge::macos::IoKitTransport;
//! use physbridge::{DriverEngine, SERVICE_NAME};
//!
//! let mut engine = DriverEngine::new(IoKitTransport::new());
//! if engine.open_connection() {
//!     let byte = engine.read_byte(0xFF00_D400);
//! }
//! ```

mod transport;

pub use transport::{IoKitSession, IoKitTransport};
