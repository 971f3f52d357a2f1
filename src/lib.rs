//! User-space bridge to the PhysMemRW physical memory driver.
//!
//! physbridge opens a client session on the `PhysMemRW` kernel service and
//! forwards single-byte physical memory reads and writes to it through a
//! fixed-layout request record.
//!
//! # Layers
//!
//! - [`types`]: the 24-byte [`MemoryAccessRequest`] shared with the driver
//! - [`transport`]: discovery and session traits, with an IOKit
//!   implementation on macOS and [`mock::MockDriver`] everywhere
//! - [`DriverEngine`]: owns one session and issues the calls
//! - [`PhysMemBridge`]: the narrow `connect` / `read_at` / `write_at` façade
//! - [`page`], [`monitor`], [`config`]: hex page capture, auto-refresh and
//!   YAML configuration used by the `physbridge` viewer
//! - [`ffi`]: C ABI over the façade
//!
//! # Example
//!
//! ```rust
//! use physbridge::mock::MockDriver;
//! use physbridge::{PhysMemBridge, READ_SENTINEL};
//!
//! let mut bridge = PhysMemBridge::with_transport(MockDriver::new());
//! assert!(bridge.connect());
//! bridge.write_at(0xFF00_D400, 0x42);
//! assert_eq!(bridge.read_at(0xFF00_D400), 0x42);
//!
//! bridge.disconnect();
//! assert_eq!(bridge.read_at(0xFF00_D400), READ_SENTINEL);
//! ```

// Core types and error handling
mod error;
pub mod types;

// Driver access
mod bridge;
mod engine;
pub mod mock;
pub mod transport;

// Viewer support
pub mod config;
pub mod monitor;
pub mod page;

pub mod ffi;

// Platform-specific modules
#[cfg(target_os = "macos")]
pub mod macos;

// Core exports
pub use error::*;
pub use types::{AccessWidth, MemoryAccessRequest, Operation, REQUEST_SIZE};

// Main API exports
pub use bridge::PhysMemBridge;
pub use engine::{DriverEngine, READ_SENTINEL};
pub use transport::{MMIO_SELECTOR, NativeTransport, SERVICE_NAME, Session, Transport};

pub use config::BridgeConfig;
pub use monitor::{MonitorSettings, PageMonitor, PageSnapshot};
pub use page::MemoryPage;
