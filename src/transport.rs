//! Transport traits for reaching the driver

use crate::Result;
use crate::types::MemoryAccessRequest;

/// Service class name the driver registers under
pub const SERVICE_NAME: &str = "PhysMemRW";

/// Method selector of the driver's single read/write entry point
pub const MMIO_SELECTOR: u32 = 0;

/// Trait for ways of reaching the driver service
///
/// A transport performs discovery and session setup. Implementations must
/// release any lookup handle they acquire whether or not the open succeeds.
pub trait Transport {
    /// Open session type; closing happens when it is dropped
    type Session: Session;

    /// Look up `service` and open a client session on it
    ///
    /// Returns:
    /// - `Ok(session)` - Lookup and open both succeeded
    /// - `Err(ServiceNotFound)` - No service matched the name
    /// - `Err(OpenRejected)` - The service refused the client
    fn open(&mut self, service: &str) -> Result<Self::Session>;
}

/// An open client session with the driver
pub trait Session {
    /// Issue one synchronous method call
    ///
    /// `request` is the input record; the driver's output record is returned
    /// as a new value. Blocks until the driver responds.
    fn call(&mut self, selector: u32, request: &MemoryAccessRequest)
    -> Result<MemoryAccessRequest>;
}

/// Transport for the current platform
#[cfg(target_os = "macos")]
pub type NativeTransport = crate::macos::IoKitTransport;

/// Transport for the current platform
#[cfg(not(target_os = "macos"))]
pub type NativeTransport = UnsupportedTransport;

// Non-macOS stub implementation
#[cfg(not(target_os = "macos"))]
#[derive(Debug, Default)]
pub struct UnsupportedTransport {
    _private: (),
}

#[cfg(not(target_os = "macos"))]
impl UnsupportedTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(not(target_os = "macos"))]
impl Transport for UnsupportedTransport {
    type Session = UnsupportedSession;

    /// Always fails: the PhysMemRW driver is only reachable through IOKit.
    fn open(&mut self, _service: &str) -> Result<Self::Session> {
        Err(crate::BridgeError::unsupported_platform("PhysMemRW driver access", "macOS"))
    }
}

/// Session type that can never be constructed
#[cfg(not(target_os = "macos"))]
#[derive(Debug)]
pub enum UnsupportedSession {}

#[cfg(not(target_os = "macos"))]
impl Session for UnsupportedSession {
    fn call(
        &mut self,
        _selector: u32,
        _request: &MemoryAccessRequest,
    ) -> Result<MemoryAccessRequest> {
        match *self {}
    }
}

#[cfg(all(test, not(target_os = "macos")))]
mod tests {
    use super::*;
    use crate::BridgeError;

    #[test]
    fn native_transport_reports_unsupported_platform() {
        let mut transport = NativeTransport::new();
        assert!(matches!(
            transport.open(SERVICE_NAME),
            Err(BridgeError::UnsupportedPlatform { .. })
        ));
    }
}
