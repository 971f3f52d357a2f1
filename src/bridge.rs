//! Caller-facing bridge over the connection engine

use crate::engine::DriverEngine;
use crate::transport::{NativeTransport, Transport};
use crate::types::AccessWidth;
use crate::Result;

/// Narrow façade exposing `connect`, `read_at` and `write_at`
///
/// Every method forwards to the wrapped [`DriverEngine`] without buffering
/// or validation of its own.
pub struct PhysMemBridge<T: Transport = NativeTransport> {
    engine: DriverEngine<T>,
}

impl PhysMemBridge<NativeTransport> {
    /// Bridge using the platform's native transport
    pub fn new() -> Self {
        Self::with_transport(NativeTransport::new())
    }
}

impl Default for PhysMemBridge<NativeTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> PhysMemBridge<T> {
    /// Bridge over an arbitrary transport
    pub fn with_transport(transport: T) -> Self {
        Self { engine: DriverEngine::new(transport) }
    }

    /// Bridge over an already configured engine
    pub fn from_engine(engine: DriverEngine<T>) -> Self {
        Self { engine }
    }

    /// Open the driver session; `true` when connected, including when already open
    pub fn connect(&mut self) -> bool {
        self.engine.open_connection()
    }

    /// Close the session if open; no-op otherwise
    pub fn disconnect(&mut self) {
        self.engine.close_connection()
    }

    /// Whether a driver session is open
    pub fn is_connected(&self) -> bool {
        self.engine.is_connected()
    }

    /// Read one byte, or [`READ_SENTINEL`](crate::READ_SENTINEL) when disconnected or the call fails
    pub fn read_at(&mut self, address: u64) -> u8 {
        self.engine.read_byte(address)
    }

    /// Write one byte; silently does nothing when disconnected or the call fails
    pub fn write_at(&mut self, address: u64, value: u8) {
        self.engine.write_byte(address, value)
    }

    /// Like [`connect`](Self::connect) but reports why the session could not be opened
    pub fn try_connect(&mut self) -> Result<()> {
        self.engine.try_open()
    }

    /// Read one byte, failing with [`NotConnected`](crate::BridgeError::NotConnected) or the driver error
    pub fn try_read_at(&mut self, address: u64) -> Result<u8> {
        self.engine.try_read(address, AccessWidth::Byte).map(|v| v as u8)
    }

    /// Write one byte, reporting disconnection and driver failures
    pub fn try_write_at(&mut self, address: u64, value: u8) -> Result<()> {
        self.engine.try_write(address, AccessWidth::Byte, u64::from(value))
    }

    /// Read `len` consecutive bytes starting at `address`; stops at the first failure
    pub fn read_range(&mut self, address: u64, len: usize) -> Result<Vec<u8>> {
        self.engine.read_block(address, len)
    }

    /// Underlying engine, for wider transfers
    pub fn engine_mut(&mut self) -> &mut DriverEngine<T> {
        &mut self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use crate::{BridgeError, READ_SENTINEL};

    #[test]
    fn forwards_one_to_one() {
        let driver = MockDriver::new();
        let mut bridge = PhysMemBridge::with_transport(driver.clone());

        assert!(bridge.connect());
        bridge.write_at(0x42, 0x99);
        assert_eq!(bridge.read_at(0x42), 0x99);
        assert_eq!(driver.stats().calls, 2);

        bridge.disconnect();
        assert!(!bridge.is_connected());
        assert_eq!(bridge.read_at(0x42), READ_SENTINEL);
        assert_eq!(driver.stats().calls, 2);
    }

    #[test]
    fn try_variants_surface_errors() {
        let mut bridge = PhysMemBridge::with_transport(MockDriver::without_service());
        assert!(matches!(bridge.try_connect(), Err(BridgeError::ServiceNotFound { .. })));
        assert!(matches!(bridge.try_read_at(0), Err(BridgeError::NotConnected)));
        assert!(matches!(bridge.try_write_at(0, 1), Err(BridgeError::NotConnected)));
    }

    #[test]
    fn wide_transfers_through_engine() {
        let driver = MockDriver::new();
        let mut bridge = PhysMemBridge::with_transport(driver.clone());
        assert!(bridge.connect());

        bridge.engine_mut().try_write(0x80, AccessWidth::Double, 0x0102_0304_0506_0708).unwrap();
        assert_eq!(bridge.read_range(0x80, 2).unwrap(), vec![0x08, 0x07]);
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn native_bridge_fails_to_connect_off_macos() {
        let mut bridge = PhysMemBridge::new();
        assert!(!bridge.connect());
        assert_eq!(bridge.read_at(0xFF00_D400), READ_SENTINEL);
    }
}
