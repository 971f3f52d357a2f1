//! Connection engine owning the driver session
//!
//! [`DriverEngine`] holds at most one open session and turns byte-level
//! read/write intents into single request/response calls on
//! [`MMIO_SELECTOR`]. Two surfaces are offered:
//!
//! - The sentinel surface (`open_connection`, `read_byte`, `write_byte`,
//!   `close_connection`) never fails: a missing connection or a failed call
//!   yields `false`, [`READ_SENTINEL`] or nothing at all.
//! - The `try_*` surface reports the same outcomes as [`BridgeError`]s, so a
//!   failed read can be told apart from a genuine `0xFF`.

use tracing::{debug, trace, warn};

use crate::transport::{MMIO_SELECTOR, SERVICE_NAME, Session, Transport};
use crate::types::{AccessWidth, MemoryAccessRequest};
use crate::{BridgeError, Result};

/// Value returned by [`DriverEngine::read_byte`] when no byte could be read
pub const READ_SENTINEL: u8 = 0xFF;

/// Owner of one driver session
pub struct DriverEngine<T: Transport> {
    transport: T,
    service: String,
    session: Option<T::Session>,
}

impl<T: Transport> DriverEngine<T> {
    /// Engine targeting the default `PhysMemRW` service
    pub fn new(transport: T) -> Self {
        Self::with_service(transport, SERVICE_NAME)
    }

    /// Engine targeting a custom service class name
    pub fn with_service(transport: T, service: impl Into<String>) -> Self {
        Self { transport, service: service.into(), session: None }
    }

    /// Service class name used for discovery
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// Whether a session is currently open
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session unless one is already open
    pub fn try_open(&mut self) -> Result<()> {
        if self.session.is_some() {
            trace!("Already connected");
            return Ok(());
        }

        let session = self.transport.open(&self.service)?;
        self.session = Some(session);
        debug!(service = %self.service, "Driver session opened");
        Ok(())
    }

    /// Open a session, reporting only success or failure
    pub fn open_connection(&mut self) -> bool {
        match self.try_open() {
            Ok(()) => true,
            Err(e) => {
                warn!(service = %self.service, "Failed to connect to driver: {}", e);
                false
            }
        }
    }

    /// Read `width` bytes at `address`
    pub fn try_read(&mut self, address: u64, width: AccessWidth) -> Result<u64> {
        let session = self.session.as_mut().ok_or(BridgeError::NotConnected)?;
        let request = MemoryAccessRequest::read(address, width);
        let response = session.call(MMIO_SELECTOR, &request)?;
        trace!(addr = address, data = response.data, "Read completed");
        Ok(response.data & width.mask())
    }

    /// Write the low `width` bytes of `value` at `address`
    pub fn try_write(&mut self, address: u64, width: AccessWidth, value: u64) -> Result<()> {
        let session = self.session.as_mut().ok_or(BridgeError::NotConnected)?;
        let request = MemoryAccessRequest::write(address, width, value);
        session.call(MMIO_SELECTOR, &request)?;
        trace!(addr = address, data = request.data, "Write completed");
        Ok(())
    }

    /// Read one byte, or [`READ_SENTINEL`] when not connected or the call fails
    pub fn read_byte(&mut self, address: u64) -> u8 {
        match self.try_read(address, AccessWidth::Byte) {
            Ok(value) => value as u8,
            Err(BridgeError::NotConnected) => READ_SENTINEL,
            Err(e) => {
                warn!(addr = address, "Read failed: {}", e);
                READ_SENTINEL
            }
        }
    }

    /// Write one byte; failures are logged and otherwise ignored
    pub fn write_byte(&mut self, address: u64, value: u8) {
        match self.try_write(address, AccessWidth::Byte, u64::from(value)) {
            Ok(()) | Err(BridgeError::NotConnected) => {}
            Err(e) => warn!(addr = address, "Write failed: {}", e),
        }
    }

    /// Read `len` consecutive bytes starting at `address`
    ///
    /// Fails on the first byte the driver refuses.
    pub fn read_block(&mut self, address: u64, len: usize) -> Result<Vec<u8>> {
        if len > 0 && address.checked_add(len as u64 - 1).is_none() {
            return Err(BridgeError::InvalidRequest {
                details: format!("{len} bytes at {address:#x} overflow the address space"),
            });
        }

        (0..len as u64)
            .map(|offset| self.try_read(address + offset, AccessWidth::Byte).map(|v| v as u8))
            .collect()
    }

    /// Close the session if one is open
    pub fn close_connection(&mut self) {
        if let Some(session) = self.session.take() {
            drop(session);
            debug!(service = %self.service, "Driver session closed");
        }
    }
}
