//! Memory access request record exchanged with the driver

use std::mem::size_of;

use super::{AccessWidth, Operation};
use crate::{BridgeError, Result};

/// Size in bytes of one request record on the wire
pub const REQUEST_SIZE: usize = 24;

/// Request/response record matching the driver's `mmio_request_t` exactly
///
/// The same layout is used in both directions: the driver receives a
/// request and hands back a record of the same shape with `data` filled in
/// for reads. Callers keep the request and the response as separate values.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryAccessRequest {
    pub phys_addr: u64, // Target physical address
    pub data: u64,      // Value to write / value read back
    pub size: u32,      // 1, 2, 4, 8
    pub is_write: u32,  // 1 for write, 0 for read
}

const _: () = assert!(size_of::<MemoryAccessRequest>() == REQUEST_SIZE);

impl MemoryAccessRequest {
    /// Build a read request for `width` bytes at `phys_addr`
    pub fn read(phys_addr: u64, width: AccessWidth) -> Self {
        Self { phys_addr, data: 0, size: width.bytes(), is_write: Operation::Read.flag() }
    }

    /// Build a write request; `value` is truncated to `width`
    pub fn write(phys_addr: u64, width: AccessWidth, value: u64) -> Self {
        Self {
            phys_addr,
            data: value & width.mask(),
            size: width.bytes(),
            is_write: Operation::Write.flag(),
        }
    }

    /// Decoded transfer width
    pub fn width(&self) -> Result<AccessWidth> {
        AccessWidth::try_from(self.size)
    }

    /// Decoded direction
    pub fn operation(&self) -> Result<Operation> {
        Operation::from_flag(self.is_write)
    }

    /// Low byte of the data field
    pub fn low_byte(&self) -> u8 {
        (self.data & 0xFF) as u8
    }

    /// Data masked to the record's width, or the raw field if the width is unknown
    pub fn value(&self) -> u64 {
        match self.width() {
            Ok(width) => self.data & width.mask(),
            Err(_) => self.data,
        }
    }

    /// Encode as the native-endian wire image
    pub fn to_bytes(&self) -> [u8; REQUEST_SIZE] {
        let mut buf = [0u8; REQUEST_SIZE];
        buf[0..8].copy_from_slice(&self.phys_addr.to_ne_bytes());
        buf[8..16].copy_from_slice(&self.data.to_ne_bytes());
        buf[16..20].copy_from_slice(&self.size.to_ne_bytes());
        buf[20..24].copy_from_slice(&self.is_write.to_ne_bytes());
        buf
    }

    /// Decode a native-endian wire image, validating width and direction
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let buf: &[u8; REQUEST_SIZE] = buf.try_into().map_err(|_| BridgeError::InvalidRequest {
            details: format!("expected {} bytes, got {}", REQUEST_SIZE, buf.len()),
        })?;

        let mut u64_at = [0u8; 8];
        let mut u32_at = [0u8; 4];

        u64_at.copy_from_slice(&buf[0..8]);
        let phys_addr = u64::from_ne_bytes(u64_at);
        u64_at.copy_from_slice(&buf[8..16]);
        let data = u64::from_ne_bytes(u64_at);
        u32_at.copy_from_slice(&buf[16..20]);
        let size = u32::from_ne_bytes(u32_at);
        u32_at.copy_from_slice(&buf[20..24]);
        let is_write = u32::from_ne_bytes(u32_at);

        let request = Self { phys_addr, data, size, is_write };
        request.width()?;
        request.operation()?;
        Ok(request)
    }
}
