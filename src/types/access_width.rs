//! Transfer width and direction of a memory access

use crate::{BridgeError, Result};

/// Width of a single physical memory transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AccessWidth {
    Byte = 1,
    Half = 2,
    Word = 4,
    Double = 8,
}

impl AccessWidth {
    /// Number of bytes moved by one transfer
    pub fn bytes(self) -> u32 {
        self as u32
    }

    /// Mask selecting the bytes of `data` covered by this width
    pub fn mask(self) -> u64 {
        match self {
            AccessWidth::Double => u64::MAX,
            other => (1u64 << (other.bytes() * 8)) - 1,
        }
    }
}

impl TryFrom<u32> for AccessWidth {
    type Error = BridgeError;

    fn try_from(width: u32) -> Result<Self> {
        match width {
            1 => Ok(AccessWidth::Byte),
            2 => Ok(AccessWidth::Half),
            4 => Ok(AccessWidth::Word),
            8 => Ok(AccessWidth::Double),
            _ => Err(BridgeError::InvalidWidth { width }),
        }
    }
}

/// Direction of a memory access, encoded as the `is_write` flag on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Operation {
    Read = 0,
    Write = 1,
}

impl Operation {
    /// Decode the wire flag (0 = read, 1 = write)
    pub fn from_flag(flag: u32) -> Result<Self> {
        match flag {
            0 => Ok(Operation::Read),
            1 => Ok(Operation::Write),
            other => Err(BridgeError::InvalidRequest {
                details: format!("unknown operation flag {other}"),
            }),
        }
    }

    /// Encode as the wire flag
    pub fn flag(self) -> u32 {
        self as u32
    }
}
