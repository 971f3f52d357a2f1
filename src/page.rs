//! Memory pages and their hex/ASCII rendering
//!
//! A [`MemoryPage`] is a window of physical memory captured byte by byte.
//! Bytes the driver refused to read are kept as `None` and rendered as
//! `??`, so a failed read never masquerades as `0xFF`.
//!
//! ```rust
//! use physbridge::page::{MemoryPage, parse_address};
//!
//! let base = parse_address("0xFF00D400").unwrap();
//! let page = MemoryPage::from_bytes(base, b"Hello".to_vec());
//! let row = &page.render_rows()[0];
//! assert!(row.starts_with("00000000FF00D400  48 65 6C 6C 6F "));
//! assert!(row.ends_with("  |Hello|"));
//! ```

use std::fmt;

use crate::bridge::PhysMemBridge;
use crate::config::MAX_PAGE_SIZE;
use crate::transport::Transport;
use crate::{BridgeError, Result};

/// Bytes shown per rendered row
pub const BYTES_PER_ROW: usize = 16;

/// Parse a hexadecimal physical address, with or without a `0x` prefix
pub fn parse_address(input: &str) -> Result<u64> {
    let digits = strip_hex_prefix(input.trim());
    if digits.is_empty() {
        return Err(BridgeError::parse_error("address", "empty input"));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| BridgeError::parse_error("address", format!("'{}': {}", input.trim(), e)))
}

/// Parse a byte value entered as one or two hex digits
pub fn parse_byte(input: &str) -> Result<u8> {
    let digits = strip_hex_prefix(input.trim());
    if digits.is_empty() || digits.len() > 2 {
        return Err(BridgeError::parse_error(
            "byte value",
            format!("'{}' is not one or two hex digits", input.trim()),
        ));
    }
    u8::from_str_radix(digits, 16)
        .map_err(|e| BridgeError::parse_error("byte value", format!("'{}': {}", input.trim(), e)))
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

/// ASCII column character for `byte`
pub fn ascii_char(byte: u8) -> char {
    if (32..=126).contains(&byte) { byte as char } else { '.' }
}

/// Window of physical memory starting at `base`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPage {
    base: u64,
    cells: Vec<Option<u8>>,
}

impl MemoryPage {
    /// Page built from known bytes
    pub fn from_bytes(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, cells: bytes.into_iter().map(Some).collect() }
    }

    /// Read `len` bytes at `base` through a connected bridge
    ///
    /// Individual refused reads become unreadable cells; the capture only
    /// fails as a whole when the bridge is disconnected, `len` exceeds
    /// [`MAX_PAGE_SIZE`], or the window would wrap past the end of the
    /// address space.
    pub fn capture<T: Transport>(
        bridge: &mut PhysMemBridge<T>,
        base: u64,
        len: usize,
    ) -> Result<Self> {
        if !bridge.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        if len > MAX_PAGE_SIZE {
            return Err(BridgeError::InvalidRequest {
                details: format!("page of {len} bytes exceeds the {MAX_PAGE_SIZE} byte limit"),
            });
        }
        if len > 0 && base.checked_add(len as u64 - 1).is_none() {
            return Err(BridgeError::InvalidRequest {
                details: format!("page of {len} bytes at {base:#x} overflows the address space"),
            });
        }

        let mut cells = Vec::with_capacity(len);
        for offset in 0..len as u64 {
            match bridge.try_read_at(base + offset) {
                Ok(byte) => cells.push(Some(byte)),
                Err(BridgeError::NotConnected) => return Err(BridgeError::NotConnected),
                Err(_) => cells.push(None),
            }
        }

        Ok(Self { base, cells })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Byte at `index`, `None` when out of range or unreadable
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.cells.get(index).copied().flatten()
    }

    /// Physical address of the cell at `index`
    pub fn address_of(&self, index: usize) -> Option<u64> {
        if index < self.cells.len() { self.base.checked_add(index as u64) } else { None }
    }

    /// Number of cells the driver refused to read
    pub fn unreadable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    /// One line per 16 bytes: address, hex column, ASCII column
    pub fn render_rows(&self) -> Vec<String> {
        self.cells
            .chunks(BYTES_PER_ROW)
            .enumerate()
            .map(|(row, chunk)| {
                let addr = self.base.wrapping_add((row * BYTES_PER_ROW) as u64);
                let hex: Vec<String> = chunk
                    .iter()
                    .map(|cell| match cell {
                        Some(byte) => format!("{byte:02X}"),
                        None => "??".to_string(),
                    })
                    .collect();
                let ascii: String =
                    chunk.iter().map(|cell| cell.map(ascii_char).unwrap_or('.')).collect();
                format!(
                    "{addr:016X}  {hex:<width$}  |{ascii}|",
                    hex = hex.join(" "),
                    width = BYTES_PER_ROW * 3 - 1
                )
            })
            .collect()
    }
}

impl fmt::Display for MemoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.render_rows() {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}
