//! Wire-level types shared with the PhysMemRW driver.
//!
//! ## Layout
//!
//! [`MemoryAccessRequest`] mirrors the driver's request record byte for byte:
//!
//! | Offset | Field     | Type | Meaning                      |
//! |--------|-----------|------|------------------------------|
//! | 0      | phys_addr | u64  | target physical address      |
//! | 8      | data      | u64  | value to write / value read  |
//! | 16     | size      | u32  | transfer width (1/2/4/8)     |
//! | 20     | is_write  | u32  | 0 = read, 1 = write          |
//!
//! ## Usage Example
//!
//! ```rust
//! use physbridge::types::{AccessWidth, MemoryAccessRequest, Operation};
//!
//! let request = MemoryAccessRequest::read(0xFF00_D400, AccessWidth::Byte);
//! assert_eq!(request.operation().unwrap(), Operation::Read);
//! assert_eq!(request.to_bytes().len(), 24);
//! ```

mod access_width;
mod request;

pub use access_width::{AccessWidth, Operation};
pub use request::{MemoryAccessRequest, REQUEST_SIZE};
