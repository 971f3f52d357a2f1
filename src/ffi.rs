//! C ABI for native UI consumers
//!
//! Mirrors [`PhysMemBridge`] one function per method. A handle comes from
//! [`physbridge_new`] and must be released with [`physbridge_free`]. Passing a
//! null handle is treated as "not connected": reads return the sentinel and
//! writes do nothing.
//!
//! ```c
//! PhysMemBridge *bridge = physbridge_new();
//! if (physbridge_connect(bridge)) {
//!     uint8_t byte = physbridge_read_at(bridge, 0xFF00D400);
//!     physbridge_write_at(bridge, 0xFF00D400, byte ^ 1);
//! }
//! physbridge_free(bridge);
//! ```

use crate::bridge::PhysMemBridge;
use crate::engine::READ_SENTINEL;
use crate::transport::Transport;
use crate::BridgeError;

/// Status codes returned by [`physbridge_try_read_at`]
pub const PHYSBRIDGE_OK: i32 = 0;
pub const PHYSBRIDGE_NOT_CONNECTED: i32 = 1;
pub const PHYSBRIDGE_CALL_FAILED: i32 = 2;
pub const PHYSBRIDGE_INVALID_ARGUMENT: i32 = 3;

/// Allocate a bridge over the native transport
#[unsafe(no_mangle)]
pub extern "C" fn physbridge_new() -> *mut PhysMemBridge {
    Box::into_raw(Box::new(PhysMemBridge::new()))
}

/// Release a bridge, closing its session
///
/// # Safety
///
/// `bridge` must be null or a pointer from [`physbridge_new`] not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn physbridge_free(bridge: *mut PhysMemBridge) {
    if !bridge.is_null() {
        drop(unsafe { Box::from_raw(bridge) });
    }
}

/// Open the driver session; `true` on success or when already connected
///
/// # Safety
///
/// `bridge` must be null or a live pointer from [`physbridge_new`], not used
/// concurrently from another thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn physbridge_connect(bridge: *mut PhysMemBridge) -> bool {
    match unsafe { bridge.as_mut() } {
        Some(bridge) => bridge.connect(),
        None => false,
    }
}

/// Close the driver session if open
///
/// # Safety
///
/// Same contract as [`physbridge_connect`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn physbridge_disconnect(bridge: *mut PhysMemBridge) {
    if let Some(bridge) = unsafe { bridge.as_mut() } {
        bridge.disconnect();
    }
}

/// Read one byte, `0xFF` when not connected or the call fails
///
/// # Safety
///
/// Same contract as [`physbridge_connect`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn physbridge_read_at(bridge: *mut PhysMemBridge, address: u64) -> u8 {
    match unsafe { bridge.as_mut() } {
        Some(bridge) => bridge.read_at(address),
        None => READ_SENTINEL,
    }
}

/// Write one byte; failures are not reported
///
/// # Safety
///
/// Same contract as [`physbridge_connect`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn physbridge_write_at(bridge: *mut PhysMemBridge, address: u64, value: u8) {
    if let Some(bridge) = unsafe { bridge.as_mut() } {
        bridge.write_at(address, value);
    }
}

/// Read one byte, reporting failure through the status code
///
/// On [`PHYSBRIDGE_OK`] the byte is stored through `out`; otherwise `out` is
/// left untouched.
///
/// # Safety
///
/// Same contract as [`physbridge_connect`]; `out` must be null or valid for a
/// one-byte write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn physbridge_try_read_at(
    bridge: *mut PhysMemBridge,
    address: u64,
    out: *mut u8,
) -> i32 {
    let Some(bridge) = (unsafe { bridge.as_mut() }) else {
        return PHYSBRIDGE_NOT_CONNECTED;
    };
    match unsafe { out.as_mut() } {
        Some(out) => try_read_status(bridge, address, out),
        None => PHYSBRIDGE_INVALID_ARGUMENT,
    }
}

fn try_read_status<T: Transport>(bridge: &mut PhysMemBridge<T>, address: u64, out: &mut u8) -> i32 {
    match bridge.try_read_at(address) {
        Ok(byte) => {
            *out = byte;
            PHYSBRIDGE_OK
        }
        Err(BridgeError::NotConnected) => PHYSBRIDGE_NOT_CONNECTED,
        Err(_) => PHYSBRIDGE_CALL_FAILED,
    }
}
