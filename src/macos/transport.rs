//! IOKit user client transport

use std::ffi::{CString, c_void};
use std::mem::size_of;
use std::ptr;

use io_kit_sys::ret::kIOReturnSuccess;
use io_kit_sys::types::{io_connect_t, io_service_t};
use io_kit_sys::{
    IOConnectCallMethod, IOObjectRelease, IOServiceClose, IOServiceGetMatchingService,
    IOServiceMatching, IOServiceOpen, kIOMasterPortDefault,
};
use mach2::port::MACH_PORT_NULL;
use mach2::traps::mach_task_self;
use tracing::{debug, trace, warn};

use crate::transport::{Session, Transport};
use crate::types::{MemoryAccessRequest, REQUEST_SIZE};
use crate::{BridgeError, Result};

/// User client type requested from the driver
const CLIENT_TYPE: u32 = 0;

/// Transport that locates the driver through the IOKit registry
#[derive(Debug, Default)]
pub struct IoKitTransport {
    _private: (),
}

impl IoKitTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for IoKitTransport {
    type Session = IoKitSession;

    fn open(&mut self, service_name: &str) -> Result<IoKitSession> {
        trace!(service = service_name, "Matching IOKit service");

        let name = CString::new(service_name).map_err(|_| {
            BridgeError::parse_error("service name", "contains an interior NUL byte")
        })?;

        // IOServiceGetMatchingService consumes the matching dictionary
        let service: io_service_t = unsafe {
            let matching = IOServiceMatching(name.as_ptr());
            if matching.is_null() {
                return Err(BridgeError::service_not_found(service_name));
            }
            IOServiceGetMatchingService(kIOMasterPortDefault, matching as _)
        };

        if service == MACH_PORT_NULL {
            debug!(service = service_name, "No matching IOKit service");
            return Err(BridgeError::service_not_found(service_name));
        }

        let mut connect: io_connect_t = MACH_PORT_NULL;
        let kr = unsafe { IOServiceOpen(service, mach_task_self(), CLIENT_TYPE, &mut connect) };

        // The registry entry is released whether or not the open succeeded
        unsafe {
            IOObjectRelease(service);
        }

        if kr != kIOReturnSuccess {
            warn!(service = service_name, code = kr, "IOServiceOpen rejected");
            return Err(BridgeError::open_rejected(service_name, kr));
        }

        debug!(service = service_name, connect, "Opened IOKit user client");
        Ok(IoKitSession { connect })
    }
}

/// Open IOKit user client connection
#[derive(Debug)]
pub struct IoKitSession {
    connect: io_connect_t,
}

impl Session for IoKitSession {
    fn call(&mut self, selector: u32, request: &MemoryAccessRequest) -> Result<MemoryAccessRequest> {
        let mut response = MemoryAccessRequest::default();
        let mut out_size = size_of::<MemoryAccessRequest>();

        let kr = unsafe {
            IOConnectCallMethod(
                self.connect,
                selector,
                ptr::null(),
                0,
                request as *const MemoryAccessRequest as *const c_void,
                size_of::<MemoryAccessRequest>(),
                ptr::null_mut(),
                ptr::null_mut(),
                &mut response as *mut MemoryAccessRequest as *mut c_void,
                &mut out_size,
            )
        };

        if kr != kIOReturnSuccess {
            trace!(selector, code = kr, "IOConnectCallMethod failed");
            return Err(BridgeError::call_failed(selector, kr));
        }

        if out_size != REQUEST_SIZE {
            return Err(BridgeError::InvalidRequest {
                details: format!("driver returned {out_size} bytes, expected {REQUEST_SIZE}"),
            });
        }

        Ok(response)
    }
}

impl Drop for IoKitSession {
    fn drop(&mut self) {
        debug!(connect = self.connect, "Closing IOKit user client");
        unsafe {
            let _ = IOServiceClose(self.connect);
        }
    }
}

// SAFETY: io_connect_t is a mach port name, valid from any thread of the task
unsafe impl Send for IoKitSession {}

#[cfg(all(test, target_os = "macos"))]
mod tests {
    use super::*;
    use crate::types::AccessWidth;
    use crate::{MMIO_SELECTOR, SERVICE_NAME};

    #[test]
    fn missing_service_is_reported() {
        let mut transport = IoKitTransport::new();
        assert!(matches!(
            transport.open("PhysMemRWDoesNotExist"),
            Err(BridgeError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn interior_nul_is_rejected() {
        let mut transport = IoKitTransport::new();
        assert!(matches!(transport.open("Phys\0Mem"), Err(BridgeError::Parse { .. })));
    }

    #[test]
    #[ignore = "driver_required"]
    fn reads_one_byte_from_live_driver() {
        let mut transport = IoKitTransport::new();
        let mut session = transport.open(SERVICE_NAME).expect("Failed to open PhysMemRW");
        let request = MemoryAccessRequest::read(0xFF00_D400, AccessWidth::Byte);
        let response = session.call(MMIO_SELECTOR, &request).expect("Driver call failed");
        assert_eq!(response.phys_addr, request.phys_addr);
    }
}
