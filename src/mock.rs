//! In-memory stand-in for the PhysMemRW driver
//!
//! [`MockDriver`] implements [`Transport`] over a sparse byte map so the
//! engine, façade and monitor can be exercised without the kernel extension.
//! Clones share state, so a test can keep one handle for inspection after
//! moving another into an engine.
//!
//! ```rust
//! use physbridge::mock::MockDriver;
//! use physbridge::PhysMemBridge;
//!
//! let driver = MockDriver::new();
//! let mut bridge = PhysMemBridge::with_transport(driver.clone());
//! assert!(bridge.connect());
//! bridge.write_at(0x1000, 0xAB);
//! assert_eq!(bridge.read_at(0x1000), 0xAB);
//! assert_eq!(driver.stats().calls, 2);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::transport::{SERVICE_NAME, Session, Transport};
use crate::types::{MemoryAccessRequest, Operation};
use crate::{BridgeError, Result};

/// Counters of driver interactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    /// Service lookups attempted
    pub lookups: usize,
    /// Session opens attempted (after a successful lookup)
    pub opens: usize,
    /// Lookup handles released
    pub releases: usize,
    /// Sessions closed
    pub closes: usize,
    /// Method calls issued
    pub calls: usize,
}

#[derive(Debug)]
struct MockState {
    memory: HashMap<u64, u8>,
    scripted_reads: HashMap<u64, u64>,
    service_present: bool,
    open_error: Option<i32>,
    call_error: Option<i32>,
    open_sessions: usize,
    last_request: Option<MemoryAccessRequest>,
    stats: MockStats,
}

/// Simulated driver service backed by a sparse byte map
#[derive(Debug, Clone)]
pub struct MockDriver {
    service: String,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Driver registered under the default service name, all memory zeroed
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            state: Arc::new(Mutex::new(MockState {
                memory: HashMap::new(),
                scripted_reads: HashMap::new(),
                service_present: true,
                open_error: None,
                call_error: None,
                open_sessions: 0,
                last_request: None,
                stats: MockStats::default(),
            })),
        }
    }

    /// Driver whose service lookup always fails
    pub fn without_service() -> Self {
        let driver = Self::new();
        driver.lock().service_present = false;
        driver
    }

    /// Make subsequent opens fail with `code`
    pub fn reject_open(&self, code: i32) {
        self.lock().open_error = Some(code);
    }

    /// Make subsequent calls fail with `code`
    pub fn fail_calls(&self, code: i32) {
        self.lock().call_error = Some(code);
    }

    /// Let calls succeed again
    pub fn recover_calls(&self) {
        self.lock().call_error = None;
    }

    /// Return `data` verbatim for any read at `address`
    pub fn script_read(&self, address: u64, data: u64) {
        self.lock().scripted_reads.insert(address, data);
    }

    /// Store `bytes` starting at `address`
    pub fn seed(&self, address: u64, bytes: &[u8]) {
        let mut state = self.lock();
        for (offset, byte) in bytes.iter().enumerate() {
            state.memory.insert(address.wrapping_add(offset as u64), *byte);
        }
    }

    /// Current byte at `address` (0 when never written)
    pub fn peek(&self, address: u64) -> u8 {
        self.lock().memory.get(&address).copied().unwrap_or(0)
    }

    /// Interaction counters so far
    pub fn stats(&self) -> MockStats {
        self.lock().stats
    }

    /// Number of sessions currently open
    pub fn open_sessions(&self) -> usize {
        self.lock().open_sessions
    }

    /// Most recent request received by any session
    pub fn last_request(&self) -> Option<MemoryAccessRequest> {
        self.lock().last_request
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockDriver {
    type Session = MockSession;

    fn open(&mut self, service: &str) -> Result<MockSession> {
        let mut state = self.lock();
        state.stats.lookups += 1;

        if !state.service_present || service != self.service {
            trace!(service, "Mock lookup found no service");
            return Err(BridgeError::service_not_found(service));
        }

        state.stats.opens += 1;
        state.stats.releases += 1;

        if let Some(code) = state.open_error {
            return Err(BridgeError::open_rejected(service, code));
        }

        state.open_sessions += 1;
        Ok(MockSession { state: Arc::clone(&self.state) })
    }
}

/// Session on a [`MockDriver`]
#[derive(Debug)]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Session for MockSession {
    fn call(&mut self, selector: u32, request: &MemoryAccessRequest) -> Result<MemoryAccessRequest> {
        let mut state = self.lock();
        state.stats.calls += 1;
        state.last_request = Some(*request);

        if let Some(code) = state.call_error {
            return Err(BridgeError::call_failed(selector, code));
        }

        let width = request.width()?;
        let mut response = *request;

        match request.operation()? {
            Operation::Read => {
                response.data = match state.scripted_reads.get(&request.phys_addr) {
                    Some(data) => *data,
                    None => (0..width.bytes() as u64).fold(0u64, |acc, i| {
                        let byte = state
                            .memory
                            .get(&request.phys_addr.wrapping_add(i))
                            .copied()
                            .unwrap_or(0);
                        acc | (u64::from(byte) << (i * 8))
                    }),
                };
            }
            Operation::Write => {
                for i in 0..width.bytes() as u64 {
                    let byte = (request.data >> (i * 8)) as u8;
                    state.memory.insert(request.phys_addr.wrapping_add(i), byte);
                }
            }
        }

        trace!(addr = request.phys_addr, data = response.data, "Mock call served");
        Ok(response)
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        let mut state = self.lock();
        state.open_sessions = state.open_sessions.saturating_sub(1);
        state.stats.closes += 1;
    }
}
