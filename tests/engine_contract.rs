//! Behavioural contract of the connection engine against a mock driver
//!
//! Each test drives the public sentinel API the way a UI consumer would and
//! checks both the returned values and the calls the driver observed.

use physbridge::mock::MockDriver;
use physbridge::{AccessWidth, DriverEngine, PhysMemBridge, READ_SENTINEL};
use proptest::prelude::*;

fn connected(driver: &MockDriver) -> DriverEngine<MockDriver> {
    let mut engine = DriverEngine::new(driver.clone());
    assert!(engine.open_connection(), "mock driver should accept the connection");
    engine
}

#[test]
fn open_twice_looks_up_and_opens_once() {
    let driver = MockDriver::new();
    let mut engine = DriverEngine::new(driver.clone());

    assert!(engine.open_connection());
    assert!(engine.open_connection());

    let stats = driver.stats();
    assert_eq!(stats.lookups, 1);
    assert_eq!(stats.opens, 1);
    assert_eq!(stats.releases, 1);
}

#[test]
fn read_after_close_returns_sentinel_without_calling_driver() {
    let driver = MockDriver::new();
    driver.seed(0x1000, &[0x11]);
    let mut engine = connected(&driver);
    assert_eq!(engine.read_byte(0x1000), 0x11);

    engine.close_connection();
    let calls_before = driver.stats().calls;
    assert_eq!(engine.read_byte(0x1000), READ_SENTINEL);
    assert_eq!(driver.stats().calls, calls_before);
    assert_eq!(driver.open_sessions(), 0);
}

#[test]
fn close_when_never_connected_is_a_no_op() {
    let driver = MockDriver::new();
    let mut engine = DriverEngine::new(driver.clone());

    engine.close_connection();
    engine.close_connection();
    assert!(!engine.is_connected());
    assert_eq!(driver.stats().closes, 0);
}

#[test]
fn close_is_idempotent_after_connect() {
    let driver = MockDriver::new();
    let mut engine = connected(&driver);

    engine.close_connection();
    engine.close_connection();
    assert_eq!(driver.stats().closes, 1);
}

#[test]
fn failed_lookup_leaves_engine_disconnected() {
    let driver = MockDriver::without_service();
    let mut engine = DriverEngine::new(driver.clone());

    assert!(!engine.open_connection());
    assert!(!engine.is_connected());

    assert_eq!(engine.read_byte(0x2000), READ_SENTINEL);
    engine.write_byte(0x2000, 0x42);
    assert_eq!(driver.stats().calls, 0);
    assert_eq!(driver.peek(0x2000), 0);
}

#[test]
fn rejected_open_leaves_engine_disconnected() {
    let driver = MockDriver::new();
    driver.reject_open(-536_870_207);
    let mut engine = DriverEngine::new(driver.clone());

    assert!(!engine.open_connection());
    assert!(!engine.is_connected());
    assert_eq!(driver.stats().releases, 1, "lookup handle must be released on failure");
    assert_eq!(engine.read_byte(0), READ_SENTINEL);
    assert_eq!(driver.stats().calls, 0);
}

#[test]
fn read_returns_low_byte_of_driver_data() {
    let driver = MockDriver::new();
    driver.script_read(0xFF00_D400, 0x1234);
    let mut engine = connected(&driver);

    assert_eq!(engine.read_byte(0xFF00_D400), 0x34);
    let request = driver.last_request().expect("one request issued");
    assert_eq!(request.is_write, 0);
    assert_eq!(request.size, 1);
}

#[test]
fn wide_reads_are_masked_to_width() {
    let driver = MockDriver::new();
    driver.script_read(0x40, 0xAABB_CCDD_1122_3344);
    let mut engine = connected(&driver);

    assert_eq!(engine.try_read(0x40, AccessWidth::Half).ok(), Some(0x3344));
    assert_eq!(engine.try_read(0x40, AccessWidth::Word).ok(), Some(0x1122_3344));
    assert_eq!(engine.try_read(0x40, AccessWidth::Double).ok(), Some(0xAABB_CCDD_1122_3344));
}

#[test]
fn reconnect_after_close_opens_new_session() {
    let driver = MockDriver::new();
    let mut bridge = PhysMemBridge::with_transport(driver.clone());

    assert!(bridge.connect());
    bridge.disconnect();
    assert!(bridge.connect());
    assert_eq!(driver.stats().opens, 2);
    assert_eq!(driver.open_sessions(), 1);
}

proptest! {
    #[test]
    fn write_then_read_round_trips(address in any::<u64>(), value in any::<u8>()) {
        let driver = MockDriver::new();
        let mut engine = connected(&driver);

        engine.write_byte(address, value);
        prop_assert_eq!(engine.read_byte(address), value);
        prop_assert_eq!(driver.stats().calls, 2);
    }

    #[test]
    fn bridge_round_trips_like_engine(address in any::<u64>(), value in any::<u8>()) {
        let mut bridge = PhysMemBridge::with_transport(MockDriver::new());
        prop_assert!(bridge.connect());

        bridge.write_at(address, value);
        prop_assert_eq!(bridge.read_at(address), value);
        prop_assert_eq!(bridge.try_read_at(address).ok(), Some(value));
    }
}
