//! Auto-refreshing page monitor
//!
//! [`PageMonitor`] spawns a task that owns a [`PhysMemBridge`] and re-reads
//! one page on every tick of a refresh interval. Snapshots are published on a
//! watch channel; edits travel the other way on an mpsc channel and are
//! applied between refreshes, followed by an immediate re-read.
//!
//! Driver calls block, so every bridge operation runs on the blocking pool
//! via `spawn_blocking` and the bridge is moved back into the task afterwards.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt, future};
use tokio::sync::{mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::bridge::PhysMemBridge;
use crate::config::{BridgeConfig, clamp_refresh_interval};
use crate::page::MemoryPage;
use crate::transport::Transport;
use crate::{BridgeError, Result};

/// One captured page plus capture metadata
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    /// Captured memory
    pub page: MemoryPage,
    /// Monotonic capture counter, starting at 1
    pub sequence: u64,
    /// When the capture finished
    pub captured_at: Instant,
}

/// Window and pacing of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub base: u64,
    pub len: usize,
    pub interval: Duration,
}

impl From<&BridgeConfig> for MonitorSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self { base: config.base_address, len: config.page_size, interval: config.refresh_interval() }
    }
}

#[derive(Debug)]
enum Command {
    Write { offset: usize, value: u8 },
    SetInterval(Duration),
    Refresh,
}

/// Handle to a running monitor task
pub struct PageMonitor {
    snapshots: watch::Receiver<Option<Arc<PageSnapshot>>>,
    commands: mpsc::Sender<Command>,
    settings: MonitorSettings,
    cancel: CancellationToken,
}

impl PageMonitor {
    /// Spawn the monitor task on the current tokio runtime
    pub fn spawn<T>(bridge: PhysMemBridge<T>, settings: MonitorSettings) -> Self
    where
        T: Transport + Send + 'static,
        T::Session: Send + 'static,
    {
        let settings =
            MonitorSettings { interval: clamp_refresh_interval(settings.interval), ..settings };
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (command_tx, command_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let cancel_task = cancel.clone();
        tokio::spawn(async move {
            Self::refresh_task(bridge, settings, snapshot_tx, command_rx, cancel_task).await;
        });

        info!(base = settings.base, len = settings.len, "Page monitor started");
        Self { snapshots: snapshot_rx, commands: command_tx, settings, cancel }
    }

    /// Stream of snapshots; yields the current one first if any
    pub fn subscribe(&self) -> impl Stream<Item = Arc<PageSnapshot>> + Unpin + 'static {
        WatchStream::new(self.snapshots.clone()).filter_map(future::ready)
    }

    /// Latest snapshot, if a capture has completed
    pub fn current(&self) -> Option<Arc<PageSnapshot>> {
        self.snapshots.borrow().clone()
    }

    pub fn settings(&self) -> MonitorSettings {
        self.settings
    }

    /// Queue a one-byte edit at `offset` within the page
    pub async fn write(&self, offset: usize, value: u8) -> Result<()> {
        if offset >= self.settings.len {
            return Err(BridgeError::InvalidRequest {
                details: format!("offset {offset} outside page of {} bytes", self.settings.len),
            });
        }
        self.send(Command::Write { offset, value }).await
    }

    /// Change the refresh period (clamped to 100 ms..=5 s)
    pub async fn set_interval(&self, interval: Duration) -> Result<()> {
        self.send(Command::SetInterval(clamp_refresh_interval(interval))).await
    }

    /// Capture immediately instead of waiting for the next tick
    pub async fn refresh(&self) -> Result<()> {
        self.send(Command::Refresh).await
    }

    /// Stop the task
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| BridgeError::Monitor { context: "monitor task has stopped".to_string() })
    }

    async fn refresh_task<T>(
        bridge: PhysMemBridge<T>,
        settings: MonitorSettings,
        snapshot_tx: watch::Sender<Option<Arc<PageSnapshot>>>,
        mut commands: mpsc::Receiver<Command>,
        cancel: CancellationToken,
    ) where
        T: Transport + Send + 'static,
        T::Session: Send + 'static,
    {
        let mut slot = Some(bridge);
        let mut ticker = Self::ticker(settings.interval);
        let mut sequence = 0u64;

        loop {
            let capture_now = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Page monitor cancelled");
                    break;
                }
                _ = ticker.tick() => true,
                command = commands.recv() => match command {
                    Some(Command::Write { offset, value }) => {
                        let address = settings.base.wrapping_add(offset as u64);
                        let written = with_bridge(&mut slot, move |bridge| {
                            if bridge.connect() {
                                bridge.try_write_at(address, value)
                            } else {
                                Err(BridgeError::NotConnected)
                            }
                        })
                        .await;
                        match written {
                            Some(Ok(())) => debug!(addr = address, value, "Edit applied"),
                            Some(Err(e)) => warn!(addr = address, "Edit failed: {}", e),
                            None => break,
                        }
                        true
                    }
                    Some(Command::SetInterval(period)) => {
                        debug!(?period, "Refresh interval changed");
                        ticker = Self::ticker(period);
                        false
                    }
                    Some(Command::Refresh) => true,
                    None => {
                        debug!("Monitor handle dropped");
                        break;
                    }
                },
            };

            if !capture_now {
                continue;
            }

            let (base, len) = (settings.base, settings.len);
            let captured = with_bridge(&mut slot, move |bridge| {
                // Reconnect attempts are cheap when already connected
                if !bridge.connect() {
                    return Err(BridgeError::NotConnected);
                }
                MemoryPage::capture(bridge, base, len)
            })
            .await;

            match captured {
                Some(Ok(page)) => {
                    sequence += 1;
                    trace!(sequence, unreadable = page.unreadable_count(), "Page captured");
                    let snapshot = PageSnapshot { page, sequence, captured_at: Instant::now() };
                    if snapshot_tx.send(Some(Arc::new(snapshot))).is_err() {
                        debug!("Snapshot receivers dropped, shutting down");
                        break;
                    }
                }
                Some(Err(BridgeError::NotConnected)) => trace!("Driver not connected, skipping"),
                Some(Err(e)) => warn!("Page capture failed: {}", e),
                None => break,
            }
        }

        info!("Page monitor stopped after {} captures", sequence);
    }

    fn ticker(period: Duration) -> Interval {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

impl Drop for PageMonitor {
    fn drop(&mut self) {
        debug!("Dropping page monitor");
        self.cancel.cancel();
    }
}

/// Run `f` against the bridge on the blocking pool, then put the bridge back
async fn with_bridge<T, R, F>(slot: &mut Option<PhysMemBridge<T>>, f: F) -> Option<R>
where
    T: Transport + Send + 'static,
    T::Session: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut PhysMemBridge<T>) -> R + Send + 'static,
{
    let mut bridge = slot.take()?;
    match tokio::task::spawn_blocking(move || {
        let result = f(&mut bridge);
        (bridge, result)
    })
    .await
    {
        Ok((bridge, result)) => {
            *slot = Some(bridge);
            Some(result)
        }
        Err(e) => {
            error!("Bridge task panicked: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;

    fn settings(len: usize) -> MonitorSettings {
        MonitorSettings { base: 0x3000, len, interval: Duration::from_millis(100) }
    }

    #[test]
    fn settings_follow_config() {
        let config = BridgeConfig { refresh_interval_ms: 10, ..Default::default() };
        let settings = MonitorSettings::from(&config);
        assert_eq!(settings.base, 0xFF00_D400);
        assert_eq!(settings.len, 256);
        assert_eq!(settings.interval, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn rejects_out_of_page_edits() {
        let monitor = PageMonitor::spawn(PhysMemBridge::with_transport(MockDriver::new()), settings(4));
        assert!(matches!(monitor.write(4, 0).await, Err(BridgeError::InvalidRequest { .. })));
    }

    #[tokio::test]
    async fn stopped_monitor_rejects_commands() {
        let monitor = PageMonitor::spawn(PhysMemBridge::with_transport(MockDriver::new()), settings(4));
        monitor.stop();

        let result = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if monitor.refresh().await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(result.is_ok(), "monitor kept accepting commands after stop");
    }

    #[tokio::test]
    async fn subscribe_yields_captured_pages() {
        let driver = MockDriver::new();
        driver.seed(0x3000, &[0xDE, 0xAD]);
        let mut bridge = PhysMemBridge::with_transport(driver);
        assert!(bridge.connect());

        let monitor = PageMonitor::spawn(bridge, settings(2));
        let mut snapshots = monitor.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), snapshots.next())
            .await
            .expect("no snapshot published")
            .expect("stream ended");
        assert_eq!(snapshot.page.byte_at(0), Some(0xDE));
        assert_eq!(snapshot.page.byte_at(1), Some(0xAD));
    }

    #[test]
    fn interval_is_clamped_at_spawn() {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let monitor = PageMonitor::spawn(
                PhysMemBridge::with_transport(MockDriver::new()),
                MonitorSettings { base: 0, len: 1, interval: Duration::from_millis(1) },
            );
            assert_eq!(monitor.settings().interval, Duration::from_millis(100));
        });
    }
}
