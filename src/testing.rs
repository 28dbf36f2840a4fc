//! In-memory transport for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::ble::link::{NotificationCallback, Transport};
use crate::error::{Error, Result, TransportOp};
use crate::protocol::RawRecord;

#[derive(Default)]
struct FakeState {
    device: Mutex<RawRecord>,
    writes: Mutex<Vec<(Instant, RawRecord)>>,
    connects: Mutex<Vec<String>>,
    write_attempts: AtomicUsize,
    failing_writes: Mutex<Vec<usize>>,
    failing_connects: AtomicUsize,
    fail_next_read: AtomicBool,
    reads: AtomicUsize,
    disconnects: AtomicUsize,
    next_handle: AtomicU64,
    callback: Mutex<Option<NotificationCallback>>,
    write_delay: Mutex<Duration>,
    in_flight: AtomicBool,
    overlap: AtomicBool,
}

/// A kettle that lives in memory.
///
/// Clones share state, so a test keeps one clone to inspect what the
/// session did with the other.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    state: Arc<FakeState>,
}

impl FakeTransport {
    pub(crate) fn new(device: RawRecord) -> Self {
        let transport = Self::default();
        *transport.state.device.lock() = device;
        transport
    }

    /// Current bytes held by the fake kettle.
    pub(crate) fn device(&self) -> RawRecord {
        *self.state.device.lock()
    }

    /// Change the kettle's bytes behind the session's back.
    pub(crate) fn set_device(&self, device: RawRecord) {
        *self.state.device.lock() = device;
    }

    /// Successful writes, in order.
    pub(crate) fn writes(&self) -> Vec<RawRecord> {
        self.state.writes.lock().iter().map(|(_, w)| *w).collect()
    }

    /// Successful writes with the (tokio) time they landed.
    pub(crate) fn timed_writes(&self) -> Vec<(Instant, RawRecord)> {
        self.state.writes.lock().clone()
    }

    pub(crate) fn connects(&self) -> Vec<String> {
        self.state.connects.lock().clone()
    }

    pub(crate) fn reads(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    /// Fail the nth write attempt (1-based, counted over the fake's lifetime).
    pub(crate) fn fail_write(&self, attempt: usize) {
        self.state.failing_writes.lock().push(attempt);
    }

    /// Fail the next `count` connects.
    pub(crate) fn fail_connects(&self, count: usize) {
        self.state.failing_connects.store(count, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_read(&self) {
        self.state.fail_next_read.store(true, Ordering::SeqCst);
    }

    /// Make each write take `delay` of (tokio) time.
    pub(crate) fn set_write_delay(&self, delay: Duration) {
        *self.state.write_delay.lock() = delay;
    }

    /// Whether two I/O operations were ever in flight at once.
    pub(crate) fn overlap_detected(&self) -> bool {
        self.state.overlap.load(Ordering::SeqCst)
    }

    /// Deliver a notification to the current subscriber.
    pub(crate) fn notify(&self, data: &[u8]) {
        let callback = self.state.callback.lock().clone();
        if let Some(callback) = callback {
            callback(data);
        }
    }

    /// Take the current subscriber's callback.
    pub(crate) fn take_callback(&self) -> Option<NotificationCallback> {
        self.state.callback.lock().clone()
    }

    fn enter(&self) {
        if self.state.in_flight.swap(true, Ordering::SeqCst) {
            self.state.overlap.store(true, Ordering::SeqCst);
        }
    }

    fn exit(&self) {
        self.state.in_flight.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    type Handle = u64;

    async fn connect(&self, address: &str) -> Result<u64> {
        self.state.connects.lock().push(address.to_string());

        let failing = self.state.failing_connects.load(Ordering::SeqCst);
        if failing > 0 {
            self.state
                .failing_connects
                .store(failing - 1, Ordering::SeqCst);
            return Err(Error::transport(TransportOp::Connect, "peripheral unreachable"));
        }

        Ok(self.state.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    async fn disconnect(&self, _handle: &u64) -> Result<()> {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        *self.state.callback.lock() = None;
        Ok(())
    }

    async fn read(&self, _handle: &u64) -> Result<Vec<u8>> {
        self.enter();
        self.state.reads.fetch_add(1, Ordering::SeqCst);
        let result = if self.state.fail_next_read.swap(false, Ordering::SeqCst) {
            Err(Error::transport(TransportOp::Read, "read timed out"))
        } else {
            Ok(self.device().to_vec())
        };
        self.exit();
        result
    }

    async fn write(&self, _handle: &u64, data: &[u8]) -> Result<()> {
        self.enter();

        let delay = *self.state.write_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let attempt = self.state.write_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let result = if self.state.failing_writes.lock().contains(&attempt) {
            Err(Error::transport(TransportOp::Write, "write not acknowledged"))
        } else {
            let mut record = RawRecord::default();
            record.copy_from_slice(data);
            *self.state.device.lock() = record;
            self.state.writes.lock().push((Instant::now(), record));
            Ok(())
        };

        self.exit();
        result
    }

    async fn subscribe(&self, _handle: &u64, callback: NotificationCallback) -> Result<()> {
        *self.state.callback.lock() = Some(callback);
        Ok(())
    }
}
