//! Session management for the single kettle link.
//!
//! A [`DeviceSession`] owns the one physical connection and the last-known
//! [`StateRecord`]. Every operation runs under one lock, so exactly one
//! read or write is in flight at a time and the rolling counter can never
//! be interleaved. The connection is opened lazily on [`acquire`] and
//! closed again after a period of inactivity.
//!
//! Failure policy: any transport error tears the link down and discards
//! the cached state before it is returned. Nothing is retried internally;
//! the next `acquire` reconnects, and re-resolves the address first if the
//! previous connect attempt failed.
//!
//! [`acquire`]: DeviceSession::acquire

use parking_lot::{Mutex as SyncMutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, trace, warn, Instrument, Span};

use crate::ble::connection::{ConnectionEvent, ConnectionState, ConnectionTracker};
use crate::ble::link::{Discovery, NotificationCallback, Transport};
use crate::config::SessionConfig;
use crate::data::ScheduleRequest;
use crate::error::{Error, Result};
use crate::protocol::{codec, RawRecord, ScheduleTransition, Setting, StateRecord};

/// One operation run under the session lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Read the record and replace the cache.
    Refresh,
    /// Write a single field change.
    Apply(Setting),
    /// Move the schedule to a new mode, time and temperature.
    Schedule(ScheduleRequest),
}

impl Command {
    /// Reject invalid arguments before any I/O.
    fn validate(&self) -> Result<()> {
        match self {
            Self::Refresh => Ok(()),
            Self::Apply(setting) => setting.validate(),
            Self::Schedule(request) => request.validate(),
        }
    }
}

/// Connection bookkeeping guarded by the session lock.
struct Link<H> {
    /// Resolved address; cleared when a connect to it fails.
    address: Option<String>,
    /// Open connection, present only while connected.
    handle: Option<H>,
}

struct Shared<T: Transport, D: Discovery> {
    transport: T,
    discovery: D,
    config: SessionConfig,
    link: Arc<Mutex<Link<T::Handle>>>,
    cache: RwLock<Option<StateRecord>>,
    connection: ConnectionTracker,
    state_tx: broadcast::Sender<StateRecord>,
    idle_timer: SyncMutex<Option<JoinHandle<()>>>,
    /// Bumped on every acquire; an idle timer only fires if it is unchanged.
    activity: AtomicU64,
    /// Bumped on every teardown; notifications from older links are dropped.
    epoch: AtomicU64,
    span: Span,
}

impl<T: Transport, D: Discovery> Shared<T, D> {
    /// Resolve, connect, subscribe and read the initial record.
    async fn open(self: &Arc<Self>, link: &mut Link<T::Handle>) -> Result<()> {
        self.connection
            .set(ConnectionState::Connecting, link.address.as_deref());

        let address = match link.address.clone() {
            Some(address) => address,
            None => {
                debug!("Resolving address for {:?}", self.config.device_name);
                match self
                    .discovery
                    .resolve_by_name(&self.config.device_name, self.config.scan_timeout)
                    .await
                {
                    Ok(address) => {
                        link.address = Some(address.clone());
                        address
                    }
                    Err(e) => {
                        self.connection.set(ConnectionState::Disconnected, None);
                        return Err(e);
                    }
                }
            }
        };

        let handle = match self.transport.connect(&address).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Connect to {} failed, forgetting address: {}", address, e);
                link.address = None;
                self.connection
                    .set(ConnectionState::Disconnected, Some(&address));
                return Err(Error::Unavailable {
                    address,
                    reason: e.to_string(),
                });
            }
        };

        link.handle = Some(handle.clone());
        self.connection
            .set(ConnectionState::Connected, Some(&address));
        debug!("Link open to {}", address);

        let epoch = self.epoch.load(Ordering::SeqCst);
        let weak = Arc::downgrade(self);
        let callback: NotificationCallback = Arc::new(move |data: &[u8]| {
            if let Some(shared) = weak.upgrade() {
                shared.on_notification(epoch, data);
            }
        });
        if let Err(e) = self.transport.subscribe(&handle, callback).await {
            warn!("Notifications unavailable, state will only update on reads: {}", e);
        }

        self.refresh(link).await.map(|_| ())
    }

    /// Close the link and forget the cached state. The address is kept.
    async fn teardown(&self, link: &mut Link<T::Handle>) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.cache.write() = None;

        if let Some(handle) = link.handle.take() {
            self.connection
                .set(ConnectionState::Disconnecting, link.address.as_deref());
            if let Err(e) = self.transport.disconnect(&handle).await {
                debug!("Disconnect reported an error: {}", e);
            }
        }

        self.connection
            .set(ConnectionState::Disconnected, link.address.as_deref());
    }

    /// Tear down after a failed I/O step and hand the error back.
    async fn fail(&self, link: &mut Link<T::Handle>, error: Error) -> Error {
        warn!("Session error, closing connection: {}", error);
        self.teardown(link).await;
        error
    }

    fn store(&self, record: StateRecord) {
        *self.cache.write() = Some(record.clone());
        let _ = self.state_tx.send(record);
    }

    fn on_notification(&self, epoch: u64, data: &[u8]) {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            trace!("Dropping notification from a closed connection");
            return;
        }

        match StateRecord::decode(data) {
            Ok(record) => {
                debug!("Notification: {}", record.to_hex());
                self.store(record);
            }
            Err(e) => debug!("Ignoring malformed notification: {}", e),
        }
    }

    /// Read the record and replace the cache, whatever it held.
    async fn refresh(&self, link: &mut Link<T::Handle>) -> Result<StateRecord> {
        let handle = link.handle.clone().ok_or(Error::NotConnected)?;

        let record = match self.transport.read(&handle).await {
            Ok(data) => StateRecord::decode(&data),
            Err(e) => Err(e),
        };

        match record {
            Ok(record) => {
                debug!("State refreshed: {}", record.to_hex());
                self.store(record.clone());
                Ok(record)
            }
            Err(e) => Err(self.fail(link, e).await),
        }
    }

    /// The cached record, reading it first if the cache is empty.
    async fn current(&self, link: &mut Link<T::Handle>) -> Result<StateRecord> {
        let cached = self.cache.read().clone();
        match cached {
            Some(record) => Ok(record),
            None => self.refresh(link).await,
        }
    }

    /// Write a full record; the cache is replaced only once the write is acknowledged.
    async fn write(&self, link: &mut Link<T::Handle>, bytes: RawRecord) -> Result<StateRecord> {
        let handle = link.handle.clone().ok_or(Error::NotConnected)?;
        let record = StateRecord::decode(&bytes)?;

        debug!("Writing {:02X?}", bytes);
        if let Err(e) = self.transport.write(&handle, &bytes).await {
            return Err(self.fail(link, e).await);
        }

        self.store(record.clone());
        Ok(record)
    }

    async fn run_transition(
        &self,
        link: &mut Link<T::Handle>,
        current: StateRecord,
        transition: &ScheduleTransition,
    ) -> Result<StateRecord> {
        let mut record = current;

        for (index, step) in transition.steps().iter().enumerate() {
            if index > 0 {
                debug!(
                    "Waiting {:?} for the kettle to settle",
                    self.config.settle_delay
                );
                tokio::time::sleep(self.config.settle_delay).await;
            }

            let bytes = step.encode(&record)?;
            record = match self.write(link, bytes).await {
                Ok(record) => record,
                Err(e) if index > 0 => {
                    return Err(Error::ScheduleTransitionPartial {
                        failed_step: index + 1,
                        source: Box::new(e),
                    })
                }
                Err(e) => return Err(e),
            };
        }

        Ok(record)
    }

    async fn perform(&self, link: &mut Link<T::Handle>, command: Command) -> Result<StateRecord> {
        command.validate()?;

        if link.handle.is_none() {
            return Err(Error::NotConnected);
        }

        match command {
            Command::Refresh => self.refresh(link).await,
            Command::Apply(setting) => {
                let current = self.current(link).await?;
                let bytes = codec::with_field(&current, setting)?;
                let record = self.write(link, bytes).await?;
                info!("Set {} ({:?})", setting.field_name(), setting);
                Ok(record)
            }
            Command::Schedule(request) => {
                let current = self.current(link).await?;
                let transition = ScheduleTransition::plan(current.schedule_mode(), &request);
                if transition.is_mode_change() {
                    debug!(
                        "Schedule {} -> {} needs a disable write first",
                        transition.from_mode().name(),
                        request.mode.name()
                    );
                }
                let record = self.run_transition(link, current, &transition).await?;
                info!(
                    "Schedule set to {} at {:02}:{:02}, {}°C",
                    request.mode.name(),
                    request.hour,
                    request.minute,
                    request.temperature
                );
                Ok(record)
            }
        }
    }

    fn cancel_idle_timer(&self) {
        if let Some(timer) = self.idle_timer.lock().take() {
            timer.abort();
        }
    }

    /// Start the idle countdown, replacing any pending one.
    fn arm_idle_timer(self: &Arc<Self>) {
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }

        let armed_at = self.activity.load(Ordering::SeqCst);
        let timeout = self.config.idle_timeout;
        let weak = Arc::downgrade(self);

        let timer = tokio::spawn(
            async move {
                tokio::time::sleep(timeout).await;

                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let mut link = shared.link.lock().await;

                if shared.activity.load(Ordering::SeqCst) != armed_at {
                    trace!("Idle timer superseded");
                    return;
                }

                if link.handle.is_some() {
                    info!("Idle for {:?}, closing connection", timeout);
                    shared.teardown(&mut link).await;
                }
            }
            .instrument(self.span.clone()),
        );

        if let Some(previous) = self.idle_timer.lock().replace(timer) {
            previous.abort();
        }
    }
}

impl<T: Transport, D: Discovery> Drop for Shared<T, D> {
    fn drop(&mut self) {
        if let Some(timer) = self.idle_timer.get_mut().take() {
            timer.abort();
        }
    }
}

/// Exclusive access to the kettle link.
///
/// Returned by [`DeviceSession::acquire`]. Dropping the guard (or calling
/// [`release`](Self::release)) releases the lock and re-arms the idle timer.
pub struct SessionGuard<T: Transport, D: Discovery> {
    shared: Arc<Shared<T, D>>,
    link: Option<OwnedMutexGuard<Link<T::Handle>>>,
}

impl<T: Transport, D: Discovery> SessionGuard<T, D> {
    /// Run one command.
    ///
    /// Once started, the command runs to completion even if the returned
    /// future is dropped.
    pub async fn execute(&mut self, command: Command) -> Result<StateRecord> {
        let mut link = self
            .link
            .take()
            .ok_or_else(|| Error::Internal("session guard already released".to_string()))?;

        let shared = Arc::clone(&self.shared);
        let span = shared.span.clone();
        let task = tokio::spawn(
            async move {
                let result = shared.perform(&mut link, command).await;
                (link, result)
            }
            .instrument(span),
        );

        match task.await {
            Ok((link, result)) => {
                self.link = Some(link);
                result
            }
            Err(e) => Err(Error::Internal(format!("session operation failed: {}", e))),
        }
    }

    /// Read the record and replace the cache.
    pub async fn refresh(&mut self) -> Result<StateRecord> {
        self.execute(Command::Refresh).await
    }

    /// The cached record, if the session holds one.
    pub fn state(&self) -> Option<StateRecord> {
        self.shared.cache.read().clone()
    }

    /// The address of the connected kettle.
    pub fn address(&self) -> Option<&str> {
        self.link.as_ref().and_then(|link| link.address.as_deref())
    }

    /// Whether the link is still open.
    pub fn is_connected(&self) -> bool {
        self.link
            .as_ref()
            .map(|link| link.handle.is_some())
            .unwrap_or(false)
    }

    /// Release the lock and re-arm the idle timer.
    pub fn release(self) {}
}

impl<T: Transport, D: Discovery> Drop for SessionGuard<T, D> {
    fn drop(&mut self) {
        // Arm before unlocking so the next acquire always supersedes it.
        self.shared.arm_idle_timer();
        self.link.take();
    }
}

/// Owner of the single connection to one kettle.
pub struct DeviceSession<T: Transport, D: Discovery> {
    shared: Arc<Shared<T, D>>,
}

impl<T: Transport, D: Discovery> Clone for DeviceSession<T, D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport, D: Discovery> DeviceSession<T, D> {
    /// Create a session. No connection is made until the first acquire.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(transport: T, discovery: D, config: SessionConfig) -> Result<Self> {
        let span = info_span!("kettle", name = %config.device_name);
        Self::with_span(transport, discovery, config, span)
    }

    /// Create a session whose logging is attached to `span`.
    pub fn with_span(transport: T, discovery: D, config: SessionConfig, span: Span) -> Result<Self> {
        config.validate()?;

        let (state_tx, _) = broadcast::channel(32);

        Ok(Self {
            shared: Arc::new(Shared {
                transport,
                discovery,
                link: Arc::new(Mutex::new(Link {
                    address: config.address.clone(),
                    handle: None,
                })),
                config,
                cache: RwLock::new(None),
                connection: ConnectionTracker::new(),
                state_tx,
                idle_timer: SyncMutex::new(None),
                activity: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                span,
            }),
        })
    }

    /// Wait for exclusive access, connecting first if needed.
    ///
    /// Abandoning the wait has no side effects.
    ///
    /// # Errors
    ///
    /// `DeviceNotFound` if the address had to be resolved and was not,
    /// `Unavailable` if the connect failed (the address is then forgotten),
    /// or the transport error of the initial read.
    pub async fn acquire(&self) -> Result<SessionGuard<T, D>> {
        let shared = &self.shared;
        let mut link = Arc::clone(&shared.link).lock_owned().await;

        shared.activity.fetch_add(1, Ordering::SeqCst);
        shared.cancel_idle_timer();

        if link.handle.is_none() {
            shared.open(&mut link).instrument(shared.span.clone()).await?;
        }

        Ok(SessionGuard {
            shared: Arc::clone(shared),
            link: Some(link),
        })
    }

    /// Acquire, run one command, release.
    pub async fn run(&self, command: Command) -> Result<StateRecord> {
        let mut guard = self.acquire().await?;
        guard.execute(command).await
    }

    /// Read the record and replace the cache.
    pub async fn refresh(&self) -> Result<StateRecord> {
        self.run(Command::Refresh).await
    }

    /// Close the connection now and stop the idle timer.
    pub async fn close(&self) {
        let mut link = self.shared.link.lock().await;
        self.shared.activity.fetch_add(1, Ordering::SeqCst);
        self.shared.cancel_idle_timer();
        self.shared
            .teardown(&mut link)
            .instrument(self.shared.span.clone())
            .await;
    }

    /// The last-known record, or `None` if it must be refreshed.
    pub fn cached_state(&self) -> Option<StateRecord> {
        self.shared.cache.read().clone()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.connection.state()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// Subscribe to every new record (writes, reads and notifications).
    pub fn subscribe_state(&self) -> broadcast::Receiver<StateRecord> {
        self.shared.state_tx.subscribe()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe_connection_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.connection.subscribe()
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }
}
