//! Kettle struct and methods.
//!
//! The operation surface consumers build on: every call acquires the
//! session, runs one command and returns the resulting state snapshot.

use chrono::Timelike;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::ble::connection::{ConnectionEvent, ConnectionState};
use crate::ble::link::{Discovery, Transport};
use crate::ble::scanner::{default_adapter, BleScanner};
use crate::ble::transport::BtleTransport;
use crate::config::SessionConfig;
use crate::data::{ClockMode, Language, Schedule, ScheduleMode, ScheduleRequest, StateSummary, Units};
use crate::error::{Error, Result};
use crate::protocol::{Setting, StateRecord};
use crate::session::{Command, DeviceSession};
use crate::utils::to_celsius;

/// Callback handle for unregistering callbacks.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

/// A Fellow Stagg EKG kettle.
///
/// Cheap to share behind an `Arc`; all calls are serialized by the
/// underlying [`DeviceSession`].
pub struct Kettle<T: Transport = BtleTransport, D: Discovery = BleScanner> {
    session: DeviceSession<T, D>,
    callback_counter: Arc<AtomicU64>,
}

impl Kettle {
    /// Create a kettle on the first Bluetooth adapter.
    ///
    /// No connection is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available or the configuration
    /// is invalid.
    pub async fn new(config: SessionConfig) -> Result<Self> {
        let adapter = default_adapter().await?;
        let transport = BtleTransport::new(adapter.clone(), &config);
        let scanner = BleScanner::with_adapter(adapter);
        Self::with_parts(transport, scanner, config)
    }
}

impl<T: Transport, D: Discovery> Kettle<T, D> {
    /// Create a kettle over the given transport and discovery.
    pub fn with_parts(transport: T, discovery: D, config: SessionConfig) -> Result<Self> {
        Ok(Self::from_session(DeviceSession::new(
            transport, discovery, config,
        )?))
    }

    /// Wrap an existing session.
    pub fn from_session(session: DeviceSession<T, D>) -> Self {
        Self {
            session,
            callback_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &DeviceSession<T, D> {
        &self.session
    }

    // === State ===

    /// Read the current state from the kettle.
    pub async fn get_state(&self) -> Result<StateRecord> {
        self.session.refresh().await
    }

    /// The flat view of every setting, read fresh from the kettle.
    pub async fn summary(&self) -> Result<StateSummary> {
        Ok(self.get_state().await?.summary())
    }

    /// The cached state, without touching the kettle.
    pub fn cached_state(&self) -> Option<StateRecord> {
        self.session.cached_state()
    }

    /// The current schedule, read fresh from the kettle.
    pub async fn schedule(&self) -> Result<Schedule> {
        Ok(self.get_state().await?.schedule())
    }

    /// Subscribe to state updates.
    pub fn subscribe_state(&self) -> broadcast::Receiver<StateRecord> {
        self.session.subscribe_state()
    }

    /// Register a callback for state updates.
    pub fn on_state_changed<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&StateRecord) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.session.subscribe_state();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(record) => callback(&record),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("State callback lagged, skipped {} updates", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    // === Connection ===

    /// Get connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.session.connection_state()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe_connection_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.session.subscribe_connection_events()
    }

    /// Close the connection now instead of waiting for the idle timeout.
    pub async fn disconnect(&self) {
        self.session.close().await;
    }

    // === Settings ===

    async fn apply(&self, setting: Setting) -> Result<StateRecord> {
        self.session.run(Command::Apply(setting)).await
    }

    /// Set the target temperature in Celsius.
    ///
    /// Values outside 0-100 °C are clamped; the kettle stores half degrees.
    pub async fn set_target_temperature(&self, celsius: f64) -> Result<StateRecord> {
        self.apply(Setting::TargetTemperature(celsius)).await
    }

    /// Set the target temperature in the given units.
    pub async fn set_target_temperature_in(&self, value: f64, units: Units) -> Result<StateRecord> {
        self.set_target_temperature(to_celsius(value, units)).await
    }

    /// Set the hold time in minutes (0 disables hold), clamped to 60.
    pub async fn set_hold_time(&self, minutes: u8) -> Result<StateRecord> {
        self.apply(Setting::HoldTime(minutes)).await
    }

    /// Set the chime volume, 0 (off) to 10.
    pub async fn set_chime_volume(&self, level: u8) -> Result<StateRecord> {
        self.apply(Setting::ChimeVolume(level)).await
    }

    /// Enable or disable pre-boil.
    pub async fn set_pre_boil(&self, enabled: bool) -> Result<StateRecord> {
        self.apply(Setting::PreBoil(enabled)).await
    }

    /// Set the altitude in meters, clamped to 3000 and rounded to 30 m
    /// (exact halves go to the even step).
    pub async fn set_altitude(&self, meters: u32) -> Result<StateRecord> {
        self.apply(Setting::Altitude(meters)).await
    }

    /// Set the kettle clock, optionally changing the clock mode as well.
    pub async fn set_clock(
        &self,
        hour: u8,
        minute: u8,
        mode: Option<ClockMode>,
    ) -> Result<StateRecord> {
        self.apply(Setting::Clock { hour, minute, mode }).await
    }

    /// Set the kettle clock to the host's local time, keeping the clock mode.
    pub async fn sync_clock(&self) -> Result<StateRecord> {
        let now = chrono::Local::now();
        // chrono guarantees hour < 24 and minute < 60.
        let (hour, minute) = (now.hour() as u8, now.minute() as u8);
        info!("Syncing kettle clock to {:02}:{:02}", hour, minute);
        self.set_clock(hour, minute, None).await
    }

    /// Set the clock display mode.
    pub async fn set_clock_mode(&self, mode: ClockMode) -> Result<StateRecord> {
        self.apply(Setting::ClockMode(mode)).await
    }

    /// Set the display units.
    pub async fn set_units(&self, units: Units) -> Result<StateRecord> {
        self.apply(Setting::Units(units)).await
    }

    /// Set the display language.
    pub async fn set_language(&self, language: Language) -> Result<StateRecord> {
        self.apply(Setting::Language(language)).await
    }

    /// Set the display language from a code such as `"en"` or `"zh-tw"`.
    pub async fn set_language_code(&self, code: &str) -> Result<StateRecord> {
        let language =
            Language::from_code(code).ok_or_else(|| Error::invalid_argument("language", code))?;
        self.set_language(language).await
    }

    // === Schedule ===

    /// Set the schedule.
    ///
    /// Switching between `Once` and `Daily` takes two writes; if the second
    /// fails the kettle is left with its schedule off and
    /// [`Error::ScheduleTransitionPartial`] is returned.
    pub async fn set_schedule(
        &self,
        mode: ScheduleMode,
        hour: u8,
        minute: u8,
        temperature: f64,
    ) -> Result<StateRecord> {
        self.set_schedule_request(ScheduleRequest::new(mode, hour, minute, temperature))
            .await
    }

    /// Set the schedule from a prepared request.
    pub async fn set_schedule_request(&self, request: ScheduleRequest) -> Result<StateRecord> {
        self.session.run(Command::Schedule(request)).await
    }

    /// Turn the schedule off.
    pub async fn disable_schedule(&self) -> Result<StateRecord> {
        self.set_schedule_request(ScheduleRequest::off()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::link::MockDiscovery;
    use crate::protocol::payload::*;
    use crate::protocol::record::tests::SAMPLE;
    use crate::testing::FakeTransport;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn kettle(transport: &FakeTransport) -> Kettle<FakeTransport, MockDiscovery> {
        Kettle::with_parts(
            transport.clone(),
            MockDiscovery::new(),
            SessionConfig::new().with_address("C4:12:34:56:78:9A"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_state() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        let state = kettle.get_state().await.unwrap();
        assert_eq!(state.as_bytes(), &SAMPLE);
        assert_eq!(kettle.cached_state(), Some(state));
        assert!(kettle.is_connected());
    }

    #[tokio::test]
    async fn test_set_target_temperature() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        let state = kettle.set_target_temperature(55.5).await.unwrap();
        assert_eq!(state.target_temperature(), 55.5);
        assert_eq!(transport.device()[TARGET_TEMP], 111);

        let state = kettle.set_target_temperature(120.0).await.unwrap();
        assert_eq!(state.target_temperature(), 100.0);
    }

    #[tokio::test]
    async fn test_set_target_temperature_in_fahrenheit() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        let state = kettle
            .set_target_temperature_in(203.0, Units::Fahrenheit)
            .await
            .unwrap();
        assert_eq!(state.target_temperature(), 95.0);
        assert!((state.target_temperature_in(Units::Fahrenheit) - 203.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_set_altitude_rounds() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        assert_eq!(kettle.set_altitude(1234).await.unwrap().altitude(), 1230);
        assert_eq!(kettle.set_altitude(9000).await.unwrap().altitude(), 3000);
        assert_eq!(transport.device()[ALTITUDE_HIGH] & ALTITUDE_MARKER, ALTITUDE_MARKER);
    }

    #[tokio::test]
    async fn test_set_hold_chime_and_pre_boil() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        assert_eq!(kettle.set_hold_time(45).await.unwrap().hold_time(), 45);
        assert_eq!(kettle.set_chime_volume(0).await.unwrap().chime_volume(), 0);
        assert!(kettle.set_pre_boil(true).await.unwrap().pre_boil());
        assert!(!kettle.set_pre_boil(false).await.unwrap().pre_boil());
        assert_eq!(transport.writes().len(), 4);
    }

    #[tokio::test]
    async fn test_out_of_range_values() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        assert_eq!(kettle.set_chime_volume(11).await.unwrap().chime_volume(), 10);
        assert_eq!(kettle.set_hold_time(200).await.unwrap().hold_time(), 60);

        let err = kettle.set_clock(7, 60, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        let err = kettle.set_target_temperature(f64::NAN).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(transport.writes().len(), 2);
    }

    #[tokio::test]
    async fn test_set_clock_keeps_mode_unless_given() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        let state = kettle.set_clock(6, 45, None).await.unwrap();
        assert_eq!(state.clock().to_string(), "06:45");
        assert_eq!(state.clock_mode(), ClockMode::Digital);

        let state = kettle
            .set_clock(18, 5, Some(ClockMode::Analog))
            .await
            .unwrap();
        assert_eq!(state.clock_mode(), ClockMode::Analog);
        assert_eq!(state.clock().hour, 18);
    }

    #[tokio::test]
    async fn test_sync_clock() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        let before = chrono::Local::now();
        let state = kettle.sync_clock().await.unwrap();
        let after = chrono::Local::now();

        let clock = state.clock();
        let matches = |t: chrono::DateTime<chrono::Local>| {
            t.hour() as u8 == clock.hour && t.minute() as u8 == clock.minute
        };
        assert!(matches(before) || matches(after));
        assert_eq!(state.clock_mode(), ClockMode::Digital);
    }

    #[tokio::test]
    async fn test_language_and_units() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        let state = kettle.set_language(Language::French).await.unwrap();
        assert_eq!(state.language(), Language::French);

        let state = kettle.set_language_code("es").await.unwrap();
        assert_eq!(state.language(), Language::Spanish);

        assert!(matches!(
            kettle.set_language_code("klingon").await,
            Err(Error::InvalidArgument { .. })
        ));

        let state = kettle.set_units(Units::Fahrenheit).await.unwrap();
        assert_eq!(state.units(), Units::Fahrenheit);
        assert_eq!(state.target_temperature(), 95.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_schedule_and_disable() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        let state = kettle
            .set_schedule(ScheduleMode::Once, 7, 30, 90.0)
            .await
            .unwrap();
        let schedule = state.schedule();
        assert_eq!(schedule.mode, ScheduleMode::Once);
        assert_eq!(schedule.temperature, 90.0);
        assert_eq!(schedule.time.to_string(), "07:30");
        assert_eq!(transport.writes().len(), 2);

        let state = kettle.disable_schedule().await.unwrap();
        assert_eq!(state.schedule_mode(), ScheduleMode::Off);
        assert_eq!(transport.device()[SCHEDULE_TEMP], SCHEDULE_TEMP_DISABLED);
        assert_eq!(transport.writes().len(), 3);
    }

    #[tokio::test]
    async fn test_summary() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        let summary = kettle.summary().await.unwrap();
        assert_eq!(summary.target_temperature, 95.5);
        assert_eq!(summary.clock_time, "08:15");
        assert_eq!(summary.counter, 0x20);
    }

    #[tokio::test]
    async fn test_on_state_changed() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = kettle.on_state_changed(move |state| {
            let _ = tx.send(state.chime_volume());
        });

        kettle.set_chime_volume(3).await.unwrap();
        let volume = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if let Some(volume) = rx.recv().await {
                    if volume == 3 {
                        return volume;
                    }
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(volume, 3);

        handle.unregister();
    }

    #[tokio::test]
    async fn test_disconnect() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = kettle(&transport);

        kettle.get_state().await.unwrap();
        kettle.disconnect().await;

        assert_eq!(kettle.connection_state(), ConnectionState::Disconnected);
        assert!(kettle.cached_state().is_none());
        assert_eq!(transport.disconnects(), 1);
    }
}
