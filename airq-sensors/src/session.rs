//! Measurement lifecycle of one sensor.
//!
//! A [`MeasurementSession`] owns the transport to a single device and drives it
//! through the command table of its [`DeviceProfile`]: identity reads on open,
//! start and stop, reading samples, fan cleaning, status and the deferred
//! restart between samples.
//!
//! ```text
//!            start()                 stop()
//!   Idle ───────────────▶ Measuring ───────▶ Idle
//!    │                        │
//!    └──────── close() ───────┴────────────▶ Closed
//! ```
//!
//! Fan cleaning runs alongside the measurement state. While the cycle is running
//! the values read from the device are not valid, so [`read_sample`] either
//! refuses or waits, depending on the session's [`CleaningGuard`].
//!
//! [`read_sample`]: MeasurementSession::read_sample
use std::time::{Duration, Instant, SystemTime};

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::error::Error;
use crate::frame::{Command, Frame, Response};
use crate::identity::{self, DeviceIdentity};
use crate::profile::{Acquisition, Commands, DeviceProfile, Query, SEN54, sen5x_for_product};
use crate::restart::RestartSchedule;
use crate::sample::MeasurementSample;
use crate::sen5x::{AlgorithmTuning, RhtAcceleration, TemperatureCompensation};
use crate::sht4x::{HeaterSetting, Precision};
use crate::status::StatusRegister;
use crate::transport::Transport;

/// What [`MeasurementSession::read_sample`] does while fan cleaning is running.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CleaningGuard {
    /// Fail with [`Error::DeviceBusy`].
    #[default]
    Reject,
    /// Wait for the rest of the cleaning cycle, then read.
    Defer,
}

/// Whether fan cleaning may be started while measuring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CleaningInterlock {
    /// Cleaning may be started at any time.
    #[default]
    Allow,
    /// Cleaning during a measurement fails with [`Error::MeasuringInterlock`].
    RejectWhileMeasuring,
}

/// Behaviour switches of a session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Reads during fan cleaning.
    pub cleaning_guard: CleaningGuard,
    /// Cleaning during measurement.
    pub cleaning_interlock: CleaningInterlock,
}

/// Measurement state of the device as tracked by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementState {
    /// Not measuring.
    Idle,
    /// Measuring continuously (or ready for single-shot measurements).
    Measuring,
    /// The session is closed and its transport released.
    Closed,
}

/// Progress of the fan-cleaning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleaningState {
    /// No cleaning has happened since the session was opened.
    Idle,
    /// The cleaning cycle is running.
    Cleaning,
    /// The last cleaning cycle has completed.
    JustFinished,
}

/// An open connection to one sensor.
///
/// `T` is the transport to the device and `D` the delay used for the processing
/// times required between commands.
///
/// Dropping the session closes it, ignoring any error. Call [`close`] to see
/// errors.
///
/// [`close`]: MeasurementSession::close
pub struct MeasurementSession<T: Transport, D: DelayNs> {
    profile: &'static DeviceProfile,
    transport: T,
    delay: D,
    config: SessionConfig,
    state: MeasurementState,
    cleaning: CleaningState,
    cleaning_started: Option<Instant>,
    last_cleaned: Option<SystemTime>,
    restart: RestartSchedule,
    identity: DeviceIdentity,
}

impl<T: Transport, D: DelayNs> std::fmt::Debug for MeasurementSession<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementSession")
            .field("model", &self.profile.model)
            .field("state", &self.state)
            .field("cleaning", &self.cleaning)
            .field("restart", &self.restart)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, D: DelayNs> MeasurementSession<T, D> {
    /// Open a session and read the device's identity.
    ///
    /// The product name, serial number and firmware version are read for the
    /// models that support them. The session is only returned if these reads
    /// succeed; otherwise it is closed and the error returned.
    pub fn open(
        profile: &'static DeviceProfile,
        transport: T,
        delay: D,
        config: SessionConfig,
    ) -> Result<Self, Error<T::Error>> {
        let mut session = Self {
            profile,
            transport,
            delay,
            config,
            state: MeasurementState::Idle,
            cleaning: CleaningState::Idle,
            cleaning_started: None,
            last_cleaned: None,
            restart: RestartSchedule::new(),
            identity: DeviceIdentity::default(),
        };
        session.identity = session.read_identity()?;
        info!("{} opened: {}", profile.model, session.identity);
        Ok(session)
    }

    /// Open a SEN5x session, picking the SEN54 or SEN55 profile from the
    /// product name the device reports.
    pub fn open_sen5x(transport: T, delay: D, config: SessionConfig) -> Result<Self, Error<T::Error>> {
        let mut session = Self::open(&SEN54, transport, delay, config)?;
        if let Some(name) = session.identity.product_name.as_deref() {
            session.profile = sen5x_for_product(name);
        }
        debug!("SEN5x detected as {}", session.profile.model);
        Ok(session)
    }

    fn read_identity(&mut self) -> Result<DeviceIdentity, Error<T::Error>> {
        let commands = self.profile.commands;
        let mut identity = DeviceIdentity::default();
        if let Some(query) = commands.product_name {
            identity.product_name = Some(identity::parse_string(&self.query(query)?)?);
        }
        if let Some(query) = commands.serial_number {
            let response = self.query(query)?;
            identity.serial_number = Some(identity::parse_serial(
                &response,
                self.profile.serial_format,
            )?);
        }
        if let Some(query) = commands.firmware_version {
            identity.firmware_version = Some(identity::parse_firmware(&self.query(query)?)?);
        }
        Ok(identity)
    }

    /// Profile of the device.
    pub fn profile(&self) -> &'static DeviceProfile {
        self.profile
    }

    /// Identity read when the session was opened.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Session configuration.
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Current measurement state.
    pub fn state(&self) -> MeasurementState {
        self.state
    }

    /// Current fan-cleaning state.
    pub fn cleaning_state(&self) -> CleaningState {
        self.cleaning
    }

    /// Returns true while the fan-cleaning cycle is running.
    ///
    /// Readings taken during cleaning are not valid.
    pub fn is_cleaning(&self) -> bool {
        self.cleaning == CleaningState::Cleaning
    }

    /// When the last cleaning cycle completed.
    pub fn last_cleaned(&self) -> Option<SystemTime> {
        self.last_cleaned
    }

    // ---- Wire helpers ----

    fn ensure_open(&self) -> Result<(), Error<T::Error>> {
        if self.state == MeasurementState::Closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    fn command(
        &self,
        select: impl FnOnce(&Commands) -> Option<Command>,
        operation: &'static str,
    ) -> Result<Command, Error<T::Error>> {
        self.ensure_open()?;
        select(&self.profile.commands).ok_or(Error::Unsupported(operation))
    }

    fn lookup(
        &self,
        select: impl FnOnce(&Commands) -> Option<Query>,
        operation: &'static str,
    ) -> Result<Query, Error<T::Error>> {
        self.ensure_open()?;
        select(&self.profile.commands).ok_or(Error::Unsupported(operation))
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<(), Error<T::Error>> {
        debug!("{} write {:02X?}", self.profile.model, frame.as_bytes());
        self.transport
            .write(frame.as_bytes())
            .map_err(Error::Transport)
    }

    fn send(&mut self, command: Command) -> Result<(), Error<T::Error>> {
        self.write_frame(&command.frame())
    }

    fn read_response(&mut self, len: usize) -> Result<Response, Error<T::Error>> {
        let bytes = self.transport.read(len).map_err(Error::Transport)?;
        debug!("{} read {:02X?}", self.profile.model, bytes);
        Ok(Response::parse(&bytes, len)?)
    }

    fn query(&mut self, query: Query) -> Result<Response, Error<T::Error>> {
        self.send(query.command)?;
        self.delay.delay_ms(self.profile.timing.read_delay_ms);
        self.read_response(query.response_len)
    }

    fn read_values(&mut self, query: Query) -> Result<Vec<u16>, Error<T::Error>> {
        Ok(self.query(query)?.verified_values()?)
    }

    fn write_values(&mut self, query: Query, values: &[u16]) -> Result<(), Error<T::Error>> {
        let mut frame = Frame::new(query.command.opcode);
        for value in values {
            frame.push_word(*value);
        }
        self.write_frame(&frame)?;
        self.delay.delay_ms(self.profile.timing.read_delay_ms);
        Ok(())
    }

    // ---- Measurement ----

    /// Start continuous measurement.
    ///
    /// For single-shot models no command is sent; the session is simply marked
    /// as measuring. A pending restart is cancelled.
    pub fn start(&mut self) -> Result<(), Error<T::Error>> {
        self.ensure_open()?;
        self.restart.cancel();
        if let Some(command) = self.profile.commands.start {
            self.send(command)?;
            self.delay.delay_ms(self.profile.timing.settle_ms);
        }
        self.state = MeasurementState::Measuring;
        info!("{} measurement started", self.profile.model);
        Ok(())
    }

    /// Start measuring humidity, temperature and gas indices only, with the
    /// particulate section (fan and laser) off.
    pub fn start_rht_gas_only(&mut self) -> Result<(), Error<T::Error>> {
        let command = self.command(|c| c.start_rht_gas_only, "RH/T and gas only measurement")?;
        self.restart.cancel();
        self.send(command)?;
        self.delay.delay_ms(self.profile.timing.settle_ms);
        self.state = MeasurementState::Measuring;
        info!("{} RH/T and gas measurement started", self.profile.model);
        Ok(())
    }

    /// Stop measurement and return the device to idle.
    pub fn stop(&mut self) -> Result<(), Error<T::Error>> {
        self.ensure_open()?;
        if let Some(command) = self.profile.commands.stop {
            self.send(command)?;
            self.delay.delay_ms(self.profile.timing.settle_ms);
        }
        self.state = MeasurementState::Idle;
        info!("{} measurement stopped", self.profile.model);
        Ok(())
    }

    /// Check the data-ready flag.
    ///
    /// Models without the flag are always ready.
    pub fn poll_ready(&mut self) -> Result<bool, Error<T::Error>> {
        self.ensure_open()?;
        let Some(query) = self.profile.commands.data_ready else {
            return Ok(true);
        };
        let words = self.query(query)?.verified_values()?;
        Ok(words[0] & 0x00FF == 1)
    }

    /// Read a sample once new data is available.
    ///
    /// If the data-ready flag is not set (or its checksum fails), waits once for
    /// the model's data-ready interval and then reads regardless. There is no
    /// polling loop.
    pub fn read_when_ready(&mut self) -> Result<MeasurementSample, Error<T::Error>> {
        match self.poll_ready() {
            Ok(true) => {}
            Ok(false) => {
                debug!("{} data not ready, waiting", self.profile.model);
                self.delay.delay_ms(self.profile.timing.data_ready_wait_ms);
            }
            Err(e) if e.is_checksum_mismatch() => {
                warn!("{} data-ready flag unreadable: {}", self.profile.model, e);
                self.delay.delay_ms(self.profile.timing.data_ready_wait_ms);
            }
            Err(e) => return Err(e),
        }
        self.read_sample()
    }

    /// Read and decode one sample.
    ///
    /// Continuous models return the latest measured values. Single-shot models
    /// trigger a measurement with the profile's default precision and wait for
    /// it to complete.
    ///
    /// Checksum failures are handled according to the profile's
    /// [`FailurePolicy`](crate::FailurePolicy).
    pub fn read_sample(&mut self) -> Result<MeasurementSample, Error<T::Error>> {
        self.ensure_open()?;
        self.guard_cleaning()?;
        let response = match self.profile.acquisition {
            Acquisition::Continuous { read } => self.query(Query {
                command: read,
                response_len: self.profile.response_len,
            })?,
            Acquisition::SingleShot { measure, wait_ms } => self.single_shot(measure, wait_ms)?,
        };
        Ok(self.profile.decode_sample(&response)?)
    }

    fn single_shot(&mut self, command: Command, wait_ms: u32) -> Result<Response, Error<T::Error>> {
        self.send(command)?;
        self.delay.delay_ms(wait_ms);
        self.read_response(self.profile.response_len)
    }

    fn single_shot_sample(
        &mut self,
        command: Command,
        wait_ms: u32,
        operation: &'static str,
    ) -> Result<MeasurementSample, Error<T::Error>> {
        self.ensure_open()?;
        if !matches!(self.profile.acquisition, Acquisition::SingleShot { .. }) {
            return Err(Error::Unsupported(operation));
        }
        let response = self.single_shot(command, wait_ms)?;
        Ok(self.profile.decode_sample(&response)?)
    }

    /// Trigger a single-shot measurement at the given precision.
    ///
    /// Only supported by single-shot models (SHT4x).
    pub fn measure(&mut self, precision: Precision) -> Result<MeasurementSample, Error<T::Error>> {
        self.single_shot_sample(precision.command(), precision.wait_ms(), "single-shot measurement")
    }

    /// Run the heater, then read the high-precision measurement that follows.
    ///
    /// Only supported by single-shot models (SHT4x).
    pub fn activate_heater(
        &mut self,
        setting: HeaterSetting,
    ) -> Result<MeasurementSample, Error<T::Error>> {
        self.single_shot_sample(setting.command(), setting.wait_ms(), "heater")
    }

    // ---- Fan cleaning ----

    fn guard_cleaning(&mut self) -> Result<(), Error<T::Error>> {
        if self.cleaning != CleaningState::Cleaning {
            return Ok(());
        }
        match self.config.cleaning_guard {
            CleaningGuard::Reject => Err(Error::DeviceBusy),
            CleaningGuard::Defer => {
                let cycle = Duration::from_millis(self.profile.timing.cleaning_ms.into());
                let elapsed = self
                    .cleaning_started
                    .map_or(Duration::ZERO, |started| started.elapsed());
                let remaining = cycle.saturating_sub(elapsed);
                debug!(
                    "{} deferring read for {} ms of cleaning",
                    self.profile.model,
                    remaining.as_millis()
                );
                self.delay
                    .delay_ms(u32::try_from(remaining.as_millis()).unwrap_or(u32::MAX));
                self.finish_cleaning();
                Ok(())
            }
        }
    }

    /// Run a complete fan-cleaning cycle, blocking until it has finished.
    pub fn start_cleaning(&mut self) -> Result<(), Error<T::Error>> {
        self.begin_cleaning()?;
        self.delay.delay_ms(self.profile.timing.cleaning_ms);
        self.finish_cleaning();
        Ok(())
    }

    /// Send the fan-cleaning command without waiting for the cycle to finish.
    ///
    /// The session stays in [`CleaningState::Cleaning`] until
    /// [`finish_cleaning`] is called.
    ///
    /// [`finish_cleaning`]: MeasurementSession::finish_cleaning
    pub fn begin_cleaning(&mut self) -> Result<(), Error<T::Error>> {
        let command = self.command(|c| c.fan_cleaning, "fan cleaning")?;
        if self.state == MeasurementState::Measuring
            && self.config.cleaning_interlock == CleaningInterlock::RejectWhileMeasuring
        {
            return Err(Error::MeasuringInterlock);
        }
        let previous = self.cleaning;
        self.cleaning = CleaningState::Cleaning;
        self.cleaning_started = Some(Instant::now());
        if let Err(e) = self.send(command) {
            self.cleaning = previous;
            self.cleaning_started = None;
            return Err(e);
        }
        info!("{} fan cleaning started", self.profile.model);
        Ok(())
    }

    /// Mark the running cleaning cycle as finished.
    ///
    /// Does nothing if no cycle is running.
    pub fn finish_cleaning(&mut self) {
        if self.cleaning == CleaningState::Cleaning {
            self.cleaning = CleaningState::JustFinished;
            self.cleaning_started = None;
            self.last_cleaned = Some(SystemTime::now());
            info!("{} fan cleaning finished", self.profile.model);
        }
    }

    /// Read the automatic fan-cleaning interval.
    pub fn read_auto_cleaning_interval(&mut self) -> Result<Duration, Error<T::Error>> {
        let query = self.lookup(|c| c.auto_cleaning_interval, "auto-cleaning interval")?;
        let words = self.read_values(query)?;
        let seconds = (u32::from(words[0]) << 16) | u32::from(words[1]);
        Ok(Duration::from_secs(seconds.into()))
    }

    /// Set the automatic fan-cleaning interval, then read it back.
    ///
    /// The interval is sent in whole seconds. Zero disables automatic cleaning.
    /// Intervals longer than `u32::MAX` seconds are rejected with
    /// [`Error::OutOfRange`] before anything is written.
    pub fn write_auto_cleaning_interval(
        &mut self,
        interval: Duration,
    ) -> Result<Duration, Error<T::Error>> {
        let query = self.lookup(|c| c.auto_cleaning_interval, "auto-cleaning interval")?;
        let seconds = u32::try_from(interval.as_secs())
            .map_err(|_| Error::OutOfRange("auto-cleaning interval"))?;
        let mut frame = Frame::new(query.command.opcode);
        frame.push_u32(seconds);
        self.write_frame(&frame)?;
        self.delay.delay_ms(self.profile.timing.settle_ms);
        let set = self.read_auto_cleaning_interval()?;
        info!(
            "{} auto-cleaning interval set to {} s",
            self.profile.model,
            set.as_secs()
        );
        Ok(set)
    }

    // ---- Status and power ----

    /// Read and decode the device status register.
    pub fn read_status(&mut self) -> Result<StatusRegister, Error<T::Error>> {
        let query = self.lookup(|c| c.read_status, "status register")?;
        let map = self.profile.status_map.ok_or(Error::Unsupported("status register"))?;
        let response = self.query(query)?;
        let status = StatusRegister::from_response(&response, map)?;
        if !status.ok() {
            warn!("{} status: {}", self.profile.model, status);
        }
        Ok(status)
    }

    /// Clear the device status register.
    pub fn clear_status(&mut self) -> Result<(), Error<T::Error>> {
        let command = self.command(|c| c.clear_status, "clear status")?;
        self.send(command)?;
        self.delay.delay_ms(self.profile.timing.read_delay_ms);
        Ok(())
    }

    /// Soft reset. The device comes back idle.
    pub fn reset(&mut self) -> Result<(), Error<T::Error>> {
        let command = self.command(|c| c.reset, "reset")?;
        self.restart.cancel();
        self.send(command)?;
        self.delay.delay_ms(self.profile.timing.reset_ms);
        self.state = MeasurementState::Idle;
        info!("{} reset", self.profile.model);
        Ok(())
    }

    /// Put the device to sleep. Only valid when idle.
    pub fn sleep(&mut self) -> Result<(), Error<T::Error>> {
        let command = self.command(|c| c.sleep, "sleep")?;
        self.send(command)?;
        self.delay.delay_ms(self.profile.timing.read_delay_ms);
        Ok(())
    }

    /// Wake the device from sleep.
    pub fn wake_up(&mut self) -> Result<(), Error<T::Error>> {
        let command = self.command(|c| c.wake_up, "wake-up")?;
        self.send(command)?;
        self.delay.delay_ms(self.profile.timing.read_delay_ms);
        Ok(())
    }

    // ---- SEN5x parameters ----

    /// Read the VOC index algorithm tuning parameters.
    pub fn read_voc_tuning(&mut self) -> Result<AlgorithmTuning, Error<T::Error>> {
        let query = self.lookup(|c| c.voc_tuning, "VOC tuning")?;
        Ok(AlgorithmTuning::from_words(&self.read_values(query)?))
    }

    /// Write the VOC index algorithm tuning parameters.
    pub fn write_voc_tuning(&mut self, tuning: AlgorithmTuning) -> Result<(), Error<T::Error>> {
        let query = self.lookup(|c| c.voc_tuning, "VOC tuning")?;
        self.write_values(query, &tuning.to_words())
    }

    /// Read the NOx index algorithm tuning parameters.
    pub fn read_nox_tuning(&mut self) -> Result<AlgorithmTuning, Error<T::Error>> {
        let query = self.lookup(|c| c.nox_tuning, "NOx tuning")?;
        Ok(AlgorithmTuning::from_words(&self.read_values(query)?))
    }

    /// Write the NOx index algorithm tuning parameters.
    pub fn write_nox_tuning(&mut self, tuning: AlgorithmTuning) -> Result<(), Error<T::Error>> {
        let query = self.lookup(|c| c.nox_tuning, "NOx tuning")?;
        self.write_values(query, &tuning.to_words())
    }

    /// Read the warm start parameter.
    pub fn read_warm_start(&mut self) -> Result<u16, Error<T::Error>> {
        let query = self.lookup(|c| c.warm_start, "warm start")?;
        Ok(self.read_values(query)?[0])
    }

    /// Write the warm start parameter (0 cold, 65535 warm).
    pub fn write_warm_start(&mut self, warm_start: u16) -> Result<(), Error<T::Error>> {
        let query = self.lookup(|c| c.warm_start, "warm start")?;
        self.write_values(query, &[warm_start])
    }

    /// Read the RH/T acceleration mode.
    pub fn read_rht_acceleration(&mut self) -> Result<RhtAcceleration, Error<T::Error>> {
        let query = self.lookup(|c| c.rht_acceleration, "RH/T acceleration")?;
        Ok(self.read_values(query)?[0].into())
    }

    /// Read the VOC algorithm state, to be restored after a power cycle.
    pub fn read_voc_algorithm_state(&mut self) -> Result<[u8; 8], Error<T::Error>> {
        let query = self.lookup(|c| c.voc_algorithm_state, "VOC algorithm state")?;
        let bytes = self.query(query)?.verified_bytes()?;
        let mut state = [0u8; 8];
        state.copy_from_slice(&bytes[..8]);
        Ok(state)
    }

    /// Restore a VOC algorithm state. Only valid when idle.
    pub fn write_voc_algorithm_state(&mut self, state: [u8; 8]) -> Result<(), Error<T::Error>> {
        let query = self.lookup(|c| c.voc_algorithm_state, "VOC algorithm state")?;
        let words: Vec<u16> = state
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        self.write_values(query, &words)
    }

    /// Read the temperature compensation parameters.
    pub fn read_temperature_compensation(
        &mut self,
    ) -> Result<TemperatureCompensation, Error<T::Error>> {
        let query = self.lookup(|c| c.temperature_compensation, "temperature compensation")?;
        Ok(TemperatureCompensation::from_words(&self.read_values(query)?))
    }

    // ---- Deferred restart ----

    /// Arm a restart of measurement `delay` after `now`.
    ///
    /// Replaces any pending restart.
    pub fn schedule_restart(&mut self, now: Instant, delay: Duration) -> Result<(), Error<T::Error>> {
        self.ensure_open()?;
        self.restart.schedule(now, delay);
        debug!("{} restart in {} s", self.profile.model, delay.as_secs());
        Ok(())
    }

    /// Stop measuring and arm a restart `delay` after `now`.
    pub fn stop_and_restart_after(
        &mut self,
        now: Instant,
        delay: Duration,
    ) -> Result<(), Error<T::Error>> {
        self.stop()?;
        self.schedule_restart(now, delay)
    }

    /// Cancel the pending restart. Returns true if one was pending.
    pub fn cancel_restart(&mut self) -> bool {
        self.restart.cancel()
    }

    /// When the pending restart is due, if one is pending.
    pub fn restart_deadline(&self) -> Option<Instant> {
        self.restart.deadline()
    }

    /// Start measurement if the pending restart is due at `now`.
    ///
    /// Returns true if measurement was restarted.
    pub fn service_restart(&mut self, now: Instant) -> Result<bool, Error<T::Error>> {
        self.ensure_open()?;
        if !self.restart.take_due(now) {
            return Ok(false);
        }
        self.start()?;
        Ok(true)
    }

    // ---- Teardown ----

    /// Stop measurement, cancel any pending restart and release the transport.
    ///
    /// The transport is released even if stopping fails; the first error is
    /// returned. Closing a closed session does nothing.
    pub fn close(&mut self) -> Result<(), Error<T::Error>> {
        if self.state == MeasurementState::Closed {
            return Ok(());
        }
        if self.restart.cancel() {
            debug!("{} pending restart cancelled", self.profile.model);
        }
        let stopped = match self.profile.commands.stop {
            Some(command) => self.send(command),
            None => Ok(()),
        };
        let released = self.transport.close().map_err(Error::Transport);
        self.state = MeasurementState::Closed;
        info!("{} closed", self.profile.model);
        stopped.and(released)
    }
}

impl<T: Transport, D: DelayNs> Drop for MeasurementSession<T, D> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{} close on drop failed: {:?}", self.profile.model, e);
        }
    }
}
