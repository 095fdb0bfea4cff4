//! BMP280 barometric pressure and temperature sensor.
//!
//! Unlike the Sensirion parts, the BMP280 is register-addressed: a read writes
//! the register address and then reads consecutive registers, and there are no
//! checksums. Raw readings are compensated with the per-device calibration
//! constants stored in the chip.
//!
//! # Datasheet
//!
//! Register addresses are from table 18 (memory map) of the BMP280 datasheet,
//! the compensation formulas from section 8.1 (floating-point version).
use bit_field::BitField;
use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::error::Error;
use crate::sample::MeasurementSample;
use crate::transport::Transport;

/// Value of the id register for a BMP280.
pub const CHIP_ID: u8 = 0x58;

const REG_CALIBRATION: u8 = 0x88;
const REG_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_PRESSURE: u8 = 0xF7;
const REG_TEMPERATURE: u8 = 0xFA;

const RESET_WORD: u8 = 0xB6;
const CALIBRATION_LEN: usize = 24;

/// Oversampling of a temperature or pressure measurement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    /// Measurement skipped.
    Skipped,
    /// One sample.
    #[default]
    X1,
    /// Two samples.
    X2,
    /// Four samples.
    X4,
    /// Eight samples.
    X8,
    /// Sixteen samples.
    X16,
}

impl From<Oversampling> for u8 {
    fn from(value: Oversampling) -> Self {
        match value {
            Oversampling::Skipped => 0b000,
            Oversampling::X1 => 0b001,
            Oversampling::X2 => 0b010,
            Oversampling::X4 => 0b011,
            Oversampling::X8 => 0b100,
            Oversampling::X16 => 0b101,
        }
    }
}

/// Power mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No measurements.
    Sleep,
    /// One measurement, then back to sleep.
    #[default]
    Forced,
    /// Periodic measurements separated by the standby time.
    Normal,
}

impl From<Mode> for u8 {
    fn from(value: Mode) -> Self {
        match value {
            Mode::Sleep => 0b00,
            Mode::Forced => 0b01,
            Mode::Normal => 0b11,
        }
    }
}

/// IIR filter coefficient.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Filter off.
    #[default]
    Off,
    /// Coefficient 2.
    X2,
    /// Coefficient 4.
    X4,
    /// Coefficient 8.
    X8,
    /// Coefficient 16.
    X16,
}

impl From<Filter> for u8 {
    fn from(value: Filter) -> Self {
        match value {
            Filter::Off => 0b000,
            Filter::X2 => 0b001,
            Filter::X4 => 0b010,
            Filter::X8 => 0b011,
            Filter::X16 => 0b100,
        }
    }
}

/// Inactive time between measurements in normal mode.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StandbyTime {
    /// 0.5 ms.
    #[default]
    ms0_5,
    /// 62.5 ms.
    ms62_5,
    /// 125 ms.
    ms125,
    /// 250 ms.
    ms250,
    /// 500 ms.
    ms500,
    /// 1 s.
    ms1000,
    /// 2 s.
    ms2000,
    /// 4 s.
    ms4000,
}

impl From<StandbyTime> for u8 {
    fn from(value: StandbyTime) -> Self {
        match value {
            StandbyTime::ms0_5 => 0b000,
            StandbyTime::ms62_5 => 0b001,
            StandbyTime::ms125 => 0b010,
            StandbyTime::ms250 => 0b011,
            StandbyTime::ms500 => 0b100,
            StandbyTime::ms1000 => 0b101,
            StandbyTime::ms2000 => 0b110,
            StandbyTime::ms4000 => 0b111,
        }
    }
}

/// Measurement settings, written to the `ctrl_meas` and `config` registers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Temperature oversampling.
    pub temperature: Oversampling,
    /// Pressure oversampling.
    pub pressure: Oversampling,
    /// Power mode.
    pub mode: Mode,
    /// IIR filter.
    pub filter: Filter,
    /// Standby time in normal mode.
    pub standby: StandbyTime,
}

impl Settings {
    /// Value of the `ctrl_meas` register (0xF4).
    pub fn ctrl_meas(&self) -> u8 {
        let mut byte = 0u8;
        byte.set_bits(5..=7, self.temperature.into());
        byte.set_bits(2..=4, self.pressure.into());
        byte.set_bits(0..=1, self.mode.into());
        byte
    }

    /// Value of the `config` register (0xF5). SPI 3-wire mode is left off.
    pub fn config(&self) -> u8 {
        let mut byte = 0u8;
        byte.set_bits(5..=7, self.standby.into());
        byte.set_bits(2..=4, self.filter.into());
        byte
    }
}

/// Factory-programmed compensation constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    #[allow(missing_docs)]
    pub t1: u16,
    #[allow(missing_docs)]
    pub t2: i16,
    #[allow(missing_docs)]
    pub t3: i16,
    #[allow(missing_docs)]
    pub p1: u16,
    #[allow(missing_docs)]
    pub p2: i16,
    #[allow(missing_docs)]
    pub p3: i16,
    #[allow(missing_docs)]
    pub p4: i16,
    #[allow(missing_docs)]
    pub p5: i16,
    #[allow(missing_docs)]
    pub p6: i16,
    #[allow(missing_docs)]
    pub p7: i16,
    #[allow(missing_docs)]
    pub p8: i16,
    #[allow(missing_docs)]
    pub p9: i16,
}

impl Calibration {
    /// Parse the 24 calibration bytes starting at register 0x88.
    ///
    /// Each constant is a little-endian 16-bit value; `T1` and `P1` are
    /// unsigned, the rest signed.
    pub fn from_registers(buf: &[u8; CALIBRATION_LEN]) -> Self {
        let unsigned = |i: usize| u16::from_le_bytes([buf[i], buf[i + 1]]);
        let signed = |i: usize| i16::from_le_bytes([buf[i], buf[i + 1]]);
        Self {
            t1: unsigned(0),
            t2: signed(2),
            t3: signed(4),
            p1: unsigned(6),
            p2: signed(8),
            p3: signed(10),
            p4: signed(12),
            p5: signed(14),
            p6: signed(16),
            p7: signed(18),
            p8: signed(20),
            p9: signed(22),
        }
    }

    /// Fine temperature shared by both compensation formulas.
    fn t_fine(&self, adc_t: u32) -> f64 {
        let adc_t = f64::from(adc_t);
        let t1 = f64::from(self.t1);
        let var1 = (adc_t / 16_384.0 - t1 / 1_024.0) * f64::from(self.t2);
        let var2 = (adc_t / 131_072.0 - t1 / 8_192.0).powi(2) * f64::from(self.t3);
        var1 + var2
    }

    /// Temperature in °C from a raw 20-bit reading.
    pub fn compensate_temperature(&self, adc_t: u32) -> f64 {
        self.t_fine(adc_t) / 5_120.0
    }

    /// Pressure in Pa from raw 20-bit pressure and temperature readings.
    ///
    /// Returns 0 if the calibration would divide by zero.
    pub fn compensate_pressure(&self, adc_p: u32, adc_t: u32) -> f64 {
        let t_fine = self.t_fine(adc_t);
        let mut var1 = t_fine / 2.0 - 64_000.0;
        let mut var2 = var1 * var1 * f64::from(self.p6) / 32_768.0;
        var2 += var1 * f64::from(self.p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.p4) * 65_536.0;
        var1 = (f64::from(self.p3) * var1 * var1 / 524_288.0 + f64::from(self.p2) * var1)
            / 524_288.0;
        var1 = (1.0 + var1 / 32_768.0) * f64::from(self.p1);
        if var1 == 0.0 {
            return 0.0;
        }
        let mut p = 1_048_576.0 - f64::from(adc_p);
        p = (p - var2 / 4_096.0) * 6_250.0 / var1;
        var1 = f64::from(self.p9) * p * p / 2_147_483_648.0;
        var2 = p * f64::from(self.p8) / 32_768.0;
        p + (var1 + var2 + f64::from(self.p7)) / 16.0
    }
}

/// 20-bit reading from the three registers at `msb`, `lsb`, `xlsb`.
fn raw_reading(bytes: &[u8]) -> u32 {
    (u32::from(bytes[0]) << 12) | (u32::from(bytes[1]) << 4) | (u32::from(bytes[2]) >> 4)
}

/// Driver for a BMP280 on a [`Transport`].
#[derive(Debug)]
pub struct Bmp280<T: Transport, D: DelayNs> {
    transport: T,
    delay: D,
    settings: Settings,
    calibration: Calibration,
}

impl<T: Transport, D: DelayNs> Bmp280<T, D> {
    /// Check the chip id, read the calibration and apply `settings`.
    pub fn open(transport: T, delay: D, settings: Settings) -> Result<Self, Error<T::Error>> {
        let mut transport = transport;
        let id = read_registers(&mut transport, REG_ID, 1)?[0];
        if id != CHIP_ID {
            return Err(Error::UnexpectedDeviceId(id));
        }
        let raw = read_registers(&mut transport, REG_CALIBRATION, CALIBRATION_LEN)?;
        let mut buf = [0u8; CALIBRATION_LEN];
        buf.copy_from_slice(&raw[..CALIBRATION_LEN]);
        let calibration = Calibration::from_registers(&buf);
        debug!("BMP280 calibration {calibration:?}");
        let mut bmp = Self {
            transport,
            delay,
            settings,
            calibration,
        };
        bmp.configure(settings)?;
        info!("BMP280 opened");
        Ok(bmp)
    }

    /// Calibration constants read when the driver was opened.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Current measurement settings.
    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Write new measurement settings.
    pub fn configure(&mut self, settings: Settings) -> Result<(), Error<T::Error>> {
        self.write_register(REG_CONFIG, settings.config())?;
        self.write_register(REG_CTRL_MEAS, settings.ctrl_meas())?;
        self.settings = settings;
        Ok(())
    }

    /// Soft reset. The settings are lost and must be written again.
    pub fn reset(&mut self) -> Result<(), Error<T::Error>> {
        self.write_register(REG_RESET, RESET_WORD)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    /// Returns true while a conversion is running.
    pub fn is_measuring(&mut self) -> Result<bool, Error<T::Error>> {
        let status = read_registers(&mut self.transport, REG_STATUS, 1)?[0];
        Ok(status.get_bit(3))
    }

    /// Take a measurement: `t` in °C and `p` in Pa.
    ///
    /// In forced mode a conversion is triggered first and waited for.
    pub fn read_sample(&mut self) -> Result<MeasurementSample, Error<T::Error>> {
        if self.settings.mode == Mode::Forced {
            self.write_register(REG_CTRL_MEAS, self.settings.ctrl_meas())?;
            self.delay.delay_ms(10);
        }
        let raw = read_registers(&mut self.transport, REG_PRESSURE, 6)?;
        let adc_p = raw_reading(&raw[0..3]);
        let adc_t = raw_reading(&raw[3..6]);
        let mut sample = MeasurementSample::new();
        sample.insert("t", self.calibration.compensate_temperature(adc_t) as f32);
        sample.insert("p", self.calibration.compensate_pressure(adc_p, adc_t) as f32);
        Ok(sample)
    }

    /// Put the chip to sleep and release the transport.
    pub fn close(mut self) -> Result<(), Error<T::Error>> {
        let slept = self.write_register(
            REG_CTRL_MEAS,
            Settings {
                mode: Mode::Sleep,
                ..self.settings
            }
            .ctrl_meas(),
        );
        let released = self.transport.close().map_err(Error::Transport);
        slept.and(released)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<T::Error>> {
        self.transport
            .write(&[register, value])
            .map_err(Error::Transport)
    }
}

fn read_registers<T: Transport>(
    transport: &mut T,
    register: u8,
    len: usize,
) -> Result<Vec<u8>, Error<T::Error>> {
    transport.write(&[register]).map_err(Error::Transport)?;
    let bytes = transport.read(len).map_err(Error::Transport)?;
    if bytes.len() < len {
        return Err(crate::error::ProtocolError::IncompleteFrame {
            expected: len,
            received: bytes.len(),
        }
        .into());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Example constants from section 8.2 of the datasheet.
    fn datasheet() -> Calibration {
        Calibration {
            t1: 27504,
            t2: 26435,
            t3: -1000,
            p1: 36477,
            p2: -10685,
            p3: 3024,
            p4: 2855,
            p5: 140,
            p6: -7,
            p7: 15500,
            p8: -14600,
            p9: 6000,
        }
    }

    #[test]
    fn datasheet_compensation() {
        let cal = datasheet();
        let t = cal.compensate_temperature(519_888);
        assert!((t - 25.08).abs() < 0.01, "t = {t}");
        let p = cal.compensate_pressure(415_148, 519_888);
        assert!((p - 100_653.27).abs() < 1.0, "p = {p}");
    }

    #[test]
    fn calibration_is_little_endian() {
        let mut buf = [0u8; CALIBRATION_LEN];
        buf[0..2].copy_from_slice(&27504u16.to_le_bytes());
        buf[2..4].copy_from_slice(&26435i16.to_le_bytes());
        buf[4..6].copy_from_slice(&(-1000i16).to_le_bytes());
        buf[22..24].copy_from_slice(&6000i16.to_le_bytes());
        let cal = Calibration::from_registers(&buf);
        assert_eq!(cal.t1, 27504);
        assert_eq!(cal.t2, 26435);
        assert_eq!(cal.t3, -1000);
        assert_eq!(cal.p9, 6000);
    }

    #[test]
    fn register_packing() {
        let settings = Settings {
            temperature: Oversampling::X2,
            pressure: Oversampling::X16,
            mode: Mode::Normal,
            filter: Filter::X4,
            standby: StandbyTime::ms1000,
        };
        assert_eq!(settings.ctrl_meas(), 0b010_101_11);
        assert_eq!(settings.config(), 0b101_010_00);
        assert_eq!(Settings::default().ctrl_meas(), 0b001_001_01);
    }

    #[test]
    fn twenty_bit_readings() {
        assert_eq!(raw_reading(&[0x7E, 0xED, 0x00]), 519_888);
        assert_eq!(raw_reading(&[0xFF, 0xFF, 0xF0]), 0xF_FFFF);
    }
}
