//! Static descriptions of the supported sensor models.
//!
//! A [`DeviceProfile`] holds everything that differs between the models sharing
//! the word-and-checksum protocol: command opcodes, response lengths, the layout
//! and encoding of the measured values, the status bit map and timing. The
//! [`MeasurementSession`](crate::MeasurementSession) is written once against this
//! data.
//!
//! # Datasheet
//!
//! Opcodes and layouts are from the command tables of the SEN5x (section 6.1),
//! SPS30 (section 6.3) and SHT4x (section 4.5) datasheets.
use log::warn;

use crate::decode::Encoding;
use crate::error::ProtocolError;
use crate::frame::{Command, Response, WORD_LEN};
use crate::sample::MeasurementSample;
use crate::status::{SEN5X_STATUS, SPS30_STATUS, StatusMap};

/// One field of the measured-values response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    /// Short field name used as the sample key.
    pub name: &'static str,
    /// How the field's words are decoded.
    pub encoding: Encoding,
}

impl Field {
    const fn new(name: &'static str, encoding: Encoding) -> Self {
        Self { name, encoding }
    }
}

/// What to do when a word of the measured values fails its checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Fail the whole read with a checksum mismatch.
    WholeSample,
    /// Replace the failing word's data bytes with this pattern and decode it as
    /// usual, keeping the other fields.
    ///
    /// The pattern goes through the field's own scaling, so the resulting value
    /// differs per field: `0x807F` reads as -163.205 for a SEN5x temperature,
    /// -3264.1 for the NOx index and 3289.5 for a mass concentration. Use
    /// [`DeviceProfile::sentinel_value`] to recognise it.
    Sentinel([u8; 2]),
}

/// A command that is answered with a fixed-length response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    /// Command to write.
    pub command: Command,
    /// Response length in bytes, including checksums.
    pub response_len: usize,
}

impl Query {
    const fn new(opcode: &'static [u8], response_len: usize) -> Self {
        Self {
            command: Command::new(opcode),
            response_len,
        }
    }
}

/// How a measurement is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// The device measures continuously once started; values are fetched with
    /// `read`.
    Continuous {
        /// Read Measured Values command.
        read: Command,
    },
    /// Each measurement is triggered by `measure` and read back after
    /// `wait_ms`.
    SingleShot {
        /// Measurement trigger command.
        measure: Command,
        /// Time for the measurement to complete.
        wait_ms: u32,
    },
}

/// How the serial number response is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialFormat {
    /// NUL-padded ASCII string.
    Ascii,
    /// Big-endian integer over the first two words.
    Integer,
}

/// Command table of a device.
///
/// Commands the model does not have are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commands {
    /// Start continuous measurement.
    pub start: Option<Command>,
    /// Start measurement of humidity, temperature and gas indices only (SEN5x).
    pub start_rht_gas_only: Option<Command>,
    /// Stop measurement and return to idle.
    pub stop: Option<Command>,
    /// Read the data-ready flag.
    pub data_ready: Option<Query>,
    /// Start the fan-cleaning cycle.
    pub fan_cleaning: Option<Command>,
    /// Read or write the automatic cleaning interval.
    pub auto_cleaning_interval: Option<Query>,
    /// Read the device status register.
    pub read_status: Option<Query>,
    /// Clear the device status register.
    pub clear_status: Option<Command>,
    /// Soft reset.
    pub reset: Option<Command>,
    /// Enter sleep mode (SPS30).
    pub sleep: Option<Command>,
    /// Leave sleep mode (SPS30).
    pub wake_up: Option<Command>,
    /// Product name or type string.
    pub product_name: Option<Query>,
    /// Serial number.
    pub serial_number: Option<Query>,
    /// Firmware version.
    pub firmware_version: Option<Query>,
    /// Temperature compensation parameters (SEN5x).
    pub temperature_compensation: Option<Query>,
    /// Warm start parameter (SEN5x).
    pub warm_start: Option<Query>,
    /// VOC algorithm tuning parameters (SEN5x).
    pub voc_tuning: Option<Query>,
    /// NOx algorithm tuning parameters (SEN55).
    pub nox_tuning: Option<Query>,
    /// RH/T acceleration mode (SEN5x).
    pub rht_acceleration: Option<Query>,
    /// VOC algorithm state (SEN5x).
    pub voc_algorithm_state: Option<Query>,
}

impl Commands {
    /// Table with no commands, used as the base for the model tables.
    pub const NONE: Commands = Commands {
        start: None,
        start_rht_gas_only: None,
        stop: None,
        data_ready: None,
        fan_cleaning: None,
        auto_cleaning_interval: None,
        read_status: None,
        clear_status: None,
        reset: None,
        sleep: None,
        wake_up: None,
        product_name: None,
        serial_number: None,
        firmware_version: None,
        temperature_compensation: None,
        warm_start: None,
        voc_tuning: None,
        nox_tuning: None,
        rht_acceleration: None,
        voc_algorithm_state: None,
    };
}

/// Delays observed by the session, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Wait between writing a command and reading its response.
    pub read_delay_ms: u32,
    /// Wait after starting or stopping measurement.
    pub settle_ms: u32,
    /// Single wait when the data-ready flag is not set.
    pub data_ready_wait_ms: u32,
    /// Duration of the fan-cleaning cycle.
    pub cleaning_ms: u32,
    /// Time for the device to come back after a soft reset.
    pub reset_ms: u32,
}

/// Static description of a sensor model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    /// Model name, e.g. `"SPS30"`.
    pub model: &'static str,
    /// Fields of the measured-values response, in wire order.
    pub fields: &'static [Field],
    /// Length of the measured-values response in bytes.
    ///
    /// This may be longer than the fields need (the SEN54 reads the unused NOx
    /// slot).
    pub response_len: usize,
    /// How measurements are triggered and read.
    pub acquisition: Acquisition,
    /// Handling of words failing their checksum in the measured values.
    pub failure_policy: FailurePolicy,
    /// Status register bit map, if the model has a status register.
    pub status_map: Option<StatusMap>,
    /// Interpretation of the serial number response.
    pub serial_format: SerialFormat,
    /// Command table.
    pub commands: Commands,
    /// Delays.
    pub timing: Timing,
}

impl DeviceProfile {
    /// Number of response bytes the fields occupy, including checksums.
    pub fn fields_len(&self) -> usize {
        self.fields
            .iter()
            .map(|f| f.encoding.words() * WORD_LEN)
            .sum()
    }

    /// Value a field takes when its words are replaced by the sentinel pattern.
    ///
    /// `None` if the model fails the whole sample instead, or has no such field.
    pub fn sentinel_value(&self, name: &str) -> Option<f32> {
        let FailurePolicy::Sentinel(pattern) = self.failure_policy else {
            return None;
        };
        let field = self.fields.iter().find(|f| f.name == name)?;
        let data = pattern.repeat(field.encoding.words());
        Some(field.encoding.decode(&data))
    }

    /// Decode a measured-values response into a sample, applying the model's
    /// [`FailurePolicy`] to words that failed their checksum.
    pub fn decode_sample(&self, response: &Response) -> Result<MeasurementSample, ProtocolError> {
        let words = response.words();
        let mut sample = MeasurementSample::new();
        let mut index = 0;
        for field in self.fields {
            let count = field.encoding.words();
            let Some(field_words) = words.get(index..index + count) else {
                return Err(ProtocolError::IncompleteFrame {
                    expected: self.fields_len(),
                    received: words.len() * WORD_LEN,
                });
            };
            let mut data = Vec::with_capacity(2 * count);
            for (offset, word) in field_words.iter().enumerate() {
                if word.valid {
                    data.extend_from_slice(&word.data);
                    continue;
                }
                match self.failure_policy {
                    FailurePolicy::WholeSample => {
                        return Err(ProtocolError::ChecksumMismatch {
                            word: index + offset,
                        });
                    }
                    FailurePolicy::Sentinel(pattern) => {
                        warn!(
                            "{}: checksum mismatch in {}, substituting {:02X?}",
                            self.model, field.name, pattern
                        );
                        data.extend_from_slice(&pattern);
                    }
                }
            }
            sample.insert(field.name, field.encoding.decode(&data));
            index += count;
        }
        Ok(sample)
    }
}

/// Error pattern substituted for SEN5x words failing their checksum.
pub const SEN5X_SENTINEL: [u8; 2] = [0x80, 0x7F];

const SENSIRION_TIMING: Timing = Timing {
    read_delay_ms: 20,
    settle_ms: 50,
    data_ready_wait_ms: 1_000,
    cleaning_ms: 12_000,
    reset_ms: 100,
};

const SEN5X_COMMANDS: Commands = Commands {
    start: Some(Command::new(&[0x00, 0x21])),
    start_rht_gas_only: Some(Command::new(&[0x00, 0x37])),
    stop: Some(Command::new(&[0x01, 0x04])),
    data_ready: Some(Query::new(&[0x02, 0x02], 3)),
    fan_cleaning: Some(Command::new(&[0x56, 0x07])),
    auto_cleaning_interval: Some(Query::new(&[0x80, 0x04], 6)),
    read_status: Some(Query::new(&[0xD2, 0x06], 6)),
    clear_status: Some(Command::new(&[0xD2, 0x10])),
    reset: Some(Command::new(&[0xD3, 0x04])),
    product_name: Some(Query::new(&[0xD0, 0x14], 48)),
    serial_number: Some(Query::new(&[0xD0, 0x33], 48)),
    firmware_version: Some(Query::new(&[0xD1, 0x00], 3)),
    temperature_compensation: Some(Query::new(&[0x60, 0xB2], 9)),
    warm_start: Some(Query::new(&[0x60, 0xC6], 3)),
    voc_tuning: Some(Query::new(&[0x60, 0xD0], 18)),
    rht_acceleration: Some(Query::new(&[0x60, 0xF7], 3)),
    voc_algorithm_state: Some(Query::new(&[0x61, 0x81], 12)),
    ..Commands::NONE
};

const SEN5X_READ: Acquisition = Acquisition::Continuous {
    read: Command::new(&[0x03, 0xC4]),
};

const fn pm(name: &'static str) -> Field {
    Field::new(name, Encoding::LinearUnsigned { scale: 10.0 })
}

const fn signed(name: &'static str, scale: f32) -> Field {
    Field::new(name, Encoding::LinearSigned { scale })
}

const SEN54_PROFILE: DeviceProfile = DeviceProfile {
    model: "SEN54",
    fields: &[
        pm("pm1"),
        pm("pm2"),
        pm("pm4"),
        pm("pm10"),
        signed("h", 100.0),
        signed("t", 200.0),
        signed("voc", 10.0),
    ],
    response_len: 24,
    acquisition: SEN5X_READ,
    failure_policy: FailurePolicy::Sentinel(SEN5X_SENTINEL),
    status_map: Some(SEN5X_STATUS),
    serial_format: SerialFormat::Ascii,
    commands: SEN5X_COMMANDS,
    timing: SENSIRION_TIMING,
};

/// SEN54: particulate matter, humidity, temperature and VOC index.
pub static SEN54: DeviceProfile = SEN54_PROFILE;

/// SEN55: as the SEN54 with the NOx index.
pub static SEN55: DeviceProfile = DeviceProfile {
    model: "SEN55",
    fields: &[
        pm("pm1"),
        pm("pm2"),
        pm("pm4"),
        pm("pm10"),
        signed("h", 100.0),
        signed("t", 200.0),
        signed("voc", 10.0),
        signed("nox", 10.0),
    ],
    commands: Commands {
        nox_tuning: Some(Query::new(&[0x60, 0xE1], 18)),
        ..SEN5X_COMMANDS
    },
    ..SEN54_PROFILE
};

/// Pick the SEN5x profile for a product name read from the device.
///
/// Only the SEN55 reports NOx; any other name is treated as a SEN54.
pub fn sen5x_for_product(product_name: &str) -> &'static DeviceProfile {
    if product_name == "SEN55" { &SEN55 } else { &SEN54 }
}

const SPS30_FIELD_NAMES: [&str; 10] = [
    "pm1", "pm2", "pm4", "pm10", "nc0", "nc1", "nc2", "nc4", "nc10", "tps",
];

const fn sps30_fields(encoding: Encoding) -> [Field; 10] {
    let mut fields = [Field::new("", encoding); 10];
    let mut i = 0;
    while i < fields.len() {
        fields[i].name = SPS30_FIELD_NAMES[i];
        i += 1;
    }
    fields
}

const SPS30_COMMANDS: Commands = Commands {
    start: Some(Command::with_payload(&[0x00, 0x10], &[0x0300])),
    stop: Some(Command::new(&[0x01, 0x04])),
    data_ready: Some(Query::new(&[0x02, 0x02], 3)),
    fan_cleaning: Some(Command::new(&[0x56, 0x07])),
    auto_cleaning_interval: Some(Query::new(&[0x80, 0x04], 6)),
    read_status: Some(Query::new(&[0xD2, 0x06], 6)),
    clear_status: Some(Command::new(&[0xD2, 0x10])),
    reset: Some(Command::new(&[0xD3, 0x04])),
    sleep: Some(Command::new(&[0x10, 0x01])),
    wake_up: Some(Command::new(&[0x11, 0x03])),
    product_name: Some(Query::new(&[0xD0, 0x02], 12)),
    serial_number: Some(Query::new(&[0xD0, 0x33], 48)),
    firmware_version: Some(Query::new(&[0xD1, 0x00], 3)),
    ..Commands::NONE
};

const SPS30_PSEUDO_FLOAT_FIELDS: [Field; 10] = sps30_fields(Encoding::PseudoFloat);
const SPS30_IEEE754_FIELDS: [Field; 10] = sps30_fields(Encoding::Ieee754);

const SPS30_FLOAT_PROFILE: DeviceProfile = DeviceProfile {
    model: "SPS30",
    fields: &SPS30_PSEUDO_FLOAT_FIELDS,
    response_len: 60,
    acquisition: Acquisition::Continuous {
        read: Command::new(&[0x03, 0x00]),
    },
    failure_policy: FailurePolicy::WholeSample,
    status_map: Some(SPS30_STATUS),
    serial_format: SerialFormat::Ascii,
    commands: SPS30_COMMANDS,
    timing: SENSIRION_TIMING,
};

/// SPS30 in floating-point output mode, decoded with the monitor's historical
/// float conversion ([`pseudo_float`](crate::decode::pseudo_float)).
pub static SPS30_FLOAT: DeviceProfile = SPS30_FLOAT_PROFILE;

/// SPS30 in floating-point output mode, decoded as IEEE-754 singles.
pub static SPS30_FLOAT_IEEE754: DeviceProfile = DeviceProfile {
    fields: &SPS30_IEEE754_FIELDS,
    ..SPS30_FLOAT_PROFILE
};

/// SPS30 in unsigned 16-bit integer output mode.
///
/// Mass concentrations are in µg/m³ and number concentrations in #/cm³ without
/// decimals. The typical particle size is reported in nm and scaled to µm to
/// match the float mode.
pub static SPS30_INTEGER: DeviceProfile = DeviceProfile {
    fields: &[
        Field::new("pm1", Encoding::LinearUnsigned { scale: 1.0 }),
        Field::new("pm2", Encoding::LinearUnsigned { scale: 1.0 }),
        Field::new("pm4", Encoding::LinearUnsigned { scale: 1.0 }),
        Field::new("pm10", Encoding::LinearUnsigned { scale: 1.0 }),
        Field::new("nc0", Encoding::LinearUnsigned { scale: 1.0 }),
        Field::new("nc1", Encoding::LinearUnsigned { scale: 1.0 }),
        Field::new("nc2", Encoding::LinearUnsigned { scale: 1.0 }),
        Field::new("nc4", Encoding::LinearUnsigned { scale: 1.0 }),
        Field::new("nc10", Encoding::LinearUnsigned { scale: 1.0 }),
        Field::new("tps", Encoding::LinearUnsigned { scale: 1000.0 }),
    ],
    response_len: 30,
    commands: Commands {
        start: Some(Command::with_payload(&[0x00, 0x10], &[0x0500])),
        ..SPS30_COMMANDS
    },
    ..SPS30_FLOAT_PROFILE
};

/// SHT40 (and the rest of the SHT4x family) in high-precision mode.
///
/// Other precisions and the heater are available through
/// [`MeasurementSession::measure`](crate::MeasurementSession::measure) and
/// [`MeasurementSession::activate_heater`](crate::MeasurementSession::activate_heater).
pub static SHT40: DeviceProfile = DeviceProfile {
    model: "SHT40",
    fields: &[
        Field::new(
            "t",
            Encoding::RangeMapped {
                offset: -45.0,
                span: 175.0,
            },
        ),
        Field::new(
            "h",
            Encoding::RangeMapped {
                offset: -6.0,
                span: 125.0,
            },
        ),
    ],
    response_len: 6,
    acquisition: Acquisition::SingleShot {
        measure: crate::sht4x::Precision::High.command(),
        wait_ms: crate::sht4x::Precision::High.wait_ms(),
    },
    failure_policy: FailurePolicy::WholeSample,
    status_map: None,
    serial_format: SerialFormat::Integer,
    commands: Commands {
        reset: Some(Command::new(&[0x94])),
        serial_number: Some(Query::new(&[0x89], 6)),
        ..Commands::NONE
    },
    timing: Timing {
        read_delay_ms: 1,
        settle_ms: 1,
        data_ready_wait_ms: 0,
        cleaning_ms: 0,
        reset_ms: 1,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_fit_in_response() {
        for profile in [
            &SEN54,
            &SEN55,
            &SPS30_FLOAT,
            &SPS30_FLOAT_IEEE754,
            &SPS30_INTEGER,
            &SHT40,
        ] {
            assert!(
                profile.fields_len() <= profile.response_len,
                "{} fields overrun the response",
                profile.model
            );
            assert_eq!(profile.response_len % WORD_LEN, 0);
        }
        assert_eq!(SEN55.fields_len(), SEN55.response_len);
        assert_eq!(SPS30_FLOAT.fields_len(), 60);
    }

    fn framed(words: &[[u8; 2]]) -> Vec<u8> {
        words
            .iter()
            .flat_map(|w| [w[0], w[1], crate::crc::crc8(*w)])
            .collect()
    }

    #[test]
    fn sentinel_replaces_only_the_bad_word() {
        let mut bytes = framed(&[
            [0x00, 0x64], // pm1 10.0
            [0x00, 0xC8], // pm2 20.0
            [0x01, 0x2C], // pm4 30.0
            [0x01, 0x90], // pm10 40.0
            [0x13, 0x88], // h 50.0
            [0x13, 0x88], // t 25.0
            [0x03, 0xE8], // voc 100.0
            [0xFF, 0xFF], // nox unused on SEN54
        ]);
        // Corrupt the checksum of t.
        bytes[5 * WORD_LEN + 2] ^= 0x01;
        let response = Response::parse(&bytes, 24).unwrap();
        let sample = SEN54.decode_sample(&response).unwrap();
        assert_eq!(sample.len(), 7);
        assert_eq!(sample.get("pm1"), Some(10.0));
        assert_eq!(sample.get("h"), Some(50.0));
        assert_eq!(sample.get("voc"), Some(100.0));
        assert_eq!(sample.get("t"), Some(-32641.0 / 200.0));
        assert_eq!(sample.get("t"), SEN54.sentinel_value("t"));
    }

    #[test]
    fn sentinel_value_depends_on_field() {
        assert_eq!(SEN55.sentinel_value("t"), Some(-163.205));
        assert_eq!(SEN55.sentinel_value("nox"), Some(-3264.1));
        assert_eq!(SEN55.sentinel_value("pm2"), Some(3289.5));
        assert_eq!(SEN55.sentinel_value("co2"), None);
        assert_eq!(SHT40.sentinel_value("t"), None);
    }

    #[test]
    fn whole_sample_policy_rejects() {
        let mut bytes = framed(&[[0x66, 0x00], [0x81, 0x00]]);
        bytes[5] ^= 0x01;
        let response = Response::parse(&bytes, 6).unwrap();
        assert_eq!(
            SHT40.decode_sample(&response).unwrap_err(),
            ProtocolError::ChecksumMismatch { word: 1 }
        );
    }

    #[test]
    fn sen5x_selection() {
        assert_eq!(sen5x_for_product("SEN55").model, "SEN55");
        assert_eq!(sen5x_for_product("SEN54").model, "SEN54");
        assert!(SEN55.commands.nox_tuning.is_some());
        assert!(SEN54.commands.nox_tuning.is_none());
    }

    #[test]
    fn sps30_field_order() {
        let names: Vec<_> = SPS30_FLOAT.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, SPS30_FIELD_NAMES);
        assert_eq!(SPS30_FLOAT_IEEE754.fields[0].encoding, Encoding::Ieee754);
        assert_eq!(SPS30_FLOAT_IEEE754.model, "SPS30");
    }
}
