//! SEN5x algorithm and compensation parameters.
//!
//! # Datasheet
//!
//! See sections 6.1.11 to 6.1.16 of the SEN5x datasheet.
use crate::decode::{linear_signed, to_signed};

/// Tuning parameters of the VOC or NOx index algorithm.
///
/// Sent and received as six signed words, in field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmTuning {
    /// Index representing typical (average) conditions.
    pub index_offset: i16,
    /// Time constant to estimate the offset from history, in hours.
    pub learning_time_offset_hours: i16,
    /// Time constant to estimate the gain from history, in hours.
    pub learning_time_gain_hours: i16,
    /// Maximum duration of gating, in minutes.
    pub gating_max_duration_minutes: i16,
    /// Initial estimate for the standard deviation.
    pub std_initial: i16,
    /// Gain factor to amplify or attenuate the index output.
    pub gain_factor: i16,
}

impl AlgorithmTuning {
    /// Factory defaults of the VOC index algorithm.
    pub const VOC_DEFAULT: Self = Self {
        index_offset: 100,
        learning_time_offset_hours: 12,
        learning_time_gain_hours: 12,
        gating_max_duration_minutes: 180,
        std_initial: 50,
        gain_factor: 230,
    };

    /// Factory defaults of the NOx index algorithm.
    pub const NOX_DEFAULT: Self = Self {
        index_offset: 1,
        learning_time_offset_hours: 12,
        learning_time_gain_hours: 12,
        gating_max_duration_minutes: 720,
        std_initial: 50,
        gain_factor: 230,
    };

    pub(crate) fn from_words(words: &[u16]) -> Self {
        let w = |i: usize| to_signed(words[i]);
        Self {
            index_offset: w(0),
            learning_time_offset_hours: w(1),
            learning_time_gain_hours: w(2),
            gating_max_duration_minutes: w(3),
            std_initial: w(4),
            gain_factor: w(5),
        }
    }

    pub(crate) fn to_words(self) -> [u16; 6] {
        [
            self.index_offset as u16,
            self.learning_time_offset_hours as u16,
            self.learning_time_gain_hours as u16,
            self.gating_max_duration_minutes as u16,
            self.std_initial as u16,
            self.gain_factor as u16,
        ]
    }
}

/// Temperature compensation applied by the SEN5x to its temperature output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureCompensation {
    /// Constant offset, in °C.
    pub offset: f32,
    /// Offset slope, normalised.
    pub slope: f32,
    /// Time constant for applying changes, in seconds.
    pub time_constant_s: u16,
}

impl TemperatureCompensation {
    pub(crate) fn from_words(words: &[u16]) -> Self {
        Self {
            offset: linear_signed(words[0], 200.0),
            slope: linear_signed(words[1], 10_000.0),
            time_constant_s: words[2],
        }
    }
}

/// RH/T acceleration mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhtAcceleration {
    /// Low acceleration (default).
    Low,
    /// High acceleration.
    High,
    /// Medium acceleration.
    Medium,
    /// A value not defined in the datasheet.
    Unknown(u16),
}

#[doc(hidden)]
impl From<u16> for RhtAcceleration {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Low,
            1 => Self::High,
            2 => Self::Medium,
            other => Self::Unknown(other),
        }
    }
}
