//! SHT4x single-shot measurement and heater commands.
//!
//! # Datasheet
//!
//! See table 9 (command overview) and section 4.9 (heater operation) of the SHT4x
//! datasheet. Wait times are the maximum measurement durations from table 4,
//! rounded up.
use crate::frame::Command;

/// Repeatability of a single-shot measurement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// High repeatability (factory default for this crate).
    #[default]
    High,
    /// Medium repeatability.
    Medium,
    /// Low repeatability.
    Low,
}

impl Precision {
    /// Measurement command for this precision.
    pub const fn command(self) -> Command {
        match self {
            Self::High => Command::new(&[0xFD]),
            Self::Medium => Command::new(&[0xF6]),
            Self::Low => Command::new(&[0xE0]),
        }
    }

    /// Time to wait before reading the result.
    pub const fn wait_ms(self) -> u32 {
        match self {
            Self::High => 10,
            Self::Medium => 5,
            Self::Low => 2,
        }
    }
}

/// Heater power and pulse length.
///
/// The heater runs for the pulse length, after which the device performs a
/// high-precision measurement. The names give the power in mW and the pulse
/// length in seconds.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaterSetting {
    /// 20 mW for 0.1 s.
    mW20_s0_1,
    /// 20 mW for 1 s.
    mW20_s1,
    /// 110 mW for 0.1 s.
    mW110_s0_1,
    /// 110 mW for 1 s.
    mW110_s1,
    /// 200 mW for 0.1 s.
    mW200_s0_1,
    /// 200 mW for 1 s.
    mW200_s1,
}

impl HeaterSetting {
    /// Heater activation command.
    pub const fn command(self) -> Command {
        match self {
            Self::mW20_s0_1 => Command::new(&[0x15]),
            Self::mW20_s1 => Command::new(&[0x1E]),
            Self::mW110_s0_1 => Command::new(&[0x24]),
            Self::mW110_s1 => Command::new(&[0x2F]),
            Self::mW200_s0_1 => Command::new(&[0x32]),
            Self::mW200_s1 => Command::new(&[0x39]),
        }
    }

    /// Time to wait for the pulse and the following measurement.
    pub const fn wait_ms(self) -> u32 {
        match self {
            Self::mW20_s0_1 | Self::mW110_s0_1 | Self::mW200_s0_1 => 110,
            Self::mW20_s1 | Self::mW110_s1 | Self::mW200_s1 => 1_100,
        }
    }
}
