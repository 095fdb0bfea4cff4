//! Device status register.
//!
//! The SEN5x and SPS30 report a 32-bit status register as two words. Individual
//! bits flag fan, laser and sensor faults. Bit positions in this module are counted
//! from the most-significant bit, as in the datasheet tables, so bit 0 is the top
//! bit of the first data byte.

use bit_field::BitField;

use crate::error::ProtocolError;
use crate::frame::Response;

/// How much a status bit matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational, does not affect [`StatusRegister::ok`].
    Info,
    /// The device is measuring, but outside its specification.
    Warning,
    /// A component of the device has failed.
    Error,
}

/// A single named bit in the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBit {
    /// Bit position counted from the most-significant bit (0..=31).
    pub position: u8,
    /// Short condition name, e.g. `"fan"`.
    pub name: &'static str,
    /// What the set bit means, e.g. `"0rpm"`.
    pub detail: &'static str,
    /// Whether the set bit is a fault.
    pub severity: Severity,
}

impl StatusBit {
    const fn new(position: u8, name: &'static str, detail: &'static str, severity: Severity) -> Self {
        Self {
            position,
            name,
            detail,
            severity,
        }
    }

    /// Returns true if this bit is set in `raw`.
    pub fn is_set(&self, raw: u32) -> bool {
        raw.get_bit(31 - usize::from(self.position))
    }
}

/// Mapping of status bits to conditions for one device model.
///
/// Bits not in the map are ignored when decoding.
pub type StatusMap = &'static [StatusBit];

/// Status bits of the SEN5x.
pub const SEN5X_STATUS: StatusMap = &[
    StatusBit::new(10, "speed", "high/low", Severity::Warning),
    StatusBit::new(12, "cleaning", "cleaning", Severity::Info),
    StatusBit::new(24, "gas", "error", Severity::Error),
    StatusBit::new(25, "rht", "error", Severity::Error),
    StatusBit::new(26, "laser", "outofrange", Severity::Error),
    StatusBit::new(27, "fan", "0rpm", Severity::Error),
];

/// Status bits of the SPS30.
pub const SPS30_STATUS: StatusMap = &[
    StatusBit::new(10, "speed", "high/low", Severity::Warning),
    StatusBit::new(26, "laser", "outofrange", Severity::Error),
    StatusBit::new(27, "fan", "0rpm", Severity::Error),
];

/// Decoded device status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRegister {
    /// The raw 32-bit register value.
    pub raw: u32,
    /// Mapped bits that are set, in map order.
    pub conditions: Vec<StatusBit>,
}

impl StatusRegister {
    /// Decode a raw register value with the given bit map.
    pub fn decode(raw: u32, map: StatusMap) -> Self {
        Self {
            raw,
            conditions: map.iter().filter(|bit| bit.is_set(raw)).copied().collect(),
        }
    }

    /// Decode the two-word status response.
    ///
    /// A checksum failure on either word fails the decode, which is distinct from
    /// a register with no bits set.
    /// A response shorter than two words is an incomplete frame.
    pub fn from_response(response: &Response, map: StatusMap) -> Result<Self, ProtocolError> {
        let bytes = response.verified_leading_bytes(2)?;
        let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(Self::decode(raw, map))
    }

    /// False if any warning or error condition is set.
    pub fn ok(&self) -> bool {
        self.conditions
            .iter()
            .all(|bit| bit.severity == Severity::Info)
    }

    /// Returns true if the named condition is set.
    pub fn contains(&self, name: &str) -> bool {
        self.conditions.iter().any(|bit| bit.name == name)
    }

    /// Names of the set conditions.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.conditions.iter().map(|bit| bit.name)
    }
}

impl std::fmt::Display for StatusRegister {
    /// `OK`, or the set conditions as `/name-detail` pairs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "OK");
        }
        for bit in &self.conditions {
            write!(f, "/{}-{}", bit.name, bit.detail)?;
        }
        Ok(())
    }
}
