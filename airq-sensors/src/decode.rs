//! Conversion of raw response words into physical values.
//!
//! Each field of a measurement is described by an [`Encoding`], which also fixes
//! how many words the field occupies in the response.

/// How a field's raw words are turned into a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    /// Unsigned 16-bit integer divided by `scale`.
    LinearUnsigned {
        /// Divisor applied to the raw value.
        scale: f32,
    },
    /// Two's-complement 16-bit integer divided by `scale`.
    LinearSigned {
        /// Divisor applied to the converted value.
        scale: f32,
    },
    /// `offset + span * raw / 65535`, as used by the SHT4x.
    RangeMapped {
        /// Value at raw 0.
        offset: f32,
        /// Difference between the values at raw 65535 and raw 0.
        span: f32,
    },
    /// 32-bit value decoded with the monitor's historical float conversion.
    ///
    /// See [`pseudo_float`] for how this differs from IEEE-754.
    PseudoFloat,
    /// 32-bit big-endian IEEE-754 single-precision value.
    Ieee754,
}

impl Encoding {
    /// Number of response words the field occupies.
    pub fn words(&self) -> usize {
        match self {
            Self::LinearUnsigned { .. } | Self::LinearSigned { .. } | Self::RangeMapped { .. } => 1,
            Self::PseudoFloat | Self::Ieee754 => 2,
        }
    }

    /// Decode the data bytes of a field.
    ///
    /// `data` holds the two data bytes of each word of the field, with checksums
    /// already removed. It must be exactly `2 * self.words()` bytes long.
    pub fn decode(&self, data: &[u8]) -> f32 {
        assert_eq!(data.len(), 2 * self.words(), "Field length mismatch.");
        match *self {
            Self::LinearUnsigned { scale } => linear_unsigned(word(data), scale),
            Self::LinearSigned { scale } => linear_signed(word(data), scale),
            Self::RangeMapped { offset, span } => range_mapped(word(data), offset, span),
            Self::PseudoFloat => pseudo_float(double_word(data)),
            Self::Ieee754 => f32::from_bits(double_word(data)),
        }
    }
}

fn word(data: &[u8]) -> u16 {
    u16::from_be_bytes([data[0], data[1]])
}

fn double_word(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

/// Unsigned raw value divided by `scale`.
pub fn linear_unsigned(raw: u16, scale: f32) -> f32 {
    f32::from(raw) / scale
}

/// Convert a raw word to its 16-bit two's-complement value.
///
/// Values of 32768 and above are negative (`raw - 65536`).
pub fn to_signed(raw: u16) -> i16 {
    raw as i16
}

/// Signed raw value divided by `scale`.
pub fn linear_signed(raw: u16, scale: f32) -> f32 {
    f32::from(to_signed(raw)) / scale
}

/// Map the full raw range linearly onto `offset..=offset + span`.
pub fn range_mapped(raw: u16, offset: f32, span: f32) -> f32 {
    // Computed in f64 so that raw 65535 maps exactly onto the top of the range.
    (f64::from(offset) + f64::from(span) * f64::from(raw) / 65_535.0) as f32
}

/// Decode the SPS30 "pseudo-float" 32-bit encoding.
///
/// The value is split like an IEEE-754 single: sign bit, 8-bit exponent with a bias
/// of 127, 23-bit mantissa. From there the conversion differs:
///
/// * a negative unbiased exponent is clamped to 0, so every magnitude below 1
///   decodes as 1 plus a fraction;
/// * the integer part is a `1` followed by the leading `exponent` mantissa bits
///   (all 23 if the exponent is larger);
/// * the remaining mantissa bits are summed as 2⁻¹, 2⁻², …;
/// * the sign applies to the integer part only, the fraction is always added.
///
/// The result is rounded to three decimal places, exact ties to even. For the positive values of at
/// least 1 that particulate sensors report this agrees with IEEE-754 to that
/// precision.
pub fn pseudo_float(raw: u32) -> f32 {
    const MANTISSA_BITS: u32 = 23;

    let negative = raw >> 31 == 1;
    let exponent = ((raw >> MANTISSA_BITS) & 0xFF) as i32 - 127;
    let integer_bits = exponent.clamp(0, MANTISSA_BITS as i32) as u32;
    let mantissa = raw & ((1 << MANTISSA_BITS) - 1);

    let fraction_bits = MANTISSA_BITS - integer_bits;
    let integer = (1u32 << integer_bits) | (mantissa >> fraction_bits);
    let fraction_mask = (1u32 << fraction_bits) - 1;
    let fraction = f64::from(mantissa & fraction_mask) / f64::from(1u32 << fraction_bits);

    let integer = if negative {
        -f64::from(integer)
    } else {
        f64::from(integer)
    };
    // At most 24 significant bits, so the scaling by 1000 is exact and ties
    // are real ties. These round to even.
    (((integer + fraction) * 1000.0).round_ties_even() / 1000.0) as f32
}
