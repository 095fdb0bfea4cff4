//! Checksum used for every 2-byte word exchanged with the sensors.
//!
//! Each word on the bus is followed by a CRC-8 of its two data bytes, in both
//! directions. The parameters are shared by all the Sensirion parts supported by
//! this crate.
//!
//! # Datasheet
//!
//! See the "Checksum Calculation" section of the SEN5x, SPS30 or SHT4x datasheet.

/// CRC-8 generator polynomial, x⁸ + x⁵ + x⁴ + 1.
const POLYNOMIAL: u8 = 0x31;

/// Initial value of the CRC register.
const INITIAL: u8 = 0xFF;

/// Compute the checksum of a single word.
///
/// The checksum is processed most-significant bit first with no final XOR.
pub fn crc8(word: [u8; 2]) -> u8 {
    let mut crc = INITIAL;
    for byte in word {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Returns true if `checksum` matches the word's data bytes.
pub fn verify(word: [u8; 2], checksum: u8) -> bool {
    crc8(word) == checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasheet_vector() {
        assert_eq!(crc8([0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn zero_word() {
        assert_eq!(crc8([0x00, 0x00]), 0x81);
    }

    #[test]
    fn verify_accepts_computed_checksum_for_all_words() {
        for value in 0..=u16::MAX {
            let word = value.to_be_bytes();
            assert!(verify(word, crc8(word)), "word {value:#06X}");
        }
    }

    #[test]
    fn single_bit_flips_change_the_checksum() {
        for value in (0..=u16::MAX).step_by(97) {
            let checksum = crc8(value.to_be_bytes());
            for bit in 0..16 {
                let flipped = (value ^ (1 << bit)).to_be_bytes();
                assert_ne!(crc8(flipped), checksum, "{value:#06X} bit {bit}");
            }
        }
    }

    #[test]
    fn verify_rejects_wrong_checksum() {
        assert!(!verify([0xBE, 0xEF], 0x93));
    }
}
