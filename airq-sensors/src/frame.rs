//! Outgoing command frames and incoming word-framed responses.
use crate::crc::crc8;
use crate::error::ProtocolError;

/// Number of bytes in one word on the wire: two data bytes and a checksum.
pub const WORD_LEN: usize = 3;

/// A sensor command: its opcode and any fixed payload words.
///
/// Sensirion parts use 2-byte opcodes, the SHT4x uses single bytes. Commands that
/// carry a fixed argument (such as the SPS30 output format selection) list it in
/// `payload`; the checksum for each payload word is added by [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Opcode bytes, sent first and without checksum.
    pub opcode: &'static [u8],
    /// Fixed payload words, each followed by its checksum on the wire.
    pub payload: &'static [u16],
}

impl Command {
    /// Command consisting of just an opcode.
    pub const fn new(opcode: &'static [u8]) -> Self {
        Self {
            opcode,
            payload: &[],
        }
    }

    /// Command with a fixed payload.
    pub const fn with_payload(opcode: &'static [u8], payload: &'static [u16]) -> Self {
        Self { opcode, payload }
    }

    /// Build the frame to be written for this command.
    pub fn frame(&self) -> Frame {
        let mut frame = Frame::new(self.opcode);
        for word in self.payload {
            frame.push_word(*word);
        }
        frame
    }
}

/// Outgoing frame under construction.
///
/// Each payload word is followed immediately by its own checksum, so a 4-byte
/// value is sent as `[b0, b1, crc(b0, b1), b2, b3, crc(b2, b3)]` after the opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Start a frame with the given opcode.
    pub fn new(opcode: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(opcode.len() + 2 * WORD_LEN);
        bytes.extend_from_slice(opcode);
        Self { bytes }
    }

    /// Append one big-endian payload word and its checksum.
    pub fn push_word(&mut self, word: u16) -> &mut Self {
        let data = word.to_be_bytes();
        self.bytes.extend_from_slice(&data);
        self.bytes.push(crc8(data));
        self
    }

    /// Append a 32-bit value as two words, most-significant word first.
    pub fn push_u32(&mut self, value: u32) -> &mut Self {
        self.push_word((value >> 16) as u16);
        self.push_word(value as u16)
    }

    /// The bytes to be written to the transport.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One word of a response, with the outcome of its checksum check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word {
    /// The two data bytes, most-significant first.
    pub data: [u8; 2],
    /// True if the trailing checksum byte matched `data`.
    pub valid: bool,
}

impl Word {
    /// Data bytes as a big-endian integer.
    pub fn value(&self) -> u16 {
        u16::from_be_bytes(self.data)
    }
}

/// Response split into words.
#[derive(Debug, Clone)]
pub struct Response {
    words: Vec<Word>,
}

impl Response {
    /// Split a raw response into words and check each checksum.
    ///
    /// `bytes` must be at least `expected_len` long, otherwise the response is an
    /// incomplete frame. Bytes past `expected_len` are ignored.
    pub fn parse(bytes: &[u8], expected_len: usize) -> Result<Self, ProtocolError> {
        if bytes.len() < expected_len {
            return Err(ProtocolError::IncompleteFrame {
                expected: expected_len,
                received: bytes.len(),
            });
        }
        let words = bytes[..expected_len]
            .chunks_exact(WORD_LEN)
            .map(|chunk| {
                let data = [chunk[0], chunk[1]];
                Word {
                    data,
                    valid: crate::crc::verify(data, chunk[2]),
                }
            })
            .collect();
        Ok(Self { words })
    }

    /// All words, including those that failed their checksum.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// All words, or the index of the first word that failed its checksum.
    pub fn verified(&self) -> Result<&[Word], ProtocolError> {
        match self.words.iter().position(|w| !w.valid) {
            Some(word) => Err(ProtocolError::ChecksumMismatch { word }),
            None => Ok(&self.words),
        }
    }

    /// Data bytes of every word, concatenated, if all checksums match.
    pub fn verified_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(self.verified()?.iter().flat_map(|w| w.data).collect())
    }

    /// Data bytes of the first `count` words, if all checksums match.
    ///
    /// A response holding fewer than `count` words is an incomplete frame.
    pub fn verified_leading_bytes(&self, count: usize) -> Result<Vec<u8>, ProtocolError> {
        if self.words.len() < count {
            return Err(ProtocolError::IncompleteFrame {
                expected: count * WORD_LEN,
                received: self.words.len() * WORD_LEN,
            });
        }
        let mut bytes = self.verified_bytes()?;
        bytes.truncate(count * 2);
        Ok(bytes)
    }

    /// Word values of every word, if all checksums match.
    pub fn verified_values(&self) -> Result<Vec<u16>, ProtocolError> {
        Ok(self.verified()?.iter().map(Word::value).collect())
    }
}
