//! Scripted transport and recording delay shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use airq_sensors::Transport;
use airq_sensors::crc::crc8;
use embedded_hal::delay::DelayNs;

#[derive(Debug, Default)]
struct Inner {
    reads: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    fail_writes: bool,
    fail_reads: bool,
    closed: usize,
}

/// Transport answering reads from a queue and recording every write.
///
/// Clones share state, so a test can keep a handle after moving the transport
/// into a session.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

/// Error injected by [`MockTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    Write,
    Read,
    Empty,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_read(&self, bytes: Vec<u8>) {
        self.inner.lock().unwrap().reads.push_back(bytes);
    }

    pub fn queue_words(&self, words: &[[u8; 2]]) {
        self.queue_read(framed(words));
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.inner.lock().unwrap().writes.clear();
    }

    pub fn set_write_error(&self, enable: bool) {
        self.inner.lock().unwrap().fail_writes = enable;
    }

    pub fn set_read_error(&self, enable: bool) {
        self.inner.lock().unwrap().fail_reads = enable;
    }

    pub fn closed(&self) -> usize {
        self.inner.lock().unwrap().closed
    }
}

impl Transport for MockTransport {
    type Error = MockError;

    fn write(&mut self, bytes: &[u8]) -> Result<(), MockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(MockError::Write);
        }
        inner.writes.push(bytes.to_vec());
        Ok(())
    }

    fn read(&mut self, _len: usize) -> Result<Vec<u8>, MockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(MockError::Read);
        }
        inner.reads.pop_front().ok_or(MockError::Empty)
    }

    fn close(&mut self) -> Result<(), MockError> {
        self.inner.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Delay that returns immediately and records each requested wait in ms.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    waits: Arc<Mutex<Vec<u32>>>,
}

impl RecordingDelay {
    pub fn waits(&self) -> Vec<u32> {
        self.waits.lock().unwrap().clone()
    }

    pub fn count(&self, ms: u32) -> usize {
        self.waits().iter().filter(|w| **w == ms).count()
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits.lock().unwrap().push(ns / 1_000_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.waits.lock().unwrap().push(us / 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.waits.lock().unwrap().push(ms);
    }
}

/// Words with their checksums, as the sensor would send them.
pub fn framed(words: &[[u8; 2]]) -> Vec<u8> {
    words
        .iter()
        .flat_map(|w| [w[0], w[1], crc8(*w)])
        .collect()
}

/// `words` padded with zero words to `count` words, then framed.
pub fn padded(words: &[[u8; 2]], count: usize) -> Vec<u8> {
    let mut all = words.to_vec();
    all.resize(count, [0, 0]);
    framed(&all)
}

/// Queue the identity responses an SPS30 sends when a session is opened.
pub fn queue_sps30_identity(transport: &MockTransport) {
    transport.queue_read(padded(&[*b"00", *b"08", *b"00", *b"00"], 4));
    transport.queue_read(padded(&[*b"F3", *b"A1", *b"B2", *b"C4"], 16));
    transport.queue_words(&[[2, 2]]);
}

/// Queue the identity responses of a SEN5x reporting `name`.
pub fn queue_sen5x_identity(transport: &MockTransport, name: &[u8; 5]) {
    transport.queue_read(padded(
        &[[name[0], name[1]], [name[2], name[3]], [name[4], 0]],
        16,
    ));
    transport.queue_read(padded(&[*b"12", *b"34", *b"56"], 16));
    transport.queue_words(&[[2, 0]]);
}

/// Queue an SHT4x serial number response.
pub fn queue_sht4x_identity(transport: &MockTransport) {
    transport.queue_words(&[[0x0F, 0x42], [0x40, 0x00]]);
}
