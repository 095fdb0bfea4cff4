/// Problems detected in a response from a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A word's data bytes did not match its trailing checksum byte.
    ///
    /// `word` is the 0-based index of the failing word within the response.
    #[error("checksum mismatch in response word {word}")]
    ChecksumMismatch {
        /// Index of the first word that failed its checksum.
        word: usize,
    },
    /// The transport returned fewer bytes than the command's response length.
    ///
    /// This is fatal to the read in question and is not retried internally.
    #[error("incomplete frame: expected {expected} bytes, received {received}")]
    IncompleteFrame {
        /// Response length defined for the command.
        expected: usize,
        /// Number of bytes actually returned.
        received: usize,
    },
}

/// Wrapper for problems when communicating with a sensor.
///
/// `E` is the error type of the underlying [`Transport`].
///
/// [`Transport`]: crate::Transport
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The sensor's response failed validation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The bus write or read failed.
    ///
    /// Transport errors are passed on to the caller without any retry.
    #[error("transport error: {0:?}")]
    Transport(E),
    /// A measurement was requested while the fan-cleaning cycle was running.
    ///
    /// Only returned when the session is configured with
    /// [`CleaningGuard::Reject`](crate::session::CleaningGuard::Reject).
    #[error("device is busy with fan cleaning")]
    DeviceBusy,
    /// Fan cleaning was requested during a measurement and the session is
    /// configured with
    /// [`CleaningInterlock::RejectWhileMeasuring`](crate::session::CleaningInterlock::RejectWhileMeasuring).
    #[error("fan cleaning refused while measuring")]
    MeasuringInterlock,
    /// The device profile has no command for the requested operation.
    ///
    /// For example, the SHT4x has no fan to clean.
    #[error("{0} is not supported by this device")]
    Unsupported(&'static str),
    /// A setting does not fit the device register it is written to.
    #[error("{0} is out of range for the device")]
    OutOfRange(&'static str),
    /// The session has already been closed and its transport released.
    #[error("session is closed")]
    Closed,
    /// The identity register of a BMP280 did not hold the expected chip id.
    #[error("unexpected device id {0:#04X}")]
    UnexpectedDeviceId(u8),
}

impl<E> Error<E> {
    /// Returns true if the error came from a failed word checksum.
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::ChecksumMismatch { .. }))
    }
}
