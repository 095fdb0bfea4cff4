#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod bmp280;
pub mod crc;
pub mod decode;
mod error;
pub mod frame;
mod identity;
pub mod profile;
pub mod restart;
mod sample;
pub mod sen5x;
pub mod session;
pub mod sht4x;
pub mod status;
mod transport;

pub use error::{Error, ProtocolError};
pub use identity::DeviceIdentity;
pub use profile::{DeviceProfile, FailurePolicy};
pub use sample::MeasurementSample;
pub use session::{
    CleaningGuard, CleaningInterlock, CleaningState, MeasurementSession, MeasurementState,
    SessionConfig,
};
pub use status::StatusRegister;
pub use transport::{I2cTransport, I2cTransportError, Transport};
