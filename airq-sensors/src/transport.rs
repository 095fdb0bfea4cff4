//! Raw byte exchange with a sensor.
//!
//! The protocol code in this crate only needs to write a command frame and read a
//! fixed-length response. Bus addressing is construction state of the transport.
use embedded_hal::i2c::{I2c, SevenBitAddress};

/// Write and read raw bytes to and from one device.
///
/// A transport is owned exclusively by a single [`MeasurementSession`], so
/// commands to one device are never interleaved.
///
/// [`MeasurementSession`]: crate::MeasurementSession
pub trait Transport {
    /// Error reported by the underlying bus.
    type Error: core::fmt::Debug;

    /// Write a complete command frame.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read a response of `len` bytes.
    ///
    /// Implementations may return fewer bytes than requested, which the caller
    /// reports as an incomplete frame.
    fn read(&mut self, len: usize) -> Result<Vec<u8>, Self::Error>;

    /// Release the underlying bus handle.
    ///
    /// Called once when the owning session is closed.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// [`Transport`] over any [`embedded_hal`] I2C bus at a fixed 7-bit address.
///
/// Writes and reads are issued as separate transfers (each with START and STOP),
/// as the sensors require a processing delay between the command and the read.
#[derive(Debug)]
pub struct I2cTransport<I2C> {
    bus: Option<I2C>,
    address: SevenBitAddress,
}

impl<I2C: I2c> I2cTransport<I2C> {
    /// Bind the bus to the device at `address`.
    pub fn new(bus: I2C, address: SevenBitAddress) -> Self {
        Self {
            bus: Some(bus),
            address,
        }
    }

    /// 7-bit address of the device.
    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    /// Take the bus back, if the transport has not been closed.
    pub fn release(mut self) -> Option<I2C> {
        self.bus.take()
    }
}

/// Error from an [`I2cTransport`].
#[derive(Debug)]
pub enum I2cTransportError<E> {
    /// The I2C bus reported an error.
    Bus(E),
    /// The transport was used after [`Transport::close`].
    Released,
}

#[doc(hidden)]
impl<E> From<E> for I2cTransportError<E> {
    fn from(value: E) -> Self {
        Self::Bus(value)
    }
}

impl<I2C: I2c> Transport for I2cTransport<I2C> {
    type Error = I2cTransportError<I2C::Error>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let bus = self.bus.as_mut().ok_or(I2cTransportError::Released)?;
        bus.write(self.address, bytes)?;
        Ok(())
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>, Self::Error> {
        let bus = self.bus.as_mut().ok_or(I2cTransportError::Released)?;
        let mut buffer = vec![0u8; len];
        bus.read(self.address, &mut buffer)?;
        Ok(buffer)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        // Dropping the bus closes the underlying device handle.
        self.bus.take();
        Ok(())
    }
}
