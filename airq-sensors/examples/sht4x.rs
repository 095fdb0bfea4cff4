//! Read an SHT4x humidity and temperature sensor over Linux I2C.
//!
//! The [SHT40, SHT41, SHT43 and SHT45][sht] share an I2C interface. This example
//! opens a session on the given bus, prints the serial number, then takes one
//! reading at each precision and one after a short heater pulse.
//!
//! ```text
//! cargo run --example sht4x -- /dev/i2c-1
//! ```
//!
//! [sht]: https://sensirion.com/products/catalog/SHT40
use airq_sensors::profile::SHT40;
use airq_sensors::sht4x::{HeaterSetting, Precision};
use airq_sensors::{I2cTransport, MeasurementSession, SessionConfig};
use linux_embedded_hal::{Delay, I2cdev};

/// Most SHT4x parts have the same 0x44 address.
///
/// Consult the "device overview" on p1 of the datasheet, as your particular part
/// may have the address 0x45 or 0x46.
const ADDRESS: u8 = 0x44;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "/dev/i2c-1".into());
    let bus = I2cdev::new(&path)?;
    let mut sht = MeasurementSession::open(
        &SHT40,
        I2cTransport::new(bus, ADDRESS),
        Delay,
        SessionConfig::default(),
    )?;
    println!("Sensor {}", sht.identity());

    for precision in [Precision::High, Precision::Medium, Precision::Low] {
        let sample = sht.measure(precision)?;
        println!(
            "{precision:?}:    {:.2}°C    {:.2}% humidity",
            sample.get("t").unwrap_or(f32::NAN),
            sample.get("h").unwrap_or(f32::NAN),
        );
    }

    // The reading after a heater pulse shows the sensor's own temperature rise.
    let heated = sht.activate_heater(HeaterSetting::mW20_s0_1)?;
    println!("After heating:    {:.2}°C", heated.get("t").unwrap_or(f32::NAN));

    sht.close()?;
    Ok(())
}
