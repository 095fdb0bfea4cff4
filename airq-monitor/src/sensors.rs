//! Opening the configured sensors on Linux I2C buses.
use airq_sensors::bmp280::{self, Bmp280};
use airq_sensors::profile::SHT40;
use airq_sensors::{I2cTransport, MeasurementSession, SessionConfig};
use anyhow::Context;
use linux_embedded_hal::{Delay, I2cdev};
use tracing::info;

use crate::config::Config;

pub(crate) type Bus = I2cTransport<I2cdev>;
pub(crate) type Session = MeasurementSession<Bus, Delay>;

fn transport(bus: &str, address: u8) -> anyhow::Result<Bus> {
    let device = I2cdev::new(bus).with_context(|| format!("opening I2C bus {bus}"))?;
    Ok(I2cTransport::new(device, address))
}

pub(crate) fn open_sht40(config: &Config) -> anyhow::Result<Session> {
    let sht = &config.sht40;
    let session = MeasurementSession::open(
        &SHT40,
        transport(&sht.bus, sht.address)?,
        Delay,
        SessionConfig::default(),
    )
    .with_context(|| format!("opening SHT40 at {:#04X} on {}", sht.address, sht.bus))?;
    info!("SHT40 {}", session.identity());
    Ok(session)
}

pub(crate) fn open_bmp280(config: &Config) -> anyhow::Result<Bmp280<Bus, Delay>> {
    let bmp = &config.bmp280;
    Bmp280::open(
        transport(&bmp.bus, bmp.address)?,
        Delay,
        bmp280::Settings::default(),
    )
    .with_context(|| format!("opening BMP280 at {:#04X} on {}", bmp.address, bmp.bus))
}

pub(crate) fn open_particulate(config: &Config) -> anyhow::Result<Session> {
    let particulate = &config.particulate;
    let transport = transport(&particulate.bus, particulate.address)?;
    let session_config = config.sampling.session();
    let session = match particulate.model.profile() {
        Some(profile) => MeasurementSession::open(profile, transport, Delay, session_config),
        None => MeasurementSession::open_sen5x(transport, Delay, session_config),
    }
    .with_context(|| {
        format!(
            "opening {:?} at {:#04X} on {}",
            particulate.model, particulate.address, particulate.bus
        )
    })?;
    info!("{} {}", session.profile().model, session.identity());
    Ok(session)
}
