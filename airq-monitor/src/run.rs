//! The monitor loop.
//!
//! Each cycle reads the SHT40 and BMP280, then the particulate sensor, and
//! prints a sensor.community payload after each. The particulate sensor is then
//! stopped until shortly before the next cycle, which saves its fan and laser.
use std::fmt;
use std::thread;
use std::time::Instant;

use airq_sensors::{MeasurementSample, StatusRegister};
use airq_sensors::restart::RestartSchedule;
use airq_sensors::sht4x::Precision;
use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::sensors;
use crate::telemetry::{Push, tmep_query};

fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if deadline > now {
        thread::sleep(deadline - now);
    }
}

fn emit(config: &Config, pin: u16, sample: &MeasurementSample) {
    println!("{}", Push::new(&config.sensor_community, pin, sample));
    if !config.tmep.quantities.is_empty() {
        println!(
            "TMEP {}",
            tmep_query(&config.tmep.quantities, sample, config.tmep.precision)
        );
    }
}

/// Log the startup status read. A failure is not fatal.
fn log_status<E: fmt::Display>(model: &str, status: Result<StatusRegister, E>) {
    match status {
        Ok(status) => info!("{model} status {status}"),
        Err(err) => warn!("reading {model} status failed: {err}"),
    }
}

/// Run until `cycles` have completed (forever if `None`) or a sensor fails.
///
/// On failure the sessions are dropped, which stops the particulate sensor and
/// cancels its pending restart.
pub(crate) fn run(config: &Config, cycles: Option<u64>) -> anyhow::Result<()> {
    let precision = Precision::from(config.sht40.precision);
    let mut sht = sensors::open_sht40(config)?;
    let mut bmp = sensors::open_bmp280(config)?;
    let mut particulate = sensors::open_particulate(config)?;

    if particulate.profile().commands.auto_cleaning_interval.is_some() {
        let interval = particulate
            .write_auto_cleaning_interval(config.particulate.auto_cleaning_interval())
            .context("setting the auto-cleaning interval")?;
        info!("auto-cleaning every {} s", interval.as_secs());
    }
    log_status(particulate.profile().model, particulate.read_status());

    particulate.start().context("starting measurement")?;
    info!(
        "waiting {} s for readings to stabilise",
        config.sampling.stabilization_secs
    );
    thread::sleep(config.sampling.stabilization());

    let period = config.sampling.period();
    let restart_delay = RestartSchedule::delay_for(period, config.sampling.restart_margin());
    let mut completed = 0;
    loop {
        let started = Instant::now();

        let mut values = sht.measure(precision).context("reading SHT40")?;
        values.merge_missing(&bmp.read_sample().context("reading BMP280")?);
        emit(config, config.sensor_community.sht_pin, &values);

        let particles = particulate
            .read_when_ready()
            .context("reading particulate sensor")?;
        values.merge_missing(&particles);
        emit(config, config.sensor_community.sps_pin, &values);

        particulate
            .stop_and_restart_after(Instant::now(), restart_delay)
            .context("stopping measurement")?;

        completed += 1;
        if cycles.is_some_and(|n| completed >= n) {
            break;
        }

        if let Some(deadline) = particulate.restart_deadline() {
            sleep_until(deadline);
        }
        if particulate.service_restart(Instant::now())? {
            debug!("measurement restarted");
        }
        sleep_until(started + period);
    }

    info!("{completed} cycles completed");
    particulate.close()?;
    bmp.close()?;
    sht.close()?;
    Ok(())
}
