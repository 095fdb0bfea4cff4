//! One-shot subcommands.
use airq_sensors::MeasurementSample;
use anyhow::{Context, bail};
use tracing::info;

use crate::cli::OutputFormat;
use crate::config::{self, Config};
use crate::sensors;
use crate::telemetry::{Push, tmep_query};

fn print_sample(label: &str, sample: &MeasurementSample) {
    let fields: Vec<String> = sample
        .iter()
        .map(|(name, value)| format!("{name}={value:.3}"))
        .collect();
    println!("{label:<8} {}", fields.join(" "));
}

pub(crate) fn info(config: &Config) -> anyhow::Result<()> {
    let mut sht = sensors::open_sht40(config)?;
    println!("SHT40    {}", sht.identity());
    sht.close()?;

    let bmp = sensors::open_bmp280(config)?;
    println!("BMP280   {:?}", bmp.calibration());
    bmp.close()?;

    let mut particulate = sensors::open_particulate(config)?;
    println!("{:<8} {}", particulate.profile().model, particulate.identity());
    if particulate.profile().commands.auto_cleaning_interval.is_some() {
        let interval = particulate.read_auto_cleaning_interval()?;
        println!(
            "         auto-cleaning every {:.1} days",
            interval.as_secs_f64() / 86_400.0
        );
    }
    particulate.close()?;
    Ok(())
}

pub(crate) fn read(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let mut sht = sensors::open_sht40(config)?;
    let climate = sht.measure(config.sht40.precision.into())?;
    sht.close()?;

    let mut bmp = sensors::open_bmp280(config)?;
    let pressure = bmp.read_sample()?;
    bmp.close()?;

    let mut particulate = sensors::open_particulate(config)?;
    particulate.start()?;
    let particles = particulate.read_when_ready()?;
    particulate.close()?;

    match format {
        OutputFormat::Text => {
            print_sample("SHT40", &climate);
            print_sample("BMP280", &pressure);
            print_sample(particulate.profile().model, &particles);
        }
        OutputFormat::SensorCommunity => {
            let mut values = climate;
            values.merge_missing(&pressure);
            let sc = &config.sensor_community;
            println!("{}", Push::new(sc, sc.sht_pin, &values));
            values.merge_missing(&particles);
            println!("{}", Push::new(sc, sc.sps_pin, &values));
        }
        OutputFormat::Tmep => {
            if config.tmep.quantities.is_empty() {
                bail!("no TMEP quantities configured");
            }
            let mut values = climate;
            values.merge_missing(&pressure);
            values.merge_missing(&particles);
            println!(
                "{}",
                tmep_query(&config.tmep.quantities, &values, config.tmep.precision)
            );
        }
    }
    Ok(())
}

pub(crate) fn status(config: &Config, clear: bool) -> anyhow::Result<()> {
    let mut particulate = sensors::open_particulate(config)?;
    let status = particulate.read_status()?;
    println!("{} status {} (raw {:#010X})", particulate.profile().model, status, status.raw);
    if clear {
        particulate.clear_status()?;
        info!("status register cleared");
    }
    particulate.close()?;
    Ok(())
}

pub(crate) fn clean(config: &Config) -> anyhow::Result<()> {
    let mut particulate = sensors::open_particulate(config)?;
    // Fan cleaning only runs while measuring.
    particulate.start()?;
    info!("fan cleaning for {} s", particulate.profile().timing.cleaning_ms / 1_000);
    particulate.start_cleaning().context("running fan cleaning")?;
    particulate.close()?;
    Ok(())
}

pub(crate) fn auto_clean(config: &Config, days: Option<u32>) -> anyhow::Result<()> {
    let mut particulate = sensors::open_particulate(config)?;
    let interval = match days {
        Some(days) => particulate.write_auto_cleaning_interval(config::days(days))?,
        None => particulate.read_auto_cleaning_interval()?,
    };
    println!(
        "auto-cleaning interval {} s ({:.1} days)",
        interval.as_secs(),
        interval.as_secs_f64() / 86_400.0
    );
    particulate.close()?;
    Ok(())
}
