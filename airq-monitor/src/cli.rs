use std::path::PathBuf;

use clap::Parser;

/// Air-quality monitor for Sensirion SPS30/SEN5x, SHT4x and Bosch BMP280 sensors
///
/// Reads particulate matter, humidity, temperature and pressure over Linux I2C
/// and prints sensor.community push payloads (and optionally TMEP.cz query
/// strings) to standard output. Nothing is sent over the network.
///
/// Bus paths, addresses, timing and upload identity come from the configuration
/// file; every setting has a default. Log verbosity follows RUST_LOG.
#[derive(Debug, Parser)]
#[command(version, about)]
pub(crate) struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "airqmon.toml")]
    pub(crate) config: PathBuf,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Parser)]
pub(crate) enum Commands {
    /// Print the identity of each sensor.
    Info,
    /// Take one reading from every sensor.
    Read {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Read the particulate sensor's status register.
    Status {
        /// Clear the register after reading it
        #[arg(long)]
        clear: bool,
    },
    /// Run the particulate sensor's fan-cleaning cycle.
    Clean,
    /// Read or set the automatic fan-cleaning interval.
    AutoClean {
        /// New interval in days (0 disables automatic cleaning)
        days: Option<u32>,
    },
    /// Run the monitor loop.
    Run {
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// One `field=value` line per sensor
    Text,
    /// sensor.community push payloads
    SensorCommunity,
    /// TMEP.cz query string
    Tmep,
}
