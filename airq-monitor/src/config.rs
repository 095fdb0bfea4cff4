//! Monitor configuration, read from a TOML file.
//!
//! Every section and field has a default, so a missing file or a file with only
//! a few keys is fine.
use std::path::Path;
use std::time::Duration;

use airq_sensors::profile::{self, DeviceProfile};
use airq_sensors::sht4x::Precision;
use airq_sensors::{CleaningGuard, SessionConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Sampling period and warm-up timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SamplingConfig {
    /// Minutes between samples.
    pub(crate) period_minutes: u64,
    /// Seconds before the next sample at which the particulate sensor is
    /// restarted.
    pub(crate) restart_margin_secs: u64,
    /// Seconds to wait after the first start before sampling.
    pub(crate) stabilization_secs: u64,
    /// Reads during fan cleaning: wait for it to finish, or fail.
    pub(crate) cleaning_guard: GuardSetting,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            period_minutes: 3,
            restart_margin_secs: 45,
            stabilization_secs: 30,
            cleaning_guard: GuardSetting::Defer,
        }
    }
}

impl SamplingConfig {
    pub(crate) fn period(&self) -> Duration {
        Duration::from_secs(self.period_minutes * 60)
    }

    pub(crate) fn restart_margin(&self) -> Duration {
        Duration::from_secs(self.restart_margin_secs)
    }

    pub(crate) fn stabilization(&self) -> Duration {
        Duration::from_secs(self.stabilization_secs)
    }

    pub(crate) fn session(&self) -> SessionConfig {
        SessionConfig {
            cleaning_guard: self.cleaning_guard.into(),
            ..SessionConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum GuardSetting {
    Reject,
    Defer,
}

impl From<GuardSetting> for CleaningGuard {
    fn from(value: GuardSetting) -> Self {
        match value {
            GuardSetting::Reject => CleaningGuard::Reject,
            GuardSetting::Defer => CleaningGuard::Defer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PrecisionSetting {
    High,
    Medium,
    Low,
}

impl From<PrecisionSetting> for Precision {
    fn from(value: PrecisionSetting) -> Self {
        match value {
            PrecisionSetting::High => Precision::High,
            PrecisionSetting::Medium => Precision::Medium,
            PrecisionSetting::Low => Precision::Low,
        }
    }
}

/// SHT4x humidity and temperature sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Sht40Config {
    pub(crate) bus: String,
    pub(crate) address: u8,
    pub(crate) precision: PrecisionSetting,
}

impl Default for Sht40Config {
    fn default() -> Self {
        Self {
            bus: "/dev/i2c-4".into(),
            address: 0x44,
            precision: PrecisionSetting::High,
        }
    }
}

/// BMP280 pressure sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Bmp280Config {
    pub(crate) bus: String,
    pub(crate) address: u8,
}

impl Default for Bmp280Config {
    fn default() -> Self {
        Self {
            bus: "/dev/i2c-4".into(),
            address: 0x77,
        }
    }
}

/// Particulate sensor model and output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum ParticulateModel {
    /// SPS30, float output, decoded as the monitor always has.
    #[serde(rename = "sps30")]
    Sps30,
    /// SPS30, float output, decoded as IEEE-754.
    #[serde(rename = "sps30-ieee754")]
    Sps30Ieee754,
    /// SPS30, integer output.
    #[serde(rename = "sps30-integer")]
    Sps30Integer,
    /// SEN54 or SEN55, detected from the product name.
    #[serde(rename = "sen5x")]
    Sen5x,
}

impl ParticulateModel {
    /// Profile for the SPS30 models; `None` for the SEN5x, which is detected.
    pub(crate) fn profile(self) -> Option<&'static DeviceProfile> {
        match self {
            Self::Sps30 => Some(&profile::SPS30_FLOAT),
            Self::Sps30Ieee754 => Some(&profile::SPS30_FLOAT_IEEE754),
            Self::Sps30Integer => Some(&profile::SPS30_INTEGER),
            Self::Sen5x => None,
        }
    }
}

/// Particulate matter sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ParticulateConfig {
    pub(crate) model: ParticulateModel,
    pub(crate) bus: String,
    pub(crate) address: u8,
    /// Automatic fan-cleaning interval written at startup. 0 disables it.
    pub(crate) auto_cleaning_days: u32,
}

impl Default for ParticulateConfig {
    fn default() -> Self {
        Self {
            model: ParticulateModel::Sps30,
            bus: "/dev/i2c-3".into(),
            address: 0x69,
            auto_cleaning_days: 5,
        }
    }
}

impl ParticulateConfig {
    pub(crate) fn auto_cleaning_interval(&self) -> Duration {
        days(self.auto_cleaning_days)
    }
}

pub(crate) fn days(days: u32) -> Duration {
    Duration::from_secs(u64::from(days) * 24 * 60 * 60)
}

/// sensor.community upload identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SensorCommunityConfig {
    /// Value of the X-Sensor header, e.g. `raspi-0000000012345678`.
    pub(crate) sensor_id: String,
    /// X-Pin for the humidity, temperature and pressure payload.
    pub(crate) sht_pin: u16,
    /// X-Pin for the particulate payload.
    pub(crate) sps_pin: u16,
    pub(crate) software_version: String,
    pub(crate) sampling_rate: u32,
}

impl Default for SensorCommunityConfig {
    fn default() -> Self {
        Self {
            sensor_id: "raspi-xxxxxx".into(),
            sht_pin: 11,
            sps_pin: 1,
            software_version: concat!("airqmon-", env!("CARGO_PKG_VERSION")).into(),
            sampling_rate: 60,
        }
    }
}

/// TMEP.cz query string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct TmepConfig {
    /// Fields to include, in order. Empty disables the query string.
    pub(crate) quantities: Vec<String>,
    /// Decimal places.
    pub(crate) precision: usize,
}

impl Default for TmepConfig {
    fn default() -> Self {
        Self {
            quantities: Vec::new(),
            precision: 3,
        }
    }
}

/// Root of `airqmon.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) sampling: SamplingConfig,
    pub(crate) sht40: Sht40Config,
    pub(crate) bmp280: Bmp280Config,
    pub(crate) particulate: ParticulateConfig,
    pub(crate) sensor_community: SensorCommunityConfig,
    pub(crate) tmep: TmepConfig,
}

impl Config {
    /// Read the configuration file, falling back to defaults if it is missing.
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found, using default configuration", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        info!("configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Problems that make the configuration unusable.
    pub(crate) fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.sampling.period_minutes == 0 {
            errors.push("sampling.period_minutes must be at least 1".into());
        }
        if self.sampling.restart_margin() >= self.sampling.period() {
            errors.push(format!(
                "sampling.restart_margin_secs ({}) must be shorter than the period",
                self.sampling.restart_margin_secs
            ));
        }
        for (name, address) in [
            ("sht40", self.sht40.address),
            ("bmp280", self.bmp280.address),
            ("particulate", self.particulate.address),
        ] {
            if address > 0x7F {
                errors.push(format!("{name}.address {address:#04X} is not a 7-bit address"));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "errors: {errors:?}");
        assert_eq!(config.sampling.period(), Duration::from_secs(180));
        assert_eq!(
            config.particulate.auto_cleaning_interval(),
            Duration::from_secs(432_000)
        );
    }

    #[test]
    fn partial_file() {
        let config: Config = toml::from_str(
            r#"
            [sampling]
            period_minutes = 5
            cleaning_guard = "reject"

            [particulate]
            model = "sen5x"
            address = 0x69

            [sht40]
            precision = "low"

            [sensor_community]
            sensor_id = "raspi-0000000012345678"
            "#,
        )
        .unwrap();
        assert_eq!(config.sampling.period_minutes, 5);
        assert_eq!(config.sampling.restart_margin_secs, 45);
        assert_eq!(config.sampling.session().cleaning_guard, CleaningGuard::Reject);
        assert_eq!(config.particulate.model, ParticulateModel::Sen5x);
        assert!(config.particulate.model.profile().is_none());
        assert_eq!(config.sht40.precision, PrecisionSetting::Low);
        assert_eq!(config.sht40.bus, "/dev/i2c-4");
        assert_eq!(config.sensor_community.sps_pin, 1);
    }

    #[test]
    fn rejects_unusable_timing() {
        let mut config = Config::default();
        config.sampling.restart_margin_secs = 180;
        config.bmp280.address = 0xEE;
        assert_eq!(config.validate().len(), 2);
    }

    #[test]
    fn unknown_model_is_an_error() {
        assert!(toml::from_str::<Config>("[particulate]\nmodel = \"sds011\"").is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.particulate.model, config.particulate.model);
        assert_eq!(parsed.sampling.cleaning_guard, GuardSetting::Defer);
    }
}
