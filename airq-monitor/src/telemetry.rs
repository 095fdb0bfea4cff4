//! Payloads for the sensor.community push API and TMEP.cz.
//!
//! Only the payloads are built here; they are printed, not sent.
use airq_sensors::MeasurementSample;
use serde::Serialize;

use crate::config::SensorCommunityConfig;

/// sensor.community `value_type` for a sample field.
pub(crate) fn sensor_community_name(field: &str) -> Option<&'static str> {
    Some(match field {
        "t" => "temperature",
        "h" => "humidity",
        "p" => "pressure",
        "pm1" => "P0",
        "pm2" => "P2",
        "pm4" => "P4",
        "pm10" => "P1",
        "nc0" => "N05",
        "nc1" => "N1",
        "nc2" => "N25",
        "nc4" => "N4",
        "nc10" => "N10",
        "tps" => "TS",
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DataValue {
    pub(crate) value_type: &'static str,
    pub(crate) value: f32,
}

/// Body of a push request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Payload {
    pub(crate) software_version: String,
    pub(crate) sampling_rate: u32,
    pub(crate) sensordatavalues: Vec<DataValue>,
}

/// A push request: the headers identifying the sensor and its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Push {
    pub(crate) pin: u16,
    pub(crate) sensor: String,
    pub(crate) payload: Payload,
}

impl Push {
    /// Map the sample's fields to sensor.community names. Fields without a
    /// name (such as the SEN5x gas indices) are left out.
    pub(crate) fn new(config: &SensorCommunityConfig, pin: u16, sample: &MeasurementSample) -> Self {
        let sensordatavalues = sample
            .iter()
            .filter_map(|(field, value)| {
                sensor_community_name(field).map(|value_type| DataValue { value_type, value })
            })
            .collect();
        Self {
            pin,
            sensor: config.sensor_id.clone(),
            payload: Payload {
                software_version: config.software_version.clone(),
                sampling_rate: config.sampling_rate,
                sensordatavalues,
            },
        }
    }

    pub(crate) fn body(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.payload)
    }
}

impl std::fmt::Display for Push {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = self.body().map_err(|_| std::fmt::Error)?;
        write!(f, "X-Pin: {} X-Sensor: {} {}", self.pin, self.sensor, body)
    }
}

/// TMEP.cz query string: `name=value&` for each of `quantities` in the sample.
///
/// Pressure above 2000 is taken to be in Pa and sent in hPa.
pub(crate) fn tmep_query(quantities: &[String], sample: &MeasurementSample, precision: usize) -> String {
    let mut query = String::new();
    for name in quantities {
        let Some(mut value) = sample.get(name) else {
            continue;
        };
        if name == "p" && value > 2000.0 {
            value /= 100.0;
        }
        query.push_str(&format!("{name}={value:.precision$}&"));
    }
    query
}
