/// One decoded measurement: field names mapped to values, in profile order.
///
/// Field names are the short names used throughout the monitor, such as `t`
/// (temperature, °C), `h` (relative humidity, %), `p` (pressure, Pa) or `pm2`
/// (PM2.5 mass concentration, µg/m³).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSample {
    values: Vec<(&'static str, f32)>,
}

impl MeasurementSample {
    /// Empty sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any existing value.
    pub fn insert(&mut self, name: &'static str, value: f32) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Value of a field, if present.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| *value)
    }

    /// Fields and values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.values.iter().copied()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the sample has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add the fields of `other` that this sample does not already have.
    ///
    /// Used to combine readings from several sensors, where the first sensor to
    /// report a quantity wins.
    pub fn merge_missing(&mut self, other: &MeasurementSample) {
        for (name, value) in other.iter() {
            if self.get(name).is_none() {
                self.values.push((name, value));
            }
        }
    }
}

impl FromIterator<(&'static str, f32)> for MeasurementSample {
    fn from_iter<T: IntoIterator<Item = (&'static str, f32)>>(iter: T) -> Self {
        let mut sample = Self::new();
        for (name, value) in iter {
            sample.insert(name, value);
        }
        sample
    }
}
