use chrono::{DateTime, TimeZone, Utc};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

pub const FIELD_TIME: &str = "_timestamp";
pub const FIELD_VALUE: &str = "value";
pub const FIELD_BUCKET: &str = "bucket";
pub const FIELD_COUNT: &str = "count";
pub const FIELD_MEAN: &str = "mean";

/// Events falling into `[start, start + interval)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    /// Bucket start in microseconds since the Unix epoch
    pub start: i64,
    pub count: u64,
    /// Mean of the non-missing values, if there is a value column
    pub mean: Option<f64>,
}

impl Bucket {
    pub fn start_time(&self) -> DateTime<Utc> {
        datetime_from_micros(self.start)
    }
}

impl Serialize for Bucket {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("Bucket", 3)?;
        s.serialize_field("start", &self.start_time().to_rfc3339())?;
        s.serialize_field("count", &self.count)?;
        s.serialize_field("mean", &self.mean)?;
        s.end()
    }
}

/// Minimum and maximum of the value column over the whole dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Maps `value` onto `[0, 1]`. A degenerate range maps everything to the
    /// middle.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.max > self.min {
            ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }
}

pub fn datetime_from_micros(micros: i64) -> DateTime<Utc> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let range = ValueRange {
            min: 10.0,
            max: 30.0,
        };
        assert_eq!(range.normalize(10.0), 0.0);
        assert_eq!(range.normalize(20.0), 0.5);
        assert_eq!(range.normalize(30.0), 1.0);
        assert_eq!(range.normalize(100.0), 1.0);

        let flat = ValueRange {
            min: 21.5,
            max: 21.5,
        };
        assert_eq!(flat.normalize(21.5), 0.5);
    }

    #[test]
    fn test_datetime_from_micros() {
        assert_eq!(
            datetime_from_micros(1_500_000).to_rfc3339(),
            "1970-01-01T00:00:01.500+00:00"
        );
        assert_eq!(
            datetime_from_micros(-1).to_rfc3339(),
            "1969-12-31T23:59:59.999999+00:00"
        );
    }
}
