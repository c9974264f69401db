use std::time::Duration;

use serde::{Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

const MICROS_PER_MINUTE: i64 = 60 * 1_000_000;

/// Width of the time buckets events are grouped into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
)]
pub enum Interval {
    #[strum(to_string = "1min", serialize = "1m")]
    OneMinute,
    #[strum(to_string = "5min", serialize = "5m")]
    FiveMinutes,
    #[strum(to_string = "20min", serialize = "20m")]
    TwentyMinutes,
    #[strum(to_string = "60min", serialize = "60m", serialize = "1h")]
    SixtyMinutes,
}

impl Interval {
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    pub fn minutes(self) -> i64 {
        match self {
            Interval::OneMinute => 1,
            Interval::FiveMinutes => 5,
            Interval::TwentyMinutes => 20,
            Interval::SixtyMinutes => 60,
        }
    }

    pub fn micros(self) -> i64 {
        self.minutes() * MICROS_PER_MINUTE
    }

    pub fn duration(self) -> Duration {
        Duration::from_secs(self.minutes() as u64 * 60)
    }

    /// Default chart file name, e.g. `dist_5min.png`.
    pub fn file_name(self) -> String {
        format!("dist_{self}.png")
    }
}

impl Serialize for Interval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
