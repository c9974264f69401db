use std::{cmp::Reverse, fmt};

use crate::{
    value::{datetime_from_micros, Bucket},
    Dataset, Interval,
};

/// Run statistics printed after the charts.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub interval: Interval,
    pub total_points: usize,
    /// Earliest and latest event, microseconds since the Unix epoch
    pub first: i64,
    pub last: i64,
    pub buckets: usize,
    pub mean_per_bucket: f64,
    /// Earliest of the buckets with the highest count
    pub busiest: Bucket,
}

impl Summary {
    /// Returns `None` when there is nothing to summarize.
    pub fn new(dataset: &Dataset, interval: Interval, buckets: &[Bucket]) -> Option<Self> {
        let (first, last) = dataset.time_span()?;
        let busiest = *buckets.iter().min_by_key(|b| Reverse(b.count))?;
        Some(Self {
            interval,
            total_points: dataset.len(),
            first,
            last,
            buckets: buckets.len(),
            mean_per_bucket: dataset.len() as f64 / buckets.len() as f64,
            busiest,
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SPAN_FORMAT: &str = "%Y-%m-%d %H:%M";
        writeln!(f, "Summary:")?;
        writeln!(f, "   total points: {}", self.total_points)?;
        writeln!(
            f,
            "   time span: {} to {}",
            datetime_from_micros(self.first).format(SPAN_FORMAT),
            datetime_from_micros(self.last).format(SPAN_FORMAT)
        )?;
        writeln!(f, "   {} buckets: {}", self.interval, self.buckets)?;
        writeln!(f, "   average points per bucket: {:.1}", self.mean_per_bucket)?;
        write!(
            f,
            "   busiest bucket: {} ({} points)",
            self.busiest.start_time().format("%m-%d %H:%M"),
            self.busiest.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    const MINUTE: i64 = 60 * 1_000_000;
    // 2024-01-15T00:00:00Z
    const MIDNIGHT: i64 = 1_705_276_800_000_000;

    fn bucket(minute: i64, count: u64) -> Bucket {
        Bucket {
            start: MIDNIGHT + minute * MINUTE,
            count,
            mean: None,
        }
    }

    #[test]
    fn test_summary() {
        let timestamps = [12, 1, 7, 2].map(|m| MIDNIGHT + m * MINUTE).to_vec();
        let dataset = Dataset::new(timestamps, None).unwrap();
        let buckets = [bucket(0, 2), bucket(5, 1), bucket(10, 1)];
        let summary = Summary::new(&dataset, Interval::FiveMinutes, &buckets).unwrap();
        assert_eq!(summary.busiest, buckets[0]);
        expect![[r#"
            Summary:
               total points: 4
               time span: 2024-01-15 00:01 to 2024-01-15 00:12
               5min buckets: 3
               average points per bucket: 1.3
               busiest bucket: 01-15 00:00 (2 points)"#]]
        .assert_eq(&summary.to_string());
    }

    #[test]
    fn test_busiest_prefers_earliest() {
        let dataset = Dataset::new(vec![MIDNIGHT], None).unwrap();
        let buckets = [bucket(0, 1), bucket(1, 3), bucket(2, 3)];
        let summary = Summary::new(&dataset, Interval::OneMinute, &buckets).unwrap();
        assert_eq!(summary.busiest, buckets[1]);
        assert!(Summary::new(&dataset, Interval::OneMinute, &[]).is_none());
    }
}
