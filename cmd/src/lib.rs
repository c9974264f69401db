use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use color_eyre::eyre::{ensure, Result, WrapErr};
use serde::Serialize;
use sensordist::{
    columns::{self, ColumnOverrides},
    loader, normalize,
    render::{self, ChartStyle, Legend},
    summary::Summary,
    value::{Bucket, ValueRange},
    Aggregator, Interval,
};

/// Everything a run needs to know, filled from the command line.
#[derive(Debug, Clone)]
pub struct Options {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Exact output file; only valid with a single interval.
    pub output: Option<PathBuf>,
    pub intervals: Vec<Interval>,
    pub columns: ColumnOverrides,
    pub style: ChartStyle,
    /// Aggregate and report without writing images.
    pub dry_run: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data.csv"),
            output_dir: PathBuf::from("."),
            output: None,
            intervals: Interval::all().collect(),
            columns: ColumnOverrides::default(),
            style: ChartStyle::default(),
            dry_run: false,
        }
    }
}

impl Options {
    pub fn output_path(&self, interval: Interval) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => self.output_dir.join(interval.file_name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartOutcome {
    Saved { path: PathBuf },
    /// No events fell into any bucket.
    Skipped,
    /// Rendering was turned off.
    NotRendered,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub interval: Interval,
    pub buckets: Vec<Bucket>,
    pub outcome: ChartOutcome,
    #[serde(skip)]
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub input: PathBuf,
    pub time_column: String,
    pub value_column: Option<String>,
    pub total_rows: usize,
    pub dropped_rows: usize,
    pub value_range: Option<ValueRange>,
    pub charts: Vec<Chart>,
}

impl Report {
    pub fn saved(&self) -> impl Iterator<Item = &Path> {
        self.charts.iter().filter_map(|c| match &c.outcome {
            ChartOutcome::Saved { path } => Some(path.as_path()),
            _ => None,
        })
    }

    pub fn failed(&self) -> usize {
        self.charts
            .iter()
            .filter(|c| matches!(c.outcome, ChartOutcome::Failed { .. }))
            .count()
    }
}

/// Loads the input, then aggregates and renders one chart per interval.
///
/// A chart that fails to render is recorded in the report and the remaining
/// intervals still run.
pub async fn run(options: &Options) -> Result<Report> {
    ensure!(
        options.output.is_none() || options.intervals.len() == 1,
        "an explicit output file needs exactly one interval, got {}",
        options.intervals.len()
    );

    let table = loader::load(&options.input)
        .wrap_err_with(|| format!("failed to load {}", options.input.display()))?;
    let resolved = columns::resolve(&table.column_names(), &options.columns)?;
    let normalized = normalize::normalize(&table.batch, &resolved)?;
    let dataset = &normalized.dataset;

    let value_range = dataset.value_range();
    let legend = dataset
        .value_name()
        .zip(value_range)
        .map(|(name, range)| Legend {
            name: name.to_owned(),
            range,
        });

    if !options.dry_run {
        fs::create_dir_all(&options.output_dir)
            .wrap_err_with(|| format!("failed to create {}", options.output_dir.display()))?;
    }

    let aggregator = Aggregator::new(dataset)?;
    let mut charts = Vec::with_capacity(options.intervals.len());
    for &interval in &options.intervals {
        let buckets = aggregator
            .buckets(interval)
            .await
            .wrap_err_with(|| format!("failed to aggregate {interval} buckets"))?;
        let outcome = if buckets.is_empty() {
            ChartOutcome::Skipped
        } else if options.dry_run {
            ChartOutcome::NotRendered
        } else {
            let path = options.output_path(interval);
            let layout = render::layout(&buckets, interval, legend.as_ref(), &options.style);
            match render::render_png(&path, &layout, &options.style) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), bins = buckets.len(), "saved chart");
                    ChartOutcome::Saved { path }
                }
                Err(error) => {
                    tracing::error!(%interval, %error, "failed to render chart");
                    ChartOutcome::Failed {
                        error: error.to_string(),
                    }
                }
            }
        };
        charts.push(Chart {
            interval,
            summary: Summary::new(dataset, interval, &buckets),
            buckets,
            outcome,
        });
    }

    Ok(Report {
        input: options.input.clone(),
        time_column: resolved.time.name,
        value_column: resolved.value.map(|c| c.name),
        total_rows: normalized.total_rows,
        dropped_rows: normalized.dropped_rows,
        value_range,
        charts,
    })
}

impl fmt::Display for Chart {
    /// Bucket listing, save confirmation and summary.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} distribution:", self.interval)?;
        for bucket in &self.buckets {
            write!(
                f,
                "   {}: {} data points",
                bucket.start_time().format("%m-%d %H:%M"),
                bucket.count
            )?;
            if let Some(mean) = bucket.mean {
                write!(f, ", mean {mean:.2}")?;
            }
            writeln!(f)?;
        }
        match &self.outcome {
            ChartOutcome::Saved { path } => writeln!(
                f,
                "Saved: {} ({} bins)",
                path.display(),
                self.buckets.len()
            )?,
            ChartOutcome::Skipped => writeln!(f, "Skipped: no data")?,
            ChartOutcome::NotRendered => {}
            ChartOutcome::Failed { error } => writeln!(f, "Failed: {error}")?,
        }
        if let Some(summary) = &self.summary {
            writeln!(f, "{summary}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn test_output_path() {
        let mut options = Options {
            output_dir: PathBuf::from("out"),
            ..Default::default()
        };
        assert_eq!(
            options.output_path(Interval::FiveMinutes),
            Path::new("out/dist_5min.png")
        );
        options.output = Some(PathBuf::from("sensor_distribution.png"));
        assert_eq!(
            options.output_path(Interval::FiveMinutes),
            Path::new("sensor_distribution.png")
        );
    }

    #[test]
    fn test_chart_listing() {
        let start = 1_705_276_800_000_000; // 2024-01-15T00:00:00Z
        let chart = Chart {
            interval: Interval::FiveMinutes,
            buckets: vec![
                Bucket {
                    start,
                    count: 2,
                    mean: Some(21.25),
                },
                Bucket {
                    start: start + 300_000_000,
                    count: 1,
                    mean: None,
                },
            ],
            outcome: ChartOutcome::Saved {
                path: PathBuf::from("dist_5min.png"),
            },
            summary: None,
        };
        expect![[r#"
            5min distribution:
               01-15 00:00: 2 data points, mean 21.25
               01-15 00:05: 1 data points
            Saved: dist_5min.png (2 bins)
        "#]]
        .assert_eq(&chart.to_string());

        let json = serde_json::to_string(&chart.outcome).unwrap();
        assert_eq!(json, r#"{"status":"saved","path":"dist_5min.png"}"#);
    }
}
