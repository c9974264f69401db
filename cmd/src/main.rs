use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use sensor_dist::{Options, Report};
use sensordist::{
    columns::{ColumnOverrides, ValueSelection},
    render::{ChartStyle, DEFAULT_LABEL_THRESHOLD, DEFAULT_MAX_TICKS},
    Interval,
};
use tracing_subscriber::EnvFilter;

/// Bar charts of sensor event counts per time bucket.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Delimited text file with a header row
    #[arg(short, long, default_value = "data.csv")]
    input: PathBuf,

    /// Directory the `dist_<interval>.png` charts are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Write the chart to this file instead; needs a single --interval
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Bucket widths: 1min, 5min, 20min, 60min [default: all]
    #[arg(long = "interval", value_delimiter = ',')]
    intervals: Vec<Interval>,

    /// Timestamp column, instead of guessing
    #[arg(long)]
    time_column: Option<String>,

    /// Value column, instead of guessing
    #[arg(long, conflicts_with = "no_value")]
    value_column: Option<String>,

    /// Count events only; bars are not colored
    #[arg(long)]
    no_value: bool,

    /// Label bars with their count when there are at most this many
    #[arg(long, default_value_t = DEFAULT_LABEL_THRESHOLD)]
    label_threshold: usize,

    /// Upper bound for the number of x axis ticks
    #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
    max_ticks: usize,

    /// Print the buckets as JSON
    #[arg(long)]
    json: bool,

    /// Aggregate without writing charts
    #[arg(long)]
    no_chart: bool,
}

impl Cli {
    fn options(self) -> Options {
        let value = match (self.no_value, self.value_column) {
            (true, _) => ValueSelection::Disabled,
            (false, Some(name)) => ValueSelection::Named(name),
            (false, None) => ValueSelection::Auto,
        };
        let intervals = if self.intervals.is_empty() {
            Interval::all().collect()
        } else {
            self.intervals
        };
        Options {
            input: self.input,
            output_dir: self.output_dir,
            output: self.output,
            intervals,
            columns: ColumnOverrides {
                time: self.time_column,
                value,
            },
            style: ChartStyle {
                label_threshold: self.label_threshold,
                max_ticks: self.max_ticks,
                ..Default::default()
            },
            dry_run: self.no_chart,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    let start_time = time::Instant::now();

    let report = sensor_dist::run(&cli.options()).await?;
    print_report(&report, json)?;
    tracing::info!(
        charts = report.saved().count(),
        failed = report.failed(),
        "done in {}",
        start_time.elapsed()
    );
    Ok(())
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "Processed {} records ({} dropped), time column {:?}, value column {:?}",
        report.total_rows - report.dropped_rows,
        report.dropped_rows,
        report.time_column,
        report.value_column.as_deref().unwrap_or("-"),
    );
    for chart in &report.charts {
        println!();
        print!("{chart}");
    }
    Ok(())
}
