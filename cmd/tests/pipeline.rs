use std::{fs, path::Path};

use sensor_dist::{run, ChartOutcome, Options};
use sensordist::{columns::ColumnOverrides, Error, Interval};
use tempfile::TempDir;

fn write_input(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("data.csv");
    fs::write(&path, content).unwrap();
    path
}

fn options(dir: &TempDir, input: &Path) -> Options {
    Options {
        input: input.to_owned(),
        output_dir: dir.path().join("charts"),
        ..Default::default()
    }
}

fn pngs(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "png"))
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn test_five_minute_scenario() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "entity_id,last_changed\n\
         sensor.door,2024-01-15 00:01:00\n\
         sensor.door,2024-01-15 00:02:00\n\
         sensor.door,2024-01-15 00:07:00\n\
         sensor.door,2024-01-15 00:12:00\n",
    );
    let options = Options {
        intervals: vec![Interval::FiveMinutes],
        dry_run: true,
        ..options(&dir, &input)
    };
    let report = run(&options).await.unwrap();
    assert_eq!(report.time_column, "last_changed");
    assert_eq!(report.value_column, None);
    assert_eq!(report.charts.len(), 1);

    let chart = &report.charts[0];
    assert_eq!(chart.outcome, ChartOutcome::NotRendered);
    let buckets = chart
        .buckets
        .iter()
        .map(|b| (b.start_time().format("%H:%M").to_string(), b.count))
        .collect::<Vec<_>>();
    assert_eq!(
        buckets,
        [
            ("00:00".to_owned(), 2),
            ("00:05".to_owned(), 1),
            ("00:10".to_owned(), 1)
        ]
    );
    assert_eq!(pngs(&options.output_dir), 0);
}

#[tokio::test]
async fn test_malformed_timestamp_is_dropped() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "entity_id;state;last_changed\n\
         sensor.t;10;2024-01-15T10:00:00Z\n\
         sensor.t;20;2024-01-15T10:01:00Z\n\
         sensor.t;99;not-a-date\n\
         sensor.t;30;2024-01-15T10:02:00Z\n\
         sensor.t;unavailable;2024-01-15T10:25:00Z\n",
    );
    let options = Options {
        dry_run: true,
        ..options(&dir, &input)
    };
    let report = run(&options).await.unwrap();
    assert_eq!(report.total_rows, 5);
    assert_eq!(report.dropped_rows, 1);
    assert_eq!(report.value_column.as_deref(), Some("state"));
    let range = report.value_range.unwrap();
    assert_eq!((range.min, range.max), (10.0, 30.0));

    for chart in &report.charts {
        let total: u64 = chart.buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, 4, "{}", chart.interval);
    }
    let twenty = report
        .charts
        .iter()
        .find(|c| c.interval == Interval::TwentyMinutes)
        .unwrap();
    assert_eq!(twenty.buckets.len(), 2);
    assert_eq!(twenty.buckets[0].mean, Some(20.0));
    // The only event of the second bucket has no usable value.
    assert_eq!(twenty.buckets[1].count, 1);
    assert_eq!(twenty.buckets[1].mean, None);
}

#[tokio::test]
async fn test_short_row_is_dropped() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "entity_id,state,last_changed\n\
         sensor.t,21.5,2024-01-15T10:00:00Z\n\
         sensor.t,22.0,2024-01-15T10:03:00Z\n\
         sensor.t,21.0\n",
    );
    let options = Options {
        intervals: vec![Interval::FiveMinutes],
        dry_run: true,
        ..options(&dir, &input)
    };
    let report = run(&options).await.unwrap();
    assert_eq!(report.time_column, "last_changed");
    assert_eq!(report.value_column.as_deref(), Some("state"));
    assert_eq!((report.total_rows, report.dropped_rows), (3, 1));
    let buckets = &report.charts[0].buckets;
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].count, 2);
    assert_eq!(buckets[0].mean, Some(21.75));
}

#[tokio::test]
async fn test_header_only_input_has_no_valid_data() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "time,temperature\n");
    let options = options(&dir, &input);
    let err = run(&options).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::NoValidData)
    ));
    assert_eq!(pngs(&options.output_dir), 0);
}

#[tokio::test]
async fn test_missing_input() {
    let dir = TempDir::new().unwrap();
    let options = options(&dir, &dir.path().join("nope.csv"));
    let err = run(&options).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::MissingInput(_))
    ));
}

#[tokio::test]
async fn test_unknown_override_column() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "time,temperature\n2024-01-15 00:00,1\n");
    let options = Options {
        columns: ColumnOverrides {
            time: Some("ts".to_owned()),
            ..Default::default()
        },
        dry_run: true,
        ..options(&dir, &input)
    };
    let err = run(&options).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::UnknownColumn(name)) if name == "ts"
    ));
}

#[tokio::test]
async fn test_output_file_needs_single_interval() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "time,temperature\n2024-01-15 00:00,1\n");
    let options = Options {
        output: Some(dir.path().join("sensor_distribution.png")),
        ..options(&dir, &input)
    };
    assert!(run(&options).await.is_err());
}

#[tokio::test]
async fn test_failed_chart_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "time,temperature\n2024-01-15 00:00,1\n2024-01-15 01:30,2\n",
    );
    let options = options(&dir, &input);
    // A directory where the 5min chart should go makes that chart fail.
    fs::create_dir_all(options.output_dir.join(Interval::FiveMinutes.file_name())).unwrap();

    let report = run(&options).await.unwrap();
    assert_eq!(report.charts.len(), 4);
    let five = &report.charts[1];
    assert_eq!(five.interval, Interval::FiveMinutes);
    assert!(matches!(five.outcome, ChartOutcome::Failed { .. }));
    assert_eq!(report.failed(), 1);
    assert_eq!(report.saved().count(), 3);
    assert_eq!(pngs(&options.output_dir), 3);
    assert!(report.charts.iter().all(|c| c.buckets.len() == 2));
}

#[tokio::test]
async fn test_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    let rows = (0..200)
        .map(|i| format!("2024-01-15T{:02}:{:02}:00Z\t{}", i / 60, i % 60, i % 7))
        .collect::<Vec<_>>()
        .join("\n");
    let input = write_input(&dir, &format!("timestamp\tvalue\n{rows}\n"));
    let options = Options {
        dry_run: true,
        ..options(&dir, &input)
    };
    let first = run(&options).await.unwrap();
    let second = run(&options).await.unwrap();
    for (a, b) in first.charts.iter().zip(&second.charts) {
        assert_eq!(a.buckets, b.buckets);
    }
}

#[tokio::test]
async fn test_renders_png_files() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "time,temperature\n2024-01-15 00:00,18.5\n2024-01-15 00:07,21\n2024-01-15 01:30,23.5\n",
    );
    let options = options(&dir, &input);
    let report = run(&options).await.unwrap();
    assert_eq!(report.failed(), 0);
    assert_eq!(report.saved().count(), 4);
    assert_eq!(pngs(&options.output_dir), 4);
    assert!(options.output_dir.join("dist_60min.png").exists());
}
