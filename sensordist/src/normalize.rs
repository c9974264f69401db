use std::sync::Arc;

use arrow::{
    array::{Array, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use itertools::{Itertools, MinMaxResult};

use crate::{
    columns::ResolvedColumns,
    value::{ValueRange, FIELD_TIME, FIELD_VALUE},
    Error, Result,
};

/// Zoned formats tried after RFC 3339.
const ZONED_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Formats without an offset; these are taken as UTC.
const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Events with a valid timestamp, in file order.
///
/// Holds a single batch with `_timestamp` (microseconds since the Unix epoch)
/// and, when a value column was resolved, a nullable `value` column.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
    value_name: Option<String>,
}

impl Dataset {
    pub fn new(timestamps: Vec<i64>, values: Option<(String, Vec<Option<f64>>)>) -> Result<Self> {
        let mut fields = vec![Field::new(FIELD_TIME, DataType::Int64, false)];
        let mut columns: Vec<Arc<dyn Array>> = vec![Arc::new(Int64Array::from(timestamps))];
        let value_name = values.map(|(name, values)| {
            fields.push(Field::new(FIELD_VALUE, DataType::Float64, true));
            columns.push(Arc::new(Float64Array::from(values)));
            name
        });
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Self { batch, value_name })
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the input column the values were read from.
    pub fn value_name(&self) -> Option<&str> {
        self.value_name.as_deref()
    }

    pub fn timestamps(&self) -> &Int64Array {
        self.batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("BUG: timestamp column is always Int64")
    }

    pub fn values(&self) -> Option<&Float64Array> {
        self.value_name.as_ref()?;
        self.batch
            .column_by_name(FIELD_VALUE)?
            .as_any()
            .downcast_ref::<Float64Array>()
    }

    /// Earliest and latest timestamp.
    pub fn time_span(&self) -> Option<(i64, i64)> {
        match self.timestamps().iter().flatten().minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(t) => Some((t, t)),
            MinMaxResult::MinMax(first, last) => Some((first, last)),
        }
    }

    /// Global range of the non-missing values, shared by every chart.
    pub fn value_range(&self) -> Option<ValueRange> {
        match self.values()?.iter().flatten().minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(v) => Some(ValueRange { min: v, max: v }),
            MinMaxResult::MinMax(min, max) => Some(ValueRange { min, max }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub dataset: Dataset,
    pub total_rows: usize,
    /// Rows dropped because of a missing or unparseable timestamp
    pub dropped_rows: usize,
}

/// Parses the timestamp column, drops rows it cannot parse and coerces the
/// value column to numbers. Unparseable values become missing; their rows are
/// kept.
pub fn normalize(table: &RecordBatch, columns: &ResolvedColumns) -> Result<Normalized> {
    let time_column = string_column(table, columns.time.index)?;
    let value_column = columns
        .value
        .as_ref()
        .map(|c| string_column(table, c.index).map(|array| (c.name.clone(), array)))
        .transpose()?;

    let mut timestamps = Vec::with_capacity(table.num_rows());
    let mut values = value_column
        .as_ref()
        .map(|_| Vec::with_capacity(table.num_rows()));
    for row in 0..table.num_rows() {
        let ts = time_column
            .is_valid(row)
            .then(|| parse_timestamp(time_column.value(row)))
            .flatten();
        let Some(ts) = ts else {
            continue;
        };
        timestamps.push(ts);
        if let (Some(values), Some((_, array))) = (values.as_mut(), value_column.as_ref()) {
            values.push(
                array
                    .is_valid(row)
                    .then(|| parse_value(array.value(row)))
                    .flatten(),
            );
        }
    }

    let total_rows = table.num_rows();
    let dropped_rows = total_rows - timestamps.len();
    if dropped_rows > 0 {
        tracing::warn!(
            dropped_rows,
            column = %columns.time.name,
            "rows with an unparseable timestamp were ignored"
        );
    }
    if timestamps.is_empty() {
        return Err(Error::NoValidData);
    }

    let values = value_column.zip(values).map(|((name, _), values)| (name, values));
    let dataset = Dataset::new(timestamps, values)?;
    tracing::info!(rows = dataset.len(), "normalized dataset");
    Ok(Normalized {
        dataset,
        total_rows,
        dropped_rows,
    })
}

/// Parses `s` into microseconds since the Unix epoch.
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.timestamp_micros());
    }
    if let Some(t) = ZONED_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(s, f).ok())
    {
        return Some(t.timestamp_micros());
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(Utc.from_utc_datetime(&naive).timestamp_micros())
}

fn parse_value(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn string_column(table: &RecordBatch, index: usize) -> Result<&StringArray> {
    table
        .column(index)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Internal(format!("column {index} is not a string column")))
}
