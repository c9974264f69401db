use std::sync::Arc;

use arrow::{
    array::{Array, Float64Array, Int64Array},
    record_batch::RecordBatch,
};
use datafusion::{
    datasource::MemTable,
    prelude::{avg, col, count, lit, Expr, SessionContext},
};

use crate::{
    normalize::Dataset,
    value::{Bucket, FIELD_BUCKET, FIELD_COUNT, FIELD_MEAN, FIELD_TIME, FIELD_VALUE},
    Error, Interval, Result,
};

pub const TABLE_NAME: &str = "events";

/// Groups the events of a [`Dataset`] into fixed-width time buckets.
///
/// Buckets are left-closed and anchored at the Unix epoch, so boundaries are
/// the same on every run. Every supported width divides a day, so the
/// boundaries also line up with midnight UTC.
pub struct Aggregator {
    ctx: SessionContext,
    has_value: bool,
}

impl Aggregator {
    /// Registers the dataset as an in-memory table.
    pub fn new(dataset: &Dataset) -> Result<Self> {
        let ctx = SessionContext::new();
        let batch = dataset.batch().clone();
        let provider = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
        ctx.register_table(TABLE_NAME, Arc::new(provider))?;
        Ok(Self {
            ctx,
            has_value: dataset.values().is_some(),
        })
    }

    /// Returns the non-empty buckets ordered by start time.
    ///
    /// `count` includes events without a value; `mean` averages only the
    /// events that have one.
    #[tracing::instrument(skip(self))]
    pub async fn buckets(&self, interval: Interval) -> Result<Vec<Bucket>> {
        let mut aggregates = vec![count(lit(1_i64)).alias(FIELD_COUNT)];
        if self.has_value {
            aggregates.push(avg(col(FIELD_VALUE)).alias(FIELD_MEAN));
        }

        let df = self
            .ctx
            .table(TABLE_NAME)
            .await?
            .aggregate(vec![bucket_start(interval).alias(FIELD_BUCKET)], aggregates)?
            .sort(vec![col(FIELD_BUCKET).sort(true, false)])?;
        let batches = df.collect().await?;

        let mut buckets = Vec::new();
        for batch in &batches {
            collect_buckets(batch, self.has_value, &mut buckets)?;
        }
        tracing::debug!(buckets = buckets.len(), "aggregated");
        Ok(buckets)
    }
}

/// `ts - ((ts % width) + width) % width`: floors the timestamp to a multiple
/// of the bucket width, pre-epoch instants included.
fn bucket_start(interval: Interval) -> Expr {
    let ts = col(FIELD_TIME);
    let width = lit(interval.micros());
    ts.clone() - ((ts % width.clone()) + width.clone()) % width
}

fn collect_buckets(batch: &RecordBatch, has_value: bool, out: &mut Vec<Bucket>) -> Result<()> {
    let starts = column::<Int64Array>(batch, FIELD_BUCKET)?;
    let counts = column::<Int64Array>(batch, FIELD_COUNT)?;
    let means = has_value
        .then(|| column::<Float64Array>(batch, FIELD_MEAN))
        .transpose()?;
    for i in 0..batch.num_rows() {
        let count = counts.value(i);
        if count <= 0 {
            continue;
        }
        out.push(Bucket {
            start: starts.value(i),
            count: count as u64,
            mean: means.and_then(|m| m.is_valid(i).then(|| m.value(i))),
        });
    }
    Ok(())
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::Internal(format!("column {name} is missing or mistyped")))
}
