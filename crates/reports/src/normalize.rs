//! Result normalization: engine rows in, report records out.

use chrono::{DateTime, Utc};
use fluxline::client::RowStream;
use fluxline::Value;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// One normalized result row: when, which field, what value.
///
/// `value` is `Null` for empty buckets when the aggregation asked for
/// empty-bucket creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub time: DateTime<Utc>,
    pub field: String,
    pub value: Value,
}

/// Drain a row cursor into a materialized record sequence, preserving
/// engine order.
///
/// Iteration errors do not discard what was already decoded: the partial
/// records come back alongside the error so the caller can choose to use or
/// drop them.
pub(crate) async fn collect(mut rows: RowStream) -> (Vec<ReportRecord>, Option<fluxline::Error>) {
    let mut records = Vec::new();
    while let Some(item) = rows.next().await {
        match item {
            Ok(row) => records.push(ReportRecord {
                time: row.time,
                field: row.field,
                value: row.value,
            }),
            Err(error) => return (records, Some(error)),
        }
    }
    (records, None)
}
