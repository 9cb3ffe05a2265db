//! The engine client boundary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::point::Point;
use crate::value::Value;

/// One decoded result row.
///
/// Standard (long-format) results carry the field name and its value;
/// pivoted results have no `_field` column, in which case `field` is empty
/// and the per-field values appear among `tags` typed per the response
/// annotations. Any non-system column is preserved in `tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub time: DateTime<Utc>,
    pub field: String,
    pub value: Value,
    pub tags: BTreeMap<String, String>,
}

/// Lazy cursor over query results. Yields rows in engine order; an `Err`
/// item ends the stream.
pub type RowStream = BoxStream<'static, Result<Row, Error>>;

/// A time-series engine reachable for point writes and Flux queries.
///
/// Implementations must be safe for concurrent use behind a shared
/// reference; callers issue writes and reads without coordination and
/// cancel by dropping the returned future.
#[async_trait]
pub trait TimeSeries: Send + Sync {
    /// Persist one point into the given bucket. Either the whole point is
    /// stored or the call fails; there is no partial write.
    async fn write_point(&self, bucket: &str, point: &Point) -> Result<(), Error>;

    /// Execute a Flux script and stream back the decoded rows.
    async fn query(&self, script: &str) -> Result<RowStream, Error>;
}
