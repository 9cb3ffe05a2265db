//! The report store: write one probe outcome, read many back.
//!
//! The store holds no mutable state of its own; the engine handle is shared
//! read-only, so calls may be issued concurrently without coordination.
//! There is no read-after-write guarantee (the engine may apply its own
//! commit latency) and no internal retry; deadlines belong to the caller,
//! who wraps a call in a timeout or drops the future to cancel.

use std::sync::Arc;

use fluxline::TimeSeries;
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::filter::ReportFilter;
use crate::metrics::{NoopMetrics, StoreMetrics};
use crate::normalize::{self, ReportRecord};
use crate::point::ReportPoint;
use crate::synth;

pub struct ReportStore {
    engine: Arc<dyn TimeSeries>,
    bucket: String,
    metrics: Arc<dyn StoreMetrics>,
}

impl std::fmt::Debug for ReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStore").field("bucket", &self.bucket).finish_non_exhaustive()
    }
}

impl ReportStore {
    pub fn new(engine: Arc<dyn TimeSeries>, bucket: impl Into<String>) -> Result<Self, ReportError> {
        Self::with_metrics(engine, bucket, Arc::new(NoopMetrics))
    }

    pub fn with_metrics(
        engine: Arc<dyn TimeSeries>,
        bucket: impl Into<String>,
        metrics: Arc<dyn StoreMetrics>,
    ) -> Result<Self, ReportError> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(ReportError::Configuration("bucket name must not be empty".into()));
        }
        Ok(Self { engine, bucket, metrics })
    }

    /// Persist one report point. The point is validated against its
    /// category vocabulary first; validation failures never reach the
    /// engine. A failed write persists nothing.
    pub async fn write(&self, point: &ReportPoint) -> Result<(), ReportError> {
        let category = point.category();
        point.validate()?;

        debug!(%category, "writing report point");
        let result = self.engine.write_point(&self.bucket, &point.to_point()).await;
        self.metrics.record_write(category, result.is_ok());
        result.map_err(|source| {
            warn!(%category, error = %source, "report write failed");
            ReportError::Write { category, source }
        })
    }

    /// Execute an ad-hoc filtered read.
    pub async fn read(&self, filter: &ReportFilter) -> Result<Vec<ReportRecord>, ReportError> {
        self.execute(filter).await
    }

    /// Read scoped to one project: a mandatory `project_id` filter layered
    /// over the caller's spec.
    pub async fn read_by_project(
        &self,
        filter: &ReportFilter,
        project_id: u64,
    ) -> Result<Vec<ReportRecord>, ReportError> {
        let scoped = filter.scoped(&[("project_id", project_id.to_string())])?;
        self.execute(&scoped).await
    }

    /// Read scoped to one project and, when `pipeline_id` is non-zero, one
    /// pipeline. Zero means "no pipeline scoping", not pipeline zero.
    pub async fn read_by_pipeline(
        &self,
        filter: &ReportFilter,
        project_id: u64,
        pipeline_id: u64,
    ) -> Result<Vec<ReportRecord>, ReportError> {
        let mut scope = vec![("project_id", project_id.to_string())];
        if pipeline_id != 0 {
            scope.push(("pipeline_id", pipeline_id.to_string()));
        }
        let scoped = filter.scoped(&scope)?;
        self.execute(&scoped).await
    }

    async fn execute(&self, filter: &ReportFilter) -> Result<Vec<ReportRecord>, ReportError> {
        let category = filter.category();
        let script = synth::synthesize(&self.bucket, filter);
        debug!(%category, %script, "executing report query");

        let rows = match self.engine.query(&script).await {
            Ok(rows) => rows,
            Err(source) => {
                self.metrics.record_read(category, 0, false);
                warn!(%category, error = %source, "report query failed");
                return Err(ReportError::Read { category, source, partial: Vec::new() });
            }
        };

        let (records, error) = normalize::collect(rows).await;
        match error {
            None => {
                self.metrics.record_read(category, records.len(), true);
                Ok(records)
            }
            Some(source) => {
                self.metrics.record_read(category, records.len(), false);
                warn!(
                    %category,
                    error = %source,
                    partial = records.len(),
                    "report row iteration failed"
                );
                Err(ReportError::Read { category, source, partial: records })
            }
        }
    }
}
