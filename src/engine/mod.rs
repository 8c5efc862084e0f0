pub mod bulk_v1;
pub mod bulk_v2;
pub mod rest;

pub use bulk_v1::BulkV1Engine;
pub use bulk_v2::BulkV2Engine;
pub use rest::RestEngine;

use crate::config::{BulkApiVersion, Operation, RunSettings};
use crate::error::{OrgBridgeError, Result};
use crate::model::Row;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle of one remote job. Terminal states are `JobComplete`,
/// `Aborted` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Undefined,
    Open,
    UploadStart,
    UploadComplete,
    InProgress,
    Closed,
    JobComplete,
    Aborted,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::JobComplete | JobState::Aborted | JobState::Failed
        )
    }
}

/// Structured status handed to the progress callback at each phase boundary
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub engine: String,
    pub job_id: String,
    pub object: String,
    pub state: JobState,
    pub processed: usize,
    pub total: usize,
}

/// Progress callback borrowed for the duration of one engine call
pub type OnProgress<'a> = &'a (dyn Fn(ProgressEvent) + Send + Sync);

/// No-op progress sink
pub fn no_progress() -> &'static (dyn Fn(ProgressEvent) + Send + Sync) {
    &|_| {}
}

/// One result row per input row, preserving input order: either the new
/// identifier (insert) or an error message.
#[derive(Debug, Clone, Default)]
pub struct ResultRow {
    pub id: Option<String>,
    pub error: Option<String>,
}

impl ResultRow {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            id: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A created job: the identifier obtained from the engine plus the input
/// chunked by the engine's maximum batch size. Creation performs no I/O
/// beyond obtaining the identifier.
#[derive(Debug)]
pub struct JobHandle {
    pub id: String,
    pub object: String,
    pub operation: Operation,
    pub external_id: Option<String>,
    pub batches: Vec<Vec<Row>>,
    pub total: usize,
}

impl JobHandle {
    pub fn chunk(records: Vec<Row>, batch_size: usize) -> Vec<Vec<Row>> {
        let mut batches = Vec::new();
        let mut current = Vec::with_capacity(batch_size.min(records.len()));
        for row in records {
            current.push(row);
            if current.len() >= batch_size {
                batches.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }
}

/// The execution strategy contract the orchestrator commits through. Job
/// execution is built from independently callable batches so retry can be
/// layered per chunk without re-submitting the whole job.
#[async_trait]
pub trait ApiEngine: Send + Sync {
    fn engine_name(&self) -> &str;

    fn max_batch_size(&self) -> usize;

    /// Obtain a job identifier and chunk the input; no mutation happens yet
    async fn create_job(
        &self,
        object: &str,
        operation: Operation,
        external_id: Option<String>,
        records: Vec<Row>,
    ) -> Result<JobHandle>;

    /// Execute one chunk; one result row per input row, input order
    async fn execute_batch(
        &self,
        handle: &JobHandle,
        batch: &[Row],
        on_progress: OnProgress<'_>,
    ) -> Result<Vec<ResultRow>>;

    /// Execute every chunk of a job in order, invoking the progress
    /// callback at phase boundaries
    async fn execute_job(
        &self,
        handle: JobHandle,
        on_progress: OnProgress<'_>,
    ) -> Result<Vec<ResultRow>> {
        let mut results = Vec::with_capacity(handle.total);
        let mut processed = 0;
        on_progress(ProgressEvent {
            engine: self.engine_name().to_string(),
            job_id: handle.id.clone(),
            object: handle.object.clone(),
            state: JobState::Open,
            processed,
            total: handle.total,
        });
        for batch in &handle.batches {
            let batch_results = self.execute_batch(&handle, batch, on_progress).await?;
            processed += batch.len();
            results.extend(batch_results);
            on_progress(ProgressEvent {
                engine: self.engine_name().to_string(),
                job_id: handle.id.clone(),
                object: handle.object.clone(),
                state: JobState::InProgress,
                processed,
                total: handle.total,
            });
        }
        on_progress(ProgressEvent {
            engine: self.engine_name().to_string(),
            job_id: handle.id.clone(),
            object: handle.object.clone(),
            state: JobState::JobComplete,
            processed,
            total: handle.total,
        });
        Ok(results)
    }
}

/// Which engine the selection policy picked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Rest,
    BulkV1,
    BulkV2,
}

/// Volume-threshold engine selection. The explicit "always use direct"
/// override takes precedence; otherwise record counts above the threshold
/// route through the configured bulk variant.
pub fn select_engine(settings: &RunSettings, record_count: usize) -> EngineKind {
    if settings.always_use_rest {
        return EngineKind::Rest;
    }
    if record_count > settings.bulk_threshold {
        match settings.bulk_api_version {
            BulkApiVersion::V1 => EngineKind::BulkV1,
            BulkApiVersion::V2 => EngineKind::BulkV2,
        }
    } else {
        EngineKind::Rest
    }
}

pub(crate) fn reject_readonly(operation: Operation) -> Result<()> {
    if !operation.is_mutating() {
        return Err(OrgBridgeError::Engine(
            "readonly objects are never committed".to_string(),
        ));
    }
    Ok(())
}
