use crate::config::Operation;
use crate::engine::{
    reject_readonly, ApiEngine, JobHandle, JobState, OnProgress, ProgressEvent, ResultRow,
};
use crate::error::{OrgBridgeError, Result};
use crate::model::{Row, ERRORS_FIELD, ID_FIELD};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// First-generation high-throughput engine: one remote job, one uploaded
/// batch per chunk, per-batch polling.
pub struct BulkV1Engine {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    api_version: String,
    batch_size: usize,
    poll_interval: Duration,
    poll_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct JobInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct BatchInfo {
    id: String,
    state: String,
    #[serde(rename = "stateMessage", default)]
    state_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResultRow {
    #[serde(default)]
    id: Option<String>,
    success: bool,
    #[serde(default)]
    errors: Vec<BatchResultError>,
}

#[derive(Debug, Deserialize)]
struct BatchResultError {
    message: String,
}

impl BulkV1Engine {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
        batch_size: usize,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
            api_version: api_version.into(),
            batch_size,
            poll_interval,
            poll_timeout,
        }
    }

    fn job_url(&self) -> String {
        format!("{}/services/async/{}/job", self.base_url, self.api_version)
    }

    async fn check(&self, response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(OrgBridgeError::Http(format!(
                "{} failed ({}): {}",
                context, status, text
            )))
        }
    }

    async fn poll_batch(&self, job_id: &str, batch_id: &str) -> Result<()> {
        let url = format!("{}/{}/batch/{}", self.job_url(), job_id, batch_id);
        let deadline = tokio::time::Instant::now() + self.poll_timeout;

        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .send()
                .await?;
            let info: BatchInfo = self.check(response, "bulk v1 batch poll").await?.json().await?;

            match info.state.as_str() {
                "Completed" => return Ok(()),
                "Failed" | "Not Processed" => {
                    return Err(OrgBridgeError::Engine(format!(
                        "bulk v1 batch {} failed: {}",
                        info.id,
                        info.state_message.unwrap_or_default()
                    )));
                }
                other => {
                    debug!("bulk v1 batch {} state: {}", batch_id, other);
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(OrgBridgeError::Engine(format!(
                    "bulk v1 batch {} timed out after {:?}",
                    batch_id, self.poll_timeout
                )));
            }
            sleep(self.poll_interval).await;
        }
    }

    /// JSON payloads for one uploaded batch: the reserved errors slot is
    /// stripped, and Insert payloads carry no identifier (the ingest
    /// endpoint rejects it).
    pub fn batch_records(operation: Operation, batch: &[Row]) -> Vec<serde_json::Value> {
        batch
            .iter()
            .map(|r| {
                let mut v = r.to_json();
                if let Some(map) = v.as_object_mut() {
                    map.remove(ERRORS_FIELD);
                    if operation == Operation::Insert {
                        map.remove(ID_FIELD);
                    }
                }
                v
            })
            .collect()
    }

    async fn close_job(&self, job_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.job_url(), job_id);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "state": "Closed" }))
            .send()
            .await?;
        self.check(response, "bulk v1 job close").await?;
        Ok(())
    }
}

#[async_trait]
impl ApiEngine for BulkV1Engine {
    fn engine_name(&self) -> &str {
        "bulk-v1"
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn create_job(
        &self,
        object: &str,
        operation: Operation,
        external_id: Option<String>,
        records: Vec<Row>,
    ) -> Result<JobHandle> {
        reject_readonly(operation)?;

        let mut body = json!({
            "operation": operation.to_string(),
            "object": object,
            "contentType": "JSON",
        });
        if operation == Operation::Upsert {
            body["externalIdFieldName"] = json!(external_id.as_deref().unwrap_or("Id"));
        }

        let response = self
            .client
            .post(self.job_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let info: JobInfo = self.check(response, "bulk v1 job create").await?.json().await?;

        let total = records.len();
        Ok(JobHandle {
            id: info.id,
            object: object.to_string(),
            operation,
            external_id,
            batches: JobHandle::chunk(records, self.batch_size),
            total,
        })
    }

    async fn execute_batch(
        &self,
        handle: &JobHandle,
        batch: &[Row],
        on_progress: OnProgress<'_>,
    ) -> Result<Vec<ResultRow>> {
        on_progress(ProgressEvent {
            engine: self.engine_name().to_string(),
            job_id: handle.id.clone(),
            object: handle.object.clone(),
            state: JobState::UploadStart,
            processed: 0,
            total: batch.len(),
        });

        let records = Self::batch_records(handle.operation, batch);

        let url = format!("{}/{}/batch", self.job_url(), handle.id);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&records)
            .send()
            .await?;
        let info: BatchInfo = self
            .check(response, "bulk v1 batch create")
            .await?
            .json()
            .await?;

        on_progress(ProgressEvent {
            engine: self.engine_name().to_string(),
            job_id: handle.id.clone(),
            object: handle.object.clone(),
            state: JobState::UploadComplete,
            processed: 0,
            total: batch.len(),
        });

        self.poll_batch(&handle.id, &info.id).await?;

        let url = format!("{}/{}/batch/{}/result", self.job_url(), handle.id, info.id);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let rows: Vec<BatchResultRow> = self
            .check(response, "bulk v1 batch result")
            .await?
            .json()
            .await?;

        if rows.len() != batch.len() {
            warn!(
                "bulk v1 batch {} returned {} results for {} records",
                info.id,
                rows.len(),
                batch.len()
            );
        }

        Ok(rows
            .into_iter()
            .map(|r| {
                if r.success {
                    ResultRow {
                        id: r.id,
                        error: None,
                    }
                } else {
                    let message = r
                        .errors
                        .first()
                        .map(|e| e.message.clone())
                        .unwrap_or_else(|| "unknown error".to_string());
                    ResultRow::failure(message)
                }
            })
            .collect())
    }

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

        self.close_job(&handle.id).await?;
        on_progress(ProgressEvent {
            engine: self.engine_name().to_string(),
            job_id: handle.id.clone(),
            object: handle.object.clone(),
            state: JobState::Closed,
            processed,
            total: handle.total,
        });
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
