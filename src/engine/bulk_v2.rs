use crate::config::Operation;
use crate::engine::{
    reject_readonly, ApiEngine, JobHandle, JobState, OnProgress, ProgressEvent, ResultRow,
};
use crate::error::{OrgBridgeError, Result};
use crate::model::{Row, ERRORS_FIELD, ID_FIELD};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Second-generation high-throughput engine (the default bulk variant):
/// CSV ingest jobs, one remote job per chunk, job-level polling.
pub struct BulkV2Engine {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    api_version: String,
    batch_size: usize,
    poll_interval: Duration,
    poll_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct IngestJobInfo {
    id: String,
    #[serde(default)]
    state: String,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

impl BulkV2Engine {
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

    fn ingest_url(&self) -> String {
        format!(
            "{}/services/data/v{}/jobs/ingest",
            self.base_url, self.api_version
        )
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

    /// Serialize a chunk to the upload CSV: column union in first-seen
    /// order, the reserved errors slot stripped. Insert uploads carry no
    /// identifier column (the ingest endpoint rejects it).
    pub fn to_csv(operation: Operation, batch: &[Row]) -> Result<(Vec<String>, String)> {
        let mut columns: Vec<String> = Vec::new();
        for row in batch {
            for col in row.columns() {
                if col == ERRORS_FIELD {
                    continue;
                }
                if operation == Operation::Insert && col == ID_FIELD {
                    continue;
                }
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&columns)?;
        for row in batch {
            let record: Vec<String> = columns.iter().map(|c| row.str_value(c)).collect();
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| OrgBridgeError::Engine(format!("csv serialization: {}", e)))?;
        let body = String::from_utf8(bytes)
            .map_err(|e| OrgBridgeError::Engine(format!("csv serialization: {}", e)))?;
        Ok((columns, body))
    }

    async fn open_ingest_job(&self, handle: &JobHandle) -> Result<String> {
        let mut body = json!({
            "object": handle.object,
            "operation": handle.operation.to_string(),
            "contentType": "CSV",
            "lineEnding": "LF",
        });
        if handle.operation == Operation::Upsert {
            body["externalIdFieldName"] =
                json!(handle.external_id.as_deref().unwrap_or(ID_FIELD));
        }
        let response = self
            .client
            .post(self.ingest_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let info: IngestJobInfo = self
            .check(response, "bulk v2 job create")
            .await?
            .json()
            .await?;
        Ok(info.id)
    }

    async fn poll_job(&self, job_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.ingest_url(), job_id);
        let deadline = tokio::time::Instant::now() + self.poll_timeout;

        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .send()
                .await?;
            let info: IngestJobInfo = self
                .check(response, "bulk v2 job poll")
                .await?
                .json()
                .await?;

            match info.state.as_str() {
                "JobComplete" => return Ok(()),
                "Failed" | "Aborted" => {
                    return Err(OrgBridgeError::Engine(format!(
                        "bulk v2 job {} {}: {}",
                        job_id,
                        info.state,
                        info.error_message.unwrap_or_default()
                    )));
                }
                other => debug!("bulk v2 job {} state: {}", job_id, other),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(OrgBridgeError::Engine(format!(
                    "bulk v2 job {} timed out after {:?}",
                    job_id, self.poll_timeout
                )));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn fetch_results_csv(&self, job_id: &str, kind: &str) -> Result<Vec<HashMap<String, String>>> {
        let url = format!("{}/{}/{}", self.ingest_url(), job_id, kind);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body = self
            .check(response, "bulk v2 results fetch")
            .await?
            .text()
            .await?;

        let mut reader = csv::Reader::from_reader(body.as_bytes());
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = HashMap::new();
            for (i, h) in headers.iter().enumerate() {
                row.insert(h.clone(), record.get(i).unwrap_or_default().to_string());
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn echo_key(columns: &[String], get: impl Fn(&str) -> String) -> String {
        let parts: Vec<String> = columns.iter().map(|c| get(c)).collect();
        parts.join("\u{1}")
    }

    /// Match result rows back to submitted rows. The results CSVs echo the
    /// uploaded columns, so rows are keyed by their uploaded content; rows
    /// with identical content consume results in upload order. Insert has no
    /// identifier to key on, which is why correlation never relies on one.
    pub fn correlate(
        columns: &[String],
        batch: &[Row],
        successes: &[HashMap<String, String>],
        failures: &[HashMap<String, String>],
    ) -> Vec<ResultRow> {
        let mut pending: HashMap<String, VecDeque<ResultRow>> = HashMap::new();
        for row in successes {
            let key = Self::echo_key(columns, |c| row.get(c).cloned().unwrap_or_default());
            let id = row
                .get("sf__Id")
                .cloned()
                .filter(|s| !s.is_empty())
                .or_else(|| row.get(ID_FIELD).cloned().filter(|s| !s.is_empty()));
            pending
                .entry(key)
                .or_default()
                .push_back(ResultRow { id, error: None });
        }
        for row in failures {
            let key = Self::echo_key(columns, |c| row.get(c).cloned().unwrap_or_default());
            let message = row
                .get("sf__Error")
                .cloned()
                .unwrap_or_else(|| "unknown error".to_string());
            pending
                .entry(key)
                .or_default()
                .push_back(ResultRow::failure(message));
        }

        batch
            .iter()
            .map(|input| {
                let key = Self::echo_key(columns, |c| input.str_value(c));
                pending
                    .get_mut(&key)
                    .and_then(|queue| queue.pop_front())
                    .unwrap_or_else(|| ResultRow::failure("no result row returned"))
            })
            .collect()
    }
}

#[async_trait]
impl ApiEngine for BulkV2Engine {
    fn engine_name(&self) -> &str {
        "bulk-v2"
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
        let total = records.len();
        // The logical job identifier is local; each chunk opens its own
        // ingest job because one v2 job accepts exactly one upload.
        Ok(JobHandle {
            id: uuid::Uuid::new_v4().to_string(),
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
        let job_id = self.open_ingest_job(handle).await?;

        on_progress(ProgressEvent {
            engine: self.engine_name().to_string(),
            job_id: job_id.clone(),
            object: handle.object.clone(),
            state: JobState::UploadStart,
            processed: 0,
            total: batch.len(),
        });

        let (columns, csv_body) = Self::to_csv(handle.operation, batch)?;
        let upload_url = format!("{}/{}/batches", self.ingest_url(), job_id);
        let response = self
            .client
            .put(upload_url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "text/csv")
            .body(csv_body)
            .send()
            .await?;
        self.check(response, "bulk v2 upload").await?;

        // Signal upload complete so the job moves to processing
        let patch_url = format!("{}/{}", self.ingest_url(), job_id);
        let response = self
            .client
            .patch(patch_url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "state": "UploadComplete" }))
            .send()
            .await?;
        self.check(response, "bulk v2 upload complete").await?;

        on_progress(ProgressEvent {
            engine: self.engine_name().to_string(),
            job_id: job_id.clone(),
            object: handle.object.clone(),
            state: JobState::UploadComplete,
            processed: 0,
            total: batch.len(),
        });

        self.poll_job(&job_id).await?;

        let successes = self.fetch_results_csv(&job_id, "successfulResults").await?;
        let failures = self.fetch_results_csv(&job_id, "failedResults").await?;

        // One result per input row, in input order
        Ok(Self::correlate(&columns, batch, &successes, &failures))
    }
}
