use crate::config::Operation;
use crate::engine::{
    reject_readonly, ApiEngine, JobHandle, JobState, OnProgress, ProgressEvent, ResultRow,
};
use crate::error::{OrgBridgeError, Result};
use crate::model::{Row, ERRORS_FIELD, ID_FIELD};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Low-latency direct engine: synchronous record-collection calls, one
/// round trip per chunk.
pub struct RestEngine {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    api_version: String,
    batch_size: usize,
}

#[derive(Debug, Deserialize)]
struct CollectionResult {
    #[serde(default)]
    id: Option<String>,
    success: bool,
    #[serde(default)]
    errors: Vec<CollectionError>,
}

#[derive(Debug, Deserialize)]
struct CollectionError {
    message: String,
}

impl RestEngine {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
            api_version: api_version.into(),
            batch_size,
        }
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/services/data/v{}/composite/sobjects",
            self.base_url, self.api_version
        )
    }

    fn record_payload(&self, object: &str, row: &Row) -> serde_json::Value {
        let mut value = row.to_json();
        if let Some(map) = value.as_object_mut() {
            map.remove(ERRORS_FIELD);
            map.insert(
                "attributes".to_string(),
                json!({ "type": object }),
            );
        }
        value
    }

    async fn send_collection(
        &self,
        method: reqwest::Method,
        url: String,
        body: serde_json::Value,
    ) -> Result<Vec<CollectionResult>> {
        let response = self
            .client
            .request(method, url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(OrgBridgeError::Http(format!(
                "collection call failed ({}): {}",
                status, text
            )));
        }

        Ok(response.json::<Vec<CollectionResult>>().await?)
    }
}

#[async_trait]
impl ApiEngine for RestEngine {
    fn engine_name(&self) -> &str {
        "rest"
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
        on_progress(ProgressEvent {
            engine: self.engine_name().to_string(),
            job_id: handle.id.clone(),
            object: handle.object.clone(),
            state: JobState::UploadStart,
            processed: 0,
            total: batch.len(),
        });

        let results = match handle.operation {
            Operation::Insert => {
                let records: Vec<_> = batch
                    .iter()
                    .map(|r| {
                        let mut v = self.record_payload(&handle.object, r);
                        if let Some(map) = v.as_object_mut() {
                            map.remove(ID_FIELD);
                        }
                        v
                    })
                    .collect();
                self.send_collection(
                    reqwest::Method::POST,
                    self.collections_url(),
                    json!({ "allOrNone": false, "records": records }),
                )
                .await?
            }
            Operation::Update => {
                let records: Vec<_> = batch
                    .iter()
                    .map(|r| self.record_payload(&handle.object, r))
                    .collect();
                self.send_collection(
                    reqwest::Method::PATCH,
                    self.collections_url(),
                    json!({ "allOrNone": false, "records": records }),
                )
                .await?
            }
            Operation::Upsert => {
                let key = handle.external_id.as_deref().unwrap_or(ID_FIELD);
                let records: Vec<_> = batch
                    .iter()
                    .map(|r| {
                        let mut v = self.record_payload(&handle.object, r);
                        if key != ID_FIELD {
                            if let Some(map) = v.as_object_mut() {
                                map.remove(ID_FIELD);
                            }
                        }
                        v
                    })
                    .collect();
                let url = format!("{}/{}/{}", self.collections_url(), handle.object, key);
                self.send_collection(
                    reqwest::Method::PATCH,
                    url,
                    json!({ "allOrNone": false, "records": records }),
                )
                .await?
            }
            Operation::Delete => {
                let ids: Vec<String> = batch
                    .iter()
                    .filter_map(|r| r.id().map(|s| s.to_string()))
                    .collect();
                let url = format!(
                    "{}?ids={}&allOrNone=false",
                    self.collections_url(),
                    ids.join(",")
                );
                let response = self
                    .client
                    .delete(url)
                    .bearer_auth(&self.access_token)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(OrgBridgeError::Http(format!(
                        "collection delete failed ({}): {}",
                        status, text
                    )));
                }
                response.json::<Vec<CollectionResult>>().await?
            }
            Operation::Readonly => unreachable!("rejected at create_job"),
        };

        debug!(
            "rest batch for {} returned {} results",
            handle.object,
            results.len()
        );

        on_progress(ProgressEvent {
            engine: self.engine_name().to_string(),
            job_id: handle.id.clone(),
            object: handle.object.clone(),
            state: JobState::UploadComplete,
            processed: batch.len(),
            total: batch.len(),
        });

        Ok(results
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
}
