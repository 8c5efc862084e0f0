use crate::config::{Operation, OrgEndpointConfig, RunSettings};
use crate::engine::{
    select_engine, ApiEngine, BulkV1Engine, BulkV2Engine, EngineKind, OnProgress, RestEngine,
    ResultRow,
};
use crate::error::{OrgBridgeError, Result};
use crate::model::{FieldDescriptor, FieldValue, ObjectDescribe, Row};
use crate::plane::DataPlane;
use crate::soql::SoqlQuery;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Live API-backed data plane. Queries go through the REST query endpoint
/// with pagination; commits go through the engine picked by the volume
/// threshold policy.
pub struct OrgPlane {
    client: reqwest::Client,
    endpoint: OrgEndpointConfig,
    settings: RunSettings,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "totalSize", default)]
    total_size: usize,
    #[serde(default)]
    done: bool,
    #[serde(rename = "nextRecordsUrl", default)]
    next_records_url: Option<String>,
    #[serde(default)]
    records: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    fields: Vec<DescribeField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeField {
    name: String,
    #[serde(rename = "type", default)]
    field_type: String,
    #[serde(default)]
    updateable: bool,
    #[serde(default)]
    createable: bool,
    #[serde(default)]
    calculated: bool,
    #[serde(default)]
    auto_number: bool,
    #[serde(default)]
    custom: bool,
    #[serde(default)]
    reference_to: Vec<String>,
    #[serde(default)]
    cascade_delete: bool,
}

impl OrgPlane {
    pub fn new(endpoint: OrgEndpointConfig, settings: RunSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            settings,
        }
    }

    fn data_url(&self, suffix: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.endpoint.base_url, self.endpoint.api_version, suffix
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.endpoint.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(OrgBridgeError::Http(format!(
                "request failed ({}): {}",
                status, text
            )));
        }
        Ok(response.json::<T>().await?)
    }

    /// Flatten one wire record into a row: the attributes envelope is
    /// dropped and nested relationship objects become dot-qualified columns
    /// (`Account.Name`).
    fn flatten_record(value: &serde_json::Value) -> Row {
        let mut row = Row::new();
        Self::flatten_into(&mut row, "", value);
        row
    }

    fn flatten_into(row: &mut Row, prefix: &str, value: &serde_json::Value) {
        let Some(obj) = value.as_object() else {
            return;
        };
        for (key, v) in obj {
            if key == "attributes" {
                continue;
            }
            let column = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match v {
                serde_json::Value::Object(_) => Self::flatten_into(row, &column, v),
                other => row.set(column, FieldValue::from(other.clone())),
            }
        }
    }

    fn build_engine(&self, kind: EngineKind) -> Box<dyn ApiEngine> {
        let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);
        let poll_timeout = Duration::from_secs(self.settings.poll_timeout_secs);
        match kind {
            EngineKind::Rest => Box::new(RestEngine::new(
                self.endpoint.base_url.clone(),
                self.endpoint.access_token.clone(),
                self.endpoint.api_version.clone(),
                self.settings.rest_batch_size,
            )),
            EngineKind::BulkV1 => Box::new(BulkV1Engine::new(
                self.endpoint.base_url.clone(),
                self.endpoint.access_token.clone(),
                self.endpoint.api_version.clone(),
                self.settings.bulk_batch_size,
                poll_interval,
                poll_timeout,
            )),
            EngineKind::BulkV2 => Box::new(BulkV2Engine::new(
                self.endpoint.base_url.clone(),
                self.endpoint.access_token.clone(),
                self.endpoint.api_version.clone(),
                self.settings.bulk_batch_size,
                poll_interval,
                poll_timeout,
            )),
        }
    }
}

#[async_trait]
impl DataPlane for OrgPlane {
    fn label(&self) -> String {
        self.endpoint.base_url.clone()
    }

    fn is_file(&self) -> bool {
        false
    }

    async fn describe(&self, object: &str) -> Result<ObjectDescribe> {
        let url = self.data_url(&format!("sobjects/{}/describe", object));
        let response: DescribeResponse =
            self.get_json(self.client.get(url))
                .await
                .map_err(|e| OrgBridgeError::Metadata {
                object: object.to_string(),
                message: e.to_string(),
            })?;

        let mut describe = ObjectDescribe::new(object);
        for f in response.fields {
            let is_reference = f.field_type == "reference" && !f.reference_to.is_empty();
            describe.add_field(FieldDescriptor {
                name: f.name,
                object: object.to_string(),
                field_type: f.field_type,
                updateable: f.updateable,
                creatable: f.createable,
                calculated: f.calculated,
                autonumber: f.auto_number,
                custom: f.custom,
                is_reference,
                referenced_object: f.reference_to.first().cloned().unwrap_or_default(),
                cascade_delete: f.cascade_delete,
            });
        }
        Ok(describe)
    }

    async fn query(&self, query: &SoqlQuery) -> Result<Vec<Row>> {
        let statement = query.compose();
        debug!("query against {}: {}", self.label(), statement);

        let mut request = self
            .client
            .get(self.data_url("query"))
            .query(&[("q", statement.as_str())]);
        let mut rows = Vec::new();

        loop {
            let response: QueryResponse =
                self.get_json(request).await.map_err(|e| OrgBridgeError::Query {
                    object: query.object.clone(),
                    message: e.to_string(),
                })?;
            rows.extend(response.records.iter().map(Self::flatten_record));
            match (response.done, response.next_records_url) {
                // The continuation URL comes back already encoded
                (false, Some(next)) => {
                    request = self
                        .client
                        .get(format!("{}{}", self.endpoint.base_url, next));
                }
                _ => break,
            }
        }

        info!(
            "{} rows retrieved for {} from {}",
            rows.len(),
            query.object,
            self.label()
        );
        Ok(rows)
    }

    async fn query_count(&self, query: &SoqlQuery) -> Result<usize> {
        let statement = query.count_query().compose();
        let request = self
            .client
            .get(self.data_url("query"))
            .query(&[("q", statement.as_str())]);
        let response: QueryResponse =
            self.get_json(request).await.map_err(|e| OrgBridgeError::Query {
                object: query.object.clone(),
                message: e.to_string(),
            })?;
        // Aggregate queries report the count in the first row; totalSize is
        // the row count of the aggregate result itself
        if let Some(first) = response.records.first() {
            if let Some(n) = first.get(crate::soql::COUNT_FIELD).and_then(|v| v.as_u64()) {
                return Ok(n as usize);
            }
        }
        Ok(response.total_size)
    }

    async fn execute(
        &self,
        object: &str,
        operation: Operation,
        external_id: Option<String>,
        records: Vec<Row>,
        on_progress: OnProgress<'_>,
    ) -> Result<Vec<ResultRow>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let kind = select_engine(&self.settings, records.len());
        let engine = self.build_engine(kind);
        info!(
            "committing {} {} records for {} through the {} engine",
            records.len(),
            operation,
            object,
            engine.engine_name()
        );
        let handle = engine
            .create_job(object, operation, external_id, records)
            .await?;
        engine.execute_job(handle, on_progress).await
    }
}
