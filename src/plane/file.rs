use crate::cache::CsvCache;
use crate::config::Operation;
use crate::engine::{OnProgress, ResultRow};
use crate::error::Result;
use crate::model::{
    FieldDescriptor, ObjectDescribe, RecordSet, Row, ID_FIELD,
};
use crate::plane::DataPlane;
use crate::soql::SoqlQuery;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Flat-file data plane: one CSV per object under a directory. Always
/// serves all records; commits mutate the shared cache and are written out
/// at the next flush point.
pub struct FilePlane {
    directory: PathBuf,
    cache: Arc<CsvCache>,
}

impl FilePlane {
    pub fn new(directory: impl Into<PathBuf>, cache: Arc<CsvCache>) -> Self {
        Self {
            directory: directory.into(),
            cache,
        }
    }

    pub fn file_for(&self, object: &str) -> PathBuf {
        self.directory.join(format!("{}.csv", object))
    }

    /// Synthesize a descriptor from a CSV header. Columns named `<X>Id`
    /// are treated as lookups to `<X>`; real reference metadata only
    /// exists on the org side.
    fn descriptor_from_header(object: &str, header: &str) -> FieldDescriptor {
        if header != ID_FIELD && header.ends_with("Id") {
            let referenced = header.trim_end_matches("Id").to_string();
            FieldDescriptor::reference(header, object, referenced)
        } else {
            FieldDescriptor::new(header, object)
        }
    }

    pub fn generated_id() -> String {
        format!("L{}", uuid::Uuid::new_v4().simple())
    }
}

#[async_trait]
impl DataPlane for FilePlane {
    fn label(&self) -> String {
        format!("file:{}", self.directory.display())
    }

    fn is_file(&self) -> bool {
        true
    }

    fn directory(&self) -> Option<PathBuf> {
        Some(self.directory.clone())
    }

    async fn describe(&self, object: &str) -> Result<ObjectDescribe> {
        let path = self.file_for(object);
        let mut describe = ObjectDescribe::new(object);
        if !self.cache.exists(&path).await {
            // A missing target-side file is an empty object, not an error;
            // its schema mirrors whatever gets committed later.
            debug!("no file for {}, synthesizing empty describe", object);
            describe.add_field(FieldDescriptor::new(ID_FIELD, object));
            return Ok(describe);
        }
        for header in self.cache.headers(&path).await? {
            if header.contains('.') {
                // Companion columns are projections, not own fields
                continue;
            }
            describe.add_field(Self::descriptor_from_header(object, &header));
        }
        if !describe.has_field(ID_FIELD) {
            describe.add_field(FieldDescriptor::new(ID_FIELD, object));
        }
        Ok(describe)
    }

    async fn query(&self, query: &SoqlQuery) -> Result<Vec<Row>> {
        let path = self.file_for(&query.object);
        if !self.cache.exists(&path).await {
            return Ok(Vec::new());
        }
        let mut rows = self.cache.rows(&path).await?;
        if query.where_clause.is_some() {
            // File planes serve all records; filters are a query-plan
            // concern for live endpoints only.
            debug!(
                "ignoring filter on file plane query for {}",
                query.object
            );
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn query_count(&self, query: &SoqlQuery) -> Result<usize> {
        Ok(self.query(query).await?.len())
    }

    async fn execute(
        &self,
        object: &str,
        operation: Operation,
        external_id: Option<String>,
        records: Vec<Row>,
        _on_progress: OnProgress<'_>,
    ) -> Result<Vec<ResultRow>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let path = self.file_for(object);
        let mut existing = if self.cache.exists(&path).await {
            self.cache.rows(&path).await.unwrap_or_default()
        } else {
            Vec::new()
        };

        let key_field = external_id.as_deref().unwrap_or(ID_FIELD);
        let mut results = Vec::with_capacity(records.len());

        match operation {
            Operation::Insert => {
                for mut row in records {
                    let id = Self::generated_id();
                    row.set_id(id.clone());
                    existing.push(row);
                    results.push(ResultRow::success(id));
                }
            }
            Operation::Update | Operation::Upsert => {
                for row in records {
                    let key = row.str_value(if row.id().is_some() {
                        ID_FIELD
                    } else {
                        key_field
                    });
                    let matched = existing.iter_mut().find(|r| {
                        r.id().map(|i| i == key).unwrap_or(false)
                            || (!key.is_empty() && r.str_value(key_field) == key)
                    });
                    match matched {
                        Some(target) => {
                            let id = target.id().unwrap_or_default().to_string();
                            for col in row.columns().cloned().collect::<Vec<_>>() {
                                if let Some(v) = row.get(&col) {
                                    target.set(col, v.clone());
                                }
                            }
                            results.push(ResultRow::success(id));
                        }
                        None if operation == Operation::Upsert => {
                            let mut new_row = row;
                            let id = Self::generated_id();
                            new_row.set_id(id.clone());
                            existing.push(new_row);
                            results.push(ResultRow::success(id));
                        }
                        None => {
                            warn!("update miss for {} key '{}'", object, key);
                            results.push(ResultRow::failure(format!(
                                "no row matching key '{}'",
                                key
                            )));
                        }
                    }
                }
            }
            Operation::Delete => {
                for row in records {
                    match row.id() {
                        Some(id) => {
                            let before = existing.len();
                            let id = id.to_string();
                            existing.retain(|r| r.id().map(|i| i != id).unwrap_or(true));
                            if existing.len() < before {
                                results.push(ResultRow::success(id));
                            } else {
                                results.push(ResultRow::failure("no row with this id"));
                            }
                        }
                        None => results.push(ResultRow::failure("delete without id")),
                    }
                }
            }
            Operation::Readonly => {
                return Err(crate::error::OrgBridgeError::Engine(
                    "readonly objects are never committed".to_string(),
                ));
            }
        }

        // Recompute the header union so new columns survive the flush
        let mut headers: Vec<String> = Vec::new();
        for row in &existing {
            for col in row.columns() {
                if !headers.contains(col) {
                    headers.push(col.clone());
                }
            }
        }
        let mut set = RecordSet::new();
        set.set_rows(existing);
        set.dedup_by_id();
        self.cache.store(&path, headers, set.rows().to_vec()).await;

        Ok(results)
    }
}
