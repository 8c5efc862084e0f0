// Shared fixtures: an in-memory data plane with call capture, plus row and
// config builders used across the unit tests.

use async_trait::async_trait;
use orgbridge::config::{
    Config, DirectoryEndpointConfig, EndpointConfig, ObjectConfig, Operation, RunSettings,
};
use orgbridge::engine::{OnProgress, ResultRow};
use orgbridge::error::{OrgBridgeError, Result};
use orgbridge::model::{FieldDescriptor, ObjectDescribe, Row};
use orgbridge::plane::DataPlane;
use orgbridge::soql::SoqlQuery;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One captured `execute` invocation
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub object: String,
    pub operation: Operation,
    pub external_id: Option<String>,
    pub payloads: Vec<Row>,
}

/// Shared state behind a mock plane, kept outside the boxed trait object so
/// tests can inspect calls after handing the plane to a job
#[derive(Default)]
pub struct MockState {
    pub describes: Mutex<HashMap<String, ObjectDescribe>>,
    pub rows: Mutex<HashMap<String, Vec<Row>>>,
    pub calls: Mutex<Vec<ExecutedCall>>,
    next_id: Mutex<u64>,
}

impl MockState {
    pub fn seed(&self, describe: ObjectDescribe, rows: Vec<Row>) {
        let name = describe.name.clone();
        self.describes.lock().unwrap().insert(name.clone(), describe);
        self.rows.lock().unwrap().insert(name, rows);
    }

    pub fn calls(&self) -> Vec<ExecutedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, operation: Operation) -> Vec<ExecutedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == operation)
            .collect()
    }
}

/// Deterministic in-memory plane: serves seeded rows, understands the
/// chunked `field IN (...)` filter shape, and assigns sequential prefixed
/// identifiers on insert.
pub struct MockPlane {
    label: String,
    id_prefix: String,
    pub state: Arc<MockState>,
}

impl MockPlane {
    pub fn new(label: &str, id_prefix: &str) -> (Self, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        (
            Self {
                label: label.to_string(),
                id_prefix: id_prefix.to_string(),
                state: Arc::clone(&state),
            },
            state,
        )
    }

    fn filter_matches(where_clause: &str, row: &Row) -> bool {
        if let Some((field, rest)) = where_clause.split_once(" IN (") {
            let wanted: Vec<String> = rest
                .trim_end_matches(')')
                .split(',')
                .map(|v| v.trim().trim_matches('\'').to_string())
                .collect();
            wanted.contains(&row.str_value(field.trim()))
        } else {
            // Arbitrary raw filters are not modeled; serve everything
            true
        }
    }

    fn generate_id(&self) -> String {
        let mut n = self.state.next_id.lock().unwrap();
        *n += 1;
        format!("{}{}", self.id_prefix, n)
    }
}

#[async_trait]
impl DataPlane for MockPlane {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn is_file(&self) -> bool {
        false
    }

    async fn describe(&self, object: &str) -> Result<ObjectDescribe> {
        self.state
            .describes
            .lock()
            .unwrap()
            .get(object)
            .cloned()
            .ok_or_else(|| OrgBridgeError::NotFound(format!("no describe for {}", object)))
    }

    async fn query(&self, query: &SoqlQuery) -> Result<Vec<Row>> {
        let rows = self.state.rows.lock().unwrap();
        let all = rows.get(&query.object).cloned().unwrap_or_default();
        let mut out: Vec<Row> = match &query.where_clause {
            Some(w) => all
                .into_iter()
                .filter(|r| Self::filter_matches(w, r))
                .collect(),
            None => all,
        };
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
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
        self.state.calls.lock().unwrap().push(ExecutedCall {
            object: object.to_string(),
            operation,
            external_id,
            payloads: records.clone(),
        });

        let mut results = Vec::with_capacity(records.len());
        let mut stored = self.state.rows.lock().unwrap();
        let existing = stored.entry(object.to_string()).or_default();

        for mut record in records {
            match operation {
                Operation::Insert => {
                    let id = self.generate_id();
                    record.set_id(id.clone());
                    existing.push(record);
                    results.push(ResultRow::success(id));
                }
                Operation::Update | Operation::Upsert => {
                    let id = record
                        .id()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| self.generate_id());
                    results.push(ResultRow::success(id));
                }
                Operation::Delete => {
                    let id = record.id().unwrap_or_default().to_string();
                    existing.retain(|r| r.id() != Some(id.as_str()));
                    results.push(ResultRow::success(id));
                }
                Operation::Readonly => {
                    return Err(OrgBridgeError::Engine(
                        "readonly objects are never committed".to_string(),
                    ));
                }
            }
        }
        Ok(results)
    }
}

/// Row builder from string pairs
pub fn row(pairs: &[(&str, &str)]) -> Row {
    let mut r = Row::new();
    for (k, v) in pairs {
        r.set(k.to_string(), v.to_string());
    }
    r
}

/// Describe with plain fields plus reference fields `(name, referenced)`.
/// The identifier field is always present.
pub fn describe(object: &str, own: &[&str], refs: &[(&str, &str)]) -> ObjectDescribe {
    let mut d = ObjectDescribe::new(object);
    d.add_field(FieldDescriptor::new("Id", object));
    for f in own {
        d.add_field(FieldDescriptor::new(*f, object));
    }
    for (f, parent) in refs {
        d.add_field(FieldDescriptor::reference(*f, object, *parent));
    }
    d
}

pub fn object_config(query: &str, operation: Operation) -> ObjectConfig {
    ObjectConfig {
        query: query.to_string(),
        operation,
        external_id: None,
        delete_query: None,
        delete_old_data: false,
        excluded: false,
        all_records: false,
        use_value_mapping: false,
        mock_fields: Vec::new(),
        field_values: HashMap::new(),
    }
}

pub fn test_config(objects: Vec<ObjectConfig>) -> Config {
    Config {
        app: Default::default(),
        source: EndpointConfig::Directory(DirectoryEndpointConfig {
            path: "./unused-source".to_string(),
        }),
        target: EndpointConfig::Directory(DirectoryEndpointConfig {
            path: "./unused-target".to_string(),
        }),
        objects,
        settings: RunSettings::default(),
        logging: Default::default(),
    }
}
