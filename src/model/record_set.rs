use crate::model::{Row, COMPOUND_KEY_SEPARATOR, RECORD_TYPE_OBJECT};
use std::collections::HashMap;

/// One side's records for a task: the "Main" ordered row view plus the
/// business-key -> identifier index ("ExtIdMap"). The index is populated
/// only after Main has been fetched; it is the sole mechanism later tasks
/// use to resolve foreign keys into this task's identifiers.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    rows: Vec<Row>,
    ext_id_map: HashMap<String, String>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ext_id_map(&self) -> &HashMap<String, String> {
        &self.ext_id_map
    }

    /// Replace all rows, dropping any previously built index
    pub fn set_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.ext_id_map.clear();
    }

    /// Merge new rows in: rows with an identifier already present replace
    /// the existing row, others append. Insertion order of survivors is
    /// preserved; cross-chunk interleaving is reconciled by identifier,
    /// never by arrival order.
    pub fn merge_rows(&mut self, incoming: Vec<Row>) {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            if let Some(id) = row.id() {
                index.insert(id.to_string(), i);
            }
        }
        for row in incoming {
            match row.id().and_then(|id| index.get(id).copied()) {
                Some(i) => self.rows[i] = row,
                None => {
                    if let Some(id) = row.id() {
                        index.insert(id.to_string(), self.rows.len());
                    }
                    self.rows.push(row);
                }
            }
        }
    }

    /// Deduplicate rows by identifier, keeping the first occurrence
    pub fn dedup_by_id(&mut self) {
        let mut seen: HashMap<String, ()> = HashMap::new();
        self.rows.retain(|row| match row.id() {
            Some(id) => seen.insert(id.to_string(), ()).is_none(),
            None => true,
        });
    }

    /// Build the ExtIdMap from Main. For the RecordType object the key is
    /// compound (`<SobjectType>;<businessKey>`) because developer names are
    /// not unique across objects.
    pub fn build_ext_id_map(&mut self, object_name: &str, key_field: &str) {
        self.ext_id_map.clear();
        for row in &self.rows {
            let id = match row.id() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => continue,
            };
            let key = Self::index_key(object_name, key_field, row);
            if key.is_empty() {
                continue;
            }
            self.ext_id_map.insert(key, id);
        }
    }

    /// The index key a given row contributes under this object's rules
    pub fn index_key(object_name: &str, key_field: &str, row: &Row) -> String {
        let raw = row.str_value(key_field);
        if raw.is_empty() {
            return raw;
        }
        if object_name == RECORD_TYPE_OBJECT {
            let object_type = row.str_value("SobjectType");
            format!("{}{}{}", object_type, COMPOUND_KEY_SEPARATOR, raw)
        } else {
            raw
        }
    }

    /// Resolve a business-key value to this side's identifier
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.ext_id_map.get(key).map(|s| s.as_str())
    }

    /// Register an identifier assigned at commit time so later tasks can
    /// resolve against it without a re-query
    pub fn register(&mut self, key: String, id: String) {
        if !key.is_empty() && !id.is_empty() {
            self.ext_id_map.insert(key, id);
        }
    }

    /// All identifiers present in Main, in row order
    pub fn ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| r.id().map(|s| s.to_string()))
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Row> {
        self.rows
            .iter()
            .find(|r| r.id().map(|i| i == id).unwrap_or(false))
    }
}
