use crate::model::{ERRORS_FIELD, ID_FIELD};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tagged value carried in a record column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Num(f64),
    Str(String),
    Null,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Empty strings and nulls both count as "explicitly empty" for
    /// foreign-key nulling decisions
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Str(s) => s.eq_ignore_ascii_case("true"),
            FieldValue::Num(n) => *n != 0.0,
            FieldValue::Null => false,
        }
    }

    /// Render the value the way it appears inside a query literal or a CSV
    /// cell
    pub fn render(&self) -> String {
        match self {
            FieldValue::Str(s) => s.clone(),
            FieldValue::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Null => String::new(),
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::String(s) => FieldValue::Str(s),
            serde_json::Value::Number(n) => FieldValue::Num(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Null => FieldValue::Null,
            other => FieldValue::Str(other.to_string()),
        }
    }
}

impl From<FieldValue> for serde_json::Value {
    fn from(v: FieldValue) -> Self {
        match v {
            FieldValue::Str(s) => serde_json::Value::String(s),
            FieldValue::Num(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(b),
            FieldValue::Null => serde_json::Value::Null,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

/// One record: a flat mapping of column name to value. Column enumeration
/// order is never relied on; hashing and equality go through
/// `canonical_string` over a declared field list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: HashMap<String, FieldValue>,
}

impl Row {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.values.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).and_then(|v| v.as_str())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set(ID_FIELD, FieldValue::Str(id.into()));
    }

    pub fn error(&self) -> Option<&str> {
        self.get(ERRORS_FIELD)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn set_error(&mut self, message: Option<String>) {
        match message {
            Some(m) => self.set(ERRORS_FIELD, FieldValue::Str(m)),
            None => self.set(ERRORS_FIELD, FieldValue::Null),
        }
    }

    /// String value of a field, empty when missing or null
    pub fn str_value(&self, field: &str) -> String {
        self.get(field).map(|v| v.render()).unwrap_or_default()
    }

    /// Canonical form over a declared field list, in list order. Absent
    /// columns and null columns canonicalize identically.
    pub fn canonical_string(&self, fields: &[String]) -> String {
        let mut parts = Vec::with_capacity(fields.len());
        for f in fields {
            let v = self.values.get(f).unwrap_or(&FieldValue::Null);
            parts.push(format!("{}={}", f, v.render()));
        }
        parts.join("\u{1}")
    }

    /// Flatten into a JSON object for wire payloads
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (k, v) in &self.values {
            map.insert(k.clone(), v.clone().into());
        }
        serde_json::Value::Object(map)
    }

    pub fn from_json(value: &serde_json::Value) -> Row {
        let mut row = Row::new();
        if let Some(obj) = value.as_object() {
            for (k, v) in obj {
                row.set(k.clone(), FieldValue::from(v.clone()));
            }
        }
        row
    }
}
