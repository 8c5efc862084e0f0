use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The declared operation for one object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Insert,
    Update,
    Upsert,
    Readonly,
    Delete,
}

impl Operation {
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Operation::Readonly)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Upsert => "upsert",
            Operation::Readonly => "readonly",
            Operation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// One object's entry in the declarative plan document. The object name is
/// implicit in the query's FROM clause.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectConfig {
    /// Record selection query; its field list seeds the effective field
    /// list of the task
    pub query: String,

    /// Operation to perform against the target
    pub operation: Operation,

    /// Business-key field used to match source rows to target rows; falls
    /// back to the run-wide default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Target-side selection for the pre-run delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_query: Option<String>,

    /// Delete matching target records before pass-1 retrieval
    #[serde(default)]
    pub delete_old_data: bool,

    /// Drop this object from the plan (still usable as a referenced
    /// read-only stand-in)
    #[serde(default)]
    pub excluded: bool,

    /// Always fetch every record instead of dependency-chunked queries
    #[serde(default)]
    pub all_records: bool,

    /// Consult ValueMapping.csv to rewrite raw values during retrieval
    #[serde(default)]
    pub use_value_mapping: bool,

    /// Per-field mock patterns applied to committed records
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mock_fields: Vec<MockFieldConfig>,

    /// Per-field old-value -> new-value substitution
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_values: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MockFieldConfig {
    pub field: String,
    /// Pattern name: `name`, `email`, `uuid`, `seq(<prefix>)`, `const(<v>)`
    pub pattern: String,
}
