use crate::model::FieldDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema of one object on one side, collected during the describe phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDescribe {
    pub name: String,
    pub fields: HashMap<String, FieldDescriptor>,
}

/// Expected-absence lookup result. Describe misses are ordinary data during
/// field-list reconciliation, not errors; genuine initialization failures
/// use the error channel instead.
#[derive(Debug)]
pub enum FieldLookup<'a> {
    Found(&'a FieldDescriptor),
    NotFound,
}

impl ObjectDescribe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: HashMap::new(),
        }
    }

    pub fn add_field(&mut self, field: FieldDescriptor) {
        self.fields.insert(field.name.clone(), field);
    }

    pub fn lookup(&self, field_name: &str) -> FieldLookup<'_> {
        match self.fields.get(field_name) {
            Some(f) => FieldLookup::Found(f),
            None => FieldLookup::NotFound,
        }
    }

    pub fn has_field(&self, field_name: &str) -> bool {
        self.fields.contains_key(field_name)
    }
}
