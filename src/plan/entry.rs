use crate::config::{Config, MockFieldConfig, ObjectConfig, Operation};
use crate::error::{OrgBridgeError, Result};
use crate::model::{
    FieldDescriptor, FieldLookup, ObjectDescribe, ID_FIELD, RECORD_TYPE_OBJECT,
};
use crate::soql::SoqlQuery;
use std::collections::{HashMap, HashSet};

/// One object's frozen configuration in the migration plan. Built once at
/// startup, field list and dependency map populated during the
/// describe/validate phase, immutable during execution.
#[derive(Debug, Clone)]
pub struct ObjectPlanEntry {
    pub name: String,
    pub query: SoqlQuery,
    pub delete_query: Option<SoqlQuery>,
    pub operation: Operation,
    /// Business-key field; `Insert` forces this to the identifier field
    pub external_id: String,
    pub delete_old_data: bool,
    pub all_records: bool,
    pub use_value_mapping: bool,
    /// Read-only stand-in synthesized for a referenced object absent from
    /// the configured set
    pub synthesized: bool,
    pub mock_fields: Vec<MockFieldConfig>,
    pub field_values: HashMap<String, HashMap<String, String>>,
    /// Effective field list, resolved against the source describe
    pub fields: Vec<FieldDescriptor>,
    /// referenced object name -> reference field names on this object
    pub dependencies: HashMap<String, Vec<String>>,
}

impl ObjectPlanEntry {
    fn from_config(config: &ObjectConfig, default_external_id: &str) -> Result<Self> {
        let query = SoqlQuery::parse(&config.query)?;
        let delete_query = config
            .delete_query
            .as_deref()
            .map(SoqlQuery::parse)
            .transpose()?;

        // Insert has no pre-existing target rows to match; the business key
        // collapses to the system identifier for the whole run.
        let external_id = if config.operation == Operation::Insert {
            ID_FIELD.to_string()
        } else {
            config
                .external_id
                .clone()
                .unwrap_or_else(|| default_external_id.to_string())
        };

        Ok(Self {
            name: query.object.clone(),
            query,
            delete_query,
            operation: config.operation,
            external_id,
            delete_old_data: config.delete_old_data,
            all_records: config.all_records,
            use_value_mapping: config.use_value_mapping,
            synthesized: false,
            mock_fields: config.mock_fields.clone(),
            field_values: config.field_values.clone(),
            fields: Vec::new(),
            dependencies: HashMap::new(),
        })
    }

    /// Minimal read-only stand-in for a referenced object outside the
    /// configured set: identifier plus business key, always all records.
    fn stand_in(object: &str, default_external_id: &str) -> Self {
        let external_id = if object == RECORD_TYPE_OBJECT {
            "DeveloperName".to_string()
        } else {
            default_external_id.to_string()
        };
        let mut fields = vec![ID_FIELD.to_string(), external_id.clone()];
        if object == RECORD_TYPE_OBJECT {
            fields.push("SobjectType".to_string());
        }
        Self {
            name: object.to_string(),
            query: SoqlQuery::all_records(object, fields),
            delete_query: None,
            operation: Operation::Readonly,
            external_id,
            delete_old_data: false,
            all_records: true,
            use_value_mapping: false,
            synthesized: true,
            mock_fields: Vec::new(),
            field_values: HashMap::new(),
            fields: Vec::new(),
            dependencies: HashMap::new(),
        }
    }

    /// Resolve the declared field list against the source describe and
    /// derive the dependency map from reference fields.
    fn resolve_fields(
        &mut self,
        source: &ObjectDescribe,
        target: Option<&ObjectDescribe>,
    ) -> Result<()> {
        self.fields.clear();
        self.dependencies.clear();

        let mut names: Vec<String> = self.query.fields.clone();
        if !names.iter().any(|f| f == ID_FIELD) {
            names.insert(0, ID_FIELD.to_string());
        }
        if !names.iter().any(|f| f == &self.external_id) && !self.external_id.contains('.') {
            names.push(self.external_id.clone());
        }

        for name in names {
            // Dot-qualified projections are relationship traversals, not
            // own fields; they ride along untouched.
            if name.contains('.') {
                continue;
            }
            let descriptor = match source.lookup(&name) {
                FieldLookup::Found(d) => d.clone(),
                FieldLookup::NotFound => {
                    return Err(OrgBridgeError::Metadata {
                        object: self.name.clone(),
                        message: format!("field '{}' is missing on the source side", name),
                    });
                }
            };
            if self.operation.is_mutating() && self.operation != Operation::Delete {
                if let Some(t) = target {
                    if !t.has_field(&name) {
                        return Err(OrgBridgeError::Metadata {
                            object: self.name.clone(),
                            message: format!("field '{}' is missing on the target side", name),
                        });
                    }
                }
            }
            if descriptor.is_reference {
                if descriptor.referenced_object.is_empty() {
                    return Err(OrgBridgeError::Metadata {
                        object: self.name.clone(),
                        message: format!(
                            "reference field '{}' has no referenced object",
                            name
                        ),
                    });
                }
                self.dependencies
                    .entry(descriptor.referenced_object.clone())
                    .or_default()
                    .push(descriptor.name.clone());
            }
            self.fields.push(descriptor);
        }

        Ok(())
    }

    pub fn depends_on(&self, object: &str) -> bool {
        self.dependencies.contains_key(object)
    }

    /// True when this object holds a master-detail reference to `object`
    pub fn has_master_detail_parent(&self, object: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.is_master_detail() && f.referenced_object == object)
    }

    /// Business keys with a dot path or compound shape cannot drive chunked
    /// parent-bounded queries
    pub fn has_complex_external_id(&self) -> bool {
        self.external_id.contains('.') || self.external_id.contains(';')
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// The frozen set of plan entries, addressed by index. Entries are shared
/// read-only across the job and any task referencing them as a dependency.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub entries: Vec<ObjectPlanEntry>,
    index_by_name: HashMap<String, usize>,
}

impl Plan {
    /// Build the plan from configuration plus both sides' describe results.
    /// Referenced objects absent from the configured set get synthesized
    /// read-only stand-ins so remapping can still occur.
    pub fn build(
        config: &Config,
        source_describes: &HashMap<String, ObjectDescribe>,
        target_describes: &HashMap<String, ObjectDescribe>,
    ) -> Result<Plan> {
        let default_ext = &config.settings.default_external_id;
        let mut entries: Vec<ObjectPlanEntry> = Vec::new();

        for object in config.objects.iter().filter(|o| !o.excluded) {
            entries.push(ObjectPlanEntry::from_config(object, default_ext)?);
        }

        // Resolve declared entries first so stand-in synthesis sees every
        // dependency edge.
        for entry in entries.iter_mut() {
            let source = source_describes.get(&entry.name).ok_or_else(|| {
                OrgBridgeError::Metadata {
                    object: entry.name.clone(),
                    message: "object is missing on the source side".to_string(),
                }
            })?;
            let target = target_describes.get(&entry.name);
            if entry.operation.is_mutating() && target.is_none() {
                return Err(OrgBridgeError::Metadata {
                    object: entry.name.clone(),
                    message: "object is missing on the target side".to_string(),
                });
            }
            entry.resolve_fields(source, target)?;
        }

        // Synthesize stand-ins, transitively: a stand-in's own references
        // never extend further because its field list is minimal.
        let declared: HashSet<String> = entries.iter().map(|e| e.name.clone()).collect();
        let mut referenced: Vec<String> = Vec::new();
        for entry in &entries {
            for dep in entry.dependencies.keys() {
                if !declared.contains(dep) && !referenced.contains(dep) {
                    referenced.push(dep.clone());
                }
            }
        }
        for object in referenced {
            let mut stand_in = ObjectPlanEntry::stand_in(&object, default_ext);
            let source = source_describes.get(&object);
            // Stand-ins tolerate a sparse describe: each field missing from
            // it falls back to a plain string descriptor on its own, so a
            // resolvable identifier never masks an unresolvable key field.
            stand_in.fields = stand_in
                .query
                .fields
                .iter()
                .map(|name| match source.map(|s| s.lookup(name)) {
                    Some(FieldLookup::Found(d)) => d.clone(),
                    _ => FieldDescriptor::new(name.clone(), object.clone()),
                })
                .collect();
            entries.push(stand_in);
        }

        let index_by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();

        Ok(Plan {
            entries,
            index_by_name,
        })
    }

    pub fn get(&self, name: &str) -> Option<&ObjectPlanEntry> {
        self.index_by_name.get(name).map(|i| &self.entries[*i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
