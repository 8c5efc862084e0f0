use crate::model::{FieldDescriptor, RecordSet, ID_FIELD};
use crate::plan::{ObjectPlanEntry, Plan};
use crate::soql::SoqlQuery;

/// Which side of the migration a record set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Side::Source => "source",
            Side::Target => "target",
        })
    }
}

/// One field of a task, carrying its foreign-key companion wiring. The
/// classification against the parent task's position is computed once from
/// the final task order and never revisited.
#[derive(Debug, Clone)]
pub struct TaskField {
    pub name: String,
    pub descriptor: FieldDescriptor,
    /// Companion column holding the parent's business-key value instead of
    /// the identifier, e.g. `Account.Name` for `AccountId`
    pub ext_id_column: Option<String>,
    /// Index of the parent task in the job's task table
    pub parent_task: Option<usize>,
    /// Business-key field inside the parent task
    pub parent_key_field: Option<String>,
    /// Parent task precedes this task in final execution order
    pub is_parent_before: bool,
}

impl TaskField {
    pub fn is_reference(&self) -> bool {
        self.parent_task.is_some()
    }
}

/// The per-object unit of work: the frozen plan entry it executes, its two
/// record sets, and the field list split into own vs foreign-key-derived
/// fields.
#[derive(Debug, Clone)]
pub struct Task {
    /// Index into the plan's entry table
    pub entry_index: usize,
    pub name: String,
    pub fields: Vec<TaskField>,
    pub source: RecordSet,
    pub target: RecordSet,
    pub source_count: usize,
    pub target_count: usize,
    /// Whether the side was fetched with an unfiltered all-records query
    pub source_all_records: bool,
    pub target_all_records: bool,
}

impl Task {
    pub fn record_set(&self, side: Side) -> &RecordSet {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    pub fn record_set_mut(&mut self, side: Side) -> &mut RecordSet {
        match side {
            Side::Source => &mut self.source,
            Side::Target => &mut self.target,
        }
    }

    pub fn entry<'a>(&self, plan: &'a Plan) -> &'a ObjectPlanEntry {
        &plan.entries[self.entry_index]
    }

    /// Fields that are not foreign keys
    pub fn own_fields(&self) -> impl Iterator<Item = &TaskField> {
        self.fields.iter().filter(|f| !f.is_reference())
    }

    /// Foreign keys whose parent task precedes this one
    pub fn forward_reference_fields(&self) -> impl Iterator<Item = &TaskField> {
        self.fields
            .iter()
            .filter(|f| f.is_reference() && f.is_parent_before)
    }

    /// Foreign keys whose parent task follows this one, resolvable only on
    /// the second sweep
    pub fn backward_reference_fields(&self) -> impl Iterator<Item = &TaskField> {
        self.fields
            .iter()
            .filter(|f| f.is_reference() && !f.is_parent_before)
    }

    /// Full query shape: original filters preserved, projection replaced by
    /// the task's complete field list including companion columns
    pub fn full_query(&self, plan: &Plan) -> SoqlQuery {
        let entry = self.entry(plan);
        let mut fields: Vec<String> = Vec::new();
        for f in &self.fields {
            fields.push(f.name.clone());
            if let Some(ext) = &f.ext_id_column {
                fields.push(ext.clone());
            }
        }
        entry.query.with_fields(fields)
    }

    /// Count-only query shape
    pub fn count_query(&self, plan: &Plan) -> SoqlQuery {
        self.entry(plan).query.count_query()
    }

    /// Identifier-only query for the pre-run delete
    pub fn delete_query(&self, plan: &Plan) -> SoqlQuery {
        let entry = self.entry(plan);
        let base = entry.delete_query.as_ref().unwrap_or(&entry.query);
        base.with_fields(vec![ID_FIELD.to_string()])
    }
}

/// Build the job's task table from a frozen execution order (a sequence of
/// plan entry indices). Companion columns and parent links are wired here;
/// `is_parent_before` is frozen against the final order.
pub fn build_tasks(plan: &Plan, order: &[usize]) -> Vec<Task> {
    let mut position_of_entry = vec![usize::MAX; plan.entries.len()];
    for (pos, entry_index) in order.iter().enumerate() {
        position_of_entry[*entry_index] = pos;
    }

    let mut tasks = Vec::with_capacity(order.len());
    for (pos, entry_index) in order.iter().enumerate() {
        let entry = &plan.entries[*entry_index];
        let mut fields = Vec::with_capacity(entry.fields.len());

        for descriptor in &entry.fields {
            let mut field = TaskField {
                name: descriptor.name.clone(),
                descriptor: descriptor.clone(),
                ext_id_column: None,
                parent_task: None,
                parent_key_field: None,
                is_parent_before: false,
            };

            if descriptor.is_reference {
                if let Some(parent_entry_index) = plan.index_of(&descriptor.referenced_object) {
                    let parent_entry = &plan.entries[parent_entry_index];
                    let parent_pos = position_of_entry[parent_entry_index];
                    field.ext_id_column = Some(format!(
                        "{}.{}",
                        descriptor.relationship_name(),
                        parent_entry.external_id
                    ));
                    field.parent_task = Some(parent_pos);
                    field.parent_key_field = Some(parent_entry.external_id.clone());
                    field.is_parent_before = parent_pos < pos;
                }
            }

            fields.push(field);
        }

        tasks.push(Task {
            entry_index: *entry_index,
            name: entry.name.clone(),
            fields,
            source: RecordSet::new(),
            target: RecordSet::new(),
            source_count: 0,
            target_count: 0,
            source_all_records: false,
            target_all_records: false,
        });
    }

    tasks
}
