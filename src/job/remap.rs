use crate::job::MigrationJob;
use crate::mock::MockPattern;
use crate::model::{FieldValue, RecordSet, Row, COMPOUND_KEY_SEPARATOR, ID_FIELD, RECORD_TYPE_OBJECT};
use crate::report::MissingParentRow;
use tracing::debug;

/// One committable record with the correlation data the commit phase needs
/// to feed results back into the owning task's indices
#[derive(Debug, Clone)]
pub struct RemappedRow {
    pub payload: Row,
    /// The source row's business-key value under the task's index rules
    pub source_key: String,
    /// Target identifier already holding that business key, when one exists
    pub matched_target_id: Option<String>,
}

impl MigrationJob {
    /// Forward remap: project each source row onto the writable field set,
    /// apply substitutions and mocks, and rewrite forward foreign keys
    /// through the parent task's target ExtIdMap. Unresolvable references
    /// stay absent from the payload and accumulate as missing-parent
    /// report rows; the remap itself never mutates source rows, so running
    /// it twice over the same snapshot yields identical payloads.
    pub fn forward_remap(&mut self, index: usize) -> Vec<RemappedRow> {
        let entry = self.tasks[index].entry(&self.plan).clone();
        let task_name = self.tasks[index].name.clone();
        let own: Vec<(String, bool)> = self.tasks[index]
            .own_fields()
            .map(|f| (f.name.clone(), f.descriptor.is_readonly()))
            .collect();
        let forward: Vec<ForwardRef> = self.tasks[index]
            .forward_reference_fields()
            .filter_map(ForwardRef::from_task_field)
            .collect();
        let mock_patterns: Vec<(String, MockPattern)> = entry
            .mock_fields
            .iter()
            .filter_map(|m| MockPattern::parse(&m.pattern).map(|p| (m.field.clone(), p)))
            .collect();

        let source_rows = self.tasks[index].source.rows().to_vec();
        let mut remapped = Vec::with_capacity(source_rows.len());

        for row in &source_rows {
            let mut payload = Row::new();

            for (name, readonly) in &own {
                // Readonly fields never enter a write payload; the
                // identifier and the business key still ride along for
                // correlation and upsert matching.
                if *readonly && name != ID_FIELD && name != &entry.external_id {
                    continue;
                }
                if let Some(value) = row.get(name) {
                    payload.set(name.clone(), value.clone());
                }
            }

            for (field, substitutions) in &entry.field_values {
                let current = payload.str_value(field);
                if let Some(new_value) = substitutions.get(&current) {
                    payload.set(field.clone(), new_value.clone());
                }
            }
            for (field, pattern) in &mock_patterns {
                payload.set(field.clone(), self.mock.generate(pattern));
            }

            let exempt = person_account_exempt(&task_name, row);
            for fref in &forward {
                self.remap_reference(index, fref, row, &mut payload, exempt);
            }

            let source_key = RecordSet::index_key(&task_name, &entry.external_id, row);
            let matched_target_id = self.tasks[index]
                .target
                .resolve(&source_key)
                .map(|s| s.to_string());

            remapped.push(RemappedRow {
                payload,
                source_key,
                matched_target_id,
            });
        }

        debug!(
            "forward remap {}: {} payloads, {} forward references per row",
            task_name,
            remapped.len(),
            forward.len()
        );
        remapped
    }

    /// Backward remap: build identifier-plus-backward-field update payloads
    /// for the second sweep. Only rows whose own target identifier is known
    /// and that resolve at least one backward reference produce a payload.
    pub(crate) fn backward_remap(&mut self, index: usize) -> Vec<RemappedRow> {
        let entry = self.tasks[index].entry(&self.plan).clone();
        let task_name = self.tasks[index].name.clone();
        let backward: Vec<ForwardRef> = self.tasks[index]
            .backward_reference_fields()
            .filter_map(ForwardRef::from_task_field)
            .collect();
        if backward.is_empty() {
            return Vec::new();
        }

        let source_rows = self.tasks[index].source.rows().to_vec();
        let mut remapped = Vec::new();

        for row in &source_rows {
            let source_key = RecordSet::index_key(&task_name, &entry.external_id, row);
            let target_id = match self.tasks[index].target.resolve(&source_key) {
                Some(id) => id.to_string(),
                // Rows that never committed have nothing to update
                None => continue,
            };

            let mut payload = Row::new();
            payload.set_id(target_id.clone());
            let exempt = person_account_exempt(&task_name, row);
            for bref in &backward {
                self.remap_reference(index, bref, row, &mut payload, exempt);
            }

            // The sweep touches only the backward field set, never
            // unrelated fields.
            if payload.columns().count() > 1 {
                remapped.push(RemappedRow {
                    payload,
                    source_key,
                    matched_target_id: Some(target_id),
                });
            }
        }

        remapped
    }

    /// Resolve one reference field on one row into the payload. Absent from
    /// the payload on a miss; an explicitly empty source value nulls the
    /// target column instead.
    fn remap_reference(
        &mut self,
        index: usize,
        fref: &ForwardRef,
        row: &Row,
        payload: &mut Row,
        exempt: bool,
    ) {
        let raw = row.get(&fref.field);
        if let Some(value) = raw {
            if value.is_empty() {
                payload.set(fref.field.clone(), FieldValue::Null);
                return;
            }
        } else {
            return;
        }

        let companion_value = row.str_value(&fref.ext_column);
        if companion_value.is_empty() {
            // No business key to look up; report the raw identifier so the
            // row is still traceable.
            let raw_value = row.str_value(&fref.field);
            self.record_missing_parent(index, fref, row, &raw_value, exempt);
            return;
        }

        let parent = &self.tasks[fref.parent_task];
        // Children of RecordType resolve through the compound key; the
        // child's own object name is the record type's object type.
        let lookup_key = if parent.name == RECORD_TYPE_OBJECT {
            format!(
                "{}{}{}",
                self.tasks[index].name, COMPOUND_KEY_SEPARATOR, companion_value
            )
        } else {
            companion_value.clone()
        };

        match parent.target.resolve(&lookup_key) {
            Some(target_id) => {
                let target_id = target_id.to_string();
                payload.set(fref.field.clone(), target_id);
            }
            None => {
                self.record_missing_parent(index, fref, row, &companion_value, exempt);
            }
        }
    }

    fn record_missing_parent(
        &mut self,
        index: usize,
        fref: &ForwardRef,
        row: &Row,
        missing_value: &str,
        exempt: bool,
    ) {
        if exempt {
            return;
        }
        let parent_name = self.tasks[fref.parent_task].name.clone();
        self.reporter.add_missing_parent(MissingParentRow {
            child_object: self.tasks[index].name.clone(),
            child_field: fref.field.clone(),
            child_record_id: row.id().unwrap_or_default().to_string(),
            parent_object: parent_name,
            parent_key_field: fref.parent_key.clone(),
            missing_value: missing_value.to_string(),
        });
    }
}

/// Person-account rows carry system-managed Account/Contact references that
/// are expected to miss; they are excluded from missing-parent reporting.
fn person_account_exempt(object: &str, row: &Row) -> bool {
    (object == "Account" || object == "Contact")
        && row
            .get("IsPersonAccount")
            .map(|v| v.is_truthy())
            .unwrap_or(false)
}

/// Reference wiring flattened out of a task field for remap loops
#[derive(Debug, Clone)]
pub(crate) struct ForwardRef {
    pub field: String,
    pub ext_column: String,
    pub parent_task: usize,
    pub parent_key: String,
}

impl ForwardRef {
    fn from_task_field(f: &crate::plan::TaskField) -> Option<ForwardRef> {
        Some(ForwardRef {
            field: f.name.clone(),
            ext_column: f.ext_id_column.clone()?,
            parent_task: f.parent_task?,
            parent_key: f.parent_key_field.clone()?,
        })
    }
}
