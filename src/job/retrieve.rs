use crate::config::Operation;
use crate::error::Result;
use crate::job::MigrationJob;
use crate::model::{RecordSet, Row, ID_FIELD};
use crate::plan::Side;
use crate::plane::FilePlane;
use crate::report::CsvIssueRow;
use crate::soql::chunk_in_queries;
use futures::future::try_join_all;
use tracing::{debug, info, warn};

impl MigrationJob {
    /// Check each source CSV against the task field list; accumulate issues
    /// and repair what can be repaired in memory (a missing identifier
    /// column is filled with generated values and the cache marked dirty).
    pub(crate) async fn validate_source_files(&mut self) -> Result<()> {
        let directory = match self.source.directory() {
            Some(d) => d,
            None => return Ok(()),
        };

        for index in 0..self.tasks.len() {
            let (name, field_names, synthesized) = {
                let entry = self.tasks[index].entry(&self.plan);
                (
                    self.tasks[index].name.clone(),
                    entry.field_names(),
                    entry.synthesized,
                )
            };
            if synthesized {
                continue;
            }

            let path = directory.join(format!("{}.csv", name));
            if !self.cache.exists(&path).await {
                self.reporter.add_csv_issue(CsvIssueRow {
                    object: name,
                    column: String::new(),
                    issue: "source file is missing".to_string(),
                });
                continue;
            }

            let headers = self.cache.headers(&path).await?;
            for field in &field_names {
                if field == ID_FIELD || headers.iter().any(|h| h == field) {
                    continue;
                }
                self.reporter.add_csv_issue(CsvIssueRow {
                    object: name.clone(),
                    column: field.clone(),
                    issue: "column declared in the query is missing from the file".to_string(),
                });
            }
            for header in &headers {
                if header.contains('.') || field_names.iter().any(|f| f == header) {
                    continue;
                }
                self.reporter.add_csv_issue(CsvIssueRow {
                    object: name.clone(),
                    column: header.clone(),
                    issue: "column is not part of the configured field list".to_string(),
                });
            }

            if !headers.iter().any(|h| h == ID_FIELD) {
                self.reporter.add_csv_issue(CsvIssueRow {
                    object: name.clone(),
                    column: ID_FIELD.to_string(),
                    issue: "identifier column is missing; generated values assigned".to_string(),
                });
                let mut rows = self.cache.rows(&path).await?;
                for row in rows.iter_mut() {
                    row.set_id(FilePlane::generated_id());
                }
                let mut new_headers = vec![ID_FIELD.to_string()];
                new_headers.extend(headers);
                self.cache.store(&path, new_headers, rows).await;
            }
        }
        Ok(())
    }

    /// Per-side decision: unfiltered full query vs parent-bounded chunks.
    /// Readonly, synthesized, explicitly flagged, filterless and
    /// complex-business-key objects always take the full query; file planes
    /// always serve all records anyway.
    fn uses_all_records(&self, index: usize, side: Side) -> bool {
        let entry = self.tasks[index].entry(&self.plan);
        self.plane(side).is_file()
            || entry.all_records
            || entry.operation == Operation::Readonly
            || entry.synthesized
            || !entry.query.has_filter()
            || entry.has_complex_external_id()
    }

    /// Pass 1: walk tasks in final order populating Main on both sides.
    /// Forward references drive chunked queries; backward ones wait for
    /// pass 2.
    pub(crate) async fn retrieve_pass_one(&mut self) -> Result<()> {
        for index in 0..self.tasks.len() {
            let operation = self.tasks[index].entry(&self.plan).operation;
            if operation == Operation::Delete {
                continue;
            }

            self.retrieve_side(index, Side::Source).await?;
            // Insert has no pre-existing target rows worth loading; its
            // target Main fills from commit results.
            if operation != Operation::Insert {
                self.retrieve_side(index, Side::Target).await?;
            }

            let task = &self.tasks[index];
            debug!(
                "pass 1 {}: {} source rows, {} target rows",
                task.name,
                task.source.len(),
                task.target.len()
            );
        }
        self.apply_value_mapping().await?;
        Ok(())
    }

    async fn retrieve_side(&mut self, index: usize, side: Side) -> Result<()> {
        let full = self.tasks[index].full_query(&self.plan);
        let all_records = self.uses_all_records(index, side);

        if all_records {
            let rows = self.plane(side).query(&full).await?;
            let task = &mut self.tasks[index];
            task.record_set_mut(side).set_rows(rows);
            match side {
                Side::Source => task.source_all_records = true,
                Side::Target => task.target_all_records = true,
            }
            return Ok(());
        }

        // Chunk per forward reference field, bounded by the serialized
        // filter length budget, then regroup by identifier.
        let budget = self.config.settings.filter_length_budget;
        let forward: Vec<(String, Option<usize>)> = self.tasks[index]
            .forward_reference_fields()
            .map(|f| (f.name.clone(), f.parent_task))
            .collect();

        if forward.is_empty() {
            let rows = self.plane(side).query(&full).await?;
            self.tasks[index].record_set_mut(side).set_rows(rows);
            return Ok(());
        }

        for (field_name, parent_task) in forward {
            let parent_index = match parent_task {
                Some(p) => p,
                None => continue,
            };
            let parent_ids = self.tasks[parent_index].record_set(side).ids();
            if parent_ids.is_empty() {
                continue;
            }
            let chunks = chunk_in_queries(&full, &field_name, &parent_ids, budget);
            debug!(
                "pass 1 {} {}: {} chunks driven by {}",
                self.tasks[index].name,
                side,
                chunks.len(),
                field_name
            );
            let plane = self.plane(side);
            let fetched: Vec<Vec<Row>> =
                try_join_all(chunks.iter().map(|c| plane.query(&c.query))).await?;
            let set = self.tasks[index].record_set_mut(side);
            for rows in fetched {
                set.merge_rows(rows);
            }
        }
        self.tasks[index].record_set_mut(side).dedup_by_id();
        Ok(())
    }

    /// Pass 2: reverse walk builds every target ExtIdMap and re-queries
    /// backward-referencing chunks whose parents only completed later in
    /// the order; a final forward walk patches companion values that the
    /// original projection could not carry (self- and mutual references,
    /// file-plane sources without companion columns).
    pub(crate) async fn retrieve_pass_two(&mut self) -> Result<()> {
        for index in (0..self.tasks.len()).rev() {
            let (name, operation, external_id, target_all) = {
                let task = &self.tasks[index];
                let entry = task.entry(&self.plan);
                (
                    task.name.clone(),
                    entry.operation,
                    entry.external_id.clone(),
                    task.target_all_records,
                )
            };
            if operation == Operation::Delete {
                continue;
            }

            if !target_all {
                self.requery_backward(index).await?;
            }

            let task = &mut self.tasks[index];
            task.target.build_ext_id_map(&name, &external_id);
            task.source.build_ext_id_map(&name, &external_id);
            debug!(
                "pass 2 {}: target index holds {} keys",
                name,
                task.target.ext_id_map().len()
            );
        }

        for index in 0..self.tasks.len() {
            self.patch_companion_values(index);
        }
        Ok(())
    }

    /// Re-query the target side for backward references, driving the chunks
    /// with the parent's target identifiers (its ExtIdMap values, complete
    /// by the time the reverse walk reaches this task).
    async fn requery_backward(&mut self, index: usize) -> Result<()> {
        let full = self.tasks[index].full_query(&self.plan);
        let budget = self.config.settings.filter_length_budget;
        let backward: Vec<(String, Option<usize>)> = self.tasks[index]
            .backward_reference_fields()
            .map(|f| (f.name.clone(), f.parent_task))
            .collect();

        for (field_name, parent_task) in backward {
            let parent_index = match parent_task {
                Some(p) => p,
                None => continue,
            };
            let parent_ids: Vec<String> = self.tasks[parent_index]
                .target
                .ext_id_map()
                .values()
                .cloned()
                .collect();
            if parent_ids.is_empty() {
                continue;
            }
            let chunks = chunk_in_queries(&full, &field_name, &parent_ids, budget);
            info!(
                "pass 2 {}: re-querying {} backward chunks for {}",
                self.tasks[index].name,
                chunks.len(),
                field_name
            );
            let plane = self.plane(Side::Target);
            let fetched: Vec<Vec<Row>> =
                try_join_all(chunks.iter().map(|c| plane.query(&c.query))).await?;
            let set = &mut self.tasks[index].target;
            for rows in fetched {
                set.merge_rows(rows);
            }
        }
        self.tasks[index].target.dedup_by_id();
        Ok(())
    }

    /// Fill empty companion columns on source rows by resolving the raw
    /// foreign-key value against the parent's source Main rows. After this
    /// step every resolvable reference carries its business-key value
    /// regardless of how the rows were fetched.
    fn patch_companion_values(&mut self, index: usize) {
        let references: Vec<(String, String, usize, String)> = self.tasks[index]
            .fields
            .iter()
            .filter_map(|f| match (&f.ext_id_column, f.parent_task, &f.parent_key_field) {
                (Some(ext), Some(parent), Some(key)) => {
                    Some((f.name.clone(), ext.clone(), parent, key.clone()))
                }
                _ => None,
            })
            .collect();
        if references.is_empty() {
            return;
        }

        for (field_name, ext_column, parent_index, parent_key) in references {
            // Split borrow: clone the parent set when patching a
            // self-reference, otherwise index disjointly.
            let parent_set: RecordSet = if parent_index == index {
                self.tasks[index].source.clone()
            } else {
                self.tasks[parent_index].source.clone()
            };
            let mut patched = 0usize;
            for row in self.tasks[index].source.rows_mut() {
                if !row.str_value(&ext_column).is_empty() {
                    continue;
                }
                let raw = row.str_value(&field_name);
                if raw.is_empty() {
                    continue;
                }
                if let Some(parent_row) = parent_set.find_by_id(&raw) {
                    let key_value = parent_row.str_value(&parent_key);
                    if !key_value.is_empty() {
                        row.set(ext_column.clone(), key_value);
                        patched += 1;
                    }
                }
            }
            if patched > 0 {
                debug!(
                    "patched {} companion values for {}.{}",
                    patched, self.tasks[index].name, ext_column
                );
            }
        }
    }

    /// Rewrite raw source values through the directory-level
    /// `ValueMapping.csv` table for objects that opted in.
    async fn apply_value_mapping(&mut self) -> Result<()> {
        let directory = match self.source.directory() {
            Some(d) => d,
            None => return Ok(()),
        };
        let wants_mapping = self
            .tasks
            .iter()
            .any(|t| t.entry(&self.plan).use_value_mapping);
        if !wants_mapping {
            return Ok(());
        }

        let path = directory.join("ValueMapping.csv");
        if !self.cache.exists(&path).await {
            warn!("value mapping requested but {} is absent", path.display());
            return Ok(());
        }
        let mapping_rows = self.cache.rows(&path).await?;

        for index in 0..self.tasks.len() {
            if !self.tasks[index].entry(&self.plan).use_value_mapping {
                continue;
            }
            let name = self.tasks[index].name.clone();
            let mut rewritten = 0usize;
            for mapping in &mapping_rows {
                if mapping.str_value("ObjectName") != name {
                    continue;
                }
                let field = mapping.str_value("FieldName");
                let raw = mapping.str_value("RawValue");
                let value = mapping.str_value("Value");
                if field.is_empty() {
                    continue;
                }
                for row in self.tasks[index].source.rows_mut() {
                    if row.str_value(&field) == raw {
                        row.set(field.clone(), value.clone());
                        rewritten += 1;
                    }
                }
            }
            if rewritten > 0 {
                info!("value mapping rewrote {} cells for {}", rewritten, name);
            }
        }
        Ok(())
    }
}
