use crate::config::Operation;
use crate::engine::ResultRow;
use crate::error::retry::{with_retry, RetryConfig};
use crate::error::{OrgBridgeError, Result};
use crate::job::remap::RemappedRow;
use crate::job::{log_progress, MigrationJob};
use crate::model::Row;
use tracing::{debug, info, warn};

impl MigrationJob {
    /// Forward sweep: remap and commit each task in final order. Committed
    /// identifiers feed straight back into the task's target ExtIdMap and
    /// Main rows so every later task resolves against them.
    pub(crate) async fn forward_update_phase(&mut self) -> Result<()> {
        for index in 0..self.tasks.len() {
            let operation = self.tasks[index].entry(&self.plan).operation;
            if !operation.is_mutating() || operation == Operation::Delete {
                continue;
            }

            let missing_before = self.reporter.missing_parents().len();
            let remapped = self.forward_remap(index);
            let missing_added = self.reporter.missing_parents().len() - missing_before;
            self.confirm_missing_parents(index, missing_added).await?;

            if remapped.is_empty() {
                debug!("nothing to commit for {}", self.tasks[index].name);
                continue;
            }

            let (updates, inserts) = split_by_operation(operation, remapped);
            info!(
                "{}: committing {} updates, {} inserts",
                self.tasks[index].name,
                updates.len(),
                inserts.len()
            );

            if !updates.is_empty() {
                self.commit_batch(index, Operation::Update, updates).await?;
            }
            if !inserts.is_empty() {
                self.commit_batch(index, Operation::Insert, inserts).await?;
            }
        }
        Ok(())
    }

    /// Second sweep in forward order: update-only commits restricted to
    /// the backward-referencing field set, now that every parent's target
    /// ExtIdMap is complete.
    pub(crate) async fn backward_update_phase(&mut self) -> Result<()> {
        for index in 0..self.tasks.len() {
            let operation = self.tasks[index].entry(&self.plan).operation;
            if !operation.is_mutating() || operation == Operation::Delete {
                continue;
            }
            if self.tasks[index].backward_reference_fields().next().is_none() {
                continue;
            }

            let missing_before = self.reporter.missing_parents().len();
            let remapped = self.backward_remap(index);
            let missing_added = self.reporter.missing_parents().len() - missing_before;
            self.confirm_missing_parents(index, missing_added).await?;

            if remapped.is_empty() {
                continue;
            }
            info!(
                "{}: backward sweep updating {} rows",
                self.tasks[index].name,
                remapped.len()
            );
            self.commit_batch(index, Operation::Update, remapped).await?;
        }
        Ok(())
    }

    async fn confirm_missing_parents(&mut self, index: usize, missing_added: usize) -> Result<()> {
        if missing_added == 0 {
            return Ok(());
        }
        let name = &self.tasks[index].name;
        warn!("{} missing parent references for {}", missing_added, name);
        if !self.config.settings.prompt_on_missing_parent {
            return Ok(());
        }
        let question = format!(
            "{} record(s) of {} reference parents that do not exist. Continue",
            missing_added, name
        );
        if self.prompt.confirm(&question).await {
            Ok(())
        } else {
            Err(OrgBridgeError::UserAbort(format!(
                "missing parent confirmation for {}",
                name
            )))
        }
    }

    /// Send one operation's payloads through the target plane and fold the
    /// results back into the task's record sets.
    async fn commit_batch(
        &mut self,
        index: usize,
        operation: Operation,
        remapped: Vec<RemappedRow>,
    ) -> Result<()> {
        let name = self.tasks[index].name.clone();
        let external_id = {
            let entry = self.tasks[index].entry(&self.plan);
            if entry.has_complex_external_id() {
                None
            } else {
                Some(entry.external_id.clone())
            }
        };

        let payloads: Vec<Row> = remapped.iter().map(|r| r.payload.clone()).collect();
        let retry = RetryConfig {
            max_retries: self.config.settings.commit_retries,
            ..RetryConfig::default()
        };
        let target = &self.target;
        let results = with_retry(&retry, &format!("commit {}", name), || {
            target.execute(
                &name,
                operation,
                external_id.clone(),
                payloads.clone(),
                &log_progress,
            )
        })
        .await
        .map_err(|e| OrgBridgeError::Commit {
            object: name.clone(),
            message: e.to_string(),
        })?;

        if results.len() != remapped.len() {
            return Err(OrgBridgeError::Commit {
                object: name,
                message: format!(
                    "engine returned {} results for {} records",
                    results.len(),
                    remapped.len()
                ),
            });
        }

        let failures = self.absorb_results(index, operation, &remapped, results);
        if failures > 0 {
            warn!("{} {} failures for {}", failures, operation, name);
            if self.config.settings.prompt_on_update_error {
                let question = format!(
                    "{} record(s) of {} failed to commit. Continue",
                    failures, name
                );
                if !self.prompt.confirm(&question).await {
                    return Err(OrgBridgeError::UserAbort(format!(
                        "commit error confirmation for {}",
                        name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fold engine results into the target record set: successes register
    /// their identifier under the source row's business key and replace or
    /// append the Main row; failures keep an error-bearing row so the run
    /// summary can account for them.
    fn absorb_results(
        &mut self,
        index: usize,
        operation: Operation,
        remapped: &[RemappedRow],
        results: Vec<ResultRow>,
    ) -> usize {
        let mut failures = 0;
        let task = &mut self.tasks[index];

        for (row, result) in remapped.iter().zip(results) {
            match (result.error, result.id.or_else(|| row.matched_target_id.clone())) {
                (None, Some(target_id)) => {
                    let mut committed = row.payload.clone();
                    committed.set_id(target_id.clone());
                    task.target.merge_rows(vec![committed]);
                    task.target.register(row.source_key.clone(), target_id);
                }
                (error, target_id) => {
                    failures += 1;
                    let mut failed = row.payload.clone();
                    if let Some(id) = target_id {
                        failed.set_id(id);
                    }
                    failed.set_error(Some(error.unwrap_or_else(|| {
                        format!("{} returned no identifier", operation)
                    })));
                    task.target.merge_rows(vec![failed]);
                }
            }
        }
        failures
    }
}

/// Partition remapped rows by the declared operation: Update commits only
/// rows with a matched target identifier, Upsert splits into updates and
/// inserts client-side, Insert takes everything as-is.
fn split_by_operation(
    operation: Operation,
    remapped: Vec<RemappedRow>,
) -> (Vec<RemappedRow>, Vec<RemappedRow>) {
    let mut updates = Vec::new();
    let mut inserts = Vec::new();
    for mut row in remapped {
        match operation {
            Operation::Insert => inserts.push(row),
            Operation::Update | Operation::Upsert => match row.matched_target_id.clone() {
                Some(id) => {
                    row.payload.set_id(id);
                    updates.push(row);
                }
                None if operation == Operation::Upsert => inserts.push(row),
                None => {
                    debug!(
                        "skipping update for unmatched key '{}'",
                        row.source_key
                    );
                }
            },
            Operation::Readonly | Operation::Delete => {}
        }
    }
    (updates, inserts)
}
