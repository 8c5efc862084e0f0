mod commit;
mod remap;
mod retrieve;

pub use remap::RemappedRow;

use crate::cache::CsvCache;
use crate::config::{Config, EndpointConfig, Operation};
use crate::engine::ProgressEvent;
use crate::error::{OrgBridgeError, Result};
use crate::mock::MockGenerator;
use crate::model::ObjectDescribe;
use crate::plan::{build_execution_order, build_tasks, Plan, Side, Task};
use crate::plane::{DataPlane, FilePlane, OrgPlane};
use crate::prompt::ConfirmPrompt;
use crate::report::{Reporter, RunSummary, TaskSummary};
use crate::soql::SoqlQuery;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The migration orchestrator: owns the frozen plan, the ordered task
/// table, both data planes and all cross-task reporting. Tasks execute
/// strictly in sequence; later tasks' correctness depends on earlier
/// tasks' completed ExtIdMaps.
pub struct MigrationJob {
    pub(crate) config: Config,
    pub(crate) plan: Plan,
    pub(crate) tasks: Vec<Task>,
    pub(crate) source: Box<dyn DataPlane>,
    pub(crate) target: Box<dyn DataPlane>,
    pub(crate) cache: Arc<CsvCache>,
    pub(crate) reporter: Reporter,
    pub(crate) prompt: Box<dyn ConfirmPrompt>,
    pub(crate) mock: MockGenerator,
}

impl MigrationJob {
    /// Build the planes declared by an endpoint config
    pub fn plane_for(
        endpoint: &EndpointConfig,
        config: &Config,
        cache: Arc<CsvCache>,
    ) -> Box<dyn DataPlane> {
        match endpoint {
            EndpointConfig::Org(org) => {
                Box::new(OrgPlane::new(org.clone(), config.settings.clone()))
            }
            EndpointConfig::Directory(dir) => Box::new(FilePlane::new(dir.path.clone(), cache)),
        }
    }

    /// Describe both sides, freeze the plan and the task order. This is the
    /// only point the plan mutates; execution never touches it again.
    pub async fn prepare(
        config: Config,
        source: Box<dyn DataPlane>,
        target: Box<dyn DataPlane>,
        prompt: Box<dyn ConfirmPrompt>,
        cache: Arc<CsvCache>,
    ) -> Result<MigrationJob> {
        let mut object_names = Vec::new();
        for object in config.objects.iter().filter(|o| !o.excluded) {
            object_names.push(SoqlQuery::parse(&object.query)?.object);
        }

        let mut source_describes: HashMap<String, ObjectDescribe> = HashMap::new();
        let mut target_describes: HashMap<String, ObjectDescribe> = HashMap::new();
        for name in &object_names {
            source_describes.insert(name.clone(), source.describe(name).await?);
            match target.describe(name).await {
                Ok(d) => {
                    target_describes.insert(name.clone(), d);
                }
                Err(e) => debug!("no target describe for {}: {}", name, e),
            }
        }

        let plan = Plan::build(&config, &source_describes, &target_describes)?;

        // Stand-ins synthesized during plan build may name objects we have
        // not described yet; fetch those lazily for the source side.
        let order = build_execution_order(&plan);
        let tasks = build_tasks(&plan, &order);

        info!(
            "plan frozen: {} tasks in order [{}]",
            tasks.len(),
            tasks
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let reporter = Reporter::new(config.settings.data_dir.clone());

        Ok(MigrationJob {
            config,
            plan,
            tasks,
            source,
            target,
            cache,
            reporter,
            prompt,
            mock: MockGenerator::new(),
        })
    }

    pub fn task_order(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Run the whole pipeline: delete, count, retrieve pass 1 and 2,
    /// forward commit, backward update. Every fatal condition unwinds
    /// through here after flushing dirty cached file state.
    pub async fn run(&mut self, dry_run: bool) -> Result<RunSummary> {
        let outcome = self.run_phases(dry_run).await;
        // Flush-before-unwind holds for success, fatal errors and user
        // aborts alike.
        if let Err(flush_err) = self.cache.flush_dirty().await {
            warn!("failed to flush cached files: {}", flush_err);
        }
        if let Err(report_err) = self.reporter.flush() {
            warn!("failed to write reports: {}", report_err);
        }
        match outcome {
            Ok(summary) => Ok(summary),
            Err(e) => {
                if e.is_user_abort() {
                    info!("{}", e);
                } else {
                    warn!("job failed: {}", e);
                }
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self, dry_run: bool) -> Result<RunSummary> {
        self.validate_source_files().await?;

        if dry_run {
            info!("dry run: stopping after plan validation");
            return Ok(self.summary());
        }

        self.delete_phase().await?;
        self.count_phase().await?;
        self.retrieve_pass_one().await?;
        self.retrieve_pass_two().await?;
        self.forward_update_phase().await?;
        self.backward_update_phase().await?;

        let summary = self.summary();
        for task in &summary.tasks {
            info!(
                "{} [{}]: source {}, target {}, committed {}, failed {}, missing parents {}",
                task.object,
                task.operation,
                task.source_count,
                task.target_count,
                task.committed,
                task.failed,
                task.missing_parents
            );
        }
        Ok(summary)
    }

    /// Pre-run delete: identifier-only target queries, engine delete, no
    /// field loading, no remapping. Runs before any retrieval.
    async fn delete_phase(&mut self) -> Result<()> {
        for index in 0..self.tasks.len() {
            let (name, operation, delete_old) = {
                let task = &self.tasks[index];
                let entry = task.entry(&self.plan);
                (task.name.clone(), entry.operation, entry.delete_old_data)
            };
            if operation != Operation::Delete && !delete_old {
                continue;
            }

            let query = self.tasks[index].delete_query(&self.plan);
            let rows = self.target.query(&query).await?;
            if rows.is_empty() {
                debug!("delete phase: nothing to delete for {}", name);
                continue;
            }
            info!("deleting {} target records for {}", rows.len(), name);
            let results = self
                .target
                .execute(&name, Operation::Delete, None, rows, &log_progress)
                .await
                .map_err(|e| OrgBridgeError::Commit {
                    object: name.clone(),
                    message: e.to_string(),
                })?;
            let failed = results.iter().filter(|r| !r.is_success()).count();
            if failed > 0 {
                warn!("{} delete failures for {}", failed, name);
            }
        }
        Ok(())
    }

    /// Record counts per side, used for progress sizing and logging
    async fn count_phase(&mut self) -> Result<()> {
        for index in 0..self.tasks.len() {
            let operation = self.tasks[index].entry(&self.plan).operation;
            if operation == Operation::Delete {
                continue;
            }
            let query = self.tasks[index].count_query(&self.plan);
            let source_count = self.source.query_count(&query).await?;
            let target_count = match self.target.query_count(&query).await {
                Ok(n) => n,
                Err(e) => {
                    debug!("target count unavailable for {}: {}", query.object, e);
                    0
                }
            };
            let task = &mut self.tasks[index];
            task.source_count = source_count;
            task.target_count = target_count;
            debug!(
                "counts for {}: source {}, target {}",
                task.name, source_count, target_count
            );
        }
        Ok(())
    }

    pub(crate) fn plane(&self, side: Side) -> &dyn DataPlane {
        match side {
            Side::Source => self.source.as_ref(),
            Side::Target => self.target.as_ref(),
        }
    }

    fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for task in &self.tasks {
            let entry = task.entry(&self.plan);
            let committed = task
                .target
                .rows()
                .iter()
                .filter(|r| r.error().is_none())
                .count();
            let failed = task
                .target
                .rows()
                .iter()
                .filter(|r| r.error().is_some())
                .count();
            let missing = self
                .reporter
                .missing_parents()
                .iter()
                .filter(|m| m.child_object == task.name)
                .count();
            summary.tasks.push(TaskSummary {
                object: task.name.clone(),
                operation: entry.operation.to_string(),
                source_count: task.source_count,
                target_count: task.target_count,
                committed,
                failed,
                missing_parents: missing,
            });
        }
        summary
    }
}

/// Progress sink that folds engine state transitions into the log
pub(crate) fn log_progress(event: ProgressEvent) {
    debug!(
        "engine {} job {} for {}: {:?} ({}/{})",
        event.engine, event.job_id, event.object, event.state, event.processed, event.total
    );
}
