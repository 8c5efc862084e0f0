use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// One unresolved foreign-key lookup
#[derive(Debug, Clone, Serialize)]
pub struct MissingParentRow {
    pub child_object: String,
    pub child_field: String,
    pub child_record_id: String,
    pub parent_object: String,
    pub parent_key_field: String,
    pub missing_value: String,
}

/// One problem found while validating a source CSV against the task field
/// list
#[derive(Debug, Clone, Serialize)]
pub struct CsvIssueRow {
    pub object: String,
    pub column: String,
    pub issue: String,
}

/// End-of-run accounting for one task
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskSummary {
    pub object: String,
    pub operation: String,
    pub source_count: usize,
    pub target_count: usize,
    pub committed: usize,
    pub failed: usize,
    pub missing_parents: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub tasks: Vec<TaskSummary>,
}

impl RunSummary {
    pub fn total_failed(&self) -> usize {
        self.tasks.iter().map(|t| t.failed).sum()
    }
}

/// Buffered report sink: rows append as the run goes, files are written
/// once at phase boundaries.
#[derive(Debug, Default)]
pub struct Reporter {
    directory: PathBuf,
    missing_parents: Vec<MissingParentRow>,
    csv_issues: Vec<CsvIssueRow>,
}

impl Reporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            missing_parents: Vec::new(),
            csv_issues: Vec::new(),
        }
    }

    pub fn add_missing_parent(&mut self, row: MissingParentRow) {
        self.missing_parents.push(row);
    }

    pub fn add_csv_issue(&mut self, row: CsvIssueRow) {
        self.csv_issues.push(row);
    }

    pub fn missing_parents(&self) -> &[MissingParentRow] {
        &self.missing_parents
    }

    pub fn csv_issues(&self) -> &[CsvIssueRow] {
        &self.csv_issues
    }

    fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write both report files and announce their row counts. Buffers are
    /// kept so a later flush rewrites the full picture.
    pub fn flush(&self) -> Result<()> {
        if !self.missing_parents.is_empty() {
            let path = self.directory.join("MissingParentRecordsReport.csv");
            Self::write_csv(&path, &self.missing_parents)?;
            info!(
                "{} missing parent lookups reported in {}",
                self.missing_parents.len(),
                path.display()
            );
        }
        if !self.csv_issues.is_empty() {
            let path = self.directory.join("CSVIssuesReport.csv");
            Self::write_csv(&path, &self.csv_issues)?;
            info!(
                "{} source file issues reported in {}",
                self.csv_issues.len(),
                path.display()
            );
        }
        Ok(())
    }
}
