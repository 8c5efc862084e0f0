pub mod file;
pub mod org;

pub use file::FilePlane;
pub use org::OrgPlane;

use crate::config::Operation;
use crate::engine::{OnProgress, ResultRow};
use crate::error::Result;
use crate::model::{ObjectDescribe, Row};
use crate::soql::SoqlQuery;
use async_trait::async_trait;
use std::path::PathBuf;

/// One side's data plane: a live API-backed org or a flat-file directory.
/// The orchestrator talks to both sides exclusively through this trait.
#[async_trait]
pub trait DataPlane: Send + Sync {
    /// Human-readable endpoint label for messages
    fn label(&self) -> String;

    /// Flat-file planes always serve all records and never run engines
    fn is_file(&self) -> bool;

    /// Directory backing a file plane, shared with the CSV cache
    fn directory(&self) -> Option<PathBuf> {
        None
    }

    /// Object schema on this side
    async fn describe(&self, object: &str) -> Result<ObjectDescribe>;

    /// Run a query and return its rows
    async fn query(&self, query: &SoqlQuery) -> Result<Vec<Row>>;

    /// Run the count-only shape of a query
    async fn query_count(&self, query: &SoqlQuery) -> Result<usize>;

    /// Commit a record set through the throughput-appropriate execution
    /// strategy; one result row per input row, input order preserved
    async fn execute(
        &self,
        object: &str,
        operation: Operation,
        external_id: Option<String>,
        records: Vec<Row>,
        on_progress: OnProgress<'_>,
    ) -> Result<Vec<ResultRow>>;
}
