use serde::{Deserialize, Serialize};

/// Which high-throughput engine variant to use when volume selection picks
/// the bulk path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BulkApiVersion {
    V1,
    #[default]
    V2,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunSettings {
    /// Record-count threshold above which the bulk engine is selected
    #[serde(default = "default_bulk_threshold")]
    pub bulk_threshold: usize,

    /// Force the direct engine regardless of volume
    #[serde(default)]
    pub always_use_rest: bool,

    /// Bulk engine variant
    #[serde(default)]
    pub bulk_api_version: BulkApiVersion,

    /// Maximum records per direct-engine batch
    #[serde(default = "default_rest_batch_size")]
    pub rest_batch_size: usize,

    /// Maximum records per bulk-engine batch
    #[serde(default = "default_bulk_batch_size")]
    pub bulk_batch_size: usize,

    /// Bulk job poll interval (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Bulk job poll timeout (seconds)
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Block and confirm before continuing past missing parent lookups
    #[serde(default)]
    pub prompt_on_missing_parent: bool,

    /// Block and confirm instead of aborting on a failed commit chunk
    #[serde(default)]
    pub prompt_on_update_error: bool,

    /// Business-key field assumed when an object omits `external_id`
    #[serde(default = "default_external_id")]
    pub default_external_id: String,

    /// Bounded retries for commit batches (0 = none, the base contract)
    #[serde(default)]
    pub commit_retries: usize,

    /// Serialized-filter length budget for chunked IN queries
    #[serde(default = "default_filter_budget")]
    pub filter_length_budget: usize,

    /// Directory used for file-mode sides and emitted reports
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            bulk_threshold: default_bulk_threshold(),
            always_use_rest: false,
            bulk_api_version: BulkApiVersion::default(),
            rest_batch_size: default_rest_batch_size(),
            bulk_batch_size: default_bulk_batch_size(),
            poll_interval_ms: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
            prompt_on_missing_parent: false,
            prompt_on_update_error: false,
            default_external_id: default_external_id(),
            commit_retries: 0,
            filter_length_budget: default_filter_budget(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_bulk_threshold() -> usize {
    200
}
fn default_rest_batch_size() -> usize {
    200
}
fn default_bulk_batch_size() -> usize {
    9500
}
fn default_poll_interval() -> u64 {
    3000
}
fn default_poll_timeout() -> u64 {
    600
}
fn default_external_id() -> String {
    "Name".to_string()
}
fn default_filter_budget() -> usize {
    crate::soql::DEFAULT_FILTER_LENGTH_BUDGET
}
fn default_data_dir() -> String {
    "./data".to_string()
}
