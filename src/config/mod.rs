use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod connection;
mod loader;
mod logging;
mod object;
mod settings;
mod validation;

pub use connection::*;
pub use loader::*;
pub use logging::*;
pub use object::*;
pub use settings::*;
pub use validation::*;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Application metadata
    #[serde(default)]
    pub app: AppConfig,

    /// Source data plane
    pub source: EndpointConfig,

    /// Target data plane
    pub target: EndpointConfig,

    /// Declarative migration plan: one entry per object
    pub objects: Vec<ObjectConfig>,

    /// Run settings (engine thresholds, prompts, polling)
    #[serde(default)]
    pub settings: RunSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_run_id")]
    pub run_id: String,

    #[serde(default)]
    pub tags: HashMap<String, String>,
}

fn default_name() -> String {
    "orgbridge".to_string()
}

fn default_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Config {
    /// Apply the file-mode degradation sentinel to both sides (an org
    /// endpoint whose username is the sentinel collapses to a flat-file
    /// directory endpoint).
    pub fn normalize(&mut self) {
        self.source = self.source.clone().degraded(&self.settings.data_dir);
        self.target = self.target.clone().degraded(&self.settings.data_dir);
    }
}
