use super::{Config, ConfigValidator};
use crate::error::{OrgBridgeError, Result};
use config::{Config as ConfigBuilder, Environment, File};
use std::env;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load() -> Result<Config> {
        let mut builder = ConfigBuilder::builder();

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path));
        } else {
            let config_files = [
                "config.yaml",
                "config.yml",
                "orgbridge.yaml",
                "orgbridge.yml",
            ];
            for file in &config_files {
                if Path::new(file).exists() {
                    builder = builder.add_source(File::with_name(file));
                    break;
                }
            }
        }

        // ORGBRIDGE__SETTINGS__BULK_THRESHOLD=500 becomes settings.bulk_threshold
        builder = builder.add_source(
            Environment::with_prefix("ORGBRIDGE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| OrgBridgeError::Configuration(format!("Failed to build config: {}", e)))?;

        let mut config: Config = config.try_deserialize().map_err(|e| {
            OrgBridgeError::Configuration(format!("Failed to deserialize config: {}", e))
        })?;

        config.normalize();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from an explicitly named file, bypassing
    /// discovery and environment overlays
    pub fn load_from_file(path: &str) -> Result<Config> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&text)?;
        config.normalize();
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Create a sample configuration file
    pub fn generate_sample() -> &'static str {
        r#"# orgbridge configuration example
# Copy this file to config.yaml and adjust for your environment

app:
  name: orgbridge-dev
  tags:
    environment: development

# Source data plane: a live org or a flat-file directory
source:
  type: org
  base_url: https://source.example.com
  access_token: ${SOURCE_TOKEN}
  api_version: "60.0"
  # username: csvfile   # Uncomment to read this side from settings.data_dir

# Target data plane
target:
  type: org
  base_url: https://target.example.com
  access_token: ${TARGET_TOKEN}
  api_version: "60.0"

# Migration plan: one entry per object, ordered as declared
objects:
  - query: SELECT Id, Name, Industry FROM Account
    operation: upsert
    external_id: Name

  - query: SELECT Id, LastName, Email, AccountId FROM Contact
    operation: upsert
    external_id: Email
    delete_old_data: false

  - query: SELECT Id, DeveloperName, SobjectType FROM RecordType
    operation: readonly

settings:
  bulk_threshold: 200
  always_use_rest: false
  bulk_api_version: v2
  poll_interval_ms: 3000
  poll_timeout_secs: 600
  prompt_on_missing_parent: false
  prompt_on_update_error: false
  default_external_id: Name
  data_dir: ./data

logging:
  level: info
  format: text  # text or json
"#
    }
}
