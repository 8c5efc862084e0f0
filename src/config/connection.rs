use serde::{Deserialize, Serialize};

/// Username sentinel that degrades an org endpoint to file mode
pub const FILE_MODE_SENTINEL: &str = "csvfile";

/// One side's data plane: a live API-backed org or a flat-file directory
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointConfig {
    Org(OrgEndpointConfig),
    Directory(DirectoryEndpointConfig),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrgEndpointConfig {
    /// Instance base URL
    pub base_url: String,

    /// Bearer token, produced by the external credential collaborator
    #[serde(default)]
    pub access_token: String,

    /// Username; the `csvfile` sentinel switches this side to file mode
    #[serde(default)]
    pub username: Option<String>,

    /// Protocol version
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryEndpointConfig {
    /// Directory holding one CSV file per object
    pub path: String,
}

fn default_api_version() -> String {
    "60.0".to_string()
}

impl EndpointConfig {
    pub fn is_file(&self) -> bool {
        matches!(self, EndpointConfig::Directory(_))
    }

    /// Collapse an org endpoint with the file sentinel username into a
    /// directory endpoint rooted at the configured data dir
    pub fn degraded(self, data_dir: &str) -> EndpointConfig {
        match &self {
            EndpointConfig::Org(org)
                if org.username.as_deref() == Some(FILE_MODE_SENTINEL) =>
            {
                EndpointConfig::Directory(DirectoryEndpointConfig {
                    path: data_dir.to_string(),
                })
            }
            _ => self,
        }
    }

    pub fn describe_label(&self) -> String {
        match self {
            EndpointConfig::Org(org) => org.base_url.clone(),
            EndpointConfig::Directory(dir) => format!("file:{}", dir.path),
        }
    }
}
