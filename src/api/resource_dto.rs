use serde::{Deserialize, Serialize};

/// The on-disk form of a deployment descriptor referenced by `runsOn`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptionDto {
    /// "Local", "Grid" or "ManagedContainer".
    pub typ: String,

    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub file_adaptor: String,

    #[serde(default)]
    pub broker: String,

    #[serde(default)]
    pub install_dir: String,

    #[serde(default)]
    pub work_dir: String,

    #[serde(default)]
    pub runtime_dir: String,

    #[serde(default)]
    pub runtime_args: Vec<String>,

    #[serde(default)]
    pub credentials: Option<String>,
}
