use serde::{Deserialize, Serialize};

/// Where a plugin instance executes, selected by a `runsOn` triple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ResourceDescription {
    /// In-process execution. The default when no `runsOn` is present.
    #[default]
    Local,

    /// Out-of-process execution on a grid resource.
    Grid(GridDeployment),

    /// Execution inside a managed container of the platform.
    ManagedContainer { uri: String },
}

/// Deployment properties of a grid resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridDeployment {
    /// Contact URI of the resource.
    pub uri: String,

    /// Name of the file-transfer adaptor used for staging.
    pub file_adaptor: String,

    /// Name of the resource broker used for job submission.
    pub broker: String,

    /// Platform installation directory on the resource.
    pub install_dir: String,

    /// Working directory on the resource; staged files land here.
    pub work_dir: String,

    /// Directory holding the platform runtime used to launch plugins.
    pub runtime_dir: String,

    /// Extra arguments passed to the runtime ahead of the launch command.
    pub runtime_args: Vec<String>,

    /// Opaque credential reference handed to the broker.
    pub credentials: Option<String>,
}
