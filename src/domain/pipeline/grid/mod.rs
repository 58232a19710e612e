pub mod launcher;
pub mod process_broker;
pub mod remote;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::utils::id::JobId;
use crate::error::Result;

/// Environment keys handed to the remote launcher process.
pub mod env_keys {
    pub const INPUT_FILE: &str = "PIPELINE_INPUT_FILE";
    pub const PARAMETERS_FILE: &str = "PIPELINE_PARAMETERS_FILE";
    pub const OUTPUT_FILE: &str = "PIPELINE_OUTPUT_FILE";
    pub const INSTALL_DIR: &str = "PIPELINE_INSTALL_DIR";
    pub const PLUGIN_TYPE: &str = "PIPELINE_PLUGIN_TYPE";
    pub const PLUGIN_ID: &str = "PIPELINE_PLUGIN_ID";
}

/// Name of the platform binary inside a deployment's runtime directory.
pub const RUNTIME_BINARY: &str = "reasoning-pipeline";

/// A job submission handed to a resource broker.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    pub environment: HashMap<String, String>,
    pub work_dir: PathBuf,

    /// The remote process' stdout/stderr are captured to these files and
    /// relayed to the log after the job finishes.
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

/// Observable lifecycle of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed(_))
    }
}

/// Submits jobs to a grid resource and reports their state.
#[async_trait]
pub trait ResourceBroker: Send + Sync {
    async fn submit(&self, spec: &JobSpec) -> Result<JobId>;

    async fn state(&self, job: &JobId) -> Result<JobState>;
}

/// Copies files between the local staging area and a resource's working
/// directory.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    async fn copy_to(&self, local: &Path, remote: &str) -> Result<()>;

    async fn copy_from(&self, remote: &str, local: &Path) -> Result<()>;
}

/// File transfer for resources sharing a filesystem with the platform.
pub struct SharedFsTransfer;

#[async_trait]
impl FileTransfer for SharedFsTransfer {
    async fn copy_to(&self, local: &Path, remote: &str) -> Result<()> {
        if let Some(parent) = Path::new(remote).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, remote).await?;
        Ok(())
    }

    async fn copy_from(&self, remote: &str, local: &Path) -> Result<()> {
        tokio::fs::copy(remote, local).await?;
        Ok(())
    }
}
