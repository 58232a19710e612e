use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use uuid::Uuid;

use crate::domain::pipeline::grid::{JobSpec, JobState, ResourceBroker};
use crate::domain::utils::id::JobId;
use crate::error::{Error, Result};

/// A broker that runs jobs as child processes of the platform.
///
/// This is the default broker for resources reached through a shared
/// filesystem; site-specific brokers implement the same trait.
#[derive(Default)]
pub struct ProcessBroker {
    children: Mutex<HashMap<JobId, Child>>,
}

impl ProcessBroker {
    pub fn new() -> Self {
        ProcessBroker { children: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl ResourceBroker for ProcessBroker {
    async fn submit(&self, spec: &JobSpec) -> Result<JobId> {
        let stdout = std::fs::File::create(&spec.stdout_path)?;
        let stderr = std::fs::File::create(&spec.stderr_path)?;

        let child = Command::new(&spec.executable)
            .args(&spec.arguments)
            .envs(&spec.environment)
            .current_dir(&spec.work_dir)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| {
                Error::RemoteExecutionError(format!("failed to spawn '{}': {}", spec.executable.display(), e))
            })?;

        let job_id = JobId::new(Uuid::new_v4().to_string());
        log::info!("Submitted job '{}' ({})", job_id, spec.executable.display());

        self.children.lock().expect("broker lock poisoned").insert(job_id.clone(), child);
        Ok(job_id)
    }

    async fn state(&self, job: &JobId) -> Result<JobState> {
        let mut children = self.children.lock().expect("broker lock poisoned");

        let Some(child) = children.get_mut(job) else {
            return Err(Error::RemoteExecutionError(format!("unknown job '{}'", job)));
        };

        match child.try_wait() {
            Ok(None) => Ok(JobState::Running),
            Ok(Some(status)) if status.success() => {
                children.remove(job);
                Ok(JobState::Succeeded)
            }
            Ok(Some(status)) => {
                children.remove(job);
                Ok(JobState::Failed(format!("exit status {}", status)))
            }
            Err(e) => Err(Error::RemoteExecutionError(format!("wait on job '{}' failed: {}", job, e))),
        }
    }
}
