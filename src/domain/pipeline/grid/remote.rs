use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::graph::resource::GridDeployment;
use crate::domain::pipeline::grid::{env_keys, FileTransfer, JobSpec, JobState, ResourceBroker, RUNTIME_BINARY};
use crate::domain::pipeline::strategy::ExecutionStrategy;
use crate::domain::triple::TripleSet;
use crate::domain::utils::id::JobId;
use crate::error::{Error, Result};

/// Interval between job-state polls.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Executes a plugin out of process on a grid resource.
///
/// Four phases: stage-in the serialized input and parameters, submit a
/// job running the platform launcher, poll the job state until terminal,
/// stage the output file back.
///
/// Every phase failure is caught, logged and downgraded to an empty
/// result so the pipeline keeps flowing; this is deliberately asymmetric
/// with the fail-hard local strategy.
pub struct RemoteStrategy {
    deployment: GridDeployment,
    plugin_type: String,
    plugin_id: String,
    transfer: Arc<dyn FileTransfer>,
    broker: Arc<dyn ResourceBroker>,
}

impl RemoteStrategy {
    pub fn new(
        deployment: GridDeployment,
        plugin_type: impl Into<String>,
        plugin_id: impl Into<String>,
        transfer: Arc<dyn FileTransfer>,
        broker: Arc<dyn ResourceBroker>,
    ) -> Self {
        RemoteStrategy {
            deployment,
            plugin_type: plugin_type.into(),
            plugin_id: plugin_id.into(),
            transfer,
            broker,
        }
    }

    async fn run(&self, input: &TripleSet, parameters: &TripleSet) -> Result<TripleSet> {
        let staging = Staging::prepare(&self.deployment, &self.plugin_id).await?;

        // Stage-in
        self.stage_in(&staging, input, parameters).await?;

        // Submit
        let spec = self.job_spec(&staging);
        let job = self.broker.submit(&spec).await?;
        log::info!("Plugin '{}' submitted as job '{}' to '{}'", self.plugin_id, job, self.deployment.uri);

        // Poll
        let final_state = self.poll(&job).await?;
        self.relay_captured_output(&staging).await;

        if let JobState::Failed(reason) = final_state {
            return Err(Error::RemoteExecutionError(format!("job '{}' failed: {}", job, reason)));
        }

        // Stage-out
        self.stage_out(&staging).await
    }

    async fn stage_in(&self, staging: &Staging, input: &TripleSet, parameters: &TripleSet) -> Result<()> {
        let input_bytes = bincode::serialize(input)?;
        let parameter_bytes = bincode::serialize(parameters)?;

        tokio::fs::write(&staging.local_input, input_bytes).await?;
        tokio::fs::write(&staging.local_parameters, parameter_bytes).await?;

        self.transfer.copy_to(&staging.local_input, &staging.remote_input).await?;
        self.transfer.copy_to(&staging.local_parameters, &staging.remote_parameters).await?;

        log::debug!("Staged input and parameters for plugin '{}' into '{}'", self.plugin_id, self.deployment.work_dir);
        Ok(())
    }

    fn job_spec(&self, staging: &Staging) -> JobSpec {
        let mut environment = HashMap::new();
        environment.insert(env_keys::INPUT_FILE.to_string(), staging.remote_input.clone());
        environment.insert(env_keys::PARAMETERS_FILE.to_string(), staging.remote_parameters.clone());
        environment.insert(env_keys::OUTPUT_FILE.to_string(), staging.remote_output.clone());
        environment.insert(env_keys::INSTALL_DIR.to_string(), self.deployment.install_dir.clone());
        environment.insert(env_keys::PLUGIN_TYPE.to_string(), self.plugin_type.clone());
        environment.insert(env_keys::PLUGIN_ID.to_string(), self.plugin_id.clone());

        let mut arguments = self.deployment.runtime_args.clone();
        arguments.push("launch".to_string());

        JobSpec {
            executable: PathBuf::from(&self.deployment.runtime_dir).join(RUNTIME_BINARY),
            arguments,
            environment,
            work_dir: PathBuf::from(&self.deployment.work_dir),
            stdout_path: staging.stdout_path.clone(),
            stderr_path: staging.stderr_path.clone(),
        }
    }

    /// Sleep-polls the job until a terminal state, logging transitions.
    async fn poll(&self, job: &JobId) -> Result<JobState> {
        let mut last_state: Option<JobState> = None;

        loop {
            let state = self.broker.state(job).await?;

            if last_state.as_ref() != Some(&state) {
                log::info!("Job '{}' is now {:?}", job, state);
                last_state = Some(state.clone());
            }

            if state.is_terminal() {
                return Ok(state);
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn stage_out(&self, staging: &Staging) -> Result<TripleSet> {
        self.transfer.copy_from(&staging.remote_output, &staging.local_output).await?;

        let bytes = tokio::fs::read(&staging.local_output).await?;
        let output: TripleSet = bincode::deserialize(&bytes)?;

        log::debug!("Staged {} result triples back for plugin '{}'", output.len(), self.plugin_id);
        Ok(output)
    }

    /// Best-effort relay of the captured remote stdout/stderr.
    async fn relay_captured_output(&self, staging: &Staging) {
        for (label, path) in [("stdout", &staging.stdout_path), ("stderr", &staging.stderr_path)] {
            match tokio::fs::read_to_string(path).await {
                Ok(content) if !content.trim().is_empty() => {
                    log::debug!("Job {} of plugin '{}':\n{}", label, self.plugin_id, content.trim_end());
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl ExecutionStrategy for RemoteStrategy {
    async fn execute(&self, input: &TripleSet, parameters: &TripleSet) -> Result<TripleSet> {
        match self.run(input, parameters).await {
            Ok(output) => Ok(output),
            Err(e) => {
                log::error!(
                    "Remote execution of plugin '{}' on '{}' failed; continuing with an empty result: {}",
                    self.plugin_id,
                    self.deployment.uri,
                    e
                );
                Ok(TripleSet::new())
            }
        }
    }
}

/// Local and remote file locations of one remote invocation.
struct Staging {
    local_input: PathBuf,
    local_parameters: PathBuf,
    local_output: PathBuf,
    remote_input: String,
    remote_parameters: String,
    remote_output: String,
    stdout_path: PathBuf,
    stderr_path: PathBuf,
}

impl Staging {
    async fn prepare(deployment: &GridDeployment, plugin_id: &str) -> Result<Staging> {
        let token = Uuid::new_v4();

        let local_dir = std::env::temp_dir().join(format!("pipeline-stage-{}", token));
        tokio::fs::create_dir_all(&local_dir).await?;

        let plugin_tag = plugin_id.replace([':', '/'], "_");
        let remote_file = |suffix: &str| format!("{}/{}-{}.{}", deployment.work_dir, plugin_tag, token, suffix);

        Ok(Staging {
            local_input: local_dir.join("input.bin"),
            local_parameters: local_dir.join("parameters.bin"),
            local_output: local_dir.join("output.bin"),
            remote_input: remote_file("input.bin"),
            remote_parameters: remote_file("parameters.bin"),
            remote_output: remote_file("output.bin"),
            stdout_path: local_dir.join("job.out"),
            stderr_path: local_dir.join("job.err"),
        })
    }
}
