use std::path::PathBuf;

use crate::domain::pipeline::grid::env_keys;
use crate::domain::plugin::PluginRegistry;
use crate::domain::triple::TripleSet;
use crate::error::{Error, Result};

/// Everything the remote launcher process needs, parsed from its
/// environment.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub input_file: PathBuf,
    pub parameters_file: PathBuf,
    pub output_file: PathBuf,
    pub install_dir: Option<String>,
    pub plugin_type: String,
    pub plugin_id: String,
}

impl LaunchConfig {
    /// Reads the launch environment written into the job spec by the
    /// remote strategy.
    pub fn from_env() -> Result<Self> {
        let required = |key: &str| {
            std::env::var(key)
                .map_err(|_| Error::RemoteExecutionError(format!("launcher environment is missing '{}'", key)))
        };

        Ok(LaunchConfig {
            input_file: PathBuf::from(required(env_keys::INPUT_FILE)?),
            parameters_file: PathBuf::from(required(env_keys::PARAMETERS_FILE)?),
            output_file: PathBuf::from(required(env_keys::OUTPUT_FILE)?),
            install_dir: std::env::var(env_keys::INSTALL_DIR).ok(),
            plugin_type: required(env_keys::PLUGIN_TYPE)?,
            plugin_id: required(env_keys::PLUGIN_ID)?,
        })
    }
}

/// Entry point of the out-of-process plugin run.
///
/// Deserializes the staged input and parameters, instantiates the target
/// plugin through the registry, initialises it when parameters are
/// present, invokes it and serializes the output back to the staged
/// output file.
pub async fn run_launcher(config: &LaunchConfig, registry: &PluginRegistry) -> Result<()> {
    log::info!("Launcher starting plugin '{}' ({})", config.plugin_id, config.plugin_type);

    let input: TripleSet = bincode::deserialize(&tokio::fs::read(&config.input_file).await?)?;
    let parameters: TripleSet = bincode::deserialize(&tokio::fs::read(&config.parameters_file).await?)?;

    let plugin = registry.create(&config.plugin_type)?;

    if !parameters.is_empty() {
        plugin
            .initialise(&parameters)
            .map_err(|e| Error::PluginError(config.plugin_id.clone(), e.to_string()))?;
    }

    let output = plugin
        .invoke(&input)
        .map_err(|e| Error::PluginError(config.plugin_id.clone(), e.to_string()))?;

    plugin.shutdown();

    tokio::fs::write(&config.output_file, bincode::serialize(&output)?).await?;
    log::info!("Launcher wrote {} result triples to '{}'", output.len(), config.output_file.display());

    Ok(())
}
