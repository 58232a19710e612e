use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON input: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to encode or decode staged data: {0}")]
    CodecError(#[from] bincode::Error),

    #[error("Failed to build workflow graph: {0}")]
    GraphConstructionError(String),

    #[error("Workflow graph contains a cycle through node '{0}'")]
    GraphCycleError(String),

    #[error("No path '{0}' is defined in the workflow graph")]
    UnknownPathError(String),

    #[error("No plugin factory is registered for type '{0}'")]
    UnknownPluginTypeError(String),

    #[error("Plugin '{0}' failed: {1}")]
    PluginError(String, String),

    #[error("Remote execution failed: {0}")]
    RemoteExecutionError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
