use serde::de::DeserializeOwned;
use std::fs;

use crate::api::description_dto::WorkflowDescriptionDto;
use crate::api::resource_dto::ResourceDescriptionDto;
use crate::domain::graph::resource::{GridDeployment, ResourceDescription};
use crate::domain::triple::{Triple, TripleSet};
use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// Errors are converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path)?;
    let parsed_data: T = serde_json::from_str(&data)?;

    Ok(parsed_data)
}

/// Loads a workflow description file into a triple collection.
pub fn load_description(file_path: &str) -> Result<TripleSet> {
    let dto = parse_json_file::<WorkflowDescriptionDto>(file_path)?;

    if let Some(name) = &dto.name {
        log::info!("Loaded workflow description '{}' ({} triples)", name, dto.triples.len());
    }

    Ok(dto
        .triples
        .into_iter()
        .map(|t| Triple { subject: t.subject, predicate: t.predicate, object: t.object, graph: t.graph })
        .collect())
}

/// Loads a deployment descriptor referenced by a `runsOn` triple.
pub fn load_resource_description(file_path: &str) -> Result<ResourceDescription> {
    let dto = parse_json_file::<ResourceDescriptionDto>(file_path)?;

    match dto.typ.as_str() {
        "Local" => Ok(ResourceDescription::Local),
        "ManagedContainer" => Ok(ResourceDescription::ManagedContainer { uri: dto.uri }),
        "Grid" => Ok(ResourceDescription::Grid(GridDeployment {
            uri: dto.uri,
            file_adaptor: dto.file_adaptor,
            broker: dto.broker,
            install_dir: dto.install_dir,
            work_dir: dto.work_dir,
            runtime_dir: dto.runtime_dir,
            runtime_args: dto.runtime_args,
            credentials: dto.credentials,
        })),
        other => Err(Error::GraphConstructionError(format!(
            "deployment descriptor '{}' has unknown resource type '{}'",
            file_path, other
        ))),
    }
}
