use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::process::Stdio;

use log::{error, info};
use serde::Deserialize;
use tokio::process::Command;

use crate::config::defs::{CONTAINER_TOOLS, DOCKER_TAG, PipelineError};
use crate::utils::streams::{ChildStream, read_child_output_to_vec};

#[derive(Debug, Clone, Deserialize)]
pub struct DockerImage {
    pub image: String,
}

/// Tool name to container image mapping from the docker images yaml.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct DockerConfig {
    images: HashMap<String, DockerImage>,
}

impl DockerConfig {
    pub fn image(&self, tool: &str) -> Result<&str, PipelineError> {
        self.images
            .get(tool)
            .map(|entry| entry.image.as_str())
            .ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "no docker image configured for {}",
                    tool
                ))
            })
    }
}

/// Loads the docker images yaml. Every container-executed tool must have an
/// entry; a missing one is fatal before any sample is touched.
pub fn load_docker_config(docker_yaml: &Path) -> Result<DockerConfig, PipelineError> {
    let file = File::open(docker_yaml).map_err(|e| {
        PipelineError::InvalidConfig(format!(
            "cannot open docker config {}: {}",
            docker_yaml.display(),
            e
        ))
    })?;
    let config: DockerConfig = serde_yaml::from_reader(file).map_err(|e| {
        PipelineError::InvalidConfig(format!(
            "cannot parse docker config {}: {}",
            docker_yaml.display(),
            e
        ))
    })?;
    for tool in CONTAINER_TOOLS.iter() {
        config.image(tool)?;
    }
    Ok(config)
}

/// Checks each configured image against the local container runtime.
/// An absent image is reported loudly but does not abort the run; the stage
/// that needs it will fail with the full docker diagnostics instead.
pub async fn validate_images(docker_bin: &Path, config: &DockerConfig) {
    let mut entries: Vec<(&String, &DockerImage)> = config.images.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (tool, entry) in entries {
        match image_listing_rows(docker_bin, &entry.image).await {
            Ok(1) => info!("Found docker image {} for {}", entry.image, tool),
            Ok(rows) => error!(
                "Docker image {} for {} was not found exactly once in the local listing ({} rows)",
                entry.image, tool, rows
            ),
            Err(e) => error!("Could not query docker for image {}: {}", entry.image, e),
        }
    }
}

/// Runs `docker image ls <image>` and counts the data rows under the header.
async fn image_listing_rows(docker_bin: &Path, image: &str) -> Result<usize, PipelineError> {
    let mut child = Command::new(docker_bin)
        .args(["image", "ls", image])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| PipelineError::ToolExecution {
            tool: DOCKER_TAG.to_string(),
            error: format!("failed to spawn: {}", e),
        })?;

    let lines = read_child_output_to_vec(&mut child, ChildStream::Stdout)
        .await
        .map_err(|e| PipelineError::ToolExecution {
            tool: DOCKER_TAG.to_string(),
            error: e.to_string(),
        })?;
    let status = child.wait().await.map_err(|e| PipelineError::ToolExecution {
        tool: DOCKER_TAG.to_string(),
        error: e.to_string(),
    })?;
    if !status.success() {
        return Err(PipelineError::ToolExecution {
            tool: DOCKER_TAG.to_string(),
            error: format!("image ls {} exited with {}", image, status),
        });
    }

    Ok(lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count())
}
