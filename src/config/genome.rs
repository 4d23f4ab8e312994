use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::cli::Reference;
use crate::config::defs::PipelineError;

/// Per-build reference data consumed by the align and quantify stages.
#[derive(Debug, Clone, Deserialize)]
pub struct GenomeReference {
    pub hisat2_index: PathBuf,
    pub gtf: PathBuf,
}

/// Loads the genome configuration yaml and selects the entry for the
/// requested reference build.
pub fn load_genome_config(
    config_yaml: &Path,
    reference: Reference,
) -> Result<GenomeReference, PipelineError> {
    let file = File::open(config_yaml).map_err(|e| {
        PipelineError::InvalidConfig(format!(
            "cannot open genome config {}: {}",
            config_yaml.display(),
            e
        ))
    })?;
    let genomes: HashMap<String, GenomeReference> =
        serde_yaml::from_reader(file).map_err(|e| {
            PipelineError::InvalidConfig(format!(
                "cannot parse genome config {}: {}",
                config_yaml.display(),
                e
            ))
        })?;

    let key = reference.to_string();
    let genome = genomes.get(&key).cloned().ok_or_else(|| {
        PipelineError::InvalidConfig(format!(
            "reference {} has no entry in {}",
            key,
            config_yaml.display()
        ))
    })?;
    info!(
        "Using reference {}: index {}, annotation {}",
        key,
        genome.hisat2_index.display(),
        genome.gtf.display()
    );
    Ok(genome)
}
