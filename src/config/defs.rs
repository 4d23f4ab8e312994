use std::path::PathBuf;

use lazy_static::lazy_static;
use thiserror::Error;

use crate::cli::Arguments;
use crate::config::docker::DockerConfig;
use crate::config::genome::GenomeReference;

// External software
pub const FASTP_TAG: &str = "fastp";
pub const HISAT2_TAG: &str = "hisat2";
pub const SAMTOOLS_TAG: &str = "samtools";
pub const DOCKER_TAG: &str = "docker";
pub const FASTQC_TAG: &str = "fastqc";
pub const PICARD_TAG: &str = "picard";
pub const FEATURECOUNTS_TAG: &str = "featureCounts";

lazy_static! {
    /// Tools executed through the container runtime; each one needs an entry
    /// in the docker images yaml.
    pub static ref CONTAINER_TOOLS: Vec<&'static str> =
        vec![FASTQC_TAG, PICARD_TAG, FEATURECOUNTS_TAG];
}

// Static Filenames
pub const FASTQ_FOLDER_NAME: &str = "FASTQ_FOLDER";
pub const BAM_FOLDER_NAME: &str = "BAM_FOLDER";
pub const TRIM_METRICS_NAME: &str = "fastp.json";

// Static name fragments
pub const FASTQ_GZ_EXT: &str = ".fastq.gz";
pub const FA_GZ_EXT: &str = ".fa.gz";
pub const TRIMMED_TAG: &str = "trimmed";
pub const UNDETERMINED_TAG: &str = "Undetermined";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input fastq not found: {}", .0.display())]
    FastqNotFound(PathBuf),

    #[error("Missing fastq pair for {0}")]
    MissingPair(String),

    #[error("Invalid fastq nomenclature for {fastq}: {problems}")]
    InvalidNomenclature { fastq: String, problems: String },

    #[error("Could not derive a sample name from {0}")]
    SampleName(String),

    #[error("Inconsistent mate files for sample {0}")]
    InconsistentPair(String),

    #[error("No input fastq files were detected in {}", .0.display())]
    NoInputFiles(PathBuf),

    #[error("Alignment failed for sample {sample}: {error}")]
    AlignmentFailure { sample: String, error: String },

    #[error("{tool} failed: {error}")]
    ToolExecution { tool: String, error: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid sample attribute: {0}")]
    SampleAttribute(String),

    #[error("I/O error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::IOError(e.to_string())
    }
}

/// Absolute paths of the external binaries invoked directly, resolved once at
/// process start and passed by reference into every stage.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub fastp: PathBuf,
    pub hisat2: PathBuf,
    pub samtools: PathBuf,
    pub docker: PathBuf,
}

/// Read-only run context shared by all stages.
pub struct RunConfig {
    pub cwd: PathBuf,
    pub fastq_dir: PathBuf,
    pub out_dir: PathBuf,
    pub threads: usize,
    pub genome: GenomeReference,
    pub docker: DockerConfig,
    pub tools: ToolPaths,
    pub args: Arguments,
}
