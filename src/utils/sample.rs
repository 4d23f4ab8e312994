use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::defs::PipelineError;

// Stage-output kinds tracked on a sample record.
pub const SAMPLE_FOLDER_KEY: &str = "sample_folder";
pub const FASTQ_FOLDER_KEY: &str = "fastq_folder";
pub const RAW_FQ1_KEY: &str = "raw_fq1";
pub const RAW_FQ2_KEY: &str = "raw_fq2";
pub const READY_FQ1_KEY: &str = "ready_fq1";
pub const READY_FQ2_KEY: &str = "ready_fq2";
pub const BAM_FOLDER_KEY: &str = "bam_folder";
pub const RAW_BAM_KEY: &str = "raw_bam";
pub const READY_BAM_KEY: &str = "ready_bam";
pub const COUNT_FILE_KEY: &str = "count_file";

/// One biological sample across its lifecycle. The name is fixed at
/// construction; artifact paths accumulate monotonically as stages complete
/// and are never overwritten.
#[derive(Debug, Clone)]
pub struct Sample {
    name: String,
    attributes: HashMap<String, PathBuf>,
}

impl Sample {
    pub fn new(name: &str) -> Result<Self, PipelineError> {
        if name.is_empty() {
            return Err(PipelineError::SampleAttribute(
                "sample name must not be empty".to_string(),
            ));
        }
        Ok(Sample {
            name: name.to_string(),
            attributes: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records a stage output. Empty keys, empty values and overwrites are
    /// all rejected.
    pub fn add(&mut self, key: &str, value: impl Into<PathBuf>) -> Result<(), PipelineError> {
        let value = value.into();
        if key.is_empty() {
            return Err(PipelineError::SampleAttribute(format!(
                "empty attribute key on sample {}",
                self.name
            )));
        }
        if value.as_os_str().is_empty() {
            return Err(PipelineError::SampleAttribute(format!(
                "empty value for attribute {} on sample {}",
                key, self.name
            )));
        }
        if self.attributes.contains_key(key) {
            return Err(PipelineError::SampleAttribute(format!(
                "attribute {} already set on sample {}",
                key, self.name
            )));
        }
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<&Path, PipelineError> {
        self.attributes
            .get(key)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                PipelineError::SampleAttribute(format!(
                    "attribute {} not set on sample {}",
                    key, self.name
                ))
            })
    }

    pub fn sample_folder(&self) -> Result<&Path, PipelineError> {
        self.get(SAMPLE_FOLDER_KEY)
    }

    pub fn fastq_folder(&self) -> Result<&Path, PipelineError> {
        self.get(FASTQ_FOLDER_KEY)
    }

    pub fn raw_fq1(&self) -> Result<&Path, PipelineError> {
        self.get(RAW_FQ1_KEY)
    }

    pub fn raw_fq2(&self) -> Result<&Path, PipelineError> {
        self.get(RAW_FQ2_KEY)
    }

    pub fn ready_fq1(&self) -> Result<&Path, PipelineError> {
        self.get(READY_FQ1_KEY)
    }

    pub fn ready_fq2(&self) -> Result<&Path, PipelineError> {
        self.get(READY_FQ2_KEY)
    }

    pub fn bam_folder(&self) -> Result<&Path, PipelineError> {
        self.get(BAM_FOLDER_KEY)
    }

    pub fn raw_bam(&self) -> Result<&Path, PipelineError> {
        self.get(RAW_BAM_KEY)
    }

    pub fn ready_bam(&self) -> Result<&Path, PipelineError> {
        self.get(READY_BAM_KEY)
    }

    pub fn count_file(&self) -> Result<&Path, PipelineError> {
        self.get(COUNT_FILE_KEY)
    }
}
