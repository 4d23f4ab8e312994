use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::defs::{
    FASTP_TAG, FASTQ_FOLDER_NAME, PipelineError, RunConfig, TRIM_METRICS_NAME,
};
use crate::utils::command::fastp::FastpConfig;
use crate::utils::command::{self, run_tool};
use crate::utils::fastq::{ReadPair, unique_read_pairs};
use crate::utils::file::{artifact_exists, basename, collect_fastq_files, trimmed_fastq_name};
use crate::utils::sample::{self, Sample};

/// Discovers and validates the input read files, then trims every sample.
/// Returns the sample list the later stages iterate over.
pub async fn run(config: &RunConfig) -> Result<Vec<Sample>, PipelineError> {
    let fastq_files = collect_fastq_files(&config.fastq_dir, true)?;
    let pairs = unique_read_pairs(&fastq_files, config.args.strict_names)?;

    if config.args.check_consistency {
        for pair in &pairs {
            info!("Checking mate consistency for sample {}", pair.sample_name());
            if !pair.check_consistency()? {
                return Err(PipelineError::InconsistentPair(
                    pair.sample_name().to_string(),
                ));
            }
        }
    }

    let mut sample_list = Vec::new();
    for pair in pairs {
        let sample_folder = config.out_dir.join(pair.sample_name());
        fs::create_dir_all(&sample_folder)?;
        let fastq_folder = sample_folder.join(FASTQ_FOLDER_NAME);
        fs::create_dir_all(&fastq_folder)?;

        let mut sample = Sample::new(pair.sample_name())?;
        sample.add(sample::SAMPLE_FOLDER_KEY, &sample_folder)?;
        sample.add(sample::FASTQ_FOLDER_KEY, &fastq_folder)?;
        sample.add(sample::RAW_FQ1_KEY, pair.fq1())?;
        sample.add(sample::RAW_FQ2_KEY, pair.fq2())?;

        let (trimmed_fq1, trimmed_fq2) = trim_pair(config, &pair, &fastq_folder).await?;
        sample.add(sample::READY_FQ1_KEY, trimmed_fq1)?;
        sample.add(sample::READY_FQ2_KEY, trimmed_fq2)?;

        sample_list.push(sample);
    }
    Ok(sample_list)
}

/// Trims both raw mates with fastp, writing the trimmed pair and the trim
/// metrics document next to them. Skipped entirely when both trimmed mates
/// already exist.
pub async fn trim_pair(
    config: &RunConfig,
    pair: &ReadPair,
    fastq_folder: &Path,
) -> Result<(PathBuf, PathBuf), PipelineError> {
    let trimmed_fq1 = fastq_folder.join(trimmed_fastq_name(&basename(pair.fq1())?));
    let trimmed_fq2 = fastq_folder.join(trimmed_fastq_name(&basename(pair.fq2())?));
    let trim_metrics = fastq_folder.join(TRIM_METRICS_NAME);

    if artifact_exists(&trimmed_fq1) && artifact_exists(&trimmed_fq2) {
        info!("Skipping trimming for sample {}", pair.sample_name());
        return Ok((trimmed_fq1, trimmed_fq2));
    }

    info!("Trimming sample {}", pair.sample_name());
    let args = command::fastp::arg_generator(&FastpConfig {
        fq1: pair.fq1(),
        fq2: pair.fq2(),
        out1: &trimmed_fq1,
        out2: &trimmed_fq2,
        json: &trim_metrics,
        threads: config.threads,
    });
    run_tool(&config.tools.fastp, &args, FASTP_TAG).await?;

    for trimmed in [&trimmed_fq1, &trimmed_fq2] {
        if !artifact_exists(trimmed) {
            return Err(PipelineError::ToolExecution {
                tool: FASTP_TAG.to_string(),
                error: format!("completed without producing {}", trimmed.display()),
            });
        }
    }
    info!(
        "FASTQ trimming ended successfully for sample {}",
        pair.sample_name()
    );
    Ok((trimmed_fq1, trimmed_fq2))
}
