use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info, warn};
use tokio::process::{ChildStdout, Command};

use crate::config::defs::{
    BAM_FOLDER_NAME, FASTQC_TAG, HISAT2_TAG, PICARD_TAG, PipelineError, RunConfig, SAMTOOLS_TAG,
};
use crate::utils::command::fastqc::FastqcConfig;
use crate::utils::command::hisat2::Hisat2Config;
use crate::utils::command::picard::MarkDuplicatesConfig;
use crate::utils::command::samtools::SamtoolsTask;
use crate::utils::command::{self, run_tool};
use crate::utils::file::{artifact_exists, basename, fastqc_report_name};
use crate::utils::sample::{self, Sample};

/// Aligns every sample's trimmed mates, quality-reports the raw mates,
/// marks duplicates and indexes both the raw and the deduplicated alignment.
pub async fn run(config: &RunConfig, sample_list: &mut [Sample]) -> Result<(), PipelineError> {
    for sample in sample_list.iter_mut() {
        let bam_folder = sample.sample_folder()?.join(BAM_FOLDER_NAME);
        fs::create_dir_all(&bam_folder)?;
        sample.add(sample::BAM_FOLDER_KEY, &bam_folder)?;

        let bam = hisat2_align(config, sample, &bam_folder).await?;
        index_bam(config, &bam).await?;
        sample.add(sample::RAW_BAM_KEY, &bam)?;

        fastqc(config, sample.raw_fq1()?, sample.fastq_folder()?).await?;
        fastqc(config, sample.raw_fq2()?, sample.fastq_folder()?).await?;

        let rmdup_bam = mark_duplicates(config, &bam).await?;
        index_bam(config, &rmdup_bam).await?;
        sample.add(sample::READY_BAM_KEY, rmdup_bam)?;
    }
    Ok(())
}

/// Quality report on one raw mate through the containerized fastqc, with an
/// artifact check of its own, independent of the alignment artifact. The
/// report feeds no later stage, so a clean exit without it only warns.
pub async fn fastqc(
    config: &RunConfig,
    fastq: &Path,
    fastq_folder: &Path,
) -> Result<PathBuf, PipelineError> {
    let fastq_name = basename(fastq)?;
    let report = fastq_folder.join(fastqc_report_name(&fastq_name));

    if artifact_exists(&report) {
        info!("Skipping fastqc for {}", fastq_name);
        return Ok(report);
    }

    info!("Running fastqc on {}", fastq_name);
    let image = config.docker.image(FASTQC_TAG)?;
    let args = command::fastqc::arg_generator(&FastqcConfig {
        fastq,
        out_dir: fastq_folder,
        image,
        threads: config.threads,
    })?;
    run_tool(&config.tools.docker, &args, FASTQC_TAG).await?;

    if !artifact_exists(&report) {
        warn!("fastqc finished without producing {}", report.display());
    }
    Ok(report)
}

/// hisat2 piped through `samtools view -Sb` and `samtools sort` into the
/// sample's coordinate-sorted BAM. Skipped when the BAM already exists.
pub async fn hisat2_align(
    config: &RunConfig,
    sample: &Sample,
    bam_folder: &Path,
) -> Result<PathBuf, PipelineError> {
    let bam = bam_folder.join(format!("{}.bam", sample.name()));
    if artifact_exists(&bam) {
        info!("Skipping hisat2 mapping for sample {}", sample.name());
        return Ok(bam);
    }

    let summary_file = bam_folder.join(format!("{}.summary.alignment.txt", sample.name()));
    info!("Aligning sample {}", sample.name());

    let hisat2_args = command::hisat2::arg_generator(&Hisat2Config {
        index: &config.genome.hisat2_index,
        fq1: sample.ready_fq1()?,
        fq2: sample.ready_fq2()?,
        threads: config.threads,
        sample_name: sample.name(),
        summary_file: &summary_file,
    });
    let mut hisat2_child = Command::new(&config.tools.hisat2)
        .args(&hisat2_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(HISAT2_TAG, &e))?;
    let hisat2_stdout = hisat2_child
        .stdout
        .take()
        .ok_or_else(|| pipe_error(HISAT2_TAG))?;

    let view_args = command::samtools::arg_generator(&SamtoolsTask::View);
    let mut view_child = Command::new(&config.tools.samtools)
        .args(&view_args)
        .stdin(wire_stdin(hisat2_stdout)?)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(SAMTOOLS_TAG, &e))?;
    let view_stdout = view_child
        .stdout
        .take()
        .ok_or_else(|| pipe_error(SAMTOOLS_TAG))?;

    let sort_args = command::samtools::arg_generator(&SamtoolsTask::Sort {
        prefix: sample.name(),
        bam_out: &bam,
    });
    let mut sort_child = Command::new(&config.tools.samtools)
        .args(&sort_args)
        .stdin(wire_stdin(view_stdout)?)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(SAMTOOLS_TAG, &e))?;

    let (hisat2_out, view_out, sort_out) = tokio::try_join!(
        hisat2_child.wait_with_output(),
        view_child.wait_with_output(),
        sort_child.wait_with_output(),
    )
    .map_err(|e| PipelineError::AlignmentFailure {
        sample: sample.name().to_string(),
        error: e.to_string(),
    })?;

    for (tag, output) in [
        (HISAT2_TAG, &hisat2_out),
        (SAMTOOLS_TAG, &view_out),
        (SAMTOOLS_TAG, &sort_out),
    ] {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", tag, stderr.trim());
        }
        if !output.status.success() {
            return Err(PipelineError::AlignmentFailure {
                sample: sample.name().to_string(),
                error: format!("{} exit status {}: {}", tag, output.status, stderr.trim()),
            });
        }
    }
    if !artifact_exists(&bam) {
        return Err(PipelineError::AlignmentFailure {
            sample: sample.name().to_string(),
            error: format!("alignment completed without producing {}", bam.display()),
        });
    }
    Ok(bam)
}

/// Creates the sorted-index sidecar for an alignment file if not already
/// present.
pub async fn index_bam(config: &RunConfig, bam: &Path) -> Result<(), PipelineError> {
    let bai = bam.with_extension("bam.bai");
    if artifact_exists(&bai) {
        return Ok(());
    }
    let args = command::samtools::arg_generator(&SamtoolsTask::Index { bam });
    run_tool(&config.tools.samtools, &args, SAMTOOLS_TAG).await?;
    Ok(())
}

/// Marks duplicate reads with the containerized picard, producing the
/// filtered BAM and its metrics report. Skipped when the filtered BAM
/// already exists.
pub async fn mark_duplicates(config: &RunConfig, bam: &Path) -> Result<PathBuf, PipelineError> {
    let bam_dir = bam.parent().ok_or_else(|| {
        PipelineError::IOError(format!("{} has no parent directory", bam.display()))
    })?;
    let bam_name = basename(bam)?;
    let stem = bam_name.strip_suffix(".bam").unwrap_or(&bam_name);
    let rmdup_name = format!("{}.rmdup.bam", stem);
    let metrics_name = format!("{}.rmdup.picard.txt", stem);
    let rmdup_bam = bam_dir.join(&rmdup_name);

    if artifact_exists(&rmdup_bam) {
        info!("Skipping duplicate marking for {}", bam.display());
        return Ok(rmdup_bam);
    }

    info!("Marking duplicates for {}", bam.display());
    let image = config.docker.image(PICARD_TAG)?;
    let args = command::picard::arg_generator(&MarkDuplicatesConfig {
        bam_dir,
        bam_in: &bam_name,
        bam_out: &rmdup_name,
        metrics: &metrics_name,
        image,
    });
    run_tool(&config.tools.docker, &args, PICARD_TAG).await?;

    if !artifact_exists(&rmdup_bam) {
        return Err(PipelineError::ToolExecution {
            tool: PICARD_TAG.to_string(),
            error: format!("completed without producing {}", rmdup_bam.display()),
        });
    }
    Ok(rmdup_bam)
}

fn wire_stdin(upstream: ChildStdout) -> Result<Stdio, PipelineError> {
    upstream.try_into().map_err(|e: std::io::Error| {
        PipelineError::ToolExecution {
            tool: SAMTOOLS_TAG.to_string(),
            error: format!("cannot wire child stdout: {}", e),
        }
    })
}

fn spawn_error(tag: &str, e: &std::io::Error) -> PipelineError {
    PipelineError::ToolExecution {
        tool: tag.to_string(),
        error: format!("failed to spawn: {}", e),
    }
}

fn pipe_error(tag: &str) -> PipelineError {
    PipelineError::ToolExecution {
        tool: tag.to_string(),
        error: "failed to capture stdout".to_string(),
    }
}
