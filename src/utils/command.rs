/// Functions and structs for building and running external tool command lines.
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info};
use tokio::process::Command;

use crate::config::defs::{
    DOCKER_TAG, FASTP_TAG, HISAT2_TAG, PipelineError, SAMTOOLS_TAG, ToolPaths,
};
use crate::utils::streams::{ChildStream, read_child_output_to_vec};

pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one external command to completion, capturing stdout and stderr
/// separately. A non-zero exit status is the authoritative failure signal
/// for every stage; stderr content is diagnostic only and gets logged.
pub async fn run_tool(
    program: &Path,
    args: &[String],
    tag: &str,
) -> Result<ToolOutput, PipelineError> {
    debug!("{} {}", program.display(), args.join(" "));
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| PipelineError::ToolExecution {
            tool: tag.to_string(),
            error: format!("failed to spawn: {}", e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", tag, stderr.trim());
    }
    if !output.status.success() {
        return Err(PipelineError::ToolExecution {
            tool: tag.to_string(),
            error: format!("exit status {}: {}", output.status, stderr.trim()),
        });
    }
    Ok(ToolOutput { stdout, stderr })
}

/// Resolves a tool name to an absolute path through `which`.
pub async fn resolve_binary(tool: &str) -> Result<PathBuf, PipelineError> {
    let mut child = Command::new("which")
        .arg(tool)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            PipelineError::InvalidConfig(format!("failed to spawn which {}: {}", tool, e))
        })?;

    let lines = read_child_output_to_vec(&mut child, ChildStream::Stdout)
        .await
        .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
    let status = child
        .wait()
        .await
        .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;

    let path = lines.first().map(|line| line.trim()).unwrap_or_default();
    if !status.success() || path.is_empty() {
        return Err(PipelineError::InvalidConfig(format!(
            "Unable to find the PATH of {}",
            tool
        )));
    }
    Ok(PathBuf::from(path))
}

/// Resolves every directly-invoked binary once at process start. A tool
/// missing from PATH aborts the run before any sample is touched.
pub async fn resolve_tool_paths() -> Result<ToolPaths, PipelineError> {
    let tools = ToolPaths {
        fastp: resolve_binary(FASTP_TAG).await?,
        hisat2: resolve_binary(HISAT2_TAG).await?,
        samtools: resolve_binary(SAMTOOLS_TAG).await?,
        docker: resolve_binary(DOCKER_TAG).await?,
    };
    info!(
        "Resolved tools: fastp {}, hisat2 {}, samtools {}, docker {}",
        tools.fastp.display(),
        tools.hisat2.display(),
        tools.samtools.display(),
        tools.docker.display()
    );
    Ok(tools)
}

pub mod fastp {
    use std::path::Path;

    pub struct FastpConfig<'a> {
        pub fq1: &'a Path,
        pub fq2: &'a Path,
        pub out1: &'a Path,
        pub out2: &'a Path,
        pub json: &'a Path,
        pub threads: usize,
    }

    pub fn arg_generator(config: &FastpConfig) -> Vec<String> {
        vec![
            "-i".to_string(),
            config.fq1.display().to_string(),
            "-I".to_string(),
            config.fq2.display().to_string(),
            "-o".to_string(),
            config.out1.display().to_string(),
            "-O".to_string(),
            config.out2.display().to_string(),
            "-w".to_string(),
            config.threads.to_string(),
            "-j".to_string(),
            config.json.display().to_string(),
        ]
    }
}

pub mod hisat2 {
    use std::path::Path;

    pub struct Hisat2Config<'a> {
        pub index: &'a Path,
        pub fq1: &'a Path,
        pub fq2: &'a Path,
        pub threads: usize,
        pub sample_name: &'a str,
        pub summary_file: &'a Path,
    }

    /// `--rna-strandness RF` assumes a strand-specific library.
    pub fn arg_generator(config: &Hisat2Config) -> Vec<String> {
        vec![
            "-x".to_string(),
            config.index.display().to_string(),
            "-1".to_string(),
            config.fq1.display().to_string(),
            "-2".to_string(),
            config.fq2.display().to_string(),
            "-p".to_string(),
            config.threads.to_string(),
            format!("--rg-id={}", config.sample_name),
            "--rg".to_string(),
            format!("SM:{}", config.sample_name),
            "--rg".to_string(),
            "PL:ILLUMINA".to_string(),
            "--summary-file".to_string(),
            config.summary_file.display().to_string(),
            "--rna-strandness".to_string(),
            "RF".to_string(),
        ]
    }
}

pub mod samtools {
    use std::path::Path;

    /// The samtools invocations the align stage needs. View and Sort read
    /// the upstream tool's stdout on `-`.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum SamtoolsTask<'a> {
        View,
        Sort { prefix: &'a str, bam_out: &'a Path },
        Index { bam: &'a Path },
    }

    pub fn arg_generator(task: &SamtoolsTask) -> Vec<String> {
        match task {
            SamtoolsTask::View => vec![
                "view".to_string(),
                "-Sb".to_string(),
                "-".to_string(),
            ],
            SamtoolsTask::Sort { prefix, bam_out } => vec![
                "sort".to_string(),
                "-T".to_string(),
                (*prefix).to_string(),
                "-o".to_string(),
                bam_out.display().to_string(),
                "-".to_string(),
            ],
            SamtoolsTask::Index { bam } => {
                vec!["index".to_string(), bam.display().to_string()]
            }
        }
    }
}

pub mod docker {
    use std::path::Path;

    pub struct Mount<'a> {
        pub host: &'a Path,
        pub container: &'a str,
    }

    /// Builds the `run -v ... --rm <image> <tool args>` argv for the docker
    /// binary.
    pub fn run_args(image: &str, mounts: &[Mount], tool_args: &[String]) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        for mount in mounts {
            args.push("-v".to_string());
            args.push(format!("{}:{}", mount.host.display(), mount.container));
        }
        args.push("--rm".to_string());
        args.push(image.to_string());
        args.extend(tool_args.iter().cloned());
        args
    }
}

pub mod fastqc {
    use std::path::Path;

    use crate::config::defs::PipelineError;
    use crate::utils::command::docker::{Mount, run_args};
    use crate::utils::file::basename;

    pub struct FastqcConfig<'a> {
        pub fastq: &'a Path,
        pub out_dir: &'a Path,
        pub image: &'a str,
        pub threads: usize,
    }

    pub fn arg_generator(config: &FastqcConfig) -> Result<Vec<String>, PipelineError> {
        let fastq_dir = config.fastq.parent().ok_or_else(|| {
            PipelineError::IOError(format!(
                "{} has no parent directory",
                config.fastq.display()
            ))
        })?;
        let fastq_name = basename(config.fastq)?;

        let tool_args = vec![
            "-t".to_string(),
            config.threads.to_string(),
            "-f".to_string(),
            "fastq".to_string(),
            "-o".to_string(),
            "/output_dir".to_string(),
            format!("/fastq_dir/{}", fastq_name),
        ];
        Ok(run_args(
            config.image,
            &[
                Mount {
                    host: fastq_dir,
                    container: "/fastq_dir",
                },
                Mount {
                    host: config.out_dir,
                    container: "/output_dir",
                },
            ],
            &tool_args,
        ))
    }
}

pub mod picard {
    use std::path::Path;

    use crate::utils::command::docker::{Mount, run_args};

    /// All three files live in the sample's BAM folder, mounted once.
    pub struct MarkDuplicatesConfig<'a> {
        pub bam_dir: &'a Path,
        pub bam_in: &'a str,
        pub bam_out: &'a str,
        pub metrics: &'a str,
        pub image: &'a str,
    }

    pub fn arg_generator(config: &MarkDuplicatesConfig) -> Vec<String> {
        let tool_args = vec![
            "MarkDuplicates".to_string(),
            "-I".to_string(),
            format!("/bam_dir/{}", config.bam_in),
            "-O".to_string(),
            format!("/bam_dir/{}", config.bam_out),
            "-M".to_string(),
            format!("/bam_dir/{}", config.metrics),
        ];
        run_args(
            config.image,
            &[Mount {
                host: config.bam_dir,
                container: "/bam_dir",
            }],
            &tool_args,
        )
    }
}

pub mod featurecounts {
    use std::path::Path;

    use crate::config::defs::PipelineError;
    use crate::utils::command::docker::{Mount, run_args};
    use crate::utils::file::basename;

    pub struct FeatureCountsConfig<'a> {
        pub gtf: &'a Path,
        pub bam_dir: &'a Path,
        pub bam_name: &'a str,
        pub counts_name: &'a str,
        pub image: &'a str,
    }

    pub fn arg_generator(config: &FeatureCountsConfig) -> Result<Vec<String>, PipelineError> {
        let gtf_dir = config.gtf.parent().ok_or_else(|| {
            PipelineError::IOError(format!("{} has no parent directory", config.gtf.display()))
        })?;
        let gtf_name = basename(config.gtf)?;

        let tool_args = vec![
            "featureCounts".to_string(),
            "-a".to_string(),
            format!("/gtf_dir/{}", gtf_name),
            "-t".to_string(),
            "exon".to_string(),
            "-g".to_string(),
            "gene_id".to_string(),
            "-o".to_string(),
            format!("/out_dir/{}", config.counts_name),
            format!("/bam_dir/{}", config.bam_name),
        ];
        Ok(run_args(
            config.image,
            &[
                Mount {
                    host: gtf_dir,
                    container: "/gtf_dir",
                },
                Mount {
                    host: config.bam_dir,
                    container: "/bam_dir",
                },
                Mount {
                    host: config.bam_dir,
                    container: "/out_dir",
                },
            ],
            &tool_args,
        ))
    }
}
