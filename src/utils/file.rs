use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::error;

use crate::config::defs::{
    FA_GZ_EXT, FASTQ_GZ_EXT, PipelineError, TRIMMED_TAG, UNDETERMINED_TAG,
};

pub fn is_gzipped(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 2];
    file.read_exact(&mut buffer)?;
    Ok(buffer == [0x1F, 0x8B]) // Gzip magic bytes
}

/// The single artifact predicate behind every stage's skip decision. Path
/// existence is the only memoization the pipeline does.
pub fn artifact_exists(path: &Path) -> bool {
    path.is_file()
}

pub fn basename(path: &Path) -> Result<String, PipelineError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::IOError(format!("{} has no file name", path.display())))
}

/// Scans the input directory for read files: `*.fastq.gz` first, `*.fa.gz`
/// as a fallback, fatal if neither matches anything. Paths containing
/// `Undetermined` are always dropped; paths containing `trimmed` are dropped
/// on request so previous pipeline output is not re-ingested as input.
/// The result is lexicographically sorted for determinism.
pub fn collect_fastq_files(
    input_dir: &Path,
    avoid_trimmed: bool,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = files_with_suffix(input_dir, FASTQ_GZ_EXT)?;
    if files.is_empty() {
        files = files_with_suffix(input_dir, FA_GZ_EXT)?;
    }
    if files.is_empty() {
        error!(
            "No input fastq files were detected in {}",
            input_dir.display()
        );
        return Err(PipelineError::NoInputFiles(input_dir.to_path_buf()));
    }

    files.sort();
    let filtered = files
        .into_iter()
        .filter(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if name.contains(UNDETERMINED_TAG) {
                return false;
            }
            !(avoid_trimmed && name.contains(TRIMMED_TAG))
        })
        .collect();
    Ok(filtered)
}

fn files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_match = path
            .file_name()
            .map(|name| name.to_string_lossy().ends_with(suffix))
            .unwrap_or(false);
        if is_match && path.is_file() {
            matches.push(path);
        }
    }
    Ok(matches)
}

/// `<mate>.fastq.gz` -> `<mate>.trimmed.fastq.gz` (same for `.fa.gz`).
pub fn trimmed_fastq_name(name: &str) -> String {
    if let Some(stem) = name.strip_suffix(FASTQ_GZ_EXT) {
        format!("{}.{}{}", stem, TRIMMED_TAG, FASTQ_GZ_EXT)
    } else if let Some(stem) = name.strip_suffix(FA_GZ_EXT) {
        format!("{}.{}{}", stem, TRIMMED_TAG, FA_GZ_EXT)
    } else {
        format!("{}.{}", name, TRIMMED_TAG)
    }
}

/// Report archive name fastqc derives from an input read file.
pub fn fastqc_report_name(name: &str) -> String {
    let stem = name
        .strip_suffix(FASTQ_GZ_EXT)
        .or_else(|| name.strip_suffix(FA_GZ_EXT))
        .unwrap_or(name);
    format!("{}_fastqc.zip", stem)
}
