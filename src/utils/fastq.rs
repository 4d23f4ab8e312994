use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use lazy_static::lazy_static;
use log::error;
use regex::Regex;
use seq_io::fastq::{Reader, Record};

use crate::config::defs::PipelineError;
use crate::utils::file::{basename, is_gzipped};

lazy_static! {
    static ref FASTQ_EXT_RE: Regex = Regex::new(r"(fq|fastq|fastq\.gz|fa\.gz)$").unwrap();
    static ref ILLUMINA_RE: Regex = Regex::new(r"_S[0-9]+_L[0-9]+_R[12]_[0-9]+").unwrap();
}

pub enum FastqReader {
    Uncompressed(BufReader<File>),
    Gzipped(GzDecoder<File>),
}

impl Read for FastqReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FastqReader::Uncompressed(r) => r.read(buf),
            FastqReader::Gzipped(r) => r.read(buf),
        }
    }
}

pub fn fastq_reader(path: &Path) -> io::Result<Reader<FastqReader>> {
    let file = File::open(path)?;
    let reader = if is_gzipped(path)? {
        Reader::new(FastqReader::Gzipped(GzDecoder::new(file)))
    } else {
        Reader::new(FastqReader::Uncompressed(BufReader::new(file)))
    };
    Ok(reader)
}

/// A validated mate pair of read files, plus the sample identity both mates
/// resolve to. Construction fails rather than defaulting on any violation.
#[derive(Debug, Clone)]
pub struct ReadPair {
    fq1: PathBuf,
    fq2: PathBuf,
    sample_name: String,
    paired: bool,
}

impl ReadPair {
    /// Validates a candidate read file and derives its mate.
    ///
    /// The mate name is derived textually (R1 <-> R2 in the basename, every
    /// occurrence) and must exist on disk when pairing is expected. The
    /// sample name is the first `_`-delimited token of the basename; a
    /// basename without any `_` is rejected.
    pub fn new(
        fq: &Path,
        expect_paired: bool,
        strict_names: bool,
    ) -> Result<Self, PipelineError> {
        if !fq.is_file() {
            error!("Input fastq {} not found", fq.display());
            return Err(PipelineError::FastqNotFound(fq.to_path_buf()));
        }

        let parent = fq.parent().map(Path::to_path_buf).unwrap_or_default();
        let fq_name = basename(fq)?;
        // Prefer the unambiguous `_R1_`/`_R2_` form; fall back to the bare
        // token so a pattern-less name still derives a mate and gets its
        // real diagnosis from the naming checks below.
        let (name1, name2) = if fq_name.contains("_R1_") {
            (fq_name.clone(), fq_name.replace("R1", "R2"))
        } else if fq_name.contains("_R2_") {
            (fq_name.replace("R2", "R1"), fq_name.clone())
        } else if fq_name.contains("R1") {
            (fq_name.clone(), fq_name.replace("R1", "R2"))
        } else if fq_name.contains("R2") {
            (fq_name.replace("R2", "R1"), fq_name.clone())
        } else {
            if expect_paired {
                error!(
                    "Missing fastq pair for {}: neither R1 nor R2 in the name",
                    fq.display()
                );
                return Err(PipelineError::MissingPair(fq_name));
            }
            (fq_name.clone(), fq_name.clone())
        };

        let fq1 = parent.join(name1);
        let fq2 = parent.join(name2);
        let sample_name = sample_name_of(&fq1)?;

        let pair = ReadPair {
            fq1,
            fq2,
            sample_name,
            paired: expect_paired,
        };

        if strict_names {
            let problems = pair.nomenclature_problems();
            if !problems.is_empty() {
                return Err(PipelineError::InvalidNomenclature {
                    fastq: fq.display().to_string(),
                    problems: problems.join("; "),
                });
            }
        }

        if expect_paired {
            // Both mates must resolve to the same sample identity even when
            // strict naming is off.
            let fq2_name = sample_name_of(&pair.fq2)?;
            if fq2_name != pair.sample_name {
                let problem = format!(
                    "Inconsistent sample name between fastq1 {} and fastq2 {}",
                    pair.fq1.display(),
                    pair.fq2.display()
                );
                error!("{}", problem);
                return Err(PipelineError::InvalidNomenclature {
                    fastq: fq.display().to_string(),
                    problems: problem,
                });
            }
            for mate in [&pair.fq1, &pair.fq2] {
                if !mate.is_file() {
                    error!(
                        "Missing fastq pair for sample {}: {} not found",
                        pair.sample_name,
                        mate.display()
                    );
                    return Err(PipelineError::MissingPair(mate.display().to_string()));
                }
            }
        }

        Ok(pair)
    }

    pub fn fq1(&self) -> &Path {
        &self.fq1
    }

    pub fn fq2(&self) -> &Path {
        &self.fq2
    }

    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }

    /// Runs every nomenclature sub-check and reports all violations at once:
    /// accepted extension on both mates, equal leading tokens, and the
    /// Illumina `_S<n>_L<n>_R[12]_<n>` pattern in both names.
    pub fn nomenclature_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for fq in [&self.fq1, &self.fq2] {
            let name = fq.to_string_lossy();
            if !FASTQ_EXT_RE.is_match(&name) {
                let problem = format!("Invalid fastq extension on {}", fq.display());
                error!("{}", problem);
                problems.push(problem);
            }
        }

        match (sample_name_of(&self.fq1), sample_name_of(&self.fq2)) {
            (Ok(name1), Ok(name2)) if name1 == name2 => {}
            (Ok(_), Ok(_)) => {
                let problem = format!(
                    "Inconsistent sample name between fastq1 {} and fastq2 {}",
                    self.fq1.display(),
                    self.fq2.display()
                );
                error!("{}", problem);
                problems.push(problem);
            }
            _ => {
                let problem = format!(
                    "Cannot derive a sample name for pair {} / {}",
                    self.fq1.display(),
                    self.fq2.display()
                );
                error!("{}", problem);
                problems.push(problem);
            }
        }

        for fq in [&self.fq1, &self.fq2] {
            let name = fq.to_string_lossy();
            if !ILLUMINA_RE.is_match(&name) {
                let problem =
                    format!("Inconsistent Illumina nomenclature on {}", fq.display());
                error!("{}", problem);
                problems.push(problem);
            }
        }

        problems
    }

    /// Streams both mates and verifies that every record has SEQ and QUAL of
    /// equal length and that both files carry the same number of records.
    /// Violations are logged and accumulated; the return value says whether
    /// the pair is clean.
    pub fn check_consistency(&self) -> Result<bool, PipelineError> {
        let mut is_consistent = true;

        let fq1_reads = count_records(&self.fq1, &mut is_consistent)?;
        if self.paired {
            let fq2_reads = count_records(&self.fq2, &mut is_consistent)?;
            if fq1_reads != fq2_reads {
                error!(
                    "Unequal total reads between fq1 {}:{} and fq2 {}:{}",
                    self.fq1.display(),
                    fq1_reads,
                    self.fq2.display(),
                    fq2_reads
                );
                is_consistent = false;
            }
        }

        Ok(is_consistent)
    }
}

fn count_records(fq: &Path, is_consistent: &mut bool) -> Result<u64, PipelineError> {
    let mut reads = 0u64;
    let mut reader = fastq_reader(fq)?;
    while let Some(result) = reader.next() {
        match result {
            Ok(record) => {
                reads += 1;
                if record.seq().len() != record.qual().len() {
                    error!(
                        "Inconsistent length between SEQ and QUAL on record {} from file {}",
                        reads,
                        fq.display()
                    );
                    *is_consistent = false;
                }
            }
            Err(e) => {
                // The reader cannot recover past a malformed record; the
                // count so far still feeds the total comparison.
                error!("Malformed fastq record in {}: {}", fq.display(), e);
                *is_consistent = false;
                break;
            }
        }
    }
    Ok(reads)
}

fn sample_name_of(path: &Path) -> Result<String, PipelineError> {
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::SampleName(path.display().to_string()))?;

    let mut tokens = base.split('_');
    let first = match tokens.next() {
        Some(token) => token.to_string(),
        None => return Err(PipelineError::SampleName(base)),
    };
    if tokens.next().is_none() {
        error!("Could not return a sample name for {}", base);
        return Err(PipelineError::SampleName(base));
    }
    Ok(first)
}

/// Deduplicates discovered read files into one pair per unique sample
/// identity. Input order is preserved and the first occurrence wins; both
/// mates of a pair enumerate to the same identity, so the second listing is
/// skipped on purpose.
pub fn unique_read_pairs(
    fastq_files: &[PathBuf],
    strict_names: bool,
) -> Result<Vec<ReadPair>, PipelineError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut pairs = Vec::new();

    for fq in fastq_files {
        let pair = ReadPair::new(fq, true, strict_names)?;
        if !seen.insert(pair.sample_name().to_string()) {
            continue;
        }
        pairs.push(pair);
    }

    Ok(pairs)
}
