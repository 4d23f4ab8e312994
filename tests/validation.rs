mod common;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::tempdir;

use rnaseq_pipelines::cli::Reference;
use rnaseq_pipelines::config::defs::PipelineError;
use rnaseq_pipelines::config::docker::load_docker_config;
use rnaseq_pipelines::config::genome::load_genome_config;
use rnaseq_pipelines::utils::fastq::{ReadPair, unique_read_pairs};
use rnaseq_pipelines::utils::file::{
    collect_fastq_files, fastqc_report_name, trimmed_fastq_name,
};
use rnaseq_pipelines::utils::sample::{self, Sample};

use common::{stub_pair, write_gz_fastq};

#[test]
fn mate_derivation_roundtrip() -> Result<()> {
    let dir = tempdir()?;
    let (r1, r2) = stub_pair(dir.path(), "SampleA_S1_L001_R1_001.fastq.gz")?;

    let from_r1 = ReadPair::new(&r1, true, true)?;
    assert_eq!(from_r1.fq1(), r1.as_path());
    assert_eq!(from_r1.fq2(), r2.as_path());
    assert_eq!(from_r1.sample_name(), "SampleA");

    // mate(mate(f)) == f: building from the derived mate gives the pair back
    let from_r2 = ReadPair::new(&r2, true, true)?;
    assert_eq!(from_r2.fq1(), r1.as_path());
    assert_eq!(from_r2.fq2(), r2.as_path());
    assert_eq!(from_r2.sample_name(), "SampleA");
    Ok(())
}

#[test]
fn missing_pair_without_mate_token() -> Result<()> {
    let dir = tempdir()?;
    let fq = dir.path().join("SampleC_S1_L001_001.fastq.gz");
    write_gz_fastq(&fq, &[("read1", "ACGT", "IIII")])?;

    let err = ReadPair::new(&fq, true, false).unwrap_err();
    assert!(matches!(err, PipelineError::MissingPair(_)));
    Ok(())
}

#[test]
fn missing_pair_when_mate_absent_on_disk() -> Result<()> {
    let dir = tempdir()?;
    let r1 = dir.path().join("SampleA_S1_L001_R1_001.fastq.gz");
    write_gz_fastq(&r1, &[("read1", "ACGT", "IIII")])?;

    let err = ReadPair::new(&r1, true, false).unwrap_err();
    assert!(matches!(err, PipelineError::MissingPair(_)));
    Ok(())
}

#[test]
fn fastq_not_found() {
    let err = ReadPair::new(Path::new("/no/such/SampleA_R1.fastq.gz"), true, false)
        .unwrap_err();
    assert!(matches!(err, PipelineError::FastqNotFound(_)));
}

#[test]
fn sample_name_requires_delimiter() -> Result<()> {
    let dir = tempdir()?;
    write_gz_fastq(&dir.path().join("XR1.fastq.gz"), &[("read1", "ACGT", "IIII")])?;
    write_gz_fastq(&dir.path().join("XR2.fastq.gz"), &[("read1", "ACGT", "IIII")])?;

    let err = ReadPair::new(&dir.path().join("XR2.fastq.gz"), true, false).unwrap_err();
    assert!(matches!(err, PipelineError::SampleName(_)));
    Ok(())
}

#[test]
fn strict_naming_reports_all_violations() -> Result<()> {
    let dir = tempdir()?;
    let r1 = dir.path().join("SampleB_R1.fastq.gz");
    write_gz_fastq(&r1, &[("read1", "ACGT", "IIII")])?;

    match ReadPair::new(&r1, true, true).unwrap_err() {
        PipelineError::InvalidNomenclature { problems, .. } => {
            // both mates lack the _S<n>_L<n>_R[12]_<n> pattern
            assert_eq!(problems.matches("Illumina").count(), 2);
        }
        other => panic!("expected InvalidNomenclature, got {}", other),
    }

    // without strict naming the same file fails on the missing mate instead
    let err = ReadPair::new(&r1, true, false).unwrap_err();
    assert!(matches!(err, PipelineError::MissingPair(_)));
    Ok(())
}

#[test]
fn registry_dedups_mates_into_one_sample() -> Result<()> {
    let dir = tempdir()?;
    stub_pair(dir.path(), "SampleB_S2_L001_R1_001.fastq.gz")?;
    let (a1, a2) = stub_pair(dir.path(), "SampleA_S1_L001_R1_001.fastq.gz")?;

    let files = collect_fastq_files(dir.path(), true)?;
    assert_eq!(files.len(), 4);

    let pairs = unique_read_pairs(&files, false)?;
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].sample_name(), "SampleA");
    assert_eq!(pairs[1].sample_name(), "SampleB");
    assert_eq!(pairs[0].fq1(), a1.as_path());
    assert_eq!(pairs[0].fq2(), a2.as_path());
    Ok(())
}

#[test]
fn discovery_filters_undetermined_and_trimmed() -> Result<()> {
    let dir = tempdir()?;
    stub_pair(dir.path(), "SampleA_S1_L001_R1_001.fastq.gz")?;
    write_gz_fastq(
        &dir.path().join("Undetermined_S0_L001_R1_001.fastq.gz"),
        &[("read1", "ACGT", "IIII")],
    )?;
    write_gz_fastq(
        &dir.path().join("SampleA_S1_L001_R1_001.trimmed.fastq.gz"),
        &[("read1", "ACGT", "IIII")],
    )?;

    let files = collect_fastq_files(dir.path(), true)?;
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| {
        let name = f.file_name().unwrap().to_string_lossy().into_owned();
        !name.contains("Undetermined") && !name.contains("trimmed")
    }));

    // previous pipeline output is legitimate input when not avoided
    let files = collect_fastq_files(dir.path(), false)?;
    assert_eq!(files.len(), 3);
    Ok(())
}

#[test]
fn discovery_falls_back_to_fa_gz() -> Result<()> {
    let dir = tempdir()?;
    write_gz_fastq(
        &dir.path().join("SampleZ_S1_L001_R1_001.fa.gz"),
        &[("read1", "ACGT", "IIII")],
    )?;

    let files = collect_fastq_files(dir.path(), true)?;
    assert_eq!(files.len(), 1);
    Ok(())
}

#[test]
fn discovery_fails_on_empty_directory() -> Result<()> {
    let dir = tempdir()?;
    let err = collect_fastq_files(dir.path(), true).unwrap_err();
    assert!(matches!(err, PipelineError::NoInputFiles(_)));
    Ok(())
}

#[test]
fn consistency_detects_unequal_read_counts() -> Result<()> {
    let dir = tempdir()?;
    let r1 = dir.path().join("SampleA_S1_L001_R1_001.fastq.gz");
    let r2 = dir.path().join("SampleA_S1_L001_R2_001.fastq.gz");
    write_gz_fastq(
        &r1,
        &[("read1", "ACGT", "IIII"), ("read2", "ACGT", "IIII")],
    )?;
    write_gz_fastq(&r2, &[("read1", "TGCA", "IIII")])?;

    let pair = ReadPair::new(&r1, true, false)?;
    assert!(!pair.check_consistency()?);
    Ok(())
}

#[test]
fn consistency_accepts_matching_mates() -> Result<()> {
    let dir = tempdir()?;
    let (r1, _r2) = stub_pair(dir.path(), "SampleA_S1_L001_R1_001.fastq.gz")?;

    let pair = ReadPair::new(&r1, true, false)?;
    assert!(pair.check_consistency()?);
    Ok(())
}

#[test]
fn consistency_detects_seq_qual_length_mismatch() -> Result<()> {
    let dir = tempdir()?;
    let r1 = dir.path().join("SampleA_S1_L001_R1_001.fastq.gz");
    let r2 = dir.path().join("SampleA_S1_L001_R2_001.fastq.gz");
    write_gz_fastq(&r1, &[("read1", "ACGT", "III")])?;
    write_gz_fastq(&r2, &[("read1", "TGCA", "IIII")])?;

    let pair = ReadPair::new(&r1, true, false)?;
    assert!(!pair.check_consistency()?);
    Ok(())
}

#[test]
fn sample_record_rejects_empty_and_duplicate_attributes() -> Result<()> {
    assert!(Sample::new("").is_err());

    let mut record = Sample::new("SampleA")?;
    assert_eq!(record.name(), "SampleA");
    assert!(record.add("", "/data/bams").is_err());
    assert!(record.add(sample::BAM_FOLDER_KEY, "").is_err());

    record.add(sample::BAM_FOLDER_KEY, "/data/bams")?;
    assert!(record.add(sample::BAM_FOLDER_KEY, "/data/other").is_err());
    assert_eq!(record.bam_folder()?, Path::new("/data/bams"));

    assert!(matches!(
        record.count_file(),
        Err(PipelineError::SampleAttribute(_))
    ));
    Ok(())
}

#[test]
fn artifact_name_helpers() {
    assert_eq!(
        trimmed_fastq_name("SampleA_S1_L001_R1_001.fastq.gz"),
        "SampleA_S1_L001_R1_001.trimmed.fastq.gz"
    );
    assert_eq!(
        trimmed_fastq_name("SampleA_S1_L001_R1_001.fa.gz"),
        "SampleA_S1_L001_R1_001.trimmed.fa.gz"
    );
    assert_eq!(
        fastqc_report_name("SampleA_S1_L001_R1_001.fastq.gz"),
        "SampleA_S1_L001_R1_001_fastqc.zip"
    );
}

#[test]
fn genome_config_selects_reference() -> Result<()> {
    let dir = tempdir()?;
    let yaml = dir.path().join("genomes.yaml");
    fs::write(
        &yaml,
        "hg38:\n  hisat2_index: /refs/hg38/genome\n  gtf: /refs/hg38/genes.gtf\n",
    )?;

    let genome = load_genome_config(&yaml, Reference::Hg38)?;
    assert_eq!(genome.hisat2_index, PathBuf::from("/refs/hg38/genome"));
    assert_eq!(genome.gtf, PathBuf::from("/refs/hg38/genes.gtf"));

    let err = load_genome_config(&yaml, Reference::Hg19).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfig(_)));
    Ok(())
}

#[test]
fn docker_config_requires_every_container_tool() -> Result<()> {
    let dir = tempdir()?;
    let yaml = dir.path().join("docker.yaml");
    fs::write(
        &yaml,
        concat!(
            "fastqc:\n  image: biocontainers/fastqc:v0.11.9\n",
            "picard:\n  image: broadinstitute/picard:2.27.5\n",
            "featureCounts:\n  image: biocontainers/subread:v2.0.1\n",
        ),
    )?;

    let docker = load_docker_config(&yaml)?;
    assert_eq!(docker.image("fastqc")?, "biocontainers/fastqc:v0.11.9");
    assert!(matches!(
        docker.image("multiqc"),
        Err(PipelineError::InvalidConfig(_))
    ));

    let partial = dir.path().join("partial.yaml");
    fs::write(&partial, "fastqc:\n  image: biocontainers/fastqc:v0.11.9\n")?;
    let err = load_docker_config(&partial).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfig(_)));
    Ok(())
}
