use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;

/// Writes a gzipped FASTQ file with the given (id, seq, qual) records.
pub fn write_gz_fastq(path: &Path, records: &[(&str, &str, &str)]) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    for (id, seq, qual) in records {
        writeln!(encoder, "@{}", id)?;
        writeln!(encoder, "{}", seq)?;
        writeln!(encoder, "+")?;
        writeln!(encoder, "{}", qual)?;
    }
    encoder.finish()?;
    Ok(())
}

/// Creates both mates of a pair from the R1 file name, each with one valid
/// record. Returns the two paths.
pub fn stub_pair(dir: &Path, r1_name: &str) -> Result<(PathBuf, PathBuf)> {
    let r1 = dir.join(r1_name);
    let r2 = dir.join(r1_name.replace("R1", "R2"));
    write_gz_fastq(&r1, &[("read1", "ACGT", "IIII")])?;
    write_gz_fastq(&r2, &[("read1", "TGCA", "IIII")])?;
    Ok((r1, r2))
}
