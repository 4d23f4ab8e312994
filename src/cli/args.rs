use std::fmt;

use clap::{Parser, ValueEnum};

/// Reference genome build. The value doubles as the lookup key into the
/// genome configuration YAML.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq)]
pub enum Reference {
    #[default]
    Hg19,
    Hg38,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Hg19 => write!(f, "hg19"),
            Reference::Hg38 => write!(f, "hg38"),
        }
    }
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "rnaseq-pipelines", version, about = "Run a basic RNA-seq pipeline")]
pub struct Arguments {
    #[arg(long = "fastq_dir", help = "Input fastq file directory")]
    pub fastq_dir: String,

    #[arg(long = "output_dir", help = "Output directory")]
    pub output_dir: String,

    #[arg(long = "config_yaml", help = "Genome configuration yaml")]
    pub config_yaml: String,

    #[arg(long = "docker_yaml", help = "Docker images yaml")]
    pub docker_yaml: String,

    #[arg(short = 't', long, default_value_t = 4, help = "Num. of CPU threads to operate")]
    pub threads: usize,

    #[arg(short = 'r', long, value_enum)]
    pub reference: Reference,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(long = "strict_names", default_value_t = false,
        help = "Enforce Illumina naming on every input fastq pair")]
    pub strict_names: bool,

    #[arg(long = "check_consistency", default_value_t = false,
        help = "Stream both mates of every pair and verify record counts and SEQ/QUAL lengths")]
    pub check_consistency: bool,
}
