use log::info;

use crate::config::defs::{FEATURECOUNTS_TAG, PipelineError, RunConfig};
use crate::utils::command::featurecounts::FeatureCountsConfig;
use crate::utils::command::{self, run_tool};
use crate::utils::file::{artifact_exists, basename};
use crate::utils::sample::{self, Sample};

/// Counts reads over annotated gene features for every sample, producing
/// the per-sample count table from the deduplicated, indexed alignment.
pub async fn run(config: &RunConfig, sample_list: &mut [Sample]) -> Result<(), PipelineError> {
    for sample in sample_list.iter_mut() {
        let counts_name = format!("{}.counts.txt", sample.name());
        let count_file = sample.bam_folder()?.join(&counts_name);
        sample.add(sample::COUNT_FILE_KEY, &count_file)?;

        if artifact_exists(&count_file) {
            info!("Skipping feature counting for sample {}", sample.name());
            continue;
        }

        info!("Counting features for sample {}", sample.name());
        let bam_name = basename(sample.ready_bam()?)?;
        let image = config.docker.image(FEATURECOUNTS_TAG)?;
        let args = command::featurecounts::arg_generator(&FeatureCountsConfig {
            gtf: &config.genome.gtf,
            bam_dir: sample.bam_folder()?,
            bam_name: &bam_name,
            counts_name: &counts_name,
            image,
        })?;
        run_tool(&config.tools.docker, &args, FEATURECOUNTS_TAG).await?;

        if !artifact_exists(&count_file) {
            return Err(PipelineError::ToolExecution {
                tool: FEATURECOUNTS_TAG.to_string(),
                error: format!("completed without producing {}", count_file.display()),
            });
        }
    }
    Ok(())
}
