use std::sync::Arc;

use log::info;

use crate::config::defs::{PipelineError, RunConfig};
use crate::pipelines::{align, preprocess, quantify};

/// Sequences the three stages across the full sample list. Discovery
/// completes for every sample before any stage runs, and each stage
/// finishes for the whole list before the next begins.
pub async fn run(config: Arc<RunConfig>) -> Result<(), PipelineError> {
    let mut sample_list = preprocess::run(&config).await?;
    info!("Preprocessed {} sample(s)", sample_list.len());

    align::run(&config, &mut sample_list).await?;
    quantify::run(&config, &mut sample_list).await?;

    for sample in &sample_list {
        info!(
            "Sample {}: counts at {}",
            sample.name(),
            sample.count_file()?.display()
        );
    }
    Ok(())
}
