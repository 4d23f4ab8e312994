mod cli;
mod config;
mod pipelines;
mod utils;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use env_logger::Builder;
use log::{LevelFilter, debug, error, info};

use crate::cli::parse;
use crate::config::defs::RunConfig;
use crate::config::docker::{load_docker_config, validate_images};
use crate::config::genome::load_genome_config;
use crate::utils::command::resolve_tool_paths;
use crate::utils::system::detect_cores_and_load;

#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n RNA-seq\n-------------\n");

    let cwd = std::env::current_dir()?;
    debug!("The current directory is {:?}", cwd);

    let fastq_dir = absolute_path(&args.fastq_dir, &cwd);
    let out_dir = absolute_path(&args.output_dir, &cwd);
    fs::create_dir_all(&out_dir)?;

    let (max_cores, cpu_load) = detect_cores_and_load(args.threads).await?;
    debug!(
        "Detected {} usable cores; CPU load {}%",
        max_cores, cpu_load
    );

    let tools = resolve_tool_paths().await?;
    let genome = load_genome_config(&absolute_path(&args.config_yaml, &cwd), args.reference)?;
    let docker = load_docker_config(&absolute_path(&args.docker_yaml, &cwd))?;
    validate_images(&tools.docker, &docker).await;

    info!(
        "Processing reads from {} into {}",
        fastq_dir.display(),
        out_dir.display()
    );

    let run_config = Arc::new(RunConfig {
        cwd,
        fastq_dir,
        out_dir,
        threads: max_cores,
        genome,
        docker,
        tools,
        args,
    });

    if let Err(e) = pipelines::rna_seq::run(run_config).await {
        error!(
            "Pipeline failed: {} at {} milliseconds.",
            e,
            run_start.elapsed().as_millis()
        );
        std::process::exit(1);
    }

    println!(
        "Run complete: {} milliseconds.",
        run_start.elapsed().as_millis()
    );
    Ok(())
}

fn absolute_path(raw: &str, cwd: &Path) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() { path } else { cwd.join(path) }
}
