// src/utils/streams.rs
use anyhow::{Result, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;

pub enum ChildStream {
    Stdout,
    Stderr,
}

/// Collects one captured stream of a child process into lines.
/// The child must have been spawned with the matching stdio piped.
pub async fn read_child_output_to_vec(
    child: &mut Child,
    stream: ChildStream,
) -> Result<Vec<String>> {
    let mut collected = Vec::new();
    match stream {
        ChildStream::Stdout => {
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| anyhow!("Failed to capture child stdout"))?;
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                collected.push(line);
            }
        }
        ChildStream::Stderr => {
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| anyhow!("Failed to capture child stderr"))?;
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines.next_line().await? {
                collected.push(line);
            }
        }
    }
    Ok(collected)
}
