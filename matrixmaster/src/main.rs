use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use common::log_setup::setup_logging;
use matrixmaster::{
    Config, FsObjectStore, LandmarkStore, LogReporter, MemoryLandmarkStore, TaskContext,
    TaskRequest, WorkerPool,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path: PathBuf = std::env::args()
        .nth(1)
        .context("usage: matrixmaster <config.yaml>")?
        .into();
    let config = Config::load(&config_path)?;
    setup_logging(&config.log_level, &config.log_dir, "matrixmaster")
        .context("Failed to set up logging")?;
    tracing::info!(config = %config_path.display(), "matrixmaster starting");

    let objects = Arc::new(FsObjectStore::new(&config.storage_root));
    let landmarks: Arc<dyn LandmarkStore> = match &config.landmark_db {
        Some(path) => Arc::new(
            MemoryLandmarkStore::open(path)
                .with_context(|| format!("Failed to open landmark store {}", path.display()))?,
        ),
        None => Arc::new(MemoryLandmarkStore::new()),
    };
    let context = Arc::new(TaskContext::new(config, objects, landmarks)?);
    let mut pool = WorkerPool::new(context, Arc::new(LogReporter));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut submitted = 0usize;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<TaskRequest>(line) {
            Ok(request) => {
                pool.submit(request);
                submitted += 1;
            }
            Err(e) => tracing::warn!("Skipping malformed task request: {e}"),
        }
    }

    pool.shutdown().await;
    tracing::info!(submitted, "matrixmaster finished");
    Ok(())
}
