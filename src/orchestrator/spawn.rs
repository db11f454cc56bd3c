//! Worker process spawning (§4.8c): re-invoke this same binary as a worker
//! child, passing it its index/total/bucket-count/mode and the
//! `TELEMETRY_PORT` it needs to reach the Control Channel.

use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use crate::cli::WorkerMode;
use crate::config::RunConfig;

/// Spawn `total` worker children and await all of their exit statuses.
pub async fn spawn_workers(
    config: &RunConfig,
    mode: WorkerMode,
    total: usize,
    telemetry_port: u16,
) -> anyhow::Result<Vec<ExitStatus>> {
    let exe = std::env::current_exe()?;
    let mode_flag = match mode {
        WorkerMode::Frontier => "frontier",
        WorkerMode::RootUrls => "root-urls",
    };

    let mut children = Vec::with_capacity(total);
    for index in 0..total {
        let mut command = Command::new(&exe);
        command
            .arg("--base")
            .arg(&config.base)
            .arg("--pathPrefix")
            .arg(&config.path_prefix)
            .arg("--outDir")
            .arg(&config.out_dir)
            .arg("--bucketParts")
            .arg(config.bucket_parts.to_string())
            .arg("--concurrency")
            .arg(config.concurrency.to_string())
            .arg("--keepPageParam")
            .arg(config.keep_page_param.to_string())
            .arg("--headless")
            .arg(config.headless.to_string())
            .arg("--mode")
            .arg(mode_flag)
            .arg("--workerIndex")
            .arg(index.to_string())
            .arg("--workerTotal")
            .arg(total.to_string())
            .env("TELEMETRY_PORT", telemetry_port.to_string())
            .stdin(Stdio::null());
        children.push(command.spawn()?);
    }

    let waits = children.into_iter().map(|mut child| async move { child.wait().await });
    let statuses = futures::future::join_all(waits).await;
    statuses.into_iter().collect::<Result<Vec<_>, _>>().map_err(Into::into)
}
