//! mc-crawl: a filesystem-coordinated distributed web-crawl orchestrator.
//!
//! Invoked once as the orchestrator (spawns worker child processes), and
//! re-invoked by the orchestrator as a worker (`--mode frontier` or
//! `--mode root-urls`) with its index/total/bucket-count passed as flags.

use clap::Parser;
use mc_crawl::cli::{Cli, RunRole};
use mc_crawl::config::RunConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = RunConfig::from_cli(&cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = match cli.role() {
        RunRole::Orchestrator => runtime.block_on(mc_crawl::orchestrator::run(config)),
        RunRole::Worker(worker_args) => {
            runtime.block_on(mc_crawl::worker::run(config, worker_args))
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    }
}
