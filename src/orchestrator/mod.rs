//! Orchestrator (C8): the process invoked with no `--mode` flag. Resolves
//! configuration, seeds the frontier, spawns worker children, waits for
//! them to finish, merges their partials, writes the selected reports, and
//! cleans up.

mod merge;
mod quiescence;
mod seed;
mod spawn;
mod teardown;

use std::sync::Arc;
use std::time::Duration;

use crate::cli::WorkerMode;
use crate::classifier::{self, RunMode};
use crate::claim::ClaimLedger;
use crate::config::RunConfig;
use crate::error::McCrawlError;
use crate::frontier::{self, Frontier};
use crate::gate::{self, OutputKind};
use crate::reports;
use crate::telemetry::{Hub, UpdateMessage};
use crate::telemetry::server::{router, ServerState};
use crate::utils::constants::TELEMETRY_SNAPSHOT_MS;
use crate::worker;

pub async fn run(config: RunConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.out_dir)?;
    frontier::ensure_layout(&config.frontier_dir())?;
    std::fs::create_dir_all(config.claim_dir())?;
    std::fs::create_dir_all(config.telemetry_dir())?;

    let classified = classifier::classify(config.input.as_deref())?;
    let selected = gate::parse_selected(&config.outputs);
    let gate_result = gate::validate(&classified.shape, &selected);
    if !gate_result.ok {
        return Err(McCrawlError::Gate(gate_result.errors).into());
    }

    let hub = Hub::new(config.telemetry_dir());
    hub.mark_started();
    let snapshot_task = hub.spawn_snapshot_task(Duration::from_millis(TELEMETRY_SNAPSHOT_MS));

    let server_state = ServerState {
        hub: Arc::clone(&hub),
        out_dir: config.out_dir.clone(),
        shape: Arc::new(classified.shape.clone()),
    };
    let (telemetry_port, server_task) = start_control_channel(server_state, config.telemetry_port).await?;
    hub.apply(UpdateMessage::Mode {
        mode: run_mode_label(&classified.mode).to_string(),
    });

    let mut classified = classified;
    let outcome = run_inner(&config, &mut classified, &selected, &hub, telemetry_port).await;

    snapshot_task.abort();
    server_task.abort();
    hub.persist().ok();

    outcome
}

async fn run_inner(
    config: &RunConfig,
    classified: &mut classifier::ClassifiedInput,
    selected: &std::collections::HashSet<OutputKind>,
    hub: &Arc<Hub>,
    telemetry_port: u16,
) -> anyhow::Result<()> {
    // Existence-only fast path (§4.7): no child processes, no browser.
    if selected.len() == 1 && selected.contains(&OutputKind::ExistenceCsv) {
        let urls = seed::explicit_urls(classified, config.keep_page_param);
        hub.apply(UpdateMessage::Event {
            message: format!("existence-only fast path: {} urls", urls.len()),
        });
        worker::run_existence_only(config, 0, &urls).await?;
        let merged = merge::merge_partials(&config.out_dir)?;
        reports::write_existence(&config.out_dir, &merged.existence)?;
        teardown::teardown(config)?;
        write_summary(config, &merged.urls, &merged.pages, &merged.existence)?;
        return Ok(());
    }

    let claims = ClaimLedger::new(
        config.claim_dir(),
        config.lock_tries,
        Duration::from_millis(config.lock_sleep_ms),
        config.max_done,
    );
    let frontier = Arc::new(Frontier::new(
        config.frontier_dir(),
        config.bucket_parts,
        config.bucket_max_bytes,
        claims,
    ));

    let mode = match classified.mode {
        RunMode::ExplicitUrls => {
            let urls = seed::explicit_urls(classified, config.keep_page_param);
            frontier.seed(&urls)?;
            WorkerMode::RootUrls
        }
        _ => {
            let http = reqwest::Client::new();
            let mut seeds = vec![config.base.clone()];
            seeds.extend(seed::seed_scan_base_page(&config.base, &http, &config.path_prefix, config.keep_page_param).await);
            frontier.seed(&seeds)?;
            WorkerMode::Frontier
        }
    };

    let monitor = quiescence::spawn_monitor(Arc::clone(&frontier), Arc::clone(hub));

    let statuses = spawn::spawn_workers(config, mode, config.shards.max(1), telemetry_port).await?;
    monitor.abort();

    for (index, status) in statuses.iter().enumerate() {
        if !status.success() {
            log::warn!("worker {index} exited with {status}");
        }
    }

    let merged = merge::merge_partials(&config.out_dir)?;

    if classified.mode == RunMode::SingleText {
        let fetched_titles: Vec<String> = merged.pages.iter().filter_map(|p| p.title.clone()).collect();
        let fetched_descriptions: Vec<String> = merged.pages.iter().filter_map(|p| p.description.clone()).collect();
        classifier::refine_single_text_role(
            &mut classified.shape,
            &classified.rows,
            &fetched_titles,
            &fetched_descriptions,
        );
    }

    write_reports(config, classified, selected, &merged)?;
    write_summary(config, &merged.urls, &merged.pages, &merged.existence)?;
    teardown::teardown(config)?;

    Ok(())
}

fn write_reports(
    config: &RunConfig,
    classified: &classifier::ClassifiedInput,
    selected: &std::collections::HashSet<OutputKind>,
    merged: &merge::MergedArtifacts,
) -> anyhow::Result<()> {
    if selected.contains(&OutputKind::SiteCatalog) {
        reports::write_site_catalog(&config.out_dir, &merged.pages)?;
        reports::write_duplicate_titles(&config.out_dir, &merged.pages)?;
    }
    if selected.contains(&OutputKind::InternalLinks) {
        reports::write_internal_links(&config.out_dir, &merged.edges)?;
    }
    if selected.contains(&OutputKind::Tree) {
        reports::write_tree(&config.out_dir, &merged.urls)?;
    }
    if selected.contains(&OutputKind::ExistenceCsv) {
        reports::write_existence(&config.out_dir, &merged.existence)?;
    }
    if selected.contains(&OutputKind::ComparisonCsv) {
        let expected = classifier::expected_rows(classified);
        reports::write_comparison(&config.out_dir, &expected, &merged.pages, config.keep_page_param)?;
        let extras_key = if classified
            .shape
            .inferred_roles
            .contains(&crate::classifier::ColumnRole::Description)
        {
            reports::ExtrasKey::TitleAndDescription
        } else {
            reports::ExtrasKey::TitleOnly
        };
        reports::write_extras(&config.out_dir, &merged.pages, &expected, extras_key)?;
    }
    Ok(())
}

fn write_summary(
    config: &RunConfig,
    urls: &[String],
    pages: &[worker::PageRecord],
    existence: &[worker::ExistenceRecord],
) -> anyhow::Result<()> {
    let working = existence.iter().filter(|r| r.exists).count();
    let text = format!(
        "urls: {}\npages: {}\nexistence checked: {}\nexistence working: {}\n",
        urls.len(),
        pages.len(),
        existence.len(),
        working,
    );
    crate::atomic::write_retry(&config.out_dir.join("summary.txt"), text.as_bytes())?;
    Ok(())
}

fn run_mode_label(mode: &RunMode) -> &'static str {
    match mode {
        RunMode::NoInput => "no-input",
        RunMode::ExplicitUrls => "explicit-urls",
        RunMode::Discovery => "discovery",
        RunMode::SingleText => "single-text",
    }
}

/// Bind the Control Channel listener up front (TOCTOU-safe: the port is
/// reserved before anything else can claim it), then serve it in the
/// background for the lifetime of the run.
async fn start_control_channel(
    state: ServerState,
    requested_port: u16,
) -> anyhow::Result<(u16, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", requested_port)).await?;
    let port = listener.local_addr()?.port();
    let app = router(state);
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::warn!("control channel server stopped: {e}");
        }
    });
    Ok((port, task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_label_covers_every_variant() {
        assert_eq!(run_mode_label(&RunMode::NoInput), "no-input");
        assert_eq!(run_mode_label(&RunMode::ExplicitUrls), "explicit-urls");
        assert_eq!(run_mode_label(&RunMode::Discovery), "discovery");
        assert_eq!(run_mode_label(&RunMode::SingleText), "single-text");
    }
}
