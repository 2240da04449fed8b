use std::path::PathBuf;

use clap::ArgMatches;
use serde::Serialize;
use tracing::{info, warn};
use worktide_core::{RefreshError, Snapshot, Worktree, load_snapshot};
use worktide_forge::LiveStatusProvider;
use worktide_git::WorktreeEntry;

use super::display::detail_lines;
use super::helpers::{build_runtime, discover_worktrees, load_config_with_warning, resolve_path};
use crate::color;

#[derive(Serialize)]
struct WorktreeReport {
    worktree: String,
    path: PathBuf,
    is_main: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<Snapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl WorktreeReport {
    fn new(entry: WorktreeEntry, result: Result<Snapshot, RefreshError>) -> Self {
        let (snapshot, error) = match result {
            Ok(snapshot) => (Some(snapshot), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            worktree: entry.name,
            path: entry.path,
            is_main: entry.is_main,
            snapshot,
            error,
        }
    }
}

pub(crate) fn handle_status_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_path(matches);
    let json_output = matches.get_flag("json");

    info!(
        event = "cli.status_started",
        path = %path.display(),
        json_output = json_output
    );

    let entries = discover_worktrees(&path)?;
    let config = load_config_with_warning(entries.first().map(|e| e.repository_root.as_path()));
    let provider = LiveStatusProvider::from_config(&config);
    let runtime = build_runtime()?;

    let reports: Vec<WorktreeReport> = runtime.block_on(async {
        let mut reports = Vec::with_capacity(entries.len());
        for entry in entries {
            let worktree = Worktree::from(entry.clone());
            let result = load_snapshot(&provider, &worktree).await;
            reports.push(WorktreeReport::new(entry, result));
        }
        reports
    });

    let failed = reports.iter().filter(|r| r.error.is_some()).count();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            let marker = if report.is_main { " (main)" } else { "" };
            println!(
                "{}{}  {}",
                color::bold(&report.worktree),
                marker,
                color::muted(&report.path.display().to_string())
            );
            match (&report.snapshot, &report.error) {
                (Some(snapshot), _) => {
                    for line in detail_lines(snapshot) {
                        println!("{}", line);
                    }
                }
                (None, Some(error)) => println!("  {}", color::error(error)),
                (None, None) => {}
            }
            println!();
        }
    }

    if failed > 0 {
        warn!(
            event = "cli.status_failed",
            failed = failed,
            total = reports.len()
        );
        return Err(format!("{} of {} worktrees could not be read", failed, reports.len()).into());
    }

    info!(event = "cli.status_completed", count = reports.len());
    Ok(())
}
