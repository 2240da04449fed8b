use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::ArgMatches;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use worktide_config::WorktideConfig;
use worktide_core::{
    NotifyWatchSource, RefreshState, StatusService, StatusView, Worktree, WorktreeId,
};
use worktide_forge::LiveStatusProvider;

use super::display::summary_line;
use super::helpers::{
    build_runtime, discover_worktrees, load_config_with_warning, resolve_path, select_entry,
};
use crate::color;
use crate::shutdown::wait_for_shutdown_signal;

pub(crate) fn handle_watch_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_path(matches);
    let requested = matches.get_one::<String>("select").map(String::as_str);

    info!(
        event = "cli.watch_started",
        path = %path.display(),
        select = requested
    );

    let entries = discover_worktrees(&path)?;
    let selected = match select_entry(&entries, &path, requested) {
        Some(entry) => Some(WorktreeId::new(entry.name.clone())),
        None => {
            if let Some(name) = requested {
                eprintln!("{}", color::error(&format!("No worktree named '{}'", name)));
                error!(event = "cli.watch_failed", reason = "unknown_worktree", name = name);
                return Err(format!("No worktree named '{}'", name).into());
            }
            None
        }
    };
    let config = load_config_with_warning(entries.first().map(|e| e.repository_root.as_path()));
    let worktrees: Vec<Worktree> = entries.into_iter().map(Worktree::from).collect();

    let runtime = build_runtime()?;
    runtime.block_on(run_watch(worktrees, selected, config));

    info!(event = "cli.watch_completed");
    Ok(())
}

async fn run_watch(worktrees: Vec<Worktree>, selected: Option<WorktreeId>, config: WorktideConfig) {
    let provider = Arc::new(LiveStatusProvider::from_config(&config));
    let service = StatusService::spawn(provider, Arc::new(NotifyWatchSource::new()), &config);

    println!(
        "Watching {} worktree(s){}. Press Ctrl-C to stop.",
        worktrees.len(),
        selected
            .as_ref()
            .map(|id| format!(", focused on {}", color::branch(id.as_str())))
            .unwrap_or_default()
    );
    service.set_worktrees(worktrees);
    service.select_worktree(selected);

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal(signal_shutdown).await {
            error!(
                event = "cli.watch.signal_handler_failed",
                error = %e,
                "Signal handler failed, Ctrl-C will not stop the watch gracefully"
            );
        }
    });

    let mut reader = service.reader();
    let mut printer = TransitionPrinter::default();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            view = reader.changed() => match view {
                Some(view) => {
                    for line in printer.transitions(&view) {
                        println!("{}", line);
                    }
                }
                None => break,
            },
        }
    }

    service.stop().await;
}

/// Remembers what was last printed per worktree so only changes are shown.
#[derive(Default)]
struct TransitionPrinter {
    seen: HashMap<WorktreeId, (RefreshState, Option<DateTime<Utc>>)>,
}

impl TransitionPrinter {
    fn transitions(&mut self, view: &StatusView) -> Vec<String> {
        self.seen.retain(|id, _| view.worktrees.contains_key(id));

        let mut ids: Vec<&WorktreeId> = view.worktrees.keys().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let mut lines = Vec::new();
        for id in ids {
            let Some(cached) = view.worktrees.get(id) else {
                continue;
            };
            let current = (cached.state.clone(), cached.last_refresh);
            if self.seen.get(id) == Some(&current) {
                continue;
            }
            self.seen.insert(id.clone(), current);

            let focus = if view.displayed.as_ref() == Some(id) {
                "*"
            } else {
                " "
            };
            let mut line = format!(
                "{} {} {:<20} {}",
                color::muted(&Local::now().format("%H:%M:%S").to_string()),
                focus,
                id.as_str(),
                color::refresh_state(&cached.state)
            );
            match (&cached.state, &cached.snapshot) {
                (RefreshState::Failed(message), _) => {
                    line.push_str("  ");
                    line.push_str(&color::muted(message));
                }
                (_, Some(snapshot)) => {
                    line.push_str("  ");
                    line.push_str(&summary_line(snapshot));
                }
                _ => {}
            }
            lines.push(line);
        }
        lines
    }
}
