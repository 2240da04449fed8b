//! GitHub queries through the `gh` CLI.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};
use worktide_config::ForgeConfig;
use worktide_core::{PullRequestInfo, PullRequestState, ReviewDecision, WorkflowRunInfo};

use crate::errors::ForgeError;

const RUN_FIELDS: &str = "workflowName,name,displayTitle,status,conclusion,createdAt,updatedAt";
const PR_FIELDS: &str = "number,title,state,isDraft,reviewDecision,updatedAt";

/// Runs `gh` with a per-command timeout.
///
/// Child processes are killed when the calling future is dropped, so an
/// aborted refresh does not leave `gh` running.
#[derive(Debug, Clone)]
pub struct GitHubCli {
    program: String,
    timeout: Duration,
}

impl GitHubCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ForgeConfig) -> Self {
        Self::new(config.gh_path(), config.command_timeout())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// True when the CLI is on the path and answers `--version`.
    pub async fn is_available(&self) -> bool {
        if which::which(&self.program).is_err() {
            debug!(event = "forge.github.cli_missing", program = %self.program);
            return false;
        }
        match self.run(None, &["--version"]).await {
            Ok(_) => true,
            Err(e) => {
                debug!(event = "forge.github.cli_unusable", error = %e);
                false
            }
        }
    }

    pub async fn default_branch(&self, repository_root: &Path) -> Result<String, ForgeError> {
        let output = self
            .run(
                Some(repository_root),
                &["repo", "view", "--json", "defaultBranchRef"],
            )
            .await
            .map_err(|e| match e {
                ForgeError::CliError { message } if is_not_hosted(&message) => {
                    ForgeError::NotHosted
                }
                other => other,
            })?;
        parse_default_branch(&output)
    }

    pub async fn latest_workflow_run(
        &self,
        repository_root: &Path,
        branch: &str,
    ) -> Result<Option<WorkflowRunInfo>, ForgeError> {
        let output = self
            .run(
                Some(repository_root),
                &[
                    "run", "list", "--branch", branch, "--limit", "1", "--json", RUN_FIELDS,
                ],
            )
            .await?;
        parse_workflow_runs(&output)
    }

    pub async fn pull_request(
        &self,
        repository_root: &Path,
        branch: &str,
    ) -> Result<Option<PullRequestInfo>, ForgeError> {
        let output = self
            .run(
                Some(repository_root),
                &[
                    "pr", "list", "--head", branch, "--limit", "1", "--json", PR_FIELDS,
                ],
            )
            .await?;
        parse_pull_requests(&output)
    }

    async fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<String, ForgeError> {
        let command_line = format!("{} {}", self.program, args.join(" "));
        debug!(event = "forge.github.command_started", command = %command_line);

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(ForgeError::CliNotFound {
                    cli: self.program.clone(),
                });
            }
            Ok(Err(e)) => return Err(ForgeError::from(e)),
            Err(_) => {
                warn!(event = "forge.github.command_timed_out", command = %command_line);
                return Err(ForgeError::Timeout {
                    command: command_line,
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(
                event = "forge.github.command_failed",
                command = %command_line,
                exit_code = output.status.code(),
                stderr = %stderr
            );
            return Err(ForgeError::CliError {
                message: format!(
                    "{} failed (exit {}): {}",
                    command_line,
                    output.status.code().unwrap_or(-1),
                    stderr
                ),
            });
        }

        debug!(event = "forge.github.command_completed", command = %command_line);
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn is_not_hosted(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("known github host")
        || message.contains("no git remotes")
        || message.contains("not a git repository")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhRepo {
    default_branch_ref: Option<GhBranchRef>,
}

#[derive(Deserialize)]
struct GhBranchRef {
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhRun {
    workflow_name: Option<String>,
    name: Option<String>,
    display_title: Option<String>,
    status: Option<String>,
    conclusion: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    is_draft: bool,
    review_decision: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

fn parse_json<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T, ForgeError> {
    serde_json::from_str(json).map_err(|e| ForgeError::ParseError {
        message: e.to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse `gh repo view --json defaultBranchRef`.
///
/// A repository without a default branch ref is not hosted on GitHub.
pub fn parse_default_branch(json: &str) -> Result<String, ForgeError> {
    if json.trim().is_empty() {
        return Err(ForgeError::NotHosted);
    }
    let repo: GhRepo = parse_json(json)?;
    repo.default_branch_ref
        .and_then(|r| non_empty(r.name))
        .ok_or(ForgeError::NotHosted)
}

/// Parse `gh run list --json ...` into its first run.
///
/// The run name falls back from the workflow name to the run name to the
/// display title. Status and conclusion are normalized to lowercase.
pub fn parse_workflow_runs(json: &str) -> Result<Option<WorkflowRunInfo>, ForgeError> {
    if json.trim().is_empty() {
        return Ok(None);
    }
    let runs: Vec<GhRun> = parse_json(json)?;
    Ok(runs.into_iter().next().map(|run| WorkflowRunInfo {
        name: non_empty(run.workflow_name)
            .or(non_empty(run.name))
            .or(non_empty(run.display_title)),
        status: non_empty(run.status).map(|s| s.to_lowercase()),
        conclusion: non_empty(run.conclusion).map(|c| c.to_lowercase()),
        created_at: run.created_at,
        updated_at: run.updated_at,
    }))
}

/// Parse `gh pr list --json ...` into its first pull request.
pub fn parse_pull_requests(json: &str) -> Result<Option<PullRequestInfo>, ForgeError> {
    if json.trim().is_empty() {
        return Ok(None);
    }
    let prs: Vec<GhPullRequest> = parse_json(json)?;
    Ok(prs.into_iter().next().map(|pr| {
        let state = match pr.state.to_uppercase().as_str() {
            "OPEN" => PullRequestState::Open,
            "CLOSED" => PullRequestState::Closed,
            "MERGED" => PullRequestState::Merged,
            unknown => {
                warn!(
                    event = "forge.github.pr_state_unknown",
                    number = pr.number,
                    state = unknown,
                    "Unknown PR state from gh CLI, treating as open"
                );
                PullRequestState::Open
            }
        };
        let review_decision = pr
            .review_decision
            .as_deref()
            .and_then(|d| match d.to_uppercase().as_str() {
                "APPROVED" => Some(ReviewDecision::Approved),
                "CHANGES_REQUESTED" => Some(ReviewDecision::ChangesRequested),
                "REVIEW_REQUIRED" => Some(ReviewDecision::ReviewRequired),
                _ => None,
            });
        PullRequestInfo {
            number: pr.number,
            title: pr.title,
            state,
            is_draft: pr.is_draft,
            review_decision,
            updated_at: pr.updated_at,
        }
    }))
}
