//! Fleet orchestration: run ingestion across many target repositories with
//! bounded retries, pacing between invocations, and a failure manifest.
//!
//! Execution is deliberately sequential — the pacing delay is politeness
//! toward the remote hosts every target ultimately hits, not a missing
//! parallelism feature.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use postsync_shared::{FleetConfig, PostsyncError, Result};

/// Maximum chars of captured error output kept per failing target.
const MAX_SNIPPET_CHARS: usize = 400;

/// One discovered ingestion target.
#[derive(Debug, Clone)]
pub struct Target {
    /// Directory name, used as the target identifier in reports and the
    /// failure manifest.
    pub name: String,
    /// Path of the target directory.
    pub dir: PathBuf,
}

/// Executes ingestion for a single target.
///
/// The sweep's retry and pacing logic only sees this boundary, so it is
/// agnostic to whether ingestion runs in-process (test doubles) or
/// out-of-process (the default subprocess runner).
pub trait TargetRunner: Send + Sync {
    /// Run ingestion for one target; `Err` carries a bounded error snippet.
    fn run(&self, target: &Target) -> std::result::Result<(), String>;
}

/// Default runner: spawns the target's entry-point script as a subprocess
/// with the target directory as working directory.
pub struct CommandRunner {
    program: String,
    entry_point: String,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            entry_point: entry_point.into(),
        }
    }
}

impl TargetRunner for CommandRunner {
    fn run(&self, target: &Target) -> std::result::Result<(), String> {
        let output = Command::new(&self.program)
            .arg(&self.entry_point)
            .current_dir(&target.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| format!("failed to spawn {}: {e}", self.program))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        };
        Err(bounded_snippet(&text, output.status.code()))
    }
}

/// Keep the tail of the error output plus the exit code.
fn bounded_snippet(text: &str, code: Option<i32>) -> String {
    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    let tail: String = if chars <= MAX_SNIPPET_CHARS {
        trimmed.to_string()
    } else {
        trimmed.chars().skip(chars - MAX_SNIPPET_CHARS).collect()
    };

    match code {
        Some(code) if tail.is_empty() => format!("exit status {code}"),
        Some(code) => format!("exit status {code}: {tail}"),
        None => format!("terminated by signal: {tail}"),
    }
}

/// Summary of one fleet sweep.
#[derive(Debug)]
pub struct SweepReport {
    /// Targets that succeeded at some point during the sweep.
    pub succeeded: Vec<String>,
    /// Targets still failing after the round budget, with their last
    /// captured error snippet.
    pub failed: Vec<(String, String)>,
    /// Rounds actually run.
    pub rounds_run: u32,
}

/// Discover valid targets: subdirectories of the targets directory holding
/// both the owner configuration file and the ingestion entry point. Sorted
/// by name for deterministic sequencing.
pub fn discover_targets(
    targets_dir: &Path,
    owner_file: &str,
    entry_point: &str,
) -> Result<Vec<Target>> {
    let entries =
        std::fs::read_dir(targets_dir).map_err(|e| PostsyncError::io(targets_dir, e))?;

    let mut targets = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PostsyncError::io(targets_dir, e))?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }

        if !dir.join(owner_file).exists() || !dir.join(entry_point).exists() {
            debug!(dir = %dir.display(), "not a valid target, skipping");
            continue;
        }

        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        targets.push(Target {
            name: name.to_string(),
            dir: dir.clone(),
        });
    }

    targets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(targets)
}

/// Run a full sweep: every target once, then retry rounds over the failures
/// only, with the configured delay between invocations. Ends by writing the
/// failure manifest (or removing a stale one when the sweep is clean).
///
/// One target's failure never blocks the others; residual failures are not
/// an error — the manifest is the durable record for operator follow-up.
#[instrument(skip_all, fields(targets_dir = %config.targets_dir.display()))]
pub async fn run_sweep(
    config: &FleetConfig,
    runner: &dyn TargetRunner,
    progress: &dyn SweepProgress,
) -> Result<SweepReport> {
    let targets = discover_targets(&config.targets_dir, &config.owner_file, &config.entry_point)?;
    let rounds = config.rounds.max(1);

    info!(targets = targets.len(), rounds, delay_secs = config.delay_secs, "starting sweep");

    let mut failures: BTreeMap<String, String> = BTreeMap::new();
    let mut rounds_run = 0;
    let mut first_invocation = true;

    for round in 1..=rounds {
        let pending: Vec<&Target> = if round == 1 {
            targets.iter().collect()
        } else {
            targets
                .iter()
                .filter(|t| failures.contains_key(&t.name))
                .collect()
        };

        if pending.is_empty() {
            break;
        }
        rounds_run = round;
        progress.round(round, rounds, pending.len());

        for (i, target) in pending.iter().enumerate() {
            if !first_invocation && config.delay_secs > 0 {
                tokio::time::sleep(Duration::from_secs(config.delay_secs)).await;
            }
            first_invocation = false;

            progress.target(&target.name, i + 1, pending.len());
            match runner.run(target) {
                Ok(()) => {
                    debug!(target = %target.name, round, "target succeeded");
                    failures.remove(&target.name);
                }
                Err(snippet) => {
                    warn!(target = %target.name, round, error = %snippet, "target failed");
                    failures.insert(target.name.clone(), snippet);
                }
            }
        }
    }

    write_manifest(&config.manifest_path, &failures)?;

    let succeeded: Vec<String> = targets
        .iter()
        .filter(|t| !failures.contains_key(&t.name))
        .map(|t| t.name.clone())
        .collect();

    info!(
        succeeded = succeeded.len(),
        failed = failures.len(),
        rounds_run,
        "sweep complete"
    );

    Ok(SweepReport {
        succeeded,
        failed: failures.into_iter().collect(),
        rounds_run,
    })
}

/// Write failing target names one per line; remove a stale manifest when
/// the sweep ended clean so old failures never linger.
fn write_manifest(path: &Path, failures: &BTreeMap<String, String>) -> Result<()> {
    if failures.is_empty() {
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed stale failure manifest"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(PostsyncError::io(path, e)),
        }
        return Ok(());
    }

    let mut content = String::new();
    for name in failures.keys() {
        content.push_str(name);
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|e| PostsyncError::io(path, e))?;
    info!(path = %path.display(), failed = failures.len(), "failure manifest written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Progress callback for sweep reporting.
pub trait SweepProgress: Send + Sync {
    /// Called at the start of each round.
    fn round(&self, round: u32, total_rounds: u32, pending: usize);
    /// Called before each target invocation.
    fn target(&self, name: &str, current: usize, total: usize);
}

/// No-op sweep progress.
pub struct SilentSweep;

impl SweepProgress for SilentSweep {
    fn round(&self, _round: u32, _total_rounds: u32, _pending: usize) {}
    fn target(&self, _name: &str, _current: usize, _total: usize) {}
}
