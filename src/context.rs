//! Environment introspection for better command generation.
//!
//! Collects facts about the user's machine and session so the model can
//! tailor its answer. Every sub-probe is best-effort: a failure degrades to an
//! absence value and never aborts the request.

use crate::error::Error;
use serde::Deserialize;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Placeholder for facts that could not be determined.
pub const UNAVAILABLE: &str = "unavailable";

/// Maximum number of file names included in a snapshot.
pub const FILE_SAMPLE_LIMIT: usize = 20;

/// Maximum number of `git status` lines included in a snapshot.
pub const STATUS_LINE_LIMIT: usize = 5;

/// Optional per-project descriptor read from the working directory.
pub const PROJECT_FILE: &str = ".askcmd.json";

/// Tools worth telling the model about, in the order they are reported.
pub const TOOL_CANDIDATES: &[&str] = &[
    "git", "docker", "kubectl", "node", "npm", "yarn", "pnpm", "python3", "pip", "cargo", "go",
    "make", "brew", "apt", "dnf", "pacman", "rg", "fd", "jq", "curl", "wget",
];

/// Outcome of a single best-effort probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Found(T),
    Unavailable,
}

impl<T> Probe<T> {
    /// Turn a fallible lookup into a probe result, logging the failure.
    pub fn from_result<E: Display>(probe: &'static str, result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Probe::Found(value),
            Err(e) => {
                let err = Error::ProbeFailure {
                    probe,
                    reason: e.to_string(),
                };
                debug!("{}", err);
                Probe::Unavailable
            }
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Probe::Found(value) => Some(value),
            Probe::Unavailable => None,
        }
    }
}

/// Captured output of an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
}

/// Runs external programs on behalf of the probes.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> io::Result<CommandOutput>;
}

/// Runs programs for real, with stdin and stderr suppressed.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// A bounded, sorted sample of the visible entries in a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSample {
    pub names: Vec<String>,
    /// How many names were left out of the sample.
    pub omitted: usize,
}

impl FileSample {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Version control state of the working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsInfo {
    pub is_repository: bool,
    pub branch: Option<String>,
    pub recent_status_lines: Vec<String>,
}

/// Hints from the project descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHints {
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub package_manager: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Everything known about the environment for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    /// Platform identifier (`linux`, `macos`, `windows`, ...).
    pub platform: String,
    /// Distribution name, when the platform has one.
    pub distro: Option<String>,
    pub shell: String,
    pub user: String,
    pub cwd: PathBuf,
    pub files: FileSample,
    pub tools: Vec<String>,
    pub vcs: VcsInfo,
    pub project: Option<ProjectHints>,
}

impl EnvironmentSnapshot {
    /// Capture the full snapshot used by generate mode.
    pub fn capture(cwd: &Path) -> Self {
        Self::capture_with(cwd, &SystemRunner)
    }

    /// Capture the full snapshot, running external programs through `runner`.
    pub fn capture_with(cwd: &Path, runner: &dyn CommandRunner) -> Self {
        let files = Probe::from_result("files", list_files(cwd))
            .found()
            .unwrap_or_default();

        Self {
            files,
            tools: detect_tools(runner, cwd),
            vcs: detect_vcs(runner, cwd),
            project: read_project_hints(cwd),
            ..Self::minimal_with(cwd, runner)
        }
    }

    /// Capture only platform, shell, user and cwd. Explain mode needs nothing
    /// more, so no directory listing or tool lookups happen here.
    pub fn minimal(cwd: &Path) -> Self {
        Self::minimal_with(cwd, &SystemRunner)
    }

    fn minimal_with(cwd: &Path, runner: &dyn CommandRunner) -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            distro: get_distro_info(runner, cwd),
            shell: env_fact("shell", &["SHELL", "COMSPEC"]),
            user: env_fact("user", &["USER", "USERNAME"]),
            cwd: cwd.to_path_buf(),
            files: FileSample::default(),
            tools: Vec::new(),
            vcs: VcsInfo::default(),
            project: None,
        }
    }
}

/// First non-empty variable among `vars`, or [`UNAVAILABLE`].
fn env_fact(probe: &'static str, vars: &[&str]) -> String {
    let value = vars
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| format!("none of {} is set", vars.join(", ")));

    Probe::from_result(probe, value)
        .found()
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// List visible entries of `dir`, sorted, directories marked with a slash.
fn list_files(dir: &Path) -> io::Result<FileSample> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        names.push(if is_dir { format!("{}/", name) } else { name });
    }
    names.sort();

    let omitted = names.len().saturating_sub(FILE_SAMPLE_LIMIT);
    names.truncate(FILE_SAMPLE_LIMIT);
    Ok(FileSample { names, omitted })
}

/// Names from [`TOOL_CANDIDATES`] that resolve on the PATH, in candidate order.
fn detect_tools(runner: &dyn CommandRunner, cwd: &Path) -> Vec<String> {
    let resolver = if cfg!(windows) { "where" } else { "which" };

    TOOL_CANDIDATES
        .iter()
        .copied()
        .filter(|name| {
            Probe::from_result("tools", runner.run(resolver, &[*name], cwd))
                .found()
                .map(|out| out.success)
                .unwrap_or(false)
        })
        .map(|name| name.to_string())
        .collect()
}

/// Branch and short status of the repository in `cwd`, if it is one.
fn detect_vcs(runner: &dyn CommandRunner, cwd: &Path) -> VcsInfo {
    if !cwd.join(".git").exists() {
        return VcsInfo::default();
    }

    let branch = git_query(runner, cwd, "vcs.branch", &["rev-parse", "--abbrev-ref", "HEAD"])
        .found()
        .map(|out| out.trim().to_string())
        .filter(|b| !b.is_empty());

    let status = git_query(runner, cwd, "vcs.status", &["status", "--short"]);
    let recent_status_lines: Vec<String> = status
        .found()
        .map(|out| {
            out.lines()
                .filter(|line| !line.trim().is_empty())
                .take(STATUS_LINE_LIMIT)
                .map(|line| line.trim_end().to_string())
                .collect()
        })
        .unwrap_or_default();

    VcsInfo {
        is_repository: true,
        branch,
        recent_status_lines,
    }
}

fn git_query(
    runner: &dyn CommandRunner,
    cwd: &Path,
    probe: &'static str,
    args: &[&str],
) -> Probe<String> {
    let result = runner.run("git", args, cwd).and_then(|out| {
        if out.success {
            Ok(out.stdout)
        } else {
            Err(io::Error::other(format!(
                "git {} exited unsuccessfully",
                args.join(" ")
            )))
        }
    });
    Probe::from_result(probe, result)
}

/// Parse the project descriptor in `cwd`. Unreadable or malformed means absent.
fn read_project_hints(cwd: &Path) -> Option<ProjectHints> {
    let path = cwd.join(PROJECT_FILE);
    if !path.exists() {
        return None;
    }

    let result = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|contents| {
            serde_json::from_str::<ProjectHints>(&contents).map_err(|e| e.to_string())
        });
    Probe::from_result("project", result).found()
}

/// Get the distribution name from /etc/os-release or sw_vers.
#[cfg_attr(not(target_os = "macos"), allow(unused_variables))]
fn get_distro_info(runner: &dyn CommandRunner, cwd: &Path) -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(contents) = std::fs::read_to_string("/etc/os-release") {
            for line in contents.lines() {
                if let Some(pretty_name) = line.strip_prefix("PRETTY_NAME=") {
                    // Remove surrounding quotes
                    return Some(pretty_name.trim_matches('"').to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let output = runner.run("sw_vers", &["-productVersion"], cwd);
        if let Some(output) = Probe::from_result("distro", output).found() {
            if output.success {
                return Some(format!("macOS {}", output.stdout.trim()));
            }
        }
    }

    None
}
