//! External planner runs. Log patterns follow Fast Downward's output format.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use crate::error::PuzzleError;
use crate::pddl::Encoding;

/// Where the planner writes its plan, relative to its working directory.
pub const SOLUTION_ARTIFACT: &str = "sas_plan";
pub const DEFAULT_SEARCH: &str = "astar(lmcut())";

/// Lines of stdout kept when the planner leaves no plan behind.
const STDOUT_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Success,
    Failure,
    Error,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Success => "success",
            PlanStatus::Failure => "failure",
            PlanStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub status: PlanStatus,
    pub plan: Vec<String>,
    pub plan_length: usize,
    pub expanded_nodes: Option<u64>,
    pub search_time: Option<f64>,
    /// Short description of why the planner did not succeed.
    pub reason: Option<String>,
    /// Captured output kept for diagnosis: stderr on a crash, the stdout tail
    /// on a missing plan or a timeout.
    pub diagnostics: Option<String>,
}

impl PlanResult {
    fn from_error(status: PlanStatus, error: PuzzleError) -> Self {
        let diagnostics = match &error {
            PuzzleError::PlannerProcess { stderr, .. } => Some(stderr.clone()),
            PuzzleError::PlannerOutputMissing { tail }
            | PuzzleError::PlannerTimedOut { tail, .. } => Some(tail.clone()),
            _ => None,
        };
        PlanResult {
            status,
            plan: Vec::new(),
            plan_length: 0,
            expanded_nodes: None,
            search_time: None,
            reason: Some(error.to_string()),
            diagnostics,
        }
    }
}

fn total_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Total time: (\d+(?:\.\d+)?)s").expect("total time pattern")
    })
}

fn expanded_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Expanded (\d+) state\(s\)").expect("expanded pattern"))
}

fn search_time(stdout: &str) -> Option<f64> {
    total_time_pattern()
        .captures(stdout)
        .and_then(|captures| captures.get(1))
        .and_then(|time| time.as_str().parse().ok())
}

fn expanded_nodes(stdout: &str) -> Option<u64> {
    expanded_pattern()
        .captures(stdout)
        .and_then(|captures| captures.get(1))
        .and_then(|nodes| nodes.as_str().parse().ok())
}

/// Action names from a solution artifact, one per non-blank, non-comment line,
/// with the parentheses stripped.
pub fn parse_plan(artifact: &str) -> Vec<String> {
    artifact
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .map(|line| line.replace(['(', ')'], ""))
        .collect()
}

fn stdout_tail(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.lines().collect();
    let start = lines.len().saturating_sub(STDOUT_TAIL_LINES);
    lines[start..].join("\n")
}

/// Turns the text a planner left behind into a [`PlanResult`]. A missing
/// artifact is a failure carrying the tail of stdout.
pub fn decode(stdout: &str, artifact: Option<&str>) -> PlanResult {
    let search_time = search_time(stdout);
    let expanded_nodes = expanded_nodes(stdout);

    let Some(artifact) = artifact else {
        let mut result = PlanResult::from_error(
            PlanStatus::Failure,
            PuzzleError::PlannerOutputMissing {
                tail: stdout_tail(stdout),
            },
        );
        result.search_time = search_time;
        result.expanded_nodes = expanded_nodes;
        return result;
    };

    let plan = parse_plan(artifact);
    PlanResult {
        status: PlanStatus::Success,
        plan_length: plan.len(),
        plan,
        expanded_nodes,
        search_time,
        reason: None,
        diagnostics: None,
    }
}

/// Captured streams and exit code of one finished planner process.
#[derive(Debug, Clone, Default)]
pub struct PlannerOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Like [`decode`], but a non-zero (or missing) exit code makes the result an
/// error that carries stderr verbatim.
pub fn decode_output(output: &PlannerOutput, artifact: Option<&str>) -> PlanResult {
    if output.exit_code != Some(0) {
        return PlanResult::from_error(
            PlanStatus::Error,
            PuzzleError::PlannerProcess {
                exit_code: output.exit_code,
                stderr: output.stderr.clone(),
            },
        );
    }
    decode(&output.stdout, artifact)
}

/// An external planner command line:
/// `program [program_args..] <domain> <problem> --search <search>`.
///
/// The planner runs inside the work directory, so relative paths in
/// `program_args` resolve against it.
#[derive(Debug, Clone, PartialEq)]
pub struct Planner {
    pub program: String,
    pub program_args: Vec<String>,
    pub search: String,
    /// `None` waits for the planner however long it takes.
    pub timeout: Option<Duration>,
}

impl Planner {
    pub fn new(program: impl Into<String>) -> Self {
        Planner {
            program: program.into(),
            program_args: Vec::new(),
            search: DEFAULT_SEARCH.to_string(),
            timeout: None,
        }
    }

    /// Writes the encoding into `work_dir`, runs the planner there and decodes
    /// what it reports. Never fails: problems launching or waiting on the
    /// process come back as an `Error` result.
    ///
    /// `work_dir` holds the solution artifact, so two runs must not share it.
    pub fn solve(&self, encoding: &Encoding, work_dir: &Path) -> PlanResult {
        match self.run(encoding, work_dir) {
            Ok((output, artifact)) => {
                let result = decode_output(&output, artifact.as_deref());
                match result.status {
                    PlanStatus::Success => info!(
                        "planner solved: length {}, time {:?}, expanded {:?}",
                        result.plan_length, result.search_time, result.expanded_nodes
                    ),
                    PlanStatus::Failure => warn!(
                        "planner left no plan, output tail:\n{}",
                        result.diagnostics.as_deref().unwrap_or_default()
                    ),
                    PlanStatus::Error => warn!(
                        "planner failed: {}\n{}",
                        result.reason.as_deref().unwrap_or_default(),
                        result.diagnostics.as_deref().unwrap_or_default()
                    ),
                }
                result
            }
            Err(error) => {
                warn!("planner run failed: {error}");
                PlanResult::from_error(PlanStatus::Error, error)
            }
        }
    }

    fn run(
        &self,
        encoding: &Encoding,
        work_dir: &Path,
    ) -> Result<(PlannerOutput, Option<String>), PuzzleError> {
        fs::create_dir_all(work_dir)?;
        let work_dir = work_dir.canonicalize()?;
        let (domain_path, problem_path) = encoding.write_to(&work_dir)?;

        let artifact_path = work_dir.join(SOLUTION_ARTIFACT);
        remove_if_exists(&artifact_path)?;

        let stdout_path = work_dir.join("planner.stdout.log");
        let stderr_path = work_dir.join("planner.stderr.log");

        let mut command = Command::new(&self.program);
        command
            .args(&self.program_args)
            .arg(&domain_path)
            .arg(&problem_path)
            .arg("--search")
            .arg(&self.search)
            .current_dir(&work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(File::create(&stdout_path)?))
            .stderr(Stdio::from(File::create(&stderr_path)?));

        debug!("running planner: {command:?}");
        let mut child = command.spawn()?;

        let status = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(status) => status,
                None => {
                    child.kill()?;
                    let _ = child.wait();
                    return Err(PuzzleError::PlannerTimedOut {
                        seconds: timeout.as_secs(),
                        tail: stdout_tail(&read_lossy(&stdout_path)?),
                    });
                }
            },
            None => child.wait()?,
        };

        let output = PlannerOutput {
            exit_code: status.code(),
            stdout: read_lossy(&stdout_path)?,
            stderr: read_lossy(&stderr_path)?,
        };

        let artifact = match read_lossy(&artifact_path) {
            Ok(artifact) => {
                fs::remove_file(&artifact_path)?;
                Some(artifact)
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => None,
            Err(error) => return Err(error.into()),
        };

        Ok((output, artifact))
    }
}

// Planner logs are not guaranteed to be UTF-8.
fn read_lossy(path: &Path) -> std::io::Result<String> {
    Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned())
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(error) if error.kind() != std::io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}
