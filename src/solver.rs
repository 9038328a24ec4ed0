//! The contract with the external answer-set solver.
//!
//! Running the solver process is the embedder's business; this module only
//! defines what a run is asked for and what it hands back, plus the pure
//! helpers that read solver output and test headers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::JudgeConfig;

/// Simplified solver run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverStatus {
    Satisfiable,
    Unsatisfiable,
    Ok,
    Unknown,
    Timeout,
    SyntaxError,
}

impl SolverStatus {
    /// Maps a clingo-style exit code.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => SolverStatus::Ok,
            // Interrupted before any model was found.
            1 => SolverStatus::Unknown,
            // Consistent; 11/31 are interrupted runs, 30/62 exhausted or optimal.
            10 | 11 | 30 | 31 | 62 => SolverStatus::Satisfiable,
            20 => SolverStatus::Unsatisfiable,
            65 | 128 => SolverStatus::SyntaxError,
            _ => SolverStatus::Unknown,
        }
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SolverStatus::Satisfiable => "SATISFIABLE",
            SolverStatus::Unsatisfiable => "UNSATISFIABLE",
            SolverStatus::Ok => "OK",
            SolverStatus::Unknown => "UNKNOWN",
            SolverStatus::Timeout => "TIMEOUT",
            SolverStatus::SyntaxError => "SYNTAX_ERROR",
        };
        f.write_str(label)
    }
}

/// Extracts solutions from solver stdout: the line following each
/// `Answer: N` line, split on whitespace.
pub fn read_answers(stdout: &str) -> Vec<Vec<String>> {
    let mut answers = Vec::new();
    let mut answer_next = false;
    for line in stdout.lines() {
        if line.starts_with("Answer: ") {
            answer_next = true;
            continue;
        }
        if !answer_next {
            continue;
        }
        answer_next = false;
        answers.push(line.split_whitespace().map(str::to_string).collect());
    }
    answers
}

/// Constants declared in a test header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestConstants {
    /// Value of the `MODELS` key, when present and numeric.
    pub models: Option<u32>,
    /// Every other `key=value` binding.
    pub constants: BTreeMap<String, String>,
}

/// Reads `%%% key=value` header lines of a test program.
pub fn parse_constants(test_source: &str) -> TestConstants {
    let mut out = TestConstants::default();
    for line in test_source.lines() {
        let Some(binding) = line.trim_end().strip_prefix("%%% ") else {
            continue;
        };
        let Some((key, value)) = binding.split_once('=') else {
            tracing::warn!(line, "ignoring test header without `=`");
            continue;
        };
        if key == "MODELS" {
            match value.trim().parse() {
                Ok(models) => out.models = Some(models),
                Err(_) => tracing::warn!(value, "ignoring non-numeric MODELS"),
            }
            continue;
        }
        out.constants.insert(key.to_string(), value.to_string());
    }
    out
}

/// Everything the solver needs for one (instance, test) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub instance: String,
    pub test: String,
    pub models: u32,
    pub constants: BTreeMap<String, String>,
    pub single_agent: bool,
}

impl SolveRequest {
    /// Builds a request from a test program's source, honouring its header.
    pub fn from_test_source(
        instance: impl Into<String>,
        test: impl Into<String>,
        test_source: &str,
        config: &JudgeConfig,
    ) -> Self {
        let header = parse_constants(test_source);
        Self {
            instance: instance.into(),
            test: test.into(),
            models: header
                .models
                .unwrap_or_else(|| config.effective_default_models()),
            constants: header.constants,
            single_agent: config.effective_single_agent(),
        }
    }
}

/// What a solver run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveOutcome {
    pub status: SolverStatus,
    pub solutions: Vec<Vec<String>>,
}

impl SolveOutcome {
    pub fn timed_out() -> Self {
        Self {
            status: SolverStatus::Timeout,
            solutions: Vec::new(),
        }
    }

    /// Interprets a finished run's exit code and stdout.
    pub fn from_output(exit_code: i32, stdout: &str) -> Self {
        Self {
            status: SolverStatus::from_exit_code(exit_code),
            solutions: read_answers(stdout),
        }
    }
}

/// Anything that can produce candidate solutions for a request, typically a
/// wrapper around a solver subprocess.
#[async_trait]
pub trait SolutionSource: Send + Sync {
    async fn solve(&self, request: &SolveRequest) -> SolveOutcome;
}
