//! Runs solver tests and validates every returned solution.
//!
//! Each solution is an independent unit of work. Units are dispatched onto
//! tokio's blocking pool, at most `max_workers` at a time, and share nothing.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::JudgeConfig;
use crate::diagnostics::Diagnostic;
use crate::solver::{SolutionSource, SolveOutcome, SolveRequest, SolverStatus};
use crate::validator::{SolutionReport, Validator};
use crate::Puzzle;

/// Whether a test expects models or expects none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestKind {
    Positive,
    Negative,
}

impl TestKind {
    pub fn expected_status(self) -> SolverStatus {
        match self {
            TestKind::Positive => SolverStatus::Satisfiable,
            TestKind::Negative => SolverStatus::Unsatisfiable,
        }
    }
}

/// One solver run and the validation of its solutions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRun {
    pub kind: TestKind,
    pub status: SolverStatus,
    pub solutions: Vec<Vec<String>>,
    pub reports: Vec<SolutionReport>,
    pub elapsed_secs: f64,
}

impl TestRun {
    /// Every returned solution validated.
    pub fn verified(&self) -> bool {
        self.reports.iter().all(|report| report.valid)
    }

    /// Positive tests need a satisfiable run whose solutions all validate;
    /// negative tests only need the run to be unsatisfiable.
    pub fn passed(&self) -> bool {
        match self.kind {
            TestKind::Positive => self.status == self.kind.expected_status() && self.verified(),
            TestKind::Negative => self.status == self.kind.expected_status(),
        }
    }
}

/// Validates one solution synchronously. Fatal construction errors become a
/// rejected report instead of failing the batch.
pub fn validate_solution(
    puzzle: Puzzle,
    solution: &[String],
    require_solutions: bool,
) -> SolutionReport {
    match Validator::new(puzzle.domain(), solution) {
        Ok(validator) => SolutionReport::from_validator(&validator, require_solutions),
        Err(err) => {
            tracing::debug!(puzzle = ?puzzle, error = %err, "solution rejected");
            SolutionReport::rejected(&err)
        }
    }
}

pub struct Judge {
    puzzle: Puzzle,
    config: JudgeConfig,
    permits: Arc<Semaphore>,
}

impl Judge {
    pub fn new(puzzle: Puzzle, config: JudgeConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.effective_max_workers()));
        Self {
            puzzle,
            config,
            permits,
        }
    }

    pub fn puzzle(&self) -> Puzzle {
        self.puzzle
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Asks `source` for solutions, giving up at the configured deadline.
    /// Dropping the pending future cancels the run.
    pub async fn solve(&self, source: &dyn SolutionSource, request: &SolveRequest) -> SolveOutcome {
        let deadline = self.config.effective_timeout();
        match tokio::time::timeout(deadline, source.solve(request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    instance = %request.instance,
                    test = %request.test,
                    timeout_ms = deadline.as_millis() as u64,
                    "solver run timed out"
                );
                SolveOutcome::timed_out()
            }
        }
    }

    /// Validates every solution in parallel. Reports come back in input order.
    pub async fn validate_all(&self, solutions: Vec<Vec<String>>) -> Vec<SolutionReport> {
        let count = solutions.len();
        let require_solutions = self.config.effective_require_solutions();
        let mut tasks = JoinSet::new();

        for (index, solution) in solutions.into_iter().enumerate() {
            let permits = Arc::clone(&self.permits);
            let puzzle = self.puzzle;
            tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only waits.
                let _permit = permits.acquire_owned().await.ok();
                let report = tokio::task::spawn_blocking(move || {
                    validate_solution(puzzle, &solution, require_solutions)
                })
                .await;
                (index, report)
            });
        }

        let mut reports: Vec<Option<SolutionReport>> = (0..count).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(report))) => reports[index] = Some(report),
                Ok((index, Err(err))) => {
                    tracing::warn!(index, error = %err, "validation worker failed");
                }
                Err(err) => tracing::warn!(error = %err, "validation task failed"),
            }
        }

        reports
            .into_iter()
            .map(|report| {
                report.unwrap_or_else(|| SolutionReport {
                    instance_summary: String::new(),
                    valid: false,
                    logs: vec![Diagnostic::error("Validation worker did not finish.")],
                })
            })
            .collect()
    }

    /// Solves one test and validates what came back.
    pub async fn run_test(
        &self,
        source: &dyn SolutionSource,
        kind: TestKind,
        request: &SolveRequest,
    ) -> TestRun {
        let started = Instant::now();
        let outcome = self.solve(source, request).await;
        let reports = self.validate_all(outcome.solutions.clone()).await;
        let run = TestRun {
            kind,
            status: outcome.status,
            solutions: outcome.solutions,
            reports,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        tracing::info!(
            test = %request.test,
            status = %run.status,
            solutions = run.solutions.len(),
            passed = run.passed(),
            "test finished"
        );
        run
    }
}
