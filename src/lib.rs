//! Plan judge: validates planning-puzzle solutions produced by an answer-set
//! solver.
//!
//! This crate defines:
//! - [`Fact`] and [`PatternTable`]: flat `name(args)` facts and the ordered,
//!   first-match-wins tables that recognise them.
//! - [`PlanBuilder`]: turns a fact set into a time- and agent-indexed [`Plan`].
//! - [`Validator`]: runs a [`Domain`] simulator over the plan, reports
//!   predicates nobody recognised, and caches the verdict.
//! - [`domains`]: blocks world, dependency hell, statues and coffee delivery.
//! - [`Judge`]: runs solver tests behind a deadline and validates every
//!   solution on a worker pool.

pub mod config;
pub mod diagnostics;
pub mod domains;
pub mod error;
pub mod facts;
pub mod judge;
pub mod plan;
pub mod solver;
pub mod validator;

use serde::{Deserialize, Serialize};

pub use config::JudgeConfig;
pub use diagnostics::{Diagnostic, Severity, ValidationResult};
pub use error::{JudgeError, JudgeResult};
pub use facts::{Fact, FactPattern, Field, PatternTable};
pub use judge::{Judge, TestKind, TestRun};
pub use plan::{Action, Agent, Plan, PlanBuilder, DEFAULT_AGENT};
pub use solver::{SolutionSource, SolveOutcome, SolveRequest, SolverStatus};
pub use validator::{Domain, SolutionReport, Validator};

/// The puzzles this crate knows how to judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Puzzle {
    Blocks,
    DependencyHell,
    Statues,
    Coffee,
}

impl Puzzle {
    pub const ALL: [Puzzle; 4] = [
        Puzzle::Blocks,
        Puzzle::DependencyHell,
        Puzzle::Statues,
        Puzzle::Coffee,
    ];

    /// A fresh simulator for this puzzle.
    pub fn domain(self) -> Box<dyn Domain> {
        match self {
            Puzzle::Blocks => Box::new(domains::BlocksWorld::new()),
            Puzzle::DependencyHell => Box::new(domains::DependencyHell::new()),
            Puzzle::Statues => Box::new(domains::Statues::new()),
            Puzzle::Coffee => Box::new(domains::CoffeeDelivery::new()),
        }
    }

    /// Looks a puzzle up by its simulator name (`blocks`, `dependency-hell`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|puzzle| puzzle.domain().name() == name)
    }
}

/// Validates one solution and returns the cached verdict.
pub fn judge_solution<S: AsRef<str>>(
    puzzle: Puzzle,
    solution: &[S],
) -> JudgeResult<ValidationResult> {
    let validator = Validator::for_puzzle(puzzle, solution)?;
    Ok(validator.validate().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puzzle_names_round_trip_through_their_simulators() {
        for puzzle in Puzzle::ALL {
            let name = puzzle.domain().name();
            assert_eq!(Puzzle::from_name(name), Some(puzzle));
        }
        assert_eq!(Puzzle::from_name("sokoban"), None);
    }

    #[test]
    fn serde_names_match_simulator_names() {
        let json = serde_json::to_string(&Puzzle::DependencyHell).expect("serialize");
        assert_eq!(json, r#""dependency-hell""#);
    }

    #[test]
    fn unknown_predicate_warning_sits_between_domain_output_and_verdict() {
        let result = judge_solution(
            Puzzle::Statues,
            &[
                "time(0)",
                "time(1)",
                "foo(bar)",
                "start(at(0))",
                "goal(at(1))",
                "exec(0,move(1))",
                "exec(1,dance)",
            ],
        )
        .expect("result");
        let messages: Vec<&str> = result.logs.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Got unexpected actions: [dance]",
                "Ignored predicates: [foo]",
                "No issues found!",
            ]
        );
        assert!(result.valid);
    }

    #[test]
    fn fatal_errors_surface_from_judge_solution() {
        assert_eq!(
            judge_solution(Puzzle::Blocks, &["start(on(a,table))"]),
            Err(JudgeError::NoGoal)
        );
    }
}
