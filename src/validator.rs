//! The validator core: parse, run a domain's verify hook, account for
//! predicates nobody recognised, and cache the verdict.

use std::cell::OnceCell;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, ValidationResult};
use crate::error::{JudgeError, JudgeResult};
use crate::facts::Fact;
use crate::plan::{Plan, PlanBuilder, Recognized};
use crate::Puzzle;

/// A pluggable puzzle simulator.
///
/// Domains extend the generic fact table with their own predicates and
/// replay the built plan against their rules.
pub trait Domain: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether the generic timeline builder runs for this domain. Domains
    /// that opt out never see a [`Plan`] and do not require a goal.
    fn uses_timeline(&self) -> bool {
        true
    }

    /// Offers a fact the generic layer did not claim. Returns `true` when the
    /// domain recognised (and recorded) it.
    fn parse_extra(&mut self, fact: &Fact) -> bool;

    /// Replays the plan and returns diagnostics in emission order.
    fn verify(&self, plan: Option<&Plan>) -> Vec<Diagnostic>;

    /// Human readable description of the built state.
    fn summary(&self, plan: Option<&Plan>) -> String {
        plan.map(|plan| plan.summary(", ")).unwrap_or_default()
    }
}

/// Validates one candidate solution against one domain.
///
/// The verdict is computed on first access and cached, so repeated calls
/// observe identical logs.
pub struct Validator {
    domain: Box<dyn Domain>,
    facts: Vec<Fact>,
    plan: Option<Plan>,
    recognized: Recognized,
    result: OnceCell<ValidationResult>,
}

impl Validator {
    pub fn new<S: AsRef<str>>(mut domain: Box<dyn Domain>, solution: &[S]) -> JudgeResult<Self> {
        let facts = Fact::parse_all(solution)?;

        let mut recognized = Recognized::new();
        let plan = if domain.uses_timeline() {
            let built = PlanBuilder::build(&facts)?;
            recognized.extend(built.recognized);
            Some(built.plan)
        } else {
            None
        };

        let claimed = Self::domain_pass(domain.as_mut(), &facts, &recognized);
        recognized.extend(claimed);

        Ok(Self {
            domain,
            facts,
            plan,
            recognized,
            result: OnceCell::new(),
        })
    }

    pub fn for_puzzle<S: AsRef<str>>(puzzle: Puzzle, solution: &[S]) -> JudgeResult<Self> {
        Self::new(puzzle.domain(), solution)
    }

    /// Offers the domain every fact the generic layer left unclaimed.
    fn domain_pass(domain: &mut dyn Domain, facts: &[Fact], generic: &Recognized) -> Recognized {
        facts
            .iter()
            .filter(|fact| !generic.contains(&fact.raw))
            .filter(|fact| domain.parse_extra(fact))
            .map(|fact| fact.raw.clone())
            .collect()
    }

    pub fn validate(&self) -> &ValidationResult {
        self.result.get_or_init(|| self.compute())
    }

    fn compute(&self) -> ValidationResult {
        let mut logs = self.domain.verify(self.plan.as_ref());
        tracing::debug!(
            domain = self.domain.name(),
            diagnostics = logs.len(),
            "domain verify finished"
        );

        let ignored: BTreeSet<&str> = self
            .facts
            .iter()
            .filter(|fact| !self.recognized.contains(&fact.raw))
            .map(|fact| fact.name.as_str())
            .collect();
        if !ignored.is_empty() {
            let names: Vec<&str> = ignored.into_iter().collect();
            logs.push(Diagnostic::warning(format!(
                "Ignored predicates: [{}]",
                names.join(", ")
            )));
        }

        let valid = !logs.iter().any(Diagnostic::is_error);
        if valid {
            logs.push(Diagnostic::info("No issues found!"));
        }

        tracing::info!(
            domain = self.domain.name(),
            valid,
            diagnostics = logs.len(),
            "validation verdict cached"
        );
        ValidationResult {
            valid,
            logs,
            recognized: self.recognized.clone(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().valid
    }

    /// Log lines coloured by severity, in emission order.
    pub fn coloured_logs(&self) -> Vec<String> {
        self.validate().logs.iter().map(Diagnostic::coloured).collect()
    }

    pub fn instance_summary(&self) -> String {
        self.domain.summary(self.plan.as_ref())
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn recognized(&self) -> &Recognized {
        &self.recognized
    }

    pub fn domain_name(&self) -> &'static str {
        self.domain.name()
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("domain", &self.domain.name())
            .field("facts_len", &self.facts.len())
            .field("recognized_len", &self.recognized.len())
            .field("validated", &self.result.get().is_some())
            .finish()
    }
}

impl std::fmt::Display for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = self.validate();
        let solution: Vec<&str> = self.facts.iter().map(|fact| fact.raw.as_str()).collect();
        let issues: Vec<String> = result.logs.iter().map(ToString::to_string).collect();
        writeln!(f, "Validator[")?;
        writeln!(f, "  domain: {}", self.domain.name())?;
        writeln!(f, "  solution: [{}]", solution.join(", "))?;
        writeln!(f, "  valid: {}", result.valid)?;
        writeln!(f, "  issues: {}", issues.join("\n          "))?;
        write!(f, "]")
    }
}

/// What the harness records for one solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionReport {
    pub instance_summary: String,
    /// A solution is only valid when it is non-empty (if required) and the
    /// validator found no errors.
    pub valid: bool,
    pub logs: Vec<Diagnostic>,
}

impl SolutionReport {
    pub fn from_validator(validator: &Validator, require_solutions: bool) -> Self {
        let result = validator.validate();
        let non_empty = !require_solutions || !validator.facts().is_empty();
        Self {
            instance_summary: validator.instance_summary(),
            valid: non_empty && result.valid,
            logs: result.logs.clone(),
        }
    }

    /// Report for a solution that could not be validated at all.
    pub fn rejected(error: &JudgeError) -> Self {
        Self {
            instance_summary: String::new(),
            valid: false,
            logs: vec![Diagnostic::error(error.to_string())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;

    /// Claims `probe/1` and reports one diagnostic per probe.
    #[derive(Default)]
    struct ProbeDomain {
        probes: Vec<String>,
    }

    impl Domain for ProbeDomain {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn parse_extra(&mut self, fact: &Fact) -> bool {
            if fact.name != "probe" {
                return false;
            }
            self.probes.push(fact.args.clone());
            true
        }

        fn verify(&self, _plan: Option<&Plan>) -> Vec<Diagnostic> {
            self.probes
                .iter()
                .map(|p| match p.as_str() {
                    "error" => Diagnostic::error("probe error"),
                    "warning" => Diagnostic::warning("probe warning"),
                    _ => Diagnostic::info("probe info"),
                })
                .collect()
        }
    }

    fn validator(raw: &[&str]) -> Validator {
        Validator::new(Box::new(ProbeDomain::default()), raw).expect("validator")
    }

    #[test]
    fn warnings_and_infos_keep_the_solution_valid() {
        let v = validator(&["goal(g(1))", "probe(warning)", "probe(info)"]);
        assert!(v.is_valid());
        let last = v.validate().logs.last().expect("trailing info");
        assert_eq!(last, &Diagnostic::info("No issues found!"));
    }

    #[test]
    fn any_error_invalidates() {
        let v = validator(&["goal(g(1))", "probe(warning)", "probe(error)"]);
        assert!(!v.is_valid());
        assert_eq!(v.validate().count(Severity::Info), 0);
    }

    #[test]
    fn validate_is_idempotent() {
        let v = validator(&["goal(g(1))", "foo(bar)", "probe(error)"]);
        let first = v.validate().clone();
        let second = v.validate().clone();
        assert_eq!(first, second);
        assert_eq!(v.coloured_logs().len(), first.logs.len());
    }

    #[test]
    fn unknown_predicates_are_aggregated_after_domain_output() {
        let v = validator(&[
            "zeta(1)",
            "goal(g(1))",
            "foo(bar)",
            "probe(warning)",
            "foo(baz)",
        ]);
        let logs = &v.validate().logs;
        assert_eq!(
            logs,
            &vec![
                Diagnostic::warning("probe warning"),
                Diagnostic::warning("Ignored predicates: [foo, zeta]"),
                Diagnostic::info("No issues found!"),
            ]
        );
    }

    #[test]
    fn malformed_facts_abort_construction() {
        let err = Validator::new(Box::new(ProbeDomain::default()), &["goal(g(1))", "oops"])
            .expect_err("malformed");
        assert!(matches!(err, JudgeError::MalformedFact { .. }));
    }

    #[test]
    fn generic_facts_are_not_offered_to_the_domain() {
        let v = validator(&["goal(g(1))", "time(0)", "probe(info)"]);
        assert!(v.recognized().contains("time(0)"));
        assert!(v.recognized().contains("probe(info)"));
        assert_eq!(v.validate().recognized.len(), 3);
    }

    #[test]
    fn empty_solutions_are_never_reported_valid() {
        struct Bare;
        impl Domain for Bare {
            fn name(&self) -> &'static str {
                "bare"
            }
            fn uses_timeline(&self) -> bool {
                false
            }
            fn parse_extra(&mut self, _fact: &Fact) -> bool {
                false
            }
            fn verify(&self, _plan: Option<&Plan>) -> Vec<Diagnostic> {
                Vec::new()
            }
        }

        let empty: [&str; 0] = [];
        let v = Validator::new(Box::new(Bare), &empty).expect("validator");
        assert!(v.is_valid());
        assert!(!SolutionReport::from_validator(&v, true).valid);
        assert!(SolutionReport::from_validator(&v, false).valid);
    }
}
