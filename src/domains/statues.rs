//! Statues (red light, green light): a single walker advances one cell per
//! `move` and must stand still whenever the light is red.

use std::collections::BTreeSet;

use crate::diagnostics::Diagnostic;
use crate::facts::{int, Fact, FactPattern, Field, PatternTable};
use crate::plan::Plan;
use crate::validator::Domain;

enum StatuesFact {
    Red(u32),
    Coordinate(u32),
}

static STATUES_PATTERNS: [FactPattern<StatuesFact>; 2] = [
    FactPattern::new("isRed", &[Field::Int], |v| match v {
        [t] => Some(StatuesFact::Red(int(t)?)),
        _ => None,
    }),
    FactPattern::new("x", &[Field::Int], |v| match v {
        [x] => Some(StatuesFact::Coordinate(int(x)?)),
        _ => None,
    }),
];

static STATUES_TABLE: PatternTable<StatuesFact> = PatternTable::new(&STATUES_PATTERNS);

static AT: FactPattern<i64> = FactPattern::new("at", &[Field::Int], |v| match v {
    [x] => int(x),
    _ => None,
});

/// Last `at(x)` among a list of literals.
fn position(literals: &[String]) -> Option<i64> {
    literals
        .iter()
        .filter_map(|literal| Fact::parse(literal).ok())
        .filter_map(|fact| AT.apply(&fact))
        .last()
}

/// The timeline read as a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Walk {
    pub start: Option<i64>,
    pub goal: Option<i64>,
    /// Times at which a `move` is scheduled.
    pub steps: Vec<u32>,
    /// Times at which a `wait`/`stay` is scheduled.
    pub pauses: Vec<u32>,
    pub unexpected: BTreeSet<String>,
}

impl Walk {
    /// Every step advances by exactly one cell. `None` without a start or
    /// when the walk runs past `i64::MAX`.
    pub fn final_position(&self) -> Option<i64> {
        let steps = i64::try_from(self.steps.len()).ok()?;
        self.start?.checked_add(steps)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Statues {
    pub red_lights: BTreeSet<u32>,
    pub coordinates: BTreeSet<u32>,
}

impl Statues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn walk(&self, plan: &Plan) -> Walk {
        let mut walk = Walk {
            start: position(&plan.start),
            goal: position(&plan.goal),
            ..Walk::default()
        };
        for (t, step) in plan.steps() {
            for action in step.values().flatten() {
                match action.name.as_str() {
                    "move" => walk.steps.push(t),
                    "wait" | "stay" => walk.pauses.push(t),
                    other => {
                        walk.unexpected.insert(other.to_string());
                    }
                }
            }
        }
        walk
    }

    fn check(&self, plan: &Plan) -> Vec<Diagnostic> {
        let mut logs = Vec::new();
        let walk = self.walk(plan);

        if !walk.unexpected.is_empty() {
            let names: Vec<&str> = walk.unexpected.iter().map(String::as_str).collect();
            logs.push(Diagnostic::warning(format!(
                "Got unexpected actions: [{}]",
                names.join(", ")
            )));
        }
        if plan.start.len() > 1 {
            logs.push(Diagnostic::warning("Multiple starting positions may be defined."));
        }
        if plan.goal.len() > 1 {
            logs.push(Diagnostic::warning("Multiple goal positions may be defined."));
        }
        if plan.agents.len() != 1 {
            logs.push(Diagnostic::error("Multiple agents defined."));
        }

        let positions = match (walk.start, walk.goal) {
            (Some(start), Some(goal)) => Some((start, goal)),
            (start, goal) => {
                if start.is_none() {
                    logs.push(Diagnostic::error("No starting position `at(x)` defined."));
                }
                if goal.is_none() {
                    logs.push(Diagnostic::error("No goal position `at(x)` defined."));
                }
                None
            }
        };

        if let Some((start, goal)) = positions {
            if start != 0 {
                logs.push(Diagnostic::warning("Start position does not start at 0!"));
            }
            if start > goal {
                logs.push(Diagnostic::warning(
                    "Start position is to the right of the goal position.",
                ));
            }
            if start == goal {
                // Degenerate instance: nothing to replay.
                logs.push(Diagnostic::error(
                    "Start position is the same as the end position.",
                ));
                return logs;
            }
        }

        for (t, step) in plan.steps() {
            let actions: Vec<String> = step.values().flatten().map(ToString::to_string).collect();
            if actions.len() > 1 {
                logs.push(Diagnostic::error(format!(
                    "Multiple actions executed at time {t}: [{}]",
                    actions.join(", ")
                )));
            }
        }

        for t in walk.steps.iter().filter(|&&t| self.red_lights.contains(&t)) {
            logs.push(Diagnostic::error(format!(
                "At time={t} the light is red, but a `move` was planned."
            )));
        }

        if walk.steps.is_empty() {
            logs.push(Diagnostic::warning("No steps taken. Is there something wrong?"));
        }

        let Some((start, goal)) = positions else {
            return logs;
        };
        match walk.final_position() {
            Some(reached) if reached != goal => logs.push(Diagnostic::error(format!(
                "Goal position was {goal}, but got to {reached} instead."
            ))),
            Some(_) => {}
            None => logs.push(Diagnostic::error(format!(
                "Walking {} steps from {start} overflows the position.",
                walk.steps.len()
            ))),
        }

        logs
    }
}

impl Domain for Statues {
    fn name(&self) -> &'static str {
        "statues"
    }

    fn parse_extra(&mut self, fact: &Fact) -> bool {
        match STATUES_TABLE.recognize(fact) {
            Some(StatuesFact::Red(t)) => {
                self.red_lights.insert(t);
            }
            Some(StatuesFact::Coordinate(x)) => {
                self.coordinates.insert(x);
            }
            None => return false,
        }
        true
    }

    fn verify(&self, plan: Option<&Plan>) -> Vec<Diagnostic> {
        plan.map(|plan| self.check(plan)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::validator::Validator;

    const WALK_TO_THREE: &[&str] = &[
        "time(0)",
        "time(1)",
        "time(2)",
        "x(0)",
        "x(1)",
        "x(2)",
        "x(3)",
        "start(at(0))",
        "goal(at(3))",
        "exec(0,move(1))",
        "exec(1,move(2))",
        "exec(2,move(3))",
    ];

    fn validator(raw: &[&str]) -> Validator {
        Validator::new(Box::new(Statues::new()), raw).expect("validator")
    }

    fn with(extra: &[&'static str]) -> Vec<&'static str> {
        let mut raw = WALK_TO_THREE.to_vec();
        raw.extend_from_slice(extra);
        raw
    }

    fn errors(v: &Validator) -> Vec<String> {
        v.validate().errors().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn reaching_the_goal_on_green_is_valid() {
        let v = validator(WALK_TO_THREE);
        assert!(v.is_valid(), "{:?}", v.validate().logs);
        let walk = Statues::new().walk(v.plan().expect("plan"));
        assert_eq!(walk.final_position(), Some(3));
        assert_eq!(walk.steps, vec![0, 1, 2]);
    }

    #[test]
    fn moving_on_red_is_an_error() {
        let v = validator(&with(&["isRed(1)"]));
        assert_eq!(
            errors(&v),
            vec!["At time=1 the light is red, but a `move` was planned."]
        );
    }

    #[test]
    fn start_equal_to_goal_is_a_single_error() {
        let v = validator(&[
            "time(0)",
            "time(1)",
            "start(at(0))",
            "goal(at(0))",
            "exec(0,move(1))",
            "exec(1,move(2))",
        ]);
        assert_eq!(
            errors(&v),
            vec!["Start position is the same as the end position."]
        );
    }

    #[test]
    fn falling_short_reports_both_positions() {
        let v = validator(&[
            "time(0)",
            "time(1)",
            "start(at(0))",
            "goal(at(3))",
            "exec(0,move(1))",
            "exec(1,wait)",
        ]);
        assert_eq!(
            errors(&v),
            vec!["Goal position was 3, but got to 1 instead."]
        );
    }

    #[test]
    fn simultaneous_actions_are_an_error() {
        let v = validator(&with(&["exec(1,wait)"]));
        assert_eq!(
            errors(&v),
            vec!["Multiple actions executed at time 1: [move(2), wait]"]
        );
    }

    #[test]
    fn unexpected_actions_are_reported_once() {
        let v = validator(&with(&["time(3)", "time(4)", "exec(3,jump(1))", "exec(4,jump(2))"]));
        let warnings: Vec<&Diagnostic> = v
            .validate()
            .logs
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect();
        assert_eq!(
            warnings,
            vec![&Diagnostic::warning("Got unexpected actions: [jump]")]
        );
        assert!(v.is_valid());
    }

    #[test]
    fn standing_still_only_warns_before_the_mismatch() {
        let v = validator(&["time(0)", "start(at(0))", "goal(at(2))", "exec(0,stay)"]);
        let logs = &v.validate().logs;
        assert!(logs.contains(&Diagnostic::warning("No steps taken. Is there something wrong?")));
        assert_eq!(errors(&v), vec!["Goal position was 2, but got to 0 instead."]);
    }

    #[test]
    fn odd_instances_warn() {
        let v = validator(&[
            "time(0)",
            "start(at(4))",
            "goal(at(2))",
            "goal(at(2))",
            "exec(0,move(5))",
        ]);
        let logs = &v.validate().logs;
        assert!(logs.contains(&Diagnostic::warning("Start position does not start at 0!")));
        assert!(logs.contains(&Diagnostic::warning(
            "Start position is to the right of the goal position."
        )));
        assert!(logs.contains(&Diagnostic::warning("Multiple goal positions may be defined.")));
        assert_eq!(errors(&v), vec!["Goal position was 2, but got to 5 instead."]);
    }

    #[test]
    fn more_than_one_agent_is_an_error() {
        let v = validator(&[
            "agent(a)",
            "agent(b)",
            "time(0)",
            "start(at(0))",
            "goal(at(1))",
            "exec(0,a,move(1))",
        ]);
        assert_eq!(errors(&v), vec!["Multiple agents defined."]);
    }

    #[test]
    fn missing_positions_are_errors() {
        let v = validator(&["time(0)", "goal(reach(3))", "exec(0,move(1))"]);
        assert_eq!(
            errors(&v),
            vec![
                "No starting position `at(x)` defined.",
                "No goal position `at(x)` defined.",
            ]
        );
    }

    #[test]
    fn duplicate_starts_warn_and_the_last_one_counts() {
        let v = validator(&[
            "time(0)",
            "start(at(0))",
            "start(at(1))",
            "goal(at(2))",
            "exec(0,move(2))",
        ]);
        let logs = &v.validate().logs;
        assert!(logs.contains(&Diagnostic::warning("Multiple starting positions may be defined.")));
        assert!(logs.contains(&Diagnostic::warning("Start position does not start at 0!")));
        assert!(v.is_valid(), "{logs:?}");
    }

    #[test]
    fn missing_start_still_checks_the_lights() {
        let v = validator(&["time(0)", "goal(at(1))", "isRed(0)", "exec(0,move(1))"]);
        assert_eq!(
            errors(&v),
            vec![
                "No starting position `at(x)` defined.",
                "At time=0 the light is red, but a `move` was planned.",
            ]
        );
        let logs = &v.validate().logs;
        assert!(!logs.contains(&Diagnostic::warning("Multiple starting positions may be defined.")));
        assert!(!logs.contains(&Diagnostic::warning("Multiple goal positions may be defined.")));
    }

    #[test]
    fn walking_past_the_largest_position_is_an_error() {
        let v = validator(&[
            "time(0)",
            "start(at(9223372036854775807))",
            "goal(at(0))",
            "exec(0,move(1))",
        ]);
        assert_eq!(
            errors(&v),
            vec!["Walking 1 steps from 9223372036854775807 overflows the position."]
        );
        let walk = Statues::new().walk(v.plan().expect("plan"));
        assert_eq!(walk.final_position(), None);
    }
}
