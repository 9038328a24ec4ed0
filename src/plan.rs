//! The shared STRIPS layer: agents, the time domain, start/goal literals,
//! fluents, and the time- and agent-indexed action timeline.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::error::{JudgeError, JudgeResult};
use crate::facts::{int, split_predicate, Fact, FactPattern, Field, PatternTable};

/// Name of the synthetic agent used when no `agent/1` is declared.
pub const DEFAULT_AGENT: &str = "defaultAgent";

/// Raw facts consumed by one parsing pass.
pub type Recognized = BTreeSet<String>;

/// A named actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Agent(pub String);

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An action instance: a name plus its raw, unsplit argument text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub args: String,
}

impl Action {
    pub fn new(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: args.into(),
        }
    }

    /// Interprets the action text of an `exec` fact.
    ///
    /// A bare word such as `wait` is an action without arguments. Text that
    /// is neither becomes `(unknown)`.
    pub fn parse(raw: &str) -> Self {
        if let Some((name, args)) = split_predicate(raw) {
            return Self::new(name, args);
        }
        if Field::Word.accepts(raw) {
            return Self::new(raw, "");
        }
        Self::new("(unknown)", "")
    }

    /// Comma separated arguments. Empty when the action has none.
    pub fn arguments(&self) -> Vec<&str> {
        if self.args.is_empty() {
            Vec::new()
        } else {
            self.args.split(',').collect()
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}({})", self.name, self.args)
        }
    }
}

/// Everything scheduled at one time step, keyed by agent.
pub type Step = BTreeMap<Agent, BTreeSet<Action>>;

static NOTHING_HOLDS: BTreeSet<String> = BTreeSet::new();

/// Records produced by the generic STRIPS pattern table.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StripsFact {
    Agent(String),
    Time(u32),
    Fluent(String),
    FluentDropped(String),
    Schema(String),
    Condition,
    Start(String),
    Goal(String),
    Exec {
        time: u32,
        agent: Option<String>,
        action: String,
    },
    Holds {
        time: u32,
        fluent: String,
    },
}

static STRIPS_PATTERNS: [FactPattern<StripsFact>; 14] = [
    FactPattern::new("agent", &[Field::Any], |v| match v {
        [agent] => Some(StripsFact::Agent(agent.to_string())),
        _ => None,
    }),
    FactPattern::new("time", &[Field::Int], |v| match v {
        [t] => Some(StripsFact::Time(int(t)?)),
        _ => None,
    }),
    FactPattern::new("fluent", &[Field::Any], |v| match v {
        [f] => Some(StripsFact::Fluent(f.to_string())),
        _ => None,
    }),
    FactPattern::new("fluent_dropped", &[Field::Any], |v| match v {
        [f] => Some(StripsFact::FluentDropped(f.to_string())),
        _ => None,
    }),
    FactPattern::new("action", &[Field::Any], |v| match v {
        [a] => Some(StripsFact::Schema(a.to_string())),
        _ => None,
    }),
    FactPattern::new("action_ppre", &[Field::Any], |_| Some(StripsFact::Condition)),
    FactPattern::new("action_npre", &[Field::Any], |_| Some(StripsFact::Condition)),
    FactPattern::new("action_add", &[Field::Any], |_| Some(StripsFact::Condition)),
    FactPattern::new("action_del", &[Field::Any], |_| Some(StripsFact::Condition)),
    FactPattern::new("start", &[Field::Any], |v| match v {
        [f] => Some(StripsFact::Start(f.to_string())),
        _ => None,
    }),
    FactPattern::new("goal", &[Field::Any], |v| match v {
        [f] => Some(StripsFact::Goal(f.to_string())),
        _ => None,
    }),
    FactPattern::new("exec", &[Field::Int, Field::Word, Field::Any], |v| match v {
        [t, agent, action] => Some(StripsFact::Exec {
            time: int(t)?,
            agent: Some(agent.to_string()),
            action: action.to_string(),
        }),
        _ => None,
    }),
    FactPattern::new("exec", &[Field::Int, Field::Any], |v| match v {
        [t, action] => Some(StripsFact::Exec {
            time: int(t)?,
            agent: None,
            action: action.to_string(),
        }),
        _ => None,
    }),
    FactPattern::new("holds", &[Field::Int, Field::Any], |v| match v {
        [t, f] => Some(StripsFact::Holds {
            time: int(t)?,
            fluent: f.to_string(),
        }),
        _ => None,
    }),
];

static STRIPS_TABLE: PatternTable<StripsFact> = PatternTable::new(&STRIPS_PATTERNS);

/// The structured plan built from one solution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub agents: BTreeSet<Agent>,
    /// True when no `agent/1` was declared and [`DEFAULT_AGENT`] was installed.
    pub single_agent: bool,
    /// Times declared through `time/1`.
    pub declared_times: BTreeSet<u32>,
    /// Steps keyed by time. Every declared time has an entry, as does every
    /// time an `exec` names; times in between are empty and not stored.
    pub timeline: BTreeMap<u32, Step>,
    /// Fluents holding at each time up to `max_time + 1`. Only times with a
    /// `holds` fact are stored.
    pub holds: BTreeMap<u32, BTreeSet<String>>,
    pub fluents: BTreeSet<String>,
    pub dropped_fluents: BTreeSet<String>,
    pub action_schemas: BTreeSet<String>,
    pub start: Vec<String>,
    pub goal: Vec<String>,
}

impl Plan {
    /// Last time step that can host actions.
    pub fn max_time(&self) -> Option<u32> {
        self.timeline.keys().next_back().copied()
    }

    /// Last time a `holds` snapshot may address: one past `max_time`.
    pub fn snapshot_time(&self) -> u32 {
        self.max_time().map_or(0, |t| t.saturating_add(1))
    }

    /// Stored time steps in order, paired with their schedule.
    pub fn steps(&self) -> impl Iterator<Item = (u32, &Step)> {
        self.timeline.iter().map(|(&t, step)| (t, step))
    }

    pub fn action_count(&self) -> usize {
        self.timeline
            .values()
            .flat_map(|step| step.values())
            .map(BTreeSet::len)
            .sum()
    }

    /// Fluents holding at `time`; `None` past the terminal snapshot.
    pub fn holds_at(&self, time: u32) -> Option<&BTreeSet<String>> {
        if time > self.snapshot_time() {
            return None;
        }
        Some(self.holds.get(&time).unwrap_or(&NOTHING_HOLDS))
    }

    /// Checks shared by every domain that replays a timeline.
    pub fn generic_checks(&self) -> Vec<Diagnostic> {
        let mut logs = Vec::new();
        if self.declared_times.is_empty() {
            logs.push(Diagnostic::warning("No time defined!"));
        }
        if self.action_count() == 0 {
            logs.push(Diagnostic::warning(
                "Empty plan, no actions executed (`exec` is empty).",
            ));
        }
        logs
    }

    /// Human readable timeline, one `t: {agent: {actions}}` entry per step.
    pub fn summary(&self, sep: &str) -> String {
        let steps: Vec<String> = self
            .steps()
            .map(|(t, step)| {
                let agents: Vec<String> = step
                    .iter()
                    .map(|(agent, actions)| {
                        let actions: Vec<String> =
                            actions.iter().map(ToString::to_string).collect();
                        format!("{agent}: {{{}}}", actions.join(", "))
                    })
                    .collect();
                format!("{t}: {{{}}}", agents.join(", "))
            })
            .collect();
        format!("Plan: [{}]", steps.join(sep))
    }

    fn step_mut(&mut self, time: u32) -> &mut Step {
        let agents = &self.agents;
        self.timeline.entry(time).or_insert_with(|| {
            agents
                .iter()
                .map(|agent| (agent.clone(), BTreeSet::new()))
                .collect()
        })
    }
}

/// A built plan together with every raw fact the builder consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPlan {
    pub plan: Plan,
    pub recognized: Recognized,
}

/// Result of the first pass: who acts, and over which declared times.
#[derive(Debug, Clone, Default)]
struct Declarations {
    agents: BTreeSet<Agent>,
    single_agent: bool,
    times: BTreeSet<u32>,
    consumed: Recognized,
}

/// Builds a [`Plan`] in two ordered passes over a fact set.
pub struct PlanBuilder;

impl PlanBuilder {
    pub fn build(facts: &[Fact]) -> JudgeResult<BuiltPlan> {
        let declarations = Self::declarations(facts);
        let (plan, consumed) = Self::schedule(facts, &declarations)?;

        let mut recognized = declarations.consumed;
        recognized.extend(consumed);

        tracing::debug!(
            agents = plan.agents.len(),
            steps = plan.timeline.len(),
            recognized = recognized.len(),
            "plan built"
        );
        Ok(BuiltPlan { plan, recognized })
    }

    /// First pass: agents and the declared time domain.
    fn declarations(facts: &[Fact]) -> Declarations {
        let mut out = Declarations::default();
        for fact in facts {
            match STRIPS_TABLE.recognize(fact) {
                Some(StripsFact::Agent(name)) => {
                    out.agents.insert(Agent(name));
                }
                Some(StripsFact::Time(t)) => {
                    out.times.insert(t);
                }
                _ => continue,
            }
            out.consumed.insert(fact.raw.clone());
        }

        if out.agents.is_empty() {
            out.agents.insert(Agent::new(DEFAULT_AGENT));
            out.single_agent = true;
        }
        out
    }

    /// Second pass: everything else, keyed on what the first pass found.
    fn schedule(facts: &[Fact], declarations: &Declarations) -> JudgeResult<(Plan, Recognized)> {
        let mut plan = Plan {
            agents: declarations.agents.clone(),
            single_agent: declarations.single_agent,
            declared_times: declarations.times.clone(),
            ..Plan::default()
        };
        for &time in &declarations.times {
            plan.step_mut(time);
        }

        let mut consumed = Recognized::new();
        // The terminal snapshot time is only known once every exec is placed.
        let mut snapshots: Vec<(u32, String, &str)> = Vec::new();
        for fact in facts {
            let Some(record) = STRIPS_TABLE.recognize(fact) else {
                continue;
            };
            match record {
                StripsFact::Agent(_) | StripsFact::Time(_) | StripsFact::Condition => {}
                StripsFact::Fluent(f) => {
                    plan.fluents.insert(f);
                }
                StripsFact::FluentDropped(f) => {
                    plan.dropped_fluents.insert(f);
                }
                StripsFact::Schema(a) => {
                    plan.action_schemas.insert(a);
                }
                StripsFact::Start(f) => plan.start.push(f),
                StripsFact::Goal(f) => plan.goal.push(f),
                StripsFact::Exec {
                    time,
                    agent,
                    action,
                } => {
                    let agent = match agent {
                        Some(name) => {
                            let agent = Agent(name);
                            if !plan.agents.contains(&agent) {
                                return Err(JudgeError::UnknownAgent {
                                    agent: agent.0,
                                    fact: fact.raw.clone(),
                                });
                            }
                            agent
                        }
                        None => Agent::new(DEFAULT_AGENT),
                    };
                    plan.step_mut(time)
                        .entry(agent)
                        .or_default()
                        .insert(Action::parse(&action));
                }
                StripsFact::Holds { time, fluent } => {
                    snapshots.push((time, fluent, fact.raw.as_str()));
                    continue;
                }
            }
            consumed.insert(fact.raw.clone());
        }

        if plan.goal.is_empty() {
            return Err(JudgeError::NoGoal);
        }

        let last = plan.snapshot_time();
        for (time, fluent, raw) in snapshots {
            if time > last {
                tracing::debug!(time, last, fact = raw, "holds past the terminal snapshot");
                continue;
            }
            plan.holds.entry(time).or_default().insert(fluent);
            consumed.insert(raw.to_string());
        }
        Ok((plan, consumed))
    }
}
