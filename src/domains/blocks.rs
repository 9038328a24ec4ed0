//! Blocks world: arms move blocks between stacks and the table.
//!
//! Every step is checked against the stacking as it stood when the step
//! began, then all of the step's moves are applied, even unsafe ones, so a
//! single pass reports every violation along the timeline.

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::Diagnostic;
use crate::facts::{Fact, FactPattern, Field, PatternTable};
use crate::plan::{Action, Agent, Plan, Step};
use crate::validator::Domain;

/// The unbounded surface every stack rests on.
pub const TABLE: &str = "table";

/// `on[block] = support`; each block rests on exactly one thing.
pub type Stacking = BTreeMap<String, String>;

enum BlocksFact {
    Arm(String),
    Block(String),
}

static BLOCKS_PATTERNS: [FactPattern<BlocksFact>; 2] = [
    FactPattern::new("arm", &[Field::Any], |v| match v {
        [name] => Some(BlocksFact::Arm(name.to_string())),
        _ => None,
    }),
    FactPattern::new("block", &[Field::Any], |v| match v {
        [name] => Some(BlocksFact::Block(name.to_string())),
        _ => None,
    }),
];

static BLOCKS_TABLE: PatternTable<BlocksFact> = PatternTable::new(&BLOCKS_PATTERNS);

static ON: FactPattern<(String, String)> =
    FactPattern::new("on", &[Field::Word, Field::Word], |v| match v {
        [block, support] => Some((block.to_string(), support.to_string())),
        _ => None,
    });

/// How a scheduled action reads as a move.
#[derive(Debug, PartialEq, Eq)]
enum MoveShape<'a> {
    Move { src: &'a str, dst: &'a str },
    Extended,
    Unparseable,
}

fn interpret(action: &Action) -> MoveShape<'_> {
    if action.name != "move" {
        return MoveShape::Unparseable;
    }
    match action.arguments().as_slice() {
        &[src, dst] => MoveShape::Move { src, dst },
        args if args.len() > 2 => MoveShape::Extended,
        _ => MoveShape::Unparseable,
    }
}

/// The block directly on top of `target`, if any. Nothing is ever "on" the
/// table in this sense.
fn over<'a>(target: &str, on: &'a Stacking) -> Option<&'a str> {
    if target == TABLE {
        return None;
    }
    on.iter()
        .find(|(_, support)| support.as_str() == target)
        .map(|(block, _)| block.as_str())
}

fn check_safe_move(
    t: u32,
    arm: &Agent,
    src: &str,
    dst: &str,
    on: &Stacking,
    logs: &mut Vec<Diagnostic>,
) {
    if let Some(blocking) = over(src, on) {
        logs.push(Diagnostic::error(format!(
            "Arm '{arm}' is executing move({src}, {dst}), but at t={t} {blocking} is blocking {src}."
        )));
    }

    if dst == TABLE {
        return;
    }

    if let Some(blocking) = over(dst, on) {
        logs.push(Diagnostic::error(format!(
            "Arm '{arm}' is executing move({src}, {dst}), but at t={t} {blocking} is blocking {dst}."
        )));
    }
}

/// Final stacking and diagnostics of one replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub on: Stacking,
    pub logs: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default)]
pub struct BlocksWorld {
    pub arms: BTreeSet<String>,
    pub blocks: BTreeSet<String>,
}

impl BlocksWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial stacking from `on(a,b)` start literals.
    pub fn initial_stacking(plan: &Plan) -> Stacking {
        plan.start
            .iter()
            .filter_map(|literal| Fact::parse(literal).ok())
            .filter_map(|fact| ON.apply(&fact))
            .collect()
    }

    pub fn replay(&self, plan: &Plan) -> Replay {
        let mut logs = plan.generic_checks();
        let mut on = Self::initial_stacking(plan);
        for (t, step) in plan.steps() {
            Self::replay_step(t, step, &mut on, &mut logs);
        }
        Replay { on, logs }
    }

    fn replay_step(t: u32, step: &Step, on: &mut Stacking, logs: &mut Vec<Diagnostic>) {
        let mut moves: Vec<(&str, &str)> = Vec::new();

        for (arm, actions) in step {
            if actions.len() > 1 {
                let listed: Vec<String> = actions.iter().map(ToString::to_string).collect();
                logs.push(Diagnostic::warning(format!(
                    "Arm '{arm}' is executing multiple actions at t={t}: [{}]",
                    listed.join(", ")
                )));
            }

            for action in actions {
                match interpret(action) {
                    MoveShape::Move { src, dst } => {
                        check_safe_move(t, arm, src, dst, on, logs);
                        moves.push((src, dst));
                    }
                    MoveShape::Extended => logs.push(Diagnostic::info(format!(
                        "Arm '{arm}' is executing {action} at t={t}, but only move/2 can be verified."
                    ))),
                    MoveShape::Unparseable => logs.push(Diagnostic::warning(format!(
                        "`move/2` should be the only action. Can't parse '{action}'"
                    ))),
                }
            }
        }

        // Independence of the step's moves: one claimant per destination.
        let mut claimed: BTreeMap<&str, &str> = BTreeMap::new();
        let mut conflicts = Vec::new();
        for &(src, dst) in &moves {
            match claimed.get(dst) {
                Some(first) => conflicts.push(Diagnostic::error(format!(
                    "Executing conflicting actions move({src}, {dst}) and move({first}, {dst}) at t={t}."
                ))),
                None => {
                    claimed.insert(dst, src);
                }
            }
        }
        if !conflicts.is_empty() {
            logs.push(Diagnostic::error(format!("There are conflicts at t={t}.")));
            logs.extend(conflicts);
        }

        for (src, dst) in moves {
            on.insert(src.to_string(), dst.to_string());
        }
    }
}

impl Domain for BlocksWorld {
    fn name(&self) -> &'static str {
        "blocks"
    }

    fn parse_extra(&mut self, fact: &Fact) -> bool {
        match BLOCKS_TABLE.recognize(fact) {
            Some(BlocksFact::Arm(name)) => {
                self.arms.insert(name);
            }
            Some(BlocksFact::Block(name)) => {
                self.blocks.insert(name);
            }
            None => return false,
        }
        true
    }

    fn verify(&self, plan: Option<&Plan>) -> Vec<Diagnostic> {
        plan.map(|plan| self.replay(plan).logs).unwrap_or_default()
    }
}
