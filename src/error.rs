//! Fatal, structural errors.
//!
//! These abort construction of a validator and point at a broken instance or
//! encoding, never at a bad plan. Plan defects are reported as
//! [`Diagnostic`](crate::Diagnostic)s instead.

/// Errors that prevent a solution from being validated at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JudgeError {
    #[error("can't parse name for predicate '{fact}'")]
    MalformedFact { fact: String },

    #[error("no goal defined, is `goal/1` hidden by `#show`?")]
    NoGoal,

    #[error("fact '{fact}' schedules an action for undeclared agent '{agent}'")]
    UnknownAgent { agent: String, fact: String },
}

pub type JudgeResult<T> = Result<T, JudgeError>;
