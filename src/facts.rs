//! Flat textual facts and the declarative tables that recognise them.
//!
//! A fact is `name(arg1,arg2,...)`. Arguments are comma separated with no
//! support for quoting or nesting, except that the *last* field of a pattern
//! swallows the remainder of the argument list. That is what lets
//! `exec(0,move(a,b))` carry a whole action as its final field.
//!
//! Recognition is table driven: a [`PatternTable`] is an ordered list of
//! [`FactPattern`]s and the first entry that accepts a fact claims it.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{JudgeError, JudgeResult};

static PREDICATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?P<name>\w+)\((?P<args>.*)\)$").ok());

/// Splits `name(args)` into its two halves.
///
/// Returns `None` when the text does not have the general predicate shape.
pub fn split_predicate(text: &str) -> Option<(&str, &str)> {
    let caps = PREDICATE.as_ref()?.captures(text)?;
    let name = caps.name("name")?.as_str();
    let args = caps.name("args")?.as_str();
    Some((name, args))
}

/// One raw fact, split into predicate name and unsplit argument text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fact {
    pub raw: String,
    pub name: String,
    pub args: String,
}

impl Fact {
    /// Parses the general shape of a fact.
    ///
    /// Anything that is not even `name(args)` is malformed input, not an
    /// unexpected predicate, so it is rejected here.
    pub fn parse(raw: &str) -> JudgeResult<Self> {
        let (name, args) = split_predicate(raw).ok_or_else(|| JudgeError::MalformedFact {
            fact: raw.to_string(),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            name: name.to_string(),
            args: args.to_string(),
        })
    }

    /// Parses every fact of a solution, failing on the first malformed one.
    pub fn parse_all<S: AsRef<str>>(solution: &[S]) -> JudgeResult<Vec<Self>> {
        solution.iter().map(|raw| Self::parse(raw.as_ref())).collect()
    }
}

impl std::fmt::Display for Fact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Shape of one argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// One or more ASCII digits.
    Int,
    /// One or more word characters (letters, digits, underscore).
    Word,
    /// Anything, including the empty string.
    Any,
}

impl Field {
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Field::Int => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            Field::Word => {
                !value.is_empty() && value.chars().all(|c| c.is_alphanumeric() || c == '_')
            }
            Field::Any => true,
        }
    }
}

/// Splits an argument list according to `fields`.
///
/// Every field but the last stops at the next comma; the last one takes the
/// rest of the text.
pub fn split_fields<'a>(args: &'a str, fields: &[Field]) -> Option<Vec<&'a str>> {
    if fields.is_empty() {
        return args.is_empty().then(Vec::new);
    }

    let mut values = Vec::with_capacity(fields.len());
    let mut rest = args;
    for (i, field) in fields.iter().enumerate() {
        let value = if i + 1 == fields.len() {
            rest
        } else {
            let (head, tail) = rest.split_once(',')?;
            rest = tail;
            head
        };
        if !field.accepts(value) {
            return None;
        }
        values.push(value);
    }
    Some(values)
}

/// Parses a numeric field, refusing values that overflow `N`.
pub fn int<N: FromStr>(value: &str) -> Option<N> {
    value.parse().ok()
}

/// A named field extractor: predicate name, argument shape, and the function
/// that turns the split arguments into a typed record.
pub struct FactPattern<T> {
    pub name: &'static str,
    pub fields: &'static [Field],
    pub extract: fn(&[&str]) -> Option<T>,
}

impl<T> FactPattern<T> {
    pub const fn new(
        name: &'static str,
        fields: &'static [Field],
        extract: fn(&[&str]) -> Option<T>,
    ) -> Self {
        Self {
            name,
            fields,
            extract,
        }
    }

    /// Returns the typed record when this pattern accepts `fact`.
    pub fn apply(&self, fact: &Fact) -> Option<T> {
        if fact.name != self.name {
            return None;
        }
        let values = split_fields(&fact.args, self.fields)?;
        (self.extract)(&values)
    }
}

/// An ordered, first-match-wins list of patterns.
pub struct PatternTable<T: 'static> {
    entries: &'static [FactPattern<T>],
}

impl<T: 'static> PatternTable<T> {
    pub const fn new(entries: &'static [FactPattern<T>]) -> Self {
        Self { entries }
    }

    /// Runs the table against `fact` and returns the first record produced.
    pub fn recognize(&self, fact: &Fact) -> Option<T> {
        self.entries.iter().find_map(|pattern| pattern.apply(fact))
    }

    /// Index of the entry that claims `fact`, if any.
    pub fn claimant(&self, fact: &Fact) -> Option<usize> {
        self.entries
            .iter()
            .position(|pattern| pattern.apply(fact).is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
