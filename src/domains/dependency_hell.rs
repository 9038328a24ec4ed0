//! Dependency hell: decide which library versions to delete and install so
//! that every wanted program finds a compatible version of each dependency.
//!
//! This domain is single shot. Prescribed deletions are applied, then
//! prescribed installs, and the resulting installation is checked once.

use std::collections::BTreeSet;

use crate::diagnostics::Diagnostic;
use crate::facts::{int, Fact, FactPattern, Field, PatternTable};
use crate::plan::Plan;
use crate::validator::Domain;

/// One installable library version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Library {
    pub name: String,
    pub version: i64,
}

impl Library {
    pub fn new(name: impl Into<String>, version: i64) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl std::fmt::Display for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.so.{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundKind {
    /// `requiresAtLeast`: raises the low end of the window.
    Lower,
    /// `requiresAtMost`: lowers the high end of the window.
    Upper,
}

/// A version constraint a program places on a library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bound {
    pub program: String,
    pub library: String,
    pub kind: BoundKind,
    pub version: i64,
}

/// Inclusive version range `[low, high]`. Only ever narrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub low: i64,
    pub high: i64,
}

impl Window {
    pub fn narrow(&mut self, bound: &Bound) {
        match bound.kind {
            BoundKind::Lower => self.low = self.low.max(bound.version),
            BoundKind::Upper => self.high = self.high.min(bound.version),
        }
    }

    pub fn contains(&self, version: i64) -> bool {
        self.low <= version && version <= self.high
    }
}

enum DependencyFact {
    Program(String),
    Version(Library),
    Bound(Bound),
    Installed(Library),
    ShouldDelete(Library),
    ShouldInstall(Library),
    Wants(String),
}

fn library(v: &[&str]) -> Option<Library> {
    match v {
        [name, version] => Some(Library::new(*name, int(version)?)),
        _ => None,
    }
}

fn bound(kind: BoundKind, v: &[&str]) -> Option<Bound> {
    match v {
        [program, library, version] => Some(Bound {
            program: program.to_string(),
            library: library.to_string(),
            kind,
            version: int(version)?,
        }),
        _ => None,
    }
}

const LIBRARY_FIELDS: &[Field] = &[Field::Any, Field::Int];
const BOUND_FIELDS: &[Field] = &[Field::Any, Field::Any, Field::Int];

static DEPENDENCY_PATTERNS: [FactPattern<DependencyFact>; 8] = [
    FactPattern::new("program", &[Field::Any], |v| match v {
        [p] => Some(DependencyFact::Program(p.to_string())),
        _ => None,
    }),
    FactPattern::new("version", LIBRARY_FIELDS, |v| {
        library(v).map(DependencyFact::Version)
    }),
    FactPattern::new("requiresAtLeast", BOUND_FIELDS, |v| {
        bound(BoundKind::Lower, v).map(DependencyFact::Bound)
    }),
    FactPattern::new("requiresAtMost", BOUND_FIELDS, |v| {
        bound(BoundKind::Upper, v).map(DependencyFact::Bound)
    }),
    FactPattern::new("installed", LIBRARY_FIELDS, |v| {
        library(v).map(DependencyFact::Installed)
    }),
    FactPattern::new("shouldDelete", LIBRARY_FIELDS, |v| {
        library(v).map(DependencyFact::ShouldDelete)
    }),
    FactPattern::new("shouldInstall", LIBRARY_FIELDS, |v| {
        library(v).map(DependencyFact::ShouldInstall)
    }),
    FactPattern::new("wants", &[Field::Any], |v| match v {
        [p] => Some(DependencyFact::Wants(p.to_string())),
        _ => None,
    }),
];

static DEPENDENCY_TABLE: PatternTable<DependencyFact> = PatternTable::new(&DEPENDENCY_PATTERNS);

fn list<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default)]
pub struct DependencyHell {
    pub programs: BTreeSet<String>,
    pub libraries: BTreeSet<String>,
    pub lib_versions: BTreeSet<Library>,
    pub installed: BTreeSet<Library>,
    pub bounds: BTreeSet<Bound>,
    /// Programs the user wants to run.
    pub desired: BTreeSet<String>,
    pub should_delete: BTreeSet<Library>,
    pub should_install: BTreeSet<Library>,
}

impl DependencyHell {
    pub fn new() -> Self {
        Self::default()
    }

    fn bounds_of<'a>(&'a self, program: &'a str) -> impl Iterator<Item = &'a Bound> + 'a {
        self.bounds.iter().filter(move |b| b.program == program)
    }

    /// Installation after applying deletions, then installs.
    pub fn apply_changes(&self, logs: &mut Vec<Diagnostic>) -> BTreeSet<Library> {
        let mut installed = self.installed.clone();

        for lib in &self.should_delete {
            if !installed.remove(lib) {
                logs.push(Diagnostic::error(format!(
                    "Asked to delete lib {lib}, but it's not installed."
                )));
            }
        }

        for lib in &self.should_install {
            if !installed.insert(lib.clone()) {
                logs.push(Diagnostic::warning(format!(
                    "Asked to install lib {lib}, but it's already installed. This is odd, but allowed."
                )));
            }
        }

        installed
    }

    /// Feasible window for `program`'s use of `library`, starting from the
    /// installed range and narrowed by every matching bound.
    pub fn window(&self, program: &str, library: &str, available: &[i64]) -> Option<Window> {
        let mut window = Window {
            low: *available.iter().min()?,
            high: *available.iter().max()?,
        };
        for bound in self.bounds_of(program).filter(|b| b.library == library) {
            window.narrow(bound);
        }
        Some(window)
    }

    fn check_program(
        &self,
        program: &str,
        installed: &BTreeSet<Library>,
        logs: &mut Vec<Diagnostic>,
    ) {
        let deps: BTreeSet<&str> = self
            .bounds_of(program)
            .map(|b| b.library.as_str())
            .collect();

        for library in deps {
            let available: Vec<i64> = installed
                .iter()
                .filter(|lib| lib.name == library)
                .map(|lib| lib.version)
                .collect();

            let Some(window) = self.window(program, library, &available) else {
                logs.push(Diagnostic::error(format!(
                    "Program {program} needs library {library}, but it's not installed."
                )));
                continue;
            };

            if !available.iter().any(|&v| window.contains(v)) {
                logs.push(Diagnostic::error(format!(
                    "Program {program} needs library {library} in a version in [{}, {}], but only these versions are available: [{}]",
                    window.low,
                    window.high,
                    list(&available)
                )));
            }
        }
    }
}

impl Domain for DependencyHell {
    fn name(&self) -> &'static str {
        "dependency-hell"
    }

    fn uses_timeline(&self) -> bool {
        false
    }

    fn parse_extra(&mut self, fact: &Fact) -> bool {
        let Some(record) = DEPENDENCY_TABLE.recognize(fact) else {
            return false;
        };
        match record {
            DependencyFact::Program(p) => {
                self.programs.insert(p);
            }
            DependencyFact::Version(lib) => {
                self.libraries.insert(lib.name.clone());
                self.lib_versions.insert(lib);
            }
            DependencyFact::Bound(b) => {
                self.bounds.insert(b);
            }
            DependencyFact::Installed(lib) => {
                self.installed.insert(lib);
            }
            DependencyFact::ShouldDelete(lib) => {
                self.should_delete.insert(lib);
            }
            DependencyFact::ShouldInstall(lib) => {
                self.should_install.insert(lib);
            }
            DependencyFact::Wants(p) => {
                self.desired.insert(p);
            }
        }
        true
    }

    fn verify(&self, _plan: Option<&Plan>) -> Vec<Diagnostic> {
        let mut logs = Vec::new();
        let installed = self.apply_changes(&mut logs);
        for program in &self.desired {
            self.check_program(program, &installed, &mut logs);
        }
        logs
    }

    fn summary(&self, _plan: Option<&Plan>) -> String {
        format!(
            "Installed: [{}]  ShouldDelete: [{}]  ShouldInstall: [{}]",
            list(&self.installed),
            list(&self.should_delete),
            list(&self.should_install)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::validator::Validator;

    fn validator(raw: &[&str]) -> Validator {
        Validator::new(Box::new(DependencyHell::new()), raw).expect("validator")
    }

    fn errors(v: &Validator) -> Vec<String> {
        v.validate().errors().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn lower_bound_inside_installed_range_is_feasible() {
        let v = validator(&[
            "program(p)",
            "wants(p)",
            "installed(l,1)",
            "installed(l,2)",
            "requiresAtLeast(p,l,2)",
        ]);
        assert!(v.is_valid(), "{:?}", v.validate().logs);
    }

    #[test]
    fn lower_bound_above_installed_range_is_infeasible() {
        let v = validator(&[
            "program(p)",
            "wants(p)",
            "installed(l,1)",
            "installed(l,2)",
            "requiresAtLeast(p,l,3)",
        ]);
        assert_eq!(
            errors(&v),
            vec!["Program p needs library l in a version in [3, 2], but only these versions are available: [1, 2]"]
        );
    }

    #[test]
    fn bounds_never_widen_the_window() {
        let hell = DependencyHell {
            bounds: [
                Bound {
                    program: "p".into(),
                    library: "l".into(),
                    kind: BoundKind::Lower,
                    version: 0,
                },
                Bound {
                    program: "p".into(),
                    library: "l".into(),
                    kind: BoundKind::Upper,
                    version: 9,
                },
            ]
            .into_iter()
            .collect(),
            ..DependencyHell::default()
        };
        assert_eq!(
            hell.window("p", "l", &[2, 4]),
            Some(Window { low: 2, high: 4 })
        );
        assert_eq!(hell.window("p", "l", &[]), None);
    }

    #[test]
    fn upper_and_lower_bounds_combine() {
        let v = validator(&[
            "wants(p)",
            "installed(l,1)",
            "installed(l,3)",
            "requiresAtLeast(p,l,2)",
            "requiresAtMost(p,l,2)",
        ]);
        assert_eq!(errors(&v).len(), 1);
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let v = validator(&["wants(p)", "requiresAtMost(p,l,2)", "installed(m,1)"]);
        assert_eq!(
            errors(&v),
            vec!["Program p needs library l, but it's not installed."]
        );
    }

    #[test]
    fn deletions_apply_before_installs() {
        let v = validator(&[
            "wants(p)",
            "installed(l,1)",
            "requiresAtLeast(p,l,2)",
            "shouldDelete(l,1)",
            "shouldInstall(l,2)",
        ]);
        assert!(v.is_valid(), "{:?}", v.validate().logs);
        assert_eq!(
            v.instance_summary(),
            "Installed: [l.so.1]  ShouldDelete: [l.so.1]  ShouldInstall: [l.so.2]"
        );
    }

    #[test]
    fn deleting_an_absent_library_is_an_error() {
        let v = validator(&["installed(l,1)", "shouldDelete(l,2)"]);
        assert_eq!(
            errors(&v),
            vec!["Asked to delete lib l.so.2, but it's not installed."]
        );
    }

    #[test]
    fn redundant_install_only_warns() {
        let v = validator(&["installed(l,1)", "shouldInstall(l,1)"]);
        assert!(v.is_valid());
        assert_eq!(v.validate().count(Severity::Warning), 1);
    }

    #[test]
    fn needs_no_goal_and_recognizes_catalogue_facts() {
        let v = validator(&["program(p)", "version(l,1)", "version(l,2)"]);
        assert!(v.plan().is_none());
        assert!(v.is_valid());
        assert_eq!(v.validate().count(Severity::Warning), 0);
    }
}
