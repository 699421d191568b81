//! Capture-name scope tracking
//!
//! Keeps the set of node names declared so far during one parse. Names are
//! interned so that the known set (and the snapshots taken around
//! disjunctions) are small sets of integer keys.

use lasso::{Rodeo, Spur};
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::error::PatternError;
use crate::lexer::Position;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("variable {0} has been declared twice")]
    DuplicateCapture(String),

    #[error("variable {0} was referenced before it was declared")]
    UnknownCapture(String),
}

impl ScopeError {
    /// Locate the error in the pattern text
    pub fn at(self, position: Position) -> PatternError {
        match self {
            ScopeError::DuplicateCapture(name) => PatternError::DuplicateCapture { name, position },
            ScopeError::UnknownCapture(name) => {
                PatternError::UndeclaredReference { name, position }
            }
        }
    }
}

/// A saved known-name set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeState {
    nodes: FxHashSet<Spur>,
    groups: FxHashSet<Spur>,
}

impl ScopeState {
    pub fn len(&self) -> usize {
        self.nodes.len() + self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.groups.is_empty()
    }
}

/// Node names (`=name`) and regex group variables (`#N=var`) share one
/// namespace for uniqueness, but only node names can be referenced.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    names: Rodeo,
    known: ScopeState,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new node name. Fails if the name is already known.
    pub fn declare(&mut self, name: &str) -> Result<(), ScopeError> {
        let key = self.fresh(name)?;
        self.known.nodes.insert(key);
        Ok(())
    }

    /// Record a new group variable. Fails if the name is already known.
    pub fn declare_group(&mut self, name: &str) -> Result<(), ScopeError> {
        let key = self.fresh(name)?;
        self.known.groups.insert(key);
        Ok(())
    }

    fn fresh(&mut self, name: &str) -> Result<Spur, ScopeError> {
        let key = self.names.get_or_intern(name);
        if self.known.nodes.contains(&key) || self.known.groups.contains(&key) {
            return Err(ScopeError::DuplicateCapture(name.to_string()));
        }
        Ok(key)
    }

    /// Check that a node name has been declared.
    pub fn reference(&self, name: &str) -> Result<(), ScopeError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(ScopeError::UnknownCapture(name.to_string()))
        }
    }

    /// Is `name` a known node name? Group variables do not count.
    pub fn contains(&self, name: &str) -> bool {
        self.names
            .get(name)
            .is_some_and(|key| self.known.nodes.contains(&key))
    }

    pub fn snapshot(&self) -> ScopeState {
        self.known.clone()
    }

    pub fn restore(&mut self, state: ScopeState) {
        self.known = state;
    }

    /// Make every name known in any of `states` known here.
    ///
    /// Used after the last branch of a disjunction: each branch was parsed
    /// without seeing its siblings' declarations, but any of them may be the
    /// one that matches, so later references may name any of them.
    pub fn merge_union(&mut self, states: impl IntoIterator<Item = ScopeState>) {
        for state in states {
            self.known.nodes.extend(state.nodes);
            self.known.groups.extend(state.groups);
        }
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Every known node name and group variable, sorted
    pub fn declared_names(&self) -> BTreeSet<String> {
        self.known
            .nodes
            .iter()
            .chain(&self.known.groups)
            .map(|key| self.names.resolve(key).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_reference() {
        let mut scope = ScopeTracker::new();
        assert!(scope.reference("x").is_err());
        scope.declare("x").unwrap();
        assert!(scope.reference("x").is_ok());
        assert_eq!(
            scope.declare("x"),
            Err(ScopeError::DuplicateCapture("x".to_string()))
        );
        assert_eq!(
            scope.reference("y"),
            Err(ScopeError::UnknownCapture("y".to_string()))
        );
    }

    #[test]
    fn test_restore_hides_later_declarations() {
        let mut scope = ScopeTracker::new();
        scope.declare("a").unwrap();
        let saved = scope.snapshot();
        scope.declare("b").unwrap();
        assert!(scope.contains("b"));

        scope.restore(saved);
        assert!(scope.contains("a"));
        assert!(!scope.contains("b"));
        // "b" was interned but is no longer known, so it may be declared again
        scope.declare("b").unwrap();
    }

    #[test]
    fn test_merge_union_of_branches() {
        let mut scope = ScopeTracker::new();
        scope.declare("root").unwrap();
        let original = scope.snapshot();

        scope.declare("x").unwrap();
        let first = scope.snapshot();

        scope.restore(original.clone());
        scope.declare("y").unwrap();
        let second = scope.snapshot();

        scope.merge_union([first, second]);
        assert_eq!(
            scope.declared_names().into_iter().collect::<Vec<_>>(),
            vec!["root", "x", "y"]
        );
        assert_eq!(original.len(), 1);
    }

    #[test]
    fn test_group_variables_are_not_referenceable() {
        let mut scope = ScopeTracker::new();
        scope.declare_group("v").unwrap();
        assert!(!scope.contains("v"));
        assert_eq!(
            scope.reference("v"),
            Err(ScopeError::UnknownCapture("v".to_string()))
        );
        // ...but they still block a node name of the same spelling
        assert_eq!(
            scope.declare("v"),
            Err(ScopeError::DuplicateCapture("v".to_string()))
        );
        scope.declare("n").unwrap();
        assert!(scope.declare_group("n").is_err());
        assert_eq!(
            scope.declared_names().into_iter().collect::<Vec<_>>(),
            vec!["n", "v"]
        );
    }

    #[test]
    fn test_restore_and_merge_cover_group_variables() {
        let mut scope = ScopeTracker::new();
        let empty = scope.snapshot();
        scope.declare_group("g").unwrap();
        let branch = scope.snapshot();

        scope.restore(empty);
        scope.declare_group("g").unwrap();
        scope.merge_union([branch]);
        assert_eq!(scope.len(), 1);
        assert!(scope.declare("g").is_err());
    }

    #[test]
    fn test_scope_error_location() {
        let err = ScopeError::UnknownCapture("n".to_string()).at(Position::new(4, 1, 5));
        assert!(matches!(
            err,
            PatternError::UndeclaredReference { ref name, position } if name == "n" && position.offset == 4
        ));
    }
}
