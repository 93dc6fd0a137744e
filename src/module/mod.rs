//! Module Abstraction
//!
//! A module is an immutable configuration object (sizes, names, activation,
//! flags) that *expands* into an ordered sequence of statements. Leaf
//! modules ("cells") encode one computational step; composites chain cells
//! across a recursion dimension by reusing one intermediate relation at
//! successive time indices.
//!
//! Expansion is a pure function of the module's parameters plus an explicit
//! [`NamingContext`] threaded through the pass. The context is the only
//! shared structure: it records which module configuration claimed which
//! relation name, so two different configurations can never silently merge
//! under one name.

pub mod linear;
pub mod rnn;

pub use linear::Linear;
pub use rnn::{Rnn, RnnCell, DEFAULT_NEXT_NAME};

use std::collections::BTreeMap;
use std::fmt;

use crate::language::{Statement, Term};
use crate::{Result, TemplateError};

/// A unit that expands into template statements
///
/// Implementations own only their construction parameters and hold no
/// mutable state: every invocation of [`Module::expand`] produces a fresh,
/// independent statement sequence, so expanding the same module twice is
/// deterministic down to the generated intermediate names.
pub trait Module: fmt::Debug {
    /// Expand into an ordered statement sequence
    ///
    /// # Errors
    ///
    /// Any [`TemplateError`](crate::TemplateError) raised while building
    /// atoms and rules, plus [`NameConflict`](crate::TemplateError::NameConflict)
    /// when this module's output relation is already claimed by a different
    /// configuration in `ctx`.
    fn expand(&self, ctx: &mut NamingContext) -> Result<Vec<Statement>>;

    /// The externally visible output relation name of this module
    fn output_name(&self) -> &str;

    /// Deterministic description of this module's full configuration
    ///
    /// Two modules with equal fingerprints produce identical statements;
    /// the naming context compares fingerprints to tell benign reuse from a
    /// genuine name conflict.
    fn fingerprint(&self) -> String {
        format!("{:?}", self)
    }
}

/// Name-uniqueness registry for one compile pass
///
/// Single-writer for the duration of a pass; reentrant compiles must not
/// share an instance.
#[derive(Debug, Clone, Default)]
pub struct NamingContext {
    claims: BTreeMap<String, String>,
}

impl NamingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a relation name on behalf of a module configuration
    ///
    /// Re-claiming a name with the same fingerprint is allowed (the same
    /// module expanded twice deduplicates downstream); claiming it with a
    /// different fingerprint is a conflict.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NameConflict`] when `name` is already
    /// claimed by a different configuration.
    pub fn claim(&mut self, name: &str, fingerprint: &str) -> Result<()> {
        match self.claims.get(name) {
            Some(existing) if existing != fingerprint => Err(TemplateError::NameConflict {
                name: name.to_string(),
                first: existing.clone(),
                second: fingerprint.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.claims.insert(name.to_string(), fingerprint.to_string());
                Ok(())
            }
        }
    }

    /// Derive an intermediate relation name from a module's output name
    ///
    /// Deterministic (output name + fixed suffix, never random) so that
    /// regenerating the same module tree reproduces the same template, and
    /// collision-free across modules because the output name itself is
    /// claimed per configuration.
    pub fn intermediate(&self, output_name: &str, tag: &str) -> String {
        format!("{}__{}", output_name, tag)
    }

    /// Relation names claimed so far in this pass
    pub fn claimed_names(&self) -> impl Iterator<Item = &str> {
        self.claims.keys().map(String::as_str)
    }
}

/// Fresh position variables `X0..X{arity-1}` for one rule
pub(crate) fn position_variables(arity: usize) -> Vec<Term> {
    (0..arity).map(|i| Term::var(format!("X{}", i))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_conflict_detection() {
        let mut ctx = NamingContext::new();
        ctx.claim("h", "RnnCell { hidden: 8 }").unwrap();

        // Identical reuse is fine.
        assert!(ctx.claim("h", "RnnCell { hidden: 8 }").is_ok());

        // A different configuration under the same name is not.
        let err = ctx.claim("h", "RnnCell { hidden: 16 }").unwrap_err();
        match err {
            TemplateError::NameConflict { name, first, second } => {
                assert_eq!(name, "h");
                assert!(first.contains("8"));
                assert!(second.contains("16"));
            }
            other => panic!("expected NameConflict, got {:?}", other),
        }

        let claimed: Vec<&str> = ctx.claimed_names().collect();
        assert_eq!(claimed, vec!["h"]);
    }

    #[test]
    fn test_intermediate_name_is_deterministic() {
        let ctx = NamingContext::new();
        assert_eq!(ctx.intermediate("out", "rnn_cell"), "out__rnn_cell");
        assert_eq!(ctx.intermediate("out", "rnn_cell"), "out__rnn_cell");
        assert_ne!(
            ctx.intermediate("out", "rnn_cell"),
            ctx.intermediate("out2", "rnn_cell")
        );
    }

    #[test]
    fn test_position_variables() {
        let vars = position_variables(3);
        assert_eq!(
            vars,
            vec![Term::var("X0"), Term::var("X1"), Term::var("X2")]
        );
        assert!(position_variables(0).is_empty());
    }
}
