//! Rules, Facts, and Metadata Directives
//!
//! The three statement kinds a compiled template is made of. All are
//! immutable value types with structural equality; the resolver hashes them
//! to drop duplicates emitted by independent module branches.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::metadata::{Activation, Metadata};
use super::{Atom, Predicate};
use crate::{Result, TemplateError};

/// A head atom implied by a non-empty conjunction of body atoms
///
/// Construction enforces range restriction: every head variable must be
/// bound by at least one body atom, otherwise grounding the head would be
/// underdetermined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<Atom>,
    /// Rule-level metadata (typically the identity activation chain; the
    /// nonlinearity lives on the relation, not the rule).
    pub metadata: Metadata,
}

impl Rule {
    /// Create a rule from a head and a non-empty body
    ///
    /// # Errors
    ///
    /// - [`TemplateError::InvalidConfiguration`] for an empty body
    /// - [`TemplateError::UnsafeRule`] when a head variable is not bound by
    ///   any body atom
    pub fn new(head: Atom, body: Vec<Atom>) -> Result<Self> {
        if body.is_empty() {
            return Err(TemplateError::InvalidConfiguration(format!(
                "rule for '{}' has an empty body; use a fact instead",
                head.predicate
            )));
        }

        let bound: BTreeSet<&str> = body.iter().flat_map(Atom::variables).collect();
        for variable in head.variables() {
            if !bound.contains(variable) {
                return Err(TemplateError::UnsafeRule {
                    predicate: head.predicate.name.clone(),
                    variable: variable.to_string(),
                });
            }
        }

        Ok(Self {
            head,
            body,
            metadata: Metadata::default(),
        })
    }

    /// Attach an ordered activation chain, replacing any previous one
    pub fn with_activations(mut self, activations: impl IntoIterator<Item = Activation>) -> Self {
        self.metadata.activations = activations.into_iter().collect();
        self
    }

    /// Attach a full metadata bundle, replacing any previous one
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Names of all variables appearing anywhere in the rule
    pub fn variables(&self) -> BTreeSet<&str> {
        self.head
            .variables()
            .chain(self.body.iter().flat_map(Atom::variables))
            .collect()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :- ", self.head)?;
        for (i, atom) in self.body.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", atom)?;
        }
        write!(f, ".")?;
        if !self.metadata.is_empty() {
            write!(f, " [{}]", self.metadata)?;
        }
        Ok(())
    }
}

/// A head atom with no body, optionally carrying a literal label value
///
/// Facts are never weighted; a weight annotation on a fact atom is rejected
/// at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub atom: Atom,
    /// Literal truth value, used e.g. as a training-example label
    pub value: Option<f64>,
}

impl Fact {
    /// Create a fact from an atom
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidConfiguration`] if the atom carries a
    /// weight annotation.
    pub fn new(atom: Atom) -> Result<Self> {
        if atom.weight.is_some() {
            return Err(TemplateError::InvalidConfiguration(format!(
                "fact for '{}' must not carry a weight annotation",
                atom.predicate
            )));
        }
        Ok(Self { atom, value: None })
    }

    /// Attach a literal label value
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

// Label values compare and hash by bit pattern so that structurally
// identical facts deduplicate.
impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.atom == other.atom
            && self.value.map(f64::to_bits) == other.value.map(f64::to_bits)
    }
}

impl Eq for Fact {}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.atom.hash(state);
        self.value.map(f64::to_bits).hash(state);
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{} = {}.", self.atom, value),
            None => write!(f, "{}.", self.atom),
        }
    }
}

/// Associates a relation with a metadata bundle, independent of rule text
///
/// Directives for the same relation are merged by the resolver: later
/// aggregation/learnability override, activation lists accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataDirective {
    pub predicate: Predicate,
    pub metadata: Metadata,
}

impl MetadataDirective {
    /// Create a directive binding a relation to a metadata bundle
    pub fn new(predicate: Predicate, metadata: Metadata) -> Self {
        Self {
            predicate,
            metadata,
        }
    }
}

impl fmt::Display for MetadataDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.predicate, self.metadata)
    }
}

/// One statement of a compiled template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    Rule(Rule),
    Fact(Fact),
    Metadata(MetadataDirective),
}

impl From<Rule> for Statement {
    fn from(rule: Rule) -> Self {
        Statement::Rule(rule)
    }
}

impl From<Fact> for Statement {
    fn from(fact: Fact) -> Self {
        Statement::Fact(fact)
    }
}

impl From<MetadataDirective> for Statement {
    fn from(directive: MetadataDirective) -> Self {
        Statement::Metadata(directive)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Rule(rule) => write!(f, "{}", rule),
            Statement::Fact(fact) => write!(f, "{}", fact),
            Statement::Metadata(directive) => write!(f, "{}", directive),
        }
    }
}
