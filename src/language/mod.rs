//! Relational Language Model
//!
//! The vocabulary the compiler emits: terms (variables and constants),
//! predicates, and atoms, plus the learnable-weight annotation attached to
//! body atoms.
//!
//! Everything here is an immutable value type with structural equality and
//! hashing — the resolver relies on that to deduplicate statements emitted
//! by independent module branches.

pub mod metadata;
pub mod statement;
pub mod validation;

pub use metadata::{Activation, Aggregation, Metadata};
pub use statement::{Fact, MetadataDirective, Rule, Statement};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, TemplateError};

/// A literal value appearing as an atom argument
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Constant {
    /// Integer literal (time indices, placeholder indices)
    Int(i64),
    /// Named literal (entity identifiers)
    Str(String),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Constant {
    fn from(value: i64) -> Self {
        Constant::Int(value)
    }
}

impl From<&str> for Constant {
    fn from(value: &str) -> Self {
        Constant::Str(value.to_string())
    }
}

/// A term: either a rule-scoped variable or a constant
///
/// Variables compare by name within a rule; constants by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Variable(String),
    Constant(Constant),
}

impl Term {
    /// Create a variable term
    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    /// Create an integer constant term
    pub fn int(value: i64) -> Self {
        Term::Constant(Constant::Int(value))
    }

    /// Create a constant term
    pub fn constant(value: impl Into<Constant>) -> Self {
        Term::Constant(value.into())
    }

    /// Variable name, if this term is a variable
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name),
            Term::Constant(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "{}", name),
            Term::Constant(c) => write!(f, "{}", c),
        }
    }
}

/// A named relation with a fixed arity
///
/// Two predicates denote the same relation iff both name and arity match;
/// `h/1` and `h/2` are distinct relations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Predicate {
    pub name: String,
    pub arity: usize,
}

impl Predicate {
    /// Create a predicate
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Declared dimensions of a learnable weight attached to a body atom
///
/// The compiler only declares the shape; the grounding engine allocates and
/// learns the actual parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeightShape {
    /// Single learnable scalar
    Scalar,
    /// Learnable matrix of (output, input) dimensions
    Matrix { rows: usize, cols: usize },
}

impl WeightShape {
    /// Create a matrix shape
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidShape`] if either dimension is zero.
    pub fn matrix(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(TemplateError::InvalidShape { rows, cols });
        }
        Ok(WeightShape::Matrix { rows, cols })
    }
}

impl fmt::Display for WeightShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightShape::Scalar => write!(f, "1"),
            WeightShape::Matrix { rows, cols } => write!(f, "{}, {}", rows, cols),
        }
    }
}

/// A predicate applied to terms, optionally annotated with a weight shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    pub predicate: Predicate,
    pub terms: Vec<Term>,
    /// When present, grounding this atom in a rule body goes through a
    /// learnable weight of the declared shape.
    pub weight: Option<WeightShape>,
}

impl Atom {
    /// Apply a predicate to terms
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::ArityMismatch`] when the term count does not
    /// match the predicate's arity.
    pub fn new(predicate: Predicate, terms: Vec<Term>) -> Result<Self> {
        if terms.len() != predicate.arity {
            return Err(TemplateError::ArityMismatch {
                predicate: predicate.name,
                arity: predicate.arity,
                found: terms.len(),
            });
        }
        Ok(Self {
            predicate,
            terms,
            weight: None,
        })
    }

    /// Attach a learnable-weight annotation
    pub fn with_weight(mut self, shape: WeightShape) -> Self {
        self.weight = Some(shape);
        self
    }

    /// Attach a learnable matrix weight of (output, input) dimensions
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidShape`] if either dimension is zero.
    pub fn with_matrix_weight(self, rows: usize, cols: usize) -> Result<Self> {
        Ok(self.with_weight(WeightShape::matrix(rows, cols)?))
    }

    /// Names of all variables appearing in this atom's terms
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(Term::as_variable)
    }

    /// True when no term is a variable
    pub fn is_ground(&self) -> bool {
        self.variables().next().is_none()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate.name)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", term)?;
        }
        write!(f, ")")?;
        if let Some(shape) = &self.weight {
            write!(f, " [{}]", shape)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_arity_checked() {
        let atom = Atom::new(Predicate::new("edge", 2), vec![Term::var("X"), Term::var("Y")]);
        assert!(atom.is_ok());

        let err = Atom::new(Predicate::new("edge", 2), vec![Term::var("X")]).unwrap_err();
        match err {
            TemplateError::ArityMismatch {
                predicate,
                arity,
                found,
            } => {
                assert_eq!(predicate, "edge");
                assert_eq!(arity, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected ArityMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_weight_shape_rejects_zero_dimension() {
        assert!(WeightShape::matrix(8, 4).is_ok());
        assert!(matches!(
            WeightShape::matrix(0, 4),
            Err(TemplateError::InvalidShape { rows: 0, cols: 4 })
        ));
        assert!(matches!(
            WeightShape::matrix(8, 0),
            Err(TemplateError::InvalidShape { rows: 8, cols: 0 })
        ));
    }

    #[test]
    fn test_atom_display() {
        let atom = Atom::new(
            Predicate::new("a", 2),
            vec![Term::var("X0"), Term::var("Y")],
        )
        .unwrap()
        .with_matrix_weight(8, 4)
        .unwrap();

        assert_eq!(atom.to_string(), "a(X0, Y) [8, 4]");
    }

    #[test]
    fn test_structural_equality() {
        let make = || {
            Atom::new(Predicate::new("p", 2), vec![Term::var("X"), Term::int(3)]).unwrap()
        };
        assert_eq!(make(), make());
        assert_ne!(make(), make().with_weight(WeightShape::Scalar));
    }

    #[test]
    fn test_atom_variables() {
        let atom = Atom::new(
            Predicate::new("p", 3),
            vec![Term::var("X"), Term::int(0), Term::var("Y")],
        )
        .unwrap();

        let vars: Vec<&str> = atom.variables().collect();
        assert_eq!(vars, vec!["X", "Y"]);
        assert!(!atom.is_ground());

        let ground = Atom::new(Predicate::new("next", 2), vec![Term::int(0), Term::int(1)]).unwrap();
        assert!(ground.is_ground());
    }

    #[test]
    fn test_predicate_identity_includes_arity() {
        assert_ne!(Predicate::new("h", 1), Predicate::new("h", 2));
        assert_eq!(Predicate::new("h", 2), Predicate::new("h", 2));
        assert_eq!(Predicate::new("h", 2).to_string(), "h/2");
    }
}
