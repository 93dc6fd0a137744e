//! Template Validation
//!
//! Semantic checks over a full statement sequence, run after resolution.
//! Rule-level well-formedness (arity, range restriction, weight shapes) is
//! already enforced at construction; these checks catch cross-statement
//! mistakes in the assembled template.
//!
//! ## Checks Performed
//!
//! - **Arity consistency**: the same relation name used with two different
//!   arities is almost always a typo in a module parameter
//! - **Ground facts**: facts must not contain variables
//! - **Directive merging**: at most one metadata directive per relation
//!   (the resolver merges them; a leftover duplicate means statements were
//!   assembled by hand)

use std::collections::{HashMap, HashSet};

use super::statement::Statement;
use super::{Atom, Predicate};
use crate::{Result, TemplateError};

/// Validation finding with location information
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Finding message
    pub message: String,
    /// Statement index where the finding occurred
    pub statement_index: Option<usize>,
    /// Relation name involved
    pub predicate: Option<String>,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref pred) = self.predicate {
            write!(f, " (relation: {})", pred)?;
        }
        if let Some(idx) = self.statement_index {
            write!(f, " [statement {}]", idx)?;
        }
        if let Some(ref sug) = self.suggestion {
            write!(f, "\n  = help: {}", sug)?;
        }
        Ok(())
    }
}

/// Validate a statement sequence
///
/// Returns a list of findings (empty if valid).
pub fn validate(statements: &[Statement]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut arities: HashMap<String, usize> = HashMap::new();
    let mut directive_targets: HashSet<Predicate> = HashSet::new();

    for (index, statement) in statements.iter().enumerate() {
        match statement {
            Statement::Rule(rule) => {
                check_arity(&rule.head, index, &mut arities, &mut errors);
                for atom in &rule.body {
                    check_arity(atom, index, &mut arities, &mut errors);
                }
            }
            Statement::Fact(fact) => {
                check_arity(&fact.atom, index, &mut arities, &mut errors);
                if !fact.atom.is_ground() {
                    errors.push(ValidationError {
                        message: format!(
                            "fact '{}' contains variables; facts must be ground",
                            fact.atom
                        ),
                        statement_index: Some(index),
                        predicate: Some(fact.atom.predicate.name.clone()),
                        suggestion: Some(
                            "replace the variables with constants, or turn the fact into a rule"
                                .to_string(),
                        ),
                    });
                }
            }
            Statement::Metadata(directive) => {
                if !directive_targets.insert(directive.predicate.clone()) {
                    errors.push(ValidationError {
                        message: format!(
                            "multiple metadata directives target relation '{}'",
                            directive.predicate
                        ),
                        statement_index: Some(index),
                        predicate: Some(directive.predicate.name.clone()),
                        suggestion: Some(
                            "compile through the resolver, which merges directives per relation"
                                .to_string(),
                        ),
                    });
                }
            }
        }
    }

    errors
}

/// Validate strictly, returning an error if any finding is reported
pub fn validate_strict(statements: &[Statement]) -> Result<()> {
    let errors = validate(statements);
    if errors.is_empty() {
        Ok(())
    } else {
        let msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Err(TemplateError::InvalidConfiguration(format!(
            "template validation failed:\n{}",
            msg
        )))
    }
}

fn check_arity(
    atom: &Atom,
    index: usize,
    arities: &mut HashMap<String, usize>,
    errors: &mut Vec<ValidationError>,
) {
    let name = &atom.predicate.name;
    match arities.get(name) {
        Some(&expected) if expected != atom.predicate.arity => {
            errors.push(ValidationError {
                message: format!(
                    "relation '{}' used with inconsistent arity: first seen with {}, now {}",
                    name, expected, atom.predicate.arity
                ),
                statement_index: Some(index),
                predicate: Some(name.clone()),
                suggestion: Some(format!(
                    "check the arity parameter of the modules emitting '{}'",
                    name
                )),
            });
        }
        None => {
            arities.insert(name.clone(), atom.predicate.arity);
        }
        _ => {}
    }
}
