//! # lifted-template-compiler
//!
//! Compiles declarative neural-network module descriptions into *relational
//! program templates*: weighted first-order-logic rules and facts that a
//! downstream differentiable-logic evaluator can ground and execute.
//!
//! ## Overview
//!
//! A user describes an architecture as a tree of immutable, parametrized
//! modules (a recurrent cell, a stack of recurrent layers, a dense
//! projection). The compiler expands that tree into a flat, ordered sequence
//! of statements:
//!
//! ```text
//! _next__positive(0, 1).
//! _next__positive(1, 2).
//! _next__positive(2, 3).
//! out__rnn_cell(X0, 0) :- h0(X0). [activation=identity]
//! out__rnn_cell(X0, Y) :- a(X0, Y) [8, 4], out__rnn_cell(X0, Z) [8, 8], _next__positive(Z, Y). [activation=identity]
//! out__rnn_cell/2 [activation=tanh]
//! out(X0) :- out__rnn_cell(X0, 3). [activation=identity]
//! out/1 [activation=identity]
//! ```
//!
//! Recursion over time steps is not a native loop construct: it is encoded
//! by a structural successor relation plus a single general-step rule, so
//! the rule set stays constant-size while the successor facts fix the
//! unrolling depth.
//!
//! The compiler only *produces* this declarative fragment. Grounding,
//! numeric optimization, and evaluation belong to the external engine that
//! consumes the template.
//!
//! ## Quick Start
//!
//! ```
//! use lifted_template_compiler::prelude::*;
//!
//! let rnn = Rnn::new(4, 8, 3, "out", "a", "h0")?;
//!
//! let template = TemplateCompiler::new().with_module(rnn).compile()?;
//! assert_eq!(template.len(), 8);
//! # Ok::<(), TemplateError>(())
//! ```

pub mod language;
pub mod module;
pub mod resolver;

/// Error types for template compilation
///
/// Every variant is raised synchronously at the point of construction or
/// expansion; there is no deferred error path. A failed compile pass never
/// returns a partial template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// An atom was built with a term count that does not match its
    /// predicate's declared arity.
    #[error("predicate '{predicate}' has arity {arity} but was applied to {found} terms")]
    ArityMismatch {
        predicate: String,
        arity: usize,
        found: usize,
    },

    /// A rule head references a variable that no body atom binds, which
    /// would leave grounding underdetermined.
    #[error("head variable '{variable}' of the rule for '{predicate}' is not bound by any body atom")]
    UnsafeRule {
        predicate: String,
        variable: String,
    },

    /// A learnable-weight annotation with a non-positive dimension.
    #[error("invalid weight shape ({rows}, {cols}): dimensions must be positive")]
    InvalidShape { rows: usize, cols: usize },

    /// Structurally nonsensical module parameters (zero layers, zero
    /// feature sizes, empty rule bodies).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two different module configurations claimed the same relation name
    /// within one compile pass.
    #[error("relation '{name}' is claimed by two different module configurations: {first} vs {second}")]
    NameConflict {
        name: String,
        first: String,
        second: String,
    },
}

/// Result type alias for template compilation
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Result, TemplateError};

    // Language: terms, atoms, statements, metadata
    pub use crate::language::{
        Activation, Aggregation, Atom, Constant, Fact, Metadata, MetadataDirective, Predicate,
        Rule, Statement, Term, WeightShape,
    };

    // Modules
    pub use crate::module::{Linear, Module, NamingContext, Rnn, RnnCell};

    // Resolver
    pub use crate::resolver::{Template, TemplateCompiler};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let cell = RnnCell::new(4, 8, "h", "a", "h").unwrap();
        let template = TemplateCompiler::new().with_module(cell).compile().unwrap();
        assert_eq!(template.len(), 2);
    }
}
