//! Linear Module
//!
//! A dense projection: one weighted rule mapping the input relation onto
//! the output relation through an (output, input) weight matrix.

use serde::Serialize;

use super::{position_variables, Module, NamingContext};
use crate::language::{
    Activation, Atom, Metadata, MetadataDirective, Predicate, Rule, Statement,
};
use crate::{Result, TemplateError};

/// A learnable linear projection between two relations
#[derive(Debug, Clone, Serialize)]
pub struct Linear {
    input_size: usize,
    output_size: usize,
    output_name: String,
    input_name: String,
    activation: Activation,
    arity: usize,
}

impl Linear {
    /// Create a projection with identity activation and arity 1
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidConfiguration`] for zero feature
    /// sizes.
    pub fn new(
        input_size: usize,
        output_size: usize,
        output_name: impl Into<String>,
        input_name: impl Into<String>,
    ) -> Result<Self> {
        let output_name = output_name.into();
        if input_size == 0 || output_size == 0 {
            return Err(TemplateError::InvalidConfiguration(format!(
                "linear '{}' needs positive feature sizes, got input_size={}, output_size={}",
                output_name, input_size, output_size
            )));
        }

        Ok(Self {
            input_size,
            output_size,
            output_name,
            input_name: input_name.into(),
            activation: Activation::Identity,
            arity: 1,
        })
    }

    /// Set the activation bound to the output relation
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Set the arity of the input and output predicates
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidConfiguration`] for arity 0.
    pub fn with_arity(mut self, arity: usize) -> Result<Self> {
        if arity == 0 {
            return Err(TemplateError::InvalidConfiguration(format!(
                "linear '{}' needs at least one position argument",
                self.output_name
            )));
        }
        self.arity = arity;
        Ok(self)
    }
}

impl Module for Linear {
    fn expand(&self, ctx: &mut NamingContext) -> Result<Vec<Statement>> {
        ctx.claim(&self.output_name, &self.fingerprint())?;

        let positions = position_variables(self.arity);
        let head = Atom::new(
            Predicate::new(&self.output_name, self.arity),
            positions.clone(),
        )?;
        let body = Atom::new(Predicate::new(&self.input_name, self.arity), positions)?
            .with_matrix_weight(self.output_size, self.input_size)?;

        let rule = Rule::new(head, vec![body])?.with_activations([Activation::Identity]);
        let directive = MetadataDirective::new(
            Predicate::new(&self.output_name, self.arity),
            Metadata::activation(self.activation),
        );

        Ok(vec![rule.into(), directive.into()])
    }

    fn output_name(&self) -> &str {
        &self.output_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_expansion() {
        let linear = Linear::new(4, 16, "embed", "features")
            .unwrap()
            .with_activation(Activation::Relu);
        let statements = linear.expand(&mut NamingContext::new()).unwrap();

        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0].to_string(),
            "embed(X0) :- features(X0) [16, 4]. [activation=identity]"
        );
        assert_eq!(statements[1].to_string(), "embed/1 [activation=relu]");
    }

    #[test]
    fn test_linear_arity_two() {
        let linear = Linear::new(3, 5, "score", "pair")
            .unwrap()
            .with_arity(2)
            .unwrap();
        let statements = linear.expand(&mut NamingContext::new()).unwrap();

        assert_eq!(
            statements[0].to_string(),
            "score(X0, X1) :- pair(X0, X1) [5, 3]. [activation=identity]"
        );
    }

    #[test]
    fn test_linear_invalid_sizes() {
        assert!(matches!(
            Linear::new(0, 16, "embed", "features"),
            Err(TemplateError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Linear::new(4, 0, "embed", "features"),
            Err(TemplateError::InvalidConfiguration(_))
        ));
    }
}
