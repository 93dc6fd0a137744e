//! Recurrent Modules
//!
//! [`RnnCell`] encodes one recurrent step as a single weighted rule: the new
//! hidden state at time `Y` is implied by the input features at `Y` and the
//! hidden state at the preceding time `Z`, with `next(Z, Y)` supplying the
//! ordering. [`Rnn`] chains that step across `num_layers` time indices by
//! emitting successor facts and two boundary rules around one delegated
//! cell — the rule set stays constant-size regardless of depth.

use serde::Serialize;

use super::{position_variables, Module, NamingContext};
use crate::language::{
    Activation, Atom, Fact, Metadata, MetadataDirective, Predicate, Rule, Statement, Term,
};
use crate::{Result, TemplateError};

/// Default name of the structural successor relation
///
/// The leading underscore keeps it out of the caller's relation namespace.
pub const DEFAULT_NEXT_NAME: &str = "_next__positive";

/// One recurrent computational step
///
/// Maps an input feature relation plus a prior hidden-state relation into a
/// new hidden-state relation. The cell rule itself carries the identity
/// activation; the nonlinearity is bound to the output relation through a
/// metadata directive.
#[derive(Debug, Clone, Serialize)]
pub struct RnnCell {
    input_size: usize,
    hidden_size: usize,
    output_name: String,
    input_name: String,
    hidden_input_name: String,
    activation: Activation,
    arity: usize,
    input_time_step: bool,
    next_name: String,
}

impl RnnCell {
    /// Create a cell with default activation (tanh), arity 1, a time term
    /// on the input relation, and the default successor relation.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidConfiguration`] for zero feature
    /// sizes.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        output_name: impl Into<String>,
        input_name: impl Into<String>,
        hidden_input_name: impl Into<String>,
    ) -> Result<Self> {
        let output_name = output_name.into();
        if input_size == 0 || hidden_size == 0 {
            return Err(TemplateError::InvalidConfiguration(format!(
                "cell '{}' needs positive feature sizes, got input_size={}, hidden_size={}",
                output_name, input_size, hidden_size
            )));
        }

        Ok(Self {
            input_size,
            hidden_size,
            output_name,
            input_name: input_name.into(),
            hidden_input_name: hidden_input_name.into(),
            activation: Activation::Tanh,
            arity: 1,
            input_time_step: true,
            next_name: DEFAULT_NEXT_NAME.to_string(),
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
    /// Returns [`TemplateError::InvalidConfiguration`] for arity 0: without
    /// position arguments there is nothing to carry the state across time.
    pub fn with_arity(mut self, arity: usize) -> Result<Self> {
        if arity == 0 {
            return Err(TemplateError::InvalidConfiguration(format!(
                "cell '{}' needs at least one position argument",
                self.output_name
            )));
        }
        self.arity = arity;
        Ok(self)
    }

    /// Include the time step as the last term of the input predicate
    pub fn with_input_time_step(mut self, input_time_step: bool) -> Self {
        self.input_time_step = input_time_step;
        self
    }

    /// Set the successor relation name
    pub fn with_next_name(mut self, next_name: impl Into<String>) -> Self {
        self.next_name = next_name.into();
        self
    }
}

impl Module for RnnCell {
    fn expand(&self, ctx: &mut NamingContext) -> Result<Vec<Statement>> {
        ctx.claim(&self.output_name, &self.fingerprint())?;

        let positions = position_variables(self.arity);
        let time = Term::var("Y");
        let previous = Term::var("Z");

        let mut head_terms = positions.clone();
        head_terms.push(time.clone());
        let head = Atom::new(
            Predicate::new(&self.output_name, self.arity + 1),
            head_terms,
        )?;

        let mut input_terms = positions.clone();
        if self.input_time_step {
            input_terms.push(time.clone());
        }
        let input = Atom::new(
            Predicate::new(&self.input_name, input_terms.len()),
            input_terms,
        )?
        .with_matrix_weight(self.hidden_size, self.input_size)?;

        let mut hidden_terms = positions;
        hidden_terms.push(previous.clone());
        let hidden = Atom::new(
            Predicate::new(&self.hidden_input_name, self.arity + 1),
            hidden_terms,
        )?
        .with_matrix_weight(self.hidden_size, self.hidden_size)?;

        let next = Atom::new(Predicate::new(&self.next_name, 2), vec![previous, time])?;

        let rule = Rule::new(head, vec![input, hidden, next])?
            .with_activations([Activation::Identity]);
        let directive = MetadataDirective::new(
            Predicate::new(&self.output_name, self.arity + 1),
            Metadata::activation(self.activation),
        );

        Ok(vec![rule.into(), directive.into()])
    }

    fn output_name(&self) -> &str {
        &self.output_name
    }
}

/// A stack of recurrent layers unrolled through the successor relation
///
/// Expansion bridges the caller's initial-state relation into one private
/// intermediate relation at time `0`, delegates the general step to an
/// [`RnnCell`] that reads and writes that intermediate, and samples the
/// intermediate at time `num_layers` into the visible output relation.
/// Only the successor facts scale with the layer count.
#[derive(Debug, Clone, Serialize)]
pub struct Rnn {
    input_size: usize,
    hidden_size: usize,
    num_layers: usize,
    output_name: String,
    input_name: String,
    hidden_0_name: String,
    activation: Activation,
    arity: usize,
    input_time_step: bool,
    next_name: String,
}

impl Rnn {
    /// Create a recurrent stack with default activation (tanh), arity 1, a
    /// time term on the input relation, and the default successor relation.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidConfiguration`] for zero feature
    /// sizes or `num_layers < 1` — zero-layer recursion has no well-defined
    /// boundary binding.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
        output_name: impl Into<String>,
        input_name: impl Into<String>,
        hidden_0_name: impl Into<String>,
    ) -> Result<Self> {
        let output_name = output_name.into();
        if input_size == 0 || hidden_size == 0 {
            return Err(TemplateError::InvalidConfiguration(format!(
                "rnn '{}' needs positive feature sizes, got input_size={}, hidden_size={}",
                output_name, input_size, hidden_size
            )));
        }
        if num_layers < 1 {
            return Err(TemplateError::InvalidConfiguration(format!(
                "rnn '{}' needs at least one layer",
                output_name
            )));
        }

        Ok(Self {
            input_size,
            hidden_size,
            num_layers,
            output_name,
            input_name: input_name.into(),
            hidden_0_name: hidden_0_name.into(),
            activation: Activation::Tanh,
            arity: 1,
            input_time_step: true,
            next_name: DEFAULT_NEXT_NAME.to_string(),
        })
    }

    /// Set the activation bound to the intermediate hidden relation
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
                "rnn '{}' needs at least one position argument",
                self.output_name
            )));
        }
        self.arity = arity;
        Ok(self)
    }

    /// Include the time step as the last term of the input predicate
    pub fn with_input_time_step(mut self, input_time_step: bool) -> Self {
        self.input_time_step = input_time_step;
        self
    }

    /// Set the successor relation name
    pub fn with_next_name(mut self, next_name: impl Into<String>) -> Self {
        self.next_name = next_name.into();
        self
    }
}

impl Module for Rnn {
    fn expand(&self, ctx: &mut NamingContext) -> Result<Vec<Statement>> {
        ctx.claim(&self.output_name, &self.fingerprint())?;
        let intermediate = ctx.intermediate(&self.output_name, "rnn_cell");

        let cell = RnnCell::new(
            self.input_size,
            self.hidden_size,
            &intermediate,
            &self.input_name,
            &intermediate,
        )?
        .with_activation(self.activation)
        .with_arity(self.arity)?
        .with_input_time_step(self.input_time_step)
        .with_next_name(&self.next_name);

        let positions = position_variables(self.arity);
        let mut statements: Vec<Statement> = Vec::with_capacity(self.num_layers + 5);

        // The only statements whose count scales with the depth.
        for i in 0..self.num_layers as i64 {
            let next = Atom::new(
                Predicate::new(&self.next_name, 2),
                vec![Term::int(i), Term::int(i + 1)],
            )?;
            statements.push(Fact::new(next)?.into());
        }

        // Bind the chain at time 0 to the caller's initial hidden state.
        let mut zero_terms = positions.clone();
        zero_terms.push(Term::int(0));
        let zero_head = Atom::new(Predicate::new(&intermediate, self.arity + 1), zero_terms)?;
        let zero_body = Atom::new(
            Predicate::new(&self.hidden_0_name, self.arity),
            positions.clone(),
        )?;
        statements.push(
            Rule::new(zero_head, vec![zero_body])?
                .with_activations([Activation::Identity])
                .into(),
        );

        statements.extend(cell.expand(ctx)?);

        // Sample the chain at the requested depth into the visible output.
        let out_head = Atom::new(
            Predicate::new(&self.output_name, self.arity),
            positions.clone(),
        )?;
        let mut depth_terms = positions;
        depth_terms.push(Term::int(self.num_layers as i64));
        let out_body = Atom::new(Predicate::new(&intermediate, self.arity + 1), depth_terms)?;
        statements.push(
            Rule::new(out_head, vec![out_body])?
                .with_activations([Activation::Identity])
                .into(),
        );

        statements.push(
            MetadataDirective::new(
                Predicate::new(&self.output_name, self.arity),
                Metadata::activation(Activation::Identity),
            )
            .into(),
        );

        Ok(statements)
    }

    fn output_name(&self) -> &str {
        &self.output_name
    }
}
