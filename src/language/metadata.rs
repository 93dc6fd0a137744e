//! Relation and Rule Metadata
//!
//! Annotations attached independently of the rule text: which activation a
//! relation applies after aggregation, how multiple rule firings aggregate,
//! and whether the relation's weights are frozen.
//!
//! The compiler only forwards these choices to the evaluation engine; it
//! never computes an activation itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Activation function catalogue recognized by the evaluation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Identity,
    Sigmoid,
    Tanh,
    Relu,
    LeakyRelu,
    Softmax,
    Gelu,
}

impl Activation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Relu => "relu",
            Activation::LeakyRelu => "leaky_relu",
            Activation::Softmax => "softmax",
            Activation::Gelu => "gelu",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation policy for combining multiple groundings of one relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Avg,
    Max,
    Min,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata bundle attached to a rule or, via a directive, to a relation
///
/// Activations are uniformly an ordered list: a single activation is a
/// one-element list, and composed transforms (identity followed by a named
/// nonlinearity) keep their order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    /// Ordered transform chain applied by the target
    pub activations: Vec<Activation>,
    /// How multiple firings of the target combine
    pub aggregation: Option<Aggregation>,
    /// `Some(false)` freezes the target's weights during learning
    pub learnable: Option<bool>,
}

impl Metadata {
    /// Metadata carrying a single activation
    pub fn activation(activation: Activation) -> Self {
        Self {
            activations: vec![activation],
            ..Self::default()
        }
    }

    /// Metadata carrying an ordered activation chain
    pub fn activations(activations: impl IntoIterator<Item = Activation>) -> Self {
        Self {
            activations: activations.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn with_learnable(mut self, learnable: bool) -> Self {
        self.learnable = Some(learnable);
        self
    }

    /// Merge a later metadata bundle into this one
    ///
    /// Later aggregation and learnability override earlier values when set;
    /// activation lists accumulate in emission order.
    pub fn merge(&mut self, later: &Metadata) {
        self.activations.extend(later.activations.iter().copied());
        if later.aggregation.is_some() {
            self.aggregation = later.aggregation;
        }
        if later.learnable.is_some() {
            self.learnable = later.learnable;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty() && self.aggregation.is_none() && self.learnable.is_none()
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            Ok(())
        };

        if !self.activations.is_empty() {
            sep(f)?;
            write!(f, "activation=")?;
            for (i, act) in self.activations.iter().enumerate() {
                if i > 0 {
                    write!(f, "+")?;
                }
                write!(f, "{}", act)?;
            }
        }
        if let Some(agg) = self.aggregation {
            sep(f)?;
            write!(f, "aggregation={}", agg)?;
        }
        if let Some(learnable) = self.learnable {
            sep(f)?;
            write!(f, "learnable={}", learnable)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides_and_accumulates() {
        let mut earlier = Metadata::activation(Activation::Identity).with_aggregation(Aggregation::Sum);
        let later = Metadata::activation(Activation::Tanh).with_aggregation(Aggregation::Avg);

        earlier.merge(&later);

        assert_eq!(
            earlier.activations,
            vec![Activation::Identity, Activation::Tanh]
        );
        assert_eq!(earlier.aggregation, Some(Aggregation::Avg));
        assert_eq!(earlier.learnable, None);
    }

    #[test]
    fn test_merge_keeps_earlier_fields_when_later_unset() {
        let mut earlier = Metadata::activation(Activation::Relu).with_learnable(false);
        earlier.merge(&Metadata::default());

        assert_eq!(earlier.activations, vec![Activation::Relu]);
        assert_eq!(earlier.learnable, Some(false));
    }

    #[test]
    fn test_display() {
        let meta = Metadata::activations([Activation::Identity, Activation::Tanh])
            .with_aggregation(Aggregation::Avg);
        assert_eq!(meta.to_string(), "activation=identity+tanh, aggregation=avg");

        assert_eq!(Metadata::default().to_string(), "");
        assert!(Metadata::default().is_empty());
    }

    #[test]
    fn test_activation_serde_names() {
        let json = serde_json::to_string(&Activation::LeakyRelu).unwrap();
        assert_eq!(json, "\"leaky_relu\"");
        let back: Activation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Activation::LeakyRelu);
    }
}
