//! Template Resolution
//!
//! Expands a sequence of modules into one flat, ordered statement list:
//! the relational program template handed to the external grounding engine.
//!
//! ## Resolution pass
//!
//! 1. Modules expand in construction order, sharing one
//!    [`NamingContext`] — the single-writer registry that turns two
//!    different configurations claiming one relation name into a
//!    [`NameConflict`](crate::TemplateError::NameConflict).
//! 2. Structurally identical rules and facts emitted by independent
//!    branches are dropped; the first emission keeps its position, so the
//!    output order is deterministic.
//! 3. Metadata directives are merged per relation: later
//!    aggregation/learnability override, activation lists accumulate, and
//!    exact duplicates are dropped rather than accumulated.
//!
//! A pass either fully succeeds or returns an error; no partial template
//! escapes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::language::validation::{self, ValidationError};
use crate::language::{MetadataDirective, Predicate, Statement};
use crate::module::{Module, NamingContext};
use crate::Result;

/// Compiles an ordered set of modules into a [`Template`]
///
/// Modules are expanded in the order they were added. The compiler owns the
/// produced statement sequence; modules own only their parameters.
#[derive(Debug, Default)]
pub struct TemplateCompiler {
    modules: Vec<Box<dyn Module>>,
}

impl TemplateCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module to the end of the expansion order
    pub fn add_module(&mut self, module: impl Module + 'static) -> &mut Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Builder-style [`add_module`](Self::add_module)
    pub fn with_module(mut self, module: impl Module + 'static) -> Self {
        self.add_module(module);
        self
    }

    /// Run one compile pass
    ///
    /// # Errors
    ///
    /// Propagates the first construction or expansion failure; in that case
    /// no template is produced.
    pub fn compile(&self) -> Result<Template> {
        let mut ctx = NamingContext::new();
        let mut statements: Vec<Statement> = Vec::new();
        let mut seen: HashSet<Statement> = HashSet::new();
        let mut directive_slots: HashMap<Predicate, usize> = HashMap::new();
        let mut seen_directives: HashSet<MetadataDirective> = HashSet::new();

        for module in &self.modules {
            let expanded = module.expand(&mut ctx)?;
            debug!(
                module = module.output_name(),
                statements = expanded.len(),
                "expanded module"
            );

            for statement in expanded {
                match statement {
                    Statement::Metadata(directive) => {
                        if !seen_directives.insert(directive.clone()) {
                            debug!(relation = %directive.predicate, "dropped duplicate directive");
                            continue;
                        }
                        match directive_slots.get(&directive.predicate) {
                            Some(&slot) => {
                                debug!(relation = %directive.predicate, "merged directive");
                                let Statement::Metadata(existing) = &mut statements[slot] else {
                                    unreachable!("directive slot points at a non-directive");
                                };
                                existing.metadata.merge(&directive.metadata);
                            }
                            None => {
                                directive_slots
                                    .insert(directive.predicate.clone(), statements.len());
                                statements.push(Statement::Metadata(directive));
                            }
                        }
                    }
                    other => {
                        if seen.insert(other.clone()) {
                            statements.push(other);
                        } else {
                            debug!(statement = %other, "dropped duplicate statement");
                        }
                    }
                }
            }
        }

        info!(
            modules = self.modules.len(),
            statements = statements.len(),
            "compiled template"
        );
        Ok(Template { statements })
    }
}

/// An ordered relational program template
///
/// The compiler's only output: an opaque ordered statement list for the
/// external grounding/evaluation engine. Caller-supplied relation names
/// appear exactly as configured; only compiler intermediates carry the
/// suffix scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    statements: Vec<Statement>,
}

impl Template {
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// All rules, in emission order
    pub fn rules(&self) -> impl Iterator<Item = &crate::language::Rule> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    /// All facts, in emission order
    pub fn facts(&self) -> impl Iterator<Item = &crate::language::Fact> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Fact(fact) => Some(fact),
            _ => None,
        })
    }

    /// All metadata directives, in emission order
    pub fn directives(&self) -> impl Iterator<Item = &MetadataDirective> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Metadata(directive) => Some(directive),
            _ => None,
        })
    }

    /// Every relation referenced anywhere in the template
    pub fn predicates(&self) -> BTreeSet<&Predicate> {
        let mut out = BTreeSet::new();
        for statement in &self.statements {
            match statement {
                Statement::Rule(rule) => {
                    out.insert(&rule.head.predicate);
                    for atom in &rule.body {
                        out.insert(&atom.predicate);
                    }
                }
                Statement::Fact(fact) => {
                    out.insert(&fact.atom.predicate);
                }
                Statement::Metadata(directive) => {
                    out.insert(&directive.predicate);
                }
            }
        }
        out
    }

    /// Run template-level validation, returning all findings
    pub fn validate(&self) -> Vec<ValidationError> {
        validation::validate(&self.statements)
    }

    /// Run template-level validation, erroring on the first finding
    pub fn validate_strict(&self) -> Result<()> {
        validation::validate_strict(&self.statements)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Template {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{Activation, Aggregation, Atom, Metadata, Rule, Term};
    use crate::module::{Linear, Rnn};
    use crate::TemplateError;

    fn rnn(output: &str, hidden: usize, layers: usize) -> Rnn {
        Rnn::new(4, hidden, layers, output, "a", "h0").unwrap()
    }

    #[test]
    fn test_compile_single_rnn() {
        let template = TemplateCompiler::new()
            .with_module(rnn("out", 8, 3))
            .compile()
            .unwrap();

        assert_eq!(template.len(), 8);
        assert_eq!(template.facts().count(), 3);
        assert_eq!(template.rules().count(), 3);
        assert_eq!(template.directives().count(), 2);
        assert!(template.validate().is_empty());
    }

    #[test]
    fn test_identical_reuse_deduplicates() {
        let once = TemplateCompiler::new()
            .with_module(rnn("out", 8, 3))
            .compile()
            .unwrap();
        let twice = TemplateCompiler::new()
            .with_module(rnn("out", 8, 3))
            .with_module(rnn("out", 8, 3))
            .compile()
            .unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_name_conflict_detected() {
        let err = TemplateCompiler::new()
            .with_module(rnn("out", 8, 3))
            .with_module(rnn("out", 16, 3))
            .compile()
            .unwrap_err();

        match err {
            TemplateError::NameConflict { name, .. } => assert_eq!(name, "out"),
            other => panic!("expected NameConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_sibling_intermediate_names_are_isolated() {
        let template = TemplateCompiler::new()
            .with_module(rnn("left", 8, 2))
            .with_module(rnn("right", 8, 2))
            .compile()
            .unwrap();

        let names: Vec<&str> = template
            .predicates()
            .into_iter()
            .map(|p| p.name.as_str())
            .filter(|n| n.contains("__rnn_cell"))
            .collect();
        assert_eq!(names, vec!["left__rnn_cell", "right__rnn_cell"]);
    }

    #[test]
    fn test_shared_successor_facts_merge() {
        let template = TemplateCompiler::new()
            .with_module(rnn("first", 8, 2))
            .with_module(rnn("second", 8, 3))
            .compile()
            .unwrap();

        // 2 facts from the first module; the second reuses them and only
        // contributes the (2, 3) step.
        let facts: Vec<String> = template.facts().map(|f| f.to_string()).collect();
        assert_eq!(
            facts,
            vec![
                "_next__positive(0, 1).",
                "_next__positive(1, 2).",
                "_next__positive(2, 3).",
            ]
        );
        // 7 from the first module; the second adds 1 new fact, 3 rules,
        // and 2 directives under its own names.
        assert_eq!(template.len(), 13);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let build = || {
            TemplateCompiler::new()
                .with_module(Linear::new(4, 8, "embed", "features").unwrap())
                .with_module(rnn("out", 8, 3))
                .compile()
                .unwrap()
        };
        assert_eq!(build(), build());
        assert_eq!(build().to_string(), build().to_string());
    }

    #[test]
    fn test_mixed_modules_preserve_order() {
        let template = TemplateCompiler::new()
            .with_module(Linear::new(4, 8, "embed", "features").unwrap())
            .with_module(rnn("out", 8, 1))
            .compile()
            .unwrap();

        // The linear statements come first, in their emission order.
        assert_eq!(
            template.statements()[0].to_string(),
            "embed(X0) :- features(X0) [8, 4]. [activation=identity]"
        );
        assert_eq!(template.statements()[2].to_string(), "_next__positive(0, 1).");
    }

    /// A hand-rolled module that splits its relation metadata across two
    /// directives, exercising the per-relation merge.
    #[derive(Debug)]
    struct SplitMetadata;

    impl Module for SplitMetadata {
        fn expand(&self, ctx: &mut NamingContext) -> Result<Vec<Statement>> {
            ctx.claim("split", &self.fingerprint())?;
            let head = Atom::new(Predicate::new("split", 1), vec![Term::var("X")])?;
            let body = Atom::new(Predicate::new("input", 1), vec![Term::var("X")])?;
            Ok(vec![
                Rule::new(head, vec![body])?.into(),
                MetadataDirective::new(
                    Predicate::new("split", 1),
                    Metadata::activation(Activation::Tanh),
                )
                .into(),
                MetadataDirective::new(
                    Predicate::new("split", 1),
                    Metadata::default().with_aggregation(Aggregation::Avg),
                )
                .into(),
            ])
        }

        fn output_name(&self) -> &str {
            "split"
        }
    }

    #[test]
    fn test_directives_merge_per_relation() {
        let template = TemplateCompiler::new()
            .with_module(SplitMetadata)
            .compile()
            .unwrap();

        assert_eq!(template.directives().count(), 1);
        let directive = template.directives().next().unwrap();
        assert_eq!(directive.metadata.activations, vec![Activation::Tanh]);
        assert_eq!(directive.metadata.aggregation, Some(Aggregation::Avg));
        assert_eq!(
            directive.to_string(),
            "split/1 [activation=tanh, aggregation=avg]"
        );
        assert!(template.validate().is_empty());
    }

    #[test]
    fn test_template_serde_round_trip() {
        let template = TemplateCompiler::new()
            .with_module(rnn("out", 8, 3))
            .compile()
            .unwrap();

        let json = serde_json::to_string(&template).unwrap();
        let back: Template = serde_json::from_str(&json).unwrap();
        assert_eq!(template, back);
    }

    #[test]
    fn test_empty_compiler_yields_empty_template() {
        let template = TemplateCompiler::new().compile().unwrap();
        assert!(template.is_empty());
        assert_eq!(template.to_string(), "");
    }
}
