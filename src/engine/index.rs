//! Rule indexing.
//!
//! The static side of the engine: one hash map per tier, built once from a
//! [`RuleSet`] and never touched again. Lookups are a hash probe plus a scan
//! of the (usually single-element) bucket.
//!
//! ## Invariants
//!
//! - Every rule lands in exactly one bucket of exactly one tier.
//! - Buckets keep the rule set's order; selection does not depend on it, but
//!   debug output does.

use super::keys::{LexicalKey, MorphologicalKey, RuleKey, SyntacticKey};
use crate::rules::{Rule, RuleSet, Tier};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct RuleIndex {
    pub(crate) lexical: HashMap<LexicalKey, Vec<Rule>>,
    pub(crate) morphological: HashMap<MorphologicalKey, Vec<Rule>>,
    pub(crate) syntactic: HashMap<SyntacticKey, Vec<Rule>>,
    pub(crate) default: HashMap<String, Vec<Rule>>,
}

impl RuleIndex {
    pub fn new(rules: RuleSet) -> Self {
        let mut index = RuleIndex::default();
        let RuleSet { lexical, morphological, syntactic, default } = rules;
        for rule in lexical.into_iter().chain(morphological).chain(syntactic).chain(default) {
            index.insert(rule);
        }
        index
    }

    fn insert(&mut self, rule: Rule) {
        match RuleKey::of(&rule.kind) {
            RuleKey::Lexical(key) => self.lexical.entry(key).or_default().push(rule),
            RuleKey::Morphological(key) => self.morphological.entry(key).or_default().push(rule),
            RuleKey::Syntactic(key) => self.syntactic.entry(key).or_default().push(rule),
            RuleKey::Default(key) => self.default.entry(key).or_default().push(rule),
        }
    }

    /// Number of rules indexed for `tier`.
    pub fn rule_count(&self, tier: Tier) -> usize {
        fn count<K>(map: &HashMap<K, Vec<Rule>>) -> usize {
            map.values().map(Vec::len).sum()
        }
        match tier {
            Tier::Lexical => count(&self.lexical),
            Tier::Morphological => count(&self.morphological),
            Tier::Syntactic => count(&self.syntactic),
            Tier::Default => count(&self.default),
            Tier::NoMatch => 0,
        }
    }

    pub fn len(&self) -> usize {
        Tier::ALL.iter().map(|t| self.rule_count(*t)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleKind;
    use crate::value::FeatureValue;

    fn rule(id: &str, kind: RuleKind) -> Rule {
        Rule { id: id.to_string(), kind, prediction: FeatureValue::from("Past"), confidence: 0.8, frequency: 4 }
    }

    #[test]
    fn rules_land_in_their_tier() {
        let rules = RuleSet {
            lexical: vec![rule(
                "L1",
                RuleKind::Lexical { lemma: "say".into(), upos: "VERB".into(), feature: "Tense".into() },
            )],
            default: vec![
                rule("D1", RuleKind::Default { feature: "Tense".into() }),
                rule("D2", RuleKind::Default { feature: "Tense".into() }),
            ],
            ..RuleSet::default()
        };
        let index = RuleIndex::new(rules);
        assert_eq!(index.rule_count(Tier::Lexical), 1);
        assert_eq!(index.rule_count(Tier::Default), 2);
        assert_eq!(index.default.len(), 1);
        assert_eq!(index.len(), 3);
        assert!(RuleIndex::default().is_empty());
    }
}
