//! Token contexts.
//!
//! A [`TokenContext`] is the complete linguistic picture of one token: what the
//! dependency parse says about it (tag, relation, head, morphology, dependents)
//! and where the constituency parse places it (enclosing phrase, depth,
//! siblings). Contexts are built from two independent halves and merged:
//!
//! ```text
//! DependencyParse ──▶ from_dependency ──┐
//!                                       ├─ fill_unset ──▶ TokenContext
//! ConstituencyTree ─▶ from_constituency ┘   (dependency wins, tree fills gaps)
//! ```
//!
//! Any field neither parse provides stays [`FeatureValue::Absent`].

use crate::input::{ConstituencyTree, DependencyParse, ParsedSentence};
use crate::value::FeatureValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

bitflags::bitflags! {
    /// Boolean predicates derived from a token's context.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ContextFlags: u8 {
        const HAS_DETERMINER  = 1 << 0;
        const IS_PROPER_NOUN  = 1 << 1;
        const IS_FINITE_VERB  = 1 << 2;
        const HAS_AUXILIARY   = 1 << 3;
        const IS_ROOT         = 1 << 4;
        const HAS_CASE_MARKER = 1 << 5;
    }
}

/// Coarse position of a token within its sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionCategory {
    Initial,
    Medial,
    Final,
}

impl PositionCategory {
    pub fn of(index: usize, len: usize) -> Option<Self> {
        if index >= len {
            None
        } else if index == 0 {
            Some(PositionCategory::Initial)
        } else if index + 1 == len {
            Some(PositionCategory::Final)
        } else {
            Some(PositionCategory::Medial)
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PositionCategory::Initial => "initial",
            PositionCategory::Medial => "medial",
            PositionCategory::Final => "final",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initial" => Some(PositionCategory::Initial),
            "medial" => Some(PositionCategory::Medial),
            "final" => Some(PositionCategory::Final),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenContext {
    pub index: Option<usize>,
    pub form: FeatureValue,
    pub lemma: FeatureValue,
    pub upos: FeatureValue,
    pub deprel: FeatureValue,
    pub head_lemma: FeatureValue,
    pub head_upos: FeatureValue,
    pub morph: BTreeMap<String, String>,
    pub child_relations: Vec<String>,
    pub phrase_label: FeatureValue,
    pub phrase_depth: Option<usize>,
    pub sibling_labels: Vec<String>,
    pub position: Option<PositionCategory>,
    pub flags: ContextFlags,
}

impl TokenContext {
    /// A context with every field unset.
    pub fn absent() -> Self {
        TokenContext::default()
    }

    /// Build the full context of token `index`, merging both parses.
    pub fn build(sentence: &ParsedSentence, index: usize) -> Self {
        let mut context = TokenContext::from_dependency(&sentence.dependency, index);
        if let Some(tree) = &sentence.constituency {
            context.fill_unset(TokenContext::from_constituency(tree, index));
        }
        context.derive_flags();
        context
    }

    /// The dependency half of a context.
    pub fn from_dependency(parse: &DependencyParse, index: usize) -> Self {
        let Some(token) = parse.get(index) else {
            return TokenContext::absent();
        };
        let head = parse.head_index(index).and_then(|h| parse.get(h));
        TokenContext {
            index: Some(index),
            form: FeatureValue::from_field(&token.form),
            lemma: FeatureValue::from_field(&token.lemma),
            upos: FeatureValue::from_field(&token.upos),
            deprel: FeatureValue::from_field(&token.deprel),
            head_lemma: FeatureValue::from_option(head.map(|h| h.lemma.as_str())),
            head_upos: FeatureValue::from_option(head.map(|h| h.upos.as_str())),
            morph: token.feats.clone(),
            child_relations: parse.children(index).filter_map(|c| parse.get(c)).map(|c| c.deprel.clone()).collect(),
            position: PositionCategory::of(index, parse.len()),
            ..TokenContext::default()
        }
    }

    /// The constituency half of a context.
    ///
    /// The tree's own tag stands in for the part of speech; it is only used
    /// when the dependency parse has none.
    pub fn from_constituency(tree: &ConstituencyTree, index: usize) -> Self {
        let Some(placement) = tree.placement(index) else {
            return TokenContext::absent();
        };
        let form = tree
            .path_to(index)
            .and_then(|path| path.last().map(|leaf| FeatureValue::from_field(&leaf.label)))
            .unwrap_or_default();
        TokenContext {
            index: Some(index),
            form,
            upos: FeatureValue::from_field(&placement.tag),
            phrase_label: FeatureValue::from_field(&placement.phrase_label),
            phrase_depth: Some(placement.phrase_depth),
            sibling_labels: placement.sibling_labels,
            position: PositionCategory::of(index, tree.leaf_count()),
            ..TokenContext::default()
        }
    }

    /// Copy every field of `other` that is unset in `self`.
    pub fn fill_unset(&mut self, other: TokenContext) {
        fn fill(slot: &mut FeatureValue, other: FeatureValue) {
            if slot.is_absent() {
                *slot = other;
            }
        }

        if self.index.is_none() {
            self.index = other.index;
        }
        fill(&mut self.form, other.form);
        fill(&mut self.lemma, other.lemma);
        fill(&mut self.upos, other.upos);
        fill(&mut self.deprel, other.deprel);
        fill(&mut self.head_lemma, other.head_lemma);
        fill(&mut self.head_upos, other.head_upos);
        fill(&mut self.phrase_label, other.phrase_label);
        if self.morph.is_empty() {
            self.morph = other.morph;
        }
        if self.child_relations.is_empty() {
            self.child_relations = other.child_relations;
        }
        if self.phrase_depth.is_none() {
            self.phrase_depth = other.phrase_depth;
        }
        if self.sibling_labels.is_empty() {
            self.sibling_labels = other.sibling_labels;
        }
        if self.position.is_none() {
            self.position = other.position;
        }
        self.flags |= other.flags;
    }

    pub fn has_child(&self, relation: &str) -> bool {
        self.child_relations.iter().any(|r| base_relation(r) == relation)
    }

    fn derive_flags(&mut self) {
        let mut flags = self.flags;

        if self.has_child("det") || self.sibling_labels.iter().any(|l| l == "DT") {
            flags |= ContextFlags::HAS_DETERMINER;
        }
        if matches!(self.upos.as_str(), Some("PROPN" | "NNP" | "NNPS")) {
            flags |= ContextFlags::IS_PROPER_NOUN;
        }
        if self.morph.get("VerbForm").is_some_and(|v| v == "Fin") {
            flags |= ContextFlags::IS_FINITE_VERB;
        }
        if self.has_child("aux") {
            flags |= ContextFlags::HAS_AUXILIARY;
        }
        if self.deprel.as_str() == Some("root") {
            flags |= ContextFlags::IS_ROOT;
        }
        if self.has_child("case") {
            flags |= ContextFlags::HAS_CASE_MARKER;
        }
        self.flags = flags;
    }

    pub fn morph_value(&self, name: &str) -> FeatureValue {
        FeatureValue::from_option(self.morph.get(name).map(String::as_str))
    }

    pub fn position_value(&self) -> FeatureValue {
        self.position.map(|p| FeatureValue::categorical(p.name())).unwrap_or_default()
    }
}

/// Strip a UD subtype: `aux:pass` -> `aux`.
pub(crate) fn base_relation(rel: &str) -> &str {
    rel.split(':').next().unwrap_or(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ConstituencyTree, DepToken};

    fn canonical() -> ParsedSentence {
        let dep = DependencyParse::new(vec![
            DepToken::new(1, "the", "the", "DET", 2, "det").with_feats("Definite=Def|PronType=Art"),
            DepToken::new(2, "government", "government", "NOUN", 4, "nsubj").with_feats("Number=Sing"),
            DepToken::new(3, "has", "have", "AUX", 4, "aux").with_feats("Mood=Ind|Tense=Pres|VerbForm=Fin"),
            DepToken::new(4, "announced", "announce", "VERB", 0, "root").with_feats("Tense=Past|VerbForm=Part"),
        ]);
        let tree =
            ConstituencyTree::parse("(S (NP (DT the) (NN government)) (VP (VBZ has) (VP (VBN announced))))").unwrap();
        ParsedSentence::new(dep, Some(tree))
    }

    #[test]
    fn dependency_fields_win_over_constituency() {
        let ctx = TokenContext::build(&canonical(), 1);
        // The tree tags "government" as NN; the dependency parse says NOUN.
        assert_eq!(ctx.upos, FeatureValue::categorical("NOUN"));
        assert_eq!(ctx.head_lemma, FeatureValue::categorical("announce"));
        assert_eq!(ctx.phrase_label, FeatureValue::categorical("NP"));
        assert_eq!(ctx.phrase_depth, Some(1));
        assert_eq!(ctx.sibling_labels, vec!["DT".to_string()]);
        assert_eq!(ctx.position, Some(PositionCategory::Medial));
        assert!(ctx.flags.contains(ContextFlags::HAS_DETERMINER));
    }

    #[test]
    fn constituency_fills_missing_dependency_fields() {
        let mut sentence = canonical();
        sentence.dependency.tokens[1].upos = "_".to_string();
        let ctx = TokenContext::build(&sentence, 1);
        assert_eq!(ctx.upos, FeatureValue::categorical("NN"));
    }

    #[test]
    fn root_verb_flags() {
        let ctx = TokenContext::build(&canonical(), 3);
        assert!(ctx.flags.contains(ContextFlags::IS_ROOT));
        assert!(ctx.flags.contains(ContextFlags::HAS_AUXILIARY));
        assert!(!ctx.flags.contains(ContextFlags::IS_FINITE_VERB));
        assert_eq!(ctx.head_upos, FeatureValue::Absent);
        assert_eq!(ctx.position, Some(PositionCategory::Final));
        assert_eq!(ctx.morph_value("VerbForm"), FeatureValue::categorical("Part"));
        assert_eq!(ctx.morph_value("Mood"), FeatureValue::Absent);
    }

    #[test]
    fn out_of_range_token_is_all_absent() {
        let ctx = TokenContext::build(&canonical(), 9);
        assert_eq!(ctx.index, None);
        assert!(ctx.lemma.is_absent());
        assert!(ctx.upos.is_absent());
        assert_eq!(ctx.flags, ContextFlags::empty());
    }

    #[test]
    fn position_categories() {
        assert_eq!(PositionCategory::of(0, 1), Some(PositionCategory::Initial));
        assert_eq!(PositionCategory::of(2, 3), Some(PositionCategory::Final));
        assert_eq!(PositionCategory::of(1, 3), Some(PositionCategory::Medial));
        assert_eq!(PositionCategory::of(3, 3), None);
    }
}
