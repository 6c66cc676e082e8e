//! Typed lookup keys.
//!
//! Each tier is indexed by a fixed-arity key struct. The same key is derived
//! from a rule (at index time) and from a query (at lookup time), so the two
//! sides cannot disagree on field order or separators.
//!
//! Deriving a key from a query returns `None` when a field the key needs is
//! missing (an ABSENT lemma for the lexical tier, an ABSENT part of speech for
//! the morphological and syntactic tiers). The engine then skips that tier.

use crate::context::PositionCategory;
use crate::rules::{RuleKind, RuleQuery};
use crate::value::FeatureValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct LexicalKey {
    pub(crate) feature: String,
    pub(crate) lemma: String,
    pub(crate) upos: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MorphologicalKey {
    pub(crate) feature: String,
    pub(crate) upos: String,
    pub(crate) headline_value: FeatureValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SyntacticKey {
    pub(crate) feature: String,
    pub(crate) upos: String,
    pub(crate) deprel: Option<String>,
    pub(crate) position: Option<PositionCategory>,
}

/// Tier-tagged key of one rule.
pub(crate) enum RuleKey {
    Lexical(LexicalKey),
    Morphological(MorphologicalKey),
    Syntactic(SyntacticKey),
    Default(String),
}

impl RuleKey {
    pub(crate) fn of(kind: &RuleKind) -> Self {
        match kind {
            RuleKind::Lexical { lemma, upos, feature } => {
                RuleKey::Lexical(LexicalKey { feature: feature.clone(), lemma: lemma.clone(), upos: upos.clone() })
            }
            RuleKind::Morphological { upos, feature, headline_value } => RuleKey::Morphological(MorphologicalKey {
                feature: feature.clone(),
                upos: upos.clone(),
                headline_value: headline_value.clone(),
            }),
            RuleKind::Syntactic { upos, feature, deprel, position } => RuleKey::Syntactic(SyntacticKey {
                feature: feature.clone(),
                upos: upos.clone(),
                deprel: deprel.clone(),
                position: *position,
            }),
            RuleKind::Default { feature } => RuleKey::Default(feature.clone()),
        }
    }
}

fn present(value: &FeatureValue) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

impl LexicalKey {
    pub(crate) fn from_query(query: &RuleQuery<'_>) -> Option<Self> {
        Some(LexicalKey {
            feature: query.feature.to_string(),
            lemma: present(query.lemma)?.to_string(),
            upos: present(query.upos)?.to_string(),
        })
    }
}

impl MorphologicalKey {
    pub(crate) fn from_query(query: &RuleQuery<'_>) -> Option<Self> {
        Some(MorphologicalKey {
            feature: query.feature.to_string(),
            upos: present(query.upos)?.to_string(),
            headline_value: query.headline_value.clone(),
        })
    }
}

impl SyntacticKey {
    /// Keys to try for `query`, most specific first:
    /// deprel + position, deprel, position, part of speech alone.
    pub(crate) fn backoff(query: &RuleQuery<'_>) -> Vec<Self> {
        let Some(upos) = present(query.upos) else {
            return Vec::new();
        };
        let deprel = present(query.deprel);
        let position = query.position;

        let mut shapes = vec![(deprel, position), (deprel, None), (None, position), (None, None)];
        // Drop shapes that repeat an earlier one because a field is missing.
        let mut seen = Vec::with_capacity(shapes.len());
        shapes.retain(|shape| {
            let fresh = !seen.contains(shape);
            seen.push(*shape);
            fresh
        });

        shapes
            .into_iter()
            .map(|(deprel, position)| SyntacticKey {
                feature: query.feature.to_string(),
                upos: upos.to_string(),
                deprel: deprel.map(str::to_string),
                position,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query<'a>(upos: &'a FeatureValue, deprel: &'a FeatureValue, lemma: &'a FeatureValue) -> RuleQuery<'a> {
        RuleQuery {
            feature: "Tense",
            lemma,
            upos,
            deprel,
            position: Some(PositionCategory::Initial),
            headline_value: &FeatureValue::Absent,
        }
    }

    #[test]
    fn backoff_is_most_specific_first() {
        let (upos, deprel, lemma) = ("VERB".into(), "root".into(), "say".into());
        let keys = SyntacticKey::backoff(&query(&upos, &deprel, &lemma));
        assert_eq!(keys.len(), 4);
        assert!(keys[0].deprel.is_some() && keys[0].position.is_some());
        assert!(keys[1].deprel.is_some() && keys[1].position.is_none());
        assert!(keys[2].deprel.is_none() && keys[2].position.is_some());
        assert!(keys[3].deprel.is_none() && keys[3].position.is_none());
    }

    #[test]
    fn missing_fields_collapse_or_skip() {
        let (upos, lemma) = (FeatureValue::from("VERB"), FeatureValue::Absent);
        let keys = SyntacticKey::backoff(&query(&upos, &FeatureValue::Absent, &lemma));
        assert_eq!(keys.len(), 2);
        assert!(LexicalKey::from_query(&query(&upos, &FeatureValue::Absent, &lemma)).is_none());

        let absent = FeatureValue::Absent;
        assert!(SyntacticKey::backoff(&query(&absent, &absent, &absent)).is_empty());
        assert!(MorphologicalKey::from_query(&query(&absent, &absent, &absent)).is_none());
    }
}
