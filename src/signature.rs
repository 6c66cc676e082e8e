//! Multi-granularity context signatures.
//!
//! A [`ContextSignature`] is the aggregation key the systematicity analysis
//! groups events by. It is a structured value, never a joined string, so a
//! lemma containing `:` or `|` cannot corrupt the key.
//!
//! Each granularity includes strictly more fields than the previous one:
//!
//! ```text
//! Minimal    upos
//! Lexical    + lemma
//! Syntactic  + deprel, head upos, position
//! Phrasal    + phrase label, phrase depth, sibling labels
//! Full       + morphology, context flags, head lemma
//! ```
//!
//! Slots that are not part of a granularity are `None`; slots that are part
//! of it but missing from the context hold `Some(FeatureValue::Absent)`, which
//! is a valid, distinct key component.

use crate::context::{ContextFlags, TokenContext};
use crate::value::FeatureValue;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minimal,
    Lexical,
    Syntactic,
    Phrasal,
    Full,
}

impl Granularity {
    /// All levels, coarsest first.
    pub const ALL: [Granularity; 5] =
        [Granularity::Minimal, Granularity::Lexical, Granularity::Syntactic, Granularity::Phrasal, Granularity::Full];

    pub fn name(self) -> &'static str {
        match self {
            Granularity::Minimal => "minimal",
            Granularity::Lexical => "lexical",
            Granularity::Syntactic => "syntactic",
            Granularity::Phrasal => "phrasal",
            Granularity::Full => "full",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextSignature {
    pub granularity: Granularity,
    pub upos: FeatureValue,
    pub lemma: Option<FeatureValue>,
    pub deprel: Option<FeatureValue>,
    pub head_upos: Option<FeatureValue>,
    pub position: Option<FeatureValue>,
    pub phrase_label: Option<FeatureValue>,
    pub phrase_depth: Option<FeatureValue>,
    pub sibling_labels: Option<Vec<String>>,
    pub morph: Option<Vec<(String, String)>>,
    pub flags: Option<ContextFlags>,
    pub head_lemma: Option<FeatureValue>,
}

impl ContextSignature {
    /// Derive the signature of `context` at `granularity`.
    pub fn of(context: &TokenContext, granularity: Granularity) -> Self {
        let at = |level: Granularity| granularity >= level;
        let when = |level: Granularity, value: &FeatureValue| at(level).then(|| value.clone());

        ContextSignature {
            granularity,
            upos: context.upos.clone(),
            lemma: when(Granularity::Lexical, &context.lemma),
            deprel: when(Granularity::Syntactic, &context.deprel),
            head_upos: when(Granularity::Syntactic, &context.head_upos),
            position: at(Granularity::Syntactic).then(|| context.position_value()),
            phrase_label: when(Granularity::Phrasal, &context.phrase_label),
            phrase_depth: at(Granularity::Phrasal)
                .then(|| context.phrase_depth.map(|d| FeatureValue::Numeric(d as i64)).unwrap_or_default()),
            sibling_labels: at(Granularity::Phrasal).then(|| context.sibling_labels.clone()),
            morph: at(Granularity::Full)
                .then(|| context.morph.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            flags: at(Granularity::Full).then_some(context.flags),
            head_lemma: when(Granularity::Full, &context.head_lemma),
        }
    }

    /// Signatures of `context` at every granularity, coarsest first.
    pub fn all(context: &TokenContext) -> [ContextSignature; 5] {
        Granularity::ALL.map(|g| ContextSignature::of(context, g))
    }
}

impl fmt::Display for ContextSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upos={}", self.upos)?;
        let slots = [
            ("lemma", &self.lemma),
            ("deprel", &self.deprel),
            ("head", &self.head_upos),
            ("pos", &self.position),
            ("phrase", &self.phrase_label),
            ("depth", &self.phrase_depth),
            ("head_lemma", &self.head_lemma),
        ];
        for (name, slot) in slots {
            if let Some(value) = slot {
                write!(f, " {name}={value}")?;
            }
        }
        if let Some(siblings) = &self.sibling_labels {
            write!(f, " siblings=[{}]", siblings.join(","))?;
        }
        if let Some(morph) = &self.morph {
            let feats: Vec<String> = morph.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " morph=[{}]", feats.join(","))?;
        }
        if let Some(flags) = &self.flags {
            write!(f, " flags={:#04x}", flags.bits())?;
        }
        Ok(())
    }
}
