//! Feature schema.
//!
//! A schema is an ordered list of [`FeatureDef`]s. Each definition names a
//! feature, says which category and scope it belongs to, and how to extract
//! its value from one side of a sentence pair. Extraction never fails: a
//! value that cannot be extracted is [`FeatureValue::Absent`], which is itself
//! comparable (that is how insertions and deletions show up).
//!
//! Definitions are usually written with the [`feature!`](crate::feature)
//! macro:
//!
//! ```
//! use regshift::{Extraction, feature};
//!
//! let def = feature!(
//!     id: "VerbForm",
//!     category: Morphological,
//!     scope: Token,
//!     extract: Extraction::Morph("VerbForm".to_string()),
//!     values: ["Fin", "Inf", "Part", "Ger"],
//! );
//! assert_eq!(def.id, "VerbForm");
//! ```

use crate::context::base_relation;
use crate::input::ParsedSentence;
use crate::punctuation;
use crate::value::FeatureValue;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static STANDARD_SCHEMA: Lazy<FeatureSchema> = Lazy::new(|| {
    FeatureSchema::new(vec![
        feature!(
            id: "Definite",
            category: Morphological,
            scope: Token,
            extract: morph!("Definite"),
            values: ["Def", "Ind"],
        ),
        feature!(
            id: "Number",
            category: Morphological,
            scope: Token,
            extract: morph!("Number"),
            values: ["Sing", "Plur"],
        ),
        feature!(
            id: "Tense",
            category: Morphological,
            scope: Token,
            extract: morph!("Tense"),
            values: ["Past", "Pres", "Fut"],
        ),
        feature!(
            id: "VerbForm",
            category: Morphological,
            scope: Token,
            extract: morph!("VerbForm"),
            values: ["Fin", "Inf", "Part", "Ger"],
        ),
        feature!(
            id: "Mood",
            category: Morphological,
            scope: Token,
            extract: morph!("Mood"),
            values: ["Ind", "Imp", "Sub", "Cnd"],
        ),
        feature!(
            id: "Person",
            category: Morphological,
            scope: Token,
            extract: morph!("Person"),
            values: ["1", "2", "3"],
        ),
        feature!(id: "upos", category: Lexical, scope: Token, extract: Extraction::Upos),
        feature!(id: "det_lemma", category: Lexical, scope: Token, extract: Extraction::ChildLemma("det".to_string())),
        feature!(id: "deprel", category: Syntactic, scope: Token, extract: Extraction::Deprel),
        feature!(
            id: "has_det",
            category: Syntactic,
            scope: Token,
            extract: Extraction::HasChild("det".to_string()),
            values: ["yes", "no"],
        ),
        feature!(
            id: "has_aux",
            category: Syntactic,
            scope: Token,
            extract: Extraction::HasChild("aux".to_string()),
            values: ["yes", "no"],
        ),
        feature!(
            id: "punct_count",
            category: Punctuation,
            scope: Sentence,
            extract: Extraction::PunctuationCount,
            domain: ValueDomain::Numeric,
        ),
        feature!(
            id: "colon_substitution",
            category: Punctuation,
            scope: Sentence,
            extract: Extraction::PunctuationSubstitution(":".to_string()),
        ),
        feature!(
            id: "token_count",
            category: Structural,
            scope: Sentence,
            extract: Extraction::TokenCount,
            domain: ValueDomain::Numeric,
        ),
        feature!(
            id: "tree_depth",
            category: Structural,
            scope: Sentence,
            extract: Extraction::TreeDepth,
            domain: ValueDomain::Numeric,
        ),
        feature!(id: "top_phrase", category: Structural, scope: Sentence, extract: Extraction::RootPhraseLabel),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCategory {
    Lexical,
    Morphological,
    Syntactic,
    Structural,
    Punctuation,
}

impl FeatureCategory {
    /// Radius (in tokens) of the textual window attached to events of this category.
    pub fn window(self) -> usize {
        match self {
            FeatureCategory::Lexical => 3,
            FeatureCategory::Morphological => 2,
            FeatureCategory::Syntactic => 5,
            FeatureCategory::Structural => 4,
            FeatureCategory::Punctuation => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FeatureCategory::Lexical => "lexical",
            FeatureCategory::Morphological => "morphological",
            FeatureCategory::Syntactic => "syntactic",
            FeatureCategory::Structural => "structural",
            FeatureCategory::Punctuation => "punctuation",
        }
    }
}

/// What a feature is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureScope {
    /// Every aligned token pair, plus every inserted and deleted token.
    Token,
    /// Once per sentence pair, anchored on the two roots.
    Sentence,
}

/// Legal values of a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueDomain {
    /// Any categorical value.
    Open,
    Categorical(Vec<String>),
    Numeric,
}

impl ValueDomain {
    pub fn values(values: &[&str]) -> Self {
        ValueDomain::Categorical(values.iter().map(|v| v.to_string()).collect())
    }

    /// `value` if it is legal for this domain, otherwise `Absent`.
    pub fn admit(&self, value: FeatureValue) -> FeatureValue {
        let legal = match (self, &value) {
            (_, FeatureValue::Absent) => true,
            (ValueDomain::Open, FeatureValue::Categorical(_)) => true,
            (ValueDomain::Categorical(values), FeatureValue::Categorical(v)) => values.iter().any(|x| x == v),
            (ValueDomain::Numeric, FeatureValue::Numeric(_)) => true,
            _ => false,
        };
        if legal {
            value
        } else {
            tracing::debug!(%value, domain = ?self, "value outside feature domain, treating as absent");
            FeatureValue::Absent
        }
    }
}

/// Which parse a feature's value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseOrigin {
    Dependency,
    Constituency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Headline,
    Canonical,
}

/// Everything an extraction may look at for one side of a pair.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionSite<'a> {
    pub sentence: &'a ParsedSentence,
    /// The other side of the pair (only pair-level heuristics look at it).
    pub counterpart: &'a ParsedSentence,
    pub side: Side,
    /// 0-based token the value is read from; `None` when the token does not exist on this side.
    pub token: Option<usize>,
}

pub type CustomExtraction = fn(&ExtractionSite<'_>) -> Option<FeatureValue>;

/// How a feature's value is read from one side.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// Morphological feature of the token (`Tense`, `Number`, ...).
    Morph(String),
    Upos,
    Lemma,
    Deprel,
    /// `yes`/`no`: whether the token has a dependent with this relation.
    HasChild(String),
    /// Lemma of the first dependent with this relation.
    ChildLemma(String),
    /// Number of punctuation tokens in the sentence.
    PunctuationCount,
    TokenCount,
    /// Depth of the constituency tree.
    TreeDepth,
    /// Label of the topmost constituency phrase.
    RootPhraseLabel,
    /// The mark on the headline side, the word it stands for on the canonical side.
    PunctuationSubstitution(String),
    Custom(CustomExtraction),
}

impl Extraction {
    pub fn origin(&self) -> ParseOrigin {
        match self {
            Extraction::TreeDepth | Extraction::RootPhraseLabel => ParseOrigin::Constituency,
            _ => ParseOrigin::Dependency,
        }
    }

    pub fn extract(&self, site: &ExtractionSite<'_>) -> Option<FeatureValue> {
        let dependency = &site.sentence.dependency;
        let token = || site.token.and_then(|i| dependency.get(i));

        match self {
            Extraction::Morph(name) => Some(FeatureValue::from_option(token()?.feats.get(name).map(String::as_str))),
            Extraction::Upos => Some(FeatureValue::from_field(&token()?.upos)),
            Extraction::Lemma => Some(FeatureValue::from_field(&token()?.lemma)),
            Extraction::Deprel => Some(FeatureValue::from_field(&token()?.deprel)),
            Extraction::HasChild(rel) => {
                let index = site.token.filter(|i| *i < dependency.len())?;
                let present = dependency.children(index).any(|c| {
                    dependency.get(c).is_some_and(|t| base_relation(&t.deprel) == rel.as_str())
                });
                Some(FeatureValue::categorical(if present { "yes" } else { "no" }))
            }
            Extraction::ChildLemma(rel) => {
                let index = site.token.filter(|i| *i < dependency.len())?;
                let lemma = dependency
                    .children(index)
                    .filter_map(|c| dependency.get(c))
                    .find(|t| base_relation(&t.deprel) == rel.as_str())
                    .map(|t| t.lemma.to_lowercase());
                Some(FeatureValue::from_option(lemma.as_deref()))
            }
            Extraction::PunctuationCount => {
                Some(FeatureValue::Numeric(dependency.tokens.iter().filter(|t| t.is_punct()).count() as i64))
            }
            Extraction::TokenCount => Some(FeatureValue::Numeric(dependency.len() as i64)),
            Extraction::TreeDepth => Some(FeatureValue::Numeric(site.sentence.constituency.as_ref()?.depth() as i64)),
            Extraction::RootPhraseLabel => {
                Some(FeatureValue::from_field(site.sentence.constituency.as_ref()?.top_label()))
            }
            Extraction::PunctuationSubstitution(mark) => {
                let (headline, canonical) = match site.side {
                    Side::Headline => (site.sentence, site.counterpart),
                    Side::Canonical => (site.counterpart, site.sentence),
                };
                let found = punctuation::detect(headline, canonical, mark)
                    .filter(|s| s.direction == punctuation::SubstitutionDirection::MarkForWord)?;
                Some(match site.side {
                    Side::Headline => FeatureValue::categorical(found.mark),
                    Side::Canonical => FeatureValue::categorical(found.word),
                })
            }
            Extraction::Custom(extract) => extract(site),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureDef {
    pub id: String,
    pub category: FeatureCategory,
    pub scope: FeatureScope,
    pub extraction: Extraction,
    pub domain: ValueDomain,
}

impl FeatureDef {
    /// Extract and domain-check the value at `site`. Missing values are `Absent`.
    pub fn value_at(&self, site: &ExtractionSite<'_>) -> FeatureValue {
        self.domain.admit(self.extraction.extract(site).unwrap_or_default())
    }

    pub fn origin(&self) -> ParseOrigin {
        self.extraction.origin()
    }
}

/// Ordered collection of feature definitions.
#[derive(Debug, Clone, Default)]
pub struct FeatureSchema {
    features: Vec<FeatureDef>,
}

impl FeatureSchema {
    pub fn new(features: Vec<FeatureDef>) -> Self {
        FeatureSchema { features }
    }

    /// The built-in headline schema: morphology, determiners, auxiliaries,
    /// punctuation and tree shape.
    pub fn standard() -> Self {
        STANDARD_SCHEMA.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDef> {
        self.features.iter()
    }

    pub fn get(&self, id: &str) -> Option<&FeatureDef> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn with_scope(&self, scope: FeatureScope) -> impl Iterator<Item = &FeatureDef> {
        self.features.iter().filter(move |f| f.scope == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ConstituencyTree, DepToken, DependencyParse};

    fn sentence() -> ParsedSentence {
        let dep = DependencyParse::new(vec![
            DepToken::new(1, "The", "the", "DET", 2, "det"),
            DepToken::new(2, "storm", "storm", "NOUN", 3, "nsubj").with_feats("Number=Sing"),
            DepToken::new(3, "hit", "hit", "VERB", 0, "root").with_feats("Tense=Past|VerbForm=Fin|Mood=Xyz"),
            DepToken::new(4, ".", ".", "PUNCT", 3, "punct"),
        ]);
        let tree = ConstituencyTree::parse("(ROOT (S (NP (DT The) (NN storm)) (VP (VBD hit)) (. .)))").unwrap();
        ParsedSentence::new(dep, Some(tree))
    }

    fn site(sentence: &ParsedSentence, token: Option<usize>) -> ExtractionSite<'_> {
        ExtractionSite { sentence, counterpart: sentence, side: Side::Canonical, token }
    }

    #[test]
    fn token_features() {
        let s = sentence();
        let schema = FeatureSchema::standard();
        let value = |id: &str, token| schema.get(id).unwrap().value_at(&site(&s, token));

        assert_eq!(value("Tense", Some(2)), FeatureValue::categorical("Past"));
        assert_eq!(value("Tense", Some(1)), FeatureValue::Absent);
        assert_eq!(value("Tense", None), FeatureValue::Absent);
        assert_eq!(value("has_det", Some(1)), FeatureValue::categorical("yes"));
        assert_eq!(value("has_det", Some(2)), FeatureValue::categorical("no"));
        assert_eq!(value("det_lemma", Some(1)), FeatureValue::categorical("the"));
        assert_eq!(value("upos", Some(0)), FeatureValue::categorical("DET"));
    }

    #[test]
    fn out_of_domain_values_become_absent() {
        let s = sentence();
        let mood = FeatureSchema::standard().get("Mood").unwrap().value_at(&site(&s, Some(2)));
        assert_eq!(mood, FeatureValue::Absent);
    }

    #[test]
    fn sentence_features() {
        let s = sentence();
        let schema = FeatureSchema::standard();
        let value = |id: &str| schema.get(id).unwrap().value_at(&site(&s, s.dependency.root_index()));

        assert_eq!(value("punct_count"), FeatureValue::Numeric(1));
        assert_eq!(value("token_count"), FeatureValue::Numeric(4));
        assert_eq!(value("tree_depth"), FeatureValue::Numeric(4));
        assert_eq!(value("top_phrase"), FeatureValue::categorical("S"));
        assert_eq!(schema.get("tree_depth").unwrap().origin(), ParseOrigin::Constituency);
    }

    #[test]
    fn missing_tree_is_absent() {
        let mut s = sentence();
        s.constituency = None;
        let depth = FeatureSchema::standard().get("tree_depth").unwrap().value_at(&site(&s, Some(0)));
        assert_eq!(depth, FeatureValue::Absent);
    }

    #[test]
    fn custom_extraction() {
        fn capitalized(site: &ExtractionSite<'_>) -> Option<FeatureValue> {
            let token = site.sentence.dependency.get(site.token?)?;
            let upper = token.form.chars().next()?.is_uppercase();
            Some(FeatureValue::categorical(if upper { "upper" } else { "lower" }))
        }

        let def = feature!(id: "case", category: Lexical, scope: Token, extract: Extraction::Custom(capitalized));
        let s = sentence();
        assert_eq!(def.value_at(&site(&s, Some(0))), FeatureValue::categorical("upper"));
        assert_eq!(def.value_at(&site(&s, Some(1))), FeatureValue::categorical("lower"));
        assert_eq!(def.domain, ValueDomain::Open);
    }

    #[test]
    fn windows_follow_category() {
        assert_eq!(FeatureCategory::Lexical.window(), 3);
        assert_eq!(FeatureCategory::Morphological.window(), 2);
        assert_eq!(FeatureCategory::Syntactic.window(), 5);
        assert!((4..=7).contains(&FeatureCategory::Structural.window()));
        assert!((4..=7).contains(&FeatureCategory::Punctuation.window()));
    }
}
