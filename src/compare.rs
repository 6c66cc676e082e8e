//! Schema-driven comparison of an aligned sentence pair.
//!
//! Every feature of the schema is extracted on both sides and compared.
//! Token-scope features are evaluated at every alignment anchor:
//!
//! ```text
//! aligned pair   (h, c)     both sides extracted
//! deletion       (h, None)  canonical side is ABSENT
//! insertion      (None, c)  headline side is ABSENT
//! ```
//!
//! Sentence-scope features are evaluated once, anchored on the two roots.
//! A feature that cannot be extracted is `Absent` on that side only; it never
//! prevents the other features from being compared.

use crate::align::Alignment;
use crate::input::{ParsedSentence, SentencePair};
use crate::schema::{ExtractionSite, FeatureCategory, FeatureDef, FeatureSchema, FeatureScope, ParseOrigin, Side};
use crate::value::FeatureValue;
use std::sync::Arc;

/// One feature whose value differs between the headline and the canonical sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceEvent {
    pub corpus_id: Arc<str>,
    pub sentence_id: Arc<str>,
    pub origin: ParseOrigin,
    pub feature_id: String,
    pub category: FeatureCategory,
    pub scope: FeatureScope,
    pub canonical_value: FeatureValue,
    pub headline_value: FeatureValue,
    /// 0-based headline token; `None` for insertions.
    pub headline_index: Option<usize>,
    /// 0-based canonical token; `None` for deletions.
    pub canonical_index: Option<usize>,
    pub headline_text: Arc<str>,
    pub canonical_text: Arc<str>,
}

impl DifferenceEvent {
    pub fn is_insertion(&self) -> bool {
        self.headline_index.is_none() && self.canonical_index.is_some()
    }

    pub fn is_deletion(&self) -> bool {
        self.canonical_index.is_none() && self.headline_index.is_some()
    }
}

/// Shared per-pair strings, so events do not copy the sentence text.
struct PairLabels {
    corpus_id: Arc<str>,
    sentence_id: Arc<str>,
    headline_text: Arc<str>,
    canonical_text: Arc<str>,
}

impl PairLabels {
    fn of(pair: &SentencePair) -> Self {
        PairLabels {
            corpus_id: Arc::from(pair.corpus_id.as_str()),
            sentence_id: Arc::from(pair.sentence_id.as_str()),
            headline_text: Arc::from(pair.headline.surface()),
            canonical_text: Arc::from(pair.canonical.surface()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Comparator<'s> {
    schema: &'s FeatureSchema,
}

impl<'s> Comparator<'s> {
    pub fn new(schema: &'s FeatureSchema) -> Self {
        Comparator { schema }
    }

    pub fn schema(&self) -> &'s FeatureSchema {
        self.schema
    }

    /// All difference events of `pair` under `alignment`.
    ///
    /// Events come out anchor by anchor (aligned pairs in headline order, then
    /// deletions, then insertions, then the sentence anchor) and, within an
    /// anchor, in schema order.
    pub fn compare(&self, pair: &SentencePair, alignment: &Alignment) -> Vec<DifferenceEvent> {
        let labels = PairLabels::of(pair);
        let mut events = Vec::new();

        let anchors = alignment
            .pairs()
            .map(|(h, c)| (Some(h), Some(c)))
            .chain(alignment.deletions().into_iter().map(|h| (Some(h), None)))
            .chain(alignment.insertions().into_iter().map(|c| (None, Some(c))));

        for (headline_index, canonical_index) in anchors {
            for def in self.schema.with_scope(FeatureScope::Token) {
                events.extend(self.compare_at(pair, &labels, def, headline_index, canonical_index));
            }
        }

        let headline_root = pair.headline.dependency.root_index();
        let canonical_root = pair.canonical.dependency.root_index();
        for def in self.schema.with_scope(FeatureScope::Sentence) {
            events.extend(self.compare_at(pair, &labels, def, headline_root, canonical_root));
        }

        tracing::debug!(
            corpus = %pair.corpus_id,
            sentence = %pair.sentence_id,
            events = events.len(),
            "compared sentence pair"
        );
        events
    }

    fn compare_at(
        &self,
        pair: &SentencePair,
        labels: &PairLabels,
        def: &FeatureDef,
        headline_index: Option<usize>,
        canonical_index: Option<usize>,
    ) -> Option<DifferenceEvent> {
        let headline_value = def.value_at(&site(&pair.headline, &pair.canonical, Side::Headline, headline_index));
        let canonical_value = def.value_at(&site(&pair.canonical, &pair.headline, Side::Canonical, canonical_index));
        if headline_value == canonical_value {
            return None;
        }

        Some(DifferenceEvent {
            corpus_id: Arc::clone(&labels.corpus_id),
            sentence_id: Arc::clone(&labels.sentence_id),
            origin: def.origin(),
            feature_id: def.id.clone(),
            category: def.category,
            scope: def.scope,
            canonical_value,
            headline_value,
            headline_index,
            canonical_index,
            headline_text: Arc::clone(&labels.headline_text),
            canonical_text: Arc::clone(&labels.canonical_text),
        })
    }
}

fn site<'a>(
    sentence: &'a ParsedSentence,
    counterpart: &'a ParsedSentence,
    side: Side,
    token: Option<usize>,
) -> ExtractionSite<'a> {
    ExtractionSite { sentence, counterpart, side, token }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::Aligner;
    use crate::input::{DepToken, DependencyParse};
    use crate::schema::Extraction;

    fn pair() -> SentencePair {
        let headline = DependencyParse::new(vec![
            DepToken::new(1, "Storm", "storm", "NOUN", 2, "nsubj").with_feats("Number=Sing"),
            DepToken::new(2, "hits", "hit", "VERB", 0, "root").with_feats("Tense=Pres|VerbForm=Fin"),
            DepToken::new(3, "coast", "coast", "NOUN", 2, "obj").with_feats("Number=Sing"),
        ]);
        let canonical = DependencyParse::new(vec![
            DepToken::new(1, "A", "a", "DET", 2, "det").with_feats("Definite=Ind"),
            DepToken::new(2, "storm", "storm", "NOUN", 3, "nsubj").with_feats("Number=Sing"),
            DepToken::new(3, "hit", "hit", "VERB", 0, "root").with_feats("Tense=Past|VerbForm=Fin"),
            DepToken::new(4, "the", "the", "DET", 5, "det").with_feats("Definite=Def"),
            DepToken::new(5, "coast", "coast", "NOUN", 3, "obj").with_feats("Number=Sing"),
            DepToken::new(6, ".", ".", "PUNCT", 3, "punct"),
        ]);
        SentencePair {
            corpus_id: "wire".to_string(),
            sentence_id: "s1".to_string(),
            headline: ParsedSentence::new(headline, None),
            canonical: ParsedSentence::new(canonical, None),
        }
    }

    fn events() -> Vec<DifferenceEvent> {
        let pair = pair();
        let alignment = Aligner::default().align(&pair.headline.dependency, &pair.canonical.dependency);
        Comparator::new(&FeatureSchema::standard()).compare(&pair, &alignment)
    }

    fn find<'a>(events: &'a [DifferenceEvent], feature: &str, canonical: Option<usize>) -> Option<&'a DifferenceEvent> {
        events.iter().find(|e| e.feature_id == feature && e.canonical_index == canonical)
    }

    #[test]
    fn modification_on_aligned_tokens() {
        let events = events();
        let tense = find(&events, "Tense", Some(2)).unwrap();
        assert_eq!(tense.headline_index, Some(1));
        assert_eq!(tense.headline_value, FeatureValue::categorical("Pres"));
        assert_eq!(tense.canonical_value, FeatureValue::categorical("Past"));
        assert_eq!(tense.origin, ParseOrigin::Dependency);
        assert_eq!(&*tense.headline_text, "Storm hits coast");
    }

    #[test]
    fn insertions_compare_against_absent() {
        let events = events();
        let the = find(&events, "Definite", Some(3)).unwrap();
        assert!(the.is_insertion());
        assert_eq!(the.headline_value, FeatureValue::Absent);
        assert_eq!(the.canonical_value, FeatureValue::categorical("Def"));

        let has_det = find(&events, "has_det", Some(4)).unwrap();
        assert_eq!(has_det.headline_value, FeatureValue::categorical("no"));
        assert_eq!(has_det.canonical_value, FeatureValue::categorical("yes"));
    }

    #[test]
    fn equal_values_produce_no_event() {
        let events = events();
        assert!(find(&events, "Number", Some(1)).is_none());
        assert!(find(&events, "VerbForm", Some(2)).is_none());
    }

    #[test]
    fn sentence_features_anchor_on_roots() {
        let events = events();
        let count = events.iter().find(|e| e.feature_id == "token_count").unwrap();
        assert_eq!(count.headline_value, FeatureValue::Numeric(3));
        assert_eq!(count.canonical_value, FeatureValue::Numeric(6));
        assert_eq!(count.headline_index, Some(1));
        assert_eq!(count.canonical_index, Some(2));

        // Neither side has a constituency tree: both ABSENT, no event.
        assert!(events.iter().all(|e| e.feature_id != "tree_depth"));
    }

    #[test]
    fn deletion_reports_absent_canonical_value() {
        let mut pair = pair();
        pair.canonical.dependency.tokens.truncate(3);
        pair.canonical.dependency.tokens[2].head = 0;
        let schema =
            FeatureSchema::new(vec![feature!(id: "upos", category: Lexical, scope: Token, extract: Extraction::Upos)]);
        let alignment = Aligner::default().align(&pair.headline.dependency, &pair.canonical.dependency);
        let events = Comparator::new(&schema).compare(&pair, &alignment);

        let deleted = events.iter().find(|e| e.is_deletion()).unwrap();
        assert_eq!(deleted.headline_index, Some(2));
        assert_eq!(deleted.headline_value, FeatureValue::categorical("NOUN"));
        assert_eq!(deleted.canonical_value, FeatureValue::Absent);
    }
}
