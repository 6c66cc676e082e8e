//! The tier walk.
//!
//! For each event the engine builds a [`RuleQuery`] from the headline side and
//! tries the tiers in a fixed order. The first tier that yields a prediction
//! produces the result; later tiers are never consulted.
//!
//! ```text
//! Lexical ─────── hit ─▶ result
//!   │ miss
//! Morphological ─ hit ─▶ result
//!   │ miss
//! Syntactic ───── hit (backoff) ─▶ result
//!   │ miss
//! Default ─────── hit ─▶ result
//!   │ miss
//! NoMatch ──────────────▶ headline value
//! ```
//!
//! NoMatch is the identity: the predicted value is the headline value.

use super::index::RuleIndex;
use super::keys::{LexicalKey, MorphologicalKey, SyntacticKey};
use super::select::best;
use super::stats::{EngineStats, StatsDelta};
use crate::enrich::EnhancedDifferenceEvent;
use crate::rules::{Prediction, RuleQuery, RuleSet, Tier};
use crate::value::FeatureValue;
use serde::Serialize;

/// One prediction, checked against the observed canonical value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformationResult {
    pub feature_id: String,
    pub headline_value: FeatureValue,
    pub predicted_value: FeatureValue,
    pub actual_value: FeatureValue,
    pub tier: Tier,
    pub rule_id: Option<String>,
    pub confidence: f64,
    pub matched: bool,
}

/// Read-only rule index plus the tier walk.
///
/// Usage: build once with [`TransformationEngine::new`], then call
/// [`apply`](Self::apply) per event and fold the returned deltas.
#[derive(Debug, Clone, Default)]
pub struct TransformationEngine {
    index: RuleIndex,
}

impl TransformationEngine {
    pub fn new(rules: RuleSet) -> Self {
        let index = RuleIndex::new(rules);
        tracing::debug!(rules = index.len(), "built rule index");
        TransformationEngine { index }
    }

    pub fn index(&self) -> &RuleIndex {
        &self.index
    }

    /// First prediction in tier order, or `None` for NoMatch.
    pub fn predict<'e>(&'e self, query: &RuleQuery<'_>) -> Option<Prediction<'e>> {
        let index = &self.index;

        let lexical = LexicalKey::from_query(query).and_then(|key| index.lexical.get(&key));
        if let Some(found) = lexical.and_then(|bucket| best(bucket, query)) {
            return Some(found);
        }
        trace_miss(Tier::Lexical, query);

        let morphological = MorphologicalKey::from_query(query).and_then(|key| index.morphological.get(&key));
        if let Some(found) = morphological.and_then(|bucket| best(bucket, query)) {
            return Some(found);
        }
        trace_miss(Tier::Morphological, query);

        let syntactic = SyntacticKey::backoff(query)
            .iter()
            .filter_map(|key| index.syntactic.get(key))
            .find_map(|bucket| best(bucket, query));
        if let Some(found) = syntactic {
            return Some(found);
        }
        trace_miss(Tier::Syntactic, query);

        let default = index.default.get(query.feature).and_then(|bucket| best(bucket, query));
        if default.is_none() {
            trace_miss(Tier::Default, query);
        }
        default
    }

    /// Predict the canonical value of `event` and score it against the observed one.
    pub fn apply(&self, event: &EnhancedDifferenceEvent) -> (TransformationResult, StatsDelta) {
        self.apply_query(&RuleQuery::from_event(event), &event.event.canonical_value)
    }

    pub fn apply_query(&self, query: &RuleQuery<'_>, actual: &FeatureValue) -> (TransformationResult, StatsDelta) {
        let (predicted, tier, rule_id, confidence) = match self.predict(query) {
            Some(p) => (p.value.clone(), p.tier, Some(p.rule_id.to_string()), p.confidence),
            None => (query.headline_value.clone(), Tier::NoMatch, None, 0.0),
        };
        let matched = &predicted == actual;

        let result = TransformationResult {
            feature_id: query.feature.to_string(),
            headline_value: query.headline_value.clone(),
            predicted_value: predicted,
            actual_value: actual.clone(),
            tier,
            rule_id,
            confidence,
            matched,
        };
        (result, StatsDelta { tier, correct: matched })
    }

    /// Apply every event, folding the deltas into `stats`.
    pub fn apply_all<'a>(
        &self,
        events: impl IntoIterator<Item = &'a EnhancedDifferenceEvent>,
        stats: &mut EngineStats,
    ) -> Vec<TransformationResult> {
        events
            .into_iter()
            .map(|event| {
                let (result, delta) = self.apply(event);
                stats.record(delta);
                result
            })
            .collect()
    }
}

fn trace_miss(tier: Tier, query: &RuleQuery<'_>) {
    tracing::trace!(tier = tier.name(), feature = query.feature, upos = %query.upos, "tier missed, falling through");
}
