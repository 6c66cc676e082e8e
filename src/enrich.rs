//! Context enrichment.
//!
//! Turns a [`DifferenceEvent`] into an [`EnhancedDifferenceEvent`]: both token
//! contexts, the change classification, a textual window on each side and the
//! five headline-side signatures.
//!
//! Signatures are computed from the headline context only, because that is
//! all a rule can see before the canonical sentence exists. An inserted token
//! has no headline anchor, so its headline context is borrowed from a nearby
//! headline token:
//!
//! ```text
//! 1. the headline counterpart of the canonical token's head
//! 2. the nearest aligned canonical token after it, mapped back to the headline
//! 3. the nearest aligned canonical token before it, mapped back
//! 4. otherwise an all-ABSENT context
//! ```

use crate::align::Alignment;
use crate::compare::DifferenceEvent;
use crate::context::TokenContext;
use crate::input::{ParsedSentence, SentencePair};
use crate::signature::{ContextSignature, Granularity};
use crate::value::FeatureValue;
use serde::{Deserialize, Serialize};

/// How a feature changes from headline to canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The headline value is ABSENT.
    Addition,
    /// The canonical value is ABSENT.
    Deletion,
    Modification,
}

impl ChangeKind {
    pub fn classify(headline: &FeatureValue, canonical: &FeatureValue) -> Self {
        if headline.is_absent() {
            ChangeKind::Addition
        } else if canonical.is_absent() {
            ChangeKind::Deletion
        } else {
            ChangeKind::Modification
        }
    }
}

/// Surface text around the event on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextWindow {
    pub radius: usize,
    pub headline: String,
    pub canonical: String,
}

#[derive(Debug, Clone)]
pub struct EnhancedDifferenceEvent {
    pub event: DifferenceEvent,
    pub headline_context: TokenContext,
    pub canonical_context: TokenContext,
    pub change: ChangeKind,
    pub window: ContextWindow,
    /// Headline-side signatures, coarsest first.
    pub signatures: [ContextSignature; 5],
}

impl EnhancedDifferenceEvent {
    pub fn signature(&self, granularity: Granularity) -> &ContextSignature {
        &self.signatures[granularity as usize]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextEnricher;

impl ContextEnricher {
    pub fn new() -> Self {
        ContextEnricher
    }

    pub fn enrich(
        &self,
        pair: &SentencePair,
        alignment: &Alignment,
        events: Vec<DifferenceEvent>,
    ) -> Vec<EnhancedDifferenceEvent> {
        events.into_iter().map(|event| self.enrich_event(pair, alignment, event)).collect()
    }

    pub fn enrich_event(
        &self,
        pair: &SentencePair,
        alignment: &Alignment,
        event: DifferenceEvent,
    ) -> EnhancedDifferenceEvent {
        let headline_anchor = event.headline_index.or_else(|| {
            let borrowed = event.canonical_index.and_then(|c| borrowed_anchor(pair, alignment, c));
            if borrowed.is_none() {
                tracing::debug!(feature = %event.feature_id, "no headline anchor for inserted token");
            }
            borrowed
        });

        let headline_context = context_at(&pair.headline, headline_anchor);
        let canonical_context = context_at(&pair.canonical, event.canonical_index);
        let radius = event.category.window();
        let window = ContextWindow {
            radius,
            headline: window_text(&pair.headline, headline_anchor, radius),
            canonical: window_text(&pair.canonical, event.canonical_index, radius),
        };

        EnhancedDifferenceEvent {
            change: ChangeKind::classify(&event.headline_value, &event.canonical_value),
            signatures: ContextSignature::all(&headline_context),
            event,
            headline_context,
            canonical_context,
            window,
        }
    }
}

/// Headline token standing in for canonical token `canonical`, which has no headline counterpart.
fn borrowed_anchor(pair: &SentencePair, alignment: &Alignment, canonical: usize) -> Option<usize> {
    let len = pair.canonical.dependency.len();
    pair.canonical
        .dependency
        .head_index(canonical)
        .and_then(|head| alignment.headline_for(head))
        .or_else(|| (canonical + 1..len).find_map(|c| alignment.headline_for(c)))
        .or_else(|| (0..canonical).rev().find_map(|c| alignment.headline_for(c)))
}

fn context_at(sentence: &ParsedSentence, index: Option<usize>) -> TokenContext {
    index.map(|i| TokenContext::build(sentence, i)).unwrap_or_else(TokenContext::absent)
}

fn window_text(sentence: &ParsedSentence, index: Option<usize>, radius: usize) -> String {
    let tokens = &sentence.dependency.tokens;
    let Some(index) = index.filter(|i| *i < tokens.len()) else {
        return String::new();
    };
    let start = index.saturating_sub(radius);
    let end = (index + radius + 1).min(tokens.len());
    tokens[start..end].iter().map(|t| t.form.as_str()).collect::<Vec<_>>().join(" ")
}
