//! Shared fixtures and end-to-end scenarios.

use crate::compare::DifferenceEvent;
use crate::context::{PositionCategory, TokenContext};
use crate::enrich::{ChangeKind, ContextWindow, EnhancedDifferenceEvent};
use crate::input::{ConstituencyTree, DepToken, DependencyParse, ParsedSentence, SentencePair};
use crate::rules::{RuleExtractor, RuleQuery, RuleSet, Thresholds, Tier};
use crate::schema::{FeatureCategory, FeatureScope, ParseOrigin};
use crate::signature::{ContextSignature, Granularity};
use crate::systematicity::SystematicityAnalyzer;
use crate::value::FeatureValue;
use crate::{Aligner, AnalyzeOptions, Corpus, TransformationEngine, analyze_with};
use std::sync::Arc;

const MORPHOLOGICAL: &[&str] = &["Definite", "Number", "Tense", "VerbForm", "Mood", "Person"];

pub(crate) fn value(s: &str) -> FeatureValue {
    FeatureValue::categorical(s)
}

/// An enhanced event whose headline token is a root `upos` with lemma `lemma`, in medial position.
pub(crate) fn synthetic_event(
    feature: &str,
    lemma: &str,
    upos: &str,
    headline: &str,
    canonical: &str,
) -> EnhancedDifferenceEvent {
    let category =
        if MORPHOLOGICAL.contains(&feature) { FeatureCategory::Morphological } else { FeatureCategory::Lexical };
    let headline_context = TokenContext {
        index: Some(1),
        form: value(lemma),
        lemma: value(lemma),
        upos: value(upos),
        deprel: value("root"),
        position: Some(PositionCategory::Medial),
        ..TokenContext::default()
    };
    let headline_value = FeatureValue::from_field(headline);
    let canonical_value = FeatureValue::from_field(canonical);

    EnhancedDifferenceEvent {
        change: ChangeKind::classify(&headline_value, &canonical_value),
        signatures: ContextSignature::all(&headline_context),
        event: DifferenceEvent {
            corpus_id: Arc::from("synthetic"),
            sentence_id: Arc::from("0"),
            origin: ParseOrigin::Dependency,
            feature_id: feature.to_string(),
            category,
            scope: FeatureScope::Token,
            canonical_value,
            headline_value,
            headline_index: Some(1),
            canonical_index: Some(1),
            headline_text: Arc::from(""),
            canonical_text: Arc::from(""),
        },
        headline_context,
        canonical_context: TokenContext::absent(),
        window: ContextWindow::default(),
    }
}

/// "govt announces policy" / "the government has announced a policy".
pub(crate) fn govt_pair(id: &str) -> SentencePair {
    let headline = DependencyParse::new(vec![
        DepToken::new(1, "govt", "govt", "NOUN", 2, "nsubj").with_feats("Number=Sing"),
        DepToken::new(2, "announces", "announce", "VERB", 0, "root")
            .with_feats("Mood=Ind|Number=Sing|Person=3|Tense=Pres|VerbForm=Fin"),
        DepToken::new(3, "policy", "policy", "NOUN", 2, "obj").with_feats("Number=Sing"),
    ]);
    let canonical = DependencyParse::new(vec![
        DepToken::new(1, "the", "the", "DET", 2, "det").with_feats("Definite=Def|PronType=Art"),
        DepToken::new(2, "government", "government", "NOUN", 4, "nsubj").with_feats("Number=Sing"),
        DepToken::new(3, "has", "have", "AUX", 4, "aux")
            .with_feats("Mood=Ind|Number=Sing|Person=3|Tense=Pres|VerbForm=Fin"),
        DepToken::new(4, "announced", "announce", "VERB", 0, "root").with_feats("Tense=Past|VerbForm=Part"),
        DepToken::new(5, "a", "a", "DET", 6, "det").with_feats("Definite=Ind|PronType=Art"),
        DepToken::new(6, "policy", "policy", "NOUN", 4, "obj").with_feats("Number=Sing"),
    ]);
    let headline_tree = "(S (NP (NN govt)) (VP (VBZ announces) (NP (NN policy))))";
    let canonical_tree =
        "(ROOT (S (NP (DT the) (NN government)) (VP (VBZ has) (VP (VBN announced) (NP (DT a) (NN policy))))))";
    pair(id, headline, headline_tree, canonical, canonical_tree)
}

/// "Storm hits coast" / "A storm hit the coast ."
pub(crate) fn storm_pair(id: &str) -> SentencePair {
    let headline = DependencyParse::new(vec![
        DepToken::new(1, "Storm", "storm", "NOUN", 2, "nsubj").with_feats("Number=Sing"),
        DepToken::new(2, "hits", "hit", "VERB", 0, "root").with_feats("Tense=Pres|VerbForm=Fin"),
        DepToken::new(3, "coast", "coast", "NOUN", 2, "obj").with_feats("Number=Sing"),
    ]);
    let canonical = DependencyParse::new(vec![
        DepToken::new(1, "A", "a", "DET", 2, "det").with_feats("Definite=Ind|PronType=Art"),
        DepToken::new(2, "storm", "storm", "NOUN", 3, "nsubj").with_feats("Number=Sing"),
        DepToken::new(3, "hit", "hit", "VERB", 0, "root").with_feats("Tense=Past|VerbForm=Fin"),
        DepToken::new(4, "the", "the", "DET", 5, "det").with_feats("Definite=Def|PronType=Art"),
        DepToken::new(5, "coast", "coast", "NOUN", 3, "obj").with_feats("Number=Sing"),
        DepToken::new(6, ".", ".", "PUNCT", 3, "punct"),
    ]);
    let headline_tree = "(S (NP (NN Storm)) (VP (VBZ hits) (NP (NN coast))))";
    let canonical_tree = "(S (NP (DT A) (NN storm)) (VP (VBD hit) (NP (DT the) (NN coast))) (. .))";
    pair(id, headline, headline_tree, canonical, canonical_tree)
}

fn pair(
    id: &str,
    headline: DependencyParse,
    headline_tree: &str,
    canonical: DependencyParse,
    canonical_tree: &str,
) -> SentencePair {
    SentencePair {
        corpus_id: "wire".to_string(),
        sentence_id: id.to_string(),
        headline: ParsedSentence::new(headline, Some(ConstituencyTree::parse(headline_tree).unwrap())),
        canonical: ParsedSentence::new(canonical, Some(ConstituencyTree::parse(canonical_tree).unwrap())),
    }
}

/// Deterministic pseudo-random numbers for corpus generation.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) % bound as u64) as usize
    }
}

fn random_events(seed: u64, count: usize) -> Vec<EnhancedDifferenceEvent> {
    let features = ["Tense", "Number", "has_det"];
    let lemmas = ["say", "win", "storm", "policy", "hit"];
    let upos = ["VERB", "NOUN", "PROPN"];
    let values = ["a", "b", "c"];
    let mut rng = Lcg(seed);
    (0..count)
        .map(|_| {
            let mut event = synthetic_event(
                features[rng.next(features.len())],
                lemmas[rng.next(lemmas.len())],
                upos[rng.next(upos.len())],
                values[rng.next(values.len())],
                values[rng.next(values.len())],
            );
            // Vary the syntactic slots too, so every level refines the previous one.
            event.headline_context.deprel = value(["root", "nsubj", "obj"][rng.next(3)]);
            event.headline_context.position = PositionCategory::of(rng.next(3), 3);
            event.signatures = ContextSignature::all(&event.headline_context);
            event
        })
        .collect()
}

#[test]
fn govt_alignment() {
    let pair = govt_pair("1");
    let alignment = Aligner::default().align(&pair.headline.dependency, &pair.canonical.dependency);

    let forms = |s: &ParsedSentence, i: usize| s.dependency.tokens[i].form.clone();
    let mapped: Vec<(String, String)> =
        alignment.pairs().map(|(h, c)| (forms(&pair.headline, h), forms(&pair.canonical, c))).collect();
    assert_eq!(
        mapped,
        vec![
            ("govt".to_string(), "government".to_string()),
            ("announces".to_string(), "announced".to_string()),
            ("policy".to_string(), "policy".to_string()),
        ]
    );

    let inserted: Vec<String> = alignment.insertions().into_iter().map(|c| forms(&pair.canonical, c)).collect();
    assert_eq!(inserted, vec!["the", "has", "a"]);
    assert!(alignment.deletions().is_empty());
    assert_eq!(alignment.headline_to_canonical.len(), 3);
}

#[test]
fn verb_form_threshold() {
    // 38 of 40 participles become finite: confidence 0.95, frequency 40.
    let mut events: Vec<EnhancedDifferenceEvent> =
        (0..38).map(|_| synthetic_event("VerbForm", "announce", "VERB", "Part", "Fin")).collect();
    events.extend((0..2).map(|_| synthetic_event("VerbForm", "announce", "VERB", "Part", "Ger")));
    let report = SystematicityAnalyzer::new().analyze(&events);

    let accepted = RuleExtractor::new(Thresholds::new(0.90, 10).unwrap()).extract(&report);
    let rule = &accepted.morphological[0];
    assert_eq!(rule.prediction, value("Fin"));
    assert_eq!(rule.confidence, 0.95);
    assert_eq!(rule.frequency, 40);

    let rejected = RuleExtractor::new(Thresholds::new(0.96, 10).unwrap()).extract(&report);
    assert!(rejected.morphological.is_empty());
}

#[test]
fn no_match_is_identity() {
    let engine = TransformationEngine::new(RuleSet::default());
    let cases = [("Tense", "Pres", "Past"), ("Definite", "_", "Def"), ("Number", "Sing", "_")];
    for (feature, headline, canonical) in cases {
        let event = synthetic_event(feature, "say", "VERB", headline, canonical);
        let (result, delta) = engine.apply(&event);
        assert_eq!(result.tier, Tier::NoMatch, "{feature}");
        assert_eq!(result.predicted_value, event.event.headline_value, "{feature}");
        assert!(!result.matched, "{feature}");
        assert!(!delta.correct);
    }
}

#[test]
fn lexical_tier_wins_over_syntactic() {
    let mut events: Vec<EnhancedDifferenceEvent> =
        (0..6).map(|_| synthetic_event("Tense", "say", "VERB", "Pres", "Past")).collect();
    events.extend((0..10).map(|_| synthetic_event("Tense", "win", "VERB", "Pres", "Fut")));
    let report = SystematicityAnalyzer::new().analyze(&events);
    let rules = RuleExtractor::new(Thresholds::new(0.0, 1).unwrap()).extract(&report);
    let engine = TransformationEngine::new(rules.clone());

    let event = synthetic_event("Tense", "say", "VERB", "Pres", "Past");
    let query = RuleQuery::from_event(&event);
    // Both tiers have a rule for this event, and they disagree.
    assert!(rules.syntactic.iter().any(|r| r.matches(&query).is_some_and(|p| *p.value == value("Fut"))));
    assert!(rules.lexical.iter().any(|r| r.matches(&query).is_some()));

    let (result, _) = engine.apply(&event);
    assert_eq!(result.tier, Tier::Lexical);
    assert_eq!(result.predicted_value, value("Past"));
}

#[test]
fn consistency_is_bounded_and_pure_iff_one_value() {
    let report = SystematicityAnalyzer::new().analyze(&random_events(7, 300));
    for level in &report.levels {
        for pattern in &level.patterns {
            assert!((0.0..=1.0).contains(&pattern.consistency));
            let distinct = pattern.distribution.iter().count();
            assert_eq!(pattern.consistency == 1.0, distinct == 1, "{}", pattern.signature);
        }
    }
}

#[test]
fn consistency_never_drops_as_granularity_narrows() {
    for seed in [1, 2, 3, 42] {
        let report = SystematicityAnalyzer::new().analyze(&random_events(seed, 200));
        for (feature, curve) in &report.feature_curves {
            assert_eq!(curve.len(), Granularity::ALL.len());
            for w in curve.windows(2) {
                assert!(w[1].mean_consistency >= w[0].mean_consistency, "{feature} seed {seed}: {curve:?}");
                assert!(w[1].groups >= w[0].groups);
            }
        }
    }
}

#[test]
fn mining_is_idempotent() {
    let report = SystematicityAnalyzer::new().analyze(&random_events(9, 250));
    let extractor = RuleExtractor::new(Thresholds::new(0.5, 2).unwrap());
    assert_eq!(extractor.extract(&report).to_json().unwrap(), extractor.extract(&report).to_json().unwrap());
}

#[test]
fn corpus_from_json_runs_end_to_end() {
    let corpus = Corpus { pairs: (0..4).map(|i| govt_pair(&i.to_string())).chain([storm_pair("s")]).collect() };
    let json = serde_json::to_string(&corpus).unwrap();
    let corpus = Corpus::from_json(&json).unwrap();
    assert_eq!(corpus.pairs[0].headline.constituency.as_ref().unwrap().top_label(), "S");

    let options = AnalyzeOptions { parallel: false, ..AnalyzeOptions::default() };
    let analysis = analyze_with(&corpus, &options);
    assert!(analysis.skipped.is_empty());

    // The inserted determiner before "government" is borrowed onto "govt".
    let definite = analysis
        .events
        .iter()
        .find(|e| e.event.feature_id == "Definite" && e.headline_context.lemma == value("govt"))
        .unwrap();
    assert_eq!(definite.change, ChangeKind::Addition);
    assert_eq!(definite.event.canonical_value, value("Def"));

    let (_, rules) = crate::mine(&analysis.events, Thresholds::new(0.8, 3).unwrap());
    let engine = TransformationEngine::new(rules);
    let (result, _) = engine.apply(definite);
    assert_ne!(result.tier, Tier::NoMatch);
    assert_eq!(result.predicted_value, value("Def"));
}
