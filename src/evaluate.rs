//! Evaluation.
//!
//! Runs a [`TransformationEngine`] over enhanced events and folds the results
//! into coverage and accuracy figures, overall, per tier and per feature.
//!
//! The parallel path is a map-reduce: the engine is shared by reference across
//! rayon workers, each worker folds a private [`Tally`], and the tallies are
//! merged pairwise. Rayon's reduce keeps the input order, so both paths return
//! the same results in the same order.

use crate::engine::{EngineStats, StatsDelta, TransformationEngine, TransformationResult};
use crate::enrich::EnhancedDifferenceEvent;
use crate::rules::Tier;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSummary {
    pub tier: Tier,
    pub hits: usize,
    pub correct: usize,
    pub accuracy_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    pub feature_id: String,
    pub total: usize,
    pub covered: usize,
    pub correct: usize,
    pub accuracy_pct: f64,
    pub coverage_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub total: usize,
    pub covered: usize,
    pub correct: usize,
    pub accuracy_pct: f64,
    pub coverage_pct: f64,
    pub by_tier: Vec<TierSummary>,
    pub by_feature: Vec<FeatureSummary>,
    #[serde(skip)]
    pub stats: EngineStats,
    pub results: Vec<TransformationResult>,
}

/// Partial evaluation state of one worker.
#[derive(Debug, Default)]
struct Tally {
    overall: EngineStats,
    by_feature: BTreeMap<String, EngineStats>,
    results: Vec<TransformationResult>,
}

impl Tally {
    fn push(mut self, (result, delta): (TransformationResult, StatsDelta)) -> Self {
        self.overall.record(delta);
        self.by_feature.entry(result.feature_id.clone()).or_default().record(delta);
        self.results.push(result);
        self
    }

    fn merge(mut self, other: Tally) -> Self {
        self.overall.merge(&other.overall);
        for (feature, stats) in other.by_feature {
            self.by_feature.entry(feature).or_default().merge(&stats);
        }
        self.results.extend(other.results);
        self
    }

    fn into_report(self) -> EvaluationReport {
        let stats = self.overall;
        let by_tier = Tier::ALL
            .iter()
            .map(|&tier| TierSummary {
                tier,
                hits: stats.hits(tier),
                correct: stats.correct_in(tier),
                accuracy_pct: stats.tier_accuracy(tier) * 100.0,
            })
            .collect();
        let by_feature = self
            .by_feature
            .into_iter()
            .map(|(feature_id, s)| FeatureSummary {
                feature_id,
                total: s.total,
                covered: s.covered(),
                correct: s.correct,
                accuracy_pct: s.accuracy_pct(),
                coverage_pct: s.coverage_pct(),
            })
            .collect();

        EvaluationReport {
            total: stats.total,
            covered: stats.covered(),
            correct: stats.correct,
            accuracy_pct: stats.accuracy_pct(),
            coverage_pct: stats.coverage_pct(),
            by_tier,
            by_feature,
            stats,
            results: self.results,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'e> {
    engine: &'e TransformationEngine,
    parallel: bool,
}

impl<'e> Evaluator<'e> {
    pub fn new(engine: &'e TransformationEngine) -> Self {
        Evaluator { engine, parallel: true }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn evaluate(&self, events: &[EnhancedDifferenceEvent]) -> EvaluationReport {
        let engine = self.engine;
        let tally = if self.parallel {
            events
                .par_iter()
                .map(|event| engine.apply(event))
                .fold(Tally::default, Tally::push)
                .reduce(Tally::default, Tally::merge)
        } else {
            events.iter().map(|event| engine.apply(event)).fold(Tally::default(), Tally::push)
        };

        let report = tally.into_report();
        tracing::debug!(
            total = report.total,
            accuracy = report.accuracy_pct,
            coverage = report.coverage_pct,
            parallel = self.parallel,
            "evaluated rules"
        );
        report
    }
}
