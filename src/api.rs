use crate::align::{Aligner, AlignerConfig};
use crate::compare::Comparator;
use crate::engine::TransformationEngine;
use crate::enrich::{ContextEnricher, EnhancedDifferenceEvent};
use crate::error::InputError;
use crate::evaluate::{EvaluationReport, Evaluator};
use crate::input::{Corpus, SentencePair};
use crate::rules::{RuleExtractor, RuleSet, Thresholds};
use crate::schema::FeatureSchema;
use crate::systematicity::{SystematicityAnalyzer, SystematicityReport};
use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Options of the per-pair stages (alignment, comparison, enrichment).
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub aligner: AlignerConfig,
    pub schema: FeatureSchema,
    /// Process sentence pairs on the rayon thread pool.
    pub parallel: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        AnalyzeOptions { aligner: AlignerConfig::default(), schema: FeatureSchema::standard(), parallel: true }
    }
}

/// A sentence pair left out of the analysis because its input was malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPair {
    pub corpus_id: String,
    pub sentence_id: String,
    pub reason: String,
}

/// Result of [`analyze`] and [`analyze_with`].
#[derive(Debug, Clone)]
pub struct CorpusAnalysis {
    /// Enhanced events of every well-formed pair, in corpus order.
    pub events: Vec<EnhancedDifferenceEvent>,
    pub skipped: Vec<SkippedPair>,
    /// Number of pairs in the corpus, skipped ones included.
    pub pairs: usize,
}

impl CorpusAnalysis {
    pub fn analyzed(&self) -> usize {
        self.pairs - self.skipped.len()
    }
}

/// Wall-clock time of each pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    pub analyze: Duration,
    pub systematicity: Duration,
    pub extract: Duration,
    pub evaluate: Duration,
    pub total: Duration,
}

/// Everything [`run`] produces.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub analysis: CorpusAnalysis,
    pub systematicity: SystematicityReport,
    pub rules: RuleSet,
    pub evaluation: EvaluationReport,
    pub timings: StageTimings,
}

/// Per-pair stages, built once per corpus.
struct PairStages<'o> {
    aligner: Aligner,
    comparator: Comparator<'o>,
    enricher: ContextEnricher,
}

impl<'o> PairStages<'o> {
    fn new(options: &'o AnalyzeOptions) -> Self {
        PairStages {
            aligner: Aligner::new(options.aligner),
            comparator: Comparator::new(&options.schema),
            enricher: ContextEnricher::new(),
        }
    }

    fn run(&self, pair: &SentencePair) -> Result<Vec<EnhancedDifferenceEvent>, InputError> {
        pair.validate()?;
        let alignment = self.aligner.align(&pair.headline.dependency, &pair.canonical.dependency);
        let events = self.comparator.compare(pair, &alignment);
        Ok(self.enricher.enrich(pair, &alignment, events))
    }

    fn run_or_skip(&self, pair: &SentencePair) -> Result<Vec<EnhancedDifferenceEvent>, SkippedPair> {
        self.run(pair).map_err(|err| {
            tracing::warn!(
                corpus = %pair.corpus_id,
                sentence = %pair.sentence_id,
                error = %err,
                "skipping malformed sentence pair"
            );
            SkippedPair {
                corpus_id: pair.corpus_id.clone(),
                sentence_id: pair.sentence_id.clone(),
                reason: err.to_string(),
            }
        })
    }
}

/// Align, compare and enrich every pair of `corpus` with default options.
///
/// # Example
/// ```
/// use regshift::{Corpus, analyze};
///
/// let analysis = analyze(&Corpus::default());
/// assert!(analysis.events.is_empty());
/// assert_eq!(analysis.pairs, 0);
/// ```
pub fn analyze(corpus: &Corpus) -> CorpusAnalysis {
    analyze_with(corpus, &AnalyzeOptions::default())
}

/// Align, compare and enrich every pair of `corpus`.
///
/// Malformed pairs are skipped and listed in [`CorpusAnalysis::skipped`]; the
/// analysis itself never fails. The parallel and sequential paths produce the
/// same events in the same order.
pub fn analyze_with(corpus: &Corpus, options: &AnalyzeOptions) -> CorpusAnalysis {
    let stages = PairStages::new(options);
    let outcomes: Vec<Result<Vec<EnhancedDifferenceEvent>, SkippedPair>> = if options.parallel {
        corpus.pairs.par_iter().map(|pair| stages.run_or_skip(pair)).collect()
    } else {
        corpus.pairs.iter().map(|pair| stages.run_or_skip(pair)).collect()
    };

    let mut analysis = CorpusAnalysis { events: Vec::new(), skipped: Vec::new(), pairs: corpus.pairs.len() };
    for outcome in outcomes {
        match outcome {
            Ok(events) => analysis.events.extend(events),
            Err(skipped) => analysis.skipped.push(skipped),
        }
    }
    analysis
}

/// Align, compare and enrich a single pair.
pub fn analyze_pair(pair: &SentencePair, options: &AnalyzeOptions) -> Result<Vec<EnhancedDifferenceEvent>, InputError> {
    PairStages::new(options).run(pair)
}

/// Systematicity analysis followed by rule extraction.
pub fn mine(events: &[EnhancedDifferenceEvent], thresholds: Thresholds) -> (SystematicityReport, RuleSet) {
    let report = SystematicityAnalyzer::new().analyze(events);
    let rules = RuleExtractor::new(thresholds).extract(&report);
    (report, rules)
}

/// Evaluate `engine` against the events of an analyzed corpus.
pub fn evaluate_corpus(engine: &TransformationEngine, analysis: &CorpusAnalysis, parallel: bool) -> EvaluationReport {
    Evaluator::new(engine).parallel(parallel).evaluate(&analysis.events)
}

/// The whole pipeline: analyze, mine rules, then evaluate them on the same corpus.
pub fn run(corpus: &Corpus, options: &AnalyzeOptions, thresholds: Thresholds) -> PipelineRun {
    let started = Instant::now();

    let analysis = analyze_with(corpus, options);
    let analyzed_at = Instant::now();

    let systematicity = SystematicityAnalyzer::new().analyze(&analysis.events);
    let analyzed_patterns_at = Instant::now();

    let rules = RuleExtractor::new(thresholds).extract(&systematicity);
    let extracted_at = Instant::now();

    let engine = TransformationEngine::new(rules.clone());
    let evaluation = evaluate_corpus(&engine, &analysis, options.parallel);
    let finished = Instant::now();

    let timings = StageTimings {
        analyze: analyzed_at - started,
        systematicity: analyzed_patterns_at - analyzed_at,
        extract: extracted_at - analyzed_patterns_at,
        evaluate: finished - extracted_at,
        total: finished - started,
    };

    if !analysis.skipped.is_empty() {
        tracing::warn!(skipped = analysis.skipped.len(), pairs = analysis.pairs, "some sentence pairs were skipped");
    }

    PipelineRun { analysis, systematicity, rules, evaluation, timings }
}
