//! Headline-to-canonical register transformation rules.
//!
//! `regshift` learns how linguistic features change when a headline
//! ("Govt announces policy") is expanded into its canonical sentence ("The
//! government has announced a policy"), and predicts those changes with a
//! tiered rule engine.
//!
//! ```text
//! SentencePair ─▶ Aligner ─▶ Comparator ─▶ ContextEnricher ─┐   (per pair, parallel)
//!                                                           v
//!                 SystematicityAnalyzer ─▶ RuleExtractor ─▶ TransformationEngine ─▶ Evaluator
//! ```
//!
//! The usual entry points are [`analyze`], [`mine`] and [`run`]; each stage is
//! also usable on its own.

#[macro_use]
mod macros;

mod align;
mod api;
mod compare;
mod context;
mod engine;
mod enrich;
mod error;
mod evaluate;
mod input;
mod punctuation;
mod rules;
mod schema;
mod signature;
mod systematicity;
mod value;

#[cfg(test)]
mod scenarios;

pub use align::{Aligner, AlignerConfig, Alignment, CostMatrix, assign};
pub use api::{
    AnalyzeOptions, CorpusAnalysis, PipelineRun, SkippedPair, StageTimings, analyze, analyze_pair, analyze_with,
    evaluate_corpus, mine, run,
};
pub use compare::{Comparator, DifferenceEvent};
pub use context::{ContextFlags, PositionCategory, TokenContext};
pub use engine::{EngineStats, RuleIndex, StatsDelta, TransformationEngine, TransformationResult};
pub use enrich::{ChangeKind, ContextEnricher, ContextWindow, EnhancedDifferenceEvent};
pub use error::{ConfigError, InputError};
pub use evaluate::{EvaluationReport, Evaluator, FeatureSummary, TierSummary};
pub use input::{
    ConstituencyTree, Corpus, DepToken, DependencyParse, ParsedSentence, PhrasePlacement, SentencePair, TreeNode,
    parse_feats,
};
pub use punctuation::{Substitution, SubstitutionDirection, detect as detect_substitution, known_marks};
pub use rules::{Prediction, Rule, RuleExtractor, RuleKind, RuleQuery, RuleSet, TIER_COUNT, Thresholds, Tier};
pub use schema::{
    CustomExtraction, Extraction, ExtractionSite, FeatureCategory, FeatureDef, FeatureSchema, FeatureScope,
    ParseOrigin, Side, ValueDomain,
};
pub use signature::{ContextSignature, Granularity};
pub use systematicity::{
    GranularityPoint, LevelReport, MorphologyPattern, RulePattern, SystematicityAnalyzer, SystematicityReport,
    ValueDistribution,
};
pub use value::FeatureValue;
