//! Rule mining.
//!
//! [`RuleExtractor`] turns a [`SystematicityReport`] into a [`RuleSet`] of four
//! tiers, from most to least specific:
//!
//! | tier          | key                                   | source                       |
//! |---------------|---------------------------------------|------------------------------|
//! | lexical       | lemma, upos, feature                  | lexical-granularity groups   |
//! | morphological | upos, feature, headline value         | morphology table             |
//! | syntactic     | upos, feature, deprel?, position?     | syntactic groups, projected  |
//! | default       | feature                               | corpus-wide distribution     |
//!
//! A rule survives only if it clears both thresholds. Every tier is sorted by
//! frequency, then confidence, then key, so identical input always yields an
//! identical (and identically serialized) rule set.

use crate::context::PositionCategory;
use crate::enrich::EnhancedDifferenceEvent;
use crate::error::ConfigError;
use crate::signature::Granularity;
use crate::systematicity::{SystematicityReport, ValueDistribution};
use crate::value::FeatureValue;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;

pub const TIER_COUNT: usize = 5;

/// Where a prediction came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Lexical,
    Morphological,
    Syntactic,
    Default,
    NoMatch,
}

impl Tier {
    pub const ALL: [Tier; TIER_COUNT] =
        [Tier::Lexical, Tier::Morphological, Tier::Syntactic, Tier::Default, Tier::NoMatch];

    pub fn name(self) -> &'static str {
        match self {
            Tier::Lexical => "lexical",
            Tier::Morphological => "morphological",
            Tier::Syntactic => "syntactic",
            Tier::Default => "default",
            Tier::NoMatch => "no_match",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    fn id_prefix(self) -> &'static str {
        match self {
            Tier::Lexical => "L",
            Tier::Morphological => "M",
            Tier::Syntactic => "S",
            Tier::Default => "D",
            Tier::NoMatch => "N",
        }
    }
}

/// Rule-mining thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    min_confidence: f64,
    min_frequency: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds { min_confidence: 0.6, min_frequency: 2 }
    }
}

impl Thresholds {
    pub fn new(min_confidence: f64, min_frequency: usize) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(ConfigError::InvalidConfidence(min_confidence));
        }
        Ok(Thresholds { min_confidence, min_frequency })
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn min_frequency(&self) -> usize {
        self.min_frequency
    }

    pub fn accepts(&self, confidence: f64, frequency: usize) -> bool {
        confidence >= self.min_confidence && frequency >= self.min_frequency
    }
}

/// The key of a rule; the variant decides the tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum RuleKind {
    Lexical {
        lemma: String,
        upos: String,
        feature: String,
    },
    Morphological {
        upos: String,
        feature: String,
        headline_value: FeatureValue,
    },
    Syntactic {
        upos: String,
        feature: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deprel: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<PositionCategory>,
    },
    Default {
        feature: String,
    },
}

impl RuleKind {
    pub fn tier(&self) -> Tier {
        match self {
            RuleKind::Lexical { .. } => Tier::Lexical,
            RuleKind::Morphological { .. } => Tier::Morphological,
            RuleKind::Syntactic { .. } => Tier::Syntactic,
            RuleKind::Default { .. } => Tier::Default,
        }
    }

    pub fn feature(&self) -> &str {
        match self {
            RuleKind::Lexical { feature, .. }
            | RuleKind::Morphological { feature, .. }
            | RuleKind::Syntactic { feature, .. }
            | RuleKind::Default { feature } => feature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(flatten)]
    pub kind: RuleKind,
    pub prediction: FeatureValue,
    pub confidence: f64,
    pub frequency: usize,
}

/// What a rule is matched against: the headline side of one event.
#[derive(Debug, Clone, Copy)]
pub struct RuleQuery<'a> {
    pub feature: &'a str,
    pub lemma: &'a FeatureValue,
    pub upos: &'a FeatureValue,
    pub deprel: &'a FeatureValue,
    pub position: Option<PositionCategory>,
    pub headline_value: &'a FeatureValue,
}

impl<'a> RuleQuery<'a> {
    pub fn from_event(event: &'a EnhancedDifferenceEvent) -> Self {
        let ctx = &event.headline_context;
        RuleQuery {
            feature: &event.event.feature_id,
            lemma: &ctx.lemma,
            upos: &ctx.upos,
            deprel: &ctx.deprel,
            position: ctx.position,
            headline_value: &event.event.headline_value,
        }
    }
}

/// A rule's answer to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction<'r> {
    pub value: &'r FeatureValue,
    pub tier: Tier,
    pub rule_id: &'r str,
    pub confidence: f64,
    pub frequency: usize,
}

impl Rule {
    pub fn tier(&self) -> Tier {
        self.kind.tier()
    }

    /// The prediction of this rule if its key matches `query`.
    pub fn matches(&self, query: &RuleQuery<'_>) -> Option<Prediction<'_>> {
        let is = |value: &FeatureValue, expected: &str| value.as_str() == Some(expected);
        let hit = match &self.kind {
            RuleKind::Lexical { lemma, upos, feature } => {
                feature == query.feature && is(query.lemma, lemma) && is(query.upos, upos)
            }
            RuleKind::Morphological { upos, feature, headline_value } => {
                feature == query.feature && is(query.upos, upos) && headline_value == query.headline_value
            }
            RuleKind::Syntactic { upos, feature, deprel, position } => {
                feature == query.feature
                    && is(query.upos, upos)
                    && deprel.as_deref().is_none_or(|d| is(query.deprel, d))
                    && position.is_none_or(|p| query.position == Some(p))
            }
            RuleKind::Default { feature } => feature == query.feature,
        };

        hit.then_some(Prediction {
            value: &self.prediction,
            tier: self.tier(),
            rule_id: &self.id,
            confidence: self.confidence,
            frequency: self.frequency,
        })
    }
}

/// Rules partitioned by tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub lexical: Vec<Rule>,
    pub morphological: Vec<Rule>,
    pub syntactic: Vec<Rule>,
    pub default: Vec<Rule>,
}

impl RuleSet {
    pub fn len(&self) -> usize {
        self.lexical.len() + self.morphological.len() + self.syntactic.len() + self.default.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rules in tier order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.lexical.iter().chain(&self.morphological).chain(&self.syntactic).chain(&self.default)
    }

    pub fn tier(&self, tier: Tier) -> &[Rule] {
        match tier {
            Tier::Lexical => &self.lexical,
            Tier::Morphological => &self.morphological,
            Tier::Syntactic => &self.syntactic,
            Tier::Default => &self.default,
            Tier::NoMatch => &[],
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleExtractor {
    thresholds: Thresholds,
}

impl RuleExtractor {
    pub fn new(thresholds: Thresholds) -> Self {
        RuleExtractor { thresholds }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn extract(&self, report: &SystematicityReport) -> RuleSet {
        let rules = RuleSet {
            lexical: self.finish(Tier::Lexical, lexical_candidates(report)),
            morphological: self.finish(Tier::Morphological, morphological_candidates(report)),
            syntactic: self.finish(Tier::Syntactic, syntactic_candidates(report)),
            default: self.finish(Tier::Default, default_candidates(report)),
        };
        tracing::debug!(
            lexical = rules.lexical.len(),
            morphological = rules.morphological.len(),
            syntactic = rules.syntactic.len(),
            default = rules.default.len(),
            min_confidence = self.thresholds.min_confidence,
            min_frequency = self.thresholds.min_frequency,
            "extracted rules"
        );
        rules
    }

    /// Threshold, sort and number one tier.
    fn finish<D: Borrow<ValueDistribution>>(&self, tier: Tier, candidates: Vec<(RuleKind, D)>) -> Vec<Rule> {
        let mut rules: Vec<Rule> = candidates
            .into_iter()
            .filter_map(|(kind, dist)| {
                let dist: &ValueDistribution = dist.borrow();
                let (value, _) = dist.dominant()?;
                Some(Rule {
                    id: String::new(),
                    kind,
                    prediction: value.clone(),
                    confidence: dist.consistency(),
                    frequency: dist.total(),
                })
            })
            .filter(|r| self.thresholds.accepts(r.confidence, r.frequency))
            .collect();

        rules.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.prediction.cmp(&b.prediction))
        });
        for (n, rule) in rules.iter_mut().enumerate() {
            rule.id = format!("{}{}", tier.id_prefix(), n + 1);
        }
        rules
    }
}

fn categorical(slot: &Option<FeatureValue>) -> Option<&str> {
    slot.as_ref().and_then(FeatureValue::as_str).filter(|s| !s.is_empty())
}

fn lexical_candidates(report: &SystematicityReport) -> Vec<(RuleKind, &ValueDistribution)> {
    let Some(level) = report.level(Granularity::Lexical) else {
        return Vec::new();
    };
    level
        .patterns
        .iter()
        .filter_map(|p| {
            let lemma = categorical(&p.signature.lemma)?;
            let upos = p.signature.upos.as_str()?;
            let kind =
                RuleKind::Lexical { lemma: lemma.to_string(), upos: upos.to_string(), feature: p.feature_id.clone() };
            Some((kind, &p.distribution))
        })
        .collect()
}

fn morphological_candidates(report: &SystematicityReport) -> Vec<(RuleKind, &ValueDistribution)> {
    report
        .morphology
        .iter()
        .filter_map(|m| {
            let kind = RuleKind::Morphological {
                upos: m.upos.as_str()?.to_string(),
                feature: m.feature_id.clone(),
                headline_value: m.headline_value.clone(),
            };
            Some((kind, &m.distribution))
        })
        .collect()
}

/// Syntactic groups projected onto `(upos, feature, deprel?, position?)`.
///
/// Each group contributes to its full key and to every coarser key obtained by
/// dropping the deprel and/or the position, so lookups can back off.
fn syntactic_candidates(report: &SystematicityReport) -> Vec<(RuleKind, ValueDistribution)> {
    let Some(level) = report.level(Granularity::Syntactic) else {
        return Vec::new();
    };

    let mut merged: BTreeMap<RuleKind, ValueDistribution> = BTreeMap::new();
    for p in &level.patterns {
        let Some(upos) = p.signature.upos.as_str() else {
            continue;
        };
        let deprel = categorical(&p.signature.deprel);
        let position = categorical(&p.signature.position).and_then(PositionCategory::from_name);

        let mut shapes = vec![(deprel, position), (deprel, None), (None, position), (None, None)];
        shapes.sort_unstable();
        shapes.dedup();
        for (deprel, position) in shapes {
            let kind = RuleKind::Syntactic {
                upos: upos.to_string(),
                feature: p.feature_id.clone(),
                deprel: deprel.map(str::to_string),
                position,
            };
            merged.entry(kind).or_default().merge(&p.distribution);
        }
    }
    merged.into_iter().collect()
}

fn default_candidates(report: &SystematicityReport) -> Vec<(RuleKind, &ValueDistribution)> {
    report
        .feature_distributions
        .iter()
        .map(|(feature, dist)| (RuleKind::Default { feature: feature.clone() }, dist))
        .collect()
}
