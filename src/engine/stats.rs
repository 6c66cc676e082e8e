//! Engine statistics.
//!
//! [`TransformationEngine::apply`](super::TransformationEngine::apply) never
//! touches counters itself; it returns a [`StatsDelta`] that the caller folds
//! into an [`EngineStats`] it owns. Partial stats from different workers are
//! combined with [`EngineStats::merge`], which is associative and commutative.

use crate::rules::{TIER_COUNT, Tier};
use serde::Serialize;

/// What one application contributes to the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsDelta {
    pub tier: Tier,
    pub correct: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    tier_hits: [usize; TIER_COUNT],
    tier_correct: [usize; TIER_COUNT],
}

impl EngineStats {
    pub fn record(&mut self, delta: StatsDelta) {
        self.total += 1;
        self.tier_hits[delta.tier.index()] += 1;
        if delta.correct {
            self.correct += 1;
            self.tier_correct[delta.tier.index()] += 1;
        } else {
            self.incorrect += 1;
        }
    }

    pub fn merge(&mut self, other: &EngineStats) {
        self.total += other.total;
        self.correct += other.correct;
        self.incorrect += other.incorrect;
        for i in 0..TIER_COUNT {
            self.tier_hits[i] += other.tier_hits[i];
            self.tier_correct[i] += other.tier_correct[i];
        }
    }

    pub fn hits(&self, tier: Tier) -> usize {
        self.tier_hits[tier.index()]
    }

    pub fn correct_in(&self, tier: Tier) -> usize {
        self.tier_correct[tier.index()]
    }

    /// Events answered by a rule (anything but NoMatch).
    pub fn covered(&self) -> usize {
        self.total - self.hits(Tier::NoMatch)
    }

    /// Correct predictions over all events, 0.0 when empty.
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }

    pub fn coverage(&self) -> f64 {
        ratio(self.covered(), self.total)
    }

    pub fn tier_accuracy(&self, tier: Tier) -> f64 {
        ratio(self.correct_in(tier), self.hits(tier))
    }

    pub fn accuracy_pct(&self) -> f64 {
        self.accuracy() * 100.0
    }

    pub fn coverage_pct(&self) -> f64 {
        self.coverage() * 100.0
    }
}

impl Extend<StatsDelta> for EngineStats {
    fn extend<I: IntoIterator<Item = StatsDelta>>(&mut self, iter: I) {
        for delta in iter {
            self.record(delta);
        }
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(deltas: &[(Tier, bool)]) -> EngineStats {
        let mut stats = EngineStats::default();
        stats.extend(deltas.iter().map(|&(tier, correct)| StatsDelta { tier, correct }));
        stats
    }

    #[test]
    fn accuracy_and_coverage() {
        let s = stats(&[(Tier::Lexical, true), (Tier::Lexical, false), (Tier::Default, true), (Tier::NoMatch, false)]);
        assert_eq!(s.total, 4);
        assert_eq!(s.hits(Tier::Lexical), 2);
        assert_eq!(s.covered(), 3);
        assert_eq!(s.accuracy(), 0.5);
        assert_eq!(s.coverage_pct(), 75.0);
        assert_eq!(s.tier_accuracy(Tier::Lexical), 0.5);
        assert_eq!(s.tier_accuracy(Tier::Syntactic), 0.0);
    }

    #[test]
    fn merge_equals_sequential_fold() {
        let all = [(Tier::Lexical, true), (Tier::Syntactic, false), (Tier::NoMatch, false), (Tier::Default, true)];
        let mut left = stats(&all[..2]);
        left.merge(&stats(&all[2..]));
        assert_eq!(left, stats(&all));
    }

    #[test]
    fn empty_stats_are_zero() {
        let s = EngineStats::default();
        assert_eq!(s.accuracy(), 0.0);
        assert_eq!(s.coverage(), 0.0);
    }
}
