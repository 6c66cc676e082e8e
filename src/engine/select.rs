//! Candidate selection inside one bucket.
//!
//! Buckets usually hold one rule, but a hand-edited or merged rule set can put
//! several rules under the same key. The winner is the matching rule with the
//! highest confidence, then the highest frequency, then the smallest rule id.

use crate::rules::{Prediction, Rule, RuleQuery};
use std::cmp::Ordering;

pub(crate) fn best<'r>(bucket: &'r [Rule], query: &RuleQuery<'_>) -> Option<Prediction<'r>> {
    bucket.iter().filter_map(|rule| rule.matches(query)).min_by(rank)
}

/// `Less` means `a` wins.
fn rank(a: &Prediction<'_>, b: &Prediction<'_>) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.frequency.cmp(&a.frequency))
        .then_with(|| a.rule_id.cmp(b.rule_id))
}
