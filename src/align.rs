//! Token alignment between a headline and its canonical sentence.
//!
//! Alignment is posed as an assignment problem. For `n` headline tokens and
//! `m` canonical tokens we build a square `k × k` matrix (`k = max(n, m)`):
//!
//! ```text
//!              canonical 0..m        padding
//!           ┌──────────────────┬────────────┐
//! headline  │ pair_cost(h, c)  │     C₀     │
//!   0..n    ├──────────────────┼────────────┤
//! padding   │       C₀         │     C₀     │
//!           └──────────────────┴────────────┘
//! ```
//!
//! and solve it with the Kuhn-Munkres (Hungarian) algorithm in `O(k³)`. A
//! solved pair is kept only if its cost is strictly below the no-match cost
//! `C₀`; everything else is reported as unmatched on its own side (a deletion
//! from the headline, or an insertion into the canonical sentence).
//!
//! Costs are scaled to integers before solving because the solver requires a
//! totally ordered weight type.

use crate::input::{DepToken, DependencyParse};
use pathfinding::kuhn_munkres::{Weights, kuhn_munkres_min};
use std::collections::BTreeSet;

/// Fixed-point scale used to turn `f64` costs into solver weights.
const COST_SCALE: f64 = 1000.0;

/// Weights of the alignment cost function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignerConfig {
    /// Penalty for differing lemmas. Dominates the other terms.
    pub lemma_weight: f64,
    pub pos_weight: f64,
    pub deprel_weight: f64,
    /// Multiplier of the Jaccard distance between morphological feature sets.
    pub morph_weight: f64,
    /// Cost of leaving a token unmatched (`C₀`).
    pub no_match_cost: f64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        AlignerConfig { lemma_weight: 1.0, pos_weight: 0.5, deprel_weight: 0.3, morph_weight: 0.2, no_match_cost: 1.1 }
    }
}

/// Square integer cost matrix handed to the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    size: usize,
    cells: Vec<i64>,
}

impl CostMatrix {
    fn filled(size: usize, value: i64) -> Self {
        CostMatrix { size, cells: vec![value; size * size] }
    }

    /// Build a square matrix from `f64` rows (shorter rows are padded with `pad`).
    pub fn from_costs(rows: &[Vec<f64>], pad: f64) -> Self {
        let size = rows.iter().map(Vec::len).max().unwrap_or(0).max(rows.len());
        let mut matrix = CostMatrix::filled(size, scale(pad));
        for (r, row) in rows.iter().enumerate() {
            for (c, cost) in row.iter().enumerate() {
                matrix.set(r, c, scale(*cost));
            }
        }
        matrix
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.cells[row * self.size + col]
    }

    fn set(&mut self, row: usize, col: usize, value: i64) {
        self.cells[row * self.size + col] = value;
    }

    /// Total cost of an assignment (`assignment[row] = column`).
    pub fn total(&self, assignment: &[usize]) -> i64 {
        assignment.iter().enumerate().map(|(r, &c)| self.get(r, c)).sum()
    }
}

impl Weights<i64> for CostMatrix {
    fn rows(&self) -> usize {
        self.size
    }

    fn columns(&self) -> usize {
        self.size
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.get(row, col)
    }

    fn neg(&self) -> Self {
        CostMatrix { size: self.size, cells: self.cells.iter().map(|v| -v).collect() }
    }
}

fn scale(cost: f64) -> i64 {
    (cost * COST_SCALE).round() as i64
}

/// Minimum-cost perfect assignment: `result[row]` is the column assigned to `row`.
pub fn assign(costs: &CostMatrix) -> Vec<usize> {
    if costs.size() == 0 {
        return Vec::new();
    }
    let (_, assignment) = kuhn_munkres_min(costs);
    assignment
}

/// A partial one-to-one mapping between headline and canonical tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// One entry per headline token (never dropped): its canonical partner, if any.
    pub headline_to_canonical: Vec<Option<usize>>,
    /// One entry per canonical token: its headline partner, if any.
    pub canonical_to_headline: Vec<Option<usize>>,
    /// Sum of the accepted pair costs.
    pub matched_cost: f64,
}

impl Alignment {
    fn unmatched(n: usize, m: usize) -> Self {
        Alignment { headline_to_canonical: vec![None; n], canonical_to_headline: vec![None; m], matched_cost: 0.0 }
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.headline_to_canonical.iter().enumerate().filter_map(|(h, c)| c.map(|c| (h, c)))
    }

    /// Canonical-only tokens (present in the full sentence, dropped by the headline).
    pub fn insertions(&self) -> Vec<usize> {
        self.canonical_to_headline.iter().enumerate().filter(|(_, h)| h.is_none()).map(|(c, _)| c).collect()
    }

    /// Headline-only tokens.
    pub fn deletions(&self) -> Vec<usize> {
        self.headline_to_canonical.iter().enumerate().filter(|(_, c)| c.is_none()).map(|(h, _)| h).collect()
    }

    pub fn canonical_for(&self, headline_index: usize) -> Option<usize> {
        self.headline_to_canonical.get(headline_index).copied().flatten()
    }

    pub fn headline_for(&self, canonical_index: usize) -> Option<usize> {
        self.canonical_to_headline.get(canonical_index).copied().flatten()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aligner {
    config: AlignerConfig,
}

impl Aligner {
    pub fn new(config: AlignerConfig) -> Self {
        Aligner { config }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Linguistic cost of pairing `headline` with `canonical`.
    pub fn pair_cost(&self, headline: &DepToken, canonical: &DepToken) -> f64 {
        let cfg = &self.config;
        let mut cost = 0.0;
        if !headline.lemma.eq_ignore_ascii_case(&canonical.lemma) {
            cost += cfg.lemma_weight;
        }
        if headline.upos != canonical.upos {
            cost += cfg.pos_weight;
        }
        if headline.deprel != canonical.deprel {
            cost += cfg.deprel_weight;
        }
        cost + cfg.morph_weight * morph_distance(headline, canonical)
    }

    pub fn cost_matrix(&self, headline: &[DepToken], canonical: &[DepToken]) -> CostMatrix {
        let size = headline.len().max(canonical.len());
        let mut matrix = CostMatrix::filled(size, scale(self.config.no_match_cost));
        for (h, ht) in headline.iter().enumerate() {
            for (c, ct) in canonical.iter().enumerate() {
                matrix.set(h, c, scale(self.pair_cost(ht, ct)));
            }
        }
        matrix
    }

    pub fn align(&self, headline: &DependencyParse, canonical: &DependencyParse) -> Alignment {
        let (n, m) = (headline.len(), canonical.len());
        let mut alignment = Alignment::unmatched(n, m);
        if n == 0 || m == 0 {
            return alignment;
        }

        let matrix = self.cost_matrix(&headline.tokens, &canonical.tokens);
        for (h, c) in assign(&matrix).into_iter().enumerate() {
            if h >= n || c >= m {
                continue; // padding
            }
            let cost = self.pair_cost(&headline.tokens[h], &canonical.tokens[c]);
            if cost < self.config.no_match_cost {
                alignment.headline_to_canonical[h] = Some(c);
                alignment.canonical_to_headline[c] = Some(h);
                alignment.matched_cost += cost;
            }
        }

        tracing::debug!(
            headline = n,
            canonical = m,
            matched = alignment.pairs().count(),
            cost = alignment.matched_cost,
            "aligned sentence pair"
        );
        alignment
    }
}

/// Jaccard distance between the `Name=Value` feature sets of two tokens.
fn morph_distance(a: &DepToken, b: &DepToken) -> f64 {
    if a.feats.is_empty() && b.feats.is_empty() {
        return 0.0;
    }
    let left: BTreeSet<(&String, &String)> = a.feats.iter().collect();
    let right: BTreeSet<(&String, &String)> = b.feats.iter().collect();
    let shared = left.intersection(&right).count() as f64;
    let union = left.union(&right).count() as f64;
    1.0 - shared / union
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random costs (LCG) so the brute-force check is reproducible.
    fn pseudo_random_matrix(size: usize, seed: u64) -> CostMatrix {
        let mut state = seed;
        let rows: Vec<Vec<f64>> = (0..size)
            .map(|_| {
                (0..size)
                    .map(|_| {
                        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                        ((state >> 33) % 2000) as f64 / 1000.0
                    })
                    .collect()
            })
            .collect();
        CostMatrix::from_costs(&rows, 0.0)
    }

    fn permutations(items: Vec<usize>) -> Vec<Vec<usize>> {
        if items.len() <= 1 {
            return vec![items];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.clone();
            let head = rest.remove(i);
            for mut tail in permutations(rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn assignment_matches_brute_force() {
        for size in 1..=5 {
            for seed in 0..8u64 {
                let matrix = pseudo_random_matrix(size, seed * 31 + size as u64);
                let solved = assign(&matrix);
                let best = permutations((0..size).collect()).iter().map(|p| matrix.total(p)).min().unwrap();
                assert_eq!(matrix.total(&solved), best, "size={size} seed={seed}");

                let mut columns = solved.clone();
                columns.sort_unstable();
                assert_eq!(columns, (0..size).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn empty_matrix_has_empty_assignment() {
        assert!(assign(&CostMatrix::from_costs(&[], 1.0)).is_empty());
    }

    fn parse(tokens: &[(&str, &str, &str, usize, &str)]) -> DependencyParse {
        DependencyParse::new(
            tokens
                .iter()
                .enumerate()
                .map(|(i, (form, lemma, upos, head, rel))| DepToken::new(i + 1, form, lemma, upos, *head, rel))
                .collect(),
        )
    }

    #[test]
    fn identical_sentences_align_to_identity_at_zero_cost() {
        let s = parse(&[("Rain", "rain", "NOUN", 2, "nsubj"), ("falls", "fall", "VERB", 0, "root")]);
        let alignment = Aligner::default().align(&s, &s);
        assert_eq!(alignment.headline_to_canonical, vec![Some(0), Some(1)]);
        assert_eq!(alignment.matched_cost, 0.0);
        assert!(alignment.insertions().is_empty());
        assert!(alignment.deletions().is_empty());
    }

    #[test]
    fn empty_side_leaves_everything_unmatched() {
        let s = parse(&[("Rain", "rain", "NOUN", 0, "root")]);
        let empty = DependencyParse::default();

        let alignment = Aligner::default().align(&s, &empty);
        assert_eq!(alignment.headline_to_canonical, vec![None]);
        assert_eq!(alignment.deletions(), vec![0]);

        let alignment = Aligner::default().align(&empty, &s);
        assert!(alignment.headline_to_canonical.is_empty());
        assert_eq!(alignment.insertions(), vec![0]);
    }

    #[test]
    fn every_headline_token_is_reported_once() {
        let headline = parse(&[
            ("Storm", "storm", "NOUN", 2, "nsubj"),
            ("hits", "hit", "VERB", 0, "root"),
            ("coast", "coast", "NOUN", 2, "obj"),
            ("!", "!", "PUNCT", 2, "punct"),
        ]);
        let canonical = parse(&[
            ("A", "a", "DET", 2, "det"),
            ("storm", "storm", "NOUN", 3, "nsubj"),
            ("hit", "hit", "VERB", 0, "root"),
        ]);
        let alignment = Aligner::default().align(&headline, &canonical);
        assert_eq!(alignment.headline_to_canonical.len(), 4);
        assert_eq!(alignment.canonical_to_headline.len(), 3);
        let mapped: Vec<usize> = alignment.pairs().map(|(_, c)| c).collect();
        let mut unique = mapped.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(mapped.len(), unique.len());
        assert_eq!(alignment.canonical_for(0), Some(1));
        assert_eq!(alignment.canonical_for(1), Some(2));
        assert!(alignment.deletions().contains(&3));
    }

    #[test]
    fn morph_distance_is_jaccard() {
        let a = DepToken::new(1, "x", "x", "X", 0, "root").with_feats("A=1|B=2");
        let b = DepToken::new(1, "x", "x", "X", 0, "root").with_feats("A=1|C=3");
        assert!((morph_distance(&a, &b) - (1.0 - 1.0 / 3.0)).abs() < 1e-9);
        assert_eq!(morph_distance(&a, &a), 0.0);
    }
}
