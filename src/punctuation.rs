//! Punctuation substitution detection.
//!
//! Headlines replace function words with punctuation: a colon stands in for
//! "said", a comma for "and". This module guesses such substitutions from
//! co-occurrence alone: the mark is used more often in the headline than in
//! the canonical sentence, and a word from the mark's substitute lexicon
//! appears in the canonical sentence but not in the headline.
//!
//! This is a best-effort heuristic, not an alignment. It can only report the
//! first matching substitute and it does not check that the word occupies the
//! mark's position.

use crate::input::ParsedSentence;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Words a headline mark commonly replaces, in preference order.
static SUBSTITUTES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        (":", &["say", "said", "says", "according"] as &[&str]),
        (",", &["and"] as &[&str]),
        (";", &["and", "but"] as &[&str]),
        ("-", &["say", "said", "says"] as &[&str]),
    ])
});

/// Direction of a detected substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstitutionDirection {
    /// The headline uses the mark where the canonical sentence has a word.
    MarkForWord,
    /// The canonical sentence uses the mark where the headline has a word.
    WordForMark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub mark: String,
    pub word: String,
    pub direction: SubstitutionDirection,
}

/// Marks with a known substitute lexicon.
pub fn known_marks() -> impl Iterator<Item = &'static str> {
    let mut marks: Vec<&'static str> = SUBSTITUTES.keys().copied().collect();
    marks.sort_unstable();
    marks.into_iter()
}

/// Detect whether `mark` substitutes a word between `headline` and `canonical`.
pub fn detect(headline: &ParsedSentence, canonical: &ParsedSentence, mark: &str) -> Option<Substitution> {
    let candidates = SUBSTITUTES.get(mark)?;
    let in_headline = count_mark(headline, mark);
    let in_canonical = count_mark(canonical, mark);
    let headline_words = lexemes(headline);
    let canonical_words = lexemes(canonical);

    let (direction, with_mark, without_mark) = if in_headline > in_canonical {
        (SubstitutionDirection::MarkForWord, &headline_words, &canonical_words)
    } else if in_canonical > in_headline {
        (SubstitutionDirection::WordForMark, &canonical_words, &headline_words)
    } else {
        return None;
    };

    let word = candidates.iter().find(|w| without_mark.contains(**w) && !with_mark.contains(**w))?;
    Some(Substitution { mark: mark.to_string(), word: (*word).to_string(), direction })
}

fn count_mark(sentence: &ParsedSentence, mark: &str) -> usize {
    sentence.dependency.tokens.iter().filter(|t| t.form == mark).count()
}

/// Lowercased forms and lemmas.
fn lexemes(sentence: &ParsedSentence) -> HashSet<String> {
    sentence
        .dependency
        .tokens
        .iter()
        .flat_map(|t| [t.form.to_lowercase(), t.lemma.to_lowercase()])
        .collect()
}
