//! Pre-parsed input: dependency parses, constituency trees and sentence pairs.
//!
//! Parsing raw text is someone else's job. This module only holds the parse
//! representations the engine consumes, validates them, and reads the two
//! small interchange formats the CLI needs (JSON corpora and bracketed trees).
//!
//! Token ids follow CoNLL-U (1-based, head `0` marks the root). Everything
//! downstream addresses tokens by their 0-based position in
//! [`DependencyParse::tokens`].

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One token of a dependency parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepToken {
    pub id: usize,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    #[serde(default)]
    pub feats: BTreeMap<String, String>,
    pub head: usize,
    pub deprel: String,
}

impl DepToken {
    pub fn new(id: usize, form: &str, lemma: &str, upos: &str, head: usize, deprel: &str) -> Self {
        DepToken {
            id,
            form: form.to_string(),
            lemma: lemma.to_string(),
            upos: upos.to_string(),
            feats: BTreeMap::new(),
            head,
            deprel: deprel.to_string(),
        }
    }

    /// Attach morphological features in CoNLL-U notation (`Number=Sing|Tense=Past`).
    pub fn with_feats(mut self, feats: &str) -> Self {
        self.feats = parse_feats(feats);
        self
    }

    pub fn is_punct(&self) -> bool {
        self.upos == "PUNCT" || (!self.form.is_empty() && regex!(r"^\p{P}+$").is_match(&self.form))
    }
}

/// Parse a CoNLL-U FEATS column. `_` and malformed pairs are ignored.
pub fn parse_feats(raw: &str) -> BTreeMap<String, String> {
    raw.split('|')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() { None } else { Some((name.to_string(), value.to_string())) }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyParse {
    pub tokens: Vec<DepToken>,
}

impl DependencyParse {
    pub fn new(tokens: Vec<DepToken>) -> Self {
        DependencyParse { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DepToken> {
        self.tokens.get(index)
    }

    /// 0-based index of the head of `index`, or `None` for the root.
    pub fn head_index(&self, index: usize) -> Option<usize> {
        let head = self.tokens.get(index)?.head;
        if head == 0 || head > self.tokens.len() { None } else { Some(head - 1) }
    }

    /// 0-based indices of the dependents of `index`, in sentence order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let id = index + 1;
        self.tokens.iter().enumerate().filter(move |(_, t)| t.head == id).map(|(i, _)| i)
    }

    pub fn root_index(&self) -> Option<usize> {
        self.tokens.iter().position(|t| t.head == 0)
    }

    pub fn forms(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.form.as_str()).collect()
    }

    /// Check ids are `1..=n` in order and every head points inside the sentence.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.tokens.is_empty() {
            return Err(InputError::Empty);
        }
        let len = self.tokens.len();
        for (position, token) in self.tokens.iter().enumerate() {
            if token.id != position + 1 {
                return Err(InputError::NonSequentialId { position, id: token.id, expected: position + 1 });
            }
            if token.head > len {
                return Err(InputError::HeadOutOfRange { id: token.id, head: token.head, len });
            }
            if token.head == token.id {
                return Err(InputError::SelfHead { id: token.id });
            }
        }
        if self.root_index().is_none() {
            return Err(InputError::NoRoot);
        }
        Ok(())
    }
}

// --- Constituency trees -------------------------------------------------------

/// A node of a constituency tree.
///
/// Word leaves have no children and carry the 0-based index of the token they
/// cover (assigned left to right while parsing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    pub children: Vec<TreeNode>,
    pub token: Option<usize>,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.token.is_some()
    }

    fn height(&self) -> usize {
        if self.is_leaf() { 0 } else { 1 + self.children.iter().map(TreeNode::height).max().unwrap_or(0) }
    }

    fn write_bracketed(&self, out: &mut String) {
        if self.is_leaf() {
            out.push_str(&self.label);
            return;
        }
        out.push('(');
        out.push_str(&self.label);
        for child in &self.children {
            out.push(' ');
            child.write_bracketed(out);
        }
        out.push(')');
    }
}

/// Where a token sits in the phrase structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhrasePlacement {
    /// Label of the preterminal (the tree's own tag for the word).
    pub tag: String,
    /// Label of the smallest phrase enclosing the preterminal.
    pub phrase_label: String,
    /// Number of ancestors above the enclosing phrase (the root phrase has depth 0).
    pub phrase_depth: usize,
    /// Labels of the preterminal's siblings inside the enclosing phrase.
    pub sibling_labels: Vec<String>,
}

/// A labeled, nested constituency tree.
///
/// Serialized as a bracketed string, e.g. `(S (NP (NN govt)) (VP (VBZ announces)))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConstituencyTree {
    root: TreeNode,
    leaves: usize,
}

impl ConstituencyTree {
    /// Parse a Penn-style bracketed tree.
    pub fn parse(input: &str) -> Result<Self, InputError> {
        let tokens: Vec<(usize, &str)> =
            regex!(r"\(|\)|[^\s()]+").find_iter(input).map(|m| (m.start(), m.as_str())).collect();
        let mut reader = TreeReader { tokens: &tokens, pos: 0, next_leaf: 0, end: input.len() };
        let root = reader.node()?;
        if let Some(&(offset, _)) = tokens.get(reader.pos) {
            return Err(InputError::Tree { offset, message: "trailing input after the root node".to_string() });
        }
        Ok(ConstituencyTree { root, leaves: reader.next_leaf })
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves
    }

    /// Number of non-leaf levels on the longest root-to-word path.
    pub fn depth(&self) -> usize {
        self.root.height()
    }

    /// Label of the topmost phrase, skipping a unary `ROOT`/empty wrapper.
    pub fn top_label(&self) -> &str {
        let mut node = &self.root;
        while (node.label.is_empty() || node.label == "ROOT") && node.children.len() == 1 && !node.children[0].is_leaf()
        {
            node = &node.children[0];
        }
        &node.label
    }

    /// Root-to-leaf path for the word covering token `index`.
    pub fn path_to(&self, index: usize) -> Option<Vec<&TreeNode>> {
        fn walk<'t>(node: &'t TreeNode, index: usize, path: &mut Vec<&'t TreeNode>) -> bool {
            path.push(node);
            if node.token == Some(index) {
                return true;
            }
            for child in &node.children {
                if walk(child, index, path) {
                    return true;
                }
            }
            path.pop();
            false
        }

        let mut path = Vec::new();
        if walk(&self.root, index, &mut path) { Some(path) } else { None }
    }

    /// Phrase-structure placement of token `index`.
    pub fn placement(&self, index: usize) -> Option<PhrasePlacement> {
        let path = self.path_to(index)?;
        // path = [root, ..., phrase, preterminal, leaf]
        if path.len() < 2 {
            return None;
        }
        let preterminal = path[path.len() - 2];
        let (phrase_label, phrase_depth, sibling_labels) = if path.len() >= 3 {
            let phrase = path[path.len() - 3];
            let siblings = phrase
                .children
                .iter()
                .filter(|c| !std::ptr::eq(*c, preterminal))
                .map(|c| c.label.clone())
                .collect();
            (phrase.label.clone(), path.len() - 3, siblings)
        } else {
            (preterminal.label.clone(), 0, Vec::new())
        };
        Some(PhrasePlacement { tag: preterminal.label.clone(), phrase_label, phrase_depth, sibling_labels })
    }

    pub fn to_bracketed(&self) -> String {
        let mut out = String::new();
        self.root.write_bracketed(&mut out);
        out
    }
}

impl TryFrom<String> for ConstituencyTree {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ConstituencyTree::parse(&value)
    }
}

impl From<ConstituencyTree> for String {
    fn from(tree: ConstituencyTree) -> Self {
        tree.to_bracketed()
    }
}

struct TreeReader<'a> {
    tokens: &'a [(usize, &'a str)],
    pos: usize,
    next_leaf: usize,
    end: usize,
}

impl TreeReader<'_> {
    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(o, _)| *o).unwrap_or(self.end)
    }

    fn error(&self, message: &str) -> InputError {
        InputError::Tree { offset: self.offset(), message: message.to_string() }
    }

    fn node(&mut self) -> Result<TreeNode, InputError> {
        match self.tokens.get(self.pos).map(|(_, t)| *t) {
            Some("(") => self.pos += 1,
            Some(_) => return Err(self.error("expected '('")),
            None => return Err(self.error("empty tree")),
        }

        // `((S ...))` style wrappers have no label.
        let label = match self.tokens.get(self.pos).map(|(_, t)| *t) {
            Some("(") => String::new(),
            Some(")") | None => return Err(self.error("node without label")),
            Some(word) => {
                self.pos += 1;
                word.to_string()
            }
        };

        let mut children = Vec::new();
        loop {
            match self.tokens.get(self.pos).map(|(_, t)| *t) {
                Some(")") => {
                    self.pos += 1;
                    break;
                }
                Some("(") => children.push(self.node()?),
                Some(word) => {
                    children.push(TreeNode {
                        label: word.to_string(),
                        children: Vec::new(),
                        token: Some(self.next_leaf),
                    });
                    self.next_leaf += 1;
                    self.pos += 1;
                }
                None => return Err(self.error("unbalanced parentheses")),
            }
        }

        if children.is_empty() {
            return Err(self.error("node without children"));
        }
        Ok(TreeNode { label, children, token: None })
    }
}

// --- Sentences and corpora ----------------------------------------------------

/// One sentence with both of its parses.
///
/// A constituency tree that fails to parse does not fail deserialization. The
/// sentence keeps the raw bracketed text and reports the parse error from
/// [`validate`](Self::validate), so only its pair is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SentenceRecord", into = "SentenceRecord")]
pub struct ParsedSentence {
    pub text: String,
    pub dependency: DependencyParse,
    pub constituency: Option<ConstituencyTree>,
    rejected_tree: Option<RejectedTree>,
}

/// Bracketed text that did not parse, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RejectedTree {
    source: String,
    error: InputError,
}

/// Wire shape of a [`ParsedSentence`]: the tree stays a plain string.
#[derive(Serialize, Deserialize)]
struct SentenceRecord {
    #[serde(default)]
    text: String,
    dependency: DependencyParse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constituency: Option<String>,
}

impl From<SentenceRecord> for ParsedSentence {
    fn from(record: SentenceRecord) -> Self {
        let (constituency, rejected_tree) = match record.constituency.map(|raw| (ConstituencyTree::parse(&raw), raw)) {
            None => (None, None),
            Some((Ok(tree), _)) => (Some(tree), None),
            Some((Err(error), source)) => (None, Some(RejectedTree { source, error })),
        };
        ParsedSentence { text: record.text, dependency: record.dependency, constituency, rejected_tree }
    }
}

impl From<ParsedSentence> for SentenceRecord {
    fn from(sentence: ParsedSentence) -> Self {
        let constituency = match (sentence.constituency, sentence.rejected_tree) {
            (Some(tree), _) => Some(tree.to_bracketed()),
            (None, rejected) => rejected.map(|r| r.source),
        };
        SentenceRecord { text: sentence.text, dependency: sentence.dependency, constituency }
    }
}

impl ParsedSentence {
    pub fn new(dependency: DependencyParse, constituency: Option<ConstituencyTree>) -> Self {
        let text = dependency.forms().join(" ");
        ParsedSentence { text, dependency, constituency, rejected_tree: None }
    }

    /// Surface text, reconstructed from token forms when none was supplied.
    pub fn surface(&self) -> String {
        if self.text.is_empty() { self.dependency.forms().join(" ") } else { self.text.clone() }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        self.dependency.validate()?;
        if let Some(rejected) = &self.rejected_tree {
            return Err(rejected.error.clone());
        }
        if let Some(tree) = &self.constituency {
            if tree.leaf_count() != self.dependency.len() {
                return Err(InputError::LeafMismatch { leaves: tree.leaf_count(), tokens: self.dependency.len() });
            }
        }
        Ok(())
    }
}

/// A headline and its canonical (full-sentence) rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    pub corpus_id: String,
    pub sentence_id: String,
    pub headline: ParsedSentence,
    pub canonical: ParsedSentence,
}

impl SentencePair {
    pub fn validate(&self) -> Result<(), InputError> {
        self.headline.validate().map_err(|e| e.on("headline"))?;
        self.canonical.validate().map_err(|e| e.on("canonical"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    pub pairs: Vec<SentencePair>,
}

impl Corpus {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
