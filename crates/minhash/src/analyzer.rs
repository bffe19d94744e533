//! Token sets and the pluggable analyzers that produce them.
//!
//! Text analysis belongs to the host search engine; this module only fixes
//! the [`Analyzer`] seam and ships two small deterministic analyzers so the
//! crate is usable on its own.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::config::SignatureError;

/// Distinct terms derived from one text input.
///
/// Terms are kept in a `BTreeSet` so iteration order never depends on hasher
/// state or insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    terms: BTreeSet<Vec<u8>>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a term. Returns `false` if it was already present.
    pub fn insert(&mut self, term: impl Into<Vec<u8>>) -> bool {
        self.terms.insert(term.into())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &[u8]) -> bool {
        self.terms.contains(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.terms.iter().map(Vec::as_slice)
    }

    /// Exact Jaccard similarity `|A ∩ B| / |A ∪ B|`. Two empty sets score 0.
    pub fn jaccard(&self, other: &TokenSet) -> f64 {
        let inter = self.terms.intersection(&other.terms).count();
        let union = self.len() + other.len() - inter;
        if union == 0 {
            0.0
        } else {
            inter as f64 / union as f64
        }
    }
}

impl<T: Into<Vec<u8>>> FromIterator<T> for TokenSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<T: Into<Vec<u8>>> Extend<T> for TokenSet {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.terms.extend(iter.into_iter().map(Into::into));
    }
}

/// Turns text into a [`TokenSet`].
pub trait Analyzer: Send + Sync {
    /// Name under which the analyzer is registered and referenced in field
    /// configuration.
    fn name(&self) -> &str;

    fn analyze(&self, text: &str) -> TokenSet;
}

/// Splits on Unicode whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhitespaceAnalyzer {
    lowercase: bool,
}

impl WhitespaceAnalyzer {
    pub fn new(lowercase: bool) -> Self {
        Self { lowercase }
    }
}

impl Default for WhitespaceAnalyzer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Analyzer for WhitespaceAnalyzer {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn analyze(&self, text: &str) -> TokenSet {
        words(text, self.lowercase).collect()
    }
}

/// Word k-shingles: every run of `k` consecutive words, joined by one space.
///
/// Shingles keep local word order, so reordered text scores lower than it
/// would under a bag-of-words analyzer. Inputs with fewer than `k` words
/// produce a single shingle of all their words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShingleAnalyzer {
    k: usize,
    lowercase: bool,
}

impl ShingleAnalyzer {
    /// `k` is clamped to at least 1.
    pub fn new(k: usize, lowercase: bool) -> Self {
        Self {
            k: k.max(1),
            lowercase,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Default for ShingleAnalyzer {
    fn default() -> Self {
        Self::new(3, true)
    }
}

impl Analyzer for ShingleAnalyzer {
    fn name(&self) -> &str {
        "shingle"
    }

    fn analyze(&self, text: &str) -> TokenSet {
        let words: Vec<String> = words(text, self.lowercase).collect();
        if words.is_empty() {
            return TokenSet::new();
        }
        if words.len() <= self.k {
            return std::iter::once(words.join(" ")).collect();
        }
        words.windows(self.k).map(|window| window.join(" ")).collect()
    }
}

fn words(text: &str, lowercase: bool) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(move |w| {
        if lowercase {
            w.to_lowercase()
        } else {
            w.to_string()
        }
    })
}

/// Name-keyed set of analyzers available to field configurations.
#[derive(Clone)]
pub struct AnalyzerRegistry {
    analyzers: HashMap<String, Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            analyzers: HashMap::new(),
        }
    }

    /// Register `analyzer` under its own name, replacing any previous entry.
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.insert(analyzer.name().to_string(), analyzer);
    }

    /// Register `analyzer` under an explicit alias.
    pub fn register_as(&mut self, name: impl Into<String>, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.insert(name.into(), analyzer);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Analyzer>, SignatureError> {
        self.analyzers
            .get(name)
            .cloned()
            .ok_or_else(|| SignatureError::UnknownAnalyzer {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.analyzers.contains_key(name)
    }
}

impl Default for AnalyzerRegistry {
    /// `whitespace` and `shingle` (k = 3), both lowercasing.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(WhitespaceAnalyzer::default()));
        registry.register(Arc::new(ShingleAnalyzer::default()));
        registry
    }
}

impl fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.analyzers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("AnalyzerRegistry")
            .field("analyzers", &names)
            .finish()
    }
}
