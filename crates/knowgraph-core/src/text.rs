//! Keyword extraction shared by the response cache and the suggestion
//! engine. Both sides must tokenize identically or semantic lookups and
//! usage-pattern counters drift apart.

use once_cell::sync::Lazy;
use std::collections::HashSet;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being",
        "have", "has", "had", "do", "does", "did", "will", "would", "can", "could", "should",
        "may", "might", "must", "shall", "to", "of", "in", "on", "at", "by", "for", "with",
        "about", "into", "from", "this", "that", "these", "those", "it", "its", "our", "your",
        "how", "what", "when", "where", "why", "which", "who", "whom", "not", "all", "any",
        "some", "there", "here", "than", "then", "them", "they", "you", "use", "using",
    ]
    .into_iter()
    .collect()
});

fn is_significant(word: &str) -> bool {
    word.len() > 2 && !STOP_WORDS.contains(word)
}

/// Lowercase word tokens of `text`, stop-word filtered, longer than two
/// characters. Order of first occurrence, duplicates removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if is_significant(&word) && seen.insert(word.clone()) {
            tokens.push(word);
        }
    }
    tokens
}

/// The first five significant tokens of a query. These drive the learned
/// keyword-frequency tables and usage patterns.
pub fn significant_keywords(text: &str) -> Vec<String> {
    let mut tokens = tokenize(text);
    tokens.truncate(5);
    tokens
}

/// Tokens of `text` as a set, for overlap computations.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Overlap coefficient between two token sets: |a ∩ b| / min(|a|, |b|).
/// Empty sets never match anything.
pub fn overlap_coefficient(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / a.len().min(b.len()) as f64
}
