//! Word-list dictionary with edit-distance suggestions.
//!
//! Words are stored lowercased in a hash set. Suggestions are every word
//! within `MAX_EDIT_DISTANCE` of the query, scored by
//! `1 - distance / max(len_query, len_candidate)`.

use std::collections::HashSet;
use std::path::Path;

use corrige_core::error::{CorrigeError, Result};
use corrige_core::types::{SpellLookup, Suggestion};

/// Candidates further than this from the query are never suggested.
pub const MAX_EDIT_DISTANCE: usize = 2;

const BUILTIN_WORDS: &str = include_str!("builtin_words.txt");

/// In-memory dictionary backed by a set of lowercase words.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    words: HashSet<String>,
}

impl Dictionary {
    /// Build a dictionary from an iterator of words.
    ///
    /// Entries are trimmed and lowercased; blank entries are skipped.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Parse a newline-separated word list.
    pub fn parse(content: &str) -> Self {
        Self::from_words(content.lines())
    }

    /// Load a newline-separated word list from disk.
    ///
    /// Fails if the file cannot be read or contains no words.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dictionary = Self::parse(&content);
        if dictionary.is_empty() {
            return Err(CorrigeError::Dictionary(format!(
                "no words found in {}",
                path.display()
            )));
        }
        tracing::info!(
            path = %path.display(),
            words = dictionary.word_count(),
            "Dictionary loaded"
        );
        Ok(dictionary)
    }

    /// The small English list compiled into the binary.
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_WORDS)
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The best suggestion for `word`, or `None` if nothing is close enough.
    pub fn best_suggestion(&self, word: &str) -> Option<String> {
        self.suggest(&word.to_lowercase(), 1)
            .into_iter()
            .next()
            .map(|s| s.value)
    }
}

impl SpellLookup for Dictionary {
    fn is_correct(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    fn suggest(&self, word: &str, max_results: usize) -> Vec<Suggestion> {
        if max_results == 0 || word.is_empty() {
            return Vec::new();
        }

        let word_len = word.chars().count();
        let mut candidates: Vec<Suggestion> = self
            .words
            .iter()
            .filter(|candidate| candidate.as_str() != word)
            .filter_map(|candidate| {
                let distance = bounded_levenshtein(word, candidate, MAX_EDIT_DISTANCE);
                if distance > MAX_EDIT_DISTANCE {
                    return None;
                }
                let longest = word_len.max(candidate.chars().count());
                let score = 1.0 - distance as f64 / longest as f64;
                Some(Suggestion::new(candidate.clone(), score))
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.value.cmp(&b.value))
        });
        candidates.truncate(max_results);
        candidates
    }
}

/// Levenshtein distance that gives up once it exceeds `max_distance`,
/// returning `max_distance + 1` in that case.
fn bounded_levenshtein(a: &str, b: &str, max_distance: usize) -> usize {
    if a == b {
        return 0;
    }
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }
    if a_len.abs_diff(b_len) > max_distance {
        return max_distance + 1;
    }

    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];
    for (i, a_ch) in a.chars().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, b_ch) in b_chars.iter().enumerate() {
            let substitution = prev[j] + usize::from(a_ch != *b_ch);
            let insertion = curr[j] + 1;
            let deletion = prev[j + 1] + 1;
            let distance = substitution.min(insertion).min(deletion);
            curr[j + 1] = distance;
            row_min = row_min.min(distance);
        }
        if row_min > max_distance {
            return max_distance + 1;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}
