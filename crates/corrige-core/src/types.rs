use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Spell lookup
// =============================================================================

/// A candidate replacement for a misspelled word.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// The replacement word.
    pub value: String,
    /// Similarity/confidence in `[0, 1]`, supplied by the lookup.
    pub score: f64,
}

impl Suggestion {
    pub fn new(value: impl Into<String>, score: f64) -> Self {
        Self {
            value: value.into(),
            score,
        }
    }
}

/// Outcome of checking one word against a dictionary.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupResult {
    /// The word as typed, before lowercasing.
    pub original: String,
    pub is_correct: bool,
    /// Ranked best first. Always empty for correct words.
    pub suggestions: Vec<Suggestion>,
}

impl LookupResult {
    /// The top-ranked suggestion, if any.
    pub fn best(&self) -> Option<&Suggestion> {
        self.suggestions.first()
    }
}

/// Dictionary lookup contract.
///
/// Implementations receive lowercase words. `suggest` returns at most
/// `max_results` candidates ordered by descending score.
pub trait SpellLookup: Send + Sync {
    fn is_correct(&self, word: &str) -> bool;

    fn suggest(&self, word: &str, max_results: usize) -> Vec<Suggestion>;

    /// Lowercase `word`, check it, and collect suggestions when it is wrong.
    fn check(&self, word: &str, max_results: usize) -> LookupResult {
        let lower = word.to_lowercase();
        let is_correct = self.is_correct(&lower);
        let suggestions = if !is_correct && max_results > 0 {
            self.suggest(&lower, max_results)
        } else {
            Vec::new()
        };
        LookupResult {
            original: word.to_string(),
            is_correct,
            suggestions,
        }
    }
}

// =============================================================================
// Display
// =============================================================================

/// Status attached to every display update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Waiting,
    Listening,
    Correct,
    Incorrect,
    Suggestion,
    Correcting,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStatus::Waiting => "waiting",
            DisplayStatus::Listening => "listening",
            DisplayStatus::Correct => "correct",
            DisplayStatus::Incorrect => "incorrect",
            DisplayStatus::Suggestion => "suggestion",
            DisplayStatus::Correcting => "correcting",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time projection of session and buffer state for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayUpdate {
    pub text: String,
    #[serde(rename = "state")]
    pub status: DisplayStatus,
}

impl DisplayUpdate {
    pub fn new(text: impl Into<String>, status: DisplayStatus) -> Self {
        Self {
            text: text.into(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapLookup(HashMap<&'static str, Vec<Suggestion>>);

    impl SpellLookup for MapLookup {
        fn is_correct(&self, word: &str) -> bool {
            word == "hello"
        }

        fn suggest(&self, word: &str, max_results: usize) -> Vec<Suggestion> {
            let mut out = self.0.get(word).cloned().unwrap_or_default();
            out.truncate(max_results);
            out
        }
    }

    #[test]
    fn test_check_lowercases_and_keeps_original() {
        let lookup = MapLookup(HashMap::new());
        let result = lookup.check("HeLLo", 3);
        assert!(result.is_correct);
        assert_eq!(result.original, "HeLLo");
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_check_respects_cap() {
        let mut map = HashMap::new();
        map.insert(
            "helo",
            vec![
                Suggestion::new("hello", 0.9),
                Suggestion::new("help", 0.7),
                Suggestion::new("hero", 0.6),
            ],
        );
        let lookup = MapLookup(map);

        let result = lookup.check("Helo", 2);
        assert!(!result.is_correct);
        assert_eq!(result.suggestions.len(), 2);
        assert_eq!(result.best().unwrap().value, "hello");
    }

    #[test]
    fn test_check_zero_cap_skips_suggest() {
        let mut map = HashMap::new();
        map.insert("helo", vec![Suggestion::new("hello", 0.9)]);
        let lookup = MapLookup(map);

        let result = lookup.check("helo", 0);
        assert!(!result.is_correct);
        assert!(result.best().is_none());
    }

    #[test]
    fn test_display_status_names() {
        let all = [
            (DisplayStatus::Waiting, "waiting"),
            (DisplayStatus::Listening, "listening"),
            (DisplayStatus::Correct, "correct"),
            (DisplayStatus::Incorrect, "incorrect"),
            (DisplayStatus::Suggestion, "suggestion"),
            (DisplayStatus::Correcting, "correcting"),
        ];
        for (status, name) in all {
            assert_eq!(status.to_string(), name);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", name)
            );
        }
    }

    #[test]
    fn test_display_update_json_shape() {
        let update = DisplayUpdate::new("helo → hello", DisplayStatus::Suggestion);
        let json: serde_json::Value = serde_json::to_value(&update).unwrap();
        assert_eq!(json["text"], "helo → hello");
        assert_eq!(json["state"], "suggestion");
    }
}
