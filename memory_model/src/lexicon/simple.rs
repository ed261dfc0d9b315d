//! Rule-based English lemmatizer.

use std::collections::HashSet;

use super::Lemmatizer;

const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Lowercases, splits on anything that is not a letter or digit, drops stop
/// words and single letters, and strips common inflectional suffixes from
/// purely alphabetic words ("runs", "running" -> "run", "cities" -> "city").
/// Tokens with digits are kept verbatim so "Apollo 11" and "Apollo 13" stay
/// distinct.
#[derive(Debug, Clone)]
pub struct SimpleLemmatizer {
    stop_words: HashSet<String>,
}

impl SimpleLemmatizer {
    /// Create a lemmatizer with the default English stop words.
    pub fn new() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Add stop words on top of the defaults.
    pub fn with_extra_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words
            .extend(words.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
        self
    }

    /// Check whether a lowercase token is a stop word.
    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    /// Lemma of a single lowercase alphabetic word.
    pub fn lemma(&self, word: &str) -> String {
        let len = word.chars().count();

        if len > 4 && word.ends_with("ies") {
            return format!("{}y", &word[..word.len() - 3]);
        }
        if len > 5 && word.ends_with("ing") {
            return restore_stem(&word[..word.len() - 3]);
        }
        if len > 4 && word.ends_with("ed") && !word.ends_with("eed") {
            return restore_stem(&word[..word.len() - 2]);
        }
        if len > 4
            && ["sses", "shes", "ches", "xes", "zes"]
                .iter()
                .any(|suffix| word.ends_with(suffix))
        {
            return word[..word.len() - 2].to_string();
        }
        if len > 3
            && word.ends_with('s')
            && !["ss", "us", "is"].iter().any(|suffix| word.ends_with(suffix))
        {
            return word[..word.len() - 1].to_string();
        }

        word.to_string()
    }
}

impl Default for SimpleLemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lemmatizer for SimpleLemmatizer {
    fn normalize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .filter_map(|token| {
                if !token.chars().all(char::is_alphabetic) {
                    return Some(token);
                }
                if token.chars().count() < 2 || self.is_stop_word(&token) {
                    return None;
                }
                Some(self.lemma(&token))
            })
            .collect()
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Repair a stem left behind by stripping "ing"/"ed": undouble a final
/// consonant ("runn" -> "run") or restore a dropped "e" on a short
/// consonant-vowel-consonant stem ("mak" -> "make").
fn restore_stem(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();

    if n >= 2 && chars[n - 1] == chars[n - 2] && !is_vowel(chars[n - 1]) && !"lsz".contains(chars[n - 1]) {
        return chars[..n - 1].iter().collect();
    }
    if n == 3 && !is_vowel(chars[0]) && is_vowel(chars[1]) && !is_vowel(chars[2]) && !"wxy".contains(chars[2]) {
        return format!("{}e", stem);
    }

    stem.to_string()
}
