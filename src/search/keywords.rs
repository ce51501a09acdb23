//! Keyword extraction from free-text queries.
//!
//! Two strategies sit behind [`KeywordExtractor`]:
//! - [`StopwordExtractor`]: lowercase word tokens with English stopwords removed
//! - [`RakeExtractor`]: Rapid Automatic Keyword Extraction, returning candidate
//!   phrases ranked most to least significant
//!
//! Both return an empty list for blank or stopword-only input.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{FhError, Result};

/// English stopword list (NLTK corpus).
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOPWORDS.iter().copied().collect());

// Word tokens, keeping inner apostrophes so contractions hit the stopword list.
static WORD_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\w+(?:'\w+)*").ok());

/// Turns a raw query into keyword phrases for the relational search path.
pub trait KeywordExtractor: Send + Sync {
    /// Extract keywords in significance order (or source order for unranked
    /// strategies). Never fails; unusable input yields an empty list.
    fn extract(&self, query: &str) -> Vec<String>;

    /// Strategy name for logs and `finhub config`.
    fn name(&self) -> &'static str;
}

/// Build the configured extractor. Accepts `rake` and `stopwords`;
/// `max_phrase_words` caps RAKE phrases (0 = unlimited).
pub fn build_keyword_extractor(
    strategy: &str,
    max_phrase_words: usize,
) -> Result<Box<dyn KeywordExtractor>> {
    match strategy.trim().to_lowercase().as_str() {
        "" | "rake" => Ok(Box::new(RakeExtractor::with_max_phrase_words(
            max_phrase_words,
        ))),
        "stopwords" => Ok(Box::new(StopwordExtractor::default())),
        other => Err(FhError::Config(format!(
            "unknown keyword strategy: {other}"
        ))),
    }
}

/// Token-level extractor: lowercase, strip non-word characters, drop stopwords.
#[derive(Debug, Clone, Default)]
pub struct StopwordExtractor;

impl KeywordExtractor for StopwordExtractor {
    fn extract(&self, query: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for token in tokens(query) {
            let word: String = token
                .text
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if word.is_empty() || is_stopword(&token.text) || is_stopword(&word) {
                continue;
            }
            if seen.insert(word.clone()) {
                keywords.push(word);
            }
        }
        keywords
    }

    fn name(&self) -> &'static str {
        "stopwords"
    }
}

/// RAKE extractor.
///
/// Candidate phrases are maximal runs of non-stopword tokens not interrupted by
/// punctuation. Each word scores `degree / frequency`; a phrase scores the sum
/// of its words. Equal scores keep first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct RakeExtractor {
    /// Phrases longer than this many words are discarded (0 = unlimited).
    max_phrase_words: usize,
}

impl RakeExtractor {
    #[must_use]
    pub const fn with_max_phrase_words(max_phrase_words: usize) -> Self {
        Self { max_phrase_words }
    }

    fn candidate_phrases(&self, query: &str) -> Vec<Vec<String>> {
        let normalized: String = query.nfkc().collect::<String>().to_lowercase();
        let mut phrases = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut last_end = 0usize;

        for token in tokens_of_normalized(&normalized) {
            let gap = &normalized[last_end..token.start];
            if gap.chars().any(|c| !c.is_whitespace()) && !current.is_empty() {
                phrases.push(std::mem::take(&mut current));
            }
            last_end = token.end;

            if is_stopword(&token.text) {
                if !current.is_empty() {
                    phrases.push(std::mem::take(&mut current));
                }
                continue;
            }
            current.push(token.text);
        }
        if !current.is_empty() {
            phrases.push(current);
        }

        if self.max_phrase_words > 0 {
            phrases.retain(|p| p.len() <= self.max_phrase_words);
        }
        phrases
    }
}

impl KeywordExtractor for RakeExtractor {
    fn extract(&self, query: &str) -> Vec<String> {
        let phrases = self.candidate_phrases(query);
        if phrases.is_empty() {
            return Vec::new();
        }

        let mut frequency: HashMap<&str, f32> = HashMap::new();
        let mut degree: HashMap<&str, f32> = HashMap::new();
        for phrase in &phrases {
            let len = phrase.len() as f32;
            for word in phrase {
                *frequency.entry(word.as_str()).or_default() += 1.0;
                *degree.entry(word.as_str()).or_default() += len;
            }
        }

        let mut seen = HashSet::new();
        let mut ranked: Vec<(String, f32)> = Vec::new();
        for phrase in &phrases {
            let text = phrase.join(" ");
            if !seen.insert(text.clone()) {
                continue;
            }
            let score: f32 = phrase
                .iter()
                .map(|w| {
                    let f = frequency.get(w.as_str()).copied().unwrap_or(1.0);
                    degree.get(w.as_str()).copied().unwrap_or(0.0) / f
                })
                .sum();
            ranked.push((text, score));
        }

        // Stable: equal scores keep first appearance.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.into_iter().map(|(text, _)| text).collect()
    }

    fn name(&self) -> &'static str {
        "rake"
    }
}

struct Token {
    text: String,
    start: usize,
    end: usize,
}

fn tokens(query: &str) -> Vec<Token> {
    let normalized: String = query.nfkc().collect::<String>().to_lowercase();
    tokens_of_normalized(&normalized)
}

fn tokens_of_normalized(normalized: &str) -> Vec<Token> {
    let Some(re) = WORD_RE.as_ref() else {
        return Vec::new();
    };
    re.find_iter(normalized)
        .map(|m| Token {
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_extracts_content_words() {
        let extractor = StopwordExtractor;
        assert_eq!(extractor.extract("What is Hedging?"), vec!["hedging"]);
        assert_eq!(
            extractor.extract("Explain the yield curve, please!"),
            vec!["explain", "yield", "curve", "please"]
        );
    }

    #[test]
    fn stopwords_only_query_is_empty() {
        assert!(StopwordExtractor.extract("the and of").is_empty());
        assert!(StopwordExtractor.extract("").is_empty());
        assert!(StopwordExtractor.extract("   ?!  ").is_empty());
    }

    #[test]
    fn stopwords_strips_apostrophes_and_dedups() {
        let extractor = StopwordExtractor;
        assert_eq!(
            extractor.extract("Bond's bond don't"),
            vec!["bonds", "bond"]
        );
    }

    #[test]
    fn rake_single_term() {
        let extractor = RakeExtractor::default();
        assert_eq!(extractor.extract("What is Hedging?"), vec!["hedging"]);
        assert_eq!(
            extractor.extract("What is the meaning of Hedging?"),
            vec!["meaning", "hedging"]
        );
    }

    #[test]
    fn rake_ranks_longer_phrases_first() {
        let extractor = RakeExtractor::default();
        let keywords = extractor.extract("How does a credit default swap work in a bear market?");
        assert_eq!(keywords, vec!["credit default swap work", "bear market"]);
    }

    #[test]
    fn rake_breaks_phrases_at_punctuation() {
        let extractor = RakeExtractor::default();
        let keywords = extractor.extract("liquidity, solvency");
        assert_eq!(keywords, vec!["liquidity", "solvency"]);
    }

    #[test]
    fn rake_dedups_repeated_phrases() {
        let extractor = RakeExtractor::default();
        let keywords = extractor.extract("inflation and inflation");
        assert_eq!(keywords, vec!["inflation"]);
    }

    #[test]
    fn rake_stopwords_only_query_is_empty() {
        assert!(RakeExtractor::default().extract("the and of").is_empty());
        assert!(RakeExtractor::default().extract("").is_empty());
    }

    #[test]
    fn rake_max_phrase_words() {
        let extractor = RakeExtractor::with_max_phrase_words(2);
        let keywords = extractor.extract("credit default swap or bond");
        assert_eq!(keywords, vec!["bond"]);
    }

    #[test]
    fn extraction_normalizes_unicode() {
        // Fullwidth letters fold to ASCII
        assert_eq!(StopwordExtractor.extract("ＥＴＦ"), vec!["etf"]);
    }

    #[test]
    fn build_keyword_extractor_strategies() {
        assert_eq!(build_keyword_extractor("rake", 0).unwrap().name(), "rake");
        assert_eq!(build_keyword_extractor("", 0).unwrap().name(), "rake");
        assert_eq!(
            build_keyword_extractor("Stopwords", 0).unwrap().name(),
            "stopwords"
        );
        assert!(matches!(
            build_keyword_extractor("tfidf", 0),
            Err(FhError::Config(_))
        ));

        let capped = build_keyword_extractor("rake", 2).unwrap();
        assert_eq!(capped.extract("credit default swap or bond"), vec!["bond"]);
    }
}
