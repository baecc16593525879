use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    async fn extract_topics(&self, text: &str, top_n: usize) -> Result<Vec<String>>;
}

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "use", "used", "uses", "using", "very", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
    "you", "your", "yours", "yourself", "yourselves",
];

/// Stop-word filtered unigram/bigram keyphrases ranked by term frequency.
#[derive(Debug, Clone, Default)]
pub struct FrequencyKeywordExtractor;

impl FrequencyKeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn rank(&self, text: &str, top_n: usize) -> Vec<String> {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .map(|t| t.trim_matches('-').to_lowercase())
            .collect();

        let is_content = |t: &str| {
            t.len() > 1 && !STOP_WORDS.contains(&t) && !t.chars().all(|c| c.is_ascii_digit())
        };

        // phrase -> (score, first position)
        let mut unigram: HashMap<&str, (f64, usize)> = HashMap::new();
        for (pos, tok) in tokens.iter().enumerate() {
            if is_content(tok) {
                unigram.entry(tok.as_str()).or_insert((0.0, pos)).0 += 1.0;
            }
        }

        let mut phrases: HashMap<String, (f64, usize)> = unigram
            .iter()
            .map(|(w, (score, pos))| (w.to_string(), (*score, *pos)))
            .collect();

        for (pos, pair) in tokens.windows(2).enumerate() {
            let (a, b) = (pair[0].as_str(), pair[1].as_str());
            if !is_content(a) || !is_content(b) || a == b {
                continue;
            }
            let base = unigram.get(a).map(|s| s.0).unwrap_or(0.0)
                + unigram.get(b).map(|s| s.0).unwrap_or(0.0);
            let entry = phrases.entry(format!("{} {}", a, b)).or_insert((base, pos));
            // repeated bigrams are stronger than their parts
            if entry.1 != pos {
                entry.0 += 1.0;
            }
        }

        let mut ranked: Vec<(String, (f64, usize))> = phrases.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1 .0
                .partial_cmp(&a.1 .0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1 .1.cmp(&b.1 .1))
                .then(a.0.len().cmp(&b.0.len()))
        });
        ranked.into_iter().take(top_n).map(|(p, _)| p).collect()
    }
}

#[async_trait]
impl KeywordExtractor for FrequencyKeywordExtractor {
    async fn extract_topics(&self, text: &str, top_n: usize) -> Result<Vec<String>> {
        Ok(self.rank(text, top_n))
    }
}
