use async_trait::async_trait;
use std::sync::Arc;

use super::DistractorSource;
use crate::error::Result;
use crate::services::keyword_service::KeywordExtractor;
use crate::utils::similarity::SimilarityGate;

pub const KEYWORD_TOP_N: usize = 5;

pub async fn keyword_distractors(
    extractor: &dyn KeywordExtractor,
    gate: &SimilarityGate,
    question: &str,
    answer: &str,
    top_n: usize,
) -> Result<Vec<String>> {
    let text = format!("{} {}", question, answer);
    let topics = extractor.extract_topics(&text, top_n).await?;
    Ok(topics
        .into_iter()
        .filter(|t| !gate.similar(t, answer))
        .collect())
}

pub struct KeywordSource {
    extractor: Arc<dyn KeywordExtractor>,
    gate: SimilarityGate,
}

impl KeywordSource {
    pub fn new(extractor: Arc<dyn KeywordExtractor>, gate: SimilarityGate) -> Self {
        Self { extractor, gate }
    }
}

#[async_trait]
impl DistractorSource for KeywordSource {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn propose(&self, question: &str, answer: &str, _remaining: usize) -> Result<Vec<String>> {
        keyword_distractors(self.extractor.as_ref(), &self.gate, question, answer, KEYWORD_TOP_N).await
    }
}
