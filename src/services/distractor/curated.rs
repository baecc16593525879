use async_trait::async_trait;
use std::sync::Arc;

use super::DistractorSource;
use crate::error::Result;
use crate::models::knowledge::KnowledgeBase;

/// Every curated list whose key occurs in the answer, concatenated in table
/// order without duplicates.
pub fn curated_distractors(knowledge: &KnowledgeBase, answer: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in knowledge.curated_for(answer) {
        for item in &entry.distractors {
            if !out.contains(item) {
                out.push(item.clone());
            }
        }
    }
    out
}

pub struct CuratedSource {
    knowledge: Arc<KnowledgeBase>,
}

impl CuratedSource {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl DistractorSource for CuratedSource {
    fn name(&self) -> &'static str {
        "curated"
    }

    async fn propose(&self, _question: &str, answer: &str, _remaining: usize) -> Result<Vec<String>> {
        Ok(curated_distractors(&self.knowledge, answer))
    }
}
