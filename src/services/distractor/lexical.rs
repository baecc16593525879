use async_trait::async_trait;
use std::sync::Arc;

use super::DistractorSource;
use crate::error::Result;
use crate::models::knowledge::KnowledgeBase;
use crate::utils::text::{eq_ignore_case, first_word};

pub const LEXICAL_MAX_EXTRA: usize = 5;

pub fn lexical_distractors(knowledge: &KnowledgeBase, answer: &str, max_extra: usize) -> Vec<String> {
    let Some(head) = first_word(answer) else {
        return Vec::new();
    };

    let mut out: Vec<String> = Vec::new();
    for term in knowledge.related_terms(head) {
        if out.len() >= max_extra {
            break;
        }
        let term = term.replace('_', " ");
        let term = term.trim();
        if term.is_empty() || eq_ignore_case(term, answer) || out.iter().any(|t| t == term) {
            continue;
        }
        out.push(term.to_string());
    }
    out
}

pub struct LexicalSource {
    knowledge: Arc<KnowledgeBase>,
}

impl LexicalSource {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl DistractorSource for LexicalSource {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn propose(&self, _question: &str, answer: &str, _remaining: usize) -> Result<Vec<String>> {
        Ok(lexical_distractors(&self.knowledge, answer, LEXICAL_MAX_EXTRA))
    }
}
