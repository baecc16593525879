use async_trait::async_trait;
use std::sync::Arc;

use super::DistractorSource;
use crate::error::Result;
use crate::services::llm_service::{LanguageModel, SamplingOptions};
use crate::utils::similarity::SimilarityGate;
use crate::utils::text::{eq_ignore_case, strip_list_marker};

pub fn distractor_prompt(question: &str, answer: &str, k: usize) -> String {
    format!(
        "Generate {} plausible but incorrect answers to the question.\n\
         Avoid using or rephrasing the correct answer.\n\
         Write one answer per line.\n\
         Question: {}\n\
         Correct answer: {}\n\
         Distractors:",
        k + 3,
        question,
        answer
    )
}

pub fn collect_distractor_lines(raw: &str, answer: &str, k: usize, gate: &SimilarityGate) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for line in raw.lines() {
        if out.len() >= k {
            break;
        }
        let cleaned = strip_list_marker(line);
        if cleaned.is_empty()
            || eq_ignore_case(cleaned, answer)
            || out.iter().any(|d| eq_ignore_case(d, cleaned))
            || gate.similar(cleaned, answer)
        {
            continue;
        }
        out.push(cleaned.to_string());
    }
    out
}

/// One model call asking for `k + 3` wrong answers; a failed call yields none.
pub async fn model_distractors(
    model: &dyn LanguageModel,
    gate: &SimilarityGate,
    question: &str,
    answer: &str,
    k: usize,
) -> Vec<String> {
    let prompt = distractor_prompt(question, answer, k);
    match model.complete(&prompt, &SamplingOptions::distractors()).await {
        Ok(raw) => collect_distractor_lines(&raw, answer, k, gate),
        Err(e) => {
            tracing::warn!(model = %model.name(), error = %e, "distractor prompt failed");
            Vec::new()
        }
    }
}

pub struct ModelSource {
    model: Arc<dyn LanguageModel>,
    gate: SimilarityGate,
}

impl ModelSource {
    pub fn new(model: Arc<dyn LanguageModel>, gate: SimilarityGate) -> Self {
        Self { model, gate }
    }
}

#[async_trait]
impl DistractorSource for ModelSource {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn propose(&self, question: &str, answer: &str, remaining: usize) -> Result<Vec<String>> {
        Ok(model_distractors(self.model.as_ref(), &self.gate, question, answer, remaining).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::llm_service::MockLanguageModel;

    #[test]
    fn prompt_asks_for_three_extra() {
        let p = distractor_prompt("What is 2+2?", "4", 3);
        assert!(p.starts_with("Generate 6 plausible but incorrect answers"));
        assert!(p.contains("Correct answer: 4"));
    }

    #[test]
    fn lines_are_cleaned_and_filtered() {
        let raw = "1. Respiration\n- photosynthesis\n• Photosynthesys\n\n2) fermentation\n- respiration\n3. Calvin cycle\n4. glycolysis";
        let out = collect_distractor_lines(raw, "Photosynthesis", 3, &SimilarityGate::default());
        assert_eq!(out, vec!["Respiration", "fermentation", "Calvin cycle"]);
    }

    #[tokio::test]
    async fn model_failure_yields_nothing() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_, _| Err(Error::ExternalService("timeout".into())));
        model.expect_name().return_const("mock".to_string());

        let out = model_distractors(&model, &SimilarityGate::default(), "q", "a", 3).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn source_passes_remaining_as_k() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|prompt, _| prompt.starts_with("Generate 5 plausible"))
            .returning(|_, _| Ok("Mars\nVenus\nJupiter".into()));

        let source = ModelSource::new(Arc::new(model), SimilarityGate::default());
        let out = source.propose("Which planet is largest?", "Saturn", 2).await.unwrap();
        assert_eq!(out, vec!["Mars", "Venus"]);
    }
}
