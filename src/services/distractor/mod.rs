//! Distractor synthesis as a fixed-priority waterfall of sources.
//!
//! Order: numeric, model, lexical, keyword, curated. A stage only runs while
//! fewer than `k` distractors have been accepted, and a failing stage
//! contributes nothing instead of aborting the run. Whatever is still missing
//! at the end is padded with [`DISTRACTOR_SENTINEL`].

pub mod curated;
pub mod keyword;
pub mod lexical;
pub mod model;
pub mod numeric;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::models::knowledge::KnowledgeBase;
use crate::services::keyword_service::KeywordExtractor;
use crate::services::llm_service::LanguageModel;
use crate::utils::similarity::SimilarityGate;
use crate::utils::text::eq_ignore_case;

pub use curated::CuratedSource;
pub use keyword::KeywordSource;
pub use lexical::LexicalSource;
pub use model::ModelSource;
pub use numeric::NumericSource;

pub const DISTRACTOR_SENTINEL: &str = "N/A";
pub const DEFAULT_DISTRACTOR_COUNT: usize = 3;

#[async_trait]
pub trait DistractorSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether proposals go through the similarity gate before acceptance.
    fn gated(&self) -> bool {
        true
    }

    /// Candidate wrong answers, best first. `remaining` is how many are still needed.
    async fn propose(&self, question: &str, answer: &str, remaining: usize) -> Result<Vec<String>>;
}

/// Exactly `k` distractors, sentinel-padded at the tail when short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistractorSet {
    pub distractors: Vec<String>,
    pub genuine: usize,
}

impl DistractorSet {
    pub fn is_padded(&self) -> bool {
        self.genuine < self.distractors.len()
    }
}

/// Running list of accepted distractors for one answer.
struct Accepted<'a> {
    answer: &'a str,
    gate: SimilarityGate,
    items: Vec<String>,
}

impl<'a> Accepted<'a> {
    fn new(answer: &'a str, gate: SimilarityGate) -> Self {
        Self {
            answer,
            gate,
            items: Vec::new(),
        }
    }

    fn offer(&mut self, candidate: &str, gated: bool) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty()
            || eq_ignore_case(candidate, DISTRACTOR_SENTINEL)
            || eq_ignore_case(candidate, self.answer)
            || self.items.iter().any(|d| eq_ignore_case(d, candidate))
        {
            return false;
        }
        if gated
            && (self.gate.similar(candidate, self.answer)
                || self.items.iter().any(|d| self.gate.similar(d, candidate)))
        {
            return false;
        }
        self.items.push(candidate.to_string());
        true
    }
}

#[derive(Clone)]
pub struct DistractorPipeline {
    sources: Vec<Arc<dyn DistractorSource>>,
    gate: SimilarityGate,
    k: usize,
}

impl DistractorPipeline {
    pub fn new(sources: Vec<Arc<dyn DistractorSource>>, gate: SimilarityGate, k: usize) -> Self {
        Self { sources, gate, k }
    }

    pub fn standard(
        model: Arc<dyn LanguageModel>,
        keywords: Arc<dyn KeywordExtractor>,
        knowledge: Arc<KnowledgeBase>,
        gate: SimilarityGate,
        k: usize,
    ) -> Self {
        let sources: Vec<Arc<dyn DistractorSource>> = vec![
            Arc::new(NumericSource),
            Arc::new(ModelSource::new(model, gate)),
            Arc::new(LexicalSource::new(knowledge.clone())),
            Arc::new(KeywordSource::new(keywords, gate)),
            Arc::new(CuratedSource::new(knowledge)),
        ];
        Self::new(sources, gate, k)
    }

    pub async fn synthesize(&self, question: &str, answer: &str) -> DistractorSet {
        self.synthesize_seeded(question, answer, &[]).await
    }

    /// Like [`Self::synthesize`], but first offers `seed` (wrong options the
    /// model already wrote) under the same acceptance rules.
    pub async fn synthesize_seeded(&self, question: &str, answer: &str, seed: &[String]) -> DistractorSet {
        let mut accepted = Accepted::new(answer, self.gate);
        for candidate in seed {
            if accepted.items.len() >= self.k {
                break;
            }
            accepted.offer(candidate, true);
        }

        for source in &self.sources {
            let remaining = self.k.saturating_sub(accepted.items.len());
            if remaining == 0 {
                break;
            }

            let proposals = match source.propose(question, answer, remaining).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(stage = source.name(), error = %e, "distractor stage failed");
                    continue;
                }
            };

            let before = accepted.items.len();
            for candidate in &proposals {
                if accepted.items.len() >= self.k {
                    break;
                }
                accepted.offer(candidate, source.gated());
            }
            tracing::debug!(
                stage = source.name(),
                proposed = proposals.len(),
                accepted = accepted.items.len() - before,
                "distractor stage finished"
            );
        }

        let genuine = accepted.items.len();
        let mut distractors = accepted.items;
        distractors.resize(self.k, DISTRACTOR_SENTINEL.to_string());
        DistractorSet { distractors, genuine }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        items: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, items: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                name,
                items: items.to_vec(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DistractorSource for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn propose(&self, _q: &str, _a: &str, _remaining: usize) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.iter().map(|s| s.to_string()).collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl DistractorSource for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn propose(&self, _q: &str, _a: &str, _remaining: usize) -> Result<Vec<String>> {
            Err(Error::ExternalService("connection refused".into()))
        }
    }

    fn pipeline(sources: Vec<Arc<dyn DistractorSource>>) -> DistractorPipeline {
        DistractorPipeline::new(sources, SimilarityGate::default(), 3)
    }

    #[tokio::test]
    async fn later_stages_are_skipped_once_k_is_reached() {
        let first = Fixed::new("first", &["alpha", "bravo", "charlie", "delta"]);
        let second = Fixed::new("second", &["echo"]);
        let set = pipeline(vec![first.clone(), second.clone()])
            .synthesize("q", "zulu")
            .await;
        assert_eq!(set.distractors, vec!["alpha", "bravo", "charlie"]);
        assert_eq!(set.genuine, 3);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_stage_degrades_to_zero_contribution() {
        let tail = Fixed::new("tail", &["respiration"]);
        let set = pipeline(vec![Arc::new(Failing), tail])
            .synthesize("q", "photosynthesis")
            .await;
        assert_eq!(set.distractors, vec!["respiration", "N/A", "N/A"]);
        assert!(set.is_padded());
    }

    #[tokio::test]
    async fn rejects_answer_duplicates_and_near_duplicates() {
        let src = Fixed::new(
            "src",
            &["", "Photosynthesis", "photosynthesys", "respiration", "RESPIRATION", "N/A", "fermentation"],
        );
        let set = pipeline(vec![src]).synthesize("q", "photosynthesis").await;
        assert_eq!(set.distractors, vec!["respiration", "fermentation", "N/A"]);
        assert_eq!(set.genuine, 2);
    }

    #[tokio::test]
    async fn accepted_distractors_are_not_similar_to_each_other() {
        let src = Fixed::new("src", &["Calvin cycle", "calvin cycles", "Krebs cycle"]);
        let set = pipeline(vec![src]).synthesize("q", "glycolysis").await;
        assert_eq!(set.distractors, vec!["Calvin cycle", "Krebs cycle", "N/A"]);
    }

    #[tokio::test]
    async fn seed_counts_towards_k() {
        let src = Fixed::new("src", &["delta", "echo"]);
        let seed = vec!["alpha".to_string(), "zulu".to_string(), "bravo".to_string()];
        let set = pipeline(vec![src]).synthesize_seeded("q", "zulu", &seed).await;
        assert_eq!(set.distractors, vec!["alpha", "bravo", "delta"]);
    }

    #[tokio::test]
    async fn empty_pipeline_pads_with_sentinel() {
        let set = pipeline(vec![]).synthesize("q", "a").await;
        assert_eq!(set.distractors, vec!["N/A"; 3]);
        assert_eq!(set.genuine, 0);
    }
}
