use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::models::knowledge::KnowledgeBase;
use crate::models::mcq::McqRecord;
use crate::services::distractor::{DistractorPipeline, DEFAULT_DISTRACTOR_COUNT};
use crate::services::keyword_service::KeywordExtractor;
use crate::services::llm_service::{LanguageModel, SamplingOptions};
use crate::services::loader_service::{DocumentLoader, DocumentSource};
use crate::services::parser_service::{parse_drafts, OutputLayout};
use crate::services::prompts::{
    answer_prompt, local_mcq_prompt, question_list_prompt, strict_mcq_prompt,
    QUESTION_PASSAGE_CHARS, STRICT_PASSAGE_CHARS,
};
use crate::utils::similarity::SimilarityGate;
use crate::utils::text::{
    eq_ignore_case, is_trivial_question, sanitize_answer, sanitize_free_answer, strip_list_marker,
    truncate_chars,
};

pub const OPTIONS_PER_QUESTION: usize = DEFAULT_DISTRACTOR_COUNT + 1;

static QUESTION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:Q(?:uestion)?\s*\d*\s*[.:)\-]\s*)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Local,
    Strict,
}

impl Backend {
    pub fn layout(self) -> OutputLayout {
        match self {
            Backend::Local => OutputLayout::Loose,
            Backend::Strict => OutputLayout::Labeled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    SinglePass,
    Stepwise,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub questions: Vec<McqRecord>,
    pub logs: Vec<String>,
    pub raw_output: Option<String>,
}

impl GenerationOutput {
    fn nothing(logs: Vec<String>, raw_output: Option<String>) -> Self {
        Self {
            questions: Vec::new(),
            logs,
            raw_output,
        }
    }
}

/// Combines `distractors` and `answer` into a shuffled option list and records
/// where the answer landed. Needs exactly `OPTIONS_PER_QUESTION - 1` distractors.
pub fn build_record<R: Rng + ?Sized>(
    question: String,
    answer: String,
    distractors: Vec<String>,
    rng: &mut R,
) -> Option<McqRecord> {
    if distractors.len() != OPTIONS_PER_QUESTION - 1 {
        return None;
    }
    let mut options: Vec<(bool, String)> = distractors.into_iter().map(|d| (false, d)).collect();
    options.push((true, answer));
    options.shuffle(rng);

    let correct_idx = options.iter().position(|(correct, _)| *correct)?;
    let options = options.into_iter().map(|(_, text)| text).collect();
    McqRecord::from_shuffled(question, options, correct_idx)
}

pub fn split_question_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(strip_list_marker)
        .map(|line| QUESTION_PREFIX.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[derive(Clone)]
pub struct McqService {
    local_model: Arc<dyn LanguageModel>,
    strict_model: Arc<dyn LanguageModel>,
    keywords: Arc<dyn KeywordExtractor>,
    knowledge: Arc<KnowledgeBase>,
    loader: DocumentLoader,
    gate: SimilarityGate,
    shuffle_seed: Option<u64>,
}

impl McqService {
    pub fn new(
        local_model: Arc<dyn LanguageModel>,
        strict_model: Arc<dyn LanguageModel>,
        keywords: Arc<dyn KeywordExtractor>,
        knowledge: Arc<KnowledgeBase>,
        loader: DocumentLoader,
        gate: SimilarityGate,
    ) -> Self {
        Self {
            local_model,
            strict_model,
            keywords,
            knowledge,
            loader,
            gate,
            shuffle_seed: None,
        }
    }

    pub fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        self.shuffle_seed = seed;
        self
    }

    pub fn model_for(&self, backend: Backend) -> Arc<dyn LanguageModel> {
        match backend {
            Backend::Local => self.local_model.clone(),
            Backend::Strict => self.strict_model.clone(),
        }
    }

    pub fn distractor_pipeline(&self, backend: Backend) -> DistractorPipeline {
        DistractorPipeline::standard(
            self.model_for(backend),
            self.keywords.clone(),
            self.knowledge.clone(),
            self.gate,
            OPTIONS_PER_QUESTION - 1,
        )
    }

    fn rng(&self) -> StdRng {
        match self.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Loads `source` and generates up to `num_questions` MCQs from it.
    ///
    /// Only loader failures are errors. Every shortfall after that (empty
    /// text, unusable model output, failed collaborator calls) shows up as
    /// fewer questions plus an entry in `logs`.
    pub async fn generate_mcqs(
        &self,
        source: DocumentSource,
        num_questions: usize,
        backend: Backend,
        mode: GenerationMode,
    ) -> Result<GenerationOutput> {
        let text = self.loader.load_text(source).await?;
        Ok(self.generate_from_text(&text, num_questions, backend, mode).await)
    }

    pub async fn generate_from_text(
        &self,
        text: &str,
        num_questions: usize,
        backend: Backend,
        mode: GenerationMode,
    ) -> GenerationOutput {
        if text.trim().is_empty() {
            tracing::warn!("input text is empty after extraction");
            return GenerationOutput::nothing(vec!["Input text is empty or unreadable.".into()], None);
        }
        if num_questions == 0 {
            return GenerationOutput::nothing(vec!["No questions requested.".into()], None);
        }

        match mode {
            GenerationMode::SinglePass => self.single_pass(text, num_questions, backend).await,
            GenerationMode::Stepwise => self.assemble(text, num_questions, backend).await,
        }
    }

    pub async fn single_pass(&self, text: &str, num_questions: usize, backend: Backend) -> GenerationOutput {
        let model = self.model_for(backend);
        let mut logs = vec![format!(
            "Starting single-pass generation of {} questions via {}.",
            num_questions,
            model.name()
        )];

        let prompt = match backend {
            Backend::Local => local_mcq_prompt(num_questions, text),
            Backend::Strict => strict_mcq_prompt(num_questions, truncate_chars(text, STRICT_PASSAGE_CHARS)),
        };

        let raw = match model.complete(&prompt, &SamplingOptions::full_mcq()).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(model = %model.name(), error = %e, "MCQ generation request failed");
                logs.push(format!("Model request failed: {}", e));
                return GenerationOutput::nothing(logs, None);
            }
        };

        let drafts = parse_drafts(&raw, backend.layout());
        if drafts.is_empty() {
            tracing::warn!(raw_len = raw.len(), "no valid MCQs parsed from model output");
            logs.push("No valid MCQs parsed; see raw output for troubleshooting.".into());
            return GenerationOutput::nothing(logs, Some(raw));
        }
        logs.push(format!("Parsed {} question blocks.", drafts.len()));

        let pipeline = self.distractor_pipeline(backend);
        let mut rng = self.rng();
        let mut questions = Vec::new();
        for draft in drafts {
            if questions.len() >= num_questions {
                break;
            }
            if is_trivial_question(&draft.question) {
                logs.push(format!("Skipped degenerate question: {:?}", draft.question));
                continue;
            }

            let answer = sanitize_answer(&draft.answer);
            let set = pipeline
                .synthesize_seeded(&draft.question, &answer, &draft.candidates)
                .await;
            if set.is_padded() {
                logs.push(format!(
                    "Only {} distractors found for {:?}; padded with N/A.",
                    set.genuine, draft.question
                ));
            }
            if let Some(record) = build_record(draft.question, answer, set.distractors, &mut rng) {
                questions.push(record);
            }
        }

        logs.push(format!("Finalized {} questions.", questions.len()));
        tracing::info!(count = questions.len(), ?backend, "single-pass generation finished");
        GenerationOutput {
            questions,
            logs,
            raw_output: Some(raw),
        }
    }

    /// Question-first flow: list questions, answer each one, synthesize
    /// distractors, shuffle. Never pads with made-up questions.
    pub async fn assemble(&self, text: &str, num_questions: usize, backend: Backend) -> GenerationOutput {
        let model = self.model_for(backend);
        let mut logs = vec![format!(
            "Starting stepwise generation of {} questions via {}.",
            num_questions,
            model.name()
        )];

        let passage = truncate_chars(text, QUESTION_PASSAGE_CHARS);
        let raw = match model
            .complete(&question_list_prompt(num_questions, passage), &SamplingOptions::question_listing())
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(model = %model.name(), error = %e, "question generation failed");
                logs.push(format!("Question generation failed: {}", e));
                return GenerationOutput::nothing(logs, None);
            }
        };

        let candidates = split_question_lines(&raw);
        logs.push(format!("Received {} candidate questions.", candidates.len()));

        let pipeline = self.distractor_pipeline(backend);
        let mut rng = self.rng();
        let mut seen: Vec<String> = Vec::new();
        let mut questions = Vec::new();
        for question in candidates {
            if questions.len() >= num_questions {
                break;
            }
            if is_trivial_question(&question) {
                logs.push(format!("Skipped degenerate question: {:?}", question));
                continue;
            }
            if seen.iter().any(|q| eq_ignore_case(q, &question)) {
                continue;
            }
            seen.push(question.clone());

            let answer = match model.complete(&answer_prompt(&question), &SamplingOptions::answer()).await {
                Ok(raw_answer) => sanitize_free_answer(&raw_answer),
                Err(e) => {
                    tracing::warn!(error = %e, "answer generation failed");
                    sanitize_answer("")
                }
            };

            let set = pipeline.synthesize(&question, &answer).await;
            if set.is_padded() {
                logs.push(format!(
                    "Only {} distractors found for {:?}; padded with N/A.",
                    set.genuine, question
                ));
            }
            if let Some(record) = build_record(question, answer, set.distractors, &mut rng) {
                questions.push(record);
            }
        }

        logs.push(format!("Finalized {} questions.", questions.len()));
        tracing::info!(count = questions.len(), ?backend, "stepwise generation finished");
        GenerationOutput {
            questions,
            logs,
            raw_output: Some(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::keyword_service::MockKeywordExtractor;
    use crate::services::llm_service::MockLanguageModel;
    use crate::utils::text::ANSWER_SENTINEL;

    fn scripted<F>(respond: F) -> Arc<dyn LanguageModel>
    where
        F: Fn(&str) -> Result<String> + Send + 'static,
    {
        let mut model = MockLanguageModel::new();
        model.expect_complete().returning(move |prompt, _| respond(prompt));
        model.expect_name().return_const("scripted".to_string());
        Arc::new(model)
    }

    fn failing_keywords() -> Arc<dyn KeywordExtractor> {
        let mut kw = MockKeywordExtractor::new();
        kw.expect_extract_topics()
            .returning(|_, _| Err(Error::ExternalService("extractor offline".into())));
        Arc::new(kw)
    }

    fn service(model: Arc<dyn LanguageModel>) -> McqService {
        McqService::new(
            model.clone(),
            model,
            failing_keywords(),
            Arc::new(KnowledgeBase::builtin()),
            DocumentLoader::default(),
            SimilarityGate::default(),
        )
        .with_shuffle_seed(Some(7))
    }

    fn assert_well_formed(record: &McqRecord) {
        assert_eq!(record.options.len(), OPTIONS_PER_QUESTION);
        assert_eq!(record.options.iter().filter(|o| **o == record.answer).count(), 1);
        assert_eq!(record.options[record.answer_letter.index()], record.answer);
    }

    #[test]
    fn build_record_keeps_answer_letter_in_sync() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let rec = build_record(
                "Which gas do plants absorb?".into(),
                "Carbon dioxide".into(),
                vec!["Oxygen".into(), "Nitrogen".into(), "Argon".into()],
                &mut rng,
            )
            .unwrap();
            assert_well_formed(&rec);
            assert_eq!(rec.answer, "Carbon dioxide");
        }
    }

    #[test]
    fn build_record_needs_three_distractors() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(build_record("q".into(), "a".into(), vec!["b".into()], &mut rng).is_none());
    }

    #[test]
    fn question_lines_are_cleaned() {
        let raw = "1. What is ATP?\nQ2: Where is DNA stored?\n\nQuestion 3 - Why do leaves fall?\nQuantum dots glow how?";
        assert_eq!(
            split_question_lines(raw),
            vec![
                "What is ATP?",
                "Where is DNA stored?",
                "Why do leaves fall?",
                "Quantum dots glow how?"
            ]
        );
    }

    #[tokio::test]
    async fn single_pass_local_resolves_letter_answers() {
        let model = scripted(|prompt| {
            assert!(prompt.starts_with("You are a quiz-making assistant."));
            Ok("Question 1: What gas do plants absorb from the air?
A. Oxygen
B. Carbon dioxide
C. Nitrogen
D. Argon
Answer: B"
                .into())
        });
        let out = service(model)
            .generate_from_text("Plants absorb carbon dioxide.", 3, Backend::Local, GenerationMode::SinglePass)
            .await;

        assert_eq!(out.questions.len(), 1);
        let rec = &out.questions[0];
        assert_well_formed(rec);
        assert_eq!(rec.answer, "Carbon dioxide");
        let mut opts = rec.options.clone();
        opts.sort();
        assert_eq!(opts, vec!["Argon", "Carbon dioxide", "Nitrogen", "Oxygen"]);
        assert!(out.raw_output.is_some());
    }

    #[tokio::test]
    async fn single_pass_strict_tops_up_short_option_lists() {
        let model = scripted(|prompt| {
            if prompt.starts_with("Generate 1 multiple-choice questions") {
                assert!(prompt.contains("Options:"));
                Ok("Question: Which process turns light into chemical energy?
Options:
A. Photosynthesis
B. Photosynthesys
C. photosynthesis
D. Respiration
Answer: A"
                    .into())
            } else {
                // distractor prompt
                Ok("- Fermentation\n- Transpiration".into())
            }
        });
        let out = service(model)
            .generate_from_text("Plants convert light.", 1, Backend::Strict, GenerationMode::SinglePass)
            .await;

        let rec = &out.questions[0];
        assert_well_formed(rec);
        assert_eq!(rec.answer, "Photosynthesis");
        assert!(rec.options.contains(&"Respiration".to_string()));
        assert!(rec.options.contains(&"Fermentation".to_string()));
        assert!(!rec.options.contains(&"Photosynthesys".to_string()));
    }

    #[tokio::test]
    async fn unparseable_output_yields_zero_records() {
        let model = scripted(|_| Ok("Hello, I cannot help with that.".into()));
        let out = service(model)
            .generate_from_text("Some passage.", 2, Backend::Strict, GenerationMode::SinglePass)
            .await;
        assert!(out.questions.is_empty());
        assert_eq!(out.raw_output.as_deref(), Some("Hello, I cannot help with that."));
        assert!(out.logs.iter().any(|l| l.contains("No valid MCQs parsed")));
    }

    #[tokio::test]
    async fn model_outage_is_reported_not_raised() {
        let model = scripted(|_| Err(Error::ExternalService("connection refused".into())));
        let out = service(model)
            .generate_from_text("Some passage.", 2, Backend::Local, GenerationMode::Stepwise)
            .await;
        assert!(out.questions.is_empty());
        assert!(out.logs.iter().any(|l| l.contains("connection refused")));
    }

    #[tokio::test]
    async fn empty_input_yields_zero_records() {
        let model = scripted(|_| panic!("model must not be called"));
        let out = service(model)
            .generate_from_text("   \n ", 3, Backend::Local, GenerationMode::SinglePass)
            .await;
        assert!(out.questions.is_empty());
        assert_eq!(out.logs, vec!["Input text is empty or unreadable."]);
    }

    #[tokio::test]
    async fn stepwise_falls_back_to_curated_distractors() {
        let model = scripted(|prompt| {
            if prompt.starts_with("Generate 1 short factual quiz questions") {
                Ok("1. What process do green plants use to make food from sunlight?".into())
            } else if prompt.starts_with("Answer this question") {
                Ok("Photosynthesis.".into())
            } else {
                Ok(String::new())
            }
        });
        let out = service(model)
            .generate_from_text(
                "Photosynthesis is the process by which green plants use sunlight to synthesize food from carbon dioxide and water.",
                1,
                Backend::Local,
                GenerationMode::Stepwise,
            )
            .await;

        assert_eq!(out.questions.len(), 1);
        let rec = &out.questions[0];
        assert_well_formed(rec);
        assert_eq!(rec.answer, "Photosynthesis");
        let curated = ["respiration", "chemosynthesis", "fermentation", "Calvin cycle"];
        assert!(rec.options.iter().any(|o| curated.contains(&o.as_str())));
        assert!(!rec.options.contains(&"chemosynthesis".to_string()));
    }

    #[tokio::test]
    async fn stepwise_numeric_answers_skip_the_model_stage() {
        let model = scripted(|prompt| {
            if prompt.starts_with("Generate 1 short factual quiz questions") {
                Ok("How many items are in the box?".into())
            } else if prompt.starts_with("Answer this question") {
                Ok("7 items total".into())
            } else {
                panic!("distractor prompt should not be reached: {prompt}");
            }
        });
        let out = service(model)
            .generate_from_text("The box holds 7 items.", 1, Backend::Local, GenerationMode::Stepwise)
            .await;

        let rec = &out.questions[0];
        assert_well_formed(rec);
        let allowed = ["6", "8", "5", "9"];
        let distractors: Vec<_> = rec.options.iter().filter(|o| **o != rec.answer).collect();
        assert_eq!(distractors.len(), 3);
        assert!(distractors.iter().all(|d| allowed.contains(&d.as_str())));
    }

    #[tokio::test]
    async fn stepwise_skips_degenerate_questions_and_sanitizes_answers() {
        let model = scripted(|prompt| {
            if prompt.starts_with("Generate") && prompt.contains("short factual") {
                Ok("True\nWhy?\nWhat is stored inside the nucleus?\nWhat is stored inside the nucleus?".into())
            } else if prompt.starts_with("Answer this question") {
                Ok("false".into())
            } else {
                Ok("DNA\nRNA\nProteins\nLipids".into())
            }
        });
        let out = service(model)
            .generate_from_text("Cells have a nucleus.", 5, Backend::Local, GenerationMode::Stepwise)
            .await;

        assert_eq!(out.questions.len(), 1);
        assert_eq!(out.questions[0].answer, ANSWER_SENTINEL);
        assert_well_formed(&out.questions[0]);
        assert_eq!(
            out.logs.iter().filter(|l| l.starts_with("Skipped degenerate question")).count(),
            2
        );
    }

    #[tokio::test]
    async fn never_returns_more_than_requested() {
        let block = |n: usize, q: &str| {
            format!("Question {n}: {q}\nA. alpha\nB. bravo\nC. charlie\nD. delta\nAnswer: A\n\n")
        };
        let raw = format!(
            "{}{}{}",
            block(1, "Which letter comes first?"),
            block(2, "Which letter is the second one?"),
            block(3, "Which letter is the third one?")
        );
        let model = scripted(move |_| Ok(raw.clone()));
        let out = service(model)
            .generate_from_text("Letters.", 2, Backend::Local, GenerationMode::SinglePass)
            .await;
        assert_eq!(out.questions.len(), 2);
        out.questions.iter().for_each(assert_well_formed);
    }

    #[tokio::test]
    async fn option_answers_keep_their_punctuation() {
        let model = scripted(|prompt| {
            assert!(prompt.starts_with("You are a quiz-making assistant."));
            Ok("Question 1: Which city is the capital of the United States?
A. New York City
B. Washington D.C.
C. Boston
D. Chicago
Answer: B"
                .into())
        });
        let out = service(model)
            .generate_from_text("Capitals.", 1, Backend::Local, GenerationMode::SinglePass)
            .await;

        let rec = &out.questions[0];
        assert_eq!(rec.answer, "Washington D.C.");
        assert_well_formed(rec);
    }
}
