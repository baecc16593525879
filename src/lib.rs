pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use reqwest::Client;

use crate::error::{Error, Result};
use crate::models::knowledge::KnowledgeBase;
use crate::services::keyword_service::FrequencyKeywordExtractor;
use crate::services::llm_service::{LanguageModel, OllamaClient, OpenAiClient};
use crate::services::loader_service::DocumentLoader;
use crate::services::mcq_service::McqService;
use crate::utils::similarity::SimilarityGate;

/// Upload ceiling for documents sent to `/api/mcq/upload`.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub mcq_service: McqService,
    pub max_questions: usize,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let config = crate::config::get_config();
        let timeout = Duration::from_secs(config.model_timeout_secs);
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Cannot build HTTP client: {}", e)))?;

        let local_model: Arc<dyn LanguageModel> = Arc::new(OllamaClient::new(
            http_client.clone(),
            config.ollama_host.clone(),
            config.ollama_model.clone(),
            timeout,
        ));
        let strict_model: Arc<dyn LanguageModel> = match &config.openai_api_key {
            Some(key) => Arc::new(OpenAiClient::new(
                http_client,
                key.clone(),
                config.openai_base_url.clone(),
                config.openai_model.clone(),
                timeout,
            )),
            None => {
                tracing::info!("OPENAI_API_KEY not set; strict backend uses the local model service");
                local_model.clone()
            }
        };

        let knowledge = match &config.knowledge_base_path {
            Some(path) => {
                let kb = KnowledgeBase::load(path).await?;
                tracing::info!(path = %path, entries = kb.curated.len(), "knowledge base loaded");
                kb
            }
            None => KnowledgeBase::builtin(),
        };

        let mcq_service = McqService::new(
            local_model,
            strict_model,
            Arc::new(FrequencyKeywordExtractor::new()),
            Arc::new(knowledge),
            DocumentLoader::default(),
            SimilarityGate::new(config.similarity_threshold),
        )
        .with_shuffle_seed(config.shuffle_seed);

        Ok(Self::from_parts(mcq_service, config.max_questions))
    }

    pub fn from_parts(mcq_service: McqService, max_questions: usize) -> Self {
        Self {
            mcq_service,
            max_questions,
        }
    }
}

/// Full application router; `generation_rps` caps the generation endpoints.
pub fn build_router(state: AppState, generation_rps: u32) -> Router {
    let generation_api = Router::new()
        .route("/api/mcq/generate", post(routes::mcq::generate_mcqs))
        .route("/api/mcq/upload", post(routes::mcq::upload_mcqs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_rps_state(generation_rps),
            middleware::rate_limit::rps_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(generation_api)
        .with_state(state)
}
