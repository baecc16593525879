use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl SamplingOptions {
    pub fn question_listing() -> Self {
        Self {
            temperature: Some(0.8),
            top_p: Some(0.9),
            top_k: None,
            max_tokens: Some(256),
        }
    }

    pub fn answer() -> Self {
        Self {
            temperature: Some(0.0),
            top_p: None,
            top_k: None,
            max_tokens: Some(64),
        }
    }

    pub fn distractors() -> Self {
        Self {
            temperature: Some(0.8),
            top_p: Some(0.9),
            top_k: Some(50),
            max_tokens: Some(64),
        }
    }

    pub fn full_mcq() -> Self {
        Self {
            temperature: Some(0.9),
            top_p: Some(0.9),
            top_k: None,
            max_tokens: Some(512),
        }
    }
}

/// Opaque text-completion service. Output is never assumed to follow the
/// structure the prompt asked for.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str, options: &SamplingOptions) -> Result<String>;

    fn name(&self) -> String;
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(client: Client, host: String, model: String, timeout: Duration) -> Self {
        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            model,
            timeout,
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str, options: &SamplingOptions) -> Result<String> {
        #[derive(Serialize)]
        struct OllamaOptions {
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            top_p: Option<f32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            top_k: Option<u32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            num_predict: Option<u32>,
        }
        #[derive(Serialize)]
        struct GenerateReq<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
            options: OllamaOptions,
        }

        let req = GenerateReq {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
                num_predict: options.max_tokens,
            },
        };

        let res = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&req)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!("Ollama error {}: {}", status, text)));
        }

        let body: JsonValue = res.json().await?;
        body.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::ExternalService("Invalid Ollama response format".into()))
    }

    fn name(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(
        client: Client,
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, prompt: &str, options: &SamplingOptions) -> Result<String> {
        let mut payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
        });
        if let Some(t) = options.temperature {
            payload["temperature"] = serde_json::json!(t);
        }
        if let Some(p) = options.top_p {
            payload["top_p"] = serde_json::json!(p);
        }
        if let Some(m) = options.max_tokens {
            payload["max_tokens"] = serde_json::json!(m);
        }

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!("OpenAI API Error {}: {}", status, text)));
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::ExternalService("Invalid OpenAI response format".into()))
    }

    fn name(&self) -> String {
        format!("openai:{}", self.model)
    }
}
