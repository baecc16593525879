use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub ollama_host: String,
    pub ollama_model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub model_timeout_secs: u64,
    pub max_questions: usize,
    pub similarity_threshold: f64,
    pub knowledge_base_path: Option<String>,
    pub generation_rps: u32,
    pub shuffle_seed: Option<u64>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let similarity_threshold: f64 = get_env_parse_or("SIMILARITY_THRESHOLD", 0.7)?;
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(Error::Config(format!(
                "Invalid value for SIMILARITY_THRESHOLD: {} is outside [0, 1]",
                similarity_threshold
            )));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            ollama_host: get_env_or("OLLAMA_HOST", "http://localhost:11434"),
            ollama_model: get_env_or("OLLAMA_MODEL", "mistral"),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            openai_base_url: get_env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_model: get_env_or("OPENAI_MODEL", "gpt-3.5-turbo"),
            model_timeout_secs: get_env_parse_or("MODEL_TIMEOUT_SECS", 120)?,
            max_questions: get_env_parse_or("MAX_QUESTIONS", 10)?,
            similarity_threshold,
            knowledge_base_path: env::var("KNOWLEDGE_BASE_PATH").ok(),
            generation_rps: get_env_parse_or("GENERATION_RPS", 2)?,
            shuffle_seed: env::var("SHUFFLE_SEED")
                .ok()
                .map(|raw| {
                    raw.parse().map_err(|e| {
                        Error::Config(format!("Invalid value for SHUFFLE_SEED: {}", e))
                    })
                })
                .transpose()?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
