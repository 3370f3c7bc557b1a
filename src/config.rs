use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::dispatcher::DEFAULT_THRESHOLD;
use crate::error::ConfigError;
use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL, LLMConfig};

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_KNOWLEDGE_PATH: &str = "vector_database.json";
pub const DEFAULT_INDEX_PAGE: &str = "static/index.html";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub knowledge_path: PathBuf,
    pub index_page: PathBuf,
    /// Minimum similarity (inclusive) for a stored answer to be used.
    pub threshold: f32,
    /// Overrides the default generator prompt; must contain `{question}`
    /// to place the question anywhere but the end.
    pub prompt_template: Option<String>,
    pub llm: LLMConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let threshold = parse_or(&get, "SIMILARITY_THRESHOLD", DEFAULT_THRESHOLD)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                key: "SIMILARITY_THRESHOLD",
                value: threshold.to_string(),
            });
        }

        Ok(AppConfig {
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            knowledge_path: get("KNOWLEDGE_PATH")
                .unwrap_or_else(|| DEFAULT_KNOWLEDGE_PATH.into())
                .into(),
            index_page: get("INDEX_PAGE")
                .unwrap_or_else(|| DEFAULT_INDEX_PAGE.into())
                .into(),
            threshold,
            prompt_template: get("PROMPT_TEMPLATE"),
            llm: LLMConfig {
                api_key: get("OPENAI_API_KEY"),
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
                max_tokens: parse_opt(&get, "OPENAI_MAX_TOKENS")?,
                temperature: parse_opt(&get, "OPENAI_TEMPERATURE")?,
                timeout_secs: parse_or(&get, "OPENAI_TIMEOUT_SECS", 60)?,
            },
        })
    }
}

fn parse_opt<T, F>(get: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value })
        })
        .transpose()
}

fn parse_or<T, F>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}
