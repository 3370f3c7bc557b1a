//! Fallback generator: a remote chat-completion model consulted when no
//! stored question is close enough.
//!
//! The dispatcher only sees the [`Generator`] trait. [`OpenAiLlm`] talks to
//! any OpenAI-compatible `POST {base_url}/v1/chat/completions` endpoint with a
//! single, non-streaming user message.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::utils::make_snippet;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Text completion collaborator. Implementations may fail for any reason;
/// callers treat every failure the same way.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    /// `None` keeps the service up but makes every completion fail.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: None,
            timeout_secs: 60,
        }
    }
}

pub struct OpenAiLlm {
    client: reqwest::Client,
    config: LLMConfig,
    url_chat: String,
}

impl OpenAiLlm {
    pub fn new(config: LLMConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let url_chat = format!(
            "{}/v1/chat/completions",
            config.base_url.trim().trim_end_matches('/')
        );

        if config.api_key.is_none() {
            warn!("no API key configured; fallback generation will fail until one is set");
        }
        info!(
            model = %config.model,
            endpoint = %url_chat,
            timeout_secs = config.timeout_secs,
            "generator initialized"
        );

        Ok(OpenAiLlm {
            client,
            config,
            url_chat,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl Generator for OpenAiLlm {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;

        let started = Instant::now();
        debug!(model = %self.config.model, prompt_len = prompt.len(), "POST {}", self.url_chat);

        let resp = self
            .client
            .post(&self.url_chat)
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(GenerationError::HttpStatus {
                status,
                snippet: make_snippet(&text, 200),
            });
        }

        let content = parse_completion(&text)?;
        info!(
            model = %self.config.model,
            latency_ms = started.elapsed().as_millis(),
            "chat completion finished"
        );
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Extracts `choices[0].message.content` (first choice that has content).
fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let resp: ChatResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::Decode(format!(
            "{e}; expected `choices[0].message.content` in {}",
            make_snippet(body, 200)
        ))
    })?;

    resp.choices
        .into_iter()
        .find_map(|c| c.message.content)
        .ok_or(GenerationError::EmptyChoices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::post;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    /// Authorization header and JSON body of each request the stub received.
    type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    /// Serves a fixed reply on `/v1/chat/completions` from a local port.
    async fn spawn_chat_stub(status: StatusCode, reply: &'static str) -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, axum::Json(body): axum::Json<Value>| {
                let recorded = recorded.clone();
                async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    recorded.lock().unwrap().push((auth, body));
                    (status, reply)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn llm_for(base_url: String) -> OpenAiLlm {
        OpenAiLlm::new(LLMConfig {
            api_key: Some("test-key".into()),
            base_url,
            timeout_secs: 5,
            ..LLMConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "  契約是一種法律行為。\n"}}
            ]
        }"#;
        assert_eq!(parse_completion(body).unwrap(), "  契約是一種法律行為。\n");
    }

    #[test]
    fn empty_choices_is_an_error() {
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(GenerationError::EmptyChoices)
        ));
        let null_content = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        assert!(matches!(
            parse_completion(null_content),
            Err(GenerationError::EmptyChoices)
        ));
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        assert!(matches!(
            parse_completion("<html>502 Bad Gateway</html>"),
            Err(GenerationError::Decode(_))
        ));
    }

    #[test]
    fn request_body_carries_model_and_prompt() {
        let llm = OpenAiLlm::new(LLMConfig {
            temperature: Some(0.2),
            ..LLMConfig::default()
        })
        .unwrap();

        let json = serde_json::to_value(llm.request_body("hello")).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
        assert!(json.get("max_tokens").is_none());
        assert!(json["temperature"].as_f64().is_some());
    }

    #[test]
    fn chat_url_ignores_trailing_slash() {
        let llm = OpenAiLlm::new(LLMConfig {
            base_url: "http://localhost:8080/".into(),
            ..LLMConfig::default()
        })
        .unwrap();
        assert_eq!(llm.url_chat, "http://localhost:8080/v1/chat/completions");
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let llm = OpenAiLlm::new(LLMConfig::default()).unwrap();
        assert!(matches!(
            llm.complete("anything").await,
            Err(GenerationError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let llm = OpenAiLlm::new(LLMConfig {
            api_key: Some("test-key".into()),
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 5,
            ..LLMConfig::default()
        })
        .unwrap();
        assert!(matches!(
            llm.complete("anything").await,
            Err(GenerationError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn completion_round_trip_over_http() {
        let (base_url, seen) = spawn_chat_stub(
            StatusCode::OK,
            r#"{"choices": [{"message": {"role": "assistant", "content": " hi "}}]}"#,
        )
        .await;

        let content = llm_for(base_url).complete("什麼是契約？").await.unwrap();
        assert_eq!(content, " hi ");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer test-key"));
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["content"], "什麼是契約？");
    }

    #[tokio::test]
    async fn non_success_status_keeps_code_and_body() {
        let (base_url, _) = spawn_chat_stub(StatusCode::TOO_MANY_REQUESTS, "quota").await;

        match llm_for(base_url).complete("anything").await {
            Err(GenerationError::HttpStatus { status, snippet }) => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(snippet, "quota");
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_with_unexpected_body_is_a_decode_error() {
        let (base_url, _) = spawn_chat_stub(StatusCode::OK, "not json").await;
        assert!(matches!(
            llm_for(base_url).complete("anything").await,
            Err(GenerationError::Decode(_))
        ));
    }
}
