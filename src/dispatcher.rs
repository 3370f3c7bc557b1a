//! Threshold policy deciding between a stored answer and a generated one.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::llm::Generator;
use crate::retriever::Retriever;
use crate::utils::fill_prompt;

pub const DEFAULT_THRESHOLD: f32 = 0.25;

/// Response body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub question: String,
    pub answer: String,
    pub score: f32,
}

/// Terminal state of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    EmptyInput,
    Matched,
    Generated,
    GenerationFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub outcome: Outcome,
    pub result: QueryResult,
}

/// Fixed user-facing strings.
#[derive(Debug, Clone)]
pub struct Messages {
    pub empty_input: String,
    pub generated_marker: String,
    pub failed_marker: String,
    pub retry: String,
    /// Prompt sent to the generator; `{question}` is replaced by the query.
    pub prompt_template: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            empty_input: "⚠️ 請輸入問題。".to_string(),
            generated_marker: "由 GPT 模型生成".to_string(),
            failed_marker: "GPT 回答失敗".to_string(),
            retry: "⚠️ 無法取得 GPT 回應，請稍後再試。".to_string(),
            prompt_template: "請以簡明法律說明回答以下問題：{question}".to_string(),
        }
    }
}

/// Shared, read-only request handler state.
pub struct Dispatcher {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    threshold: f32,
    messages: Messages,
}

impl Dispatcher {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Dispatcher {
            retriever,
            generator,
            threshold: DEFAULT_THRESHOLD,
            messages: Messages::default(),
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    /// Answers one question. Never fails: generator errors are logged and
    /// turned into the fixed retry message.
    pub async fn answer(&self, question: Option<&str>) -> Answer {
        let question = match question.map(str::trim) {
            Some(q) if !q.is_empty() => q,
            _ => {
                debug!(outcome = ?Outcome::EmptyInput, "empty question");
                return Answer {
                    outcome: Outcome::EmptyInput,
                    result: QueryResult {
                        question: String::new(),
                        answer: self.messages.empty_input.clone(),
                        score: 0.0,
                    },
                };
            }
        };

        let best = self.retriever.best_match(question);
        if let Some(best) = best.filter(|m| m.score >= self.threshold) {
            debug!(
                outcome = ?Outcome::Matched,
                entry = best.index,
                score = best.score,
                "answered from knowledge store"
            );
            return Answer {
                outcome: Outcome::Matched,
                result: QueryResult {
                    question: best.entry.question.clone(),
                    answer: best.entry.answer.clone(),
                    score: best.score,
                },
            };
        }
        let best_score = best.map_or(0.0, |m| m.score);

        let prompt = fill_prompt(&self.messages.prompt_template, question);
        match self.generator.complete(&prompt).await {
            Ok(text) => {
                debug!(
                    outcome = ?Outcome::Generated,
                    best_score,
                    "answered by generator"
                );
                Answer {
                    outcome: Outcome::Generated,
                    result: QueryResult {
                        question: self.messages.generated_marker.clone(),
                        answer: text.trim().to_string(),
                        score: 0.0,
                    },
                }
            }
            Err(err) => {
                warn!(
                    outcome = ?Outcome::GenerationFailed,
                    best_score,
                    error = %err,
                    detail = ?err,
                    "generator failed"
                );
                Answer {
                    outcome: Outcome::GenerationFailed,
                    result: QueryResult {
                        question: self.messages.failed_marker.clone(),
                        answer: self.messages.retry.clone(),
                        score: 0.0,
                    },
                }
            }
        }
    }
}
