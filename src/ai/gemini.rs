use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{system_instruction, ChatCollaborator, ChatSession};
use crate::config::Config;
use crate::error::AiError;
use crate::models::LearningLevel;

/// Fallback variable checked when the configured one is unset
const FALLBACK_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: "user",
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: "model",
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

/// Shared HTTP plumbing for the Generative Language `generateContent` endpoint
#[derive(Clone)]
struct Endpoint {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl Endpoint {
    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate(&self, body: &Value) -> Result<String, AiError> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let resp_json: Value = response.json().await?;

        if let Some((prompt_tokens, response_tokens)) = token_usage(&resp_json) {
            tracing::info!(
                model = %self.model,
                prompt_tokens,
                response_tokens,
                latency = ?start.elapsed(),
                "AI usage"
            );
        }

        extract_text(&resp_json).ok_or(AiError::EmptyResponse)
    }
}

/// Prompt and response token counts from `usageMetadata`, if reported
fn token_usage(resp: &Value) -> Option<(u64, u64)> {
    let usage = resp.get("usageMetadata")?;
    let count = |field: &str| usage.get(field).and_then(Value::as_u64).unwrap_or(0);
    Some((count("promptTokenCount"), count("candidatesTokenCount")))
}

/// Concatenate the text parts of the first candidate
fn extract_text(resp: &Value) -> Option<String> {
    let parts = resp
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn practice_problem_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "question": { "type": "STRING", "description": "The question text." },
            "options": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "An array of 4 possible answers."
            },
            "correctAnswerIndex": {
                "type": "INTEGER",
                "description": "The 0-based index of the correct answer in the options array."
            },
            "explanation": { "type": "STRING", "description": "A brief explanation for the correct answer." }
        },
        "required": ["question", "options", "correctAnswerIndex", "explanation"]
    })
}

/// Gemini over plain REST
pub struct GeminiClient {
    endpoint: Endpoint,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: Endpoint {
                client,
                base_url,
                model,
                api_key,
            },
        })
    }

    /// Build a client from config, reading the API key from the configured
    /// environment variable (or `GEMINI_API_KEY`).
    pub fn from_config(cfg: &Config) -> Result<Self, AiError> {
        let api_key = std::env::var(&cfg.api_key_env)
            .or_else(|_| std::env::var(FALLBACK_KEY_ENV))
            .map_err(|_| AiError::MissingApiKey(cfg.api_key_env.clone()))?;

        Self::new(
            api_key,
            cfg.api_base_url.clone(),
            cfg.model.clone(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.endpoint.model
    }
}

#[async_trait]
impl ChatCollaborator for GeminiClient {
    fn start_chat(&self, level: LearningLevel) -> Arc<dyn ChatSession> {
        Arc::new(GeminiChat {
            endpoint: self.endpoint.clone(),
            system_instruction: system_instruction(level),
            history: Mutex::new(Vec::new()),
        })
    }

    async fn generate_structured(&self, prompt: &str) -> Result<Value, AiError> {
        let body = json!({
            "contents": [Content::user(prompt)],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": practice_problem_schema(),
            }
        });

        let text = self.endpoint.generate(&body).await?;
        Ok(serde_json::from_str(text.trim())?)
    }
}

/// A conversation; the transcript is resent with every turn
struct GeminiChat {
    endpoint: Endpoint,
    system_instruction: String,
    history: Mutex<Vec<Content>>,
}

impl GeminiChat {
    fn request_body(&self, history: &[Content], next: &Content) -> Value {
        let contents: Vec<&Content> = history.iter().chain(std::iter::once(next)).collect();
        json!({
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
            "contents": contents,
        })
    }
}

#[async_trait]
impl ChatSession for GeminiChat {
    async fn send_message(&self, text: &str) -> Result<String, AiError> {
        let mut history = self.history.lock().await;
        let user_turn = Content::user(text);
        let body = self.request_body(&history, &user_turn);

        let reply = self.endpoint.generate(&body).await?;

        // only successful exchanges become part of the transcript
        history.push(user_turn);
        history.push(Content::model(&reply));
        Ok(reply)
    }
}
