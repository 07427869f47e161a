//! OpenAI-compatible chat completions as the classification service

use async_trait::async_trait;
use grader_usecase::{ClassificationRequest, ClassificationService, ClassifierError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use shared::ClassifierConfig;
use thiserror::Error;
use tracing::debug;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0} is not set")]
    MissingApiKey(&'static str),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

pub struct OpenAiClassificationService {
    http: reqwest::Client,
    headers: HeaderMap,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClassificationService {
    pub fn new(api_key: &str, config: &ClassifierConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            http: reqwest::Client::builder().build()?,
            headers,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Read the key from `OPENAI_API_KEY`
    pub fn from_env(config: &ClassifierConfig) -> Result<Self, GatewayError> {
        let key = api_key(std::env::var(API_KEY_VAR).ok())?;
        Self::new(&key, config)
    }

    fn body<'a>(&'a self, request: &ClassificationRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.instructions.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: request.payload.to_string(),
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        }
    }
}

fn api_key(value: Option<String>) -> Result<String, GatewayError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingApiKey(API_KEY_VAR))
}

fn reply_text(response: ChatResponse) -> Result<String, ClassifierError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ClassifierError::Service("no choices in response".to_string()))
}

#[async_trait]
impl ClassificationService for OpenAiClassificationService {
    async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassifierError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "Classification request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| ClassifierError::Service(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Service(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Service(e.to_string()))?;
        reply_text(parsed)
    }
}
