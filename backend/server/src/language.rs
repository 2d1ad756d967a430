//! # Entity Extraction
//!
//! Guesses are compared by the named entities they contain, not by raw text.
//!
//! - `LanguageClient` asks the hosted natural-language API (`documents:analyzeEntities`)
//! - `WordExtractor` is the offline fallback: every sanitized word counts as an entity
//!
//! A non-2xx answer from the API is always `LanguageError::Api`, whatever its body looks like.
//!
//! The server picks the client when `LANGUAGE_API_KEY` is available, otherwise the fallback.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::utils::sanitize;

pub const DEFAULT_LANGUAGE_URL: &str = "https://language.googleapis.com/v1";

#[derive(Error, Debug)]
pub enum LanguageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<String>, LanguageError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeEntitiesRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

#[derive(Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeEntitiesResponse {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Deserialize)]
struct Entity {
    name: String,
}

/// Client for the hosted natural-language API.
pub struct LanguageClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl LanguageClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_LANGUAGE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/documents:analyzeEntities", self.base_url)
    }
}

fn request_body(content: &str) -> AnalyzeEntitiesRequest<'_> {
    AnalyzeEntitiesRequest {
        document: Document {
            kind: "PLAIN_TEXT",
            content,
        },
        encoding_type: "UTF16",
    }
}

fn parse_entities(body: serde_json::Value) -> Result<Vec<String>, LanguageError> {
    let response: AnalyzeEntitiesResponse = serde_json::from_value(body)?;

    Ok(response.entities.into_iter().map(|entity| entity.name).collect())
}

/// `error.message` from a JSON error body, otherwise the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|body| {
            body.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| match body.trim() {
            "" => "Unknown error".to_string(),
            raw => raw.to_string(),
        })
}

#[async_trait]
impl EntityExtractor for LanguageClient {
    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn extract(&self, text: &str) -> Result<Vec<String>, LanguageError> {
        let content = text.to_lowercase();

        debug!("Sending analyzeEntities request");

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&request_body(&content))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LanguageError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_entities(serde_json::from_str(&body)?)
    }
}

/// Treats every sanitized word as an entity.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordExtractor;

#[async_trait]
impl EntityExtractor for WordExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<String>, LanguageError> {
        Ok(sanitize(text)
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }
}
