use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::HistoryItem;
use crate::config::ModuleConfig;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Stand-in text when the model answers without any text part.
pub const EMPTY_RESPONSE: &str = "(No text returned.)";

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
}

/// The text-generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, contents: &[HistoryItem]) -> Result<String, GeminiError>;
}

// --- Request types ---

#[derive(Serialize)]
struct Request {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

impl From<&HistoryItem> for Part {
    fn from(item: &HistoryItem) -> Self {
        match item {
            HistoryItem::Text(text) => Part::Text { text: text.clone() },
            HistoryItem::Image(image) => Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&image.data),
                },
            },
        }
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct Response {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

fn extract_text(response: Response) -> Result<Option<String>, GeminiError> {
    if let Some(err) = response.error {
        return Err(GeminiError::Api(err.message));
    }

    let text: String = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    Ok(Some(text).filter(|t| !t.trim().is_empty()))
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    system_instructions: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, api_key: String, settings: &ModuleConfig) -> Self {
        Self {
            http,
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            system_instructions: settings.system_instructions.clone(),
        }
    }

    fn build_request(&self, contents: &[HistoryItem]) -> Request {
        let system_instruction = if self.system_instructions.trim().is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: self.system_instructions.clone(),
                }],
            })
        };

        Request {
            system_instruction,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: contents.iter().map(Part::from).collect(),
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, contents: &[HistoryItem]) -> Result<String, GeminiError> {
        let request = self.build_request(contents);

        let resp = self
            .http
            .post(format!("{API_BASE}/{}:generateContent", self.model))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let response: Response = resp.json().await?;

        Ok(extract_text(response)?.unwrap_or_else(|| EMPTY_RESPONSE.to_string()))
    }
}
