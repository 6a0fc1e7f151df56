//! Minimal chat client for OpenAI-compatible `chat/completions` and Google
//! Gemini `generateContent` endpoints.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, Provider};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".into(),
            content: MessageContent::Parts(parts),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Inline a PNG as a base64 data URL.
    pub fn png(bytes: &[u8], detail: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:image/png;base64,{encoded}"),
                detail: Some(detail.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Gemini wire format ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    // absent when the candidate was blocked
    #[serde(default)]
    content: Option<GeminiContent>,
}

/// Split `data:<mime>;base64,<payload>` into its mime type and payload.
fn split_data_url(url: &str) -> Option<(&str, &str)> {
    url.strip_prefix("data:")?.split_once(";base64,")
}

fn gemini_parts(content: &MessageContent) -> Result<Vec<GeminiPart>> {
    match content {
        MessageContent::Text(text) => Ok(vec![GeminiPart {
            text: Some(text.clone()),
            ..GeminiPart::default()
        }]),
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => Ok(GeminiPart {
                    text: Some(text.clone()),
                    ..GeminiPart::default()
                }),
                ContentPart::ImageUrl { image_url } => {
                    let (mime_type, data) = split_data_url(&image_url.url).ok_or_else(|| {
                        Error::ModelError("Gemini requests need inline base64 image data".into())
                    })?;
                    Ok(GeminiPart {
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: data.to_string(),
                        }),
                        ..GeminiPart::default()
                    })
                }
            })
            .collect(),
    }
}

/// System messages become the system instruction; `assistant` turns are
/// sent with Gemini's `model` role.
fn gemini_request(config: &ModelConfig, messages: &[ChatMessage]) -> Result<GeminiRequest> {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();
    for message in messages {
        let parts = gemini_parts(&message.content)?;
        match message.role.as_str() {
            "system" => system_parts.extend(parts),
            role => contents.push(GeminiContent {
                role: Some(if role == "assistant" { "model" } else { "user" }.to_string()),
                parts,
            }),
        }
    }

    Ok(GeminiRequest {
        system_instruction: (!system_parts.is_empty()).then(|| GeminiContent {
            role: None,
            parts: system_parts,
        }),
        contents,
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
        },
    })
}

/// Concatenated text parts of the first candidate.
fn gemini_text(response: GeminiResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    (!text.is_empty()).then_some(text)
}

/// Non-streaming chat client bound to one endpoint and model.
pub struct ChatClient {
    config: ModelConfig,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Send `messages` and return the first choice's text content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        tracing::debug!(
            provider = %self.config.provider,
            model = %self.config.model,
            messages = messages.len(),
            "sending chat request"
        );

        let content = match self.config.provider {
            Provider::OpenAi => self.complete_openai(messages).await?,
            Provider::Google => self.complete_gemini(messages).await?,
        };

        tracing::debug!(model = %self.config.model, content_len = content.len(), "chat response received");
        Ok(content)
    }

    async fn complete_openai(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(self.config.endpoint_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::ModelError("response contained no message content".into()))
    }

    async fn complete_gemini(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = gemini_request(&self.config, messages)?;

        let response = self
            .client
            .post(self.config.endpoint_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: GeminiResponse = response.json().await?;
        gemini_text(parsed)
            .ok_or_else(|| Error::ModelError("Gemini response contained no text".into()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let err_body = response.text().await.unwrap_or_default();
    Err(Error::ModelError(format!("{status}: {err_body}")))
}
