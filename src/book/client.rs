use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::GenerationError;
use super::prompt::Message;

const DEFAULT_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com";
const GENERATION_PATH: &str = "/api/v1/services/aigc/text-generation/generation";

/// Client for the DashScope (Qwen) text-generation API.
#[derive(Debug, Clone)]
pub struct QwenClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
    result_format: &'static str,
}

#[derive(Debug, Serialize)]
struct GenerationInput<'a> {
    messages: &'a [Message],
}

#[derive(Debug, Default, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    output: GenerationOutput,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl GenerationResponse {
    /// `output.text`, else the first choice's message content.
    fn into_text(self) -> Option<String> {
        let GenerationOutput { text, choices } = self.output;
        text.filter(|t| !t.is_empty()).or_else(|| {
            choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .filter(|t| !t.is_empty())
        })
    }
}

impl Default for QwenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QwenClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "qwen-plus".to_string(),
            timeout: Duration::from_secs(300), // whole books take a while
        }
    }

    /// Override the API base (scheme + host), e.g. for a regional endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL of the generation endpoint.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the configured base URL is invalid.
    pub fn endpoint(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}{GENERATION_PATH}", self.base_url))
    }

    /// Send `messages` and return the generated text.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] on an invalid base URL, transport failure or
    /// timeout, any status other than `200 OK`, an undecodable body, or a
    /// response without text.
    pub async fn generate(
        &self,
        api_key: &str,
        messages: &[Message],
    ) -> Result<String, GenerationError> {
        let body = GenerationRequest {
            model: &self.model,
            input: GenerationInput { messages },
            result_format: "message",
        };

        let response = self
            .http
            .post(self.endpoint()?)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerationResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Decode(format!("{e}, response body: {text}")))?;

        parsed.into_text().ok_or(GenerationError::EmptyOutput)
    }
}
