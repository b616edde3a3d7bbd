use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Anthropic;
use crate::vision::model::{ErrorResponse, MessagesResponse};

pub mod model;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/";

/// Instruction sent alongside every uploaded image.
const EXTRACT_PROMPT: &str = "Respond only with the name of this beer.";

/// Failure modes of a name-extraction call. `EmptyResponse` is kept apart
/// from the call-level failures so callers can tell "provider unreachable"
/// from "provider answered with nothing".
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to reach model provider: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model provider error {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("invalid model provider response: {0}")]
    Decode(String),
    #[error("No response from LLM")]
    EmptyResponse,
}

#[async_trait]
pub trait NameExtractor: Send + Sync {
    async fn extract_name(&self, media_type: &str, image: &[u8]) -> Result<String, ExtractError>;
}

#[derive(Clone)]
pub struct AnthropicClient {
    http: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    version: String,
    max_tokens: u32,
}

impl fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AnthropicClient {
    pub fn new(cfg: &Anthropic) -> Self {
        let base_url = Url::parse(ANTHROPIC_API_BASE).expect("valid default API URL");
        Self::with_base_url(cfg, base_url)
    }

    pub fn with_base_url(cfg: &Anthropic, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("brewpair/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        let endpoint = base_url
            .join("v1/messages")
            .expect("valid messages endpoint");
        Self {
            http,
            endpoint,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            version: cfg.version.clone(),
            max_tokens: cfg.max_tokens,
        }
    }

    pub fn build_request(&self, body: &Value) -> Result<reqwest::Request, ExtractError> {
        let request = self
            .http
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .header("content-type", "application/json")
            .json(body)
            .build()?;
        Ok(request)
    }

    /// Single-turn multimodal call: one image plus the fixed instruction.
    /// Returns the first content block's text with surrounding whitespace
    /// stripped; no further normalization is applied.
    pub async fn extract_name(
        &self,
        media_type: &str,
        image: &[u8],
    ) -> Result<String, ExtractError> {
        let body = build_extract_request(&self.model, self.max_tokens, media_type, image);
        let request = self.build_request(&body)?;
        debug!(url = %request.url(), model = %self.model, "requesting name extraction");

        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "model provider error: {}", body);
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ExtractError::Api { status, message });
        }

        let body = res.text().await?;
        let payload: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| ExtractError::Decode(e.to_string()))?;

        // The provider can answer with zero blocks; that is not a transport
        // failure and is reported as its own case.
        let Some(first) = payload.content.first() else {
            return Err(ExtractError::EmptyResponse);
        };
        // A non-text first block reads as empty text.
        Ok(first.text.as_deref().unwrap_or_default().trim().to_string())
    }
}

#[async_trait]
impl NameExtractor for AnthropicClient {
    async fn extract_name(&self, media_type: &str, image: &[u8]) -> Result<String, ExtractError> {
        AnthropicClient::extract_name(self, media_type, image).await
    }
}

/// Request body for `/v1/messages`: the image (base64, tagged with its
/// declared media type) followed by the instruction text.
pub fn build_extract_request(model: &str, max_tokens: u32, media_type: &str, image: &[u8]) -> Value {
    json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": [
            {
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": media_type,
                            "data": STANDARD.encode(image),
                        }
                    },
                    {
                        "type": "text",
                        "text": EXTRACT_PROMPT,
                    }
                ]
            }
        ]
    })
}
