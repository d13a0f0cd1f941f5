//! OpenAI-compatible synthesis backend.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any other
//! endpoint exposing an OpenAI-compatible `/v1/chat/completions` API.
//!
//! One non-streaming chat completion per synthesis call: a system message
//! carrying the synthesis instructions and a user message carrying the
//! fused context plus the original query.

use async_trait::async_trait;
use contextfuse_core::error::SynthesisError;
use contextfuse_core::{SynthesisBackend, SynthesisRequest, SynthesisResponse, Usage};
use serde::Deserialize;
use tracing::{debug, warn};

/// An OpenAI-compatible synthesis backend.
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// Create a backend for any OpenAI-compatible endpoint.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, SynthesisError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| SynthesisError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create an OpenAI backend (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, SynthesisError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an OpenRouter backend (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Result<Self, SynthesisError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an Ollama backend. Ollama ignores the API key.
    pub fn ollama(base_url: Option<&str>) -> Result<Self, SynthesisError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(request: &SynthesisRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.prompt },
            ],
            "temperature": request.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl SynthesisBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> std::result::Result<SynthesisResponse, SynthesisError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(backend = %self.name, model = %request.model, "Sending synthesis request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout(e.to_string())
                } else {
                    SynthesisError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(SynthesisError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(SynthesisError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(SynthesisError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| SynthesisError::Api {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SynthesisError::Api {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(SynthesisResponse {
            answer: choice.message.content.unwrap_or_default(),
            model: api_response.model,
            usage,
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, SynthesisError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SynthesisRequest {
        SynthesisRequest {
            model: "gpt-4o".into(),
            system_prompt: "You are a synthesis engine.".into(),
            prompt: "<FUSED_CONTEXT></FUSED_CONTEXT>".into(),
            temperature: 0.3,
            max_tokens: Some(1024),
        }
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let backend =
            OpenAiCompatBackend::new("test", "https://example.com/v1/", "key").unwrap();
        assert_eq!(backend.base_url(), "https://example.com/v1");
    }

    #[test]
    fn convenience_constructors_set_endpoints() {
        let openai = OpenAiCompatBackend::openai("k").unwrap();
        assert_eq!(openai.name(), "openai");
        assert_eq!(openai.base_url(), "https://api.openai.com/v1");

        let ollama = OpenAiCompatBackend::ollama(None).unwrap();
        assert_eq!(ollama.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn request_body_carries_both_messages() {
        let body = OpenAiCompatBackend::request_body(&request());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn request_body_omits_absent_max_tokens() {
        let mut req = request();
        req.max_tokens = None;
        let body = OpenAiCompatBackend::request_body(&req);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn api_response_parses_without_usage() {
        let json = r#"{
            "model": "gpt-4o",
            "choices": [{ "message": { "content": "hello" } }]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hello"));
    }
}
