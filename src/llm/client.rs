//! Async HTTP client for the decision service
//!
//! Model-agnostic: speaks the Anthropic messages API, OpenAI-compatible chat
//! completions, and Gemini `generateContent`, picked from the URL. A failed
//! call is retried with the configured retry model before giving up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::config::DecisionServiceConfig;
use crate::core::error::{Result, ZoneError};
use crate::llm::service::DecisionRequest;

/// Environment variables checked for an API key, in priority order
pub const API_KEY_ENV_VARS: [&str; 5] = [
    "ZONE_CONTROL_API_KEY",
    "LLM_API_KEY",
    "ANTHROPIC_API_KEY",
    "OPENAI_API_KEY",
    "GEMINI_API_KEY",
];

/// API format type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
    Gemini,
}

impl ApiFormat {
    pub fn provider(&self) -> &'static str {
        match self {
            ApiFormat::Anthropic => "anthropic",
            ApiFormat::OpenAI => "openai",
            ApiFormat::Gemini => "gemini",
        }
    }
}

/// Text returned by a completion plus the model that produced it
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub provider: &'static str,
}

pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    retry_model: Option<String>,
    retry_count: u32,
    api_format: ApiFormat,
}

impl LlmClient {
    /// Create a client with explicit key and URL, no retries
    pub fn new(api_key: String, api_url: String) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            retry_model: None,
            retry_count: 0,
            api_format,
        }
    }

    /// Build from configuration, resolving the API key from the environment
    /// or the key file
    pub fn from_config(config: &DecisionServiceConfig) -> Result<Self> {
        let api_key = resolve_api_key(config.key_file.as_deref())?;
        let client = Client::builder()
            .timeout(Duration::from_secs_f32(config.timeout_seconds.max(0.1)))
            .build()
            .map_err(|e| ZoneError::Llm(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            api_url: config.api_url.clone(),
            retry_model: Some(config.retry_model.clone()).filter(|m| !m.is_empty()),
            retry_count: config.retry_count,
            api_format: Self::detect_api_format(&config.api_url),
        })
    }

    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else if url.contains("generativelanguage.googleapis.com") {
            ApiFormat::Gemini
        } else {
            ApiFormat::OpenAI
        }
    }

    pub fn api_format(&self) -> ApiFormat {
        self.api_format
    }

    /// Send the request, retrying with the retry model on failure
    pub async fn complete(&self, request: &DecisionRequest) -> Result<Completion> {
        let mut last_error = match self.complete_with_model(&request.model, request).await {
            Ok(text) => return Ok(self.completion(text, &request.model)),
            Err(e) => e,
        };

        for attempt in 0..self.retry_count {
            let model = self.retry_model.as_deref().unwrap_or(&request.model);
            tracing::warn!(attempt = attempt + 1, model, error = %last_error, "decision request failed, retrying");
            match self.complete_with_model(model, request).await {
                Ok(text) => return Ok(self.completion(text, model)),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    fn completion(&self, text: String, model: &str) -> Completion {
        Completion {
            text,
            model: model.to_string(),
            provider: self.api_format.provider(),
        }
    }

    async fn complete_with_model(&self, model: &str, request: &DecisionRequest) -> Result<String> {
        let text = match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(model, request).await?,
            ApiFormat::OpenAI => self.complete_openai(model, request).await?,
            ApiFormat::Gemini => self.complete_gemini(model, request).await?,
        };
        if text.trim().is_empty() {
            return Err(ZoneError::Llm("Empty response".into()));
        }
        Ok(text)
    }

    async fn complete_anthropic(&self, model: &str, request: &DecisionRequest) -> Result<String> {
        let body = AnthropicRequest {
            model: model.to_string(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system_prompt.clone(),
            messages: vec![Message {
                role: "user".into(),
                content: request.snapshot_json.clone(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ZoneError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ZoneError::Llm(format!("API error {}: {}", status, error_text)));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ZoneError::Llm(e.to_string()))?;

        completion
            .content
            .into_iter()
            .find_map(|c| c.text)
            .ok_or_else(|| ZoneError::Llm("Empty response".into()))
    }

    async fn complete_openai(&self, model: &str, request: &DecisionRequest) -> Result<String> {
        let body = OpenAIRequest {
            model: model.to_string(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: request.system_prompt.clone(),
                },
                Message {
                    role: "user".into(),
                    content: request.snapshot_json.clone(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ZoneError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ZoneError::Llm(format!("API error {}: {}", status, error_text)));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ZoneError::Llm(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| ZoneError::Llm("Empty response".into()))
    }

    async fn complete_gemini(&self, model: &str, request: &DecisionRequest) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_url.trim_end_matches('/'), model);
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system_prompt.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".into()),
                parts: vec![GeminiPart {
                    text: request.snapshot_json.clone(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ZoneError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ZoneError::Llm(format!("API error {}: {}", status, error_text)));
        }

        let completion: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ZoneError::Llm(e.to_string()))?;

        completion
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .map(|p| p.text)
            .find(|t| !t.is_empty())
            .ok_or_else(|| ZoneError::Llm("Empty response".into()))
    }
}

/// Resolve the API key: environment variables in priority order, then the
/// key file (explicit path, or `~/.zone_control/api_key`)
pub fn resolve_api_key(key_file: Option<&Path>) -> Result<String> {
    resolve_api_key_with(|name| std::env::var(name).ok(), key_file)
}

fn resolve_api_key_with(env: impl Fn(&str) -> Option<String>, key_file: Option<&Path>) -> Result<String> {
    for name in API_KEY_ENV_VARS {
        if let Some(key) = env(name).map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            tracing::debug!(source = name, "API key resolved from environment");
            return Ok(key);
        }
    }

    let path = match key_file {
        Some(path) => path.to_path_buf(),
        None => default_key_file(&env)
            .ok_or_else(|| ZoneError::Llm("no API key in environment and no key file".into()))?,
    };
    let key = std::fs::read_to_string(&path)
        .map_err(|e| ZoneError::Llm(format!("no API key in environment, key file {}: {}", path.display(), e)))?;
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(ZoneError::Llm(format!("key file {} is empty", path.display())));
    }
    Ok(key)
}

fn default_key_file(env: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    env("HOME").map(|home| PathBuf::from(home).join(".zone_control").join("api_key"))
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// Gemini generateContent format
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            LlmClient::new("k".into(), "https://api.anthropic.com/v1/messages".into()).api_format(),
            ApiFormat::Anthropic
        );
        assert_eq!(
            LlmClient::new("k".into(), "https://generativelanguage.googleapis.com/v1beta".into()).api_format(),
            ApiFormat::Gemini
        );
        assert_eq!(
            LlmClient::new("k".into(), "https://api.deepseek.com/chat/completions".into()).api_format(),
            ApiFormat::OpenAI
        );
    }

    #[test]
    fn test_key_priority_order() {
        let env: HashMap<&str, &str> = [("OPENAI_API_KEY", "openai"), ("LLM_API_KEY", "generic")].into();
        let key = resolve_api_key_with(|n| env.get(n).map(|v| v.to_string()), None).unwrap();
        assert_eq!(key, "generic");
    }

    #[test]
    fn test_blank_env_key_skipped() {
        let env: HashMap<&str, &str> = [("ZONE_CONTROL_API_KEY", "  "), ("GEMINI_API_KEY", "g")].into();
        let key = resolve_api_key_with(|n| env.get(n).map(|v| v.to_string()), None).unwrap();
        assert_eq!(key, "g");
    }

    #[test]
    fn test_key_file_fallback() {
        let path = std::env::temp_dir().join(format!("zone_control_key_{}", std::process::id()));
        std::fs::write(&path, "file-key\n").unwrap();
        let key = resolve_api_key_with(|_| None, Some(&path)).unwrap();
        assert_eq!(key, "file-key");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_key_is_recoverable_error() {
        let missing = std::env::temp_dir().join("zone_control_definitely_missing_key");
        let err = resolve_api_key_with(|_| None, Some(&missing)).unwrap_err();
        assert!(matches!(err, ZoneError::Llm(_)));
    }

    #[test]
    fn test_gemini_request_shape() {
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: "sys".into() }],
            },
            contents: vec![],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: 300,
                temperature: 0.5,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 300);
        assert!(json["systemInstruction"].get("role").is_none());
    }
}
