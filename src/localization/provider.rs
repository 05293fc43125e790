//! Machine-translation backends.

use crate::config::Config;
use crate::error::ProviderError;
use crate::i18n::Language;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Translates an ordered batch of strings in one call.
///
/// Implementations return exactly one output per input, in input order.
/// Failures are returned, not papered over: `Localizer` owns the fallback and
/// serves the whole document untranslated, so a failed batch never reaches
/// the cache.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate(
        &self,
        strings: &[String],
        target_language: Language,
    ) -> Result<Vec<String>, ProviderError>;
}

/// Stand-in used when no provider is configured. Every call fails, so guides
/// render in the base language.
pub struct DisabledProvider;

#[async_trait]
impl TranslationProvider for DisabledProvider {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn translate(
        &self,
        _strings: &[String],
        _target_language: Language,
    ) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Disabled)
    }
}

// ==================== OpenAI-compatible provider ====================

#[derive(Debug, Serialize)]
struct TranslationRequest {
    model: String,
    messages: Vec<Message>,
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Shape the model is asked to answer with.
#[derive(Debug, Deserialize)]
struct TranslationBatch {
    translations: Vec<String>,
}

/// Reasoning models reject `temperature`
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

fn build_system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You translate visa and immigration guidance from {source} to {target}.

You receive a JSON object {{"strings": [...]}}. Reply with a JSON object
{{"translations": [...]}} containing exactly one translation per input string,
in the same order.

### DO NOT translate:
- Names of government agencies, forms and programmes (e.g., "DS-160", "SEVIS", "I-20")
- Currency amounts, dates and codes
- URLs and email addresses

### Formatting:
- Preserve markdown, punctuation and line breaks
- Keep each translation as a single string; never merge or split entries

### Tone:
- Clear, formal and accurate; applicants rely on this text for legal requirements"#,
        source = source_language,
        target = target_language
    )
}

fn build_user_prompt(strings: &[String]) -> Result<String, ProviderError> {
    serde_json::to_string(&serde_json::json!({ "strings": strings }))
        .map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Chat-completions provider (OpenAI or any API-compatible endpoint).
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
    source_language: Language,
    timeout: Duration,
    retry: RetryConfig,
}

impl OpenAiProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_url: impl Into<String>,
        source_language: Language,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            api_url: api_url.into(),
            source_language,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::provider_call(),
        }
    }

    /// Provider from configuration, or `None` when no API key is set.
    pub fn from_config(client: reqwest::Client, config: &Config) -> Option<Self> {
        let api_key = config.openai_api_key.clone()?;
        Some(
            Self::new(
                client,
                api_key,
                config.openai_model.clone(),
                config.openai_api_url.clone(),
                config.base_language,
            )
            .with_timeout(config.provider_timeout),
        )
    }

    /// Upper bound for one `translate` call, retries included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(
        &self,
        strings: &[String],
        target_language: Language,
    ) -> Result<TranslationRequest, ProviderError> {
        let is_reasoning = is_reasoning_model(&self.model);

        Ok(TranslationRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(
                        self.source_language.name(),
                        target_language.name(),
                    ),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(strings)?,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: if is_reasoning { None } else { Some(0.2) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        })
    }

    async fn send(&self, request: &TranslationRequest) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(ProviderError::Api { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("chat response: {}", e)))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Decode("response contained no choices".to_string()))?;

        let batch: TranslationBatch = serde_json::from_str(&content)
            .map_err(|e| ProviderError::Decode(format!("translation payload: {}", e)))?;

        Ok(batch.translations)
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn translate(
        &self,
        strings: &[String],
        target_language: Language,
    ) -> Result<Vec<String>, ProviderError> {
        if strings.is_empty() || target_language == self.source_language {
            return Ok(strings.to_vec());
        }

        let request = self.build_request(strings, target_language)?;
        debug!(
            "Translating {} strings to {} with {}",
            strings.len(),
            target_language,
            self.model
        );

        let operation_name = format!("Translation to {}", target_language.name());
        let attempts = with_retry_if(
            &self.retry,
            &operation_name,
            || self.send(&request),
            ProviderError::is_retryable,
        );
        let translated = tokio::time::timeout(self.timeout, attempts)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))??;

        if translated.len() != strings.len() {
            return Err(ProviderError::LengthMismatch {
                expected: strings.len(),
                actual: translated.len(),
            });
        }
        Ok(translated)
    }
}
