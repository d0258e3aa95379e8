//! LLM completion API client

use serde::{Deserialize, Serialize};

use crate::config::CompletionConfig;
use crate::{Error, Result};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    n: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Fetches text completions from the OpenAI completions endpoint
pub struct CompletionClient {
    client: reqwest::Client,
    api_key: String,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Create a new completion client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, config: CompletionConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for completions".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            config,
        })
    }

    /// Request a single completion for `prompt`, trimmed of surrounding
    /// whitespace
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response carries no choice
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        tracing::debug!(prompt_len = prompt.len(), "requesting completion");

        let request = CompletionRequest {
            model: &self.config.model,
            prompt,
            max_tokens: self.config.max_tokens,
            n: 1,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "completion request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "completion API error");
            return Err(Error::Completion(format!(
                "completion API error {status}: {body}"
            )));
        }

        let result: CompletionResponse = response.json().await?;
        let text = result
            .choices
            .first()
            .map(|c| c.text.trim().to_string())
            .ok_or_else(|| Error::Completion("response carried no choices".to_string()))?;

        tracing::info!(reply_len = text.len(), "completion received");
        Ok(text)
    }
}
