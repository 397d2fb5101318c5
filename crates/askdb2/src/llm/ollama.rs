use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::{GenerationOptions, SqlGenerator};

pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Blocking client for Ollama's `/api/generate`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    options: GenerationOptions,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        Self::with_timeout(base_url, model, GENERATE_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            options: GenerationOptions::default(),
        })
    }

    #[must_use]
    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

impl SqlGenerator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.generate_url();
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.options,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|error| anyhow!("failed to reach {url}: {error}"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(anyhow!("http error {status} from {url}: {}", text.trim()));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|error| anyhow!("invalid JSON from {url}: {error}"))?;
        Ok(parsed.response.unwrap_or_default().trim().to_string())
    }
}
