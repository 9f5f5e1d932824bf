//! Venice model-catalog collaborator and the model-change broadcast.
//!
//! `venice set` never mutates terminal state: it publishes a `ModelChange`
//! on a channel the chat component subscribes to, and the terminal only
//! confirms the broadcast.

use anyhow::{anyhow, Context};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::{CommandError, CommandResult};
use crate::utils::find_char_boundary;

/// Event published when the active model changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChange {
    pub model_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VeniceModel {
    pub id: String,
    #[serde(rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub model_spec: ModelSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub traits: Vec<String>,
}

impl VeniceModel {
    /// One display line: `id (trait, trait)` or bare `id`.
    pub fn describe(&self) -> String {
        if self.model_spec.traits.is_empty() {
            self.id.clone()
        } else {
            format!("{} ({})", self.id, self.model_spec.traits.join(", "))
        }
    }
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<VeniceModel>,
}

pub struct ModelCatalog {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl ModelCatalog {
    pub fn new(base_url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    /// Bearer auth from the environment when present; the models endpoint
    /// also answers anonymously on some deployments.
    fn auth_headers() -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Ok(key) = std::env::var("VENICE_API_KEY") {
            if !key.is_empty() {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {key}"))
                        .context("Invalid VENICE_API_KEY format")?,
                );
            }
        }
        Ok(headers)
    }

    /// Fetch the catalog and keep only text models.
    pub async fn text_models(&self) -> Result<Vec<VeniceModel>, CommandError> {
        let url = format!("{}/models", self.base_url);
        let headers = Self::auth_headers()?;

        let response = self
            .http
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CommandError::Timeout {
                        what: format!("venice models ({})", url),
                        secs: self.timeout_secs,
                    }
                } else {
                    CommandError::Collaborator(anyhow!("Error fetching Venice AI models: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read Venice API response: {}", e))?;

        if !status.is_success() {
            let preview = &body[..find_char_boundary(&body, 200)];
            return Err(CommandError::Collaborator(anyhow!(
                "Venice API error {}: {}",
                status,
                preview
            )));
        }

        let parsed: ModelsResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse Venice API response: {}", e))?;

        Ok(parsed
            .data
            .into_iter()
            .filter(|m| m.model_type == "text")
            .collect())
    }
}

/// Render the catalog the way `venice models` shows it.
pub fn render_models(models: &[VeniceModel]) -> CommandResult {
    if models.is_empty() {
        return Ok("No Venice AI models found or unable to fetch models.".to_string());
    }
    let lines: Vec<String> = models.iter().map(|m| m.describe()).collect();
    Ok(format!("Available Venice AI Models:\n\n{}", lines.join("\n")))
}
