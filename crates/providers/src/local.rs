use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use pagelens_core::{Error, Result};

use crate::LanguageModel;

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2:3b";

/// Client for an Ollama-compatible local model server. Low temperature
/// and a small top-k keep classification output terse and stable.
pub struct LocalModel {
    client: Client,
    api_base: String,
    model: String,
    temperature: f32,
    top_k: u32,
}

impl LocalModel {
    pub fn new(api_base: Option<&str>, model: Option<&str>) -> Self {
        let resolved_base = api_base
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using default");
                Client::new()
            });
        Self {
            client,
            api_base: resolved_base,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            temperature: 0.3,
            top_k: 3,
        }
    }
}

#[async_trait]
impl LanguageModel for LocalModel {
    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.api_base);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, url = %url, "Local model server not reachable");
                false
            }
        }
    }

    async fn prompt(&self, text: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.api_base);
        let request = serde_json::json!({
            "model": self.model,
            "prompt": text,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "top_k": self.top_k,
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Model(format!("model request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Model(format!(
                "model server error {}: {}",
                status, raw_body
            )));
        }

        let resp: GenerateResponse = serde_json::from_str(&raw_body)
            .map_err(|e| Error::Model(format!("failed to parse model response: {}", e)))?;
        debug!(response_len = resp.response.len(), "Model reply received");
        Ok(resp.response)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_normalization() {
        let m = LocalModel::new(Some("http://127.0.0.1:11434/"), None);
        assert_eq!(m.api_base, "http://127.0.0.1:11434");
        assert_eq!(m.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_parse_generate_response() {
        let json = r#"{"model":"llama3.2:3b","response":"Score: 82/100","done":true}"#;
        let resp: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.response, "Score: 82/100");
    }
}
