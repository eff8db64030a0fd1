use std::sync::Arc;

use tracing::{debug, warn};

use pagelens_core::config::Config;
use pagelens_providers::{LanguageModel, LocalModel, ModelGuard};

/// Build the model guard for one command invocation. The server is
/// probed once up front; heuristics keep working when it is absent.
pub async fn build_guard(config: &Config) -> Arc<ModelGuard> {
    let model = if config.settings.ai_enabled {
        probe_model().await
    } else {
        None
    };
    Arc::new(ModelGuard::new(model, &config.tuning))
}

/// Probe the local model server. `PAGELENS_MODEL_URL` and
/// `PAGELENS_MODEL` override the built-in Ollama defaults.
pub async fn probe_model() -> Option<Arc<dyn LanguageModel>> {
    let api_base = std::env::var("PAGELENS_MODEL_URL").ok();
    let model_name = std::env::var("PAGELENS_MODEL").ok();
    let model = LocalModel::new(api_base.as_deref(), model_name.as_deref());
    if model.is_available().await {
        debug!("Local model server reachable");
        Some(Arc::new(model))
    } else {
        warn!("Local model server unreachable, continuing without AI insights");
        None
    }
}

/// The endpoint and model name the probe would use, for diagnostics.
pub fn model_endpoint() -> (String, String) {
    let api_base = std::env::var("PAGELENS_MODEL_URL")
        .unwrap_or_else(|_| "http://localhost:11434".to_string());
    let model = std::env::var("PAGELENS_MODEL").unwrap_or_else(|_| "llama3.2:3b".to_string());
    (api_base, model)
}
