use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use pagelens_core::Tuning;

use crate::cache::TtlCache;
use crate::LanguageModel;

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Explicit result of a guarded model call. Anything but `Answered`
/// means "no AI result" and callers take their non-AI path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    Answered(String),
    Unavailable,
    Failed(String),
}

impl ModelOutcome {
    pub fn answer(&self) -> Option<&str> {
        match self {
            ModelOutcome::Answered(text) => Some(text),
            _ => None,
        }
    }
}

/// Cache key: analysis kind, element tag, and a 50-char text prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(kind: &str, tag: &str, text: &str) -> Self {
        let prefix: String = text.chars().take(50).collect();
        Self(format!("{}:{}:{}", kind, tag, prefix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModelMetrics {
    pub total_calls: u64,
    pub average_ms: f64,
    pub calls_in_window: usize,
    pub uptime: Duration,
    pub has_model: bool,
}

struct MetricState {
    total_calls: u64,
    total_elapsed: Duration,
    started_at: Instant,
}

/// Wraps every model call with the TTL cache, a sliding per-minute call
/// budget, and latency accounting. The guard is the only path to the
/// model; refusals come back as `Unavailable`, never as errors.
pub struct ModelGuard {
    model: Option<Arc<dyn LanguageModel>>,
    cache: Mutex<TtlCache>,
    window: Mutex<VecDeque<Instant>>,
    metrics: Mutex<MetricState>,
    budget_per_minute: u32,
}

impl ModelGuard {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, tuning: &Tuning) -> Self {
        Self {
            model,
            cache: Mutex::new(TtlCache::new(
                tuning.model_cache_capacity,
                Duration::from_millis(tuning.model_cache_ttl_ms),
            )),
            window: Mutex::new(VecDeque::new()),
            metrics: Mutex::new(MetricState {
                total_calls: 0,
                total_elapsed: Duration::ZERO,
                started_at: Instant::now(),
            }),
            budget_per_minute: tuning.model_calls_per_minute,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Cache, then budget, then the model. A throttled or modelless call
    /// returns `Unavailable` without touching the collaborator.
    pub async fn analyze(&self, key: &CacheKey, prompt: &str) -> ModelOutcome {
        let Some(model) = self.model.as_ref() else {
            return ModelOutcome::Unavailable;
        };

        if let Some(hit) = self.cache.lock().await.get(key.as_str()) {
            debug!(key = %key, "Model cache hit");
            return ModelOutcome::Answered(hit);
        }

        if !self.try_admit(Instant::now()).await {
            debug!(budget = self.budget_per_minute, "Model call budget exhausted, refusing");
            return ModelOutcome::Unavailable;
        }

        let started = Instant::now();
        let result = model.prompt(prompt).await;
        self.record(started.elapsed()).await;

        match result {
            Ok(reply) => {
                self.cache
                    .lock()
                    .await
                    .insert(key.as_str().to_string(), reply.clone());
                ModelOutcome::Answered(reply)
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Model call failed");
                ModelOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn metrics(&self) -> ModelMetrics {
        let m = self.metrics.lock().await;
        let window = self.window.lock().await;
        let average_ms = if m.total_calls > 0 {
            m.total_elapsed.as_secs_f64() * 1000.0 / m.total_calls as f64
        } else {
            0.0
        };
        ModelMetrics {
            total_calls: m.total_calls,
            average_ms,
            calls_in_window: window.len(),
            uptime: m.started_at.elapsed(),
            has_model: self.model.is_some(),
        }
    }

    async fn try_admit(&self, now: Instant) -> bool {
        let mut window = self.window.lock().await;
        while window
            .front()
            .is_some_and(|&t| now.duration_since(t) >= RATE_WINDOW)
        {
            window.pop_front();
        }
        if window.len() >= self.budget_per_minute as usize {
            return false;
        }
        window.push_back(now);
        true
    }

    async fn record(&self, elapsed: Duration) {
        let mut m = self.metrics.lock().await;
        m.total_calls += 1;
        m.total_elapsed += elapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagelens_core::{Error, Result};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingModel {
        calls: AtomicU32,
        reply: String,
    }

    impl CountingModel {
        fn new(reply: &str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                reply: reply.to_string(),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for CountingModel {
        async fn is_available(&self) -> bool {
            true
        }

        async fn prompt(&self, _text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn is_available(&self) -> bool {
            true
        }

        async fn prompt(&self, _text: &str) -> Result<String> {
            Err(Error::Model("boom".into()))
        }
    }

    fn tuning_with_budget(budget: u32) -> Tuning {
        Tuning {
            model_calls_per_minute: budget,
            ..Tuning::default()
        }
    }

    #[tokio::test]
    async fn test_no_model_is_unavailable() {
        let guard = ModelGuard::new(None, &Tuning::default());
        let key = CacheKey::new("formSecurity", "form", "text");
        assert_eq!(guard.analyze(&key, "p").await, ModelOutcome::Unavailable);
        assert!(!guard.has_model());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_model() {
        let model = Arc::new(CountingModel::new("safe"));
        let guard = ModelGuard::new(Some(model.clone()), &Tuning::default());
        let key = CacheKey::new("formSecurity", "form", "login form");

        assert_eq!(
            guard.analyze(&key, "p").await,
            ModelOutcome::Answered("safe".into())
        );
        assert_eq!(
            guard.analyze(&key, "p").await,
            ModelOutcome::Answered("safe".into())
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_refuses_without_invoking() {
        let model = Arc::new(CountingModel::new("r"));
        let guard = ModelGuard::new(Some(model.clone()), &tuning_with_budget(2));

        for i in 0..2 {
            let key = CacheKey::new("adClassification", "div", &format!("ad {i}"));
            assert!(matches!(
                guard.analyze(&key, "p").await,
                ModelOutcome::Answered(_)
            ));
        }
        let key = CacheKey::new("adClassification", "div", "ad 2");
        assert_eq!(guard.analyze(&key, "p").await, ModelOutcome::Unavailable);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);

        let metrics = guard.metrics().await;
        assert_eq!(metrics.total_calls, 2);
        assert_eq!(metrics.calls_in_window, 2);
    }

    #[tokio::test]
    async fn test_failure_degrades_and_is_not_cached() {
        let guard = ModelGuard::new(Some(Arc::new(FailingModel)), &Tuning::default());
        let key = CacheKey::new("linkContext", "a", "text");
        match guard.analyze(&key, "p").await {
            ModelOutcome::Failed(reason) => assert!(reason.contains("boom")),
            other => panic!("expected failure, got {other:?}"),
        }
        // A later success for the same key would still have to call the
        // model; nothing was cached on the failure path.
        let metrics = guard.metrics().await;
        assert_eq!(metrics.total_calls, 1);
    }

    #[test]
    fn test_cache_key_truncates_text() {
        let long = "y".repeat(80);
        let key = CacheKey::new("k", "div", &long);
        assert_eq!(key.as_str().len(), "k:div:".len() + 50);
    }
}
