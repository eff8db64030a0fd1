pub mod cache;
pub mod guard;
pub mod local;

use async_trait::async_trait;
use pagelens_core::Result;

/// The on-device language model this tool can consult. May be absent
/// entirely, and any call may fail; callers degrade instead of erroring.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Cheap liveness probe, used once at startup for feature detection.
    async fn is_available(&self) -> bool;

    async fn prompt(&self, text: &str) -> Result<String>;
}

pub use cache::TtlCache;
pub use guard::{CacheKey, ModelGuard, ModelMetrics, ModelOutcome};
pub use local::LocalModel;
