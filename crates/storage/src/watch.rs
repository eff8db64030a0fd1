use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use pagelens_core::{Error, Result};

use crate::store::ConfigStore;

/// Keeps the config file under observation; dropping it stops the
/// watching thread.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

/// Watches the config directory and reloads the store on external edits
/// to the config file. The parent directory is watched rather than the
/// file itself, because editors typically replace the file wholesale.
pub fn watch(store: Arc<ConfigStore>) -> Result<ConfigWatcher> {
    let config_file = store.paths().config_file();
    let dir = config_file
        .parent()
        .ok_or_else(|| Error::Storage(format!("config path {} has no parent", config_file.display())))?
        .to_path_buf();
    std::fs::create_dir_all(&dir)?;

    let target = config_file.clone();
    let mut watcher = notify::recommended_watcher(move |outcome: notify::Result<notify::Event>| {
        let event = match outcome {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Config watch error");
                return;
            }
        };
        if !(event.kind.is_modify() || event.kind.is_create()) {
            return;
        }
        if !event.paths.iter().any(|p| p.ends_with("config.json")) {
            return;
        }
        debug!(path = %target.display(), "Config file changed on disk");
        if let Err(e) = store.reload() {
            warn!(error = %e, "Failed to reload edited config");
        }
    })
    .map_err(|e| Error::Storage(format!("config watcher: {e}")))?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| Error::Storage(format!("watch {}: {e}", dir.display())))?;

    Ok(ConfigWatcher { _watcher: watcher })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelens_core::Paths;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_external_edit_reaches_subscribers() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_base(dir.path().to_path_buf());
        let store = Arc::new(ConfigStore::open(paths).unwrap());
        let _watcher = watch(Arc::clone(&store)).unwrap();
        let mut events = store.subscribe();

        // Simulate another process editing the file.
        let mut config = store.config();
        config.settings.ai_enabled = true;
        config.save(&dir.path().join("config.json")).unwrap();

        let adopted = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("watcher should deliver within the timeout")
            .unwrap();
        match adopted {
            crate::store::ConfigEvent::Reloaded(config) => assert!(config.settings.ai_enabled),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(store.settings().ai_enabled);
    }
}
