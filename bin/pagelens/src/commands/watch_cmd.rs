use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use pagelens_core::{ContextMessage, EngineNotice, Paths};
use pagelens_dom::{BoundingBox, ComputedStyle, DomHost, NodeId, Rgba, StaticDom, ViewportInfo};
use pagelens_lookout::{LookOutScanner, ScanSignal};
use pagelens_overlay::{EngineEvent, OverlayEngine, OverlayUpdate};
use pagelens_providers::ModelGuard;
use pagelens_storage::{ConfigEvent, ConfigStore};

use super::provider;

/// Live document for watch mode. A re-parse swaps in a new document
/// generation, so handles into the old parse go stale and read as
/// absent; the base URL is pinned to the watched file and survives
/// swaps.
struct WatchedDom {
    base: Url,
    inner: RwLock<StaticDom>,
}

impl WatchedDom {
    fn new(dom: StaticDom) -> Self {
        Self {
            base: dom.base_url().clone(),
            inner: RwLock::new(dom),
        }
    }

    fn replace(&self, dom: StaticDom) {
        *self.inner.write().unwrap() = dom;
    }
}

impl DomHost for WatchedDom {
    fn base_url(&self) -> &Url {
        &self.base
    }

    fn viewport(&self) -> ViewportInfo {
        self.inner.read().unwrap().viewport()
    }

    fn contains(&self, id: NodeId) -> bool {
        self.inner.read().unwrap().contains(id)
    }

    fn tag(&self, id: NodeId) -> Option<String> {
        self.inner.read().unwrap().tag(id)
    }

    fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.inner.read().unwrap().attr(id, name)
    }

    fn attrs(&self, id: NodeId) -> Vec<(String, String)> {
        self.inner.read().unwrap().attrs(id)
    }

    fn text(&self, id: NodeId) -> String {
        self.inner.read().unwrap().text(id)
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.read().unwrap().children(id)
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.read().unwrap().parent(id)
    }

    fn style(&self, id: NodeId) -> Option<ComputedStyle> {
        self.inner.read().unwrap().style(id)
    }

    fn bounding_box(&self, id: NodeId) -> Option<BoundingBox> {
        self.inner.read().unwrap().bounding_box(id)
    }

    fn layout_parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.read().unwrap().layout_parent(id)
    }

    fn query(&self, selector: &str) -> Vec<NodeId> {
        self.inner.read().unwrap().query(selector)
    }

    fn query_within(&self, id: NodeId, selector: &str) -> Vec<NodeId> {
        self.inner.read().unwrap().query_within(id, selector)
    }

    fn background_at(&self, x: f64, y: f64) -> Option<Rgba> {
        self.inner.read().unwrap().background_at(x, y)
    }
}

pub async fn run(file: &str) -> anyhow::Result<()> {
    let path = Path::new(file)
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("Cannot watch {}: {}", file, e))?;
    let base = Url::from_file_path(&path)
        .map_err(|_| anyhow::anyhow!("Cannot express {} as a file URL", path.display()))?;

    let dom = Arc::new(WatchedDom::new(load(&path, &base)?));

    let store = Arc::new(ConfigStore::open(Paths::new())?);
    let mut config_events = store.subscribe();
    let _config_watcher = pagelens_storage::watch(store.clone())?;
    let config = store.config();

    // The model is probed once at startup; the aiEnabled toggle gates
    // its use per call, so flipping it mid-session takes effect.
    let guard = Arc::new(ModelGuard::new(provider::probe_model().await, &config.tuning));

    let engine = OverlayEngine::new(dom.clone(), &config, guard.clone());
    let engine_events = engine.sender();
    let mut engine_updates = engine.subscribe();

    let scanner = LookOutScanner::new(dom.clone(), &config, guard);
    let scan_signals = scanner.sender();
    let mut scan_notices = scanner.subscribe();

    let shutdown = CancellationToken::new();
    let engine_task = tokio::spawn(engine.run(shutdown.clone()));
    let scanner_task = tokio::spawn(scanner.run(shutdown.clone()));

    let (file_tx, mut file_rx) = mpsc::unbounded_channel();
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| anyhow::anyhow!("Cannot watch {}: no file name", path.display()))?;
    let mut file_watcher =
        notify::recommended_watcher(move |outcome: notify::Result<notify::Event>| {
            let event = match outcome {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "File watch error");
                    return;
                }
            };
            if !event.kind.is_modify() && !event.kind.is_create() {
                return;
            }
            if event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()))
            {
                let _ = file_tx.send(());
            }
        })
        .map_err(|e| anyhow::anyhow!("File watcher: {}", e))?;
    let watch_dir = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    file_watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .map_err(|e| anyhow::anyhow!("File watcher: {}", e))?;

    println!();
    println!("👁  Watching {}", path.display());
    println!("    Edits rescan the page; config changes apply live. Ctrl-C to stop.");
    println!();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("Shutdown signal received");
                break;
            }
            Some(()) = file_rx.recv() => {
                match load(&path, &base) {
                    Ok(fresh) => {
                        dom.replace(fresh);
                        debug!("Document reloaded");
                        let _ = engine_events.send(EngineEvent::DomChanged);
                        let _ = scan_signals.send(ScanSignal::Changed);
                    }
                    Err(e) => warn!(error = %e, "Keeping previous document"),
                }
            }
            update = engine_updates.recv() => {
                match update {
                    Ok(update) => print_update(&update),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(missed = n, "Update stream lagged");
                    }
                    Err(_) => break,
                }
            }
            notice = scan_notices.recv() => {
                match notice {
                    Ok(notice) => print_notice(&notice),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(missed = n, "Notice stream lagged");
                    }
                    Err(_) => break,
                }
            }
            event = config_events.recv() => {
                match event {
                    Ok(event) => forward_config_event(event, &engine_events, &scan_signals),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(missed = n, "Config stream lagged");
                    }
                    Err(_) => break,
                }
            }
        }
    }

    shutdown.cancel();
    let _ = tokio::join!(engine_task, scanner_task);
    println!("Stopped.");
    Ok(())
}

fn load(path: &Path, base: &Url) -> anyhow::Result<StaticDom> {
    let html = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    Ok(StaticDom::parse(&html, base.as_str())?)
}

fn forward_config_event(
    event: ConfigEvent,
    engine: &mpsc::UnboundedSender<EngineEvent>,
    scanner: &mpsc::UnboundedSender<ScanSignal>,
) {
    match event {
        ConfigEvent::Settings(settings) => {
            println!("  config: settings changed");
            let _ = engine.send(EngineEvent::Control(ContextMessage::UpdateSettings {
                settings,
            }));
        }
        ConfigEvent::LookOut(lookout) => {
            println!("  config: look out criteria changed");
            let _ = scanner.send(ScanSignal::Update(lookout));
        }
        ConfigEvent::Reloaded(config) => {
            println!("  config: reloaded from disk");
            let _ = engine.send(EngineEvent::Control(ContextMessage::UpdateSettings {
                settings: config.settings,
            }));
            let _ = scanner.send(ScanSignal::Update(config.look_out_config));
        }
    }
}

fn print_update(update: &OverlayUpdate) {
    match update {
        OverlayUpdate::Notice { notice } => print_notice(notice),
        OverlayUpdate::TooltipShown {
            target,
            content,
            placement,
        } => {
            println!(
                "  tooltip {} at ({:.0}, {:.0}): {}",
                target, placement.x, placement.y, content.title
            );
        }
        OverlayUpdate::TooltipEnriched { target, .. } => {
            println!("  tooltip {} enriched", target);
        }
        OverlayUpdate::TooltipHidden => println!("  tooltip hidden"),
    }
}

fn print_notice(notice: &EngineNotice) {
    match notice {
        EngineNotice::OverlaySummary {
            ads,
            links,
            forms,
            hidden,
        } => {
            println!(
                "  scan: {} ads, {} links, {} forms, {} hidden",
                ads, links, forms, hidden
            );
        }
        EngineNotice::PageVariant { variant } => println!("  variant: {}", variant),
        EngineNotice::LookOutMatches { count } => {
            println!(
                "  look out: {} match{}",
                count,
                if *count == 1 { "" } else { "es" }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelens_core::Settings;
    use pagelens_overlay::classify_page;

    fn parsed(html: &str) -> StaticDom {
        StaticDom::parse(html, "file:///tmp/watched.html").unwrap()
    }

    #[test]
    fn test_replace_invalidates_old_handles() {
        let dom = WatchedDom::new(parsed(
            r#"<html><body><a class="sponsored" href="/x">promo</a></body></html>"#,
        ));
        let old = dom.query("a")[0];
        assert!(dom.contains(old));

        dom.replace(parsed("<html><body><p>rewritten</p></body></html>"));

        assert!(!dom.contains(old));
        assert_eq!(dom.tag(old), None);
        assert!(dom.query("a").is_empty());
        assert_eq!(dom.query("p").len(), 1);
    }

    #[test]
    fn test_base_url_survives_replace() {
        let dom = WatchedDom::new(parsed("<html><body></body></html>"));
        let before = dom.base_url().clone();
        dom.replace(parsed("<html><body><p>x</p></body></html>"));
        assert_eq!(dom.base_url(), &before);
    }

    #[test]
    fn test_classification_follows_the_live_document() {
        let dom = WatchedDom::new(parsed("<html><body><p>nothing here</p></body></html>"));
        assert!(classify_page(&dom, &Settings::default()).is_empty());

        dom.replace(parsed(
            r#"<html><body><iframe src="https://ads.doubleclick.net/slot"></iframe></body></html>"#,
        ));
        let entries = classify_page(&dom, &Settings::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].classification.category(),
            pagelens_core::Category::Ad
        );
    }
}
