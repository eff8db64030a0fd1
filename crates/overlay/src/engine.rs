use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use pagelens_classify::{classify, insight, tooltip_content, Insight};
use pagelens_core::sanitize::generate_id;
use pagelens_core::{
    Category, Classification, Config, ContextMessage, Debouncer, EngineNotice, Settings,
    TooltipContent, Variant,
};
use pagelens_dom::{DomHost, NodeId};
use pagelens_providers::ModelGuard;
use pagelens_theme::{effective_variant, BackgroundSampler};

use crate::indicator::{IndicatorRecord, IndicatorSet};
use crate::scan::classify_page;
use crate::tooltip::{estimate_size, place, Placement, TooltipController, TooltipFire};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Input to a running engine. Pointer and document events come from the
/// host; control messages come from whoever owns the config.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The document mutated; coalesced into a rescan.
    DomChanged,
    PointerOver(NodeId),
    PointerOut,
    /// Keyboard or click activation, treated like a deliberate hover.
    Activate(NodeId),
    Control(ContextMessage),
    /// Completion of a spawned insight task.
    InsightReady {
        seq: u64,
        target: NodeId,
        insight: Option<Insight>,
    },
}

/// Output stream of a running engine. Notices mirror what a status
/// surface shows; tooltip updates carry everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OverlayUpdate {
    #[serde(rename_all = "camelCase")]
    Notice { notice: EngineNotice },
    #[serde(rename_all = "camelCase")]
    TooltipShown {
        target: NodeId,
        content: TooltipContent,
        placement: Placement,
    },
    #[serde(rename_all = "camelCase")]
    TooltipEnriched { target: NodeId, insight: Insight },
    TooltipHidden,
}

struct PendingView {
    target: NodeId,
    content: TooltipContent,
    placement: Placement,
}

enum InsightTask {
    Form,
    Link,
    Ad,
}

/// Drives one document's annotation lifecycle: debounced rescans that
/// maintain the indicator set, the tooltip state machine, background
/// sampling for the theme variant, and model insight tasks. Single
/// owner, no shared mutability; everything flows through the event
/// channel.
pub struct OverlayEngine {
    host: Arc<dyn DomHost>,
    settings: Settings,
    guard: Arc<ModelGuard>,
    indicators: IndicatorSet,
    tooltip: TooltipController,
    sampler: BackgroundSampler,
    variant: Option<Variant>,
    rescan_debounce: Debouncer,
    events: mpsc::UnboundedSender<EngineEvent>,
    inbox: mpsc::UnboundedReceiver<EngineEvent>,
    updates: broadcast::Sender<OverlayUpdate>,
    /// Monotonic insight generation; replies from older generations are
    /// dropped instead of enriching a tooltip they no longer describe.
    insight_seq: u64,
    pending_view: Option<PendingView>,
}

impl OverlayEngine {
    pub fn new(host: Arc<dyn DomHost>, config: &Config, guard: Arc<ModelGuard>) -> Self {
        let (events, inbox) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            host,
            settings: config.settings.clone(),
            guard,
            indicators: IndicatorSet::new(),
            tooltip: TooltipController::new(&config.tuning),
            sampler: BackgroundSampler::new(),
            variant: None,
            rescan_debounce: Debouncer::new(Duration::from_millis(config.tuning.scan_debounce_ms)),
            events,
            inbox,
            updates,
            insight_seq: 0,
            pending_view: None,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<EngineEvent> {
        self.events.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OverlayUpdate> {
        self.updates.subscribe()
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }

    pub fn variant(&self) -> Option<Variant> {
        self.variant
    }

    /// Runs until the token cancels or every event sender is gone.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(url = %self.host.base_url(), "Overlay engine started");
        self.rescan();

        loop {
            // Deadlines are re-read every iteration, so a replaced timer
            // needs no cancellation plumbing.
            let scan_timer = sleep_far(self.rescan_debounce.deadline());
            let tooltip_timer = sleep_far(self.tooltip.deadline());

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Overlay engine stopping");
                    break;
                }
                event = self.inbox.recv() => {
                    match event {
                        Some(event) => self.handle(event, Instant::now()),
                        None => break,
                    }
                }
                _ = scan_timer, if self.rescan_debounce.is_armed() => {
                    let now = Instant::now();
                    if self.rescan_debounce.fire(now) {
                        self.rescan();
                    }
                }
                _ = tooltip_timer, if self.tooltip.deadline().is_some() => {
                    self.fire_tooltip(Instant::now());
                }
            }
        }
    }

    fn handle(&mut self, event: EngineEvent, now: Instant) {
        match event {
            EngineEvent::DomChanged => self.rescan_debounce.poke(now),
            EngineEvent::PointerOver(target) | EngineEvent::Activate(target) => {
                if self.settings.enabled {
                    self.tooltip.request_show(target, now);
                }
            }
            EngineEvent::PointerOut => self.tooltip.request_hide(now),
            EngineEvent::Control(ContextMessage::UpdateSettings { settings }) => {
                debug!(enabled = settings.enabled, "Adopting new settings");
                self.settings = settings;
                if !self.settings.enabled {
                    self.tooltip.request_hide(now);
                }
                self.rescan_debounce.force(now);
            }
            EngineEvent::Control(ContextMessage::ThemeChanged { variant }) => {
                self.adopt_variant(variant);
            }
            EngineEvent::Control(ContextMessage::RescanLookOut) => {
                // Look Out traffic; its own scanner consumes this.
            }
            EngineEvent::InsightReady {
                seq,
                target,
                insight,
            } => {
                if seq != self.insight_seq || self.tooltip.target() != Some(target) {
                    return;
                }
                if let Some(insight) = insight {
                    self.publish(OverlayUpdate::TooltipEnriched { target, insight });
                }
            }
        }
    }

    /// Full-document pass: re-samples the page variant, rebuilds the
    /// indicator set and publishes the detection summary.
    fn rescan(&mut self) {
        let sampled = self.sampler.variant(&*self.host);
        self.adopt_variant(effective_variant(self.settings.theme.mode, sampled));

        self.indicators.clear();
        let entries = if self.settings.enabled {
            classify_page(&*self.host, &self.settings)
        } else {
            Vec::new()
        };

        let (mut ads, mut links, mut forms, mut hidden) = (0usize, 0usize, 0usize, 0usize);
        for entry in &entries {
            match entry.classification.category() {
                Category::Ad => ads += 1,
                Category::LinkInternal | Category::LinkExternal => links += 1,
                Category::Form => forms += 1,
                Category::Hidden => hidden += 1,
                Category::LookOut => {}
            }
            if self.settings.show_indicators && entry.indicator {
                let anchor = self.host.bounding_box(entry.node).unwrap_or_default();
                self.indicators.insert(IndicatorRecord {
                    node: entry.node,
                    category: entry.classification.category(),
                    badge_id: generate_id("badge"),
                    anchor,
                });
            }
        }

        debug!(
            ads,
            links,
            forms,
            hidden,
            indicators = self.indicators.len(),
            "Page scan complete"
        );
        self.publish(OverlayUpdate::Notice {
            notice: EngineNotice::OverlaySummary {
                ads,
                links,
                forms,
                hidden,
            },
        });
    }

    fn adopt_variant(&mut self, variant: Variant) {
        if self.variant != Some(variant) {
            self.variant = Some(variant);
            self.publish(OverlayUpdate::Notice {
                notice: EngineNotice::PageVariant { variant },
            });
        }
    }

    fn fire_tooltip(&mut self, now: Instant) {
        match self.tooltip.fire(now) {
            Some(TooltipFire::Reveal { target }) => self.reveal(target, now),
            Some(TooltipFire::Shown { target }) => {
                let Some(view) = self.pending_view.take() else {
                    return;
                };
                if view.target == target {
                    self.publish(OverlayUpdate::TooltipShown {
                        target,
                        content: view.content,
                        placement: view.placement,
                    });
                }
            }
            Some(TooltipFire::Hidden) => self.publish(OverlayUpdate::TooltipHidden),
            None => {}
        }
    }

    /// The reveal timer fired: measure and classify the target now, not
    /// at request time, so a mutated document drops the show instead of
    /// annotating a ghost.
    fn reveal(&mut self, target: NodeId, now: Instant) {
        if !self.host.contains(target) {
            self.tooltip.abort_show();
            return;
        }
        let rect = match self.host.bounding_box(target) {
            Some(rect) if !rect.is_empty() => rect,
            _ => {
                debug!(node = %target, "Tooltip target unmeasurable, dropping show");
                self.tooltip.abort_show();
                return;
            }
        };
        let Some(classification) = classify(&*self.host, target, &self.settings) else {
            self.tooltip.abort_show();
            return;
        };

        let content = tooltip_content(&classification);
        let placement = place(&rect, estimate_size(&content), &self.host.viewport());
        if !self.tooltip.present(target, now) {
            return;
        }
        self.pending_view = Some(PendingView {
            target,
            content,
            placement,
        });

        if self.settings.ai_enabled && self.guard.has_model() {
            self.spawn_insight(target, &classification);
        }
    }

    fn spawn_insight(&mut self, target: NodeId, classification: &Classification) {
        let task = match classification {
            Classification::Form { .. } => InsightTask::Form,
            Classification::Link { .. } => InsightTask::Link,
            Classification::Ad { .. } => InsightTask::Ad,
            _ => return,
        };
        self.insight_seq += 1;
        let seq = self.insight_seq;
        let host = Arc::clone(&self.host);
        let guard = Arc::clone(&self.guard);
        let events = self.events.clone();

        tokio::spawn(async move {
            let insight = match task {
                InsightTask::Form => insight::form_security(&*host, target, &guard).await,
                InsightTask::Link => insight::link_context(&*host, target, &guard).await,
                InsightTask::Ad => insight::ad_classification(&*host, target, &guard).await,
            };
            let _ = events.send(EngineEvent::InsightReady {
                seq,
                target,
                insight,
            });
        });
    }

    fn publish(&self, update: OverlayUpdate) {
        // Nobody listening is not an error.
        let _ = self.updates.send(update);
    }
}

/// Branches disabled by their select guard still construct a future;
/// park the unarmed ones far out instead of polling hot.
fn sleep_far(deadline: Option<Instant>) -> tokio::time::Sleep {
    let at = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
    tokio::time::sleep_until(tokio::time::Instant::from_std(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagelens_classify::Severity;
    use pagelens_core::{Result, Tuning};
    use pagelens_dom::StaticDom;
    use pagelens_providers::LanguageModel;

    fn engine_for(html: &str) -> OverlayEngine {
        let dom = StaticDom::parse(html, "https://mysite.com/page").unwrap();
        OverlayEngine::new(
            Arc::new(dom),
            &Config::default(),
            Arc::new(ModelGuard::new(None, &Tuning::default())),
        )
    }

    fn drain(rx: &mut broadcast::Receiver<OverlayUpdate>) -> Vec<OverlayUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update);
        }
        out
    }

    const BUSY_PAGE: &str = r#"<html><body>
        <div class="ad-banner">promo</div>
        <a href="https://other.org/x">out</a>
        <iframe src="/f" style="display: none"></iframe>
    </body></html>"#;

    #[test]
    fn test_rescan_publishes_variant_then_summary() {
        let mut engine = engine_for(BUSY_PAGE);
        let mut updates = engine.subscribe();
        engine.rescan();

        assert_eq!(
            updates.try_recv().unwrap(),
            OverlayUpdate::Notice {
                notice: EngineNotice::PageVariant {
                    variant: Variant::Light
                }
            }
        );
        assert_eq!(
            updates.try_recv().unwrap(),
            OverlayUpdate::Notice {
                notice: EngineNotice::OverlaySummary {
                    ads: 1,
                    links: 1,
                    forms: 0,
                    hidden: 1,
                }
            }
        );

        // The collapsed iframe is counted but gets no badge.
        assert_eq!(engine.indicators.len(), 2);
        let iframe = engine.host.query("iframe")[0];
        assert!(!engine.indicators.contains(iframe));
    }

    #[test]
    fn test_unchanged_variant_not_republished() {
        let mut engine = engine_for(BUSY_PAGE);
        let mut updates = engine.subscribe();
        engine.rescan();
        drain(&mut updates);

        engine.rescan();
        let second = drain(&mut updates);
        assert_eq!(second.len(), 1);
        assert!(matches!(
            second[0],
            OverlayUpdate::Notice {
                notice: EngineNotice::OverlaySummary { .. }
            }
        ));
    }

    #[test]
    fn test_disable_clears_indicators_and_zeroes_summary() {
        let mut engine = engine_for(BUSY_PAGE);
        let mut updates = engine.subscribe();
        engine.rescan();
        assert!(!engine.indicators.is_empty());
        drain(&mut updates);

        let t0 = Instant::now();
        let settings = Settings {
            enabled: false,
            ..Settings::default()
        };
        engine.handle(
            EngineEvent::Control(ContextMessage::UpdateSettings { settings }),
            t0,
        );
        assert!(engine.rescan_debounce.fire(t0));
        engine.rescan();

        assert!(engine.indicators.is_empty());
        let last = drain(&mut updates).pop().unwrap();
        assert_eq!(
            last,
            OverlayUpdate::Notice {
                notice: EngineNotice::OverlaySummary {
                    ads: 0,
                    links: 0,
                    forms: 0,
                    hidden: 0,
                }
            }
        );
    }

    #[test]
    fn test_pointer_flow_shows_then_hides_tooltip() {
        let mut engine = engine_for(BUSY_PAGE);
        let mut updates = engine.subscribe();
        let ad = engine.host.query(".ad-banner")[0];
        let t0 = Instant::now();

        engine.handle(EngineEvent::PointerOver(ad), t0);
        engine.fire_tooltip(t0 + Duration::from_millis(150));
        engine.fire_tooltip(t0 + Duration::from_millis(160));

        match updates.try_recv().unwrap() {
            OverlayUpdate::TooltipShown {
                target,
                content,
                placement,
            } => {
                assert_eq!(target, ad);
                assert_eq!(content.title, "Advertisement");
                assert!(placement.y >= 10.0);
            }
            other => panic!("expected shown, got {other:?}"),
        }

        engine.handle(EngineEvent::PointerOut, t0 + Duration::from_millis(200));
        engine.fire_tooltip(t0 + Duration::from_millis(300));
        assert_eq!(updates.try_recv().unwrap(), OverlayUpdate::TooltipHidden);
    }

    #[test]
    fn test_reveal_of_stale_target_aborts_silently() {
        let mut engine = engine_for(BUSY_PAGE);
        let mut updates = engine.subscribe();
        let ghost = NodeId { doc: 0, index: 999 };
        let t0 = Instant::now();

        engine.handle(EngineEvent::PointerOver(ghost), t0);
        engine.fire_tooltip(t0 + Duration::from_millis(150));

        assert_eq!(engine.tooltip.target(), None);
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn test_reveal_of_unremarkable_element_aborts() {
        let mut engine =
            engine_for("<html><body><p>plain paragraph text here</p></body></html>");
        let mut updates = engine.subscribe();
        let p = engine.host.query("p")[0];
        let t0 = Instant::now();

        engine.handle(EngineEvent::PointerOver(p), t0);
        engine.fire_tooltip(t0 + Duration::from_millis(150));
        engine.fire_tooltip(t0 + Duration::from_millis(160));

        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn test_stale_insight_generations_are_dropped() {
        let mut engine = engine_for(BUSY_PAGE);
        let mut updates = engine.subscribe();
        let ad = engine.host.query(".ad-banner")[0];
        let t0 = Instant::now();

        engine.handle(EngineEvent::PointerOver(ad), t0);
        engine.fire_tooltip(t0 + Duration::from_millis(150));
        engine.insight_seq = 3;

        let insight = Insight {
            severity: Severity::Info,
            message: "context".into(),
            mismatch: false,
        };
        let stale_seq = EngineEvent::InsightReady {
            seq: 2,
            target: ad,
            insight: Some(insight.clone()),
        };
        let wrong_target = EngineEvent::InsightReady {
            seq: 3,
            target: NodeId { doc: 0, index: 999 },
            insight: Some(insight.clone()),
        };
        let current = EngineEvent::InsightReady {
            seq: 3,
            target: ad,
            insight: Some(insight.clone()),
        };

        let t1 = t0 + Duration::from_millis(200);
        engine.handle(stale_seq, t1);
        engine.handle(wrong_target, t1);
        assert!(updates.try_recv().is_err());

        engine.handle(current, t1);
        assert_eq!(
            updates.try_recv().unwrap(),
            OverlayUpdate::TooltipEnriched {
                target: ad,
                insight
            }
        );
    }

    struct ScriptedModel(&'static str);

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn is_available(&self) -> bool {
            true
        }

        async fn prompt(&self, _text: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_insight_task_flows_back_as_enrichment() {
        let dom = StaticDom::parse(
            r#"<html><body><form action="http://mysite.com/login"><input type="password" name="pw"></form></body></html>"#,
            "http://mysite.com/",
        )
        .unwrap();
        let config = Config {
            settings: Settings {
                ai_enabled: true,
                ..Settings::default()
            },
            ..Config::default()
        };
        let guard = ModelGuard::new(
            Some(Arc::new(ScriptedModel("Credentials would travel unencrypted."))),
            &config.tuning,
        );
        let mut engine = OverlayEngine::new(Arc::new(dom), &config, Arc::new(guard));
        let mut updates = engine.subscribe();
        let form = engine.host.query("form")[0];
        let t0 = Instant::now();

        engine.handle(EngineEvent::PointerOver(form), t0);
        engine.fire_tooltip(t0 + Duration::from_millis(150));

        let ready = engine.inbox.recv().await.expect("insight completion");
        engine.handle(ready, t0 + Duration::from_millis(200));

        match updates.try_recv().unwrap() {
            OverlayUpdate::TooltipEnriched { target, insight } => {
                assert_eq!(target, form);
                assert_eq!(insight.severity, Severity::High);
                assert!(insight.message.contains("unencrypted"));
            }
            other => panic!("expected enrichment, got {other:?}"),
        }
    }
}
