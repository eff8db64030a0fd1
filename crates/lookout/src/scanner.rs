use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use pagelens_core::sanitize::generate_id;
use pagelens_core::{Classification, Config, CriterionKind, Debouncer, EngineNotice, LookOutConfig};
use pagelens_dom::{DomHost, NodeId};
use pagelens_providers::ModelGuard;

use crate::matcher;

const NOTICE_CHANNEL_CAPACITY: usize = 16;

/// Candidate population for one criterion kind. Unknown or generic
/// criteria use the content selectors.
pub fn candidate_selector(kind: CriterionKind) -> &'static str {
    match kind {
        CriterionKind::Job => {
            r#"article[class*="job" i], .job-listing, [data-job-id], .position, .job-card, .job-result"#
        }
        CriterionKind::Product => {
            r#".product, [class*="product" i], [data-product-id], .item, .listing, .search-result"#
        }
        CriterionKind::Content => r#"article, .post, .content, .article, main, [role="article"]"#,
    }
}

/// One highlighted element on the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMatch {
    pub id: String,
    pub node: NodeId,
    pub classification: Classification,
}

/// Input to a running scanner.
#[derive(Debug, Clone)]
pub enum ScanSignal {
    /// Document changed; coalesced on the slow Look Out window.
    Changed,
    /// Replace the criteria set and rescan immediately.
    Update(LookOutConfig),
    /// Immediate rescan request from another context.
    Rescan,
}

/// The Look Out matching engine: a slower-cadence sibling of the overlay
/// rescan that reconciles the active-match list against the user's watch
/// criteria. Clear-then-rebuild on every pass, same as the indicator
/// set.
pub struct LookOutScanner {
    host: Arc<dyn DomHost>,
    config: LookOutConfig,
    threshold: u8,
    guard: Arc<ModelGuard>,
    matches: Vec<PageMatch>,
    debounce: Debouncer,
    initial_delay: Duration,
    signals: mpsc::UnboundedSender<ScanSignal>,
    inbox: mpsc::UnboundedReceiver<ScanSignal>,
    notices: broadcast::Sender<EngineNotice>,
}

impl LookOutScanner {
    pub fn new(host: Arc<dyn DomHost>, config: &Config, guard: Arc<ModelGuard>) -> Self {
        let (signals, inbox) = mpsc::unbounded_channel();
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            host,
            config: config.look_out_config.clone(),
            threshold: config.tuning.lookout_threshold,
            guard,
            matches: Vec::new(),
            debounce: Debouncer::new(Duration::from_millis(config.tuning.lookout_debounce_ms)),
            initial_delay: Duration::from_millis(config.tuning.lookout_initial_delay_ms),
            signals,
            inbox,
            notices,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<ScanSignal> {
        self.signals.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotice> {
        self.notices.subscribe()
    }

    pub fn matches(&self) -> &[PageMatch] {
        &self.matches
    }

    /// Runs until the token cancels or every signal sender is gone. The
    /// first pass is deliberately delayed so dynamic pages can finish
    /// their own initial render.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            enabled = self.config.enabled,
            criteria = self.config.criteria.len(),
            "Look Out scanner started"
        );

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(self.initial_delay) => {}
        }
        self.scan().await;

        loop {
            let timer = sleep_far(self.debounce.deadline());
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Look Out scanner stopping");
                    break;
                }
                signal = self.inbox.recv() => {
                    match signal {
                        Some(signal) => self.handle(signal, Instant::now()),
                        None => break,
                    }
                }
                _ = timer, if self.debounce.is_armed() => {
                    let now = Instant::now();
                    if self.debounce.fire(now) {
                        self.scan().await;
                    }
                }
            }
        }
    }

    fn handle(&mut self, signal: ScanSignal, now: Instant) {
        match signal {
            ScanSignal::Changed => self.debounce.poke(now),
            ScanSignal::Update(config) => {
                debug!(
                    enabled = config.enabled,
                    criteria = config.criteria.len(),
                    "Adopting new Look Out config"
                );
                self.config = config;
                self.debounce.force(now);
            }
            ScanSignal::Rescan => self.debounce.force(now),
        }
    }

    /// One full pass: clear the active-match list, evaluate every
    /// candidate once (the first criterion to claim an element wins),
    /// publish the resulting count.
    pub async fn scan(&mut self) {
        self.matches.clear();

        if self.config.enabled && !self.config.criteria.is_empty() {
            let criteria = self.config.criteria.clone();
            let mut claimed: HashSet<NodeId> = HashSet::new();

            for criterion in &criteria {
                for candidate in self.host.query(candidate_selector(criterion.kind)) {
                    if claimed.contains(&candidate) {
                        continue;
                    }
                    let result = matcher::analyze(
                        &*self.host,
                        candidate,
                        criterion,
                        &self.guard,
                        self.threshold,
                    )
                    .await;
                    let Some(result) = result else {
                        continue;
                    };
                    if result.relevance < self.threshold {
                        continue;
                    }

                    claimed.insert(candidate);
                    self.matches.push(PageMatch {
                        id: generate_id("match"),
                        node: candidate,
                        classification: Classification::LookOutMatch {
                            criteria_id: criterion.id.clone(),
                            relevance: result.relevance,
                            method: result.method,
                            explanation: result.explanation,
                        },
                    });
                }
            }
        }

        debug!(matches = self.matches.len(), "Look Out scan complete");
        let _ = self.notices.send(EngineNotice::LookOutMatches {
            count: self.matches.len(),
        });
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
    use pagelens_core::{Criterion, Tuning};
    use pagelens_dom::StaticDom;

    fn criterion(id: &str, kind: CriterionKind, keywords: &[&str]) -> Criterion {
        Criterion {
            id: id.to_string(),
            kind,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            exclude_keywords: Vec::new(),
            location: None,
            salary_min: None,
            price_max: None,
            created_at: None,
        }
    }

    fn scanner_for(html: &str, criteria: Vec<Criterion>) -> LookOutScanner {
        let dom = StaticDom::parse(html, "https://jobs.example.com/").unwrap();
        let config = Config {
            look_out_config: LookOutConfig {
                enabled: true,
                criteria,
            },
            ..Config::default()
        };
        LookOutScanner::new(
            Arc::new(dom),
            &config,
            Arc::new(ModelGuard::new(None, &Tuning::default())),
        )
    }

    const JOB_PAGE: &str = r#"<html><body>
        <div class="job-card">Senior Rust engineer, remote</div>
        <div class="job-card">Frontend developer, on-site</div>
        <article class="JobResult">Rust developer, hybrid</article>
    </body></html>"#;

    #[tokio::test]
    async fn test_scan_matches_keywords_and_publishes_count() {
        let mut scanner = scanner_for(
            JOB_PAGE,
            vec![criterion("c-1", CriterionKind::Job, &["rust"])],
        );
        let mut notices = scanner.subscribe();

        scanner.scan().await;

        assert_eq!(scanner.matches().len(), 2);
        for m in scanner.matches() {
            match &m.classification {
                Classification::LookOutMatch {
                    criteria_id,
                    relevance,
                    method,
                    explanation,
                } => {
                    assert_eq!(criteria_id, "c-1");
                    assert_eq!(*relevance, 75);
                    assert_eq!(*method, pagelens_core::MatchMethod::Basic);
                    assert_eq!(*explanation, None);
                }
                other => panic!("unexpected classification {other:?}"),
            }
        }
        assert_eq!(
            notices.try_recv().unwrap(),
            EngineNotice::LookOutMatches { count: 2 }
        );
    }

    #[tokio::test]
    async fn test_first_criterion_claims_shared_candidates() {
        // The article matches both the job selector (class contains
        // "job", case-insensitively) and the generic content selector.
        let mut scanner = scanner_for(
            JOB_PAGE,
            vec![
                criterion("jobs", CriterionKind::Job, &["rust"]),
                criterion("anything", CriterionKind::Content, &["rust"]),
            ],
        );
        scanner.scan().await;

        let article = scanner.host.query("article")[0];
        let owners: Vec<&str> = scanner
            .matches()
            .iter()
            .filter(|m| m.node == article)
            .map(|m| match &m.classification {
                Classification::LookOutMatch { criteria_id, .. } => criteria_id.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(owners, vec!["jobs"]);
    }

    #[tokio::test]
    async fn test_disabled_config_scans_empty_but_reports() {
        let mut scanner = scanner_for(
            JOB_PAGE,
            vec![criterion("c-1", CriterionKind::Job, &["rust"])],
        );
        scanner.config.enabled = false;
        let mut notices = scanner.subscribe();

        scanner.scan().await;

        assert!(scanner.matches().is_empty());
        assert_eq!(
            notices.try_recv().unwrap(),
            EngineNotice::LookOutMatches { count: 0 }
        );
    }

    #[tokio::test]
    async fn test_below_threshold_basic_match_is_discarded() {
        let dom = StaticDom::parse(JOB_PAGE, "https://jobs.example.com/").unwrap();
        let config = Config {
            look_out_config: LookOutConfig {
                enabled: true,
                criteria: vec![criterion("c-1", CriterionKind::Job, &["rust"])],
            },
            tuning: Tuning {
                lookout_threshold: 80,
                ..Tuning::default()
            },
            ..Config::default()
        };
        let mut scanner = LookOutScanner::new(
            Arc::new(dom),
            &config,
            Arc::new(ModelGuard::new(None, &config.tuning)),
        );

        scanner.scan().await;
        assert!(scanner.matches().is_empty());
    }

    #[tokio::test]
    async fn test_rescan_rebuilds_the_same_set() {
        let mut scanner = scanner_for(
            JOB_PAGE,
            vec![criterion("c-1", CriterionKind::Job, &["rust"])],
        );
        scanner.scan().await;
        let first: Vec<NodeId> = scanner.matches().iter().map(|m| m.node).collect();
        scanner.scan().await;
        let second: Vec<NodeId> = scanner.matches().iter().map(|m| m.node).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_update_signal_forces_immediate_deadline() {
        let mut scanner = scanner_for(JOB_PAGE, Vec::new());
        let t0 = Instant::now();
        scanner.handle(
            ScanSignal::Update(LookOutConfig {
                enabled: true,
                criteria: vec![criterion("c-9", CriterionKind::Job, &["rust"])],
            }),
            t0,
        );
        assert!(scanner.debounce.fire(t0));
        assert_eq!(scanner.config.criteria.len(), 1);
    }
}
