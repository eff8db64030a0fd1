use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use pagelens_core::sanitize::{sanitize_text, sanitize_url, MAX_LABEL_LENGTH, MAX_TEXT_LENGTH};
use pagelens_dom::{DomHost, NodeId};
use pagelens_providers::{CacheKey, ModelGuard, ModelOutcome};

use crate::ad::frame_source;
use crate::form::{form_action, input_label};

/// Sensitive-label pattern for the security prompt, spelled out the way
/// users label fields rather than the way inputs are named.
static PROMPT_SENSITIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)credit card|password|ssn|social security|cvv").unwrap());

static MISMATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)mismatch|unrelated|not related|different topic|advertising|ad\b").unwrap()
});

const MAIN_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".content",
    ".main-content",
    "#content",
    "#main",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    High,
}

/// A model-written enrichment attached to a tooltip. Absence is normal:
/// callers render without it when the model is off, throttled or wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub severity: Severity,
    pub message: String,
    pub mismatch: bool,
}

/// Asks the model to judge a form's submission risk. Only forms with
/// sensitive fields are worth a prompt; everything else returns `None`.
pub async fn form_security(
    host: &dyn DomHost,
    id: NodeId,
    guard: &ModelGuard,
) -> Option<Insight> {
    let action = sanitize_url(&form_action(host, id));
    let https = action.starts_with("https://");

    let sensitive: Vec<String> = host
        .query_within(id, "input, textarea")
        .into_iter()
        .filter_map(|input| {
            let label = input_label(host, input);
            let ty = host.attr(input, "type").unwrap_or_default().to_lowercase();
            (ty == "password" || PROMPT_SENSITIVE.is_match(&label))
                .then(|| sanitize_text(&label, MAX_LABEL_LENGTH))
        })
        .collect();

    if sensitive.is_empty() {
        return None;
    }

    let mut lines = vec![
        "Analyze the security risk of this form:".to_string(),
        "Fields:".to_string(),
    ];
    lines.extend(sensitive.iter().map(|field| format!("- {field}")));
    lines.extend([
        "Submission URL:".to_string(),
        action.clone(),
        "Protocol:".to_string(),
        if https {
            "HTTPS (secure)".to_string()
        } else {
            "HTTP (insecure)".to_string()
        },
        String::new(),
        "Provide a concise security warning in 2-3 sentences if sensitive data will be transmitted insecurely."
            .to_string(),
    ]);
    let prompt = lines.join("\n");

    let key = cache_key(host, id, "formSecurity");
    match guard.analyze(&key, &prompt).await {
        ModelOutcome::Answered(reply) => Some(Insight {
            severity: if https { Severity::Info } else { Severity::High },
            message: sanitize_text(&reply, 300),
            mismatch: false,
        }),
        _ => None,
    }
}

/// Asks the model whether a link's destination fits the page content,
/// then scans the reply for mismatch language.
pub async fn link_context(host: &dyn DomHost, id: NodeId, guard: &ModelGuard) -> Option<Insight> {
    let link_text = sanitize_text(host.text(id).trim(), 100);
    let href = host.attr(id, "href")?;
    let link_url = match host.base_url().join(href.trim()) {
        Ok(url) => sanitize_url(url.as_str()),
        Err(_) => return None,
    };

    let title = sanitize_text(&page_title(host), 100);
    let context = sanitize_text(&extract_main_content(host), 300);

    let prompt = [
        format!("The page is about \"{title}\"."),
        format!("Main content context: {context}"),
        format!("A link displays as \"{link_text}\" and points to \"{link_url}\"."),
        String::new(),
        "Analyze if this link's destination is contextually relevant to the page content."
            .to_string(),
        "Respond in 2-3 sentences. Indicate if there is a context mismatch or if it seems like advertising."
            .to_string(),
    ]
    .join("\n");

    let key = cache_key(host, id, "linkContext");
    match guard.analyze(&key, &prompt).await {
        ModelOutcome::Answered(reply) => {
            let mismatch = MISMATCH.is_match(&reply);
            Some(Insight {
                severity: if mismatch {
                    Severity::Warning
                } else {
                    Severity::Info
                },
                message: sanitize_text(&reply, 300),
                mismatch,
            })
        }
        _ => None,
    }
}

/// Asks the model what role an embedded ad plays on the page.
pub async fn ad_classification(
    host: &dyn DomHost,
    id: NodeId,
    guard: &ModelGuard,
) -> Option<Insight> {
    let source = frame_source(host, id);
    let source = if source.is_empty() {
        "unknown".to_string()
    } else {
        source
    };
    let source = sanitize_url(&source);

    let position = viewport_position(host, id);
    let title = sanitize_text(&page_title(host), 100);

    let prompt = [
        format!(
            "An embedded element from \"{source}\" appears in position \"{position}\" within the page \"{title}\"."
        ),
        String::new(),
        "Classify its purpose and relationship to the primary content in 1-2 sentences."
            .to_string(),
        "Is it a display ad, sponsored content, or integrated content?".to_string(),
    ]
    .join("\n");

    let key = cache_key(host, id, "adClassification");
    match guard.analyze(&key, &prompt).await {
        ModelOutcome::Answered(reply) => Some(Insight {
            severity: Severity::Info,
            message: sanitize_text(&reply, 300),
            mismatch: false,
        }),
        _ => None,
    }
}

/// First matching main-content region, falling back to the body; text is
/// capped before it reaches any prompt.
pub fn extract_main_content(host: &dyn DomHost) -> String {
    for selector in MAIN_SELECTORS {
        if let Some(&id) = host.query(selector).first() {
            return host.text(id).chars().take(MAX_TEXT_LENGTH).collect();
        }
    }
    host.query("body")
        .first()
        .map(|&id| host.text(id).chars().take(MAX_TEXT_LENGTH).collect())
        .unwrap_or_default()
}

pub fn page_title(host: &dyn DomHost) -> String {
    host.query("title")
        .first()
        .map(|&id| host.text(id).trim().to_string())
        .unwrap_or_default()
}

/// Which third of the viewport height the element's top edge sits in.
fn viewport_position(host: &dyn DomHost, id: NodeId) -> &'static str {
    let viewport_h = host.viewport().height as f64;
    let top = host.bounding_box(id).map(|rect| rect.y).unwrap_or(0.0);
    if top < viewport_h * 0.33 {
        "top"
    } else if top < viewport_h * 0.66 {
        "middle"
    } else {
        "bottom"
    }
}

fn cache_key(host: &dyn DomHost, id: NodeId, kind: &str) -> CacheKey {
    let tag = host.tag(id).unwrap_or_default();
    CacheKey::new(kind, &tag, &host.text(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagelens_core::{Result, Tuning};
    use pagelens_dom::StaticDom;
    use pagelens_providers::LanguageModel;
    use std::sync::Arc;

    struct ScriptedModel(String);

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn is_available(&self) -> bool {
            true
        }

        async fn prompt(&self, _text: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn guard_with(reply: &str) -> ModelGuard {
        ModelGuard::new(
            Some(Arc::new(ScriptedModel(reply.to_string()))),
            &Tuning::default(),
        )
    }

    #[test]
    fn test_extract_main_content_cascade() {
        let dom = StaticDom::parse(
            r#"<html><body><div class="content">sidebar text</div><main>primary story</main></body></html>"#,
            "https://mysite.com/",
        )
        .unwrap();
        assert_eq!(extract_main_content(&dom), "primary story");
    }

    #[test]
    fn test_extract_main_content_falls_back_to_body() {
        let dom = StaticDom::parse(
            "<html><body><p>only paragraphs</p></body></html>",
            "https://mysite.com/",
        )
        .unwrap();
        assert_eq!(extract_main_content(&dom), "only paragraphs");
    }

    #[tokio::test]
    async fn test_form_without_sensitive_fields_skips_model() {
        let dom = StaticDom::parse(
            r#"<html><body><form action="/search"><input name="q"></form></body></html>"#,
            "https://mysite.com/",
        )
        .unwrap();
        let guard = guard_with("should never be asked");
        let insight = form_security(&dom, dom.query("form")[0], &guard).await;
        assert_eq!(insight, None);
        assert_eq!(guard.metrics().await.total_calls, 0);
    }

    #[tokio::test]
    async fn test_form_security_severity_tracks_scheme() {
        let dom = StaticDom::parse(
            r#"<html><body><form action="http://mysite.com/login"><input type="password" name="pw"></form></body></html>"#,
            "http://mysite.com/",
        )
        .unwrap();
        let guard = guard_with("Credentials would travel unencrypted.");
        let insight = form_security(&dom, dom.query("form")[0], &guard)
            .await
            .unwrap();
        assert_eq!(insight.severity, Severity::High);
        assert!(insight.message.contains("unencrypted"));
    }

    #[tokio::test]
    async fn test_link_context_flags_mismatch() {
        let dom = StaticDom::parse(
            r#"<html><head><title>Rust patterns</title></head><body><main>iterators and traits</main><a href="https://casino.example.com/win">WIN BIG</a></body></html>"#,
            "https://mysite.com/",
        )
        .unwrap();
        let guard = guard_with("This destination is unrelated to the page topic.");
        let insight = link_context(&dom, dom.query("a")[0], &guard).await.unwrap();
        assert!(insight.mismatch);
        assert_eq!(insight.severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_unavailable_model_yields_no_insight() {
        let dom = StaticDom::parse(
            r#"<html><body><iframe src="https://ads.doubleclick.net/x"></iframe></body></html>"#,
            "https://mysite.com/",
        )
        .unwrap();
        let guard = ModelGuard::new(None, &Tuning::default());
        assert_eq!(ad_classification(&dom, dom.query("iframe")[0], &guard).await, None);
    }
}
